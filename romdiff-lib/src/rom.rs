//! The memory-mapped ROM image.
//!
//! GBA cartridge ROM is mapped at a fixed base; translating a mapped
//! address back to a file offset is a subtraction plus a range check.
//! Everything that touches image bytes goes through [`Rom`] so that
//! out-of-window addresses are caught in one place.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::DisasmError;

/// The fixed address at which the ROM is memory-mapped.
pub const ROM_BASE: u32 = 0x0800_0000;
/// The last address inside the ROM window.
pub const ROM_TOP: u32 = 0x09FF_FFFF;

/// A read-only view of a ROM image.
///
/// # Example
///
/// ```
/// # use romdiff_lib::rom::{Rom, ROM_BASE};
/// let image = [0x70, 0x47, 0x00, 0x00];
/// let rom = Rom::new(&image);
///
/// assert_eq!(rom.offset(ROM_BASE).unwrap(), 0);
/// assert_eq!(rom.read_u16(ROM_BASE).unwrap(), 0x4770);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Rom<'a> {
    bytes: &'a [u8],
}

impl<'a> Rom<'a> {
    /// Wrap the given image bytes.
    pub const fn new(bytes: &'a [u8]) -> Self {
        Rom { bytes }
    }
    /// The raw image bytes.
    pub const fn bytes(&self) -> &'a [u8] {
        self.bytes
    }
    /// Translate a mapped address into an offset into the image.
    ///
    /// Fails with [`DisasmError::AddressOutOfRom`] for anything
    /// outside `[ROM_BASE, ROM_TOP]`.
    pub fn offset(&self, address: u32) -> Result<usize, DisasmError> {
        if (ROM_BASE..=ROM_TOP).contains(&address) {
            Ok((address - ROM_BASE) as usize)
        } else {
            Err(DisasmError::AddressOutOfRom { address })
        }
    }
    /// Read the little-endian halfword at `address`.
    pub fn read_u16(&self, address: u32) -> Result<u16, DisasmError> {
        let offset = self.offset(address)?;
        if offset + 2 > self.bytes.len() {
            return Err(DisasmError::UnexpectedEndOfStream { address });
        }
        Ok(LittleEndian::read_u16(&self.bytes[offset..]))
    }
    /// Read the little-endian word at `address`.
    pub fn read_u32(&self, address: u32) -> Result<u32, DisasmError> {
        let offset = self.offset(address)?;
        if offset + 4 > self.bytes.len() {
            return Err(DisasmError::UnexpectedEndOfStream { address });
        }
        Ok(LittleEndian::read_u32(&self.bytes[offset..]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_are_relative_to_the_rom_base() {
        let image = [0u8; 16];
        let rom = Rom::new(&image);
        assert_eq!(rom.offset(ROM_BASE).unwrap(), 0);
        assert_eq!(rom.offset(ROM_BASE + 0x10).unwrap(), 0x10);
        assert_eq!(rom.offset(ROM_TOP).unwrap(), 0x01FF_FFFF);
    }

    #[test]
    fn addresses_outside_the_window_are_rejected() {
        let image = [0u8; 4];
        let rom = Rom::new(&image);
        assert_eq!(
            rom.offset(0x0700_0000),
            Err(DisasmError::AddressOutOfRom {
                address: 0x0700_0000
            })
        );
        assert_eq!(
            rom.offset(0x0A00_0000),
            Err(DisasmError::AddressOutOfRom {
                address: 0x0A00_0000
            })
        );
        // RAM mirrors are not ROM either
        assert!(rom.offset(0x0300_1234).is_err());
    }

    #[test]
    fn reads_are_little_endian() {
        let image = [0x01, 0x48, 0xEF, 0xBE, 0xAD, 0xDE];
        let rom = Rom::new(&image);
        assert_eq!(rom.read_u16(ROM_BASE).unwrap(), 0x4801);
        assert_eq!(rom.read_u32(ROM_BASE + 2).unwrap(), 0xDEAD_BEEF);
    }

    #[test]
    fn reads_past_the_image_end_fail() {
        let image = [0x01, 0x48];
        let rom = Rom::new(&image);
        assert_eq!(
            rom.read_u16(ROM_BASE + 2),
            Err(DisasmError::UnexpectedEndOfStream {
                address: ROM_BASE + 2
            })
        );
        assert_eq!(
            rom.read_u32(ROM_BASE),
            Err(DisasmError::UnexpectedEndOfStream { address: ROM_BASE })
        );
    }
}
