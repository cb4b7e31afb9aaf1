//! Error module.
//!
//! This module defines the error type used through-out the library.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
/// THE error type.
///
/// Every failure of the disassembly pipeline aborts the current
/// compare and surfaces as one of these. No partial results are
/// emitted after an error.
pub enum DisasmError {
    /// An address outside the ROM window was used to index the image.
    #[error("address {address:#010x} is outside the ROM window")]
    AddressOutOfRom { address: u32 },
    /// The decoder ran out of bytes before the code path ended.
    ///
    /// An undecodable halfword is reported the same way, since the
    /// decoder cannot tell a truncated image from garbage input.
    #[error("ran out of instruction bytes at {address:#010x}")]
    UnexpectedEndOfStream { address: u32 },
    /// The walk hit a construct it cannot follow.
    #[error("unsupported construct at {address:#010x}: {what}")]
    UnsupportedConstruct { address: u32, what: &'static str },
    /// A function name could not be resolved in a symbol table.
    #[error("no symbol named {name:?}")]
    UnknownFunction { name: String },
}
