use structopt::StructOpt;

use std::{num::ParseIntError, path::PathBuf};

#[derive(Debug, StructOpt)]
/// Disassembly differ for GBA decompilation projects.
///
/// Compares one function between a reference ROM and a freshly built
/// ROM, or prints a single labelled listing.
pub struct Args {
    #[structopt(subcommand)]
    pub subcommand: SubCommand,
}

#[derive(Debug, StructOpt)]
pub enum SubCommand {
    /// Diff one function between two ROM images.
    ///
    /// Both images need a symbol file so the function can be located
    /// and calls/literals can be named. The diff distinguishes real
    /// edits from code that merely moved to a different address.
    Diff(DiffArgs),
    /// Print the labelled disassembly of one function.
    Disasm(DisasmArgs),
}

#[derive(Debug, StructOpt)]
pub struct DiffArgs {
    /// The reference ROM image.
    #[structopt(name = "BASE_ROM")]
    pub base_rom: PathBuf,
    /// Symbol file of the reference image.
    #[structopt(name = "BASE_SYMBOLS")]
    pub base_symbols: PathBuf,
    /// The freshly built ROM image.
    #[structopt(name = "ROM")]
    pub rom: PathBuf,
    /// Symbol file of the built image.
    #[structopt(name = "SYMBOLS")]
    pub symbols: PathBuf,
    /// The function to compare.
    #[structopt(name = "FUNCTION")]
    pub function: String,
}

#[derive(Debug, StructOpt)]
pub struct DisasmArgs {
    /// The ROM image to disassemble.
    #[structopt(name = "ROM")]
    pub rom: PathBuf,
    /// Symbol file of the image.
    #[structopt(name = "SYMBOLS")]
    pub symbols: PathBuf,
    /// The function to disassemble.
    #[structopt(name = "FUNCTION", required_unless = "address")]
    pub function: Option<String>,
    /// Start at this address instead of a named function.
    ///
    /// Accepts decimal or, with a `0x` prefix, hexadecimal. The
    /// address must be halfword aligned and inside the ROM window.
    #[structopt(long, value_name = "ADDRESS",
                parse(try_from_str = parse_u32_auto_radix))]
    pub address: Option<u32>,
}

/// Parse a number from a decimal or `0x`-prefixed hexadecimal string.
fn parse_u32_auto_radix(input: &str) -> Result<u32, ParseIntError> {
    if let Some(hex) = input.strip_prefix("0x") {
        u32::from_str_radix(hex, 16)
    } else {
        input.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_parse_in_both_radixes() {
        assert_eq!(parse_u32_auto_radix("42"), Ok(42));
        assert_eq!(parse_u32_auto_radix("0x8000000"), Ok(0x0800_0000));
        assert!(parse_u32_auto_radix("binary").is_err());
    }
}
