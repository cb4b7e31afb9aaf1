//! Plain-text symbol files.
//!
//! The tool does not read ELF itself; the build system is expected to
//! dump a symbol map, one record per line:
//!
//! ```text
//! # address size kind name
//! 08000329 000000a4 F AgbMain
//! 030031f0 00000f2c O gSaveBlock
//! ```
//!
//! Kind `F`/`f`/`T`/`t` marks functions (their address carries the
//! Thumb bit); everything else is data. Blank lines and `#` comments
//! are skipped.

use romdiff_lib::symbols::{Symbol, SymbolKind, SymbolTable};

use std::{fs::read_to_string, path::PathBuf};

use crate::error::Error;

/// Read the given path into a symbol table or fail.
pub fn read_symbol_file<P>(path: P) -> Result<SymbolTable, Error>
where
    P: Into<PathBuf>,
{
    let content = read_to_string(path.into())?;
    parse_symbols(&content)
}

fn parse_symbols(content: &str) -> Result<SymbolTable, Error> {
    let mut symbols = Vec::new();
    for (index, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        symbols.push(parse_line(line).map_err(|reason| Error::SymbolFileMalformed {
            line: index + 1,
            reason,
        })?);
    }
    Ok(SymbolTable::new(symbols))
}

fn parse_line(line: &str) -> Result<Symbol, String> {
    let mut fields = line.split_whitespace();
    let value = fields.next().ok_or("missing address field")?;
    let value = u32::from_str_radix(value, 16).map_err(|e| format!("bad address: {}", e))?;
    let size = fields.next().ok_or("missing size field")?;
    let size = u32::from_str_radix(size, 16).map_err(|e| format!("bad size: {}", e))?;
    let kind = match fields.next().ok_or("missing kind field")? {
        "F" | "f" | "T" | "t" => SymbolKind::Function,
        _ => SymbolKind::Object,
    };
    let name = fields.next().ok_or("missing name field")?;
    if fields.next().is_some() {
        return Err("trailing fields".to_string());
    }
    Ok(Symbol {
        name: name.to_string(),
        value,
        size,
        kind,
    })
}
