//! Error module.
//!
//! This module defines the error type used through-out the program.

use romdiff_lib::error::DisasmError;
use thiserror::Error;

use std::io::Error as IOError;

#[derive(Error, Debug)]
/// THE error type.
pub enum Error {
    /// Thrown when a ROM image or symbol file could not be read.
    #[error("file could not be read: {_0}")]
    ReadingInputFailed(#[from] IOError),
    /// Thrown when a symbol file line does not parse.
    #[error("malformed symbol file line {line}: {reason}")]
    SymbolFileMalformed { line: usize, reason: String },
    /// Anything the disassembly pipeline reports.
    #[error("{_0}")]
    CompareFailed(#[from] DisasmError),
    /// Invalid CLI input.
    #[error("{_0}")]
    InvalidInput(String),
}
