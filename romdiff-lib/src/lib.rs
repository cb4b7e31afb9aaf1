//! Library for the romdiff decompilation differ.
//!
//! The pipeline: a [`symbols::SymbolTable`] turns a function name into
//! an entry address, the [`disasm::Disassembler`] walks the function
//! in both the reference and the freshly built image, and
//! [`diff::diff`] reduces the two listings to an event stream a
//! frontend can render. [`runner::CompareConfig`] bundles the whole
//! trip for callers that just want the events.

pub mod diff;
pub mod disasm;
pub mod error;
pub mod rom;
pub mod runner;
pub mod symbols;
