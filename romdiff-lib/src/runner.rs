//! One-shot compare pipeline.
//!
//! Wires the pieces together the way the watch loop uses them: resolve
//! the edited function in both symbol tables, disassemble both images
//! at its effective start, and diff the two listings.

use derive_builder::Builder;
use log::trace;

use std::marker::PhantomData;

use crate::diff::{diff, Event};
use crate::disasm::{Disassembler, Item};
use crate::error::DisasmError;
use crate::rom::Rom;
use crate::symbols::SymbolTable;

/// Everything a single compare needs.
///
/// # Builder
///
/// ```
/// # use romdiff_lib::runner::CompareConfigBuilder;
/// # use romdiff_lib::symbols::{Symbol, SymbolKind, SymbolTable};
/// let symbols = SymbolTable::new(vec![Symbol {
///     name: "main".into(),
///     value: 0x0800_0001,
///     size: 4,
///     kind: SymbolKind::Function,
/// }]);
/// let image = [0x00, 0x20, 0x70, 0x47];
/// let config = CompareConfigBuilder::default()
///     .with_base_image(&image)
///     .with_modified_image(&image)
///     .with_base_symbols(&symbols)
///     .with_modified_symbols(&symbols)
///     .with_function("main")
///     .build()
///     .expect("every field was given");
/// let results = config.run().expect("compare runs");
/// assert!(results.events.iter().all(|e| e.opcode.as_char() == ' '));
/// ```
#[derive(Debug, Builder, Clone, PartialEq)]
#[builder(setter(prefix = "with"))]
pub struct CompareConfig<'a> {
    /// The reference image.
    pub base_image: &'a [u8],
    /// The freshly built image.
    pub modified_image: &'a [u8],
    /// Symbols of the reference image.
    pub base_symbols: &'a SymbolTable,
    /// Symbols of the freshly built image.
    pub modified_symbols: &'a SymbolTable,
    /// The function to compare.
    pub function: &'a str,
    /// Prevent the manual creation of this struct for the purpose of extension
    #[builder(setter(skip), default)]
    _phantom: PhantomData<u8>,
}

/// The outcome of a compare.
#[derive(Debug, Clone, PartialEq)]
pub struct CompareResults {
    /// The materialised event stream.
    pub events: Vec<Event>,
    /// Effective entry of the function in the reference image.
    pub base_entry: u32,
    /// Effective entry of the function in the built image.
    pub modified_entry: u32,
}

impl<'a> CompareConfig<'a> {
    /// Execute the compare.
    pub fn run(&self) -> Result<CompareResults, DisasmError> {
        let base_entry = self.entry(self.base_symbols)?;
        let modified_entry = self.entry(self.modified_symbols)?;
        trace!(
            "Comparing {:?}: {:#010x} vs {:#010x}",
            self.function,
            base_entry,
            modified_entry
        );
        let base: Vec<Item> = Disassembler::new(Rom::new(self.base_image), self.base_symbols)
            .disassemble(base_entry)?
            .into_iter()
            .collect();
        let modified: Vec<Item> =
            Disassembler::new(Rom::new(self.modified_image), self.modified_symbols)
                .disassemble(modified_entry)?
                .into_iter()
                .collect();
        Ok(CompareResults {
            events: diff(&base, &modified),
            base_entry,
            modified_entry,
        })
    }

    fn entry(&self, symbols: &SymbolTable) -> Result<u32, DisasmError> {
        symbols
            .lookup_name(self.function)
            .map(|symbol| symbol.effective_start())
            .ok_or_else(|| DisasmError::UnknownFunction {
                name: self.function.to_string(),
            })
    }
}
