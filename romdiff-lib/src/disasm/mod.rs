//! The control-flow-aware Thumb disassembler.
//!
//! Given an image, an entry address and a symbol index, the walk
//! follows every reachable code path in Thumb mode, materialising
//! instructions, the literal-pool words they load, and a label map.
//! A post-pass emits everything in address order, reifying holes
//! between items as alignment fillers.

use log::trace;

use std::collections::{btree_map, BTreeMap, HashMap, HashSet};

use crate::error::DisasmError;
use crate::rom::Rom;
use crate::symbols::SymbolTable;

mod item;
mod state;
mod thumb;

#[cfg(test)]
mod tests;

pub use item::{AlignItem, DataItem, InsnItem, Item, ItemKind};
pub use state::{Registers, Stack};
pub use thumb::{Condition, Groups, MemOffset, Mnemonic, Operand, Reg, RegList, ThumbInsn};

/// Format an address label, e.g. `loc_80001A4`.
pub(crate) fn generate_label(address: u32, prefix: &str) -> String {
    format!("{}_{:X}", prefix, address)
}

/// One linear decode in progress, owning its provenance state.
#[derive(Debug, Clone)]
struct CodePath {
    /// Address of the next instruction to decode.
    address: u32,
    stack: Stack,
    registers: Registers,
}

impl CodePath {
    fn new(address: u32, stack: Stack, registers: Registers) -> Result<CodePath, DisasmError> {
        if address & 1 != 0 {
            return Err(DisasmError::UnsupportedConstruct {
                address,
                what: "code path start is not halfword aligned",
            });
        }
        Ok(CodePath {
            address,
            stack,
            registers,
        })
    }

    /// Decode and materialise the next instruction, advancing the
    /// path and applying state effects.
    fn step(&mut self, rom: Rom, symbols: &SymbolTable) -> Result<InsnItem, DisasmError> {
        let address = self.address;
        let first = rom.read_u16(address)?;
        let second = rom.read_u16(address + 2).ok();
        let insn = ThumbInsn::decode(first, second, address)
            .ok_or(DisasmError::UnexpectedEndOfStream { address })?;
        let item = InsnItem::new(insn, rom, &mut self.stack, &mut self.registers, symbols)?;
        self.address = address + item.size();
        Ok(item)
    }

    /// Fork this path at `address`, cloning the current state.
    fn branch(&self, address: u32) -> Result<CodePath, DisasmError> {
        CodePath::new(address, self.stack.clone(), self.registers.clone())
    }
}

/// The disassembler proper.
///
/// Holds only borrows; the image and the symbol index stay with the
/// caller and are never mutated.
#[derive(Debug, Clone, Copy)]
pub struct Disassembler<'a> {
    rom: Rom<'a>,
    symbols: &'a SymbolTable,
}

impl<'a> Disassembler<'a> {
    pub fn new(rom: Rom<'a>, symbols: &'a SymbolTable) -> Self {
        Disassembler { rom, symbols }
    }

    /// Walk the function entered at `address` (Thumb bit already
    /// stripped) and return the finished disassembly.
    ///
    /// The walk keeps a queue of code paths and a visited set; every
    /// address enters the queue at most once. Paths end at returns
    /// and at jumps; conditional jumps fork the path, unconditional
    /// ones only follow the target.
    pub fn disassemble(&self, address: u32) -> Result<Disassembly, DisasmError> {
        let mut queue = vec![CodePath::new(address, Stack::new(), Registers::new())?];
        let mut visited: HashSet<u32> = HashSet::new();
        visited.insert(address);

        let mut items: BTreeMap<u32, Item> = BTreeMap::new();
        let mut labels: HashMap<u32, String> = HashMap::new();
        labels.insert(address, generate_label(address, "sub"));

        while let Some(mut path) = queue.pop() {
            trace!("Walking code path at {:#010x}", path.address);
            loop {
                let item = path.step(self.rom, self.symbols)?;
                let insn_address = item.address();

                for word in &item.data_refs {
                    trace!(
                        "Literal pool word at {:#010x}: {:#010x}",
                        word.address,
                        word.value
                    );
                    labels
                        .entry(word.address)
                        .or_insert_with(|| generate_label(word.address, "off"));
                    items
                        .entry(word.address)
                        .or_insert_with(|| Item::Data(word.clone()));
                }

                let is_return = item.is_return();
                let is_branch = item.is_jump() && !item.is_call();

                if !is_return && is_branch {
                    let jump_address = item.jump_address()?;
                    // Unconditional jumps do not fall through
                    let mut targets = Vec::with_capacity(2);
                    if !item.is_unconditional_jump() {
                        targets.push(insn_address + item.size());
                    }
                    targets.push(jump_address);
                    for target in targets {
                        if visited.insert(target) {
                            trace!("Enqueueing code path at {:#010x}", target);
                            queue.push(path.branch(target)?);
                        }
                    }
                    // Only the jump target gets a label
                    labels
                        .entry(jump_address)
                        .or_insert_with(|| generate_label(jump_address, "loc"));
                }

                items.entry(insn_address).or_insert(Item::Insn(item));

                if is_return || is_branch {
                    trace!(
                        "Code path ended at {:#010x} ({})",
                        insn_address,
                        if is_return { "return" } else { "jump" }
                    );
                    break;
                }
            }
        }

        Ok(Disassembly { items, labels })
    }
}

/// A finished walk: every materialised item plus the label map.
///
/// Iteration consumes the disassembly and yields items in address
/// order with labels attached and gaps reified as [`AlignItem`]s.
#[derive(Debug, Clone)]
pub struct Disassembly {
    items: BTreeMap<u32, Item>,
    labels: HashMap<u32, String>,
}

impl Disassembly {
    /// The label map computed by the walk.
    ///
    /// May contain addresses outside the decoded range (enqueued jump
    /// targets that were never reached); those have no owning item.
    pub fn labels(&self) -> &HashMap<u32, String> {
        &self.labels
    }
    /// Number of materialised items, alignment not included.
    pub fn len(&self) -> usize {
        self.items.len()
    }
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl IntoIterator for Disassembly {
    type Item = Item;
    type IntoIter = DisassemblyIter;

    fn into_iter(self) -> DisassemblyIter {
        DisassemblyIter {
            inner: self.items.into_iter(),
            labels: self.labels,
            predicted_next: None,
            pending: None,
        }
    }
}

/// Lazy post-pass over the walk results.
#[derive(Debug)]
pub struct DisassemblyIter {
    inner: btree_map::IntoIter<u32, Item>,
    labels: HashMap<u32, String>,
    predicted_next: Option<u32>,
    pending: Option<Item>,
}

impl Iterator for DisassemblyIter {
    type Item = Item;

    fn next(&mut self) -> Option<Item> {
        let item = match self.pending.take() {
            Some(item) => item,
            None => {
                let (address, mut item) = self.inner.next()?;
                item.set_label(self.labels.get(&address).cloned());
                item
            }
        };
        if let Some(predicted) = self.predicted_next {
            // A hole always opens *after* the predicted address;
            // anything else means an item's size was wrong
            debug_assert!(item.address() >= predicted);
            if item.address() > predicted {
                let mut align = Item::Align(AlignItem {
                    address: predicted,
                    size: item.address() - predicted,
                    label: None,
                });
                align.set_label(self.labels.get(&predicted).cloned());
                self.predicted_next = Some(item.address());
                self.pending = Some(item);
                return Some(align);
            }
        }
        self.predicted_next = Some(item.address() + item.size());
        Some(item)
    }
}
