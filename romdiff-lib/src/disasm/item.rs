//! The items a disassembly is made of.
//!
//! [`Item`] is a closed sum over instructions, literal-pool words and
//! alignment fillers. Items are immutable once materialised; only the
//! post-pass touches them again, to attach labels. The differ sees
//! nothing but this type, its addresses and its rendered text.

use std::fmt;

use crate::error::DisasmError;
use crate::rom::Rom;
use crate::symbols::SymbolTable;

use super::state::{apply_pop, apply_push, Registers, Stack};
use super::thumb::{Condition, Groups, MemOffset, Mnemonic, Operand, Reg, RegList, ThumbInsn};
use super::generate_label;

/// Discriminates the three item shapes without carrying their data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Insn,
    Data,
    Align,
}

impl ItemKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ItemKind::Insn => "insn",
            ItemKind::Data => "data",
            ItemKind::Align => "align",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of disassembly output.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Insn(InsnItem),
    Data(DataItem),
    Align(AlignItem),
}

impl Item {
    pub fn kind(&self) -> ItemKind {
        match self {
            Item::Insn(_) => ItemKind::Insn,
            Item::Data(_) => ItemKind::Data,
            Item::Align(_) => ItemKind::Align,
        }
    }
    pub fn address(&self) -> u32 {
        match self {
            Item::Insn(item) => item.insn.address,
            Item::Data(item) => item.address,
            Item::Align(item) => item.address,
        }
    }
    pub fn size(&self) -> u32 {
        match self {
            Item::Insn(item) => item.insn.size,
            Item::Data(item) => item.size,
            Item::Align(item) => item.size,
        }
    }
    pub fn label(&self) -> Option<&str> {
        match self {
            Item::Insn(item) => item.label.as_deref(),
            Item::Data(item) => item.label.as_deref(),
            Item::Align(item) => item.label.as_deref(),
        }
    }
    pub(crate) fn set_label(&mut self, label: Option<String>) {
        match self {
            Item::Insn(item) => item.label = label,
            Item::Data(item) => item.label = label,
            Item::Align(item) => item.label = label,
        }
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Item::Insn(item) => f.write_str(&item.text),
            Item::Data(item) => write!(f, ".word 0x{:08X}", item.value),
            Item::Align(item) => write!(f, ".align {}", item.size),
        }
    }
}

/// A literal-pool word.
#[derive(Debug, Clone, PartialEq)]
pub struct DataItem {
    pub address: u32,
    pub size: u32,
    /// The little-endian decoded value.
    pub value: u32,
    pub label: Option<String>,
}

impl DataItem {
    /// Materialise the word at `address` from the image.
    pub fn read(rom: Rom, address: u32) -> Result<DataItem, DisasmError> {
        let value = rom.read_u32(address)?;
        Ok(DataItem {
            address,
            size: 4,
            value,
            label: None,
        })
    }
}

/// A gap filler covering `[address, address + size)`.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignItem {
    pub address: u32,
    pub size: u32,
    pub label: Option<String>,
}

/// A decoded instruction with its walk-time context.
#[derive(Debug, Clone, PartialEq)]
pub struct InsnItem {
    pub insn: ThumbInsn,
    /// Literal-pool words this instruction loads.
    pub data_refs: Vec<DataItem>,
    /// Provenance snapshot *after* this instruction's effects.
    pub registers: Registers,
    /// Stack snapshot after this instruction's effects.
    pub stack: Stack,
    pub label: Option<String>,
    text: String,
}

impl InsnItem {
    /// Materialise `insn`, applying its state effects to the owning
    /// path and resolving its textual form.
    pub fn new(
        insn: ThumbInsn,
        rom: Rom,
        stack: &mut Stack,
        registers: &mut Registers,
        symbols: &SymbolTable,
    ) -> Result<InsnItem, DisasmError> {
        match (insn.mnemonic, insn.operands.first()) {
            (Mnemonic::Push, Some(&Operand::RegList(list))) => apply_push(stack, list),
            (Mnemonic::Pop, Some(&Operand::RegList(list))) => {
                apply_pop(stack, registers, list)
            }
            _ => {}
        }

        let mut data_refs = Vec::new();
        if insn.mnemonic == Mnemonic::Ldr {
            if let Some(&Operand::Mem {
                base: Reg::Pc,
                offset: MemOffset::Imm(disp),
            }) = insn.operands.get(1)
            {
                if disp < 0 {
                    return Err(DisasmError::UnsupportedConstruct {
                        address: insn.address,
                        what: "negative literal-pool displacement",
                    });
                }
                // The pc a Thumb load sees is the instruction address
                // plus four, word-aligned
                let align = if insn.address % 4 == 0 { 4 } else { 2 };
                let target = insn.address + disp as u32 + align;
                data_refs.push(DataItem::read(rom, target)?);
            }
        }

        let text = render(&insn, &data_refs, symbols);
        Ok(InsnItem {
            insn,
            data_refs,
            registers: registers.clone(),
            stack: stack.clone(),
            label: None,
            text,
        })
    }

    /// Does this instruction end its code path by returning?
    ///
    /// `bx lr`, `bx Rn` where `Rn` is tagged with `lr`, and a `pop`
    /// that lands an `lr` tag in `pc` all count. A `bx` through a
    /// register with unknown provenance does *not*.
    pub fn is_return(&self) -> bool {
        match (self.insn.mnemonic, self.insn.operands.first()) {
            (Mnemonic::Bx, Some(&Operand::Reg(reg))) => {
                reg == Reg::Lr || self.registers.get(reg) == Some(Reg::Lr)
            }
            (Mnemonic::Pop, _) => self.registers.get(Reg::Pc) == Some(Reg::Lr),
            _ => false,
        }
    }

    /// Is this instruction in the jump group?
    pub fn is_jump(&self) -> bool {
        self.insn.groups.contains(Groups::JUMP)
    }

    /// A plain `b` with condition `AL`.
    pub fn is_unconditional_jump(&self) -> bool {
        self.insn.mnemonic == Mnemonic::B && self.insn.condition == Condition::Al
    }

    /// Does control come back after this instruction?
    ///
    /// `bl` always; `bx` counts as a long call whenever it is not a
    /// recognised return.
    pub fn is_call(&self) -> bool {
        match self.insn.mnemonic {
            Mnemonic::Bl => true,
            Mnemonic::Bx => !self.is_return(),
            _ => false,
        }
    }

    /// The branch target of a non-`bx` jump.
    pub fn jump_address(&self) -> Result<u32, DisasmError> {
        if self.insn.mnemonic == Mnemonic::Bx {
            return Err(DisasmError::UnsupportedConstruct {
                address: self.insn.address,
                what: "bx target is not statically known",
            });
        }
        match self.insn.operands.first() {
            Some(&Operand::Imm(target)) => Ok(target),
            _ => Err(DisasmError::UnsupportedConstruct {
                address: self.insn.address,
                what: "jump without an immediate target",
            }),
        }
    }

    pub fn address(&self) -> u32 {
        self.insn.address
    }

    pub fn size(&self) -> u32 {
        self.insn.size
    }
}

/// Format an immediate: hex past 9, decimal otherwise.
fn build_imm(imm: i64) -> String {
    if imm > 9 {
        format!("#{:#x}", imm)
    } else {
        format!("#{}", imm)
    }
}

/// Collapse a register list into `{a-b, c}` form, merging runs of
/// architecturally adjacent registers.
fn build_reglist(list: RegList) -> String {
    let mut result = String::new();
    let mut prev: Option<Reg> = None;
    for reg in list.iter() {
        match prev {
            None => result.push_str(reg.name()),
            Some(prev) => {
                if reg.index() == prev.index() + 1 {
                    if !result.ends_with('-') {
                        result.push('-');
                    }
                } else {
                    if result.ends_with('-') {
                        result.push_str(prev.name());
                    }
                    result.push_str(", ");
                    result.push_str(reg.name());
                }
            }
        }
        prev = Some(reg);
    }
    if result.ends_with('-') {
        if let Some(prev) = prev {
            result.push_str(prev.name());
        }
    }
    format!("{{{}}}", result)
}

/// Resolve the instruction to the text the differ compares.
fn render(insn: &ThumbInsn, data_refs: &[DataItem], symbols: &SymbolTable) -> String {
    let mut mnemonic = insn.mnemonic.as_str().to_string();
    if insn.mnemonic == Mnemonic::B {
        mnemonic.push_str(insn.condition.suffix());
    }
    let mut operands: &[Operand] = &insn.operands;
    let mut ops: Vec<String> = Vec::new();

    // Pseudo instructions
    match insn.mnemonic {
        Mnemonic::Add => {
            // add rd, rn, #0 is a register move
            if operands.len() == 3 && operands[2] == Operand::Imm(0) {
                mnemonic = "mov".to_string();
                operands = &operands[..2];
            }
        }
        Mnemonic::Mov => {
            // The canonical Thumb nop
            if let [Operand::Reg(Reg::R8), Operand::Reg(Reg::R8)] = operands {
                mnemonic = "nop".to_string();
                operands = &[];
            }
        }
        Mnemonic::Ldr => {
            // A pc-relative load reads a known constant; show the
            // constant (or what it points at) instead of the pool slot
            if let (
                Some(&Operand::Reg(rd)),
                Some(&Operand::Mem { base: Reg::Pc, .. }),
                Some(word),
            ) = (operands.first(), operands.get(1), data_refs.first())
            {
                ops.push(rd.name().to_string());
                match symbols.lookup(word.value) {
                    Some(lookup) if lookup.disp > 0 => {
                        ops.push(format!("={}+{}", lookup.symbol.name, lookup.disp))
                    }
                    Some(lookup) => ops.push(format!("={}", lookup.symbol.name)),
                    None => ops.push(format!("=0x{:08x}", word.value)),
                }
                operands = &[];
            }
        }
        _ => {}
    }

    for op in operands {
        match *op {
            Operand::Reg(reg) => ops.push(reg.name().to_string()),
            Operand::Imm(imm) => {
                if insn.groups.contains(Groups::JUMP) {
                    ops.push(generate_label(imm, "loc"));
                } else if insn.mnemonic == Mnemonic::Bl {
                    match symbols.lookup(imm) {
                        Some(lookup) => ops.push(lookup.symbol.name.clone()),
                        None => ops.push(format!("0x{:08x}", imm)),
                    }
                } else {
                    ops.push(build_imm(imm as i64));
                }
            }
            Operand::Mem { base, offset } => {
                let offset = match offset {
                    MemOffset::Imm(disp) => build_imm(disp as i64),
                    MemOffset::Index(reg) => reg.name().to_string(),
                };
                ops.push(format!("[{}, {}]", base.name(), offset));
            }
            Operand::RegList(list) => ops.push(build_reglist(list)),
        }
    }

    if ops.is_empty() {
        mnemonic
    } else {
        format!("{}\t{}", mnemonic, ops.join(", "))
    }
}
