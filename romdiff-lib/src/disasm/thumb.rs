//! Thumb instruction model and decoder.
//!
//! Covers the 16-bit ARMv4T Thumb encodings (plus the 32-bit `bl`
//! halfword pair). Decoding is total over the table below; anything
//! else is reported as undecodable and ends the walk.
//!
//! ```text
//! 000o p_im m_<S><D>   | shift Rd, Rs, #imm5
//! 0001 1IA< N><S><D>   | add/sub Rd, Rs, Rn|#imm3
//! 001o p<D> imm8       | mov/cmp/add/sub Rd, #imm8
//! 0100 00_o p_<S><D>   | alu Rd, Rs
//! 0100 01op hH<S><D>   | hi-reg add/cmp/mov, bx Rs
//! 0100 1<D> imm8       | ldr Rd, [pc, #imm8*4]
//! 0101 LB0< N><S><D>   | ldr/str Rd, [Rb, Ro]
//! 0101 HS1< N><S><D>   | ldrh/strh/ldsb/ldsh Rd, [Rb, Ro]
//! 011B L_im m_<S><D>   | ldr/str Rd, [Rb, #imm5]
//! 1000 L_im m_<S><D>   | ldrh/strh Rd, [Rb, #imm5*2]
//! 1001 L<D> imm8       | ldr/str Rd, [sp, #imm8*4]
//! 1010 P<D> imm8       | add Rd, pc|sp, #imm8*4
//! 1011 0000 Simm7      | add/sub sp, #imm7*4
//! 1011 L10R regs       | push/pop
//! 1100 L<B> regs       | stmia/ldmia Rb, regs
//! 1101 1111 imm8       | swi #imm8
//! 1101 cond imm8       | b<cond> target
//! 1110 0off offs       | b target
//! 1111 Xoff offs       | bl target (halfword pair)
//! ```

use bitflags::bitflags;
use enum_primitive::{
    enum_from_primitive, enum_from_primitive_impl, enum_from_primitive_impl_ty, FromPrimitive,
};
#[cfg(test)]
use proptest_derive::Arbitrary;

use std::fmt;

enum_from_primitive! {
    /// The sixteen registers visible to Thumb code.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    #[cfg_attr(test, derive(Arbitrary))]
    pub enum Reg {
        R0 = 0,
        R1,
        R2,
        R3,
        R4,
        R5,
        R6,
        R7,
        R8,
        R9,
        R10,
        R11,
        R12,
        Sp,
        Lr,
        Pc,
    }
}

impl Reg {
    /// The canonical lowercase name.
    pub fn name(self) -> &'static str {
        match self {
            Reg::R0 => "r0",
            Reg::R1 => "r1",
            Reg::R2 => "r2",
            Reg::R3 => "r3",
            Reg::R4 => "r4",
            Reg::R5 => "r5",
            Reg::R6 => "r6",
            Reg::R7 => "r7",
            Reg::R8 => "r8",
            Reg::R9 => "r9",
            Reg::R10 => "r10",
            Reg::R11 => "r11",
            Reg::R12 => "r12",
            Reg::Sp => "sp",
            Reg::Lr => "lr",
            Reg::Pc => "pc",
        }
    }
    /// The architectural index, `0..=15`.
    pub fn index(self) -> usize {
        self as usize
    }
    fn from_field(bits: u16) -> Reg {
        Reg::from_u16(bits & 0xF).expect("register fields are four bits")
    }
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

enum_from_primitive! {
    /// Branch condition codes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Condition {
        Eq = 0,
        Ne,
        Hs,
        Lo,
        Mi,
        Pl,
        Vs,
        Vc,
        Hi,
        Ls,
        Ge,
        Lt,
        Gt,
        Le,
        Al,
    }
}

impl Condition {
    /// The mnemonic suffix; empty for `AL`.
    pub fn suffix(self) -> &'static str {
        match self {
            Condition::Eq => "eq",
            Condition::Ne => "ne",
            Condition::Hs => "hs",
            Condition::Lo => "lo",
            Condition::Mi => "mi",
            Condition::Pl => "pl",
            Condition::Vs => "vs",
            Condition::Vc => "vc",
            Condition::Hi => "hi",
            Condition::Ls => "ls",
            Condition::Ge => "ge",
            Condition::Lt => "lt",
            Condition::Gt => "gt",
            Condition::Le => "le",
            Condition::Al => "",
        }
    }
}

bitflags! {
    /// Instruction group flags used by the control-flow walk.
    pub struct Groups: u8 {
        /// The instruction may redirect execution.
        const JUMP = 0b0000_0001;
        /// The instruction transfers to a subroutine and comes back.
        const CALL = 0b0000_0010;
    }
}

/// Every mnemonic the decoder can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mnemonic {
    Adc,
    Add,
    And,
    Asr,
    B,
    Bic,
    Bl,
    Bx,
    Cmn,
    Cmp,
    Eor,
    Ldmia,
    Ldr,
    Ldrb,
    Ldrh,
    Ldsb,
    Ldsh,
    Lsl,
    Lsr,
    Mov,
    Mul,
    Mvn,
    Neg,
    Orr,
    Pop,
    Push,
    Ror,
    Sbc,
    Stmia,
    Str,
    Strb,
    Strh,
    Sub,
    Swi,
    Tst,
}

impl Mnemonic {
    pub fn as_str(self) -> &'static str {
        match self {
            Mnemonic::Adc => "adc",
            Mnemonic::Add => "add",
            Mnemonic::And => "and",
            Mnemonic::Asr => "asr",
            Mnemonic::B => "b",
            Mnemonic::Bic => "bic",
            Mnemonic::Bl => "bl",
            Mnemonic::Bx => "bx",
            Mnemonic::Cmn => "cmn",
            Mnemonic::Cmp => "cmp",
            Mnemonic::Eor => "eor",
            Mnemonic::Ldmia => "ldmia",
            Mnemonic::Ldr => "ldr",
            Mnemonic::Ldrb => "ldrb",
            Mnemonic::Ldrh => "ldrh",
            Mnemonic::Ldsb => "ldsb",
            Mnemonic::Ldsh => "ldsh",
            Mnemonic::Lsl => "lsl",
            Mnemonic::Lsr => "lsr",
            Mnemonic::Mov => "mov",
            Mnemonic::Mul => "mul",
            Mnemonic::Mvn => "mvn",
            Mnemonic::Neg => "neg",
            Mnemonic::Orr => "orr",
            Mnemonic::Pop => "pop",
            Mnemonic::Push => "push",
            Mnemonic::Ror => "ror",
            Mnemonic::Sbc => "sbc",
            Mnemonic::Stmia => "stmia",
            Mnemonic::Str => "str",
            Mnemonic::Strb => "strb",
            Mnemonic::Strh => "strh",
            Mnemonic::Sub => "sub",
            Mnemonic::Swi => "swi",
            Mnemonic::Tst => "tst",
        }
    }
}

/// A register-list operand, one bit per architectural index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegList(pub u16);

impl RegList {
    /// Registers in ascending architectural order.
    pub fn iter(self) -> impl DoubleEndedIterator<Item = Reg> {
        (0..16u16)
            .filter(move |bit| self.0 & (1 << bit) != 0)
            .map(Reg::from_field)
    }
    pub fn contains(self, reg: Reg) -> bool {
        self.0 & (1 << reg.index()) != 0
    }
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// The offset half of a memory operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemOffset {
    /// An immediate displacement.
    Imm(i32),
    /// A register index.
    Index(Reg),
}

/// A decoded operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Reg(Reg),
    /// An immediate. Branch targets are stored resolved, as absolute
    /// addresses.
    Imm(u32),
    Mem { base: Reg, offset: MemOffset },
    RegList(RegList),
}

/// One decoded Thumb instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct ThumbInsn {
    pub address: u32,
    /// 2, or 4 for `bl`.
    pub size: u32,
    /// The raw halfword(s) in memory order.
    pub raw: u32,
    pub mnemonic: Mnemonic,
    pub condition: Condition,
    pub operands: Vec<Operand>,
    pub groups: Groups,
}

impl ThumbInsn {
    /// Decode the instruction starting at `address`.
    ///
    /// `second` is the following halfword, needed to complete a `bl`
    /// pair; decoding fails if the pair is truncated or the encoding
    /// is not a defined ARMv4T Thumb instruction.
    pub fn decode(first: u16, second: Option<u16>, address: u32) -> Option<ThumbInsn> {
        let half = |mnemonic, operands| {
            Some(ThumbInsn {
                address,
                size: 2,
                raw: first as u32,
                mnemonic,
                condition: Condition::Al,
                operands,
                groups: Groups::empty(),
            })
        };
        let rd = Reg::from_field(first & 7);
        let rs = Reg::from_field((first >> 3) & 7);

        match first >> 13 {
            0b000 => {
                match (first >> 11) & 3 {
                    // Move shifted register
                    0b00 | 0b01 | 0b10 => {
                        let mnemonic = match (first >> 11) & 3 {
                            0b00 => Mnemonic::Lsl,
                            0b01 => Mnemonic::Lsr,
                            _ => Mnemonic::Asr,
                        };
                        let imm5 = ((first >> 6) & 0x1F) as u32;
                        half(
                            mnemonic,
                            vec![Operand::Reg(rd), Operand::Reg(rs), Operand::Imm(imm5)],
                        )
                    }
                    // Add/subtract, register or 3-bit immediate
                    _ => {
                        let mnemonic = if first & (1 << 9) == 0 {
                            Mnemonic::Add
                        } else {
                            Mnemonic::Sub
                        };
                        let field = (first >> 6) & 7;
                        let third = if first & (1 << 10) == 0 {
                            Operand::Reg(Reg::from_field(field))
                        } else {
                            Operand::Imm(field as u32)
                        };
                        half(mnemonic, vec![Operand::Reg(rd), Operand::Reg(rs), third])
                    }
                }
            }
            // Move/compare/add/subtract with 8-bit immediate
            0b001 => {
                let mnemonic = match (first >> 11) & 3 {
                    0b00 => Mnemonic::Mov,
                    0b01 => Mnemonic::Cmp,
                    0b10 => Mnemonic::Add,
                    _ => Mnemonic::Sub,
                };
                let rd = Reg::from_field((first >> 8) & 7);
                let imm8 = (first & 0xFF) as u32;
                half(mnemonic, vec![Operand::Reg(rd), Operand::Imm(imm8)])
            }
            0b010 => Self::decode_group_010(first, address, rd, rs),
            0b011 => {
                // Load/store with 5-bit immediate offset
                let imm5 = ((first >> 6) & 0x1F) as i32;
                let (mnemonic, disp) = match (first >> 11) & 3 {
                    0b00 => (Mnemonic::Str, imm5 * 4),
                    0b01 => (Mnemonic::Ldr, imm5 * 4),
                    0b10 => (Mnemonic::Strb, imm5),
                    _ => (Mnemonic::Ldrb, imm5),
                };
                half(
                    mnemonic,
                    vec![
                        Operand::Reg(rd),
                        Operand::Mem {
                            base: rs,
                            offset: MemOffset::Imm(disp),
                        },
                    ],
                )
            }
            0b100 => {
                if first & (1 << 12) == 0 {
                    // Halfword load/store with immediate offset
                    let mnemonic = if first & (1 << 11) == 0 {
                        Mnemonic::Strh
                    } else {
                        Mnemonic::Ldrh
                    };
                    let disp = (((first >> 6) & 0x1F) * 2) as i32;
                    half(
                        mnemonic,
                        vec![
                            Operand::Reg(rd),
                            Operand::Mem {
                                base: rs,
                                offset: MemOffset::Imm(disp),
                            },
                        ],
                    )
                } else {
                    // SP-relative load/store
                    let mnemonic = if first & (1 << 11) == 0 {
                        Mnemonic::Str
                    } else {
                        Mnemonic::Ldr
                    };
                    let rd = Reg::from_field((first >> 8) & 7);
                    let disp = ((first & 0xFF) * 4) as i32;
                    half(
                        mnemonic,
                        vec![
                            Operand::Reg(rd),
                            Operand::Mem {
                                base: Reg::Sp,
                                offset: MemOffset::Imm(disp),
                            },
                        ],
                    )
                }
            }
            0b101 => Self::decode_group_101(first, address),
            0b110 => {
                if first & (1 << 12) == 0 {
                    // Multiple load/store
                    let mnemonic = if first & (1 << 11) == 0 {
                        Mnemonic::Stmia
                    } else {
                        Mnemonic::Ldmia
                    };
                    let rb = Reg::from_field((first >> 8) & 7);
                    let list = RegList(first & 0xFF);
                    half(mnemonic, vec![Operand::Reg(rb), Operand::RegList(list)])
                } else if first >> 8 == 0b1101_1111 {
                    // Software interrupt
                    half(Mnemonic::Swi, vec![Operand::Imm((first & 0xFF) as u32)])
                } else {
                    // Conditional branch; condition 0b1110 is undefined
                    let condition = Condition::from_u16((first >> 8) & 0xF)?;
                    if condition == Condition::Al {
                        return None;
                    }
                    let offset = (first & 0xFF) as i8 as i32 * 2;
                    let target = (address + 4).wrapping_add(offset as u32);
                    Some(ThumbInsn {
                        address,
                        size: 2,
                        raw: first as u32,
                        mnemonic: Mnemonic::B,
                        condition,
                        operands: vec![Operand::Imm(target)],
                        groups: Groups::JUMP,
                    })
                }
            }
            _ => {
                match (first >> 11) & 3 {
                    // Unconditional branch
                    0b00 => {
                        let offset = sign_extend(first as u32 & 0x7FF, 11) * 2;
                        let target = (address + 4).wrapping_add(offset as u32);
                        Some(ThumbInsn {
                            address,
                            size: 2,
                            raw: first as u32,
                            mnemonic: Mnemonic::B,
                            condition: Condition::Al,
                            operands: vec![Operand::Imm(target)],
                            groups: Groups::JUMP,
                        })
                    }
                    // Long branch with link, first half sets up the
                    // high offset, second half must follow
                    0b10 => {
                        let second = second?;
                        if second >> 11 != 0b11111 {
                            return None;
                        }
                        let high = sign_extend(first as u32 & 0x7FF, 11) << 12;
                        let low = ((second & 0x7FF) as i32) << 1;
                        let target = (address + 4).wrapping_add((high + low) as u32);
                        Some(ThumbInsn {
                            address,
                            size: 4,
                            raw: first as u32 | ((second as u32) << 16),
                            mnemonic: Mnemonic::Bl,
                            condition: Condition::Al,
                            operands: vec![Operand::Imm(target)],
                            groups: Groups::CALL,
                        })
                    }
                    // A stray bl suffix or the Thumb-2 blx prefix
                    _ => None,
                }
            }
        }
    }

    fn decode_group_010(first: u16, address: u32, rd: Reg, rs: Reg) -> Option<ThumbInsn> {
        let half = |mnemonic, operands| {
            Some(ThumbInsn {
                address,
                size: 2,
                raw: first as u32,
                mnemonic,
                condition: Condition::Al,
                operands,
                groups: Groups::empty(),
            })
        };
        match (first >> 10) & 7 {
            // ALU operations
            0b000 => {
                let mnemonic = match (first >> 6) & 0xF {
                    0b0000 => Mnemonic::And,
                    0b0001 => Mnemonic::Eor,
                    0b0010 => Mnemonic::Lsl,
                    0b0011 => Mnemonic::Lsr,
                    0b0100 => Mnemonic::Asr,
                    0b0101 => Mnemonic::Adc,
                    0b0110 => Mnemonic::Sbc,
                    0b0111 => Mnemonic::Ror,
                    0b1000 => Mnemonic::Tst,
                    0b1001 => Mnemonic::Neg,
                    0b1010 => Mnemonic::Cmp,
                    0b1011 => Mnemonic::Cmn,
                    0b1100 => Mnemonic::Orr,
                    0b1101 => Mnemonic::Mul,
                    0b1110 => Mnemonic::Bic,
                    _ => Mnemonic::Mvn,
                };
                half(mnemonic, vec![Operand::Reg(rd), Operand::Reg(rs)])
            }
            // Hi-register operations and bx
            0b001 => {
                let h1 = (first >> 7) & 1;
                let h2 = (first >> 6) & 1;
                let rd = Reg::from_field((first & 7) | (h1 << 3));
                let rs = Reg::from_field(((first >> 3) & 7) | (h2 << 3));
                match (first >> 8) & 3 {
                    0b00 => half(Mnemonic::Add, vec![Operand::Reg(rd), Operand::Reg(rs)]),
                    0b01 => half(Mnemonic::Cmp, vec![Operand::Reg(rd), Operand::Reg(rs)]),
                    0b10 => half(Mnemonic::Mov, vec![Operand::Reg(rd), Operand::Reg(rs)]),
                    _ => {
                        if h1 != 0 {
                            return None;
                        }
                        Some(ThumbInsn {
                            address,
                            size: 2,
                            raw: first as u32,
                            mnemonic: Mnemonic::Bx,
                            condition: Condition::Al,
                            operands: vec![Operand::Reg(rs)],
                            groups: Groups::JUMP,
                        })
                    }
                }
            }
            // PC-relative load
            0b010 | 0b011 => {
                let rd = Reg::from_field((first >> 8) & 7);
                let disp = ((first & 0xFF) * 4) as i32;
                half(
                    Mnemonic::Ldr,
                    vec![
                        Operand::Reg(rd),
                        Operand::Mem {
                            base: Reg::Pc,
                            offset: MemOffset::Imm(disp),
                        },
                    ],
                )
            }
            // Load/store with register offset
            _ => {
                let ro = Reg::from_field((first >> 6) & 7);
                let mnemonic = if first & (1 << 9) == 0 {
                    match ((first >> 11) & 1, (first >> 10) & 1) {
                        (0, 0) => Mnemonic::Str,
                        (0, 1) => Mnemonic::Strb,
                        (1, 0) => Mnemonic::Ldr,
                        _ => Mnemonic::Ldrb,
                    }
                } else {
                    match ((first >> 11) & 1, (first >> 10) & 1) {
                        (0, 0) => Mnemonic::Strh,
                        (0, 1) => Mnemonic::Ldsb,
                        (1, 0) => Mnemonic::Ldrh,
                        _ => Mnemonic::Ldsh,
                    }
                };
                half(
                    mnemonic,
                    vec![
                        Operand::Reg(rd),
                        Operand::Mem {
                            base: rs,
                            offset: MemOffset::Index(ro),
                        },
                    ],
                )
            }
        }
    }

    fn decode_group_101(first: u16, address: u32) -> Option<ThumbInsn> {
        let half = |mnemonic, operands| {
            Some(ThumbInsn {
                address,
                size: 2,
                raw: first as u32,
                mnemonic,
                condition: Condition::Al,
                operands,
                groups: Groups::empty(),
            })
        };
        if first & (1 << 12) == 0 {
            // Address calculation relative to pc or sp
            let base = if first & (1 << 11) == 0 {
                Reg::Pc
            } else {
                Reg::Sp
            };
            let rd = Reg::from_field((first >> 8) & 7);
            let imm = ((first & 0xFF) * 4) as u32;
            half(
                Mnemonic::Add,
                vec![Operand::Reg(rd), Operand::Reg(base), Operand::Imm(imm)],
            )
        } else if first >> 8 == 0b1011_0000 {
            // Stack pointer adjustment
            let mnemonic = if first & (1 << 7) == 0 {
                Mnemonic::Add
            } else {
                Mnemonic::Sub
            };
            let imm = ((first & 0x7F) * 4) as u32;
            half(mnemonic, vec![Operand::Reg(Reg::Sp), Operand::Imm(imm)])
        } else if (first >> 9) & 0b11 == 0b10 {
            // Push/pop with the optional lr/pc bit
            let pop = first & (1 << 11) != 0;
            let extra = (first >> 8) & 1;
            let list = if pop {
                RegList((first & 0xFF) | (extra << 15))
            } else {
                RegList((first & 0xFF) | (extra << 14))
            };
            let mnemonic = if pop { Mnemonic::Pop } else { Mnemonic::Push };
            half(mnemonic, vec![Operand::RegList(list)])
        } else {
            None
        }
    }
}

fn sign_extend(value: u32, bits: u32) -> i32 {
    let shift = 32 - bits;
    (value << shift) as i32 >> shift
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn decode(first: u16) -> ThumbInsn {
        ThumbInsn::decode(first, None, 0x0800_0000).expect("halfword decodes")
    }

    #[test]
    fn move_shifted_register_decodes() {
        let insn = decode(0b000_01_00100_001_010); // lsr r2, r1, #4
        assert_eq!(insn.mnemonic, Mnemonic::Lsr);
        assert_eq!(
            insn.operands,
            vec![
                Operand::Reg(Reg::R2),
                Operand::Reg(Reg::R1),
                Operand::Imm(4)
            ]
        );
        assert_eq!(insn.size, 2);
    }

    #[test]
    fn add_subtract_decodes_register_and_immediate_forms() {
        let insn = decode(0b0001_100_010_001_000); // add r0, r1, r2
        assert_eq!(insn.mnemonic, Mnemonic::Add);
        assert_eq!(insn.operands[2], Operand::Reg(Reg::R2));
        let insn = decode(0b0001_111_010_001_000); // sub r0, r1, #2
        assert_eq!(insn.mnemonic, Mnemonic::Sub);
        assert_eq!(insn.operands[2], Operand::Imm(2));
        // The zero immediate keeps its operand slot, the renderer
        // turns it into a register move
        let insn = decode(0b0001_110_000_001_000); // add r0, r1, #0
        assert_eq!(insn.operands[2], Operand::Imm(0));
    }

    #[test]
    fn immediate_operations_decode() {
        let insn = decode(0x2001); // mov r0, #1
        assert_eq!(insn.mnemonic, Mnemonic::Mov);
        assert_eq!(insn.operands, vec![Operand::Reg(Reg::R0), Operand::Imm(1)]);
        let insn = decode(0x2A2A); // cmp r2, #42
        assert_eq!(insn.mnemonic, Mnemonic::Cmp);
        assert_eq!(insn.operands[1], Operand::Imm(42));
    }

    #[test]
    fn alu_operations_decode() {
        let insn = decode(0b010000_1101_001_000); // mul r0, r1
        assert_eq!(insn.mnemonic, Mnemonic::Mul);
        assert_eq!(insn.operands, vec![Operand::Reg(Reg::R0), Operand::Reg(Reg::R1)]);
        let insn = decode(0b010000_1001_011_100); // neg r4, r3
        assert_eq!(insn.mnemonic, Mnemonic::Neg);
    }

    #[test]
    fn hi_register_operations_reach_the_upper_bank() {
        let insn = decode(0b010001_00_0_1_110_000); // add r0, lr
        assert_eq!(insn.mnemonic, Mnemonic::Add);
        assert_eq!(insn.operands, vec![Operand::Reg(Reg::R0), Operand::Reg(Reg::Lr)]);
        let insn = decode(0b010001_10_1_1_000_000); // mov r8, r8
        assert_eq!(insn.mnemonic, Mnemonic::Mov);
        assert_eq!(insn.operands, vec![Operand::Reg(Reg::R8), Operand::Reg(Reg::R8)]);
    }

    #[test]
    fn bx_decodes_as_a_jump() {
        let insn = decode(0x4770); // bx lr
        assert_eq!(insn.mnemonic, Mnemonic::Bx);
        assert_eq!(insn.operands, vec![Operand::Reg(Reg::Lr)]);
        assert!(insn.groups.contains(Groups::JUMP));
        assert!(!insn.groups.contains(Groups::CALL));
    }

    #[test]
    fn pc_relative_load_decodes() {
        let insn = decode(0x4801); // ldr r0, [pc, #4]
        assert_eq!(insn.mnemonic, Mnemonic::Ldr);
        assert_eq!(
            insn.operands[1],
            Operand::Mem {
                base: Reg::Pc,
                offset: MemOffset::Imm(4)
            }
        );
    }

    #[test]
    fn register_offset_loads_and_stores_decode() {
        let insn = decode(0b0101_00_0_010_001_000); // str r0, [r1, r2]
        assert_eq!(insn.mnemonic, Mnemonic::Str);
        assert_eq!(
            insn.operands[1],
            Operand::Mem {
                base: Reg::R1,
                offset: MemOffset::Index(Reg::R2)
            }
        );
        let insn = decode(0b0101_11_1_010_001_000); // ldsh r0, [r1, r2]
        assert_eq!(insn.mnemonic, Mnemonic::Ldsh);
    }

    #[test]
    fn immediate_offset_loads_scale_by_access_size() {
        let insn = decode(0b011_0_1_00011_001_000); // ldr r0, [r1, #12]
        assert_eq!(insn.mnemonic, Mnemonic::Ldr);
        assert_eq!(
            insn.operands[1],
            Operand::Mem {
                base: Reg::R1,
                offset: MemOffset::Imm(12)
            }
        );
        let insn = decode(0b1000_1_00011_001_000); // ldrh r0, [r1, #6]
        assert_eq!(insn.mnemonic, Mnemonic::Ldrh);
        assert_eq!(
            insn.operands[1],
            Operand::Mem {
                base: Reg::R1,
                offset: MemOffset::Imm(6)
            }
        );
        let insn = decode(0b1001_1_010_00000010); // ldr r2, [sp, #8]
        assert_eq!(
            insn.operands[1],
            Operand::Mem {
                base: Reg::Sp,
                offset: MemOffset::Imm(8)
            }
        );
    }

    #[test]
    fn stack_adjustment_decodes_signed() {
        let insn = decode(0xB082); // sub sp, #8
        assert_eq!(insn.mnemonic, Mnemonic::Sub);
        assert_eq!(insn.operands, vec![Operand::Reg(Reg::Sp), Operand::Imm(8)]);
        let insn = decode(0xB002); // add sp, #8
        assert_eq!(insn.mnemonic, Mnemonic::Add);
    }

    #[test]
    fn push_and_pop_carry_the_extra_bit() {
        let insn = decode(0xB510); // push {r4, lr}
        assert_eq!(insn.mnemonic, Mnemonic::Push);
        match insn.operands[0] {
            Operand::RegList(list) => {
                assert!(list.contains(Reg::R4));
                assert!(list.contains(Reg::Lr));
                assert!(!list.contains(Reg::Pc));
            }
            ref op => panic!("unexpected operand {:?}", op),
        }
        let insn = decode(0xBD10); // pop {r4, pc}
        assert_eq!(insn.mnemonic, Mnemonic::Pop);
        match insn.operands[0] {
            Operand::RegList(list) => {
                assert!(list.contains(Reg::R4));
                assert!(list.contains(Reg::Pc));
            }
            ref op => panic!("unexpected operand {:?}", op),
        }
    }

    #[test]
    fn conditional_branches_resolve_their_targets() {
        // beq +4 at 0x08000010 -> 0x08000018
        let insn = ThumbInsn::decode(0xD002, None, 0x0800_0010).unwrap();
        assert_eq!(insn.mnemonic, Mnemonic::B);
        assert_eq!(insn.condition, Condition::Eq);
        assert_eq!(insn.operands, vec![Operand::Imm(0x0800_0018)]);
        assert!(insn.groups.contains(Groups::JUMP));
        // Backwards branch
        let insn = ThumbInsn::decode(0xD1FC, None, 0x0800_0010).unwrap();
        assert_eq!(insn.condition, Condition::Ne);
        assert_eq!(insn.operands, vec![Operand::Imm(0x0800_000C)]);
    }

    #[test]
    fn unconditional_branch_is_condition_al() {
        let insn = ThumbInsn::decode(0xE002, None, 0x0800_0000).unwrap();
        assert_eq!(insn.mnemonic, Mnemonic::B);
        assert_eq!(insn.condition, Condition::Al);
        assert_eq!(insn.operands, vec![Operand::Imm(0x0800_0008)]);
    }

    #[test]
    fn bl_pairs_into_a_four_byte_instruction() {
        // bl +0x40 at 0x08000000: prefix F000, suffix F81E
        let insn = ThumbInsn::decode(0xF000, Some(0xF81E), 0x0800_0000).unwrap();
        assert_eq!(insn.mnemonic, Mnemonic::Bl);
        assert_eq!(insn.size, 4);
        assert_eq!(insn.operands, vec![Operand::Imm(0x0800_0040)]);
        assert!(insn.groups.contains(Groups::CALL));
    }

    #[test]
    fn truncated_or_undefined_encodings_fail() {
        // bl prefix without its suffix
        assert!(ThumbInsn::decode(0xF000, None, 0x0800_0000).is_none());
        assert!(ThumbInsn::decode(0xF000, Some(0x2001), 0x0800_0000).is_none());
        // condition 0b1110 is undefined
        assert!(ThumbInsn::decode(0xDE00, None, 0x0800_0000).is_none());
        // bx with h1 set is undefined on ARMv4T
        assert!(ThumbInsn::decode(0b010001_11_1_0_111_000, None, 0x0800_0000).is_none());
        // 0b10111001 hole in the misc group
        assert!(ThumbInsn::decode(0xB900, None, 0x0800_0000).is_none());
    }

    proptest! {
        #[test]
        fn decoded_halfwords_report_their_own_address(raw in 0u16..0xE800, address in 0u32..0x100) {
            let address = 0x0800_0000 + address * 2;
            if let Some(insn) = ThumbInsn::decode(raw, None, address) {
                prop_assert_eq!(insn.address, address);
                prop_assert_eq!(insn.size, 2);
                prop_assert!(!insn.operands.is_empty());
            }
        }

        #[test]
        fn register_fields_round_trip(reg: Reg) {
            prop_assert_eq!(Reg::from_field(reg.index() as u16), reg);
            prop_assert_eq!(reg.name().len() >= 2, true);
        }
    }
}
