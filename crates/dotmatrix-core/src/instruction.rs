//! Decoded instruction model for the LR35902.
//!
//! Opcodes decode into small value types carrying everything the executor
//! needs: the operation, its register/immediate selectors and the T-cycle
//! cost. Decoding is total over both opcode pages; the eleven unmapped
//! primary opcodes surface as [`IllegalOpcode`] instead of a variant.

use thiserror::Error;

/// Opcode byte with no mapped instruction.
///
/// Fatal when it reaches the CPU: execution cannot continue past a byte the
/// hardware itself would lock up on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("illegal opcode {0:#04x}")]
pub struct IllegalOpcode(pub u8);

/// 8-bit operand in the 3-bit selector encoding shared by loads, the ALU
/// block and the CB page. Selector `0b110` addresses memory at HL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    B,
    C,
    D,
    E,
    H,
    L,
    HlMem,
    A,
}

impl Operand {
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0x07 {
            0 => Operand::B,
            1 => Operand::C,
            2 => Operand::D,
            3 => Operand::E,
            4 => Operand::H,
            5 => Operand::L,
            6 => Operand::HlMem,
            _ => Operand::A,
        }
    }

    pub const fn is_mem(self) -> bool {
        matches!(self, Operand::HlMem)
    }
}

/// 16-bit register pair in the 2-bit encoding used by LD rr,nn / INC rr /
/// DEC rr / ADD HL,rr.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reg16 {
    Bc,
    De,
    Hl,
    Sp,
}

impl Reg16 {
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => Reg16::Bc,
            1 => Reg16::De,
            2 => Reg16::Hl,
            _ => Reg16::Sp,
        }
    }
}

/// 16-bit register pair in the PUSH/POP encoding, where selector 3 is AF.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackReg {
    Bc,
    De,
    Hl,
    Af,
}

impl StackReg {
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => StackReg::Bc,
            1 => StackReg::De,
            2 => StackReg::Hl,
            _ => StackReg::Af,
        }
    }
}

/// Branch condition from opcode bits 4:3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cond {
    Nz,
    Z,
    Nc,
    C,
}

impl Cond {
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => Cond::Nz,
            1 => Cond::Z,
            2 => Cond::Nc,
            _ => Cond::C,
        }
    }
}

/// ALU operation from bits 5:3 of the 0x80-0xBF block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AluOp {
    Add,
    Adc,
    Sub,
    Sbc,
    And,
    Xor,
    Or,
    Cp,
}

impl AluOp {
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0x07 {
            0 => AluOp::Add,
            1 => AluOp::Adc,
            2 => AluOp::Sub,
            3 => AluOp::Sbc,
            4 => AluOp::And,
            5 => AluOp::Xor,
            6 => AluOp::Or,
            _ => AluOp::Cp,
        }
    }
}

/// Addressing forms used by the accumulator load/store family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indirect {
    Bc,
    De,
    /// (HL), then HL += 1
    HlInc,
    /// (HL), then HL -= 1
    HlDec,
    /// 16-bit immediate address
    Abs,
    /// 0xFF00 + 8-bit immediate
    HighAbs,
    /// 0xFF00 + C
    HighC,
}

/// T-cycle cost of an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cycles {
    Fixed(u32),
    Branch { not_taken: u32, taken: u32 },
}

/// A decoded primary-page instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    Nop,
    Stop,
    Halt,
    Di,
    Ei,
    Scf,
    Ccf,
    Cpl,
    Daa,
    Rlca,
    Rrca,
    Rla,
    Rra,
    /// LD r,r' / LD r,(HL) / LD (HL),r
    Ld { dst: Operand, src: Operand },
    /// LD r,n / LD (HL),n
    LdImm { dst: Operand },
    /// LD A,(..)
    LdAFrom(Indirect),
    /// LD (..),A
    LdAInto(Indirect),
    /// LD rr,nn
    LdImm16 { dst: Reg16 },
    /// LD SP,HL
    LdSpHl,
    /// LD HL,SP+e
    LdHlSpOffset,
    /// LD (nn),SP
    StoreSp,
    /// ALU A,r / ALU A,(HL)
    Alu { op: AluOp, src: Operand },
    /// ALU A,n
    AluImm { op: AluOp },
    Inc(Operand),
    Dec(Operand),
    Inc16(Reg16),
    Dec16(Reg16),
    AddHl(Reg16),
    /// ADD SP,e
    AddSp,
    Push(StackReg),
    Pop(StackReg),
    Jp { cond: Option<Cond> },
    JpHl,
    Jr { cond: Option<Cond> },
    Call { cond: Option<Cond> },
    Ret { cond: Option<Cond> },
    Reti,
    /// RST to the embedded target address (0x00, 0x08, .., 0x38).
    Rst(u16),
    /// 0xCB: the following byte selects a [`CbInstruction`].
    Prefix,
}

/// Operation selected by the high bits of a CB-page opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CbOp {
    Rlc,
    Rrc,
    Rl,
    Rr,
    Sla,
    Sra,
    Swap,
    Srl,
    Bit(u8),
    Res(u8),
    Set(u8),
}

/// A decoded CB-page instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CbInstruction {
    pub op: CbOp,
    pub target: Operand,
}

impl Instruction {
    /// T-cycle cost of this instruction, including operand fetches.
    /// `Prefix` reports only the prefix fetch; the CB instruction's
    /// [`CbInstruction::cycles`] covers the full two-byte sequence.
    pub const fn cycles(self) -> Cycles {
        use Instruction::*;
        let fixed = match self {
            Nop | Stop | Halt | Di | Ei | Scf | Ccf | Cpl | Daa => 4,
            Rlca | Rrca | Rla | Rra => 4,
            Ld { dst, src } => {
                if dst.is_mem() || src.is_mem() {
                    8
                } else {
                    4
                }
            }
            LdImm { dst } => {
                if dst.is_mem() {
                    12
                } else {
                    8
                }
            }
            LdAFrom(ind) | LdAInto(ind) => match ind {
                Indirect::Abs => 16,
                Indirect::HighAbs => 12,
                _ => 8,
            },
            LdImm16 { .. } => 12,
            LdSpHl => 8,
            LdHlSpOffset => 12,
            StoreSp => 20,
            Alu { src, .. } => {
                if src.is_mem() {
                    8
                } else {
                    4
                }
            }
            AluImm { .. } => 8,
            Inc(op) | Dec(op) => {
                if op.is_mem() {
                    12
                } else {
                    4
                }
            }
            Inc16(_) | Dec16(_) | AddHl(_) => 8,
            AddSp => 16,
            Push(_) => 16,
            Pop(_) => 12,
            Jp { cond: None } => 16,
            Jp { cond: Some(_) } => {
                return Cycles::Branch {
                    not_taken: 12,
                    taken: 16,
                };
            }
            JpHl => 4,
            Jr { cond: None } => 12,
            Jr { cond: Some(_) } => {
                return Cycles::Branch {
                    not_taken: 8,
                    taken: 12,
                };
            }
            Call { cond: None } => 24,
            Call { cond: Some(_) } => {
                return Cycles::Branch {
                    not_taken: 12,
                    taken: 24,
                };
            }
            Ret { cond: None } => 16,
            Ret { cond: Some(_) } => {
                return Cycles::Branch {
                    not_taken: 8,
                    taken: 20,
                };
            }
            Reti => 16,
            Rst(_) => 16,
            Prefix => 4,
        };
        Cycles::Fixed(fixed)
    }
}

impl CbInstruction {
    /// T-cycle cost including the 0xCB prefix fetch.
    pub const fn cycles(self) -> u32 {
        if self.target.is_mem() {
            // BIT only reads the memory operand; RES/SET and the
            // rotate/shift group read-modify-write it.
            match self.op {
                CbOp::Bit(_) => 12,
                _ => 16,
            }
        } else {
            8
        }
    }
}

/// Decode a primary-page opcode. Total: every byte either maps to an
/// [`Instruction`] or is one of the eleven illegal opcodes.
pub fn decode(opcode: u8) -> Result<Instruction, IllegalOpcode> {
    use Instruction::*;
    let insn = match opcode {
        0x00 => Nop,
        0x10 => Stop,
        0x76 => Halt,
        0xF3 => Di,
        0xFB => Ei,
        0x37 => Scf,
        0x3F => Ccf,
        0x2F => Cpl,
        0x27 => Daa,
        0x07 => Rlca,
        0x0F => Rrca,
        0x17 => Rla,
        0x1F => Rra,
        0x01 | 0x11 | 0x21 | 0x31 => LdImm16 {
            dst: Reg16::from_bits(opcode >> 4),
        },
        0x02 => LdAInto(Indirect::Bc),
        0x12 => LdAInto(Indirect::De),
        0x22 => LdAInto(Indirect::HlInc),
        0x32 => LdAInto(Indirect::HlDec),
        0x0A => LdAFrom(Indirect::Bc),
        0x1A => LdAFrom(Indirect::De),
        0x2A => LdAFrom(Indirect::HlInc),
        0x3A => LdAFrom(Indirect::HlDec),
        0x08 => StoreSp,
        0x03 | 0x13 | 0x23 | 0x33 => Inc16(Reg16::from_bits(opcode >> 4)),
        0x0B | 0x1B | 0x2B | 0x3B => Dec16(Reg16::from_bits(opcode >> 4)),
        0x09 | 0x19 | 0x29 | 0x39 => AddHl(Reg16::from_bits(opcode >> 4)),
        0x04 | 0x0C | 0x14 | 0x1C | 0x24 | 0x2C | 0x34 | 0x3C => {
            Inc(Operand::from_bits(opcode >> 3))
        }
        0x05 | 0x0D | 0x15 | 0x1D | 0x25 | 0x2D | 0x35 | 0x3D => {
            Dec(Operand::from_bits(opcode >> 3))
        }
        0x06 | 0x0E | 0x16 | 0x1E | 0x26 | 0x2E | 0x36 | 0x3E => LdImm {
            dst: Operand::from_bits(opcode >> 3),
        },
        0x18 => Jr { cond: None },
        0x20 | 0x28 | 0x30 | 0x38 => Jr {
            cond: Some(Cond::from_bits(opcode >> 3)),
        },
        // 0x76 (the HL-indirect diagonal) is HALT, matched above.
        0x40..=0x7F => Ld {
            dst: Operand::from_bits(opcode >> 3),
            src: Operand::from_bits(opcode),
        },
        0x80..=0xBF => Alu {
            op: AluOp::from_bits(opcode >> 3),
            src: Operand::from_bits(opcode),
        },
        0xC6 | 0xCE | 0xD6 | 0xDE | 0xE6 | 0xEE | 0xF6 | 0xFE => AluImm {
            op: AluOp::from_bits(opcode >> 3),
        },
        0xC0 | 0xC8 | 0xD0 | 0xD8 => Ret {
            cond: Some(Cond::from_bits(opcode >> 3)),
        },
        0xC9 => Ret { cond: None },
        0xD9 => Reti,
        0xC1 | 0xD1 | 0xE1 | 0xF1 => Pop(StackReg::from_bits(opcode >> 4)),
        0xC5 | 0xD5 | 0xE5 | 0xF5 => Push(StackReg::from_bits(opcode >> 4)),
        0xC2 | 0xCA | 0xD2 | 0xDA => Jp {
            cond: Some(Cond::from_bits(opcode >> 3)),
        },
        0xC3 => Jp { cond: None },
        0xE9 => JpHl,
        0xC4 | 0xCC | 0xD4 | 0xDC => Call {
            cond: Some(Cond::from_bits(opcode >> 3)),
        },
        0xCD => Call { cond: None },
        0xC7 | 0xCF | 0xD7 | 0xDF | 0xE7 | 0xEF | 0xF7 | 0xFF => Rst((opcode & 0x38) as u16),
        0xCB => Prefix,
        0xE0 => LdAInto(Indirect::HighAbs),
        0xF0 => LdAFrom(Indirect::HighAbs),
        0xE2 => LdAInto(Indirect::HighC),
        0xF2 => LdAFrom(Indirect::HighC),
        0xEA => LdAInto(Indirect::Abs),
        0xFA => LdAFrom(Indirect::Abs),
        0xE8 => AddSp,
        0xF8 => LdHlSpOffset,
        0xF9 => LdSpHl,
        _ => return Err(IllegalOpcode(opcode)),
    };
    Ok(insn)
}

/// Decode a CB-page opcode. All 256 bytes are mapped.
pub fn decode_cb(opcode: u8) -> CbInstruction {
    let target = Operand::from_bits(opcode);
    let bit = (opcode >> 3) & 0x07;
    let op = match opcode {
        0x00..=0x07 => CbOp::Rlc,
        0x08..=0x0F => CbOp::Rrc,
        0x10..=0x17 => CbOp::Rl,
        0x18..=0x1F => CbOp::Rr,
        0x20..=0x27 => CbOp::Sla,
        0x28..=0x2F => CbOp::Sra,
        0x30..=0x37 => CbOp::Swap,
        0x38..=0x3F => CbOp::Srl,
        0x40..=0x7F => CbOp::Bit(bit),
        0x80..=0xBF => CbOp::Res(bit),
        0xC0..=0xFF => CbOp::Set(bit),
    };
    CbInstruction { op, target }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ILLEGAL: [u8; 11] = [
        0xD3, 0xDB, 0xDD, 0xE3, 0xE4, 0xEB, 0xEC, 0xED, 0xF4, 0xFC, 0xFD,
    ];

    #[test]
    fn primary_page_is_total() {
        for opcode in 0u16..=0xFF {
            let opcode = opcode as u8;
            let decoded = decode(opcode);
            if ILLEGAL.contains(&opcode) {
                assert_eq!(decoded, Err(IllegalOpcode(opcode)));
            } else {
                assert!(decoded.is_ok(), "opcode {opcode:#04x} failed to decode");
            }
        }
    }

    #[test]
    fn cb_page_is_total_and_costed() {
        for opcode in 0u16..=0xFF {
            let insn = decode_cb(opcode as u8);
            let cycles = insn.cycles();
            if insn.target.is_mem() {
                match insn.op {
                    CbOp::Bit(_) => assert_eq!(cycles, 12),
                    _ => assert_eq!(cycles, 16),
                }
            } else {
                assert_eq!(cycles, 8);
            }
        }
    }

    #[test]
    fn ld_block_selectors() {
        assert_eq!(
            decode(0x41).unwrap(),
            Instruction::Ld {
                dst: Operand::B,
                src: Operand::C
            }
        );
        assert_eq!(
            decode(0x6E).unwrap(),
            Instruction::Ld {
                dst: Operand::L,
                src: Operand::HlMem
            }
        );
        assert_eq!(
            decode(0x77).unwrap(),
            Instruction::Ld {
                dst: Operand::HlMem,
                src: Operand::A
            }
        );
        assert_eq!(decode(0x76).unwrap(), Instruction::Halt);
    }

    #[test]
    fn alu_block_selectors() {
        assert_eq!(
            decode(0x80).unwrap(),
            Instruction::Alu {
                op: AluOp::Add,
                src: Operand::B
            }
        );
        assert_eq!(
            decode(0x9E).unwrap(),
            Instruction::Alu {
                op: AluOp::Sbc,
                src: Operand::HlMem
            }
        );
        assert_eq!(
            decode(0xBF).unwrap(),
            Instruction::Alu {
                op: AluOp::Cp,
                src: Operand::A
            }
        );
    }

    #[test]
    fn conditional_encodings() {
        assert_eq!(decode(0xC0).unwrap(), Instruction::Ret { cond: Some(Cond::Nz) });
        assert_eq!(decode(0xC8).unwrap(), Instruction::Ret { cond: Some(Cond::Z) });
        assert_eq!(decode(0xD0).unwrap(), Instruction::Ret { cond: Some(Cond::Nc) });
        assert_eq!(decode(0xD8).unwrap(), Instruction::Ret { cond: Some(Cond::C) });
        assert_eq!(decode(0xDA).unwrap(), Instruction::Jp { cond: Some(Cond::C) });
        assert_eq!(decode(0xCC).unwrap(), Instruction::Call { cond: Some(Cond::Z) });
    }

    #[test]
    fn rst_targets() {
        for n in 0u16..8 {
            let opcode = 0xC7 + (n as u8) * 8;
            assert_eq!(decode(opcode).unwrap(), Instruction::Rst(n * 8));
        }
    }

    #[test]
    fn branch_cycle_pairs() {
        assert_eq!(
            decode(0x20).unwrap().cycles(),
            Cycles::Branch {
                not_taken: 8,
                taken: 12
            }
        );
        assert_eq!(
            decode(0xC4).unwrap().cycles(),
            Cycles::Branch {
                not_taken: 12,
                taken: 24
            }
        );
        assert_eq!(decode(0xC3).unwrap().cycles(), Cycles::Fixed(16));
        assert_eq!(decode(0x00).unwrap().cycles(), Cycles::Fixed(4));
        assert_eq!(decode(0x36).unwrap().cycles(), Cycles::Fixed(12));
        assert_eq!(decode(0x08).unwrap().cycles(), Cycles::Fixed(20));
    }
}
