//! The `0F 38 xx` and `0F 3A xx` three-byte opcode maps (SDM Vol. 2 tables
//! A-4/A-5), legacy-encoded. A representative subset: `PSHUFB`, `MOVBE`,
//! and `PALIGNR`; anything else falls through to `UnknownOpcode`, same as
//! an unrecognized `0F xx` entry.

use super::{finish, operand_width, pointer_size_for_width};
use crate::error::{DecodeError, Result};
use crate::instruction::Instruction;
use crate::modrm::{read_rm_operand, reg_operand, ModRm};
use crate::opcode::Opcode;
use crate::operand::{Immediate, Operand, PointerSize};
use crate::prefixes::Prefixes;
use crate::reader::ByteReader;
use crate::register::{vector_from_code, OperandWidth, Register, VectorWidth};

fn xmm_rm(reader: &mut ByteReader, prefixes: &Prefixes) -> Result<(ModRm, Operand)> {
    read_rm_operand(reader, prefixes, OperandWidth::Bits64, PointerSize::Xmmword)
        .map(|(m, op)| (m, vectorize(op)))
}

/// `read_rm_operand` resolves register-direct operands through the GPR
/// table; these are vector instructions, so remap by register number.
fn vectorize(op: Operand) -> Operand {
    match op {
        Operand::Register(r) => {
            if let Some(code) = gpr_code(&r) {
                Operand::Register(vector_from_code(code, VectorWidth::Xmm))
            } else {
                Operand::Register(r)
            }
        }
        other => other,
    }
}

fn gpr_code(r: &Register) -> Option<u8> {
    use crate::register::Gpr64;
    if let Register::Gpr64(g) = r {
        Some(match g {
            Gpr64::Rax => 0, Gpr64::Rcx => 1, Gpr64::Rdx => 2, Gpr64::Rbx => 3,
            Gpr64::Rsp => 4, Gpr64::Rbp => 5, Gpr64::Rsi => 6, Gpr64::Rdi => 7,
            Gpr64::R8 => 8, Gpr64::R9 => 9, Gpr64::R10 => 10, Gpr64::R11 => 11,
            Gpr64::R12 => 12, Gpr64::R13 => 13, Gpr64::R14 => 14, Gpr64::R15 => 15,
            Gpr64::Rip => return None,
        })
    } else {
        None
    }
}

fn xmm_reg(modrm: ModRm, prefixes: &Prefixes) -> Operand {
    let code = modrm.reg_index(prefixes);
    Operand::Register(vector_from_code(code, VectorWidth::Xmm))
}

/// `0F 38 xx`: table A-4.
pub fn decode_0f38(reader: &mut ByteReader, prefixes: &Prefixes, start: usize) -> Result<Instruction> {
    let b2 = reader.read_u8()?;
    match b2 {
        0x00 => {
            let (modrm, rm) = xmm_rm(reader, prefixes)?;
            let reg = xmm_reg(modrm, prefixes);
            finish(reader, prefixes, Opcode::Pshufb, vec![reg, rm], start)
        }
        0xF0 | 0xF1 => {
            let w = operand_width(prefixes);
            let (modrm, rm) = read_rm_operand(reader, prefixes, w, pointer_size_for_width(w))?;
            let reg = reg_operand(modrm, prefixes, w)?;
            let operands = if b2 == 0xF0 { vec![reg, rm] } else { vec![rm, reg] };
            finish(reader, prefixes, Opcode::Movbe, operands, start)
        }
        _ => Err(DecodeError::UnknownOpcode { bytes: vec![0x0F, 0x38, b2] }),
    }
}

/// `0F 3A xx`: table A-5.
pub fn decode_0f3a(reader: &mut ByteReader, prefixes: &Prefixes, start: usize) -> Result<Instruction> {
    let b2 = reader.read_u8()?;
    match b2 {
        0x0F => {
            let (modrm, rm) = xmm_rm(reader, prefixes)?;
            let reg = xmm_reg(modrm, prefixes);
            let imm = reader.read_u8()?;
            let operands = vec![reg, rm, Operand::Immediate(Immediate::from_u8(imm))];
            finish(reader, prefixes, Opcode::Palignr, operands, start)
        }
        _ => Err(DecodeError::UnknownOpcode { bytes: vec![0x0F, 0x3A, b2] }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prefixes::scan_prefixes;

    fn decode(bytes: &[u8]) -> Instruction {
        let mut r = ByteReader::new(bytes);
        let prefixes = scan_prefixes(&mut r, true).unwrap();
        let b0 = r.read_u8().unwrap();
        assert_eq!(b0, 0x0F);
        let b1 = r.read_u8().unwrap();
        match b1 {
            0x38 => decode_0f38(&mut r, &prefixes, 0).unwrap(),
            0x3A => decode_0f3a(&mut r, &prefixes, 0).unwrap(),
            _ => panic!("not a three-byte opcode"),
        }
    }

    #[test]
    fn pshufb_register_direct() {
        let insn = decode(&[0x66, 0x0F, 0x38, 0x00, 0xC1]);
        assert_eq!(insn.opcode, Opcode::Pshufb);
        assert_eq!(insn.op1, Some(Operand::Register(vector_from_code(0, VectorWidth::Xmm))));
        assert_eq!(insn.op2, Some(Operand::Register(vector_from_code(1, VectorWidth::Xmm))));
    }

    #[test]
    fn movbe_load_from_memory() {
        let insn = decode(&[0x0F, 0x38, 0xF0, 0x00]);
        assert_eq!(insn.opcode, Opcode::Movbe);
        assert!(matches!(insn.op2, Some(Operand::Indirect(_))));
    }

    #[test]
    fn palignr_reads_trailing_immediate() {
        let insn = decode(&[0x66, 0x0F, 0x3A, 0x0F, 0xC1, 0x05]);
        assert_eq!(insn.opcode, Opcode::Palignr);
        assert_eq!(insn.length, 6);
    }
}
