//! The `0F xx` two-byte opcode table, including the conditional families
//! and a representative SSE/SSE2 subset modulated by the `66`/`F2`/`F3`
//! mandatory-prefix bytes. `0F 38 xx` and `0F 3A xx` are delegated whole to
//! [`crate::decode::threebyte`]'s tables A-4/A-5 parsers.

use super::{finish, operand_width, pointer_size_for_width};
use crate::decode::groups;
use crate::decode::threebyte;
use crate::error::{DecodeError, Result};
use crate::instruction::Instruction;
use crate::modrm::{read_rm_operand, reg_operand, ModRm};
use crate::opcode::{Condition, Opcode};
use crate::operand::{Immediate, Operand, PointerSize};
use crate::prefixes::Prefixes;
use crate::reader::ByteReader;
use crate::register::{OperandWidth, VectorWidth};

/// Picks among four SSE mnemonics by the mandatory-prefix byte the legacy
/// scan recorded: none, `66`, `F3`, `F2`.
fn by_mandatory_prefix(prefixes: &Prefixes, none: Opcode, p66: Opcode, f3: Opcode, f2: Opcode) -> Opcode {
    use crate::prefixes::Group1;
    if prefixes.operand_size_override {
        p66
    } else {
        match prefixes.group1 {
            Some(Group1::Rep) => f3,
            Some(Group1::Repnz) => f2,
            _ => none,
        }
    }
}

fn xmm_rm(reader: &mut ByteReader, prefixes: &Prefixes) -> Result<(ModRm, Operand)> {
    read_rm_operand(reader, prefixes, OperandWidth::Bits64, PointerSize::Xmmword)
        .map(|(m, op)| (m, vectorize(op)))
}

/// `read_rm_operand` resolves register-direct operands through the GPR
/// table; vector instructions need XMM registers instead, so direct
/// register results are remapped here by register number.
fn vectorize(op: Operand) -> Operand {
    match op {
        Operand::Register(r) => {
            if let Some(code) = gpr_code(&r) {
                Operand::Register(crate::register::vector_from_code(code, VectorWidth::Xmm))
            } else {
                Operand::Register(r)
            }
        }
        other => other,
    }
}

fn gpr_code(r: &crate::register::Register) -> Option<u8> {
    use crate::register::{Gpr64, Register};
    // `read_rm_operand` always resolves direct operands through the 64-bit
    // GPR family when called at Bits64; map each back to its 0..15 code.
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
    Operand::Register(crate::register::vector_from_code(code, VectorWidth::Xmm))
}

fn two_operand_sse(reader: &mut ByteReader, prefixes: &Prefixes, opcode: Opcode, reg_is_dest: bool, start: usize) -> Result<Instruction> {
    let (modrm, rm) = xmm_rm(reader, prefixes)?;
    let reg = xmm_reg(modrm, prefixes);
    let operands = if reg_is_dest { vec![reg, rm] } else { vec![rm, reg] };
    finish(reader, prefixes, opcode, operands, start)
}

pub fn decode(reader: &mut ByteReader, prefixes: &Prefixes, start: usize) -> Result<Instruction> {
    let b1 = reader.read_u8()?;
    match b1 {
        0x00 | 0x01 => groups::group7(reader, prefixes, b1, start),
        0x05 => finish(reader, prefixes, Opcode::Syscall, vec![], start),
        0x07 => finish(reader, prefixes, Opcode::Sysret, vec![], start),
        0x0B => finish(reader, prefixes, Opcode::Ud2, vec![], start),
        0x10 | 0x11 => {
            let opcode = by_mandatory_prefix(prefixes, Opcode::Movups, Opcode::Movupd, Opcode::Movss, Opcode::Movsd);
            two_operand_sse(reader, prefixes, opcode, b1 == 0x10, start)
        }
        0x18 => groups::group16(reader, prefixes, start),
        0x38 => threebyte::decode_0f38(reader, prefixes, start),
        0x3A => threebyte::decode_0f3a(reader, prefixes, start),
        0x1F => {
            // multi-byte NOP; operand is consumed but not surfaced.
            let w = operand_width(prefixes);
            let (_, _rm) = read_rm_operand(reader, prefixes, w, pointer_size_for_width(w))?;
            finish(reader, prefixes, Opcode::Nop, vec![], start)
        }
        0x28 | 0x29 => {
            let opcode = if prefixes.operand_size_override { Opcode::Movapd } else { Opcode::Movaps };
            two_operand_sse(reader, prefixes, opcode, b1 == 0x28, start)
        }
        0x2A => {
            use crate::prefixes::Group1;
            let opcode = match prefixes.group1 {
                Some(Group1::Repnz) => Opcode::Cvtsi2sd,
                _ => Opcode::Cvtsi2ss,
            };
            let w = operand_width(prefixes);
            let (modrm, rm) = read_rm_operand(reader, prefixes, w, pointer_size_for_width(w))?;
            let reg = xmm_reg(modrm, prefixes);
            finish(reader, prefixes, opcode, vec![reg, rm], start)
        }
        0x2C => {
            use crate::prefixes::Group1;
            let opcode = match prefixes.group1 {
                Some(Group1::Repnz) => Opcode::Cvttsd2si,
                _ => Opcode::Cvttss2si,
            };
            let (modrm, rm) = xmm_rm(reader, prefixes)?;
            let w = operand_width(prefixes);
            let reg = reg_operand(modrm, prefixes, w)?;
            finish(reader, prefixes, opcode, vec![reg, rm], start)
        }
        0x2F => {
            let opcode = if prefixes.operand_size_override { Opcode::Comisd } else { Opcode::Comiss };
            two_operand_sse(reader, prefixes, opcode, true, start)
        }
        0x31 => finish(reader, prefixes, Opcode::Rdtsc, vec![], start),
        0x40..=0x4F => {
            let condition = Condition::from_nibble(b1 & 0xF);
            let w = operand_width(prefixes);
            let (modrm, rm) = read_rm_operand(reader, prefixes, w, pointer_size_for_width(w))?;
            let reg = reg_operand(modrm, prefixes, w)?;
            finish(reader, prefixes, Opcode::Cmovcc(condition), vec![reg, rm], start)
        }
        0x58 => two_operand_sse(reader, prefixes, by_mandatory_prefix(prefixes, Opcode::Addps, Opcode::Addpd, Opcode::Addss, Opcode::Addsd), true, start),
        0x59 => two_operand_sse(reader, prefixes, by_mandatory_prefix(prefixes, Opcode::Mulps, Opcode::Mulpd, Opcode::Mulss, Opcode::Mulsd), true, start),
        0x5C => two_operand_sse(reader, prefixes, by_mandatory_prefix(prefixes, Opcode::Subps, Opcode::Subpd, Opcode::Subss, Opcode::Subsd), true, start),
        0x5E => two_operand_sse(reader, prefixes, by_mandatory_prefix(prefixes, Opcode::Divps, Opcode::Divpd, Opcode::Divss, Opcode::Divsd), true, start),
        0x6E => {
            let w = if prefixes.rex.w() { OperandWidth::Bits64 } else { OperandWidth::Bits32 };
            let (modrm, rm) = read_rm_operand(reader, prefixes, w, pointer_size_for_width(w))?;
            let reg = xmm_reg(modrm, prefixes);
            let opcode = if prefixes.rex.w() { Opcode::Movq } else { Opcode::Movd };
            finish(reader, prefixes, opcode, vec![reg, rm], start)
        }
        0x6F => {
            let opcode = if prefixes.group1 == Some(crate::prefixes::Group1::Rep) { Opcode::Movdqu } else { Opcode::Movdqa };
            two_operand_sse(reader, prefixes, opcode, true, start)
        }
        0x71 => groups::group12(reader, prefixes, start),
        0x72 => groups::group13(reader, prefixes, start),
        0x73 => groups::group14(reader, prefixes, start),
        0x7E => {
            let w = if prefixes.rex.w() { OperandWidth::Bits64 } else { OperandWidth::Bits32 };
            let (modrm, rm) = read_rm_operand(reader, prefixes, w, pointer_size_for_width(w))?;
            let reg = xmm_reg(modrm, prefixes);
            let opcode = if prefixes.rex.w() { Opcode::Movq } else { Opcode::Movd };
            finish(reader, prefixes, opcode, vec![rm, reg], start)
        }
        0x7F => {
            let opcode = if prefixes.group1 == Some(crate::prefixes::Group1::Rep) { Opcode::Movdqu } else { Opcode::Movdqa };
            two_operand_sse(reader, prefixes, opcode, false, start)
        }
        0x80..=0x8F => {
            let condition = Condition::from_nibble(b1 & 0xF);
            let rel = reader.read_u32_le()? as i32;
            finish(reader, prefixes, Opcode::Jcc(condition), vec![Operand::Relative(Immediate::from_u32(rel as u32))], start)
        }
        0x90..=0x9F => {
            let condition = Condition::from_nibble(b1 & 0xF);
            let (_, rm) = read_rm_operand(reader, prefixes, OperandWidth::Bits8, PointerSize::Byte)?;
            finish(reader, prefixes, Opcode::Setcc(condition), vec![rm], start)
        }
        0xA2 => finish(reader, prefixes, Opcode::Cpuid, vec![], start),
        0xA3 => bt_family(reader, prefixes, Opcode::Bt, start),
        0xAB => bt_family(reader, prefixes, Opcode::Bts, start),
        0xAE => groups::group15(reader, prefixes, start),
        0xAF => {
            let w = operand_width(prefixes);
            let (modrm, rm) = read_rm_operand(reader, prefixes, w, pointer_size_for_width(w))?;
            let reg = reg_operand(modrm, prefixes, w)?;
            finish(reader, prefixes, Opcode::Imul, vec![reg, rm], start)
        }
        0xB0 | 0xB1 => {
            let w = if b1 == 0xB0 { OperandWidth::Bits8 } else { operand_width(prefixes) };
            let (modrm, rm) = read_rm_operand(reader, prefixes, w, pointer_size_for_width(w))?;
            let reg = reg_operand(modrm, prefixes, w)?;
            finish(reader, prefixes, Opcode::Cmpxchg, vec![rm, reg], start)
        }
        0xB3 => bt_family(reader, prefixes, Opcode::Btr, start),
        0xB6 | 0xB7 => movx(reader, prefixes, b1, Opcode::Movzx, start),
        0xBA => groups::group8(reader, prefixes, start),
        0xBB => bt_family(reader, prefixes, Opcode::Btc, start),
        0xBC => {
            let w = operand_width(prefixes);
            let (modrm, rm) = read_rm_operand(reader, prefixes, w, pointer_size_for_width(w))?;
            let reg = reg_operand(modrm, prefixes, w)?;
            finish(reader, prefixes, Opcode::Bsf, vec![reg, rm], start)
        }
        0xBD => {
            let w = operand_width(prefixes);
            let (modrm, rm) = read_rm_operand(reader, prefixes, w, pointer_size_for_width(w))?;
            let reg = reg_operand(modrm, prefixes, w)?;
            finish(reader, prefixes, Opcode::Bsr, vec![reg, rm], start)
        }
        0xBE | 0xBF => movx(reader, prefixes, b1, Opcode::Movsx, start),
        0xC0 | 0xC1 => {
            let w = if b1 == 0xC0 { OperandWidth::Bits8 } else { operand_width(prefixes) };
            let (modrm, rm) = read_rm_operand(reader, prefixes, w, pointer_size_for_width(w))?;
            let reg = reg_operand(modrm, prefixes, w)?;
            finish(reader, prefixes, Opcode::Xadd, vec![rm, reg], start)
        }
        0xC7 => groups::group9(reader, prefixes, start),
        0xC8..=0xCF => {
            let ext = if prefixes.rex.b() { 8 } else { 0 };
            let w = if prefixes.rex.w() { OperandWidth::Bits64 } else { OperandWidth::Bits32 };
            let code = (b1 & 0x7) | ext;
            let reg = crate::register::gpr_from_code(code, w, true)
                .ok_or(DecodeError::DecodingError("bad bswap register".into()))?;
            finish(reader, prefixes, Opcode::Bswap, vec![Operand::Register(reg)], start)
        }
        0xDB => two_operand_sse(reader, prefixes, Opcode::Pand, true, start),
        0xEB => two_operand_sse(reader, prefixes, Opcode::Por, true, start),
        0xEF => two_operand_sse(reader, prefixes, Opcode::Pxor, true, start),
        0xFC => two_operand_sse(reader, prefixes, Opcode::Paddb, true, start),
        0xFD => two_operand_sse(reader, prefixes, Opcode::Paddw, true, start),
        0xFE => two_operand_sse(reader, prefixes, Opcode::Paddd, true, start),
        0xD4 => two_operand_sse(reader, prefixes, Opcode::Paddq, true, start),
        0xF8 => two_operand_sse(reader, prefixes, Opcode::Psubb, true, start),
        0xF9 => two_operand_sse(reader, prefixes, Opcode::Psubw, true, start),
        0xFA => two_operand_sse(reader, prefixes, Opcode::Psubd, true, start),
        0xFB => two_operand_sse(reader, prefixes, Opcode::Psubq, true, start),
        _ => Err(DecodeError::UnknownOpcode { bytes: vec![0x0F, b1] }),
    }
}

fn bt_family(reader: &mut ByteReader, prefixes: &Prefixes, opcode: Opcode, start: usize) -> Result<Instruction> {
    let w = operand_width(prefixes);
    let (modrm, rm) = read_rm_operand(reader, prefixes, w, pointer_size_for_width(w))?;
    let reg = reg_operand(modrm, prefixes, w)?;
    finish(reader, prefixes, opcode, vec![rm, reg], start)
}

fn movx(reader: &mut ByteReader, prefixes: &Prefixes, b1: u8, opcode: Opcode, start: usize) -> Result<Instruction> {
    let src_width = if b1 & 1 == 0 { OperandWidth::Bits8 } else { OperandWidth::Bits16 };
    let dst_width = operand_width(prefixes);
    let (modrm, rm) = read_rm_operand(reader, prefixes, src_width, pointer_size_for_width(src_width))?;
    let reg = reg_operand(modrm, prefixes, dst_width)?;
    finish(reader, prefixes, opcode, vec![reg, rm], start)
}
