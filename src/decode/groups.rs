//! ModR/M.reg-selected opcode extension groups (`Group 1`..`Group 16`).

use super::{finish, operand_width, pointer_size_for_width};
use crate::error::{DecodeError, Result};
use crate::instruction::Instruction;
use crate::modrm::{read_rm_operand, ModRm};
use crate::opcode::Opcode;
use crate::operand::{Immediate, Operand, PointerSize};
use crate::prefixes::{Group1, Prefixes};
use crate::reader::ByteReader;
use crate::register::{vector_from_code, OperandWidth, VectorWidth};

fn reserved(reader: &ByteReader, start: usize) -> DecodeError {
    DecodeError::ReservedOpcode {
        bytes: reader.consumed_since(start).to_vec(),
    }
}

/// Group 1 (`80`/`81`/`82`/`83`): arithmetic/logic with an immediate.
/// `80`/`82` operate on byte operands; `81` takes a full-width immediate;
/// `83` takes a sign-extended imm8 at full width.
pub fn group1(reader: &mut ByteReader, prefixes: &Prefixes, b0: u8, start: usize) -> Result<Instruction> {
    let byte_form = b0 == 0x80 || b0 == 0x82;
    let w = if byte_form { OperandWidth::Bits8 } else { operand_width(prefixes) };
    let (modrm, rm) = read_rm_operand(reader, prefixes, w, pointer_size_for_width(w))?;
    let opcode = Opcode::from_arithmetic_row(modrm.reg);
    let imm = if b0 == 0x83 {
        Immediate::from_i8(reader.read_u8()? as i8)
    } else if byte_form {
        Immediate::from_u8(reader.read_u8()?)
    } else {
        match w {
            OperandWidth::Bits16 => Immediate::from_u16(reader.read_u16_le()?),
            _ => Immediate::from_u32(reader.read_u32_le()?),
        }
    };
    finish(reader, prefixes, opcode, vec![rm, Operand::Immediate(imm)], start)
}

/// Group 2 (`C0`/`C1`/`D0`/`D1`/`D2`/`D3`): shifts and rotates. `reg == 6`
/// is the SDM's unofficial `SHL` duplicate, treated as reserved here per
/// the group's canonical table.
pub fn group2(reader: &mut ByteReader, prefixes: &Prefixes, b0: u8, start: usize) -> Result<Instruction> {
    let byte_form = b0 == 0xC0 || b0 == 0xD0 || b0 == 0xD2;
    let w = if byte_form { OperandWidth::Bits8 } else { operand_width(prefixes) };
    let (modrm, rm) = read_rm_operand(reader, prefixes, w, pointer_size_for_width(w))?;
    let opcode = match modrm.reg {
        0 => Opcode::Rol,
        1 => Opcode::Ror,
        2 => Opcode::Rcl,
        3 => Opcode::Rcr,
        4 => Opcode::Shl,
        5 => Opcode::Shr,
        6 => return Err(reserved(reader, start)),
        7 => Opcode::Sar,
        _ => unreachable!(),
    };
    let count = match b0 {
        0xC0 | 0xC1 => Some(Operand::Immediate(Immediate::from_u8_unsigned(reader.read_u8()?))),
        0xD0 | 0xD1 => None,
        0xD2 | 0xD3 => Some(Operand::Register(crate::register::Register::Gpr8(crate::register::Gpr8::Cl))),
        _ => unreachable!(),
    };
    let operands = match count {
        Some(op) => vec![rm, op],
        None => vec![rm],
    };
    finish(reader, prefixes, opcode, operands, start)
}

/// Group 3 (`F6`/`F7`). `reg == 5` (`IMUL`) is not named in the group's
/// canonical table but is filled in from the standard encoding since the
/// opcode set already enumerates `Imul`.
pub fn group3(reader: &mut ByteReader, prefixes: &Prefixes, b0: u8, start: usize) -> Result<Instruction> {
    let w = if b0 == 0xF6 { OperandWidth::Bits8 } else { operand_width(prefixes) };
    let (modrm, rm) = read_rm_operand(reader, prefixes, w, pointer_size_for_width(w))?;
    match modrm.reg {
        0 => {
            let imm = match w {
                OperandWidth::Bits8 => Immediate::from_u8(reader.read_u8()?),
                OperandWidth::Bits16 => Immediate::from_u16(reader.read_u16_le()?),
                _ => Immediate::from_u32(reader.read_u32_le()?),
            };
            finish(reader, prefixes, Opcode::Test, vec![rm, Operand::Immediate(imm)], start)
        }
        1 => Err(reserved(reader, start)),
        2 => finish(reader, prefixes, Opcode::Not, vec![rm], start),
        3 => finish(reader, prefixes, Opcode::Neg, vec![rm], start),
        4 => finish(reader, prefixes, Opcode::Mul, vec![rm], start),
        5 => finish(reader, prefixes, Opcode::Imul, vec![rm], start),
        6 => finish(reader, prefixes, Opcode::Div, vec![rm], start),
        7 => finish(reader, prefixes, Opcode::Idiv, vec![rm], start),
        _ => unreachable!(),
    }
}

/// Group 4 (`FE`): byte-width `INC`/`DEC` only.
pub fn group4(reader: &mut ByteReader, prefixes: &Prefixes, start: usize) -> Result<Instruction> {
    let (modrm, rm) = read_rm_operand(reader, prefixes, OperandWidth::Bits8, PointerSize::Byte)?;
    match modrm.reg {
        0 => finish(reader, prefixes, Opcode::Inc, vec![rm], start),
        1 => finish(reader, prefixes, Opcode::Dec, vec![rm], start),
        _ => Err(reserved(reader, start)),
    }
}

/// Group 5 (`FF`). `CALL`/`JMP`/`PUSH` near-indirect forms (`reg` 2/4/6)
/// default to 64-bit operand size in long mode regardless of `66h`/`REX.W`,
/// same as the embedded-register `PUSH`/`POP` forms; `INC`/`DEC` (`reg`
/// 0/1) follow the ordinary operand-size rule. Far call/jump forms need a
/// segment:offset operand shape this codebase's `Operand` taxonomy does not
/// model, so they are treated as reserved rather than mis-decoded.
pub fn group5(reader: &mut ByteReader, prefixes: &Prefixes, start: usize) -> Result<Instruction> {
    let reg_field = (reader.peek_u8()? >> 3) & 0x7;
    let w = if matches!(reg_field, 2 | 4 | 6) { OperandWidth::Bits64 } else { operand_width(prefixes) };
    let (modrm, rm) = read_rm_operand(reader, prefixes, w, pointer_size_for_width(w))?;
    match modrm.reg {
        0 => finish(reader, prefixes, Opcode::Inc, vec![rm], start),
        1 => finish(reader, prefixes, Opcode::Dec, vec![rm], start),
        2 => finish(reader, prefixes, Opcode::Call, vec![rm], start),
        3 => Err(reserved(reader, start)),
        4 => finish(reader, prefixes, Opcode::Jmp, vec![rm], start),
        5 => Err(reserved(reader, start)),
        6 => finish(reader, prefixes, Opcode::Push, vec![rm], start),
        7 => Err(reserved(reader, start)),
        _ => unreachable!(),
    }
}

/// Group 7 (`0F 01`). Only the `XGETBV` register form (`ModR/M == 0xD0`) is
/// recognized; every other encoding in this group needs system-register
/// operand kinds outside this codebase's scope.
pub fn group7(reader: &mut ByteReader, prefixes: &Prefixes, b1: u8, start: usize) -> Result<Instruction> {
    let byte = reader.peek_u8()?;
    if b1 == 0x01 && byte == 0xD0 {
        reader.read_u8()?;
        return finish(reader, prefixes, Opcode::Xgetbv, vec![], start);
    }
    Err(DecodeError::UnknownOpcode { bytes: reader.consumed_since(start).to_vec() })
}

/// Group 8 (`0F BA`): bit tests with an imm8 bit index.
pub fn group8(reader: &mut ByteReader, prefixes: &Prefixes, start: usize) -> Result<Instruction> {
    let w = operand_width(prefixes);
    let (modrm, rm) = read_rm_operand(reader, prefixes, w, pointer_size_for_width(w))?;
    let opcode = match modrm.reg {
        4 => Opcode::Bt,
        5 => Opcode::Bts,
        6 => Opcode::Btr,
        7 => Opcode::Btc,
        _ => return Err(reserved(reader, start)),
    };
    let imm = Immediate::from_u8_unsigned(reader.read_u8()?);
    finish(reader, prefixes, opcode, vec![rm, Operand::Immediate(imm)], start)
}

/// Group 9 (`0F C7`). `reg == 1` (`CMPXCHG8B`/`CMPXCHG16B`) is filled in
/// from the standard encoding for the same reason as Group 3's `IMUL` slot.
pub fn group9(reader: &mut ByteReader, prefixes: &Prefixes, start: usize) -> Result<Instruction> {
    let (modrm, rm) = read_rm_operand(reader, prefixes, operand_width(prefixes), PointerSize::Qword)?;
    match modrm.reg {
        1 => {
            let opcode = if prefixes.rex.w() { Opcode::Cmpxchg16b } else { Opcode::Cmpxchg8b };
            finish(reader, prefixes, opcode, vec![rm], start)
        }
        6 => finish(reader, prefixes, Opcode::Rdrand, vec![rm], start),
        7 => finish(reader, prefixes, Opcode::Rdseed, vec![rm], start),
        _ => Err(reserved(reader, start)),
    }
}

/// Group 11 (`C6`/`C7`): `MOV r/m, imm` — the only defined slot is `reg == 0`.
pub fn group11(reader: &mut ByteReader, prefixes: &Prefixes, b0: u8, start: usize) -> Result<Instruction> {
    let w = if b0 == 0xC6 { OperandWidth::Bits8 } else { operand_width(prefixes) };
    let (modrm, rm) = read_rm_operand(reader, prefixes, w, pointer_size_for_width(w))?;
    if modrm.reg != 0 {
        return Err(reserved(reader, start));
    }
    let imm = match w {
        OperandWidth::Bits8 => Immediate::from_u8(reader.read_u8()?),
        OperandWidth::Bits16 => Immediate::from_u16(reader.read_u16_le()?),
        _ => Immediate::from_u32(reader.read_u32_le()?),
    };
    finish(reader, prefixes, Opcode::Mov, vec![rm, Operand::Immediate(imm)], start)
}

fn xmm_direct_rm(modrm: ModRm, prefixes: &Prefixes) -> Operand {
    let ext = if prefixes.rex.b() { 8 } else { 0 };
    Operand::Register(vector_from_code(modrm.rm | ext, VectorWidth::Xmm))
}

/// Group 12 (`0F 71`): packed-word shifts by immediate on an XMM register.
pub fn group12(reader: &mut ByteReader, prefixes: &Prefixes, start: usize) -> Result<Instruction> {
    let modrm = ModRm::read(reader)?;
    let opcode = match modrm.reg {
        2 => Opcode::Psrlw,
        4 => Opcode::Psraw,
        6 => Opcode::Psllw,
        _ => return Err(reserved(reader, start)),
    };
    let rm = xmm_direct_rm(modrm, prefixes);
    let imm = Immediate::from_u8_unsigned(reader.read_u8()?);
    finish(reader, prefixes, opcode, vec![rm, Operand::Immediate(imm)], start)
}

/// Group 13 (`0F 72`): packed-dword shifts by immediate.
pub fn group13(reader: &mut ByteReader, prefixes: &Prefixes, start: usize) -> Result<Instruction> {
    let modrm = ModRm::read(reader)?;
    let opcode = match modrm.reg {
        2 => Opcode::Psrld,
        4 => Opcode::Psrad,
        6 => Opcode::Pslld,
        _ => return Err(reserved(reader, start)),
    };
    let rm = xmm_direct_rm(modrm, prefixes);
    let imm = Immediate::from_u8_unsigned(reader.read_u8()?);
    finish(reader, prefixes, opcode, vec![rm, Operand::Immediate(imm)], start)
}

/// Group 14 (`0F 73`): packed-qword shifts, plus the `66h`-only
/// double-quadword byte shifts.
pub fn group14(reader: &mut ByteReader, prefixes: &Prefixes, start: usize) -> Result<Instruction> {
    let modrm = ModRm::read(reader)?;
    let opcode = match modrm.reg {
        2 => Opcode::Psrlq,
        3 if prefixes.operand_size_override => Opcode::Psrldq,
        6 => Opcode::Psllq,
        7 if prefixes.operand_size_override => Opcode::Pslldq,
        _ => return Err(reserved(reader, start)),
    };
    let rm = xmm_direct_rm(modrm, prefixes);
    let imm = Immediate::from_u8_unsigned(reader.read_u8()?);
    finish(reader, prefixes, opcode, vec![rm, Operand::Immediate(imm)], start)
}

/// Group 15 (`0F AE`). `reg == 5` is `INCSSPQ` under `F3` and `LFENCE`
/// otherwise; `reg == 6`/`7` are the remaining fence instructions.
pub fn group15(reader: &mut ByteReader, prefixes: &Prefixes, start: usize) -> Result<Instruction> {
    let modrm = ModRm::read(reader)?;
    match modrm.reg {
        5 if prefixes.group1 == Some(Group1::Rep) => {
            let ext = if prefixes.rex.b() { 8 } else { 0 };
            let reg = crate::register::gpr_from_code(modrm.rm | ext, OperandWidth::Bits64, true)
                .ok_or(DecodeError::DecodingError("bad incsspq register".into()))?;
            finish(reader, prefixes, Opcode::Incsspq, vec![Operand::Register(reg)], start)
        }
        5 => finish(reader, prefixes, Opcode::Lfence, vec![], start),
        6 => finish(reader, prefixes, Opcode::Mfence, vec![], start),
        7 => finish(reader, prefixes, Opcode::Sfence, vec![], start),
        _ => Err(reserved(reader, start)),
    }
}

/// Group 16 (`0F 18`): prefetch hints; `reg >= 4` is reserved.
pub fn group16(reader: &mut ByteReader, prefixes: &Prefixes, start: usize) -> Result<Instruction> {
    let (modrm, rm) = read_rm_operand(reader, prefixes, OperandWidth::Bits8, PointerSize::Byte)?;
    let opcode = match modrm.reg {
        0 => Opcode::Prefetchnta,
        1 => Opcode::Prefetcht0,
        2 => Opcode::Prefetcht1,
        3 => Opcode::Prefetcht2,
        _ => return Err(reserved(reader, start)),
    };
    finish(reader, prefixes, opcode, vec![rm], start)
}
