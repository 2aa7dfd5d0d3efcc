//! The 256-entry single-byte opcode table (rows `00..FF`).

use super::{finish, operand_width, pointer_size_for_width};
use crate::error::{DecodeError, Result};
use crate::instruction::Instruction;
use crate::modrm::{read_rm_operand, reg_operand};
use crate::opcode::Opcode;
use crate::operand::{Immediate, Operand};
use crate::prefixes::Prefixes;
use crate::reader::ByteReader;
use crate::register::{gpr_from_code, OperandWidth, Register};

/// `16 if 66h else 64 if REX.W else 32`, the operand-size resolution rule
/// repeated through the arithmetic rows and `MOV r, imm`.
fn width(prefixes: &Prefixes) -> OperandWidth {
    operand_width(prefixes)
}

fn accumulator(width: OperandWidth) -> Result<Register> {
    gpr_from_code(0, width, true).ok_or(DecodeError::DecodingError("bad accumulator width".into()))
}

fn imm_for_width(reader: &mut ByteReader, width: OperandWidth) -> Result<Immediate> {
    Ok(match width {
        OperandWidth::Bits8 => Immediate::from_u8(reader.read_u8()?),
        OperandWidth::Bits16 => Immediate::from_u16(reader.read_u16_le()?),
        OperandWidth::Bits32 | OperandWidth::Bits64 => Immediate::from_u32(reader.read_u32_le()?),
    })
}

/// The eight-wide arithmetic/logic row crossed with the six addressing
/// forms `M8,R8 | M32,R32 | R8,M8 | R32,R32 | AL,imm8 | EAX,imm32`, per the
/// fixed bit layout of rows `00..3F`.
fn arithmetic_row(reader: &mut ByteReader, prefixes: &Prefixes, b0: u8, start: usize) -> Result<Instruction> {
    let row = (b0 >> 3) & 0x7;
    let form = b0 & 0x7;
    let opcode = Opcode::from_arithmetic_row(row);
    let w = width(prefixes);
    let byte_form = form % 2 == 0;
    let op_width = if byte_form { OperandWidth::Bits8 } else { w };
    let ptr_size = pointer_size_for_width(op_width);

    let operands = match form {
        0 | 1 => {
            // 0: M8,R8  1: M32,R32 -- rm is destination, reg is source
            let (modrm, rm) = read_rm_operand(reader, prefixes, op_width, ptr_size)?;
            let reg = reg_operand(modrm, prefixes, op_width)?;
            vec![rm, reg]
        }
        2 | 3 => {
            // 2: R8,M8  3: R32,R32 -- reg is destination, rm is source
            let (modrm, rm) = read_rm_operand(reader, prefixes, op_width, ptr_size)?;
            let reg = reg_operand(modrm, prefixes, op_width)?;
            vec![reg, rm]
        }
        4 => {
            // AL, imm8
            let imm = Immediate::from_u8(reader.read_u8()?);
            vec![Operand::Register(Register::Gpr8(crate::register::Gpr8::Al)), Operand::Immediate(imm)]
        }
        5 => {
            // eAX, immZ
            let acc = accumulator(w)?;
            let imm = imm_for_width(reader, w)?;
            vec![Operand::Register(acc), Operand::Immediate(imm)]
        }
        _ => unreachable!(),
    };
    finish(reader, prefixes, opcode, operands, start)
}

fn jcc_short(reader: &mut ByteReader, prefixes: &Prefixes, b0: u8, start: usize) -> Result<Instruction> {
    use crate::opcode::Condition;
    let condition = Condition::from_nibble(b0 & 0xF);
    let rel = reader.read_u8()? as i8;
    let operands = vec![Operand::Relative(Immediate::from_i8(rel))];
    finish(reader, prefixes, Opcode::Jcc(condition), operands, start)
}

fn push_pop_embedded(reader: &ByteReader, prefixes: &Prefixes, b0: u8, opcode: Opcode, start: usize) -> Result<Instruction> {
    let ext = if prefixes.rex.b() { 8 } else { 0 };
    let code = (b0 & 0x7) | ext;
    let reg = gpr_from_code(code, OperandWidth::Bits64, true)
        .ok_or(DecodeError::DecodingError("bad push/pop register".into()))?;
    finish(reader, prefixes, opcode, vec![Operand::Register(reg)], start)
}

fn xchg_embedded(reader: &ByteReader, prefixes: &Prefixes, b0: u8, start: usize) -> Result<Instruction> {
    let w = width(prefixes);
    let ext = if prefixes.rex.b() { 8 } else { 0 };
    let code = (b0 & 0x7) | ext;
    let acc = accumulator(w)?;
    let other = gpr_from_code(code, w, true)
        .ok_or(DecodeError::DecodingError("bad xchg register".into()))?;
    finish(reader, prefixes, Opcode::Xchg, vec![Operand::Register(acc), Operand::Register(other)], start)
}

fn mov_r_imm(reader: &mut ByteReader, prefixes: &Prefixes, b0: u8, start: usize) -> Result<Instruction> {
    // Rows B0..B7 are byte-width MOV; B8..BF follow the operand-size rule,
    // with a 64-bit encoding printed as MOVABS per the Intel-syntax
    // convention for a full 64-bit immediate.
    let (w, opcode) = if b0 < 0xB8 {
        (OperandWidth::Bits8, Opcode::Mov)
    } else if prefixes.rex.w() {
        (OperandWidth::Bits64, Opcode::Movabs)
    } else if prefixes.operand_size_override {
        (OperandWidth::Bits16, Opcode::Mov)
    } else {
        (OperandWidth::Bits32, Opcode::Mov)
    };
    let ext = if prefixes.rex.b() { 8 } else { 0 };
    let code = (b0 & 0x7) | ext;
    let reg = gpr_from_code(code, w, true).ok_or(DecodeError::DecodingError("bad mov register".into()))?;
    let imm = match w {
        OperandWidth::Bits8 => Immediate::from_u8_unsigned(reader.read_u8()?),
        OperandWidth::Bits16 => Immediate::from_u16(reader.read_u16_le()?),
        OperandWidth::Bits32 => Immediate::from_u32_unsigned(reader.read_u32_le()?),
        OperandWidth::Bits64 => Immediate::from_u64(reader.read_u64_le()?),
    };
    finish(reader, prefixes, opcode, vec![Operand::Register(reg), Operand::Immediate(imm)], start)
}

pub fn decode(reader: &mut ByteReader, prefixes: &Prefixes, b0: u8, start: usize) -> Result<Instruction> {
    match b0 {
        0x00..=0x3D => arithmetic_row(reader, prefixes, b0, start),
        0x63 => {
            let (modrm, rm) = read_rm_operand(reader, prefixes, OperandWidth::Bits32, pointer_size_for_width(OperandWidth::Bits32))?;
            let reg = reg_operand(modrm, prefixes, OperandWidth::Bits64)?;
            finish(reader, prefixes, Opcode::Movsxd, vec![reg, rm], start)
        }
        0x50..=0x57 => push_pop_embedded(reader, prefixes, b0, Opcode::Push, start),
        0x58..=0x5F => push_pop_embedded(reader, prefixes, b0, Opcode::Pop, start),
        0x68 => {
            let imm = imm_for_width(reader, width(prefixes))?;
            finish(reader, prefixes, Opcode::Push, vec![Operand::Immediate(imm)], start)
        }
        0x6A => {
            let imm = Immediate::from_u8(reader.read_u8()?);
            finish(reader, prefixes, Opcode::Push, vec![Operand::Immediate(imm)], start)
        }
        0x70..=0x7F => jcc_short(reader, prefixes, b0, start),
        0x88 | 0x8A => {
            let op_width = OperandWidth::Bits8;
            let (modrm, rm) = read_rm_operand(reader, prefixes, op_width, pointer_size_for_width(op_width))?;
            let reg = reg_operand(modrm, prefixes, op_width)?;
            let operands = if b0 == 0x88 { vec![rm, reg] } else { vec![reg, rm] };
            finish(reader, prefixes, Opcode::Mov, operands, start)
        }
        0x89 | 0x8B => {
            let w = width(prefixes);
            let (modrm, rm) = read_rm_operand(reader, prefixes, w, pointer_size_for_width(w))?;
            let reg = reg_operand(modrm, prefixes, w)?;
            let operands = if b0 == 0x89 { vec![rm, reg] } else { vec![reg, rm] };
            finish(reader, prefixes, Opcode::Mov, operands, start)
        }
        0x8D => {
            let w = width(prefixes);
            let (modrm, rm) = read_rm_operand(reader, prefixes, w, pointer_size_for_width(w))?;
            let reg = reg_operand(modrm, prefixes, w)?;
            finish(reader, prefixes, Opcode::Lea, vec![reg, rm], start)
        }
        0x90 => {
            if prefixes.rex.present {
                let acc = accumulator(OperandWidth::Bits64)?;
                let other = gpr_from_code(8, OperandWidth::Bits64, true).unwrap();
                finish(reader, prefixes, Opcode::Xchg, vec![Operand::Register(other), Operand::Register(acc)], start)
            } else if prefixes.operand_size_override {
                let ax = Register::Gpr16(crate::register::Gpr16::Ax);
                finish(reader, prefixes, Opcode::Xchg, vec![Operand::Register(ax.clone()), Operand::Register(ax)], start)
            } else {
                finish(reader, prefixes, Opcode::Nop, vec![], start)
            }
        }
        0x91..=0x97 => xchg_embedded(reader, prefixes, b0, start),
        0x98 => {
            let opcode = if prefixes.rex.w() {
                Opcode::Cdqe
            } else if prefixes.operand_size_override {
                Opcode::Cbw
            } else {
                Opcode::Cwde
            };
            finish(reader, prefixes, opcode, vec![], start)
        }
        0x99 => {
            let opcode = if prefixes.rex.w() {
                Opcode::Cqo
            } else if prefixes.operand_size_override {
                Opcode::Cwd
            } else {
                Opcode::Cdq
            };
            finish(reader, prefixes, opcode, vec![], start)
        }
        0x9C => finish(reader, prefixes, Opcode::Pushf, vec![], start),
        0x9D => finish(reader, prefixes, Opcode::Popf, vec![], start),
        0x9E => finish(reader, prefixes, Opcode::Sahf, vec![], start),
        0x9F => finish(reader, prefixes, Opcode::Lahf, vec![], start),
        0xA4 | 0xA5 => finish(reader, prefixes, Opcode::Movs, vec![], start),
        0xA6 | 0xA7 => finish(reader, prefixes, Opcode::Cmps, vec![], start),
        0xA8 => {
            let imm = Immediate::from_u8(reader.read_u8()?);
            finish(reader, prefixes, Opcode::Test, vec![Operand::Register(Register::Gpr8(crate::register::Gpr8::Al)), Operand::Immediate(imm)], start)
        }
        0xA9 => {
            let w = width(prefixes);
            let acc = accumulator(w)?;
            let imm = imm_for_width(reader, w)?;
            finish(reader, prefixes, Opcode::Test, vec![Operand::Register(acc), Operand::Immediate(imm)], start)
        }
        0xAA | 0xAB => finish(reader, prefixes, Opcode::Stos, vec![], start),
        0xAC | 0xAD => finish(reader, prefixes, Opcode::Lods, vec![], start),
        0xAE | 0xAF => finish(reader, prefixes, Opcode::Scas, vec![], start),
        0xB0..=0xBF => mov_r_imm(reader, prefixes, b0, start),
        0xC2 => {
            let imm = Immediate::from_u16(reader.read_u16_le()?);
            finish(reader, prefixes, Opcode::Ret, vec![Operand::Immediate(imm)], start)
        }
        0xC3 => finish(reader, prefixes, Opcode::Ret, vec![], start),
        0xC9 => finish(reader, prefixes, Opcode::Leave, vec![], start),
        0xCC => finish(reader, prefixes, Opcode::Int3, vec![], start),
        0xCD => {
            let imm = Immediate::from_u8_unsigned(reader.read_u8()?);
            finish(reader, prefixes, Opcode::Int, vec![Operand::Immediate(imm)], start)
        }
        0xCE => finish(reader, prefixes, Opcode::Into, vec![], start),
        0xCF => finish(reader, prefixes, Opcode::Iret, vec![], start),
        0xE0 => {
            let rel = reader.read_u8()? as i8;
            finish(reader, prefixes, Opcode::Loopne, vec![Operand::Relative(Immediate::from_i8(rel))], start)
        }
        0xE1 => {
            let rel = reader.read_u8()? as i8;
            finish(reader, prefixes, Opcode::Loope, vec![Operand::Relative(Immediate::from_i8(rel))], start)
        }
        0xE2 => {
            let rel = reader.read_u8()? as i8;
            finish(reader, prefixes, Opcode::Loop, vec![Operand::Relative(Immediate::from_i8(rel))], start)
        }
        0xE3 => {
            let rel = reader.read_u8()? as i8;
            finish(reader, prefixes, Opcode::Jrcxz, vec![Operand::Relative(Immediate::from_i8(rel))], start)
        }
        0xE8 => {
            let rel = reader.read_u32_le()? as i32;
            finish(reader, prefixes, Opcode::Call, vec![Operand::Relative(Immediate::from_u32(rel as u32))], start)
        }
        0xE9 => {
            let rel = reader.read_u32_le()? as i32;
            finish(reader, prefixes, Opcode::Jmp, vec![Operand::Relative(Immediate::from_u32(rel as u32))], start)
        }
        0xEB => {
            let rel = reader.read_u8()? as i8;
            finish(reader, prefixes, Opcode::Jmp, vec![Operand::Relative(Immediate::from_i8(rel))], start)
        }
        0xF4 => finish(reader, prefixes, Opcode::Hlt, vec![], start),
        0xF5 => finish(reader, prefixes, Opcode::Cmc, vec![], start),
        0xF8 => finish(reader, prefixes, Opcode::Clc, vec![], start),
        0xF9 => finish(reader, prefixes, Opcode::Stc, vec![], start),
        0xFA => finish(reader, prefixes, Opcode::Cli, vec![], start),
        0xFB => finish(reader, prefixes, Opcode::Sti, vec![], start),
        0xFC => finish(reader, prefixes, Opcode::Cld, vec![], start),
        0xFD => finish(reader, prefixes, Opcode::Std, vec![], start),
        _ => Err(DecodeError::UnknownOpcode { bytes: vec![b0] }),
    }
}
