//! Parses Intel-syntax assembly text back into an [`Instruction`].
//!
//! Grammar: optional prefix keyword (`lock`/`rep`/`repnz`), one mnemonic,
//! up to four comma-separated operands. Each operand is a register name, a
//! `0x`-prefixed immediate, or an indirect `[...]` memory reference with an
//! optional `{SIZE} PTR` and `<segment>:` qualifier.

use crate::error::ParseError;
use crate::instruction::{Instruction, InstructionPrefix};
use crate::opcode::Opcode;
use crate::operand::{Displacement, Immediate, ImmediateWidth, IndirectOperand, Operand, PointerSize};
use crate::register::{Register, Segment};

fn parse_immediate(token: &str, force_64bit: bool) -> Result<Immediate, ParseError> {
    let hex = token
        .strip_prefix("0x")
        .ok_or_else(|| ParseError::MalformedOperand(token.to_string()))?;
    let value = u64::from_str_radix(hex, 16).map_err(|_| ParseError::MalformedOperand(token.to_string()))?;
    let width = if force_64bit {
        ImmediateWidth::Bits64
    } else if value <= 0xFF {
        ImmediateWidth::Bits8
    } else if value <= 0xFFFF {
        ImmediateWidth::Bits16
    } else if value <= 0xFFFF_FFFF {
        ImmediateWidth::Bits32
    } else {
        ImmediateWidth::Bits64
    };
    Ok(Immediate::new(value as i64, width))
}

/// Splits a bracket body into its `+`-joined terms, keeping a leading `-`
/// attached to the term it negates (`rax-0x10` → `["rax", "-0x10"]`).
fn split_terms(body: &str) -> Vec<String> {
    let mut rewritten = String::with_capacity(body.len() + 1);
    for (i, c) in body.chars().enumerate() {
        if c == '-' && i > 0 {
            rewritten.push('+');
        }
        rewritten.push(c);
    }
    rewritten.split('+').filter(|t| !t.is_empty()).map(str::to_string).collect()
}

fn parse_displacement(term: &str) -> Option<Displacement> {
    let (neg, digits) = match term.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, term),
    };
    let hex = digits.strip_prefix("0x")?;
    let magnitude = i64::from_str_radix(hex, 16).ok()?;
    let value = if neg { -magnitude } else { magnitude };
    Some(if (i8::MIN as i64..=i8::MAX as i64).contains(&value) {
        Displacement::Byte(value as i8)
    } else {
        Displacement::Dword(value as i32)
    })
}

fn infer_pointer_size(base: &Option<Register>, index: &Option<Register>) -> PointerSize {
    match base.as_ref().or(index.as_ref()).map(Register::bits) {
        Some(8) => PointerSize::Byte,
        Some(16) => PointerSize::Word,
        Some(64) => PointerSize::Qword,
        _ => PointerSize::Dword,
    }
}

fn parse_indirect(token: &str) -> Result<IndirectOperand, ParseError> {
    let malformed = || ParseError::MalformedOperand(token.to_string());

    let mut rest = token;
    let mut pointer_size = None;
    if let Some(ptr_pos) = rest.find(" PTR ") {
        let size = PointerSize::from_keyword(&rest[..ptr_pos]).ok_or_else(malformed)?;
        pointer_size = Some(size);
        rest = &rest[ptr_pos + " PTR ".len()..];
    }

    let (segment, bracketed) = match rest.find(':') {
        Some(colon) if rest[..colon].chars().all(|c| c.is_ascii_alphabetic()) => {
            (Segment::from_mnemonic(&rest[..colon]), &rest[colon + 1..])
        }
        _ => (None, rest),
    };

    let inner = bracketed
        .strip_prefix('[')
        .and_then(|b| b.strip_suffix(']'))
        .ok_or_else(malformed)?;

    let mut base = None;
    let mut index = None;
    let mut scale = None;
    let mut displacement = None;

    for term in split_terms(inner) {
        if let Some((reg_part, scale_part)) = term.split_once('*') {
            index = Some(Register::from_mnemonic(reg_part).ok_or_else(|| ParseError::UnknownRegister(reg_part.to_string()))?);
            scale = Some(scale_part.parse::<u8>().map_err(|_| malformed())?);
        } else if let Some(disp) = parse_displacement(&term) {
            displacement = Some(disp);
        } else if term.chars().next().is_some_and(|c| c.is_ascii_alphabetic()) {
            let reg = Register::from_mnemonic(&term).ok_or_else(|| ParseError::UnknownRegister(term.clone()))?;
            if base.is_none() {
                base = Some(reg);
            } else if index.is_none() {
                index = Some(reg);
            } else {
                return Err(malformed());
            }
        } else {
            return Err(malformed());
        }
    }

    if let Some(seg) = segment {
        base = base.map(|b| Register::Segment(seg, Box::new(b)));
    }

    let pointer_size = pointer_size.unwrap_or_else(|| infer_pointer_size(&base, &index));
    IndirectOperand::new(pointer_size, base, index, scale, displacement).map_err(ParseError::MalformedOperand)
}

fn parse_operand(token: &str, mnemonic: &str) -> Result<Operand, ParseError> {
    if token.starts_with("0x") {
        return Ok(Operand::Immediate(parse_immediate(token, mnemonic == "movabs")?));
    }
    if let Some(reg) = Register::from_mnemonic(token) {
        return Ok(Operand::Register(reg));
    }
    parse_indirect(token).map(Operand::Indirect)
}

/// Parses one line of Intel-syntax assembly into an [`Instruction`].
pub fn from_intel_syntax(text: &str) -> Result<Instruction, ParseError> {
    let text = text.trim();
    let (prefix, rest) = if let Some(r) = text.strip_prefix("lock ") {
        (Some(InstructionPrefix::Lock), r)
    } else if let Some(r) = text.strip_prefix("rep ") {
        (Some(InstructionPrefix::Rep), r)
    } else if let Some(r) = text.strip_prefix("repnz ").or_else(|| text.strip_prefix("repne ")) {
        (Some(InstructionPrefix::Repne), r)
    } else {
        (None, text)
    };
    let rest = rest.trim_start();

    let (mnemonic, operand_str) = match rest.find(char::is_whitespace) {
        Some(pos) => (&rest[..pos], rest[pos..].trim()),
        None => (rest, ""),
    };
    if mnemonic.is_empty() {
        return Err(ParseError::UnknownMnemonic(text.to_string()));
    }
    let opcode = Opcode::from_mnemonic(mnemonic).ok_or_else(|| ParseError::UnknownMnemonic(mnemonic.to_string()))?;

    let operand_tokens: Vec<&str> = if operand_str.is_empty() {
        Vec::new()
    } else {
        operand_str.split(',').map(str::trim).collect()
    };
    if operand_tokens.len() > 4 {
        return Err(ParseError::TooManyOperands);
    }

    let operands = operand_tokens
        .into_iter()
        .map(|t| parse_operand(t, mnemonic))
        .collect::<Result<Vec<_>, _>>()?;

    Instruction::new(prefix, opcode, &operands, 0).map_err(ParseError::MalformedOperand)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::register::Gpr64;

    #[test]
    fn parses_register_to_register_mov() {
        let insn = from_intel_syntax("mov rax,rbx").unwrap();
        assert_eq!(insn.opcode, Opcode::Mov);
        assert_eq!(insn.op1, Some(Operand::Register(Register::Gpr64(Gpr64::Rax))));
        assert_eq!(insn.op2, Some(Operand::Register(Register::Gpr64(Gpr64::Rbx))));
    }

    #[test]
    fn parses_rip_relative_memory() {
        let insn = from_intel_syntax("mov rax,QWORD PTR [rip+0x44332211]").unwrap();
        let mem = insn.op2.unwrap();
        let mem = mem.as_indirect().unwrap();
        assert_eq!(mem.pointer_size, PointerSize::Qword);
        assert_eq!(mem.base, Some(Register::Gpr64(Gpr64::Rip)));
        assert_eq!(mem.displacement.unwrap().value(), 0x44332211);
    }

    #[test]
    fn parses_sib_without_ptr_keyword() {
        let insn = from_intel_syntax("lea eax,[rbx+rcx*2]").unwrap();
        let mem = insn.op2.unwrap();
        let mem = mem.as_indirect().unwrap();
        assert_eq!(mem.base, Some(Register::Gpr64(Gpr64::Rbx)));
        assert_eq!(mem.index, Some(Register::Gpr64(Gpr64::Rcx)));
        assert_eq!(mem.scale, Some(2));
    }

    #[test]
    fn movabs_forces_64bit_immediate() {
        let insn = from_intel_syntax("movabs rax,0x1").unwrap();
        let imm = insn.op2.unwrap().as_immediate().copied().unwrap();
        assert_eq!(imm.width, ImmediateWidth::Bits64);
    }

    #[test]
    fn unknown_mnemonic_is_reported() {
        assert_eq!(
            from_intel_syntax("bogus rax,rbx").unwrap_err(),
            ParseError::UnknownMnemonic("bogus".into())
        );
    }

    #[test]
    fn unknown_register_inside_indirect_is_reported() {
        assert_eq!(
            from_intel_syntax("mov rax,QWORD PTR [rqx]").unwrap_err(),
            ParseError::UnknownRegister("rqx".into())
        );
    }

    #[test]
    fn too_many_operands_is_reported() {
        assert_eq!(
            from_intel_syntax("add rax,rbx,rcx,rdx,rsi").unwrap_err(),
            ParseError::TooManyOperands
        );
    }
}
