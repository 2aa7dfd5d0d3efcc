//! Intel-syntax textual rendering of a decoded [`Instruction`].
//!
//! Mnemonics and register names are lowercase; immediates render as
//! zero-padded `0x` hex; indirect operands render as
//! `PTRSIZE PTR [seg:base+index*scale+disp]` with absent parts omitted.

use core::fmt;

use crate::instruction::Instruction;
use crate::operand::{Immediate, ImmediateWidth, IndirectOperand, Operand};
use crate::opcode::Opcode;

fn write_immediate(f: &mut fmt::Formatter<'_>, imm: Immediate) -> fmt::Result {
    write!(f, "0x{:0width$x}", imm.unsigned_bits(), width = imm.width.hex_digits())
}

/// Relative branch targets always print at 32-bit width regardless of the
/// encoded displacement size (`rel8` is sign-extended before display).
fn write_relative(f: &mut fmt::Formatter<'_>, imm: Immediate) -> fmt::Result {
    let width = if imm.width.bits() > ImmediateWidth::Bits32.bits() { imm.width } else { ImmediateWidth::Bits32 };
    write_immediate(f, Immediate::new(imm.value, width))
}

/// Writes a displacement value in `+0x..`/`-0x..` form when `leading` is
/// false (there is already a base or index before it), or bare `0x..`/
/// `-0x..` when it opens the bracket.
fn write_signed_hex(f: &mut fmt::Formatter<'_>, value: i64, leading: bool) -> fmt::Result {
    if value < 0 {
        write!(f, "-0x{:x}", value.unsigned_abs())
    } else {
        if !leading {
            write!(f, "+")?;
        }
        write!(f, "0x{value:x}")
    }
}

fn write_indirect(f: &mut fmt::Formatter<'_>, mem: &IndirectOperand, suppress_ptr: bool) -> fmt::Result {
    if !suppress_ptr {
        write!(f, "{} PTR ", mem.pointer_size.keyword())?;
    }
    write!(f, "[")?;
    let mut wrote = false;
    if let Some(base) = &mem.base {
        write!(f, "{base}")?;
        wrote = true;
    }
    if let Some(index) = &mem.index {
        if wrote {
            write!(f, "+")?;
        }
        write!(f, "{index}")?;
        if let Some(scale) = mem.scale {
            write!(f, "*{scale}")?;
        }
        wrote = true;
    }
    if let Some(disp) = mem.displacement {
        write_signed_hex(f, disp.value(), !wrote)?;
    }
    write!(f, "]")
}

fn write_operand(f: &mut fmt::Formatter<'_>, operand: &Operand, suppress_ptr: bool) -> fmt::Result {
    match operand {
        Operand::Register(r) => write!(f, "{r}"),
        Operand::Immediate(imm) => write_immediate(f, *imm),
        Operand::Relative(imm) => write_relative(f, *imm),
        Operand::Indirect(mem) => write_indirect(f, mem, suppress_ptr),
    }
}

pub fn write_intel_syntax(f: &mut fmt::Formatter<'_>, insn: &Instruction) -> fmt::Result {
    if let Some(prefix) = insn.prefix {
        write!(f, "{} ", prefix.mnemonic())?;
    }
    write!(f, "{}", insn.opcode.mnemonic())?;

    let operands = insn.operands();
    if operands.is_empty() {
        return Ok(());
    }
    write!(f, " ")?;
    let suppress_ptr = insn.opcode == Opcode::Lea;
    for (i, operand) in operands.iter().enumerate() {
        if i > 0 {
            write!(f, ",")?;
        }
        write_operand(f, operand, suppress_ptr)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::{Decoder, MachineMode};

    fn render(bytes: &[u8]) -> String {
        let decoder = Decoder::new(MachineMode::Long64);
        let (insn, _) = decoder.decode_one(bytes).unwrap();
        insn.to_string()
    }

    #[test]
    fn nop() {
        assert_eq!(render(&[0x90]), "nop");
    }

    #[test]
    fn mov_register_to_register() {
        assert_eq!(render(&[0x48, 0x89, 0xd8]), "mov rax,rbx");
    }

    #[test]
    fn mov_rip_relative() {
        assert_eq!(
            render(&[0x48, 0x8b, 0x05, 0x11, 0x22, 0x33, 0x44]),
            "mov rax,QWORD PTR [rip+0x44332211]"
        );
    }

    #[test]
    fn lea_suppresses_pointer_size() {
        assert_eq!(render(&[0x8d, 0x04, 0x4b]), "lea eax,[rbx+rcx*2]");
    }

    #[test]
    fn short_jump_prints_32_bit_relative() {
        assert_eq!(render(&[0xeb, 0xfe]), "jmp 0xfffffffe");
    }

    #[test]
    fn vex_movdqa() {
        assert_eq!(render(&[0xc5, 0xf9, 0x6f, 0xc1]), "vmovdqa xmm0,xmm1");
    }
}
