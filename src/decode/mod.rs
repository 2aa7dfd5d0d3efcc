//! Opcode dispatch: reads the prefix run, then routes on the leading opcode
//! byte(s) into the one-byte, two-byte, three-byte, group, or VEX/EVEX
//! parsers.

mod groups;
mod onebyte;
mod threebyte;
mod twobyte;
mod vex;

use crate::error::{DecodeError, Result};
use crate::instruction::{Instruction, InstructionPrefix};
use crate::opcode::Opcode;
use crate::operand::Operand;
use crate::prefixes::{scan_prefixes, Group1, Prefixes};
use crate::reader::ByteReader;

/// Decodes one instruction starting at the reader's current position,
/// leaving the cursor positioned just past the last consumed byte.
///
/// `0F xx` routes to [`twobyte`], which itself delegates `0F 38 xx`/
/// `0F 3A xx` to [`threebyte`]; VEX/EVEX-prefixed opcodes route to [`vex`],
/// which dispatches by the prefix's own map selector (`0F`, `0F38`, `0F3A`).
pub fn decode(reader: &mut ByteReader, allow_rex: bool) -> Result<Instruction> {
    let start = reader.position();
    let prefixes = scan_prefixes(reader, allow_rex)?;

    if prefixes.has_vector_prefix() {
        return vex::decode(reader, &prefixes, start);
    }

    let b0 = reader.read_u8()?;
    match b0 {
        0x0F => twobyte::decode(reader, &prefixes, start),
        0x80..=0x83 => groups::group1(reader, &prefixes, b0, start),
        0xC0 | 0xC1 | 0xD0 | 0xD1 | 0xD2 | 0xD3 => groups::group2(reader, &prefixes, b0, start),
        0xC6 | 0xC7 => groups::group11(reader, &prefixes, b0, start),
        0xF6 | 0xF7 => groups::group3(reader, &prefixes, b0, start),
        0xFE => groups::group4(reader, &prefixes, start),
        0xFF => groups::group5(reader, &prefixes, start),
        _ => onebyte::decode(reader, &prefixes, b0, start),
    }
}

/// Assembles the final `Instruction`, deriving its display prefix (if any)
/// from the legacy prefix bytes that were consumed, and its length from how
/// far the reader has advanced since `start`.
fn finish(
    reader: &ByteReader,
    prefixes: &Prefixes,
    opcode: Opcode,
    operands: Vec<Operand>,
    start: usize,
) -> Result<Instruction> {
    // A group-2 segment override already renders inside a memory operand
    // (`SegmentRegister` wrapping in `resolve_indirect_operand`); only surface
    // it as a leading prefix keyword for the branch-hint case, where no
    // memory operand exists to carry it.
    let has_indirect = operands.iter().any(|op| matches!(op, Operand::Indirect(_)));
    let prefix = display_prefix(prefixes, has_indirect);
    let length = reader.position() - start;
    Instruction::new(prefix, opcode, &operands, length).map_err(DecodeError::DecodingError)
}

fn display_prefix(prefixes: &Prefixes, has_indirect: bool) -> Option<InstructionPrefix> {
    match prefixes.group1 {
        Some(Group1::Lock) => Some(InstructionPrefix::Lock),
        Some(Group1::Rep) => Some(InstructionPrefix::Rep),
        Some(Group1::Repnz) => Some(InstructionPrefix::Repne),
        None if has_indirect => None,
        None => prefixes.group2.map(InstructionPrefix::Segment),
    }
}

/// `16` if the operand-size override is present, `64` if REX.W/VEX.W is set,
/// else `32` — the operand-width resolution rule repeated throughout the
/// single- and two-byte tables.
pub(crate) fn operand_width(prefixes: &Prefixes) -> crate::register::OperandWidth {
    use crate::register::OperandWidth;
    if prefixes.rex_or_vex_w() {
        OperandWidth::Bits64
    } else if prefixes.operand_size_override {
        OperandWidth::Bits16
    } else {
        OperandWidth::Bits32
    }
}

pub(crate) fn pointer_size_for_width(width: crate::register::OperandWidth) -> crate::operand::PointerSize {
    use crate::operand::PointerSize;
    use crate::register::OperandWidth;
    match width {
        OperandWidth::Bits8 => PointerSize::Byte,
        OperandWidth::Bits16 => PointerSize::Word,
        OperandWidth::Bits32 => PointerSize::Dword,
        OperandWidth::Bits64 => PointerSize::Qword,
    }
}
