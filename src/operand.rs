//! The operand model: registers, immediates, and indirect memory references.

use core::fmt;

use crate::register::Register;

/// The declared width of a memory access. Drives the `PTR` prefix on
/// indirect operands (suppressed for `LEA`, see [`crate::formatter`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub enum PointerSize {
    Byte,
    Word,
    Dword,
    Qword,
    Xmmword,
    Ymmword,
    Zmmword,
}

impl PointerSize {
    pub fn keyword(self) -> &'static str {
        match self {
            PointerSize::Byte => "BYTE",
            PointerSize::Word => "WORD",
            PointerSize::Dword => "DWORD",
            PointerSize::Qword => "QWORD",
            PointerSize::Xmmword => "XMMWORD",
            PointerSize::Ymmword => "YMMWORD",
            PointerSize::Zmmword => "ZMMWORD",
        }
    }

    pub fn from_keyword(s: &str) -> Option<PointerSize> {
        Some(match s {
            "BYTE" => PointerSize::Byte,
            "WORD" => PointerSize::Word,
            "DWORD" => PointerSize::Dword,
            "QWORD" => PointerSize::Qword,
            "XMMWORD" => PointerSize::Xmmword,
            "YMMWORD" => PointerSize::Ymmword,
            "ZMMWORD" => PointerSize::Zmmword,
            _ => return None,
        })
    }

    pub fn bits(self) -> u16 {
        match self {
            PointerSize::Byte => 8,
            PointerSize::Word => 16,
            PointerSize::Dword => 32,
            PointerSize::Qword => 64,
            PointerSize::Xmmword => 128,
            PointerSize::Ymmword => 256,
            PointerSize::Zmmword => 512,
        }
    }
}

/// A signed, fixed-width immediate operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub struct Immediate {
    /// Stored sign-extended to 64 bits; `width` records the architectural
    /// encoding width so the formatter can pad hex output correctly.
    pub value: i64,
    pub width: ImmediateWidth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub enum ImmediateWidth {
    Bits8,
    Bits16,
    Bits32,
    Bits64,
}

impl ImmediateWidth {
    pub fn bits(self) -> u32 {
        match self {
            ImmediateWidth::Bits8 => 8,
            ImmediateWidth::Bits16 => 16,
            ImmediateWidth::Bits32 => 32,
            ImmediateWidth::Bits64 => 64,
        }
    }

    pub fn hex_digits(self) -> usize {
        (self.bits() / 4) as usize
    }
}

impl Immediate {
    pub fn new(value: i64, width: ImmediateWidth) -> Immediate {
        Immediate { value, width }
    }

    pub fn from_u8(v: u8) -> Immediate {
        Immediate::new(v as i8 as i64, ImmediateWidth::Bits8)
    }

    pub fn from_u8_unsigned(v: u8) -> Immediate {
        Immediate::new(v as i64, ImmediateWidth::Bits8)
    }

    pub fn from_i8(v: i8) -> Immediate {
        Immediate::new(v as i64, ImmediateWidth::Bits8)
    }

    pub fn from_u16(v: u16) -> Immediate {
        Immediate::new(v as i16 as i64, ImmediateWidth::Bits16)
    }

    pub fn from_u32(v: u32) -> Immediate {
        Immediate::new(v as i32 as i64, ImmediateWidth::Bits32)
    }

    pub fn from_u32_unsigned(v: u32) -> Immediate {
        Immediate::new(v as i64, ImmediateWidth::Bits32)
    }

    pub fn from_u64(v: u64) -> Immediate {
        Immediate::new(v as i64, ImmediateWidth::Bits64)
    }

    /// Sign-extends a 32-bit immediate to 64 bits, for operand-size classes
    /// that require it (e.g. most 64-bit arithmetic with an imm32 encoding).
    pub fn sign_extend_to_64(self) -> Immediate {
        Immediate::new(self.value, ImmediateWidth::Bits64)
    }

    /// The value reinterpreted as unsigned, truncated to the immediate's
    /// declared width. Used by the formatter for `0x..` rendering.
    pub fn unsigned_bits(self) -> u64 {
        match self.width {
            ImmediateWidth::Bits8 => self.value as u8 as u64,
            ImmediateWidth::Bits16 => self.value as u16 as u64,
            ImmediateWidth::Bits32 => self.value as u32 as u64,
            ImmediateWidth::Bits64 => self.value as u64,
        }
    }
}

/// A signed displacement, tagged by its encoded width (distinct from
/// [`ImmediateWidth`] because a displacement is never 16 or 64 bits wide in
/// this codebase's supported addressing forms).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub enum Displacement {
    Byte(i8),
    Dword(i32),
}

impl Displacement {
    pub fn value(self) -> i64 {
        match self {
            Displacement::Byte(v) => v as i64,
            Displacement::Dword(v) => v as i64,
        }
    }
}

/// A memory reference: `[base + index*scale + disp]`, segment-qualified by
/// wrapping `base` in [`Register::Segment`] where applicable.
///
/// Constructed only through [`IndirectOperand::new`], which enforces the
/// invariants from the data model: at least one of base/index/displacement
/// is present, base and index share a bit width, scale is one of 1/2/4/8,
/// `RIP`/`EIP` appear only as a bare base, and `RSP`/`ESP` never appear as
/// an index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub struct IndirectOperand {
    pub pointer_size: PointerSize,
    pub base: Option<Register>,
    pub index: Option<Register>,
    pub scale: Option<u8>,
    pub displacement: Option<Displacement>,
}

impl IndirectOperand {
    pub fn new(
        pointer_size: PointerSize,
        base: Option<Register>,
        index: Option<Register>,
        scale: Option<u8>,
        displacement: Option<Displacement>,
    ) -> Result<IndirectOperand, String> {
        if base.is_none() && index.is_none() && displacement.is_none() {
            return Err("indirect operand needs at least one of base/index/displacement".into());
        }
        if let (Some(b), Some(i)) = (&base, &index) {
            if b.bits() != i.bits() {
                return Err("base and index must share a bit width".into());
            }
        }
        if let Some(s) = scale {
            if ![1u8, 2, 4, 8].contains(&s) {
                return Err(format!("invalid scale {s}"));
            }
        }
        if let Some(b) = &base {
            if b.is_instruction_pointer() && (index.is_some() || scale.is_some()) {
                return Err("rip/eip base may not combine with an index or scale".into());
            }
        }
        if let Some(i) = &index {
            if i.is_stack_pointer() {
                return Err("rsp/esp may not appear as an index".into());
            }
        }
        Ok(IndirectOperand {
            pointer_size,
            base,
            index,
            scale,
            displacement,
        })
    }
}

/// Any operand an [`crate::instruction::Instruction`] may carry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub enum Operand {
    Register(Register),
    Immediate(Immediate),
    Indirect(IndirectOperand),
    /// A relative branch displacement (e.g. `JMP rel8/rel32`); stored as an
    /// immediate rather than pre-resolved against RIP, per §4.4.
    Relative(Immediate),
}

impl Operand {
    pub fn as_register(&self) -> Option<&Register> {
        match self {
            Operand::Register(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_indirect(&self) -> Option<&IndirectOperand> {
        match self {
            Operand::Indirect(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_immediate(&self) -> Option<&Immediate> {
        match self {
            Operand::Immediate(i) | Operand::Relative(i) => Some(i),
            _ => None,
        }
    }
}

impl fmt::Display for Displacement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::register::{Gpr32, Gpr64};

    #[test]
    fn rejects_empty_indirect_operand() {
        assert!(IndirectOperand::new(PointerSize::Dword, None, None, None, None).is_err());
    }

    #[test]
    fn rejects_mismatched_base_index_width() {
        let base = Some(Register::Gpr64(Gpr64::Rax));
        let index = Some(Register::Gpr32(Gpr32::Ecx));
        assert!(IndirectOperand::new(PointerSize::Qword, base, index, Some(1), None).is_err());
    }

    #[test]
    fn rejects_esp_as_index() {
        let base = Some(Register::Gpr64(Gpr64::Rax));
        let index = Some(Register::Gpr64(Gpr64::Rsp));
        assert!(IndirectOperand::new(PointerSize::Qword, base, index, Some(1), None).is_err());
    }

    #[test]
    fn rejects_rip_with_index() {
        let base = Some(Register::Gpr64(Gpr64::Rip));
        let index = Some(Register::Gpr64(Gpr64::Rcx));
        assert!(IndirectOperand::new(PointerSize::Qword, base, index, Some(1), None).is_err());
    }

    #[test]
    fn accepts_displacement_only() {
        let op = IndirectOperand::new(
            PointerSize::Dword,
            None,
            None,
            None,
            Some(Displacement::Dword(0x1000)),
        );
        assert!(op.is_ok());
    }
}
