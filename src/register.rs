//! Register taxonomy and the code->register resolution rules used while
//! decoding ModR/M, SIB, VEX and EVEX register fields.

use core::fmt;

/// 8-bit general-purpose registers.
///
/// Codes 4..=7 are ambiguous in isolation: without a REX prefix they name
/// `AH/CH/DH/BH`, with one they name `SPL/BPL/SIL/DIL`. Callers must resolve
/// this via [`Gpr8::from_code`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub enum Gpr8 {
    Al, Cl, Dl, Bl, Ah, Ch, Dh, Bh,
    Spl, Bpl, Sil, Dil,
    R8b, R9b, R10b, R11b, R12b, R13b, R14b, R15b,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub enum Gpr16 {
    Ax, Cx, Dx, Bx, Sp, Bp, Si, Di,
    R8w, R9w, R10w, R11w, R12w, R13w, R14w, R15w,
    Ip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub enum Gpr32 {
    Eax, Ecx, Edx, Ebx, Esp, Ebp, Esi, Edi,
    R8d, R9d, R10d, R11d, R12d, R13d, R14d, R15d,
    Eip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub enum Gpr64 {
    Rax, Rcx, Rdx, Rbx, Rsp, Rbp, Rsi, Rdi,
    R8, R9, R10, R11, R12, R13, R14, R15,
    Rip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub enum Mmx {
    Mm0, Mm1, Mm2, Mm3, Mm4, Mm5, Mm6, Mm7,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub struct Xmm(pub u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub struct Ymm(pub u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub struct Zmm(pub u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub struct MaskRegister(pub u8);

/// A segment used both as a legacy-prefix override marker and as the
/// `segment` field of [`Register::Segment`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub enum Segment {
    Cs, Ss, Ds, Es, Fs, Gs,
}

impl Segment {
    pub fn mnemonic(self) -> &'static str {
        match self {
            Segment::Cs => "cs",
            Segment::Ss => "ss",
            Segment::Ds => "ds",
            Segment::Es => "es",
            Segment::Fs => "fs",
            Segment::Gs => "gs",
        }
    }

    pub fn from_mnemonic(s: &str) -> Option<Segment> {
        Some(match s {
            "cs" => Segment::Cs,
            "ss" => Segment::Ss,
            "ds" => Segment::Ds,
            "es" => Segment::Es,
            "fs" => Segment::Fs,
            "gs" => Segment::Gs,
            _ => return None,
        })
    }
}

/// Any register this crate can name.
///
/// `Segment` is not a standalone architectural register family; it wraps an
/// inner register to express a segment-qualified memory base, e.g. `es:[rdi]`
/// inside an [`crate::operand::IndirectOperand`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub enum Register {
    Gpr8(Gpr8),
    Gpr16(Gpr16),
    Gpr32(Gpr32),
    Gpr64(Gpr64),
    Mmx(Mmx),
    Xmm(Xmm),
    Ymm(Ymm),
    Zmm(Zmm),
    Mask(MaskRegister),
    /// A register qualified by a segment override, used only inside
    /// indirect-operand bases (e.g. `es:[rdi]`).
    Segment(Segment, Box<Register>),
}

impl Register {
    /// Width of this register in bits.
    pub fn bits(&self) -> u16 {
        match self {
            Register::Gpr8(_) => 8,
            Register::Gpr16(_) => 16,
            Register::Gpr32(_) => 32,
            Register::Gpr64(_) => 64,
            Register::Mmx(_) => 64,
            Register::Xmm(_) => 128,
            Register::Ymm(_) => 256,
            Register::Zmm(_) => 512,
            Register::Mask(_) => 64,
            Register::Segment(_, inner) => inner.bits(),
        }
    }

    /// Lowercase Intel-syntax mnemonic, e.g. `rax`, `xmm3`, `k1`.
    pub fn mnemonic(&self) -> String {
        match self {
            Register::Gpr8(r) => r.mnemonic().to_owned(),
            Register::Gpr16(r) => r.mnemonic().to_owned(),
            Register::Gpr32(r) => r.mnemonic().to_owned(),
            Register::Gpr64(r) => r.mnemonic().to_owned(),
            Register::Mmx(r) => r.mnemonic().to_owned(),
            Register::Xmm(Xmm(n)) => format!("xmm{n}"),
            Register::Ymm(Ymm(n)) => format!("ymm{n}"),
            Register::Zmm(Zmm(n)) => format!("zmm{n}"),
            Register::Mask(MaskRegister(n)) => format!("k{n}"),
            Register::Segment(seg, inner) => format!("{}:{}", seg.mnemonic(), inner.mnemonic()),
        }
    }

    /// True for `RSP`/`ESP`, which may never appear as a SIB index.
    pub fn is_stack_pointer(&self) -> bool {
        matches!(self, Register::Gpr64(Gpr64::Rsp) | Register::Gpr32(Gpr32::Esp))
    }

    /// True for `RIP`/`EIP`.
    pub fn is_instruction_pointer(&self) -> bool {
        matches!(self, Register::Gpr64(Gpr64::Rip) | Register::Gpr32(Gpr32::Eip))
    }

    /// Parses a bare register name (no segment qualifier) as it would
    /// appear in `from_intel_syntax` input, e.g. `rax`, `xmm3`, `k1`.
    pub fn from_mnemonic(s: &str) -> Option<Register> {
        if let Some(n) = s.strip_prefix("xmm") {
            return n.parse().ok().map(|n| Register::Xmm(Xmm(n)));
        }
        if let Some(n) = s.strip_prefix("ymm") {
            return n.parse().ok().map(|n| Register::Ymm(Ymm(n)));
        }
        if let Some(n) = s.strip_prefix("zmm") {
            return n.parse().ok().map(|n| Register::Zmm(Zmm(n)));
        }
        if let Some(n) = s.strip_prefix('k') {
            if let Ok(n) = n.parse() {
                return Some(Register::Mask(MaskRegister(n)));
            }
        }
        if let Some(r) = Gpr64::from_mnemonic(s) {
            return Some(Register::Gpr64(r));
        }
        if let Some(r) = Gpr32::from_mnemonic(s) {
            return Some(Register::Gpr32(r));
        }
        if let Some(r) = Gpr16::from_mnemonic(s) {
            return Some(Register::Gpr16(r));
        }
        if let Some(r) = Gpr8::from_mnemonic(s) {
            return Some(Register::Gpr8(r));
        }
        if let Some(r) = Mmx::from_mnemonic(s) {
            return Some(Register::Mmx(r));
        }
        None
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mnemonic())
    }
}

impl Gpr8 {
    /// Resolves a 4-bit register code to an 8-bit register.
    ///
    /// `rex_present` disambiguates codes 4..=7: `AH/CH/DH/BH` without REX,
    /// `SPL/BPL/SIL/DIL` with REX (REX makes the high-byte registers
    /// unaddressable, per the SDM).
    pub fn from_code(code: u8, rex_present: bool) -> Option<Gpr8> {
        Some(match code {
            0 => Gpr8::Al,
            1 => Gpr8::Cl,
            2 => Gpr8::Dl,
            3 => Gpr8::Bl,
            4 => if rex_present { Gpr8::Spl } else { Gpr8::Ah },
            5 => if rex_present { Gpr8::Bpl } else { Gpr8::Ch },
            6 => if rex_present { Gpr8::Sil } else { Gpr8::Dh },
            7 => if rex_present { Gpr8::Dil } else { Gpr8::Bh },
            8 => Gpr8::R8b,
            9 => Gpr8::R9b,
            10 => Gpr8::R10b,
            11 => Gpr8::R11b,
            12 => Gpr8::R12b,
            13 => Gpr8::R13b,
            14 => Gpr8::R14b,
            15 => Gpr8::R15b,
            _ => return None,
        })
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Gpr8::Al => "al", Gpr8::Cl => "cl", Gpr8::Dl => "dl", Gpr8::Bl => "bl",
            Gpr8::Ah => "ah", Gpr8::Ch => "ch", Gpr8::Dh => "dh", Gpr8::Bh => "bh",
            Gpr8::Spl => "spl", Gpr8::Bpl => "bpl", Gpr8::Sil => "sil", Gpr8::Dil => "dil",
            Gpr8::R8b => "r8b", Gpr8::R9b => "r9b", Gpr8::R10b => "r10b", Gpr8::R11b => "r11b",
            Gpr8::R12b => "r12b", Gpr8::R13b => "r13b", Gpr8::R14b => "r14b", Gpr8::R15b => "r15b",
        }
    }

    pub fn from_mnemonic(s: &str) -> Option<Gpr8> {
        Some(match s {
            "al" => Gpr8::Al, "cl" => Gpr8::Cl, "dl" => Gpr8::Dl, "bl" => Gpr8::Bl,
            "ah" => Gpr8::Ah, "ch" => Gpr8::Ch, "dh" => Gpr8::Dh, "bh" => Gpr8::Bh,
            "spl" => Gpr8::Spl, "bpl" => Gpr8::Bpl, "sil" => Gpr8::Sil, "dil" => Gpr8::Dil,
            "r8b" => Gpr8::R8b, "r9b" => Gpr8::R9b, "r10b" => Gpr8::R10b, "r11b" => Gpr8::R11b,
            "r12b" => Gpr8::R12b, "r13b" => Gpr8::R13b, "r14b" => Gpr8::R14b, "r15b" => Gpr8::R15b,
            _ => return None,
        })
    }
}

impl Gpr16 {
    pub fn from_code(code: u8) -> Option<Gpr16> {
        Some(match code {
            0 => Gpr16::Ax, 1 => Gpr16::Cx, 2 => Gpr16::Dx, 3 => Gpr16::Bx,
            4 => Gpr16::Sp, 5 => Gpr16::Bp, 6 => Gpr16::Si, 7 => Gpr16::Di,
            8 => Gpr16::R8w, 9 => Gpr16::R9w, 10 => Gpr16::R10w, 11 => Gpr16::R11w,
            12 => Gpr16::R12w, 13 => Gpr16::R13w, 14 => Gpr16::R14w, 15 => Gpr16::R15w,
            _ => return None,
        })
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Gpr16::Ax => "ax", Gpr16::Cx => "cx", Gpr16::Dx => "dx", Gpr16::Bx => "bx",
            Gpr16::Sp => "sp", Gpr16::Bp => "bp", Gpr16::Si => "si", Gpr16::Di => "di",
            Gpr16::R8w => "r8w", Gpr16::R9w => "r9w", Gpr16::R10w => "r10w", Gpr16::R11w => "r11w",
            Gpr16::R12w => "r12w", Gpr16::R13w => "r13w", Gpr16::R14w => "r14w", Gpr16::R15w => "r15w",
            Gpr16::Ip => "ip",
        }
    }

    pub fn from_mnemonic(s: &str) -> Option<Gpr16> {
        Some(match s {
            "ax" => Gpr16::Ax, "cx" => Gpr16::Cx, "dx" => Gpr16::Dx, "bx" => Gpr16::Bx,
            "sp" => Gpr16::Sp, "bp" => Gpr16::Bp, "si" => Gpr16::Si, "di" => Gpr16::Di,
            "r8w" => Gpr16::R8w, "r9w" => Gpr16::R9w, "r10w" => Gpr16::R10w, "r11w" => Gpr16::R11w,
            "r12w" => Gpr16::R12w, "r13w" => Gpr16::R13w, "r14w" => Gpr16::R14w, "r15w" => Gpr16::R15w,
            "ip" => Gpr16::Ip,
            _ => return None,
        })
    }
}

impl Gpr32 {
    pub fn from_code(code: u8) -> Option<Gpr32> {
        Some(match code {
            0 => Gpr32::Eax, 1 => Gpr32::Ecx, 2 => Gpr32::Edx, 3 => Gpr32::Ebx,
            4 => Gpr32::Esp, 5 => Gpr32::Ebp, 6 => Gpr32::Esi, 7 => Gpr32::Edi,
            8 => Gpr32::R8d, 9 => Gpr32::R9d, 10 => Gpr32::R10d, 11 => Gpr32::R11d,
            12 => Gpr32::R12d, 13 => Gpr32::R13d, 14 => Gpr32::R14d, 15 => Gpr32::R15d,
            _ => return None,
        })
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Gpr32::Eax => "eax", Gpr32::Ecx => "ecx", Gpr32::Edx => "edx", Gpr32::Ebx => "ebx",
            Gpr32::Esp => "esp", Gpr32::Ebp => "ebp", Gpr32::Esi => "esi", Gpr32::Edi => "edi",
            Gpr32::R8d => "r8d", Gpr32::R9d => "r9d", Gpr32::R10d => "r10d", Gpr32::R11d => "r11d",
            Gpr32::R12d => "r12d", Gpr32::R13d => "r13d", Gpr32::R14d => "r14d", Gpr32::R15d => "r15d",
            Gpr32::Eip => "eip",
        }
    }

    pub fn from_mnemonic(s: &str) -> Option<Gpr32> {
        Some(match s {
            "eax" => Gpr32::Eax, "ecx" => Gpr32::Ecx, "edx" => Gpr32::Edx, "ebx" => Gpr32::Ebx,
            "esp" => Gpr32::Esp, "ebp" => Gpr32::Ebp, "esi" => Gpr32::Esi, "edi" => Gpr32::Edi,
            "r8d" => Gpr32::R8d, "r9d" => Gpr32::R9d, "r10d" => Gpr32::R10d, "r11d" => Gpr32::R11d,
            "r12d" => Gpr32::R12d, "r13d" => Gpr32::R13d, "r14d" => Gpr32::R14d, "r15d" => Gpr32::R15d,
            "eip" => Gpr32::Eip,
            _ => return None,
        })
    }
}

impl Gpr64 {
    pub fn from_code(code: u8) -> Option<Gpr64> {
        Some(match code {
            0 => Gpr64::Rax, 1 => Gpr64::Rcx, 2 => Gpr64::Rdx, 3 => Gpr64::Rbx,
            4 => Gpr64::Rsp, 5 => Gpr64::Rbp, 6 => Gpr64::Rsi, 7 => Gpr64::Rdi,
            8 => Gpr64::R8, 9 => Gpr64::R9, 10 => Gpr64::R10, 11 => Gpr64::R11,
            12 => Gpr64::R12, 13 => Gpr64::R13, 14 => Gpr64::R14, 15 => Gpr64::R15,
            _ => return None,
        })
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Gpr64::Rax => "rax", Gpr64::Rcx => "rcx", Gpr64::Rdx => "rdx", Gpr64::Rbx => "rbx",
            Gpr64::Rsp => "rsp", Gpr64::Rbp => "rbp", Gpr64::Rsi => "rsi", Gpr64::Rdi => "rdi",
            Gpr64::R8 => "r8", Gpr64::R9 => "r9", Gpr64::R10 => "r10", Gpr64::R11 => "r11",
            Gpr64::R12 => "r12", Gpr64::R13 => "r13", Gpr64::R14 => "r14", Gpr64::R15 => "r15",
            Gpr64::Rip => "rip",
        }
    }

    pub fn from_mnemonic(s: &str) -> Option<Gpr64> {
        Some(match s {
            "rax" => Gpr64::Rax, "rcx" => Gpr64::Rcx, "rdx" => Gpr64::Rdx, "rbx" => Gpr64::Rbx,
            "rsp" => Gpr64::Rsp, "rbp" => Gpr64::Rbp, "rsi" => Gpr64::Rsi, "rdi" => Gpr64::Rdi,
            "r8" => Gpr64::R8, "r9" => Gpr64::R9, "r10" => Gpr64::R10, "r11" => Gpr64::R11,
            "r12" => Gpr64::R12, "r13" => Gpr64::R13, "r14" => Gpr64::R14, "r15" => Gpr64::R15,
            "rip" => Gpr64::Rip,
            _ => return None,
        })
    }
}

impl Mmx {
    pub fn from_code(code: u8) -> Option<Mmx> {
        Some(match code & 0x7 {
            0 => Mmx::Mm0, 1 => Mmx::Mm1, 2 => Mmx::Mm2, 3 => Mmx::Mm3,
            4 => Mmx::Mm4, 5 => Mmx::Mm5, 6 => Mmx::Mm6, 7 => Mmx::Mm7,
            _ => unreachable!(),
        })
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Mmx::Mm0 => "mm0", Mmx::Mm1 => "mm1", Mmx::Mm2 => "mm2", Mmx::Mm3 => "mm3",
            Mmx::Mm4 => "mm4", Mmx::Mm5 => "mm5", Mmx::Mm6 => "mm6", Mmx::Mm7 => "mm7",
        }
    }

    pub fn from_mnemonic(s: &str) -> Option<Mmx> {
        Some(match s {
            "mm0" => Mmx::Mm0, "mm1" => Mmx::Mm1, "mm2" => Mmx::Mm2, "mm3" => Mmx::Mm3,
            "mm4" => Mmx::Mm4, "mm5" => Mmx::Mm5, "mm6" => Mmx::Mm6, "mm7" => Mmx::Mm7,
            _ => return None,
        })
    }
}

/// Operand width class, used to pick which GPR family a raw register code
/// resolves into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandWidth {
    Bits8,
    Bits16,
    Bits32,
    Bits64,
}

/// Resolves a 4-bit (already-extended) general-purpose register code to a
/// concrete [`Register`], per the requested operand width.
pub fn gpr_from_code(code: u8, width: OperandWidth, rex_present: bool) -> Option<Register> {
    Some(match width {
        OperandWidth::Bits8 => Register::Gpr8(Gpr8::from_code(code, rex_present)?),
        OperandWidth::Bits16 => Register::Gpr16(Gpr16::from_code(code)?),
        OperandWidth::Bits32 => Register::Gpr32(Gpr32::from_code(code)?),
        OperandWidth::Bits64 => Register::Gpr64(Gpr64::from_code(code)?),
    })
}

/// Resolves a vector register code (XMM/YMM/ZMM) at the given vector width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorWidth {
    Xmm,
    Ymm,
    Zmm,
}

pub fn vector_from_code(code: u8, width: VectorWidth) -> Register {
    match width {
        VectorWidth::Xmm => Register::Xmm(Xmm(code)),
        VectorWidth::Ymm => Register::Ymm(Ymm(code)),
        VectorWidth::Zmm => Register::Zmm(Zmm(code)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gpr8_code_4_to_7_depends_on_rex() {
        assert_eq!(Gpr8::from_code(4, false), Some(Gpr8::Ah));
        assert_eq!(Gpr8::from_code(4, true), Some(Gpr8::Spl));
        assert_eq!(Gpr8::from_code(7, false), Some(Gpr8::Bh));
        assert_eq!(Gpr8::from_code(7, true), Some(Gpr8::Dil));
    }

    #[test]
    fn mnemonics_are_lowercase() {
        assert_eq!(Register::Gpr64(Gpr64::Rax).mnemonic(), "rax");
        assert_eq!(Register::Xmm(Xmm(3)).mnemonic(), "xmm3");
        assert_eq!(Register::Mask(MaskRegister(1)).mnemonic(), "k1");
    }

    #[test]
    fn stack_pointer_detection() {
        assert!(Register::Gpr64(Gpr64::Rsp).is_stack_pointer());
        assert!(Register::Gpr32(Gpr32::Esp).is_stack_pointer());
        assert!(!Register::Gpr64(Gpr64::Rbp).is_stack_pointer());
    }
}
