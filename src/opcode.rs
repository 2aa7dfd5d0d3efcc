//! The opcode enumeration and its Intel-syntax mnemonic strings.

use core::fmt;

/// One of the sixteen x86 condition codes, shared by `Jcc`, `SETcc` and
/// `CMOVcc` (`0F 80..8F`, `0F 90..9F`, `0F 40..4F`), each selected by the
/// low nibble of the second opcode byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub enum Condition {
    O, No, B, Ae, E, Ne, Be, A, S, Ns, P, Np, L, Ge, Le, G,
}

impl Condition {
    pub const ALL: [Condition; 16] = [
        Condition::O, Condition::No, Condition::B, Condition::Ae,
        Condition::E, Condition::Ne, Condition::Be, Condition::A,
        Condition::S, Condition::Ns, Condition::P, Condition::Np,
        Condition::L, Condition::Ge, Condition::Le, Condition::G,
    ];

    pub fn from_nibble(nibble: u8) -> Condition {
        Condition::ALL[(nibble & 0xF) as usize]
    }

    pub fn to_nibble(self) -> u8 {
        Condition::ALL.iter().position(|&c| c == self).unwrap() as u8
    }

    /// The two-letter-or-longer suffix appended to `j`/`set`/`cmov`.
    pub fn suffix(self) -> &'static str {
        match self {
            Condition::O => "o", Condition::No => "no",
            Condition::B => "b", Condition::Ae => "ae",
            Condition::E => "e", Condition::Ne => "ne",
            Condition::Be => "be", Condition::A => "a",
            Condition::S => "s", Condition::Ns => "ns",
            Condition::P => "p", Condition::Np => "np",
            Condition::L => "l", Condition::Ge => "ge",
            Condition::Le => "le", Condition::G => "g",
        }
    }

    pub fn from_suffix(s: &str) -> Option<Condition> {
        Condition::ALL.into_iter().find(|c| c.suffix() == s)
    }
}

/// The instructions this codebase recognizes, each with a fixed Intel
/// mnemonic. Extending coverage to further SDM Vol. 2 Appendix A entries
/// means adding a variant here plus the corresponding dispatch-table arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub enum Opcode {
    // Arithmetic/logic, rows 00..3F.
    Add, Or, Adc, Sbb, And, Sub, Xor, Cmp,

    // Data movement.
    Mov, Movabs, Movzx, Movsx, Movsxd, Lea, Xchg,
    Push, Pop, Pushf, Popf,

    // Control flow.
    Jmp, JmpFar, Call, CallFar, Ret, RetFar, Jcc(Condition),
    Loop, Loope, Loopne, Jrcxz, Int3, Int, Into, Iret, Hlt, Syscall, Sysret,

    // Flags/misc single-byte.
    Clc, Stc, Cli, Sti, Cld, Std, Cmc, Lahf, Sahf,
    Cbw, Cwde, Cdqe, Cwd, Cdq, Cqo, Nop, Ud2, Wait, Leave, Cpuid, Rdtsc,

    // String operations.
    Movs, Cmps, Scas, Lods, Stos, Ins, Outs,

    // Group 2: shifts/rotates.
    Rol, Ror, Rcl, Rcr, Shl, Sar, Shr,

    // Group 3.
    Test, Not, Neg, Mul, Imul, Div, Idiv,

    // Group 4/5.
    Inc, Dec,

    // Two-byte map extras.
    Setcc(Condition), Cmovcc(Condition),
    Bt, Bts, Btr, Btc, Bsf, Bsr, Bswap,
    Xadd, Cmpxchg, Cmpxchg8b, Cmpxchg16b,
    Rdrand, Rdseed, Xgetbv, Sfence, Lfence, Mfence,
    Incsspq, Prefetchnta, Prefetcht0, Prefetcht1, Prefetcht2,

    // SSE/SSE2 data movement and arithmetic (subset this codebase enumerates).
    Movups, Movupd, Movaps, Movapd, Movss, Movsd, Movdqa, Movdqu, Movd, Movq,
    Addss, Addsd, Addps, Addpd, Subss, Subsd, Subps, Subpd,
    Mulss, Mulsd, Mulps, Mulpd, Divss, Divsd, Divps, Divpd,
    Comiss, Comisd, Cvtsi2ss, Cvtsi2sd, Cvttss2si, Cvttsd2si,
    Pand, Por, Pxor, Paddb, Paddw, Paddd, Paddq, Psubb, Psubw, Psubd, Psubq,
    Psrlw, Psrld, Psrlq, Psraw, Psrad, Psllw, Pslld, Psllq, Psrldq, Pslldq,

    // Three-byte opcode-map extras (`0F 38`/`0F 3A`), representative subset.
    Pshufb, Movbe, Palignr,

    // VEX-encoded forms this codebase enumerates.
    Vmovdqa, Vmovdqu, Vpxor, Vpand, Vpor, Vpcmpeqb, Vpshufb,
}

impl Opcode {
    /// Lowercase Intel-syntax mnemonic.
    pub fn mnemonic(self) -> String {
        use Opcode::*;
        match self {
            Add => "add".into(), Or => "or".into(), Adc => "adc".into(), Sbb => "sbb".into(),
            And => "and".into(), Sub => "sub".into(), Xor => "xor".into(), Cmp => "cmp".into(),
            Mov => "mov".into(), Movabs => "movabs".into(),
            Movzx => "movzx".into(), Movsx => "movsx".into(), Movsxd => "movsxd".into(),
            Lea => "lea".into(), Xchg => "xchg".into(),
            Push => "push".into(), Pop => "pop".into(), Pushf => "pushf".into(), Popf => "popf".into(),
            Jmp => "jmp".into(), JmpFar => "jmp far".into(),
            Call => "call".into(), CallFar => "call far".into(),
            Ret => "ret".into(), RetFar => "retf".into(),
            Jcc(c) => format!("j{}", c.suffix()),
            Loop => "loop".into(), Loope => "loope".into(), Loopne => "loopne".into(), Jrcxz => "jrcxz".into(),
            Int3 => "int3".into(), Int => "int".into(), Into => "into".into(), Iret => "iret".into(),
            Hlt => "hlt".into(), Syscall => "syscall".into(), Sysret => "sysret".into(),
            Clc => "clc".into(), Stc => "stc".into(), Cli => "cli".into(), Sti => "sti".into(),
            Cld => "cld".into(), Std => "std".into(), Cmc => "cmc".into(),
            Lahf => "lahf".into(), Sahf => "sahf".into(),
            Cbw => "cbw".into(), Cwde => "cwde".into(), Cdqe => "cdqe".into(),
            Cwd => "cwd".into(), Cdq => "cdq".into(), Cqo => "cqo".into(),
            Nop => "nop".into(), Ud2 => "ud2".into(), Wait => "wait".into(), Leave => "leave".into(),
            Cpuid => "cpuid".into(), Rdtsc => "rdtsc".into(),
            Movs => "movs".into(), Cmps => "cmps".into(), Scas => "scas".into(),
            Lods => "lods".into(), Stos => "stos".into(), Ins => "ins".into(), Outs => "outs".into(),
            Rol => "rol".into(), Ror => "ror".into(), Rcl => "rcl".into(), Rcr => "rcr".into(),
            Shl => "shl".into(), Sar => "sar".into(), Shr => "shr".into(),
            Test => "test".into(), Not => "not".into(), Neg => "neg".into(),
            Mul => "mul".into(), Imul => "imul".into(), Div => "div".into(), Idiv => "idiv".into(),
            Inc => "inc".into(), Dec => "dec".into(),
            Setcc(c) => format!("set{}", c.suffix()),
            Cmovcc(c) => format!("cmov{}", c.suffix()),
            Bt => "bt".into(), Bts => "bts".into(), Btr => "btr".into(), Btc => "btc".into(),
            Bsf => "bsf".into(), Bsr => "bsr".into(), Bswap => "bswap".into(),
            Xadd => "xadd".into(), Cmpxchg => "cmpxchg".into(),
            Cmpxchg8b => "cmpxchg8b".into(), Cmpxchg16b => "cmpxchg16b".into(),
            Rdrand => "rdrand".into(), Rdseed => "rdseed".into(), Xgetbv => "xgetbv".into(),
            Sfence => "sfence".into(), Lfence => "lfence".into(), Mfence => "mfence".into(),
            Incsspq => "incsspq".into(),
            Prefetchnta => "prefetchnta".into(), Prefetcht0 => "prefetcht0".into(),
            Prefetcht1 => "prefetcht1".into(), Prefetcht2 => "prefetcht2".into(),
            Movups => "movups".into(), Movupd => "movupd".into(),
            Movaps => "movaps".into(), Movapd => "movapd".into(),
            Movss => "movss".into(), Movsd => "movsd".into(),
            Movdqa => "movdqa".into(), Movdqu => "movdqu".into(),
            Movd => "movd".into(), Movq => "movq".into(),
            Addss => "addss".into(), Addsd => "addsd".into(), Addps => "addps".into(), Addpd => "addpd".into(),
            Subss => "subss".into(), Subsd => "subsd".into(), Subps => "subps".into(), Subpd => "subpd".into(),
            Mulss => "mulss".into(), Mulsd => "mulsd".into(), Mulps => "mulps".into(), Mulpd => "mulpd".into(),
            Divss => "divss".into(), Divsd => "divsd".into(), Divps => "divps".into(), Divpd => "divpd".into(),
            Comiss => "comiss".into(), Comisd => "comisd".into(),
            Cvtsi2ss => "cvtsi2ss".into(), Cvtsi2sd => "cvtsi2sd".into(),
            Cvttss2si => "cvttss2si".into(), Cvttsd2si => "cvttsd2si".into(),
            Pand => "pand".into(), Por => "por".into(), Pxor => "pxor".into(),
            Paddb => "paddb".into(), Paddw => "paddw".into(), Paddd => "paddd".into(), Paddq => "paddq".into(),
            Psubb => "psubb".into(), Psubw => "psubw".into(), Psubd => "psubd".into(), Psubq => "psubq".into(),
            Psrlw => "psrlw".into(), Psrld => "psrld".into(), Psrlq => "psrlq".into(),
            Psraw => "psraw".into(), Psrad => "psrad".into(),
            Psllw => "psllw".into(), Pslld => "pslld".into(), Psllq => "psllq".into(),
            Psrldq => "psrldq".into(), Pslldq => "pslldq".into(),
            Pshufb => "pshufb".into(), Movbe => "movbe".into(), Palignr => "palignr".into(),
            Vmovdqa => "vmovdqa".into(), Vmovdqu => "vmovdqu".into(),
            Vpxor => "vpxor".into(), Vpand => "vpand".into(), Vpor => "vpor".into(),
            Vpcmpeqb => "vpcmpeqb".into(), Vpshufb => "vpshufb".into(),
        }
    }

    /// Parses a mnemonic (as it would appear in `from_intel_syntax` input).
    pub fn from_mnemonic(s: &str) -> Option<Opcode> {
        use Opcode::*;
        if let Some(suffix) = s.strip_prefix("cmov") {
            return Condition::from_suffix(suffix).map(Cmovcc);
        }
        if let Some(suffix) = s.strip_prefix("set") {
            return Condition::from_suffix(suffix).map(Setcc);
        }
        if s != "jmp" && s != "jrcxz" {
            if let Some(suffix) = s.strip_prefix('j') {
                if let Some(c) = Condition::from_suffix(suffix) {
                    return Some(Jcc(c));
                }
            }
        }
        Some(match s {
            "add" => Add, "or" => Or, "adc" => Adc, "sbb" => Sbb,
            "and" => And, "sub" => Sub, "xor" => Xor, "cmp" => Cmp,
            "mov" => Mov, "movabs" => Movabs, "movzx" => Movzx, "movsx" => Movsx, "movsxd" => Movsxd,
            "lea" => Lea, "xchg" => Xchg,
            "push" => Push, "pop" => Pop, "pushf" => Pushf, "popf" => Popf,
            "jmp" => Jmp, "call" => Call, "ret" => Ret, "retf" => RetFar,
            "loop" => Loop, "loope" => Loope, "loopne" => Loopne, "jrcxz" => Jrcxz,
            "int3" => Int3, "int" => Int, "into" => Into, "iret" => Iret,
            "hlt" => Hlt, "syscall" => Syscall, "sysret" => Sysret,
            "clc" => Clc, "stc" => Stc, "cli" => Cli, "sti" => Sti,
            "cld" => Cld, "std" => Std, "cmc" => Cmc,
            "lahf" => Lahf, "sahf" => Sahf,
            "cbw" => Cbw, "cwde" => Cwde, "cdqe" => Cdqe,
            "cwd" => Cwd, "cdq" => Cdq, "cqo" => Cqo,
            "nop" => Nop, "ud2" => Ud2, "wait" => Wait, "leave" => Leave,
            "cpuid" => Cpuid, "rdtsc" => Rdtsc,
            "movs" => Movs, "cmps" => Cmps, "scas" => Scas, "lods" => Lods, "stos" => Stos,
            "ins" => Ins, "outs" => Outs,
            "rol" => Rol, "ror" => Ror, "rcl" => Rcl, "rcr" => Rcr,
            "shl" => Shl, "sar" => Sar, "shr" => Shr,
            "test" => Test, "not" => Not, "neg" => Neg,
            "mul" => Mul, "imul" => Imul, "div" => Div, "idiv" => Idiv,
            "inc" => Inc, "dec" => Dec,
            "bt" => Bt, "bts" => Bts, "btr" => Btr, "btc" => Btc,
            "bsf" => Bsf, "bsr" => Bsr, "bswap" => Bswap,
            "xadd" => Xadd, "cmpxchg" => Cmpxchg,
            "cmpxchg8b" => Cmpxchg8b, "cmpxchg16b" => Cmpxchg16b,
            "rdrand" => Rdrand, "rdseed" => Rdseed, "xgetbv" => Xgetbv,
            "sfence" => Sfence, "lfence" => Lfence, "mfence" => Mfence,
            "incsspq" => Incsspq,
            "prefetchnta" => Prefetchnta, "prefetcht0" => Prefetcht0,
            "prefetcht1" => Prefetcht1, "prefetcht2" => Prefetcht2,
            "movups" => Movups, "movupd" => Movupd, "movaps" => Movaps, "movapd" => Movapd,
            "movss" => Movss, "movsd" => Movsd, "movdqa" => Movdqa, "movdqu" => Movdqu,
            "movd" => Movd, "movq" => Movq,
            "addss" => Addss, "addsd" => Addsd, "addps" => Addps, "addpd" => Addpd,
            "subss" => Subss, "subsd" => Subsd, "subps" => Subps, "subpd" => Subpd,
            "mulss" => Mulss, "mulsd" => Mulsd, "mulps" => Mulps, "mulpd" => Mulpd,
            "divss" => Divss, "divsd" => Divsd, "divps" => Divps, "divpd" => Divpd,
            "comiss" => Comiss, "comisd" => Comisd,
            "cvtsi2ss" => Cvtsi2ss, "cvtsi2sd" => Cvtsi2sd,
            "cvttss2si" => Cvttss2si, "cvttsd2si" => Cvttsd2si,
            "pand" => Pand, "por" => Por, "pxor" => Pxor,
            "paddb" => Paddb, "paddw" => Paddw, "paddd" => Paddd, "paddq" => Paddq,
            "psubb" => Psubb, "psubw" => Psubw, "psubd" => Psubd, "psubq" => Psubq,
            "psrlw" => Psrlw, "psrld" => Psrld, "psrlq" => Psrlq,
            "psraw" => Psraw, "psrad" => Psrad,
            "psllw" => Psllw, "pslld" => Pslld, "psllq" => Psllq,
            "psrldq" => Psrldq, "pslldq" => Pslldq,
            "pshufb" => Pshufb, "movbe" => Movbe, "palignr" => Palignr,
            "vmovdqa" => Vmovdqa, "vmovdqu" => Vmovdqu,
            "vpxor" => Vpxor, "vpand" => Vpand, "vpor" => Vpor, "vpcmpeqb" => Vpcmpeqb,
            "vpshufb" => Vpshufb,
            _ => return None,
        })
    }

    /// `true` for the eight arithmetic/logic opcodes of rows `00..3F`,
    /// indexed in SDM row order (`ADD, OR, ADC, SBB, AND, SUB, XOR, CMP`).
    pub fn from_arithmetic_row(row: u8) -> Opcode {
        use Opcode::*;
        match row & 0x7 {
            0 => Add, 1 => Or, 2 => Adc, 3 => Sbb,
            4 => And, 5 => Sub, 6 => Xor, 7 => Cmp,
            _ => unreachable!(),
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mnemonic())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn condition_roundtrips_through_nibble() {
        for nibble in 0u8..16 {
            let c = Condition::from_nibble(nibble);
            assert_eq!(c.to_nibble(), nibble);
        }
    }

    #[test]
    fn mnemonic_roundtrip() {
        assert_eq!(Opcode::from_mnemonic("mov"), Some(Opcode::Mov));
        assert_eq!(Opcode::from_mnemonic("jne"), Some(Opcode::Jcc(Condition::Ne)));
        assert_eq!(Opcode::from_mnemonic("setae"), Some(Opcode::Setcc(Condition::Ae)));
        assert_eq!(Opcode::Jcc(Condition::Ne).mnemonic(), "jne");
    }

    #[test]
    fn arithmetic_row_order_matches_sdm() {
        assert_eq!(Opcode::from_arithmetic_row(0), Opcode::Add);
        assert_eq!(Opcode::from_arithmetic_row(7), Opcode::Cmp);
    }
}
