//! Validates a decoded [`Instruction`] against a static table of permitted
//! operand-type signatures.

use crate::error::ValidationError;
use crate::instruction::Instruction;
use crate::opcode::Opcode;
use crate::operand::{ImmediateWidth, Operand, PointerSize};
use crate::register::Register;

/// One operand's type class, as named in the signature alphabet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Class {
    R8,
    R16,
    R32,
    R64,
    Rmm,
    Rxmm,
    M8,
    M16,
    M32,
    M64,
    M128,
    I8,
    I16,
    I32,
    I64,
}

use Class::*;

fn classify(operand: &Operand) -> Option<Class> {
    match operand {
        Operand::Register(r) => match r {
            Register::Gpr8(_) => Some(R8),
            Register::Gpr16(_) => Some(R16),
            Register::Gpr32(_) => Some(R32),
            Register::Gpr64(_) => Some(R64),
            Register::Mmx(_) => Some(Rmm),
            Register::Xmm(_) => Some(Rxmm),
            Register::Ymm(_) | Register::Zmm(_) | Register::Mask(_) => None,
            Register::Segment(_, inner) => classify(&Operand::Register((**inner).clone())),
        },
        Operand::Immediate(imm) | Operand::Relative(imm) => Some(match imm.width {
            ImmediateWidth::Bits8 => I8,
            ImmediateWidth::Bits16 => I16,
            ImmediateWidth::Bits32 => I32,
            ImmediateWidth::Bits64 => I64,
        }),
        Operand::Indirect(mem) => Some(match mem.pointer_size {
            PointerSize::Byte => M8,
            PointerSize::Word => M16,
            PointerSize::Dword => M32,
            PointerSize::Qword => M64,
            PointerSize::Xmmword => M128,
            PointerSize::Ymmword | PointerSize::Zmmword => return None,
        }),
    }
}

/// `(Rw, Rw) | (Rw, Mw) | (Mw, Rw)` for a single GPR width `w`.
fn binary_rm(r: Class, m: Class) -> [Vec<Class>; 3] {
    [vec![r, r], vec![r, m], vec![m, r]]
}

/// The signatures permitted for every GPR width of a two-operand `r/m, r`
/// style instruction (arithmetic, `MOV`, `TEST`, `XCHG`, `ADC`/`SBB`, ...).
fn binary_rm_all_widths() -> Vec<Vec<Class>> {
    binary_rm(R8, M8)
        .into_iter()
        .chain(binary_rm(R16, M16))
        .chain(binary_rm(R32, M32))
        .chain(binary_rm(R64, M64))
        .collect()
}

/// Signatures for `r/m, imm` across the widths this codebase's groups
/// actually encode (imm8 is accepted everywhere since `83`/`C0`/`C1`/`6B`
/// all sign-extend an imm8 into the full operand width).
fn binary_rm_imm_all_widths() -> Vec<Vec<Class>> {
    vec![
        vec![R8, I8],
        vec![M8, I8],
        vec![R16, I8],
        vec![R16, I16],
        vec![M16, I8],
        vec![M16, I16],
        vec![R32, I8],
        vec![R32, I32],
        vec![M32, I8],
        vec![M32, I32],
        vec![R64, I8],
        vec![R64, I32],
        vec![M64, I8],
        vec![M64, I32],
    ]
}

fn unary_rm_all_widths() -> Vec<Vec<Class>> {
    vec![
        vec![R8],
        vec![M8],
        vec![R16],
        vec![M16],
        vec![R32],
        vec![M32],
        vec![R64],
        vec![M64],
    ]
}

fn shift_rm_all_widths() -> Vec<Vec<Class>> {
    let mut sigs = unary_rm_all_widths();
    for s in unary_rm_all_widths() {
        let mut with_imm = s.clone();
        with_imm.push(I8);
        sigs.push(with_imm);
        let mut with_cl = s;
        with_cl.push(R8);
        sigs.push(with_cl);
    }
    sigs
}

fn sse_binary_xmm() -> Vec<Vec<Class>> {
    vec![vec![Rxmm, Rxmm], vec![Rxmm, M128]]
}

/// Permitted signatures for `opcode`, or `None` if the opcode carries no
/// checker entry (not yet modeled; `check` then reports `UnknownOpcode`).
fn signatures(opcode: Opcode) -> Option<Vec<Vec<Class>>> {
    use Opcode::*;
    Some(match opcode {
        Add | Or | Adc | Sbb | And | Sub | Xor | Cmp => {
            let mut sigs = binary_rm_all_widths();
            sigs.extend(binary_rm_imm_all_widths());
            sigs
        }
        Test => {
            let mut sigs = binary_rm_all_widths();
            sigs.extend(binary_rm_imm_all_widths());
            sigs
        }
        Mov => {
            let mut sigs = binary_rm_all_widths();
            sigs.extend(binary_rm_imm_all_widths());
            sigs.push(vec![R64, I64]);
            sigs
        }
        Movabs => vec![vec![R64, I64]],
        Xchg => binary_rm_all_widths(),
        Xadd | Cmpxchg => binary_rm_all_widths(),
        Lea => vec![vec![R16, M16], vec![R32, M32], vec![R64, M64]],
        Movzx | Movsx => vec![
            vec![R16, R8],
            vec![R16, M8],
            vec![R32, R8],
            vec![R32, M8],
            vec![R32, R16],
            vec![R32, M16],
            vec![R64, R8],
            vec![R64, M8],
            vec![R64, R16],
            vec![R64, M16],
        ],
        Movsxd => vec![vec![R64, R32], vec![R64, M32]],
        Rol | Ror | Rcl | Rcr | Shl | Sar | Shr => shift_rm_all_widths(),
        Not | Neg | Mul | Imul | Div | Idiv | Inc | Dec => {
            let mut sigs = unary_rm_all_widths();
            if opcode == Imul {
                sigs.extend(binary_rm_all_widths());
            }
            sigs
        }
        Push | Pop => vec![vec![R16], vec![M16], vec![R64], vec![M64], vec![I8], vec![I32]],
        Bt | Bts | Btr | Btc => {
            let mut sigs = binary_rm(R16, M16).into_iter().chain(binary_rm(R32, M32)).chain(binary_rm(R64, M64)).collect::<Vec<_>>();
            sigs.extend([
                vec![R16, I8], vec![M16, I8],
                vec![R32, I8], vec![M32, I8],
                vec![R64, I8], vec![M64, I8],
            ]);
            sigs
        }
        Bsf | Bsr => binary_rm_all_widths()
            .into_iter()
            .filter(|s| !s.contains(&R8) && !s.contains(&M8))
            .collect(),
        Bswap => vec![vec![R32], vec![R64]],
        Cmpxchg8b => vec![vec![M64]],
        Cmpxchg16b => vec![vec![M128]],
        Rdrand | Rdseed => vec![vec![R16], vec![R32], vec![R64]],
        Jcc(_) => vec![vec![I8], vec![I32]],
        Jmp | Call => vec![vec![I8], vec![I32], vec![R64], vec![M64]],
        Loop | Loope | Loopne | Jrcxz => vec![vec![I8]],
        Int => vec![vec![I8]],
        Ret => vec![vec![], vec![I16]],
        Setcc(_) => vec![vec![R8], vec![M8]],
        Cmovcc(_) => vec![
            vec![R16, R16], vec![R16, M16],
            vec![R32, R32], vec![R32, M32],
            vec![R64, R64], vec![R64, M64],
        ],
        Int3 | Into | Iret | Hlt | Syscall | Sysret | Cbw | Cwde | Cdqe | Cwd | Cdq | Cqo
        | Nop | Ud2 | Wait | Leave | Cpuid | Rdtsc | Clc | Stc | Cli | Sti | Cld | Std | Cmc
        | Lahf | Sahf | Pushf | Popf | Xgetbv | Sfence | Lfence | Mfence => vec![vec![]],
        Incsspq => vec![vec![R64]],
        Movs | Cmps | Scas | Lods | Stos | Ins | Outs => vec![vec![]],
        Movups | Movupd | Movaps | Movapd | Movdqa | Movdqu => {
            vec![vec![Rxmm, Rxmm], vec![Rxmm, M128], vec![M128, Rxmm]]
        }
        Movss | Movsd => vec![vec![Rxmm, Rxmm], vec![Rxmm, M32], vec![M32, Rxmm]],
        Movd | Movq => vec![
            vec![Rxmm, R32], vec![Rxmm, M32], vec![R32, Rxmm], vec![M32, Rxmm],
            vec![Rxmm, R64], vec![Rxmm, M64], vec![R64, Rxmm], vec![M64, Rxmm],
        ],
        Addss | Addsd | Subss | Subsd | Mulss | Mulsd | Divss | Divsd => {
            vec![vec![Rxmm, Rxmm], vec![Rxmm, M64]]
        }
        Addps | Addpd | Subps | Subpd | Mulps | Mulpd | Divps | Divpd => sse_binary_xmm(),
        Comiss | Comisd => sse_binary_xmm(),
        Cvtsi2ss | Cvtsi2sd => vec![vec![Rxmm, R32], vec![Rxmm, M32], vec![Rxmm, R64], vec![Rxmm, M64]],
        Cvttss2si | Cvttsd2si => vec![vec![R32, Rxmm], vec![R32, M32], vec![R64, Rxmm], vec![R64, M64]],
        Pand | Por | Pxor | Paddb | Paddw | Paddd | Paddq | Psubb | Psubw | Psubd | Psubq => {
            sse_binary_xmm()
        }
        Psrlw | Psrld | Psrlq | Psraw | Psrad | Psllw | Pslld | Psllq | Psrldq | Pslldq => {
            vec![vec![Rxmm, I8]]
        }
        Prefetchnta | Prefetcht0 | Prefetcht1 | Prefetcht2 => vec![vec![M8]],
        Pshufb => sse_binary_xmm(),
        Movbe => vec![
            vec![R16, M16], vec![M16, R16],
            vec![R32, M32], vec![M32, R32],
            vec![R64, M64], vec![M64, R64],
        ],
        Palignr => vec![vec![Rxmm, Rxmm, I8], vec![Rxmm, M128, I8]],
        Vmovdqa | Vmovdqu => vec![vec![Rxmm, Rxmm], vec![Rxmm, M128], vec![M128, Rxmm]],
        Vpxor | Vpand | Vpor | Vpcmpeqb => vec![vec![Rxmm, Rxmm, Rxmm], vec![Rxmm, Rxmm, M128]],
        Vpshufb => vec![vec![Rxmm, Rxmm, Rxmm], vec![Rxmm, Rxmm, M128]],
        JmpFar | CallFar | RetFar => return None,
    })
}

/// Enforces the universal rules, then checks `insn.opcode`'s operand
/// signatures for a match.
pub fn check(insn: &Instruction) -> Result<(), ValidationError> {
    let operands = insn.operands();

    let immediate_count = operands.iter().filter(|o| matches!(o, Operand::Immediate(_) | Operand::Relative(_))).count();
    if immediate_count > 1 {
        return Err(ValidationError::InvalidInstruction(
            "an instruction may carry at most one immediate operand".into(),
        ));
    }
    let indirect_count = operands.iter().filter(|o| matches!(o, Operand::Indirect(_))).count();
    if indirect_count > 1 && !matches!(insn.opcode, Opcode::Movs | Opcode::Cmps) {
        return Err(ValidationError::InvalidInstruction(
            "an instruction may carry at most one indirect operand".into(),
        ));
    }

    let signatures = signatures(insn.opcode).ok_or(ValidationError::UnknownOpcode(insn.opcode))?;

    let classes: Option<Vec<Class>> = operands.iter().map(|o| classify(o)).collect();
    let Some(classes) = classes else {
        return Err(ValidationError::InvalidInstruction(format!(
            "{} has an operand this checker's class alphabet does not cover",
            insn.opcode
        )));
    };

    if signatures.iter().any(|sig| *sig == classes) {
        Ok(())
    } else {
        Err(ValidationError::InvalidInstruction(format!(
            "{} does not accept operand shape {classes:?}",
            insn.opcode
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::{Decoder, MachineMode};

    fn decode(bytes: &[u8]) -> Instruction {
        Decoder::new(MachineMode::Long64).with_checking(false).decode_one(bytes).unwrap().0
    }

    #[test]
    fn mov_register_to_register_is_valid() {
        let insn = decode(&[0x48, 0x89, 0xd8]);
        assert!(check(&insn).is_ok());
    }

    #[test]
    fn lea_indirect_destination_is_accepted() {
        let insn = decode(&[0x8d, 0x04, 0x4b]);
        // lea eax, [rbx+rcx*2]: destination is a register, source indirect — valid shape.
        assert!(check(&insn).is_ok());
    }

    #[test]
    fn vmovdqa_three_way_shape_matches() {
        let insn = decode(&[0xc5, 0xf9, 0x6f, 0xc1]);
        assert!(check(&insn).is_ok());
    }

    #[test]
    fn unknown_opcode_in_table_reports_unknown_opcode() {
        let insn = Instruction::new(None, Opcode::JmpFar, &[], 1).unwrap();
        assert_eq!(check(&insn), Err(ValidationError::UnknownOpcode(Opcode::JmpFar)));
    }
}
