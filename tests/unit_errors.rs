//! Exercises the failure modes of `Decoder`, `check`, and the Intel-syntax
//! parser that golden.rs's successful-decode coverage never reaches.

use x86dismal::{check, DecodeError, Decoder, Immediate, Instruction, MachineMode, Opcode, ParseError, Operand, ValidationError};
use x86dismal::{Gpr8, Gpr64, Register};

fn decoder() -> Decoder {
    Decoder::new(MachineMode::Long64)
}

#[test]
fn empty_buffer_is_unexpected_eof() {
    assert_eq!(decoder().decode_one(&[]).unwrap_err(), DecodeError::UnexpectedEof);
}

#[test]
fn truncated_two_byte_opcode_is_unexpected_eof() {
    // 0F with nothing following: the second opcode byte can't be read.
    assert_eq!(decoder().decode_one(&[0x0F]).unwrap_err(), DecodeError::UnexpectedEof);
}

#[test]
fn truncated_modrm_is_unexpected_eof() {
    // ADD r/m32, r32 (0x01) with an opcode byte but no ModR/M byte.
    assert_eq!(decoder().decode_one(&[0x01]).unwrap_err(), DecodeError::UnexpectedEof);
}

#[test]
fn undefined_single_byte_opcode_is_unknown() {
    // 0xD6 has no entry in the primary opcode table.
    assert_eq!(
        decoder().decode_one(&[0xD6]).unwrap_err(),
        DecodeError::UnknownOpcode { bytes: vec![0xD6] }
    );
}

#[test]
fn group2_reg_six_is_reserved() {
    // D0 /6, mod=11 (register-direct), rm=0: the unofficial SHL duplicate.
    assert_eq!(
        decoder().decode_one(&[0xD0, 0xF0]).unwrap_err(),
        DecodeError::ReservedOpcode { bytes: vec![0xD0, 0xF0] }
    );
}

#[test]
fn group5_far_call_form_is_reserved() {
    // FF /3, mod=11, rm=0: far CALL has no segment:offset operand kind here.
    assert_eq!(
        decoder().decode_one(&[0xFF, 0xD8]).unwrap_err(),
        DecodeError::ReservedOpcode { bytes: vec![0xFF, 0xD8] }
    );
}

#[test]
fn legacy_prefix_with_vex_is_illegal_combination() {
    assert_eq!(
        decoder().decode_one(&[0x66, 0xC5, 0xF8, 0x10]).unwrap_err(),
        DecodeError::IllegalPrefixCombination
    );
}

#[test]
fn rex_with_vex_is_illegal_combination() {
    assert_eq!(
        decoder().decode_one(&[0x48, 0xC5, 0xF8, 0x10]).unwrap_err(),
        DecodeError::IllegalPrefixCombination
    );
}

#[test]
fn checker_rejects_two_immediate_operands() {
    let insn = Instruction::new(
        None,
        Opcode::Add,
        &[Operand::Immediate(Immediate::from_u8(1)), Operand::Immediate(Immediate::from_u8(2))],
        2,
    )
    .unwrap();
    assert_eq!(
        check(&insn).unwrap_err(),
        ValidationError::InvalidInstruction("an instruction may carry at most one immediate operand".into())
    );
}

#[test]
fn checker_rejects_wrong_operand_width_for_push() {
    let insn = Instruction::new(
        None,
        Opcode::Push,
        &[Operand::Register(Register::Gpr8(Gpr8::Al))],
        1,
    )
    .unwrap();
    assert!(matches!(check(&insn).unwrap_err(), ValidationError::InvalidInstruction(_)));
}

#[test]
fn checker_reports_unknown_opcode_for_unmodeled_entries() {
    let insn = Instruction::new(None, Opcode::JmpFar, &[], 1).unwrap();
    assert_eq!(check(&insn).unwrap_err(), ValidationError::UnknownOpcode(Opcode::JmpFar));
}

#[test]
fn checker_rejects_two_indirect_operands_outside_string_ops() {
    use x86dismal::{Displacement, IndirectOperand, PointerSize};
    let mem = |disp: i8| {
        Operand::Indirect(
            IndirectOperand::new(PointerSize::Dword, Some(Register::Gpr64(Gpr64::Rax)), None, None, Some(Displacement::Byte(disp)))
                .unwrap(),
        )
    };
    let insn = Instruction::new(None, Opcode::Mov, &[mem(0), mem(4)], 6).unwrap();
    assert_eq!(
        check(&insn).unwrap_err(),
        ValidationError::InvalidInstruction("an instruction may carry at most one indirect operand".into())
    );
}

#[test]
fn decode_with_checking_accepts_what_it_decodes() {
    // Sanity check that the default-on checker pass does not reject
    // ordinary decode output; the rejection path is exercised directly
    // above via hand-built `Instruction`s instead of hunting for a decode
    // path the opcode tables and the checker table happen to disagree on.
    let checked = Decoder::new(MachineMode::Long64);
    assert!(checked.decode_one(&[0x48, 0x01, 0xd8]).is_ok());
}

#[test]
fn parser_reports_unknown_mnemonic_distinct_from_existing_case() {
    assert_eq!(
        Instruction::from_intel_syntax("vfrobnicate xmm0,xmm1").unwrap_err(),
        ParseError::UnknownMnemonic("vfrobnicate".into())
    );
}

#[test]
fn parser_reports_malformed_indirect_operand() {
    // `2` inside the brackets is neither a register, a `0x..` displacement,
    // nor a `reg*scale` term.
    assert_eq!(
        Instruction::from_intel_syntax("mov eax,[rax+2]").unwrap_err(),
        ParseError::MalformedOperand("[rax+2]".into())
    );
}

#[test]
fn parser_reports_malformed_immediate_without_hex_prefix() {
    assert_eq!(
        Instruction::from_intel_syntax("mov eax,42").unwrap_err(),
        ParseError::MalformedOperand("42".into())
    );
}

#[test]
fn round_trips_through_decode_format_and_parse() {
    let (insn, len) = decoder().decode_one(&[0x48, 0x01, 0xd8]).unwrap();
    assert_eq!(len, 3);
    let text = insn.to_intel_syntax();
    assert_eq!(text, "add rax,rbx");
    let reparsed = Instruction::from_intel_syntax(&text).unwrap();
    assert_eq!(reparsed.opcode, insn.opcode);
    assert_eq!(reparsed.op1, insn.op1);
    assert_eq!(reparsed.op2, Some(Operand::Register(Register::Gpr64(Gpr64::Rbx))));
}
