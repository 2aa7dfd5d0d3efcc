//! Property tests: the decoder must never panic on arbitrary input, and any
//! instruction it does produce must report a length consistent with what it
//! actually consumed.

use proptest::prelude::*;
use x86dismal::{Decoder, MachineMode};

const MAX_INSTRUCTION_LEN: usize = 16;

fn check_decode_is_sane(mode: MachineMode, bytes: &[u8]) -> Result<(), TestCaseError> {
    let decoder = Decoder::new(mode);
    if let Ok((insn, len)) = decoder.decode_one(bytes) {
        prop_assert!(len >= 1);
        prop_assert!(len <= bytes.len());
        prop_assert!(len <= MAX_INSTRUCTION_LEN);
        // Rendering a successfully decoded instruction must never panic.
        let _ = insn.to_intel_syntax();
    }
    Ok(())
}

proptest! {
    #[test]
    fn decode_never_panics_long64(bytes in proptest::collection::vec(any::<u8>(), 0..=MAX_INSTRUCTION_LEN)) {
        check_decode_is_sane(MachineMode::Long64, &bytes)?;
    }

    #[test]
    fn decode_never_panics_protected32(bytes in proptest::collection::vec(any::<u8>(), 0..=MAX_INSTRUCTION_LEN)) {
        check_decode_is_sane(MachineMode::Protected32, &bytes)?;
    }

    #[test]
    fn decode_never_panics_real16(bytes in proptest::collection::vec(any::<u8>(), 0..=MAX_INSTRUCTION_LEN)) {
        check_decode_is_sane(MachineMode::Real16, &bytes)?;
    }

    #[test]
    fn decode_unchecked_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..=MAX_INSTRUCTION_LEN)) {
        let decoder = Decoder::new(MachineMode::Long64).with_checking(false);
        let _ = decoder.decode_one(&bytes);
    }

    #[test]
    fn instruction_iterator_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..=64)) {
        let decoder = Decoder::new(MachineMode::Long64);
        for (insn, _ip) in decoder.instruction_iterator(&bytes, 0) {
            let _ = insn.to_intel_syntax();
        }
    }

    #[test]
    fn intel_syntax_parser_never_panics(text in "[a-z0-9 ,\\[\\]:+*x-]{0,40}") {
        let _ = x86dismal::Instruction::from_intel_syntax(&text);
    }
}
