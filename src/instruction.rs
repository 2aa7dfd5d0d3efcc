//! The decoded instruction: opcode plus up to four operands.

use core::fmt;

use crate::opcode::Opcode;
use crate::operand::Operand;
use crate::register::Segment;

/// A legacy segment-override or branch-hint prefix carried alongside an
/// instruction for display purposes. Operand-size/address-size/REX/VEX
/// prefixes are consumed during decoding and never surface here; only the
/// prefixes with their own Intel-syntax mnemonic do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub enum InstructionPrefix {
    Lock,
    Rep,
    Repne,
    Segment(Segment),
}

impl InstructionPrefix {
    pub fn mnemonic(self) -> &'static str {
        match self {
            InstructionPrefix::Lock => "lock",
            InstructionPrefix::Rep => "rep",
            InstructionPrefix::Repne => "repne",
            InstructionPrefix::Segment(s) => s.mnemonic(),
        }
    }
}

/// A fully decoded instruction: an opcode plus zero to four operands in
/// source order (destination first, per Intel syntax).
///
/// Operands are held in four discrete slots rather than a `Vec` so that
/// [`Instruction::new`] can enforce the "no gaps" invariant at construction:
/// `op2` may not be `Some` while `op1` is `None`, and so on.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub struct Instruction {
    pub prefix: Option<InstructionPrefix>,
    pub opcode: Opcode,
    pub op1: Option<Operand>,
    pub op2: Option<Operand>,
    pub op3: Option<Operand>,
    pub op4: Option<Operand>,
    /// Total encoded length in bytes, as consumed from the input buffer.
    pub length: usize,
}

impl Instruction {
    pub fn new(
        prefix: Option<InstructionPrefix>,
        opcode: Opcode,
        operands: &[Operand],
        length: usize,
    ) -> Result<Instruction, String> {
        if operands.len() > 4 {
            return Err("an instruction may carry at most four operands".into());
        }
        let mut slots: [Option<Operand>; 4] = [None, None, None, None];
        for (slot, operand) in slots.iter_mut().zip(operands.iter()) {
            *slot = Some(operand.clone());
        }
        let [op1, op2, op3, op4] = slots;
        Ok(Instruction {
            prefix,
            opcode,
            op1,
            op2,
            op3,
            op4,
            length,
        })
    }

    /// The operands in slot order, stopping at the first `None`.
    pub fn operands(&self) -> Vec<&Operand> {
        [&self.op1, &self.op2, &self.op3, &self.op4]
            .into_iter()
            .map_while(|o| o.as_ref())
            .collect()
    }

    pub fn operand_count(&self) -> usize {
        self.operands().len()
    }

    /// Parses Intel-syntax assembly text into an instruction.
    pub fn from_intel_syntax(text: &str) -> Result<Instruction, crate::error::ParseError> {
        crate::parser::from_intel_syntax(text)
    }

    /// Renders this instruction as Intel-syntax assembly text.
    pub fn to_intel_syntax(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        crate::formatter::write_intel_syntax(f, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operand::Immediate;
    use crate::register::{Gpr64, Register};

    #[test]
    fn new_fills_slots_in_order() {
        let insn = Instruction::new(
            None,
            Opcode::Mov,
            &[
                Operand::Register(Register::Gpr64(Gpr64::Rax)),
                Operand::Immediate(Immediate::from_u32(1)),
            ],
            5,
        )
        .unwrap();
        assert!(insn.op1.is_some());
        assert!(insn.op2.is_some());
        assert!(insn.op3.is_none());
        assert_eq!(insn.operand_count(), 2);
    }

    #[test]
    fn rejects_more_than_four_operands() {
        let imm = Operand::Immediate(Immediate::from_u8(0));
        let operands = vec![imm.clone(), imm.clone(), imm.clone(), imm.clone(), imm];
        assert!(Instruction::new(None, Opcode::Nop, &operands, 1).is_err());
    }
}
