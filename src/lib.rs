//! A from-scratch x86-64 instruction decoder.
//!
//! [`Decoder`] turns a byte slice into a sequence of [`Instruction`]s;
//! [`Instruction`] round-trips to and from Intel-syntax text via
//! [`Instruction::to_intel_syntax`]/[`Instruction::from_intel_syntax`], and
//! [`check`] validates a decoded instruction's operand shapes against a
//! static per-opcode signature table.
//!
//! # Examples
//!
//! ```
//! use x86dismal::{Decoder, MachineMode};
//!
//! let decoder = Decoder::new(MachineMode::Long64);
//! let (insn, len) = decoder.decode_one(&[0x48, 0x89, 0xd8]).unwrap();
//! assert_eq!(len, 3);
//! assert_eq!(insn.to_intel_syntax(), "mov rax,rbx");
//! ```

mod checker;
mod decode;
mod decoder;
mod error;
mod formatter;
mod instruction;
mod modrm;
mod opcode;
mod operand;
mod parser;
mod prefixes;
mod reader;
mod register;

pub use checker::check;
pub use decoder::{Decoder, InstructionIterator, MachineMode};
pub use error::{DecodeError, ParseError, Result, ValidationError};
pub use instruction::{Instruction, InstructionPrefix};
pub use opcode::{Condition, Opcode};
pub use operand::{Displacement, Immediate, ImmediateWidth, IndirectOperand, Operand, PointerSize};
pub use register::{
    Gpr8, Gpr16, Gpr32, Gpr64, MaskRegister, Mmx, OperandWidth, Register, Segment, VectorWidth,
    Xmm, Ymm, Zmm,
};
