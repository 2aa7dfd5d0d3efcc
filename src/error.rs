//! Error types for decoding, checking and text parsing.

use core::result;

/// Convenience alias for decoding results.
pub type Result<T> = result::Result<T, DecodeError>;

/// Failure modes of [`crate::decoder::Decoder::decode_one`] and friends.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The dispatch tables have no entry for these bytes.
    #[error("unknown opcode: {bytes:02x?}")]
    UnknownOpcode { bytes: Vec<u8> },

    /// The bytes decode to a reserved ModR/M.reg slot within a group.
    #[error("reserved opcode: {bytes:02x?}")]
    ReservedOpcode { bytes: Vec<u8> },

    /// A prefix byte appeared where it should already have been consumed.
    #[error("unrecognized prefix {name} at position {position}")]
    UnrecognizedPrefix {
        name: &'static str,
        position: usize,
    },

    /// VEX/EVEX combined with legacy prefixes, or two of VEX2/VEX3/EVEX seen.
    #[error("illegal prefix combination")]
    IllegalPrefixCombination,

    /// Generic malformed-encoding case.
    #[error("decoding error: {0}")]
    DecodingError(String),

    /// The byte reader ran off the end of the supplied slice.
    #[error("unexpected end of buffer")]
    UnexpectedEof,
}

/// Failure modes of [`crate::checker::check`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// No operand-signature table entry exists for this opcode.
    #[error("unknown opcode in checker table: {0:?}")]
    UnknownOpcode(crate::opcode::Opcode),

    /// The instruction matched no permitted operand-type signature.
    #[error("invalid instruction: {0}")]
    InvalidInstruction(String),
}

/// Failure modes of [`crate::parser::from_intel_syntax`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("unknown mnemonic: {0}")]
    UnknownMnemonic(String),

    #[error("too many operands")]
    TooManyOperands,

    #[error("malformed operand: {0}")]
    MalformedOperand(String),

    #[error("unknown register: {0}")]
    UnknownRegister(String),
}
