//! The top-level decoding entry point.

use crate::checker::check;
use crate::error::Result;
use crate::instruction::Instruction;
use crate::reader::ByteReader;

/// Selects the default operand/address size and whether REX/VEX/EVEX are
/// legal at all. Only `Long64` enables the extended-register prefixes in
/// this codebase; `Real16`/`Protected32` are accepted as configuration but
/// restricted to the legacy encoding space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub enum MachineMode {
    Real16,
    Protected32,
    Long64,
}

impl MachineMode {
    fn allows_rex(self) -> bool {
        matches!(self, MachineMode::Long64)
    }
}

/// A decoder configured for one machine mode, optionally running every
/// decoded instruction through [`check`] before returning it.
///
/// Value-typed and `Copy`: no interior mutability, so independent threads
/// may each hold their own `Decoder` over independent buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decoder {
    mode: MachineMode,
    check: bool,
}

impl Decoder {
    pub fn new(mode: MachineMode) -> Decoder {
        Decoder { mode, check: true }
    }

    /// Toggles the post-decode [`check`] pass. On by default.
    pub fn with_checking(mut self, enabled: bool) -> Decoder {
        self.check = enabled;
        self
    }

    pub fn mode(&self) -> MachineMode {
        self.mode
    }

    /// Decodes a single instruction starting at the front of `bytes`,
    /// returning it alongside the number of bytes it consumed.
    pub fn decode_one(&self, bytes: &[u8]) -> Result<(Instruction, usize)> {
        let mut reader = ByteReader::new(bytes);
        let insn = crate::decode::decode(&mut reader, self.mode.allows_rex())?;
        if self.check {
            check(&insn).map_err(|e| crate::error::DecodeError::DecodingError(e.to_string()))?;
        }
        let length = reader.position();
        tracing::debug!(bytes = ?reader.consumed(), %insn, "decoded instruction");
        Ok((insn, length))
    }

    /// Decodes instructions from the front of `bytes` until `n` bytes have
    /// been consumed in total.
    pub fn decode(&self, bytes: &[u8], n: usize) -> Result<Vec<Instruction>> {
        let mut out = Vec::new();
        let mut consumed = 0usize;
        while consumed < n {
            let (insn, len) = self.decode_one(&bytes[consumed..])?;
            consumed += len;
            out.push(insn);
        }
        Ok(out)
    }

    /// An iterator over every instruction in `buffer`, paired with its
    /// virtual address starting at `ip`. Stops at the first decode error or
    /// when the buffer is exhausted.
    pub fn instruction_iterator<'a, 'b>(
        &'a self,
        buffer: &'b [u8],
        ip: u64,
    ) -> InstructionIterator<'a, 'b> {
        InstructionIterator {
            decoder: self,
            buffer,
            ip,
        }
    }
}

pub struct InstructionIterator<'a, 'b> {
    decoder: &'a Decoder,
    buffer: &'b [u8],
    ip: u64,
}

impl<'a, 'b> Iterator for InstructionIterator<'a, 'b> {
    type Item = (Instruction, u64);

    fn next(&mut self) -> Option<Self::Item> {
        if self.buffer.is_empty() {
            return None;
        }
        match self.decoder.decode_one(self.buffer) {
            Ok((insn, len)) => {
                self.buffer = &self.buffer[len..];
                let item = Some((insn, self.ip));
                self.ip += len as u64;
                item
            }
            Err(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_int3() {
        let decoder = Decoder::new(MachineMode::Long64);
        let (insn, len) = decoder.decode_one(&[0xCC]).unwrap();
        assert_eq!(insn.opcode, crate::opcode::Opcode::Int3);
        assert_eq!(len, 1);
    }

    #[test]
    fn decode_stops_at_n_bytes() {
        let decoder = Decoder::new(MachineMode::Long64);
        let insns = decoder.decode(&[0xCC, 0x90, 0xCC], 2).unwrap();
        assert_eq!(insns.len(), 2);
    }

    #[test]
    fn iterator_yields_addresses() {
        let decoder = Decoder::new(MachineMode::Long64);
        let addrs: Vec<u64> = decoder
            .instruction_iterator(&[0xCC, 0x90], 0x1000)
            .map(|(_, ip)| ip)
            .collect();
        assert_eq!(addrs, vec![0x1000, 0x1001]);
    }
}
