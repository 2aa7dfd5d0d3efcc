//! ModR/M and SIB decoding, and the indirect-operand resolution algorithm.

use crate::error::{DecodeError, Result};
use crate::operand::{Displacement, IndirectOperand, Operand, PointerSize};
use crate::prefixes::{Prefixes, VexFields};
use crate::reader::ByteReader;
use crate::register::{gpr_from_code, Register, Segment};
use crate::register::OperandWidth;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModRm {
    pub modbits: u8,
    pub reg: u8,
    pub rm: u8,
}

impl ModRm {
    pub fn read(reader: &mut ByteReader) -> Result<ModRm> {
        let byte = reader.read_u8()?;
        Ok(ModRm {
            modbits: (byte >> 6) & 0x3,
            reg: (byte >> 3) & 0x7,
            rm: byte & 0x7,
        })
    }

    pub fn is_register_direct(self) -> bool {
        self.modbits == 0b11
    }

    /// `modrm.reg` widened by the REX.R / VEX.R extension bit.
    pub fn reg_index(self, prefixes: &Prefixes) -> u8 {
        let ext = extension_bit(prefixes, ExtField::R);
        self.reg | ext
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sib {
    pub scale_bits: u8,
    pub index: u8,
    pub base: u8,
}

impl Sib {
    pub fn read(reader: &mut ByteReader) -> Result<Sib> {
        let byte = reader.read_u8()?;
        Ok(Sib {
            scale_bits: (byte >> 6) & 0x3,
            index: (byte >> 3) & 0x7,
            base: byte & 0x7,
        })
    }

    pub fn scale(self) -> u8 {
        1 << self.scale_bits
    }
}

enum ExtField {
    R,
    X,
    B,
}

/// Resolves one of REX.R/X/B or its VEX/EVEX equivalent into a bit that can
/// be OR'd onto a 3-bit register code.
fn extension_bit(prefixes: &Prefixes, field: ExtField) -> u8 {
    let vex: Option<VexFields> = prefixes.vex_fields();
    let bit = match (field, vex) {
        (ExtField::R, Some(v)) => v.r,
        (ExtField::R, None) => prefixes.rex.r(),
        (ExtField::X, Some(v)) => v.x,
        (ExtField::X, None) => prefixes.rex.x(),
        (ExtField::B, Some(v)) => v.b,
        (ExtField::B, None) => prefixes.rex.b(),
    };
    if bit {
        8
    } else {
        0
    }
}

/// The address-width class governing which GPR family backs base/index
/// registers: 64-bit unless overridden by `67h` (32-bit addressing).
fn address_width(prefixes: &Prefixes) -> OperandWidth {
    if prefixes.address_size_override {
        OperandWidth::Bits32
    } else {
        OperandWidth::Bits64
    }
}

fn gpr(code: u8, width: OperandWidth) -> Result<Register> {
    gpr_from_code(code, width, true)
        .ok_or_else(|| DecodeError::DecodingError(format!("invalid register code {code}")))
}

/// Resolves the indirect (or absent) memory operand named by a ModR/M byte
/// whose `mod` field is not `0b11`. Returns `None` when `modrm` selects a
/// register-direct operand instead.
///
/// Implements the base/index/displacement/segment-override algorithm: a SIB
/// byte is read whenever `modrm.rm == 0b100`; `mod == 0b00` with `rm/base ==
/// 0b101` yields, respectively, RIP-relative addressing (no SIB) or a bare
/// 32-bit-displacement operand (with SIB); an index register code of `0b100`
/// with no REX/VEX extension, or an index resolving to RSP/ESP, means "no
/// index" rather than an error.
pub fn resolve_indirect_operand(
    reader: &mut ByteReader,
    modrm: ModRm,
    prefixes: &Prefixes,
    pointer_size: PointerSize,
) -> Result<Option<IndirectOperand>> {
    if modrm.is_register_direct() {
        return Ok(None);
    }

    let width = address_width(prefixes);
    let mut base: Option<Register> = None;
    let mut index: Option<Register> = None;
    let mut scale: Option<u8> = None;
    let mut displacement: Option<Displacement> = None;

    if modrm.rm == 0b100 {
        let sib = Sib::read(reader)?;
        let index_ext = extension_bit(prefixes, ExtField::X);
        let index_code = sib.index | index_ext;
        if !(sib.index == 0b100 && index_ext == 0) {
            let candidate = gpr(index_code, width)?;
            if !candidate.is_stack_pointer() {
                index = Some(candidate);
                scale = Some(sib.scale());
            }
        }

        let base_ext = extension_bit(prefixes, ExtField::B);
        if modrm.modbits == 0b00 && sib.base == 0b101 && base_ext == 0 {
            displacement = Some(Displacement::Dword(reader.read_u32_le()? as i32));
        } else {
            base = Some(gpr(sib.base | base_ext, width)?);
        }
    } else if modrm.modbits == 0b00 && modrm.rm == 0b101 {
        base = Some(match width {
            OperandWidth::Bits32 => Register::Gpr32(crate::register::Gpr32::Eip),
            _ => Register::Gpr64(crate::register::Gpr64::Rip),
        });
        displacement = Some(Displacement::Dword(reader.read_u32_le()? as i32));
    } else {
        let base_ext = extension_bit(prefixes, ExtField::B);
        base = Some(gpr(modrm.rm | base_ext, width)?);
    }

    match modrm.modbits {
        0b01 => {
            displacement = Some(Displacement::Byte(reader.read_u8()? as i8));
        }
        0b10 => {
            displacement = Some(Displacement::Dword(reader.read_u32_le()? as i32));
        }
        _ => {}
    }

    if let Some(segment) = prefixes.group2 {
        base = base.map(|b| wrap_segment(segment, b));
    }

    let operand = IndirectOperand::new(pointer_size, base, index, scale, displacement)
        .map_err(DecodeError::DecodingError)?;
    Ok(Some(operand))
}

fn wrap_segment(segment: Segment, base: Register) -> Register {
    Register::Segment(segment, Box::new(base))
}

/// Reads a ModR/M byte and resolves its `rm` field to a full operand: a
/// direct register at `width` if `mod == 0b11`, otherwise an indirect memory
/// operand at `pointer_size`.
pub fn read_rm_operand(
    reader: &mut ByteReader,
    prefixes: &Prefixes,
    width: OperandWidth,
    pointer_size: PointerSize,
) -> Result<(ModRm, Operand)> {
    let modrm = ModRm::read(reader)?;
    if modrm.is_register_direct() {
        let ext = extension_bit(prefixes, ExtField::B);
        let reg = gpr(modrm.rm | ext, width)?;
        Ok((modrm, Operand::Register(reg)))
    } else {
        let indirect = resolve_indirect_operand(reader, modrm, prefixes, pointer_size)?
            .expect("mod != 0b11 always yields an indirect operand");
        Ok((modrm, Operand::Indirect(indirect)))
    }
}

/// Resolves `modrm.reg` (widened by REX.R/VEX.R) to a direct register at
/// `width`.
pub fn reg_operand(modrm: ModRm, prefixes: &Prefixes, width: OperandWidth) -> Result<Operand> {
    Ok(Operand::Register(gpr(modrm.reg_index(prefixes), width)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::register::Gpr64;

    #[test]
    fn direct_modrm_yields_no_indirect_operand() {
        let mut r = ByteReader::new(&[]);
        let modrm = ModRm { modbits: 0b11, reg: 0, rm: 0 };
        let prefixes = Prefixes::default();
        let op = resolve_indirect_operand(&mut r, modrm, &prefixes, PointerSize::Qword).unwrap();
        assert!(op.is_none());
    }

    #[test]
    fn rip_relative_disp32() {
        // mod=00, rm=101 -> rip, then 4-byte displacement.
        let mut r = ByteReader::new(&[0x10, 0x00, 0x00, 0x00]);
        let modrm = ModRm { modbits: 0b00, reg: 0, rm: 0b101 };
        let prefixes = Prefixes::default();
        let op = resolve_indirect_operand(&mut r, modrm, &prefixes, PointerSize::Dword)
            .unwrap()
            .unwrap();
        assert_eq!(op.base, Some(Register::Gpr64(Gpr64::Rip)));
        assert_eq!(op.displacement.unwrap().value(), 0x10);
    }

    #[test]
    fn sib_with_esp_index_is_base_only() {
        // SIB byte: scale=00, index=100 (esp/rsp, no REX.X) -> no index.
        let sib_byte = [0b00_100_011u8]; // base = 011 = rbx
        let mut r = ByteReader::new(&sib_byte);
        let modrm = ModRm { modbits: 0b00, reg: 0, rm: 0b100 };
        let prefixes = Prefixes::default();
        let op = resolve_indirect_operand(&mut r, modrm, &prefixes, PointerSize::Dword)
            .unwrap()
            .unwrap();
        assert!(op.index.is_none());
        assert_eq!(op.base, Some(Register::Gpr64(Gpr64::Rbx)));
    }

    #[test]
    fn simple_byte_displacement() {
        let mut r = ByteReader::new(&[0x05]);
        let modrm = ModRm { modbits: 0b01, reg: 0, rm: 0b000 };
        let prefixes = Prefixes::default();
        let op = resolve_indirect_operand(&mut r, modrm, &prefixes, PointerSize::Dword)
            .unwrap()
            .unwrap();
        assert_eq!(op.base, Some(Register::Gpr64(Gpr64::Rax)));
        assert_eq!(op.displacement.unwrap().value(), 5);
    }

    #[test]
    fn rex_x_extends_sib_index() {
        // REX byte 0x42 sets only the X bit; modrm selects SIB (rm=100)
        // with a bare rax base, SIB index=000 widened by REX.X to r8.
        let mut r = ByteReader::new(&[0x42, 0x04, 0x00]);
        let prefixes = crate::prefixes::scan_prefixes(&mut r, true).unwrap();
        let modrm = ModRm::read(&mut r).unwrap();
        let op = resolve_indirect_operand(&mut r, modrm, &prefixes, PointerSize::Dword)
            .unwrap()
            .unwrap();
        assert_eq!(op.base, Some(Register::Gpr64(Gpr64::Rax)));
        assert_eq!(op.index, Some(Register::Gpr64(crate::register::Gpr64::R8)));
        assert_eq!(op.scale, Some(1));
    }

    #[test]
    fn evex_r_and_b_bits_widen_reg_and_rm_the_same_as_rex() {
        use crate::prefixes::EvexFields;
        let prefixes = Prefixes {
            evex: Some(EvexFields {
                vex: VexFields {
                    r: true,
                    x: false,
                    b: true,
                    w: false,
                    vvvv: 0,
                    l: false,
                    map_select: 1,
                    implied_prefix: None,
                },
                r_prime: false,
                mask: 0,
                zeroing: false,
                broadcast_or_rc: false,
            }),
            ..Prefixes::default()
        };
        assert_eq!(extension_bit(&prefixes, ExtField::R), 8);
        assert_eq!(extension_bit(&prefixes, ExtField::B), 8);
        assert_eq!(extension_bit(&prefixes, ExtField::X), 0);
    }

    #[test]
    fn reg_operand_widens_with_rex_r() {
        let mut r = ByteReader::new(&[0x44, 0xc1]);
        let prefixes = crate::prefixes::scan_prefixes(&mut r, true).unwrap();
        let modrm = ModRm::read(&mut r).unwrap();
        let operand = reg_operand(modrm, &prefixes, OperandWidth::Bits32).unwrap();
        assert_eq!(operand, Operand::Register(Register::Gpr32(crate::register::Gpr32::R8d)));
    }
}
