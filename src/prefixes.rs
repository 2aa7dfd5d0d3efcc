//! Legacy, REX, VEX2/VEX3 and EVEX prefix scanning.

use bitflags::bitflags;

use crate::error::{DecodeError, Result};
use crate::reader::ByteReader;
use crate::register::Segment;

/// Group 1 legacy prefix: `LOCK`/`REPNZ`/`REP`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Group1 {
    Lock,
    Repnz,
    Rep,
}

bitflags! {
    /// The four field bits of a REX prefix byte (`0100WRXB`), tracked
    /// directly as the bitset the byte actually is rather than four
    /// separate booleans.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    #[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
    pub struct RexBits: u8 {
        const B = 0b0001;
        const X = 0b0010;
        const R = 0b0100;
        const W = 0b1000;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rex {
    pub present: bool,
    bits: RexBits,
}

impl Rex {
    fn from_byte(byte: u8) -> Rex {
        Rex {
            present: true,
            bits: RexBits::from_bits_truncate(byte),
        }
    }

    pub fn w(&self) -> bool {
        self.bits.contains(RexBits::W)
    }

    pub fn r(&self) -> bool {
        self.bits.contains(RexBits::R)
    }

    pub fn x(&self) -> bool {
        self.bits.contains(RexBits::X)
    }

    pub fn b(&self) -> bool {
        self.bits.contains(RexBits::B)
    }
}

/// Decoded fields common to VEX2/VEX3/EVEX, independent of how many bytes
/// encoded them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VexFields {
    pub r: bool,
    pub x: bool,
    pub b: bool,
    pub w: bool,
    /// The `vvvv`/`v'vvvv` source-operand register, already inverted.
    pub vvvv: u8,
    pub l: bool,
    /// Opcode map selector: `0F` = 1, `0F38` = 2, `0F3A` = 3.
    pub map_select: u8,
    /// Implied mandatory prefix: `None`, `0x66`, `0xF2`, or `0xF3`.
    pub implied_prefix: Option<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvexFields {
    pub vex: VexFields,
    pub r_prime: bool,
    pub mask: u8,
    pub zeroing: bool,
    pub broadcast_or_rc: bool,
}

fn implied_prefix_from_pp(pp: u8) -> Option<u8> {
    match pp {
        0b01 => Some(0x66),
        0b10 => Some(0xF3),
        0b11 => Some(0xF2),
        _ => None,
    }
}

/// The merged view of every prefix byte consumed ahead of an opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Prefixes {
    pub group1: Option<Group1>,
    pub group2: Option<Segment>,
    pub operand_size_override: bool,
    pub address_size_override: bool,
    pub rex: Rex,
    pub vex2: Option<VexFields>,
    pub vex3: Option<VexFields>,
    pub evex: Option<EvexFields>,
}

impl Prefixes {
    pub fn has_vector_prefix(&self) -> bool {
        self.vex2.is_some() || self.vex3.is_some() || self.evex.is_some()
    }

    pub fn vex_fields(&self) -> Option<VexFields> {
        self.vex2.or(self.vex3).or_else(|| self.evex.map(|e| e.vex))
    }

    pub fn rex_or_vex_w(&self) -> bool {
        self.vex_fields().map(|v| v.w).unwrap_or(self.rex.w())
    }
}

fn segment_for_byte(byte: u8) -> Option<Segment> {
    match byte {
        0x2E => Some(Segment::Cs),
        0x36 => Some(Segment::Ss),
        0x3E => Some(Segment::Ds),
        0x26 => Some(Segment::Es),
        0x64 => Some(Segment::Fs),
        0x65 => Some(Segment::Gs),
        _ => None,
    }
}

/// Scans the legacy/REX/VEX/EVEX prefix run at the cursor, leaving the
/// cursor positioned on the first opcode byte.
pub fn scan_prefixes(reader: &mut ByteReader, allow_rex: bool) -> Result<Prefixes> {
    let mut prefixes = Prefixes::default();
    let mut any_legacy = false;

    loop {
        let byte = reader.peek_u8()?;
        match byte {
            0xF0 => {
                prefixes.group1 = Some(Group1::Lock);
                any_legacy = true;
            }
            0xF2 => {
                prefixes.group1 = Some(Group1::Repnz);
                any_legacy = true;
            }
            0xF3 => {
                prefixes.group1 = Some(Group1::Rep);
                any_legacy = true;
            }
            0x66 => {
                prefixes.operand_size_override = true;
                any_legacy = true;
            }
            0x67 => {
                prefixes.address_size_override = true;
                any_legacy = true;
            }
            b if segment_for_byte(b).is_some() => {
                prefixes.group2 = segment_for_byte(b);
                any_legacy = true;
            }
            _ => break,
        }
        reader.read_u8()?;
        tracing::trace!(byte, "consumed legacy prefix byte");
    }

    if allow_rex {
        let byte = reader.peek_u8()?;
        if (0x40..=0x4F).contains(&byte) {
            reader.read_u8()?;
            prefixes.rex = Rex::from_byte(byte);
            tracing::trace!(byte, "consumed REX prefix");
        }
    }

    let lead = reader.peek_u8()?;
    match lead {
        0xC5 => {
            reader.read_u8()?;
            let data = reader.read_u8()?;
            if any_legacy || prefixes.rex.present {
                return Err(DecodeError::IllegalPrefixCombination);
            }
            prefixes.vex2 = Some(VexFields {
                r: data & 0x80 == 0,
                x: false,
                b: false,
                w: false,
                vvvv: (!(data >> 3)) & 0xF,
                l: data & 0x04 != 0,
                map_select: 1,
                implied_prefix: implied_prefix_from_pp(data & 0x3),
            });
            tracing::trace!("consumed two-byte VEX prefix");
        }
        0xC4 => {
            reader.read_u8()?;
            let data1 = reader.read_u8()?;
            let data2 = reader.read_u8()?;
            if any_legacy || prefixes.rex.present {
                return Err(DecodeError::IllegalPrefixCombination);
            }
            let map_select = data1 & 0x1F;
            if !(1..=3).contains(&map_select) {
                return Err(DecodeError::DecodingError(format!(
                    "unsupported VEX3 map_select {map_select}"
                )));
            }
            prefixes.vex3 = Some(VexFields {
                r: data1 & 0x80 == 0,
                x: data1 & 0x40 == 0,
                b: data1 & 0x20 == 0,
                w: data2 & 0x80 != 0,
                vvvv: (!(data2 >> 3)) & 0xF,
                l: data2 & 0x04 != 0,
                map_select,
                implied_prefix: implied_prefix_from_pp(data2 & 0x3),
            });
            tracing::trace!("consumed three-byte VEX prefix");
        }
        0x62 => {
            reader.read_u8()?;
            let data1 = reader.read_u8()?;
            let data2 = reader.read_u8()?;
            let data3 = reader.read_u8()?;
            if any_legacy || prefixes.rex.present {
                return Err(DecodeError::IllegalPrefixCombination);
            }
            let map_select = data1 & 0x3;
            if map_select == 0 {
                return Err(DecodeError::DecodingError("unsupported EVEX map_select 0".into()));
            }
            let vex = VexFields {
                r: data1 & 0x80 == 0,
                x: data1 & 0x40 == 0,
                b: data1 & 0x20 == 0,
                w: data2 & 0x80 != 0,
                vvvv: (!(data2 >> 3)) & 0xF,
                l: data3 & 0x20 != 0,
                map_select,
                implied_prefix: implied_prefix_from_pp(data2 & 0x3),
            };
            prefixes.evex = Some(EvexFields {
                vex,
                r_prime: data1 & 0x10 == 0,
                mask: data3 & 0x7,
                zeroing: data3 & 0x80 != 0,
                broadcast_or_rc: data3 & 0x10 != 0,
            });
            tracing::trace!("consumed EVEX prefix");
        }
        _ => {}
    }

    if prefixes.has_vector_prefix() && (any_legacy || prefixes.rex.present) {
        return Err(DecodeError::IllegalPrefixCombination);
    }

    Ok(prefixes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scans_lock_and_operand_size_together() {
        let mut r = ByteReader::new(&[0xF0, 0x66, 0x90]);
        let p = scan_prefixes(&mut r, true).unwrap();
        assert_eq!(p.group1, Some(Group1::Lock));
        assert!(p.operand_size_override);
        assert_eq!(r.position(), 2);
    }

    #[test]
    fn scans_rex_after_legacy() {
        let mut r = ByteReader::new(&[0x66, 0x48, 0x01]);
        let p = scan_prefixes(&mut r, true).unwrap();
        assert!(p.rex.present);
        assert!(p.rex.w());
        assert_eq!(r.position(), 2);
    }

    #[test]
    fn rejects_legacy_with_vex() {
        let mut r = ByteReader::new(&[0x66, 0xC5, 0xF8, 0x10]);
        assert_eq!(
            scan_prefixes(&mut r, true).unwrap_err(),
            DecodeError::IllegalPrefixCombination
        );
    }

    #[test]
    fn decodes_vex2_fields() {
        let mut r = ByteReader::new(&[0xC5, 0xF8, 0x10]);
        let p = scan_prefixes(&mut r, true).unwrap();
        let vex = p.vex2.unwrap();
        assert!(vex.r);
        assert_eq!(vex.vvvv, 0xF);
        assert!(!vex.l);
        assert_eq!(r.position(), 2);
    }

    #[test]
    fn segment_override_recognized() {
        let mut r = ByteReader::new(&[0x64, 0x8B, 0x00]);
        let p = scan_prefixes(&mut r, true).unwrap();
        assert_eq!(p.group2, Some(Segment::Fs));
    }

    #[test]
    fn decodes_evex_fields() {
        // 62 F1 74 00: R̄X̄B̄=111 (no extension), map_select=01, W=0,
        // v̄vvv=1110 (vvvv=0001 inverted), pp=00, L'L=00, no mask/zeroing.
        let mut r = ByteReader::new(&[0x62, 0xF1, 0x74, 0x00, 0xEF]);
        let p = scan_prefixes(&mut r, true).unwrap();
        let evex = p.evex.unwrap();
        assert!(!evex.vex.r && !evex.vex.x && !evex.vex.b);
        assert_eq!(evex.vex.map_select, 1);
        assert_eq!(evex.mask, 0);
        assert!(!evex.zeroing);
        assert_eq!(r.position(), 4);
    }

    #[test]
    fn address_size_override_survives_alongside_rex() {
        let mut r = ByteReader::new(&[0x67, 0x48, 0x01]);
        let p = scan_prefixes(&mut r, true).unwrap();
        assert!(p.address_size_override);
        assert!(p.rex.present);
        assert!(p.rex.w());
    }

    #[test]
    fn rex_or_vex_w_reads_through_vex3_when_no_rex_byte_was_scanned() {
        let mut r = ByteReader::new(&[0xC4, 0xE1, 0xF9, 0x6F]);
        let p = scan_prefixes(&mut r, true).unwrap();
        assert!(!p.rex.present);
        assert!(p.rex_or_vex_w());
    }
}
