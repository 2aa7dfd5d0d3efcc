//! VEX2/VEX3/EVEX-prefixed opcode space.
//!
//! This codebase recognizes a small AVX subset: the `MOVDQA`/`MOVDQU`
//! data-movement pair and three non-destructive three-operand logic/compare
//! forms (`VPXOR`, `VPAND`, `VPOR`, `VPCMPEQB`), all routed through the `0F`
//! opcode map (`map_select == 1`), plus `VPSHUFB` routed through the `0F38`
//! map (`map_select == 2`) as a representative entry into VEX's three-byte
//! escape space.

use super::finish;
use crate::error::{DecodeError, Result};
use crate::instruction::Instruction;
use crate::modrm::ModRm;
use crate::opcode::Opcode;
use crate::operand::Operand;
use crate::prefixes::Prefixes;
use crate::reader::ByteReader;
use crate::register::{vector_from_code, VectorWidth};

fn xmm_reg(code: u8) -> Operand {
    Operand::Register(vector_from_code(code, VectorWidth::Xmm))
}

fn rm_operand(reader: &mut ByteReader, modrm: ModRm, prefixes: &Prefixes) -> Result<Operand> {
    if modrm.is_register_direct() {
        let ext = if prefixes.vex_fields().map(|v| v.b).unwrap_or(false) { 8 } else { 0 };
        Ok(xmm_reg(modrm.rm | ext))
    } else {
        let indirect = crate::modrm::resolve_indirect_operand(
            reader,
            modrm,
            prefixes,
            crate::operand::PointerSize::Xmmword,
        )?
        .expect("mod != 0b11 always yields an indirect operand");
        Ok(Operand::Indirect(indirect))
    }
}

pub fn decode(reader: &mut ByteReader, prefixes: &Prefixes, start: usize) -> Result<Instruction> {
    let vex = prefixes.vex_fields().expect("caller checked has_vector_prefix");
    let opcode_byte = reader.read_u8()?;
    let modrm = ModRm::read(reader)?;
    let reg_ext = if vex.r { 8 } else { 0 };
    let dest = xmm_reg(modrm.reg | reg_ext);
    let rm = rm_operand(reader, modrm, prefixes)?;
    let src1 = xmm_reg(vex.vvvv);

    let (opcode, operands) = match (vex.map_select, opcode_byte, vex.implied_prefix) {
        (1, 0x6F, Some(0x66)) => (Opcode::Vmovdqa, vec![dest, rm]),
        (1, 0x6F, Some(0xF3)) => (Opcode::Vmovdqu, vec![dest, rm]),
        (1, 0x7F, Some(0x66)) => (Opcode::Vmovdqa, vec![rm, dest]),
        (1, 0x7F, Some(0xF3)) => (Opcode::Vmovdqu, vec![rm, dest]),
        (1, 0xEF, _) => (Opcode::Vpxor, vec![dest, src1, rm]),
        (1, 0xDB, _) => (Opcode::Vpand, vec![dest, src1, rm]),
        (1, 0xEB, _) => (Opcode::Vpor, vec![dest, src1, rm]),
        (1, 0x74, _) => (Opcode::Vpcmpeqb, vec![dest, src1, rm]),
        (2, 0x00, _) => (Opcode::Vpshufb, vec![dest, src1, rm]),
        _ => return Err(DecodeError::UnknownOpcode { bytes: reader.consumed_since(start).to_vec() }),
    };
    finish(reader, prefixes, opcode, operands, start)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prefixes::scan_prefixes;

    #[test]
    fn vmovdqa_xmm0_xmm1() {
        let mut reader = ByteReader::new(&[0xC5, 0xF9, 0x6F, 0xC1]);
        let prefixes = scan_prefixes(&mut reader, true).unwrap();
        let insn = decode(&mut reader, &prefixes, 0).unwrap();
        assert_eq!(insn.opcode, Opcode::Vmovdqa);
        assert_eq!(insn.op1, Some(xmm_reg(0)));
        assert_eq!(insn.op2, Some(xmm_reg(1)));
    }
}
