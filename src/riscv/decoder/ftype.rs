use super::{bits, sext};
use crate::riscv::instruction::Instruction;
use crate::riscv::{OPC_FMADD, OPC_FMSUB, OPC_FNMADD, OPC_FNMSUB};

pub(super) fn decode_load(word: u32) -> Result<Instruction, &'static str> {
    if bits(word, 14, 12) != 0x2 {
        return Err("invalid FP load width");
    }
    let rd = bits(word, 11, 7) as u8;
    let rs1 = bits(word, 19, 15) as u8;
    let imm = sext(bits(word, 31, 20), 12);
    Ok(Instruction::Flw { rd, rs1, imm })
}

pub(super) fn decode_store(word: u32) -> Result<Instruction, &'static str> {
    if bits(word, 14, 12) != 0x2 {
        return Err("invalid FP store width");
    }
    let rs1 = bits(word, 19, 15) as u8;
    let rs2 = bits(word, 24, 20) as u8;
    let imm = sext((bits(word, 31, 25) << 5) | bits(word, 11, 7), 12);
    Ok(Instruction::Fsw { rs2, rs1, imm })
}

pub(super) fn decode_fused(word: u32) -> Result<Instruction, &'static str> {
    if bits(word, 26, 25) != 0 {
        return Err("only single precision supported");
    }
    let rd = bits(word, 11, 7) as u8;
    let rs1 = bits(word, 19, 15) as u8;
    let rs2 = bits(word, 24, 20) as u8;
    let rs3 = bits(word, 31, 27) as u8;
    Ok(match bits(word, 6, 0) {
        OPC_FMADD => Instruction::FmaddS { rd, rs1, rs2, rs3 },
        OPC_FMSUB => Instruction::FmsubS { rd, rs1, rs2, rs3 },
        OPC_FNMSUB => Instruction::FnmsubS { rd, rs1, rs2, rs3 },
        OPC_FNMADD => Instruction::FnmaddS { rd, rs1, rs2, rs3 },
        _ => return Err("invalid fused FP opcode"),
    })
}

// funct3 carries the rounding mode for arithmetic ops; any value decodes.
pub(super) fn decode_op(word: u32) -> Result<Instruction, &'static str> {
    let rd = bits(word, 11, 7) as u8;
    let funct3 = bits(word, 14, 12) as u8;
    let rs1 = bits(word, 19, 15) as u8;
    let rs2 = bits(word, 24, 20) as u8;
    let funct7 = bits(word, 31, 25) as u8;

    Ok(match funct7 {
        0x00 => Instruction::FaddS { rd, rs1, rs2 },
        0x04 => Instruction::FsubS { rd, rs1, rs2 },
        0x08 => Instruction::FmulS { rd, rs1, rs2 },
        0x0c => Instruction::FdivS { rd, rs1, rs2 },
        0x2c => Instruction::FsqrtS { rd, rs1 },
        0x10 => match funct3 {
            0x0 => Instruction::FsgnjS { rd, rs1, rs2 },
            0x1 => Instruction::FsgnjnS { rd, rs1, rs2 },
            0x2 => Instruction::FsgnjxS { rd, rs1, rs2 },
            _ => return Err("invalid sign-inject"),
        },
        0x14 => match funct3 {
            0x0 => Instruction::FminS { rd, rs1, rs2 },
            0x1 => Instruction::FmaxS { rd, rs1, rs2 },
            _ => return Err("invalid fmin/fmax"),
        },
        0x50 => match funct3 {
            0x2 => Instruction::FeqS { rd, rs1, rs2 },
            0x1 => Instruction::FltS { rd, rs1, rs2 },
            0x0 => Instruction::FleS { rd, rs1, rs2 },
            _ => return Err("invalid FP compare"),
        },
        0x60 => match rs2 {
            0 => Instruction::FcvtWS { rd, rs1 },
            1 => Instruction::FcvtWuS { rd, rs1 },
            _ => return Err("invalid FP conversion"),
        },
        0x68 => match rs2 {
            0 => Instruction::FcvtSW { rd, rs1 },
            1 => Instruction::FcvtSWu { rd, rs1 },
            _ => return Err("invalid FP conversion"),
        },
        0x70 => match funct3 {
            0x0 => Instruction::FmvXW { rd, rs1 },
            0x1 => Instruction::FclassS { rd, rs1 },
            _ => return Err("invalid FP move/class"),
        },
        0x78 => Instruction::FmvWX { rd, rs1 },
        _ => return Err("invalid FP operation"),
    })
}
