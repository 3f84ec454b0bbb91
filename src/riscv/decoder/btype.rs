use super::{bits, sext};
use crate::riscv::instruction::Instruction;

pub(super) fn decode(word: u32) -> Result<Instruction, &'static str> {
    let funct3 = bits(word, 14, 12) as u8;
    let rs1 = bits(word, 19, 15) as u8;
    let rs2 = bits(word, 24, 20) as u8;
    let imm = sext(
        (bits(word, 31, 31) << 12)
            | (bits(word, 7, 7) << 11)
            | (bits(word, 30, 25) << 5)
            | (bits(word, 11, 8) << 1),
        13,
    );

    Ok(match funct3 {
        0x0 => Instruction::Beq { rs1, rs2, imm },
        0x1 => Instruction::Bne { rs1, rs2, imm },
        0x4 => Instruction::Blt { rs1, rs2, imm },
        0x5 => Instruction::Bge { rs1, rs2, imm },
        0x6 => Instruction::Bltu { rs1, rs2, imm },
        0x7 => Instruction::Bgeu { rs1, rs2, imm },
        _ => return Err("invalid branch"),
    })
}
