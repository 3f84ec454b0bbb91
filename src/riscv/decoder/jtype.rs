use super::{bits, sext};
use crate::riscv::instruction::Instruction;

pub(super) fn decode_jal(word: u32) -> Result<Instruction, &'static str> {
    let rd = bits(word, 11, 7) as u8;
    let imm = sext(
        (bits(word, 31, 31) << 20)
            | (bits(word, 19, 12) << 12)
            | (bits(word, 20, 20) << 11)
            | (bits(word, 30, 21) << 1),
        21,
    );
    Ok(Instruction::Jal { rd, imm })
}
