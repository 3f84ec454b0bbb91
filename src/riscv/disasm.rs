//! Canonical text for decoded instructions. The output of `disasm` parses
//! back to the identical machine word, which the test suite relies on.

use crate::riscv::decoder::decode;
use crate::riscv::instruction::Instruction;

pub fn disasm_word(word: u32) -> String {
    match decode(word) {
        Ok(inst) => disasm(&inst),
        Err(e) => format!(".word 0x{word:08x} ; {e}"),
    }
}

pub fn disasm(inst: &Instruction) -> String {
    use Instruction::*;
    let m = inst.mnemonic();
    match *inst {
        Add { rd, rs1, rs2 } | Sub { rd, rs1, rs2 } | Sll { rd, rs1, rs2 }
        | Slt { rd, rs1, rs2 } | Sltu { rd, rs1, rs2 } | Xor { rd, rs1, rs2 }
        | Srl { rd, rs1, rs2 } | Sra { rd, rs1, rs2 } | Or { rd, rs1, rs2 }
        | And { rd, rs1, rs2 } | Mul { rd, rs1, rs2 } | Mulh { rd, rs1, rs2 }
        | Mulhsu { rd, rs1, rs2 } | Mulhu { rd, rs1, rs2 } | Div { rd, rs1, rs2 }
        | Divu { rd, rs1, rs2 } | Rem { rd, rs1, rs2 } | Remu { rd, rs1, rs2 } => {
            format!("{m} x{rd}, x{rs1}, x{rs2}")
        }
        Addi { rd, rs1, imm } | Slti { rd, rs1, imm } | Sltiu { rd, rs1, imm }
        | Xori { rd, rs1, imm } | Ori { rd, rs1, imm } | Andi { rd, rs1, imm } => {
            format!("{m} x{rd}, x{rs1}, {imm}")
        }
        Slli { rd, rs1, shamt } | Srli { rd, rs1, shamt } | Srai { rd, rs1, shamt } => {
            format!("{m} x{rd}, x{rs1}, {shamt}")
        }
        Lb { rd, rs1, imm } | Lh { rd, rs1, imm } | Lw { rd, rs1, imm }
        | Lbu { rd, rs1, imm } | Lhu { rd, rs1, imm } => format!("{m} x{rd}, {imm}(x{rs1})"),
        Flw { rd, rs1, imm } => format!("{m} f{rd}, {imm}(x{rs1})"),
        Jalr { rd, rs1, imm } => format!("{m} x{rd}, x{rs1}, {imm}"),
        Sb { rs2, rs1, imm } | Sh { rs2, rs1, imm } | Sw { rs2, rs1, imm } => {
            format!("{m} x{rs2}, {imm}(x{rs1})")
        }
        Fsw { rs2, rs1, imm } => format!("{m} f{rs2}, {imm}(x{rs1})"),
        Beq { rs1, rs2, imm } | Bne { rs1, rs2, imm } | Blt { rs1, rs2, imm }
        | Bge { rs1, rs2, imm } | Bltu { rs1, rs2, imm } | Bgeu { rs1, rs2, imm } => {
            format!("{m} x{rs1}, x{rs2}, {imm}")
        }
        Lui { rd, imm } | Auipc { rd, imm } => format!("{m} x{rd}, 0x{imm:x}"),
        Jal { rd, imm } => format!("{m} x{rd}, {imm}"),
        Fence => "fence".into(),
        Ecall => "ecall".into(),
        Ebreak => "ebreak".into(),
        FmaddS { rd, rs1, rs2, rs3 } | FmsubS { rd, rs1, rs2, rs3 }
        | FnmsubS { rd, rs1, rs2, rs3 } | FnmaddS { rd, rs1, rs2, rs3 } => {
            format!("{m} f{rd}, f{rs1}, f{rs2}, f{rs3}")
        }
        FaddS { rd, rs1, rs2 } | FsubS { rd, rs1, rs2 } | FmulS { rd, rs1, rs2 }
        | FdivS { rd, rs1, rs2 } | FsgnjS { rd, rs1, rs2 } | FsgnjnS { rd, rs1, rs2 }
        | FsgnjxS { rd, rs1, rs2 } | FminS { rd, rs1, rs2 } | FmaxS { rd, rs1, rs2 } => {
            format!("{m} f{rd}, f{rs1}, f{rs2}")
        }
        FsqrtS { rd, rs1 } => format!("{m} f{rd}, f{rs1}"),
        FeqS { rd, rs1, rs2 } | FltS { rd, rs1, rs2 } | FleS { rd, rs1, rs2 } => {
            format!("{m} x{rd}, f{rs1}, f{rs2}")
        }
        FcvtWS { rd, rs1 } | FcvtWuS { rd, rs1 } | FmvXW { rd, rs1 } | FclassS { rd, rs1 } => {
            format!("{m} x{rd}, f{rs1}")
        }
        FcvtSW { rd, rs1 } | FcvtSWu { rd, rs1 } | FmvWX { rd, rs1 } => {
            format!("{m} f{rd}, x{rs1}")
        }
    }
}
