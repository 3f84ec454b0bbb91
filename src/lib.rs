//! Jupiter: an RV32IMF assembler, linker and instruction-level simulator
//! with a configurable cache model and reversible execution.
//!
//! Hosts drive the core through three values: a [`Pipeline`] turns source
//! files into a [`linker::LinkedProgram`], and a [`sim::Simulator`] owns
//! the program while it executes.
//!
//! ```no_run
//! use jupiter::{Pipeline, Settings};
//! use jupiter::asm::Source;
//! use jupiter::sim::Simulator;
//!
//! let pipeline = Pipeline::new(Settings::default());
//! let sources = vec![Source::read("main.s")?];
//! let program = pipeline.build(&sources)?;
//! let mut sim = Simulator::new(program, pipeline.settings());
//! sim.run()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod asm;
pub mod errors;
pub mod linker;
pub mod riscv;
pub mod settings;
pub mod sim;
pub mod sink;
pub mod utils;

pub use errors::{BuildError, Diagnostic, Severity, SimulationFault};
pub use settings::Settings;

use asm::unit::{Source, TranslationUnit};
use linker::LinkedProgram;

/// Owns the configuration for one assemble-and-link run. All state that
/// was process-global in older simulators of this kind (flag registry,
/// global symbol table) lives in this value or in its outputs.
pub struct Pipeline {
    settings: Settings,
}

impl Pipeline {
    pub fn new(settings: Settings) -> Self {
        Pipeline { settings }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Assembles every source. All units are produced even when one
    /// fails; the phase aborts afterwards if any diagnostic is an error.
    pub fn assemble(&self, sources: &[Source]) -> Result<Vec<TranslationUnit>, BuildError> {
        let mut diags = Vec::new();
        let units: Vec<_> =
            sources.iter().map(|s| asm::assemble(s, &self.settings, &mut diags)).collect();
        if diags.iter().any(|d| d.severity == Severity::Error) {
            return Err(BuildError::Diagnostics(diags));
        }
        for warning in &diags {
            log::warn!("{warning}");
        }
        Ok(units)
    }

    /// Links assembled units into a loaded program.
    pub fn link(&self, units: Vec<TranslationUnit>) -> Result<LinkedProgram, BuildError> {
        linker::link(units, &self.settings)
    }

    /// Assemble-then-link convenience for hosts.
    pub fn build(&self, sources: &[Source]) -> Result<LinkedProgram, BuildError> {
        let units = self.assemble(sources)?;
        self.link(units)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_aborts_between_phases() {
        let pipeline = Pipeline::new(Settings::default());
        let good = Source::inline("good.s", ".globl __start\n__start: nop");
        let bad = Source::inline("bad.s", "frobnicate x1");
        let err = pipeline.build(&[good.clone(), bad]).unwrap_err();
        assert!(err.to_string().contains("unknown mnemonic"));
        // the good source alone builds
        assert!(pipeline.build(&[good]).is_ok());
    }

    #[test]
    fn assemble_reports_all_units() {
        let pipeline = Pipeline::new(Settings::default());
        let a = Source::inline("a.s", "frobnicate x1");
        let b = Source::inline("b.s", "also_bad x2");
        let err = pipeline.assemble(&[a, b]).unwrap_err();
        assert_eq!(err.diagnostics().len(), 2);
    }

    #[test]
    fn end_to_end_round_trip_disassembly() {
        use crate::riscv::decoder::decode;
        use crate::riscv::disasm::disasm;
        use crate::riscv::encoder::encode;
        use crate::riscv::instruction::Instruction::*;

        // every non-pseudo instruction disassembles to text that parses
        // back to the identical machine word
        let samples = vec![
            Add { rd: 1, rs1: 2, rs2: 3 }, Sub { rd: 4, rs1: 5, rs2: 6 },
            Sll { rd: 7, rs1: 8, rs2: 9 }, Slt { rd: 1, rs1: 2, rs2: 3 },
            Sltu { rd: 1, rs1: 2, rs2: 3 }, Xor { rd: 1, rs1: 2, rs2: 3 },
            Srl { rd: 1, rs1: 2, rs2: 3 }, Sra { rd: 1, rs1: 2, rs2: 3 },
            Or { rd: 1, rs1: 2, rs2: 3 }, And { rd: 1, rs1: 2, rs2: 3 },
            Mul { rd: 1, rs1: 2, rs2: 3 }, Mulh { rd: 1, rs1: 2, rs2: 3 },
            Mulhsu { rd: 1, rs1: 2, rs2: 3 }, Mulhu { rd: 1, rs1: 2, rs2: 3 },
            Div { rd: 1, rs1: 2, rs2: 3 }, Divu { rd: 1, rs1: 2, rs2: 3 },
            Rem { rd: 1, rs1: 2, rs2: 3 }, Remu { rd: 1, rs1: 2, rs2: 3 },
            Addi { rd: 1, rs1: 2, imm: -5 }, Slti { rd: 1, rs1: 2, imm: 5 },
            Sltiu { rd: 1, rs1: 2, imm: 5 }, Xori { rd: 1, rs1: 2, imm: -1 },
            Ori { rd: 1, rs1: 2, imm: 255 }, Andi { rd: 1, rs1: 2, imm: 15 },
            Slli { rd: 1, rs1: 2, shamt: 3 }, Srli { rd: 1, rs1: 2, shamt: 3 },
            Srai { rd: 1, rs1: 2, shamt: 3 },
            Lb { rd: 1, rs1: 2, imm: -4 }, Lh { rd: 1, rs1: 2, imm: 2 },
            Lw { rd: 1, rs1: 2, imm: 0 }, Lbu { rd: 1, rs1: 2, imm: 1 },
            Lhu { rd: 1, rs1: 2, imm: 6 },
            Sb { rs2: 1, rs1: 2, imm: -4 }, Sh { rs2: 1, rs1: 2, imm: 2 },
            Sw { rs2: 1, rs1: 2, imm: 0 },
            Beq { rs1: 1, rs2: 2, imm: 8 }, Bne { rs1: 1, rs2: 2, imm: -8 },
            Blt { rs1: 1, rs2: 2, imm: 16 }, Bge { rs1: 1, rs2: 2, imm: -16 },
            Bltu { rs1: 1, rs2: 2, imm: 32 }, Bgeu { rs1: 1, rs2: 2, imm: -32 },
            Lui { rd: 1, imm: 0x12345 }, Auipc { rd: 1, imm: 0xfffff },
            Jal { rd: 1, imm: 2048 }, Jalr { rd: 1, rs1: 2, imm: -6 },
            Fence, Ecall, Ebreak,
            Flw { rd: 1, rs1: 2, imm: 8 }, Fsw { rs2: 1, rs1: 2, imm: -8 },
            FmaddS { rd: 1, rs1: 2, rs2: 3, rs3: 4 },
            FmsubS { rd: 1, rs1: 2, rs2: 3, rs3: 4 },
            FnmsubS { rd: 1, rs1: 2, rs2: 3, rs3: 4 },
            FnmaddS { rd: 1, rs1: 2, rs2: 3, rs3: 4 },
            FaddS { rd: 1, rs1: 2, rs2: 3 }, FsubS { rd: 1, rs1: 2, rs2: 3 },
            FmulS { rd: 1, rs1: 2, rs2: 3 }, FdivS { rd: 1, rs1: 2, rs2: 3 },
            FsqrtS { rd: 1, rs1: 2 },
            FsgnjS { rd: 1, rs1: 2, rs2: 3 }, FsgnjnS { rd: 1, rs1: 2, rs2: 3 },
            FsgnjxS { rd: 1, rs1: 2, rs2: 3 },
            FminS { rd: 1, rs1: 2, rs2: 3 }, FmaxS { rd: 1, rs1: 2, rs2: 3 },
            FcvtWS { rd: 1, rs1: 2 }, FcvtWuS { rd: 1, rs1: 2 },
            FmvXW { rd: 1, rs1: 2 },
            FeqS { rd: 1, rs1: 2, rs2: 3 }, FltS { rd: 1, rs1: 2, rs2: 3 },
            FleS { rd: 1, rs1: 2, rs2: 3 },
            FclassS { rd: 1, rs1: 2 },
            FcvtSW { rd: 1, rs1: 2 }, FcvtSWu { rd: 1, rs1: 2 },
            FmvWX { rd: 1, rs1: 2 },
        ];

        let settings = Settings { bare: true, ..Settings::default() };
        for inst in samples {
            let word = encode(inst);
            let text = disasm(&decode(word).unwrap());
            let mut diags = Vec::new();
            let unit = asm::assemble(&Source::inline("rt.s", text.as_str()), &settings, &mut diags);
            assert!(diags.is_empty(), "'{text}' did not reassemble: {diags:?}");
            assert_eq!(unit.statements.len(), 1, "'{text}'");
            let (_, reassembled) = unit.statements[0]
                .build(0, &|_| None)
                .expect("no relocation expected");
            assert_eq!(reassembled, word, "'{text}'");
        }
    }
}
