//! Deterministic pseudo-instruction expansions. Each helper returns the
//! base statements that replace one pseudo, relocations attached where the
//! operand names a symbol.

use crate::asm::unit::{DebugInfo, RelocKind, Relocation, Statement};
use crate::asm::unit::{hi20, lo12};
use crate::riscv::instruction::Instruction;

/// `li rd, imm`: one `addi` when the value fits 12 signed bits, else the
/// carry-adjusted `lui`+`addi` pair.
pub(crate) fn expand_li(rd: u8, imm: i32, debug: &DebugInfo) -> Vec<Statement> {
    if (-2048..=2047).contains(&imm) {
        return vec![Statement::new(Instruction::Addi { rd, rs1: 0, imm }, debug.clone())];
    }
    vec![
        Statement::new(Instruction::Lui { rd, imm: hi20(imm) }, debug.clone()),
        Statement::new(Instruction::Addi { rd, rs1: rd, imm: lo12(imm) }, debug.clone()),
    ]
}

/// `la rd, symbol`: `auipc`+`addi` sharing a pcrel pair anchored at the
/// `auipc` site.
pub(crate) fn expand_la(rd: u8, symbol: &str, debug: &DebugInfo) -> Vec<Statement> {
    vec![
        Statement::with_reloc(
            Instruction::Auipc { rd, imm: 0 },
            Relocation::new(RelocKind::PcrelHi20, symbol),
            debug.clone(),
        ),
        Statement::with_reloc(
            Instruction::Addi { rd, rs1: rd, imm: 0 },
            Relocation::new(RelocKind::PcrelLo12, symbol),
            debug.clone(),
        ),
    ]
}

/// `call`/`tail`: far jump through `x6`, linking `x1` for `call` and `x0`
/// for `tail`.
pub(crate) fn expand_call(link: u8, symbol: &str, debug: &DebugInfo) -> Vec<Statement> {
    vec![
        Statement::with_reloc(
            Instruction::Auipc { rd: 6, imm: 0 },
            Relocation::new(RelocKind::PcrelHi20, symbol),
            debug.clone(),
        ),
        Statement::with_reloc(
            Instruction::Jalr { rd: link, rs1: 6, imm: 0 },
            Relocation::new(RelocKind::PcrelLo12, symbol),
            debug.clone(),
        ),
    ]
}

/// Load of a label: `auipc rd` + load through `rd` (or a scratch register
/// for FP loads).
pub(crate) fn expand_load_sym(
    load: Instruction,
    scratch: u8,
    symbol: &str,
    debug: &DebugInfo,
) -> Vec<Statement> {
    vec![
        Statement::with_reloc(
            Instruction::Auipc { rd: scratch, imm: 0 },
            Relocation::new(RelocKind::PcrelHi20, symbol),
            debug.clone(),
        ),
        Statement::with_reloc(load, Relocation::new(RelocKind::PcrelLo12, symbol), debug.clone()),
    ]
}

/// Store to a label: `auipc rt` + store through `rt`.
pub(crate) fn expand_store_sym(
    store: Instruction,
    scratch: u8,
    symbol: &str,
    debug: &DebugInfo,
) -> Vec<Statement> {
    vec![
        Statement::with_reloc(
            Instruction::Auipc { rd: scratch, imm: 0 },
            Relocation::new(RelocKind::PcrelHi20, symbol),
            debug.clone(),
        ),
        Statement::with_reloc(store, Relocation::new(RelocKind::PcrelLo12, symbol), debug.clone()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn dbg() -> DebugInfo {
        DebugInfo::new(PathBuf::from("t.s"), 0, "")
    }

    #[test]
    fn li_small_is_one_addi() {
        let stmts = expand_li(5, -2048, &dbg());
        assert_eq!(stmts.len(), 1);
        assert_eq!(stmts[0].inst, Instruction::Addi { rd: 5, rs1: 0, imm: -2048 });
    }

    #[test]
    fn li_large_adjusts_upper_half() {
        // low 12 bits >= 0x800 force a carry into the upper part
        let stmts = expand_li(1, 0x12345fff, &dbg());
        assert_eq!(stmts.len(), 2);
        assert_eq!(stmts[0].inst, Instruction::Lui { rd: 1, imm: 0x12346 });
        assert_eq!(stmts[1].inst, Instruction::Addi { rd: 1, rs1: 1, imm: -1 });
    }

    #[test]
    fn li_spec_example() {
        let stmts = expand_li(1, 0x12345678, &dbg());
        assert_eq!(stmts[0].inst, Instruction::Lui { rd: 1, imm: 0x12345 });
        assert_eq!(stmts[1].inst, Instruction::Addi { rd: 1, rs1: 1, imm: 0x678 });
    }

    #[test]
    fn la_shares_pcrel_pair() {
        let stmts = expand_la(5, "foo", &dbg());
        assert_eq!(stmts.len(), 2);
        assert_eq!(stmts[0].reloc.as_ref().unwrap().kind, RelocKind::PcrelHi20);
        assert_eq!(stmts[1].reloc.as_ref().unwrap().kind, RelocKind::PcrelLo12);
    }

    #[test]
    fn call_links_ra_through_x6() {
        let stmts = expand_call(1, "func", &dbg());
        assert_eq!(stmts[0].inst, Instruction::Auipc { rd: 6, imm: 0 });
        assert_eq!(stmts[1].inst, Instruction::Jalr { rd: 1, rs1: 6, imm: 0 });
    }
}
