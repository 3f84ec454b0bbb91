use super::assembler::assemble;
use super::unit::{RelocKind, Segment, Source};
use crate::errors::{Diagnostic, Severity};
use crate::riscv::instruction::Instruction;
use crate::settings::Settings;

fn assemble_ok(text: &str) -> super::unit::TranslationUnit {
    let mut diags = Vec::new();
    let unit = assemble(&Source::inline("t.s", text), &Settings::default(), &mut diags);
    assert!(diags.is_empty(), "unexpected diagnostics: {diags:?}");
    unit
}

fn assemble_err(text: &str) -> Vec<Diagnostic> {
    let mut diags = Vec::new();
    assemble(&Source::inline("t.s", text), &Settings::default(), &mut diags);
    assert!(!diags.is_empty(), "expected diagnostics");
    diags
}

#[test]
fn li_small_emits_single_addi() {
    let unit = assemble_ok("li a0, 7");
    assert_eq!(unit.statements.len(), 1);
    assert_eq!(unit.statements[0].inst, Instruction::Addi { rd: 10, rs1: 0, imm: 7 });
}

#[test]
fn li_large_emits_lui_addi() {
    let unit = assemble_ok("li t0, 0x12345678");
    assert_eq!(unit.statements.len(), 2);
    assert_eq!(unit.statements[0].inst, Instruction::Lui { rd: 5, imm: 0x12345 });
    assert_eq!(unit.statements[1].inst, Instruction::Addi { rd: 5, rs1: 5, imm: 0x678 });
}

#[test]
fn la_records_pcrel_pair() {
    let unit = assemble_ok(".data\nvar: .word 0\n.text\nla t0, var");
    assert_eq!(unit.statements.len(), 2);
    assert_eq!(unit.statements[0].reloc.as_ref().unwrap().kind, RelocKind::PcrelHi20);
    assert_eq!(unit.statements[1].reloc.as_ref().unwrap().kind, RelocKind::PcrelLo12);
    assert_eq!(unit.statements[0].reloc.as_ref().unwrap().symbol, "var");
}

#[test]
fn branch_to_label_defers_to_link() {
    let unit = assemble_ok("loop: addi x1, x1, 1\nbne x1, x2, loop");
    let reloc = unit.statements[1].reloc.as_ref().unwrap();
    assert_eq!(reloc.kind, RelocKind::Pcrel);
    assert_eq!(reloc.symbol, "loop");
}

#[test]
fn forward_reference_is_not_an_error() {
    let unit = assemble_ok("j done\nnop\ndone: nop");
    assert_eq!(unit.statements.len(), 3);
}

#[test]
fn duplicate_label_reported() {
    let diags = assemble_err("x: nop\nx: nop");
    assert!(diags[0].message.contains("duplicate label"));
    assert_eq!(diags[0].line, Some(1));
}

#[test]
fn unknown_mnemonic_reported_with_line() {
    let diags = assemble_err("nop\nfrobnicate x1");
    assert!(diags[0].message.contains("unknown mnemonic"));
    assert_eq!(diags[0].line, Some(1));
}

#[test]
fn instruction_outside_text_rejected() {
    let diags = assemble_err(".data\naddi x1, x0, 1");
    assert!(diags[0].message.contains("outside the text segment"));
}

#[test]
fn immediate_out_of_range() {
    let diags = assemble_err("addi x1, x0, 4096");
    assert!(diags[0].message.contains("12-bit"));
}

#[test]
fn data_directives_emit_bytes() {
    let unit = assemble_ok(".data\n.byte 1, 2, 0xff\n.half 0x1234\n.word -1");
    // .byte x3, pad to 4 for .half? no: .half aligns to 2 -> one pad byte
    assert_eq!(&unit.data[..3], &[1, 2, 0xff]);
    assert_eq!(unit.data[3], 0); // alignment pad
    assert_eq!(&unit.data[4..6], &[0x34, 0x12]);
    // .word aligns to 4 -> two pad bytes
    assert_eq!(&unit.data[8..12], &[0xff, 0xff, 0xff, 0xff]);
}

#[test]
fn asciz_appends_nul() {
    let unit = assemble_ok(".data\nmsg: .asciz \"hi\\n\"");
    assert_eq!(unit.data, b"hi\n\0");
}

#[test]
fn ascii_does_not_terminate() {
    let unit = assemble_ok(".rodata\n.ascii \"ab\"");
    assert_eq!(unit.rodata, b"ab");
}

#[test]
fn float_directive_emits_ieee_bytes() {
    let unit = assemble_ok(".data\n.float 1.5");
    assert_eq!(unit.data, 1.5f32.to_le_bytes());
}

#[test]
fn space_reserves_zeroed_bytes() {
    let unit = assemble_ok(".bss\nbuf: .space 16\n.align 3\ntail: .space 1");
    assert_eq!(unit.bss.len(), 17);
    assert_eq!(unit.symbols.get("tail").unwrap().address, 16);
    assert_eq!(unit.symbols.get("buf").unwrap().segment, Segment::Bss);
}

#[test]
fn bss_rejects_explicit_data() {
    let diags = assemble_err(".bss\n.word 1");
    assert!(diags[0].message.contains("not allowed"));
}

#[test]
fn equ_constant_substitutes() {
    let unit = assemble_ok(".equ SIZE, 12\nli a0, SIZE\nlw a1, SIZE(sp)");
    assert_eq!(unit.statements[0].inst, Instruction::Addi { rd: 10, rs1: 0, imm: 12 });
    assert_eq!(unit.statements[1].inst, Instruction::Lw { rd: 11, rs1: 2, imm: 12 });
}

#[test]
fn section_directive_matches_shorthand() {
    let a = assemble_ok(".section .data\nv: .word 1\n.section .text\nnop");
    let b = assemble_ok(".data\nv: .word 1\n.text\nnop");
    assert_eq!(a.data, b.data);
    assert_eq!(a.statements.len(), b.statements.len());
}

#[test]
fn percent_operators_map_to_relocations() {
    let unit = assemble_ok("lui t0, %hi(var)\naddi t0, t0, %lo(var)\n.data\nvar: .word 0");
    assert_eq!(unit.statements[0].reloc.as_ref().unwrap().kind, RelocKind::Hi20);
    assert_eq!(unit.statements[1].reloc.as_ref().unwrap().kind, RelocKind::Lo12);
}

#[test]
fn load_of_label_expands() {
    let unit = assemble_ok(".data\nvar: .word 5\n.text\nlw a0, var");
    assert_eq!(unit.statements.len(), 2);
    assert_eq!(unit.statements[0].inst, Instruction::Auipc { rd: 10, imm: 0 });
    assert_eq!(unit.statements[1].inst, Instruction::Lw { rd: 10, rs1: 10, imm: 0 });
}

#[test]
fn store_of_label_uses_scratch() {
    let unit = assemble_ok(".data\nvar: .word 0\n.text\nsw a0, var, t1");
    assert_eq!(unit.statements.len(), 2);
    assert_eq!(unit.statements[0].inst, Instruction::Auipc { rd: 6, imm: 0 });
    assert_eq!(unit.statements[1].inst, Instruction::Sw { rs2: 10, rs1: 6, imm: 0 });
}

#[test]
fn zero_branch_pseudos() {
    let unit = assemble_ok("done: beqz a0, done\nbgtz a1, done");
    assert_eq!(unit.statements.len(), 2);
    assert!(matches!(unit.statements[0].inst, Instruction::Beq { rs1: 10, rs2: 0, .. }));
    assert!(matches!(unit.statements[1].inst, Instruction::Blt { rs1: 0, rs2: 11, .. }));
}

#[test]
fn reversed_branch_pseudos_swap_operands() {
    let unit = assemble_ok("top: bgt a0, a1, top\nbleu a2, a3, top");
    assert!(matches!(unit.statements[0].inst, Instruction::Blt { rs1: 11, rs2: 10, .. }));
    assert!(matches!(unit.statements[1].inst, Instruction::Bgeu { rs1: 13, rs2: 12, .. }));
}

#[test]
fn float_pseudos_use_sign_injection() {
    let unit = assemble_ok("fmv.s fa0, fa1\nfabs.s ft0, ft1\nfneg.s fs0, fs1");
    assert_eq!(unit.statements[0].inst, Instruction::FsgnjS { rd: 10, rs1: 11, rs2: 11 });
    assert_eq!(unit.statements[1].inst, Instruction::FsgnjxS { rd: 0, rs1: 1, rs2: 1 });
    assert_eq!(unit.statements[2].inst, Instruction::FsgnjnS { rd: 8, rs1: 9, rs2: 9 });
}

#[test]
fn bare_mode_rejects_pseudos() {
    let settings = Settings { bare: true, ..Settings::default() };
    let mut diags = Vec::new();
    assemble(&Source::inline("t.s", "mv a0, a1"), &settings, &mut diags);
    assert!(diags[0].message.contains("bare machine mode"));
    // base encodings still pass
    diags.clear();
    assemble(&Source::inline("t.s", "addi a0, a1, 0"), &settings, &mut diags);
    assert!(diags.is_empty());
}

#[test]
fn extrict_promotes_warnings() {
    let text = ".text\n.align 2";
    let mut diags = Vec::new();
    let lax = Settings { extrict: false, ..Settings::default() };
    assemble(&Source::inline("t.s", text), &lax, &mut diags);
    assert_eq!(diags[0].severity, Severity::Warning);

    diags.clear();
    assemble(&Source::inline("t.s", text), &Settings::default(), &mut diags);
    assert_eq!(diags[0].severity, Severity::Error);
}

#[test]
fn globl_records_export() {
    let unit = assemble_ok(".globl main\nmain: nop");
    assert_eq!(unit.globals.len(), 1);
    assert_eq!(unit.globals[0].0, "main");
}

#[test]
fn lex_error_collected_and_rest_continues() {
    let mut diags = Vec::new();
    let unit = assemble(
        &Source::inline("t.s", "addi x1, x0, @\nnop"),
        &Settings::default(),
        &mut diags,
    );
    assert_eq!(diags.len(), 1);
    assert!(diags[0].message.contains("illegal character"));
    assert_eq!(unit.statements.len(), 1);
}

#[test]
fn labels_offsets_count_expanded_statements() {
    // li below expands to two words, so `after` sits at offset 12
    let unit = assemble_ok("start: nop\nli t0, 0x12345678\nafter: nop");
    assert_eq!(unit.symbols.get("start").unwrap().address, 0);
    assert_eq!(unit.symbols.get("after").unwrap().address, 12);
}
