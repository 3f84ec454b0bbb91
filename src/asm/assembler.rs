//! Two-pass assembler. The first pass walks each line collecting labels,
//! static bytes and parsed statements; addresses and machine words are
//! fixed later, when the linker builds every statement at its final
//! location.

use std::collections::HashMap;

use crate::asm::lexer::{tokenize, Token};
use crate::asm::pseudo::{expand_call, expand_la, expand_li, expand_load_sym, expand_store_sym};
use crate::asm::unit::{
    DebugInfo, RelocKind, Relocation, Segment, Source, Statement, TranslationUnit,
};
use crate::errors::{Diagnostic, Severity};
use crate::riscv::instruction::Instruction;
use crate::settings::Settings;

/// Assembles one source file. Diagnostics are appended to `diags`; the
/// returned unit is complete up to the lines that failed.
pub fn assemble(source: &Source, settings: &Settings, diags: &mut Vec<Diagnostic>) -> TranslationUnit {
    let mut unit = TranslationUnit::new(source.path.clone());
    let mut section = Segment::Text;
    let mut consts: HashMap<String, i32> = HashMap::new();
    let mut text_offset = 0u32;

    let push = |diags: &mut Vec<Diagnostic>, mut d: Diagnostic| {
        if settings.extrict && d.severity == Severity::Warning {
            d.severity = Severity::Error;
        }
        diags.push(d);
    };

    for (line_no, raw) in source.text.lines().enumerate() {
        let debug = DebugInfo::new(&source.path, line_no, raw);
        let at = |d: Diagnostic| d.at(source.path.clone(), line_no, raw);

        let tokens = match tokenize(raw) {
            Ok(tokens) => tokens,
            Err(msg) => {
                push(diags, at(Diagnostic::error(msg)));
                continue;
            }
        };
        let mut toks = &tokens[..];

        // label definitions, possibly several on one line
        while toks.len() >= 2 && matches!(&toks[0], Token::Ident(_)) && toks[1] == Token::Colon {
            let Token::Ident(name) = &toks[0] else { unreachable!() };
            let (seg, offset) = match section {
                Segment::Text => (Segment::Text, text_offset),
                Segment::Rodata => (Segment::Rodata, unit.rodata.len() as u32),
                Segment::Bss => (Segment::Bss, unit.bss.len() as u32),
                Segment::Data => (Segment::Data, unit.data.len() as u32),
            };
            if !unit.symbols.add(name.clone(), seg, offset) {
                push(diags, at(Diagnostic::error(format!("duplicate label: {name}"))));
            }
            toks = &toks[2..];
        }
        if toks.is_empty() {
            continue;
        }

        let head = match &toks[0] {
            Token::Ident(s) => s.clone(),
            other => {
                push(diags, at(Diagnostic::error(format!("expected mnemonic or directive, found {other:?}"))));
                continue;
            }
        };
        let rest = &toks[1..];

        if head.starts_with('.') {
            if let Err(msg) = directive(
                &head, rest, &mut section, &mut unit, &mut consts, settings, &debug, diags,
            ) {
                push(diags, at(Diagnostic::error(msg)));
            }
            continue;
        }

        if section != Segment::Text {
            push(diags, at(Diagnostic::error(format!("instruction outside the text segment: {head}"))));
            continue;
        }
        let ops = match split_operands(rest, &consts) {
            Ok(ops) => ops,
            Err(msg) => {
                push(diags, at(Diagnostic::error(msg)));
                continue;
            }
        };
        match parse_statement(&head.to_lowercase(), &ops, settings, &debug) {
            Ok(stmts) => {
                text_offset += 4 * stmts.len() as u32;
                unit.statements.extend(stmts);
            }
            Err(msg) => push(diags, at(Diagnostic::error(msg))),
        }
    }

    for (name, dbg) in unit.globals.clone() {
        if unit.symbols.get(&name).is_none() {
            push(
                diags,
                Diagnostic::warning(format!(".globl of a label never defined here: {name}")).at(
                    dbg.file, dbg.line, dbg.source,
                ),
            );
        }
    }

    log::debug!(
        "assembled {}: {} statements, {}B rodata, {}B bss, {}B data",
        source.path.display(),
        unit.statements.len(),
        unit.rodata.len(),
        unit.bss.len(),
        unit.data.len()
    );
    unit
}

// ---------- directives ----------

#[allow(clippy::too_many_arguments)]
fn directive(
    name: &str,
    args: &[Token],
    section: &mut Segment,
    unit: &mut TranslationUnit,
    consts: &mut HashMap<String, i32>,
    settings: &Settings,
    debug: &DebugInfo,
    diags: &mut Vec<Diagnostic>,
) -> Result<(), String> {
    match name {
        ".text" => *section = Segment::Text,
        ".data" => *section = Segment::Data,
        ".rodata" => *section = Segment::Rodata,
        ".bss" => *section = Segment::Bss,
        ".section" => {
            let arg = single_ident(args).ok_or("missing section name")?;
            *section = match arg.trim_start_matches('.') {
                "text" => Segment::Text,
                "data" => Segment::Data,
                "rodata" => Segment::Rodata,
                "bss" => Segment::Bss,
                other => return Err(format!("unknown section: {other}")),
            };
        }
        ".globl" | ".global" => {
            let sym = single_ident(args).ok_or("expected symbol name")?;
            unit.globals.push((sym.to_string(), debug.clone()));
        }
        ".equ" | ".eqv" => {
            // .equ name, value
            match args {
                [Token::Ident(sym), Token::Comma, Token::Int(v)] => {
                    consts.insert(sym.clone(), int_to_imm32(*v)?);
                }
                [Token::Ident(sym), Token::Comma, Token::Char(c)] => {
                    consts.insert(sym.clone(), *c as i32);
                }
                _ => return Err("expected 'name, value'".into()),
            }
        }
        ".align" => {
            let n = single_int(args).ok_or("expected alignment exponent")?;
            if !(0..=16).contains(&n) {
                return Err(format!("alignment exponent out of range: {n}"));
            }
            match *section {
                Segment::Text => {
                    let mut w = Diagnostic::warning(".align ignored in the text segment")
                        .at(debug.file.clone(), debug.line, debug.source.clone());
                    if settings.extrict {
                        w.severity = Severity::Error;
                    }
                    diags.push(w);
                }
                Segment::Rodata => pad_to(&mut unit.rodata, 1usize << n),
                Segment::Bss => pad_to(&mut unit.bss, 1usize << n),
                Segment::Data => pad_to(&mut unit.data, 1usize << n),
            }
        }
        ".byte" => {
            let bytes = segment_bytes(unit, *section)
                .ok_or(".byte not allowed in this segment")?;
            for v in int_list(args)? {
                if !(-128..=255).contains(&v) {
                    return Err(format!(".byte out of range: {v}"));
                }
                bytes.push(v as u8);
            }
        }
        ".half" => {
            let bytes = segment_bytes(unit, *section)
                .ok_or(".half not allowed in this segment")?;
            pad_to(bytes, 2);
            for v in int_list(args)? {
                if !(-32768..=65535).contains(&v) {
                    return Err(format!(".half out of range: {v}"));
                }
                bytes.extend_from_slice(&(v as u16).to_le_bytes());
            }
        }
        ".word" => {
            let bytes = segment_bytes(unit, *section)
                .ok_or(".word not allowed in this segment")?;
            pad_to(bytes, 4);
            for v in int_list(args)? {
                bytes.extend_from_slice(&(int_to_imm32(v)? as u32).to_le_bytes());
            }
        }
        ".float" => {
            let bytes = segment_bytes(unit, *section)
                .ok_or(".float not allowed in this segment")?;
            pad_to(bytes, 4);
            for arg in args.split(|t| *t == Token::Comma) {
                let value = match arg {
                    [Token::Float(f)] => *f,
                    [Token::Int(v)] => *v as f32,
                    _ => return Err("expected float literal".into()),
                };
                bytes.extend_from_slice(&value.to_le_bytes());
            }
        }
        ".ascii" | ".asciz" | ".asciiz" | ".string" => {
            let terminated = name != ".ascii";
            let bytes = segment_bytes(unit, *section)
                .ok_or("string data not allowed in this segment")?;
            match args {
                [Token::Str(s)] => {
                    bytes.extend_from_slice(s.as_bytes());
                    if terminated {
                        bytes.push(0);
                    }
                }
                _ => return Err("expected string literal".into()),
            }
        }
        ".space" | ".zero" | ".skip" => {
            let n = single_int(args).ok_or("expected size")?;
            if n < 0 {
                return Err(format!("size must be positive: {n}"));
            }
            let bytes = match *section {
                Segment::Text => return Err(".space not allowed in the text segment".to_string()),
                Segment::Bss => &mut unit.bss,
                Segment::Rodata => &mut unit.rodata,
                Segment::Data => &mut unit.data,
            };
            bytes.extend(std::iter::repeat(0).take(n as usize));
        }
        other => return Err(format!("unknown directive: {other}")),
    }
    Ok(())
}

/// Data-carrying segments; `.bss` reserves but never stores explicit data.
fn segment_bytes(unit: &mut TranslationUnit, section: Segment) -> Option<&mut Vec<u8>> {
    match section {
        Segment::Text | Segment::Bss => None,
        Segment::Rodata => Some(&mut unit.rodata),
        Segment::Data => Some(&mut unit.data),
    }
}

fn pad_to(bytes: &mut Vec<u8>, align: usize) {
    while bytes.len() % align != 0 {
        bytes.push(0);
    }
}

fn single_ident(args: &[Token]) -> Option<&str> {
    match args {
        [Token::Ident(s)] => Some(s),
        _ => None,
    }
}

fn single_int(args: &[Token]) -> Option<i64> {
    match args {
        [Token::Int(v)] => Some(*v),
        _ => None,
    }
}

fn int_list(args: &[Token]) -> Result<Vec<i64>, String> {
    let mut out = Vec::new();
    for arg in args.split(|t| *t == Token::Comma) {
        match arg {
            [Token::Int(v)] => out.push(*v),
            [Token::Char(c)] => out.push(*c as i64),
            _ => return Err("expected integer literal".into()),
        }
    }
    Ok(out)
}

fn int_to_imm32(v: i64) -> Result<i32, String> {
    if (-(1i64 << 31)..(1i64 << 32)).contains(&v) {
        Ok(v as u32 as i32)
    } else {
        Err(format!("value does not fit in 32 bits: {v}"))
    }
}

// ---------- operands ----------

#[derive(Debug, Clone)]
enum Operand {
    /// Register name or symbol; context decides.
    Ident(String),
    Imm(i32),
    Mem { imm: i32, base: String },
    Percent { kind: RelocKind, sym: String },
    PercentMem { kind: RelocKind, sym: String, base: String },
}

fn split_operands(tokens: &[Token], consts: &HashMap<String, i32>) -> Result<Vec<Operand>, String> {
    if tokens.is_empty() {
        return Ok(Vec::new());
    }
    tokens
        .split(|t| *t == Token::Comma)
        .map(|ts| classify(ts, consts))
        .collect()
}

fn percent_kind(name: &str) -> Result<RelocKind, String> {
    Ok(match name {
        "hi" => RelocKind::Hi20,
        "lo" => RelocKind::Lo12,
        "pcrel_hi" => RelocKind::PcrelHi20,
        "pcrel_lo" => RelocKind::PcrelLo12,
        other => return Err(format!("unknown operator: %{other}")),
    })
}

fn classify(tokens: &[Token], consts: &HashMap<String, i32>) -> Result<Operand, String> {
    use Token::*;
    Ok(match tokens {
        [Ident(s)] => match consts.get(s) {
            Some(v) => Operand::Imm(*v),
            None => Operand::Ident(s.clone()),
        },
        [Int(v)] => Operand::Imm(int_to_imm32(*v)?),
        [Char(c)] => Operand::Imm(*c as i32),
        [Int(v), LParen, Ident(r), RParen] => {
            Operand::Mem { imm: int_to_imm32(*v)?, base: r.clone() }
        }
        [Ident(s), LParen, Ident(r), RParen] => match consts.get(s) {
            Some(v) => Operand::Mem { imm: *v, base: r.clone() },
            None => return Err(format!("unknown constant in operand: {s}")),
        },
        [LParen, Ident(r), RParen] => Operand::Mem { imm: 0, base: r.clone() },
        [Percent(p), LParen, Ident(s), RParen] => {
            Operand::Percent { kind: percent_kind(p)?, sym: s.clone() }
        }
        [Percent(p), LParen, Ident(s), RParen, LParen, Ident(r), RParen] => {
            Operand::PercentMem { kind: percent_kind(p)?, sym: s.clone(), base: r.clone() }
        }
        _ => return Err("malformed operand".into()),
    })
}

pub(crate) fn parse_xreg(s: &str) -> Option<u8> {
    let s = s.to_lowercase();
    if let Some(num) = s.strip_prefix('x').and_then(|n| n.parse::<u8>().ok()) {
        if num < 32 {
            return Some(num);
        }
    }
    Some(match s.as_str() {
        "zero" => 0,
        "ra" => 1,
        "sp" => 2,
        "gp" => 3,
        "tp" => 4,
        "t0" => 5,
        "t1" => 6,
        "t2" => 7,
        "s0" | "fp" => 8,
        "s1" => 9,
        "a0" => 10,
        "a1" => 11,
        "a2" => 12,
        "a3" => 13,
        "a4" => 14,
        "a5" => 15,
        "a6" => 16,
        "a7" => 17,
        "s2" => 18,
        "s3" => 19,
        "s4" => 20,
        "s5" => 21,
        "s6" => 22,
        "s7" => 23,
        "s8" => 24,
        "s9" => 25,
        "s10" => 26,
        "s11" => 27,
        "t3" => 28,
        "t4" => 29,
        "t5" => 30,
        "t6" => 31,
        _ => return None,
    })
}

pub(crate) fn parse_freg(s: &str) -> Option<u8> {
    let s = s.to_lowercase();
    if let Some(num) = s.strip_prefix('f').and_then(|n| n.parse::<u8>().ok()) {
        if num < 32 {
            return Some(num);
        }
    }
    // ABI names: ft0-7/fs0-1/fa0-7/fs2-11/ft8-11
    if let Some(n) = s.strip_prefix("ft").and_then(|n| n.parse::<u8>().ok()) {
        return match n {
            0..=7 => Some(n),
            8..=11 => Some(n + 20),
            _ => None,
        };
    }
    if let Some(n) = s.strip_prefix("fs").and_then(|n| n.parse::<u8>().ok()) {
        return match n {
            0..=1 => Some(n + 8),
            2..=11 => Some(n + 16),
            _ => None,
        };
    }
    if let Some(n) = s.strip_prefix("fa").and_then(|n| n.parse::<u8>().ok()) {
        return match n {
            0..=7 => Some(n + 10),
            _ => None,
        };
    }
    None
}

fn xreg(op: &Operand) -> Result<u8, String> {
    match op {
        Operand::Ident(s) => parse_xreg(s).ok_or_else(|| format!("invalid register: {s}")),
        other => Err(format!("expected register, found {other:?}")),
    }
}

fn freg(op: &Operand) -> Result<u8, String> {
    match op {
        Operand::Ident(s) => parse_freg(s).ok_or_else(|| format!("invalid float register: {s}")),
        other => Err(format!("expected float register, found {other:?}")),
    }
}

fn imm(op: &Operand) -> Result<i32, String> {
    match op {
        Operand::Imm(v) => Ok(*v),
        other => Err(format!("expected immediate, found {other:?}")),
    }
}

fn symbol(op: &Operand) -> Result<&str, String> {
    match op {
        Operand::Ident(s) if parse_xreg(s).is_none() && parse_freg(s).is_none() => Ok(s),
        other => Err(format!("expected symbol, found {other:?}")),
    }
}

fn check_signed(value: i32, bits: u32, ctx: &str) -> Result<i32, String> {
    let max = (1i64 << (bits - 1)) - 1;
    let min = -(1i64 << (bits - 1));
    if (value as i64) < min || (value as i64) > max {
        Err(format!("{ctx}: immediate {value} out of {bits}-bit signed range ({min}..{max})"))
    } else {
        Ok(value)
    }
}

fn shamt(op: &Operand) -> Result<u8, String> {
    let v = imm(op)?;
    if (0..=31).contains(&v) {
        Ok(v as u8)
    } else {
        Err(format!("shift amount out of range: {v}"))
    }
}

/// I-type immediate slot: a 12-bit value, a `%lo`-style operator, or a
/// symbol whose absolute address must fit the field.
fn itype_imm(op: &Operand, ctx: &str) -> Result<(i32, Option<Relocation>), String> {
    match op {
        Operand::Imm(v) => Ok((check_signed(*v, 12, ctx)?, None)),
        Operand::Percent { kind: kind @ (RelocKind::Lo12 | RelocKind::PcrelLo12), sym } => {
            Ok((0, Some(Relocation::new(*kind, sym.clone()))))
        }
        Operand::Ident(s) if parse_xreg(s).is_none() => {
            Ok((0, Some(Relocation::new(RelocKind::Default, s.clone()))))
        }
        other => Err(format!("{ctx}: bad immediate operand {other:?}")),
    }
}

/// U-type immediate slot: a raw 20-bit field or a `%hi`-style operator.
fn utype_imm(op: &Operand, ctx: &str) -> Result<(i32, Option<Relocation>), String> {
    match op {
        Operand::Imm(v) => {
            if (0..=0xfffff).contains(v) {
                Ok((*v, None))
            } else {
                Err(format!("{ctx}: immediate {v} out of 20-bit range"))
            }
        }
        Operand::Percent { kind: kind @ (RelocKind::Hi20 | RelocKind::PcrelHi20), sym } => {
            Ok((0, Some(Relocation::new(*kind, sym.clone()))))
        }
        other => Err(format!("{ctx}: bad immediate operand {other:?}")),
    }
}

/// Branch/jump target: numeric byte offset or a symbol resolved at link.
fn target(op: &Operand, bits: u32, ctx: &str) -> Result<(i32, Option<Relocation>), String> {
    match op {
        Operand::Imm(v) => {
            if v % 2 != 0 {
                return Err(format!("{ctx}: offset {v} must be even"));
            }
            Ok((check_signed(*v, bits, ctx)?, None))
        }
        Operand::Ident(s) if parse_xreg(s).is_none() => {
            Ok((0, Some(Relocation::new(RelocKind::Pcrel, s.clone()))))
        }
        other => Err(format!("{ctx}: bad target {other:?}")),
    }
}

fn one(inst: Instruction, reloc: Option<Relocation>, debug: &DebugInfo) -> Vec<Statement> {
    vec![match reloc {
        Some(r) => Statement::with_reloc(inst, r, debug.clone()),
        None => Statement::new(inst, debug.clone()),
    }]
}

fn arity(ops: &[Operand], n: usize, shape: &str) -> Result<(), String> {
    if ops.len() != n {
        return Err(format!("expected '{shape}'"));
    }
    Ok(())
}

// ---------- statements ----------

fn parse_statement(
    mnemonic: &str,
    ops: &[Operand],
    settings: &Settings,
    debug: &DebugInfo,
) -> Result<Vec<Statement>, String> {
    use Instruction::*;

    let pseudo = |stmts: Result<Vec<Statement>, String>| {
        if settings.bare {
            Err(format!("pseudo-instructions are disabled in bare machine mode: {mnemonic}"))
        } else {
            stmts
        }
    };

    match mnemonic {
        // ---------- R-type ----------
        "add" | "sub" | "sll" | "slt" | "sltu" | "xor" | "srl" | "sra" | "or" | "and" | "mul"
        | "mulh" | "mulhsu" | "mulhu" | "div" | "divu" | "rem" | "remu" => {
            arity(ops, 3, "rd, rs1, rs2")?;
            let rd = xreg(&ops[0])?;
            let rs1 = xreg(&ops[1])?;
            let rs2 = xreg(&ops[2])?;
            let inst = match mnemonic {
                "add" => Add { rd, rs1, rs2 },
                "sub" => Sub { rd, rs1, rs2 },
                "sll" => Sll { rd, rs1, rs2 },
                "slt" => Slt { rd, rs1, rs2 },
                "sltu" => Sltu { rd, rs1, rs2 },
                "xor" => Xor { rd, rs1, rs2 },
                "srl" => Srl { rd, rs1, rs2 },
                "sra" => Sra { rd, rs1, rs2 },
                "or" => Or { rd, rs1, rs2 },
                "and" => And { rd, rs1, rs2 },
                "mul" => Mul { rd, rs1, rs2 },
                "mulh" => Mulh { rd, rs1, rs2 },
                "mulhsu" => Mulhsu { rd, rs1, rs2 },
                "mulhu" => Mulhu { rd, rs1, rs2 },
                "div" => Div { rd, rs1, rs2 },
                "divu" => Divu { rd, rs1, rs2 },
                "rem" => Rem { rd, rs1, rs2 },
                "remu" => Remu { rd, rs1, rs2 },
                _ => unreachable!(),
            };
            Ok(one(inst, None, debug))
        }

        // ---------- I-type ----------
        "addi" | "slti" | "sltiu" | "xori" | "ori" | "andi" => {
            arity(ops, 3, "rd, rs1, imm")?;
            let rd = xreg(&ops[0])?;
            let rs1 = xreg(&ops[1])?;
            let (imm, reloc) = itype_imm(&ops[2], mnemonic)?;
            let inst = match mnemonic {
                "addi" => Addi { rd, rs1, imm },
                "slti" => Slti { rd, rs1, imm },
                "sltiu" => Sltiu { rd, rs1, imm },
                "xori" => Xori { rd, rs1, imm },
                "ori" => Ori { rd, rs1, imm },
                "andi" => Andi { rd, rs1, imm },
                _ => unreachable!(),
            };
            Ok(one(inst, reloc, debug))
        }
        "slli" | "srli" | "srai" => {
            arity(ops, 3, "rd, rs1, shamt")?;
            let rd = xreg(&ops[0])?;
            let rs1 = xreg(&ops[1])?;
            let shamt = shamt(&ops[2])?;
            let inst = match mnemonic {
                "slli" => Slli { rd, rs1, shamt },
                "srli" => Srli { rd, rs1, shamt },
                "srai" => Srai { rd, rs1, shamt },
                _ => unreachable!(),
            };
            Ok(one(inst, None, debug))
        }

        // ---------- loads ----------
        "lb" | "lh" | "lw" | "lbu" | "lhu" => {
            arity(ops, 2, "rd, imm(rs1)")?;
            let rd = xreg(&ops[0])?;
            let make = |rs1: u8, imm: i32| match mnemonic {
                "lb" => Lb { rd, rs1, imm },
                "lh" => Lh { rd, rs1, imm },
                "lw" => Lw { rd, rs1, imm },
                "lbu" => Lbu { rd, rs1, imm },
                "lhu" => Lhu { rd, rs1, imm },
                _ => unreachable!(),
            };
            match &ops[1] {
                Operand::Mem { imm, base } => {
                    let rs1 = parse_xreg(base).ok_or_else(|| format!("invalid register: {base}"))?;
                    Ok(one(make(rs1, check_signed(*imm, 12, mnemonic)?), None, debug))
                }
                Operand::PercentMem { kind: kind @ (RelocKind::Lo12 | RelocKind::PcrelLo12), sym, base } => {
                    let rs1 = parse_xreg(base).ok_or_else(|| format!("invalid register: {base}"))?;
                    Ok(one(make(rs1, 0), Some(Relocation::new(*kind, sym.clone())), debug))
                }
                op => {
                    let sym = symbol(op)?;
                    pseudo(Ok(expand_load_sym(make(rd, 0), rd, sym, debug)))
                }
            }
        }
        "flw" => {
            let rd = freg(ops.first().ok_or("expected 'rd, imm(rs1)'")?)?;
            match ops {
                [_, Operand::Mem { imm, base }] => {
                    let rs1 = parse_xreg(base).ok_or_else(|| format!("invalid register: {base}"))?;
                    Ok(one(Flw { rd, rs1, imm: check_signed(*imm, 12, mnemonic)? }, None, debug))
                }
                // flw frd, symbol, rt
                [_, sym_op, rt_op] => {
                    let sym = symbol(sym_op)?;
                    let rt = xreg(rt_op)?;
                    pseudo(Ok(expand_load_sym(Flw { rd, rs1: rt, imm: 0 }, rt, sym, debug)))
                }
                _ => Err("expected 'rd, imm(rs1)' or 'rd, symbol, rt'".into()),
            }
        }

        // ---------- stores ----------
        "sb" | "sh" | "sw" => {
            let rs2 = xreg(ops.first().ok_or("expected 'rs2, imm(rs1)'")?)?;
            let make = |rs1: u8, imm: i32| match mnemonic {
                "sb" => Sb { rs2, rs1, imm },
                "sh" => Sh { rs2, rs1, imm },
                "sw" => Sw { rs2, rs1, imm },
                _ => unreachable!(),
            };
            match ops {
                [_, Operand::Mem { imm, base }] => {
                    let rs1 = parse_xreg(base).ok_or_else(|| format!("invalid register: {base}"))?;
                    Ok(one(make(rs1, check_signed(*imm, 12, mnemonic)?), None, debug))
                }
                [_, Operand::PercentMem { kind: kind @ (RelocKind::Lo12 | RelocKind::PcrelLo12), sym, base }] => {
                    let rs1 = parse_xreg(base).ok_or_else(|| format!("invalid register: {base}"))?;
                    Ok(one(make(rs1, 0), Some(Relocation::new(*kind, sym.clone())), debug))
                }
                // sw rs2, symbol, rt
                [_, sym_op, rt_op] => {
                    let sym = symbol(sym_op)?;
                    let rt = xreg(rt_op)?;
                    pseudo(Ok(expand_store_sym(make(rt, 0), rt, sym, debug)))
                }
                _ => Err("expected 'rs2, imm(rs1)' or 'rs2, symbol, rt'".into()),
            }
        }
        "fsw" => {
            let rs2 = freg(ops.first().ok_or("expected 'rs2, imm(rs1)'")?)?;
            match ops {
                [_, Operand::Mem { imm, base }] => {
                    let rs1 = parse_xreg(base).ok_or_else(|| format!("invalid register: {base}"))?;
                    Ok(one(Fsw { rs2, rs1, imm: check_signed(*imm, 12, mnemonic)? }, None, debug))
                }
                [_, sym_op, rt_op] => {
                    let sym = symbol(sym_op)?;
                    let rt = xreg(rt_op)?;
                    pseudo(Ok(expand_store_sym(Fsw { rs2, rs1: rt, imm: 0 }, rt, sym, debug)))
                }
                _ => Err("expected 'rs2, imm(rs1)' or 'rs2, symbol, rt'".into()),
            }
        }

        // ---------- branches ----------
        "beq" | "bne" | "blt" | "bge" | "bltu" | "bgeu" => {
            arity(ops, 3, "rs1, rs2, target")?;
            let rs1 = xreg(&ops[0])?;
            let rs2 = xreg(&ops[1])?;
            let (imm, reloc) = target(&ops[2], 13, mnemonic)?;
            let inst = match mnemonic {
                "beq" => Beq { rs1, rs2, imm },
                "bne" => Bne { rs1, rs2, imm },
                "blt" => Blt { rs1, rs2, imm },
                "bge" => Bge { rs1, rs2, imm },
                "bltu" => Bltu { rs1, rs2, imm },
                "bgeu" => Bgeu { rs1, rs2, imm },
                _ => unreachable!(),
            };
            Ok(one(inst, reloc, debug))
        }

        // ---------- U/J ----------
        "lui" | "auipc" => {
            arity(ops, 2, "rd, imm")?;
            let rd = xreg(&ops[0])?;
            let (imm, reloc) = utype_imm(&ops[1], mnemonic)?;
            let inst = match mnemonic {
                "lui" => Lui { rd, imm },
                "auipc" => Auipc { rd, imm },
                _ => unreachable!(),
            };
            Ok(one(inst, reloc, debug))
        }
        // jal: "jal target" (rd=ra) or "jal rd, target"
        "jal" => match ops {
            [t] => {
                let (imm, reloc) = target(t, 21, mnemonic)?;
                Ok(one(Jal { rd: 1, imm }, reloc, debug))
            }
            [rd_op, t] => {
                let rd = xreg(rd_op)?;
                let (imm, reloc) = target(t, 21, mnemonic)?;
                Ok(one(Jal { rd, imm }, reloc, debug))
            }
            _ => Err("expected 'target' or 'rd, target'".into()),
        },
        "jalr" => match ops {
            [rs1_op] => Ok(one(Jalr { rd: 1, rs1: xreg(rs1_op)?, imm: 0 }, None, debug)),
            [rd_op, rs1_op, imm_op] => {
                let rd = xreg(rd_op)?;
                let rs1 = xreg(rs1_op)?;
                let (imm, reloc) = itype_imm(imm_op, mnemonic)?;
                Ok(one(Jalr { rd, rs1, imm }, reloc, debug))
            }
            _ => Err("expected 'rs1' or 'rd, rs1, imm'".into()),
        },

        // ---------- system ----------
        "fence" => {
            // operand sets are accepted and ignored
            Ok(one(Fence, None, debug))
        }
        "ecall" => {
            arity(ops, 0, "ecall")?;
            Ok(one(Ecall, None, debug))
        }
        "ebreak" => {
            arity(ops, 0, "ebreak")?;
            Ok(one(Ebreak, None, debug))
        }

        // ---------- F extension ----------
        "fadd.s" | "fsub.s" | "fmul.s" | "fdiv.s" | "fsgnj.s" | "fsgnjn.s" | "fsgnjx.s"
        | "fmin.s" | "fmax.s" => {
            arity(ops, 3, "rd, rs1, rs2")?;
            let rd = freg(&ops[0])?;
            let rs1 = freg(&ops[1])?;
            let rs2 = freg(&ops[2])?;
            let inst = match mnemonic {
                "fadd.s" => FaddS { rd, rs1, rs2 },
                "fsub.s" => FsubS { rd, rs1, rs2 },
                "fmul.s" => FmulS { rd, rs1, rs2 },
                "fdiv.s" => FdivS { rd, rs1, rs2 },
                "fsgnj.s" => FsgnjS { rd, rs1, rs2 },
                "fsgnjn.s" => FsgnjnS { rd, rs1, rs2 },
                "fsgnjx.s" => FsgnjxS { rd, rs1, rs2 },
                "fmin.s" => FminS { rd, rs1, rs2 },
                "fmax.s" => FmaxS { rd, rs1, rs2 },
                _ => unreachable!(),
            };
            Ok(one(inst, None, debug))
        }
        "fsqrt.s" => {
            arity(ops, 2, "rd, rs1")?;
            Ok(one(FsqrtS { rd: freg(&ops[0])?, rs1: freg(&ops[1])? }, None, debug))
        }
        "fmadd.s" | "fmsub.s" | "fnmsub.s" | "fnmadd.s" => {
            arity(ops, 4, "rd, rs1, rs2, rs3")?;
            let rd = freg(&ops[0])?;
            let rs1 = freg(&ops[1])?;
            let rs2 = freg(&ops[2])?;
            let rs3 = freg(&ops[3])?;
            let inst = match mnemonic {
                "fmadd.s" => FmaddS { rd, rs1, rs2, rs3 },
                "fmsub.s" => FmsubS { rd, rs1, rs2, rs3 },
                "fnmsub.s" => FnmsubS { rd, rs1, rs2, rs3 },
                "fnmadd.s" => FnmaddS { rd, rs1, rs2, rs3 },
                _ => unreachable!(),
            };
            Ok(one(inst, None, debug))
        }
        "feq.s" | "flt.s" | "fle.s" => {
            arity(ops, 3, "rd, rs1, rs2")?;
            let rd = xreg(&ops[0])?;
            let rs1 = freg(&ops[1])?;
            let rs2 = freg(&ops[2])?;
            let inst = match mnemonic {
                "feq.s" => FeqS { rd, rs1, rs2 },
                "flt.s" => FltS { rd, rs1, rs2 },
                "fle.s" => FleS { rd, rs1, rs2 },
                _ => unreachable!(),
            };
            Ok(one(inst, None, debug))
        }
        "fcvt.w.s" | "fcvt.wu.s" | "fmv.x.w" | "fclass.s" => {
            arity(ops, 2, "rd, rs1")?;
            let rd = xreg(&ops[0])?;
            let rs1 = freg(&ops[1])?;
            let inst = match mnemonic {
                "fcvt.w.s" => FcvtWS { rd, rs1 },
                "fcvt.wu.s" => FcvtWuS { rd, rs1 },
                "fmv.x.w" => FmvXW { rd, rs1 },
                "fclass.s" => FclassS { rd, rs1 },
                _ => unreachable!(),
            };
            Ok(one(inst, None, debug))
        }
        "fcvt.s.w" | "fcvt.s.wu" | "fmv.w.x" => {
            arity(ops, 2, "rd, rs1")?;
            let rd = freg(&ops[0])?;
            let rs1 = xreg(&ops[1])?;
            let inst = match mnemonic {
                "fcvt.s.w" => FcvtSW { rd, rs1 },
                "fcvt.s.wu" => FcvtSWu { rd, rs1 },
                "fmv.w.x" => FmvWX { rd, rs1 },
                _ => unreachable!(),
            };
            Ok(one(inst, None, debug))
        }

        // ---------- pseudo-instructions ----------
        "nop" => {
            arity(ops, 0, "nop")?;
            pseudo(Ok(one(Addi { rd: 0, rs1: 0, imm: 0 }, None, debug)))
        }
        "mv" => {
            arity(ops, 2, "rd, rs")?;
            pseudo(Ok(one(Addi { rd: xreg(&ops[0])?, rs1: xreg(&ops[1])?, imm: 0 }, None, debug)))
        }
        "not" => {
            arity(ops, 2, "rd, rs")?;
            pseudo(Ok(one(Xori { rd: xreg(&ops[0])?, rs1: xreg(&ops[1])?, imm: -1 }, None, debug)))
        }
        "neg" => {
            arity(ops, 2, "rd, rs")?;
            pseudo(Ok(one(Sub { rd: xreg(&ops[0])?, rs1: 0, rs2: xreg(&ops[1])? }, None, debug)))
        }
        "li" => {
            arity(ops, 2, "rd, imm")?;
            let rd = xreg(&ops[0])?;
            let value = imm(&ops[1])?;
            pseudo(Ok(expand_li(rd, value, debug)))
        }
        "la" => {
            arity(ops, 2, "rd, symbol")?;
            let rd = xreg(&ops[0])?;
            let sym = symbol(&ops[1])?;
            pseudo(Ok(expand_la(rd, sym, debug)))
        }
        "call" | "tail" => {
            arity(ops, 1, "symbol")?;
            let sym = symbol(&ops[0])?;
            let link = if mnemonic == "call" { 1 } else { 0 };
            pseudo(Ok(expand_call(link, sym, debug)))
        }
        "j" => {
            arity(ops, 1, "target")?;
            let (imm, reloc) = target(&ops[0], 21, mnemonic)?;
            pseudo(Ok(one(Jal { rd: 0, imm }, reloc, debug)))
        }
        "jr" => {
            arity(ops, 1, "rs")?;
            pseudo(Ok(one(Jalr { rd: 0, rs1: xreg(&ops[0])?, imm: 0 }, None, debug)))
        }
        "ret" => {
            arity(ops, 0, "ret")?;
            pseudo(Ok(one(Jalr { rd: 0, rs1: 1, imm: 0 }, None, debug)))
        }
        "seqz" => {
            arity(ops, 2, "rd, rs")?;
            pseudo(Ok(one(Sltiu { rd: xreg(&ops[0])?, rs1: xreg(&ops[1])?, imm: 1 }, None, debug)))
        }
        "snez" => {
            arity(ops, 2, "rd, rs")?;
            pseudo(Ok(one(Sltu { rd: xreg(&ops[0])?, rs1: 0, rs2: xreg(&ops[1])? }, None, debug)))
        }
        "sltz" => {
            arity(ops, 2, "rd, rs")?;
            pseudo(Ok(one(Slt { rd: xreg(&ops[0])?, rs1: xreg(&ops[1])?, rs2: 0 }, None, debug)))
        }
        "sgtz" => {
            arity(ops, 2, "rd, rs")?;
            pseudo(Ok(one(Slt { rd: xreg(&ops[0])?, rs1: 0, rs2: xreg(&ops[1])? }, None, debug)))
        }
        "beqz" | "bnez" | "blez" | "bgez" | "bltz" | "bgtz" => {
            arity(ops, 2, "rs, target")?;
            let rs = xreg(&ops[0])?;
            let (imm, reloc) = target(&ops[1], 13, mnemonic)?;
            let inst = match mnemonic {
                "beqz" => Beq { rs1: rs, rs2: 0, imm },
                "bnez" => Bne { rs1: rs, rs2: 0, imm },
                "blez" => Bge { rs1: 0, rs2: rs, imm },
                "bgez" => Bge { rs1: rs, rs2: 0, imm },
                "bltz" => Blt { rs1: rs, rs2: 0, imm },
                "bgtz" => Blt { rs1: 0, rs2: rs, imm },
                _ => unreachable!(),
            };
            pseudo(Ok(one(inst, reloc, debug)))
        }
        // reversed-operand branches
        "bgt" | "ble" | "bgtu" | "bleu" => {
            arity(ops, 3, "rs1, rs2, target")?;
            let a = xreg(&ops[0])?;
            let b = xreg(&ops[1])?;
            let (imm, reloc) = target(&ops[2], 13, mnemonic)?;
            let inst = match mnemonic {
                "bgt" => Blt { rs1: b, rs2: a, imm },
                "ble" => Bge { rs1: b, rs2: a, imm },
                "bgtu" => Bltu { rs1: b, rs2: a, imm },
                "bleu" => Bgeu { rs1: b, rs2: a, imm },
                _ => unreachable!(),
            };
            pseudo(Ok(one(inst, reloc, debug)))
        }
        "fmv.s" => {
            arity(ops, 2, "rd, rs")?;
            let rd = freg(&ops[0])?;
            let rs = freg(&ops[1])?;
            pseudo(Ok(one(FsgnjS { rd, rs1: rs, rs2: rs }, None, debug)))
        }
        "fabs.s" => {
            arity(ops, 2, "rd, rs")?;
            let rd = freg(&ops[0])?;
            let rs = freg(&ops[1])?;
            pseudo(Ok(one(FsgnjxS { rd, rs1: rs, rs2: rs }, None, debug)))
        }
        "fneg.s" => {
            arity(ops, 2, "rd, rs")?;
            let rd = freg(&ops[0])?;
            let rs = freg(&ops[1])?;
            pseudo(Ok(one(FsgnjnS { rd, rs1: rs, rs2: rs }, None, debug)))
        }

        _ => Err(format!("unknown mnemonic: {mnemonic}")),
    }
}
