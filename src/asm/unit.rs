//! The per-source-file output of the assembler: statements, local symbols,
//! static bytes and pending relocations, all unresolved until link time.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::errors::Diagnostic;
use crate::riscv::encoder::encode;
use crate::riscv::instruction::{Format, Instruction};

/// A source file handed to the assembler. `read` acquires the file handle,
/// reads it fully and releases it before any parsing happens.
#[derive(Debug, Clone)]
pub struct Source {
    pub path: PathBuf,
    pub text: String,
}

impl Source {
    pub fn read(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let text = std::fs::read_to_string(&path)?;
        Ok(Source { path, text })
    }

    pub fn inline(name: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Source { path: name.into(), text: text.into() }
    }
}

/// Program segments a label can live in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    Text,
    Rodata,
    Bss,
    Data,
}

/// Where a statement came from, carried into every diagnostic.
#[derive(Debug, Clone)]
pub struct DebugInfo {
    pub file: PathBuf,
    pub line: usize,
    pub source: String,
}

impl DebugInfo {
    pub fn new(file: impl Into<PathBuf>, line: usize, source: impl Into<String>) -> Self {
        DebugInfo { file: file.into(), line, source: source.into() }
    }
}

/// Deferred computation of an immediate from symbol addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelocKind {
    /// Upper 20 bits of an absolute address, carry-adjusted.
    Hi20,
    /// Low 12 bits matching a `Hi20` at the same target.
    Lo12,
    /// Upper 20 bits of `target - site`, carry-adjusted.
    PcrelHi20,
    /// Low 12 bits of `target - hi_site`, paired with the `auipc` one
    /// statement earlier.
    PcrelLo12,
    /// Byte offset `target - site` for branches and jumps.
    Pcrel,
    /// The absolute symbol value itself.
    Default,
}

#[derive(Debug, Clone)]
pub struct Relocation {
    pub kind: RelocKind,
    pub symbol: String,
}

impl Relocation {
    pub fn new(kind: RelocKind, symbol: impl Into<String>) -> Self {
        Relocation { kind, symbol: symbol.into() }
    }

    /// Evaluates the immediate this relocation feeds into the encoder.
    pub fn eval(&self, target: u32, site: u32) -> i32 {
        match self.kind {
            RelocKind::Hi20 => hi20(target as i32),
            RelocKind::Lo12 => lo12(target as i32),
            RelocKind::PcrelHi20 => hi20(target.wrapping_sub(site) as i32),
            // the paired auipc sits one instruction back
            RelocKind::PcrelLo12 => lo12(target.wrapping_sub(site.wrapping_sub(4)) as i32),
            RelocKind::Pcrel => target.wrapping_sub(site) as i32,
            RelocKind::Default => target as i32,
        }
    }
}

/// Carry-adjusted split of a 32-bit value into a 20-bit upper field and a
/// signed 12-bit remainder, so `(hi << 12) + lo` reproduces the value.
pub fn hi20(value: i32) -> i32 {
    (value.wrapping_add(0x800) >> 12) & 0xfffff
}

pub fn lo12(value: i32) -> i32 {
    value.wrapping_sub((value.wrapping_add(0x800) >> 12) << 12)
}

/// One instruction of the text stream. Pre-build it carries a possibly
/// placeholder immediate plus the relocation that will fill it; `build`
/// resolves and encodes at the final address.
#[derive(Debug, Clone)]
pub struct Statement {
    pub inst: Instruction,
    pub reloc: Option<Relocation>,
    pub debug: DebugInfo,
}

impl Statement {
    pub fn new(inst: Instruction, debug: DebugInfo) -> Self {
        Statement { inst, reloc: None, debug }
    }

    pub fn with_reloc(inst: Instruction, reloc: Relocation, debug: DebugInfo) -> Self {
        Statement { inst, reloc: Some(reloc), debug }
    }

    /// Builds the machine word at `address`, evaluating the relocation via
    /// `resolve` (local symbols first, then globals).
    pub fn build(
        &self,
        address: u32,
        resolve: &dyn Fn(&str) -> Option<u32>,
    ) -> Result<(Instruction, u32), Diagnostic> {
        let inst = match &self.reloc {
            None => self.inst,
            Some(reloc) => {
                let target = resolve(&reloc.symbol).ok_or_else(|| {
                    Diagnostic::error(format!("undefined symbol: {}", reloc.symbol)).at(
                        self.debug.file.clone(),
                        self.debug.line,
                        self.debug.source.clone(),
                    )
                })?;
                let value = reloc.eval(target, address);
                self.check_range(value, reloc.kind)?;
                self.inst.with_imm(value)
            }
        };
        Ok((inst, encode(inst)))
    }

    fn check_range(&self, value: i32, kind: RelocKind) -> Result<(), Diagnostic> {
        let bits: u32 = match self.inst.format() {
            Format::B => 13,
            Format::J => 21,
            Format::I | Format::S => 12,
            // the 20-bit field wraps consistently with the matching low half
            Format::U => return Ok(()),
            Format::R | Format::R4 => return Ok(()),
        };
        let min = -(1i64 << (bits - 1));
        let max = (1i64 << (bits - 1)) - 1;
        if (value as i64) < min || (value as i64) > max {
            return Err(Diagnostic::error(format!(
                "relocation overflow: {} does not fit in {} bits ({:?})",
                value, bits, kind
            ))
            .at(self.debug.file.clone(), self.debug.line, self.debug.source.clone()));
        }
        Ok(())
    }
}

/// A label definition: segment plus address. Addresses are segment-local
/// offsets until the linker relocates the table.
#[derive(Debug, Clone, Copy)]
pub struct Sym {
    pub segment: Segment,
    pub address: u32,
}

#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    table: HashMap<String, Sym>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable { table: HashMap::new() }
    }

    /// Adds a label; `false` if it already exists.
    pub fn add(&mut self, label: impl Into<String>, segment: Segment, address: u32) -> bool {
        let label = label.into();
        if self.table.contains_key(&label) {
            return false;
        }
        self.table.insert(label, Sym { segment, address });
        true
    }

    pub fn get(&self, label: &str) -> Option<&Sym> {
        self.table.get(label)
    }

    pub fn labels(&self) -> impl Iterator<Item = (&String, &Sym)> {
        self.table.iter()
    }

    fn relocate(&mut self, text: u32, rodata: u32, bss: u32, data: u32) {
        for sym in self.table.values_mut() {
            sym.address += match sym.segment {
                Segment::Text => text,
                Segment::Rodata => rodata,
                Segment::Bss => bss,
                Segment::Data => data,
            };
        }
    }
}

/// Everything the assembler produced for one source file.
#[derive(Debug, Clone)]
pub struct TranslationUnit {
    pub path: PathBuf,
    pub statements: Vec<Statement>,
    pub symbols: SymbolTable,
    /// labels exported with `.globl`, with the declaration site
    pub globals: Vec<(String, DebugInfo)>,
    pub rodata: Vec<u8>,
    pub bss: Vec<u8>,
    pub data: Vec<u8>,
    text_start: u32,
    rodata_start: u32,
    bss_start: u32,
    data_start: u32,
}

impl TranslationUnit {
    pub fn new(path: PathBuf) -> Self {
        TranslationUnit {
            path,
            statements: Vec::new(),
            symbols: SymbolTable::new(),
            globals: Vec::new(),
            rodata: Vec::new(),
            bss: Vec::new(),
            data: Vec::new(),
            text_start: 0,
            rodata_start: 0,
            bss_start: 0,
            data_start: 0,
        }
    }

    /// Text bytes this unit occupies.
    pub fn text_size(&self) -> u32 {
        self.statements.len() as u32 * 4
    }

    pub fn set_rodata_start(&mut self, address: u32) {
        self.rodata_start = address;
    }

    pub fn set_bss_start(&mut self, address: u32) {
        self.bss_start = address;
    }

    pub fn set_data_start(&mut self, address: u32) {
        self.data_start = address;
    }

    pub fn set_text_start(&mut self, address: u32) {
        self.text_start = address;
    }

    pub fn text_start(&self) -> u32 {
        self.text_start
    }

    /// Turns segment-local label offsets into absolute addresses. Called
    /// once by the linker after every segment start is fixed.
    pub fn relocate_symbols(&mut self) {
        self.symbols.relocate(self.text_start, self.rodata_start, self.bss_start, self.data_start);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hi_lo_split_reconstructs() {
        for value in [0i32, 1, -1, 0x12345678, 0x7ff, 0x800, 0x801, -0x800, 0x0fff_ffff] {
            let hi = hi20(value);
            let lo = lo12(value);
            assert!((-2048..=2047).contains(&lo), "lo12 out of range for {value:#x}");
            assert_eq!((hi << 12).wrapping_add(lo), value, "value {value:#x}");
        }
    }

    #[test]
    fn pcrel_pair_sums_to_target() {
        let site = 0x0001_0000u32;
        let target = 0x1000_0abcu32;
        let hi = Relocation::new(RelocKind::PcrelHi20, "x").eval(target, site);
        let lo = Relocation::new(RelocKind::PcrelLo12, "x").eval(target, site + 4);
        let got = site.wrapping_add(((hi as u32) << 12).wrapping_add(lo as u32));
        assert_eq!(got, target);
    }

    #[test]
    fn duplicate_labels_rejected() {
        let mut table = SymbolTable::new();
        assert!(table.add("loop", Segment::Text, 0));
        assert!(!table.add("loop", Segment::Text, 8));
    }

    #[test]
    fn symbol_relocation_adds_segment_start() {
        let mut unit = TranslationUnit::new(PathBuf::from("a.s"));
        unit.symbols.add("msg", Segment::Data, 4);
        unit.symbols.add("entry", Segment::Text, 8);
        unit.set_text_start(0x0001_0008);
        unit.set_data_start(0x1000_0010);
        unit.relocate_symbols();
        assert_eq!(unit.symbols.get("msg").unwrap().address, 0x1000_0014);
        assert_eq!(unit.symbols.get("entry").unwrap().address, 0x0001_0010);
    }
}
