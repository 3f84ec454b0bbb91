//! Lays translation units into the simulated address space, resolves
//! cross-unit symbols and builds every statement into memory.

use std::collections::HashMap;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use crate::asm::unit::{DebugInfo, RelocKind, Relocation, Segment, Statement, TranslationUnit};
use crate::errors::{BuildError, Diagnostic, Severity};
use crate::riscv::instruction::Instruction;
use crate::riscv::registers::GP;
use crate::riscv::state::State;
use crate::riscv::{INST_LENGTH, STATIC_BEGIN, TEXT_BEGIN, TEXT_CEILING};
use crate::settings::Settings;
use crate::utils::align_to_word;

/// A `.globl` export after address resolution.
#[derive(Debug, Clone)]
pub struct GlobalSymbol {
    pub address: u32,
    pub segment: Segment,
    pub unit: PathBuf,
}

/// Exported label -> defining unit and absolute address. Total only after
/// a successful link.
#[derive(Debug, Clone, Default)]
pub struct GlobalSymbolTable {
    table: HashMap<String, GlobalSymbol>,
}

impl GlobalSymbolTable {
    pub fn get(&self, label: &str) -> Option<&GlobalSymbol> {
        self.table.get(label)
    }

    pub fn labels(&self) -> impl Iterator<Item = (&String, &GlobalSymbol)> {
        self.table.iter()
    }

    fn add(&mut self, label: &str, sym: GlobalSymbol) -> bool {
        if self.table.contains_key(label) {
            return false;
        }
        self.table.insert(label.to_string(), sym);
        true
    }
}

/// A statement built at its final address.
#[derive(Debug, Clone)]
pub struct BuiltStatement {
    pub inst: Instruction,
    pub code: u32,
    pub debug: DebugInfo,
}

/// The loadable result of a link: machine words plus static bytes, kept
/// so `reset` can reload memory from scratch.
#[derive(Debug, Clone)]
struct Image {
    text: Vec<(u32, u32)>,
    blobs: Vec<(u32, Vec<u8>)>,
    text_end: u32,
    rodata: Option<(u32, u32)>,
    heap_start: u32,
}

#[derive(Debug)]
pub struct LinkedProgram {
    statements: HashMap<u32, BuiltStatement>,
    /// per-unit machine words in build order, for the code dump
    unit_code: Vec<(PathBuf, Vec<u32>)>,
    globals: GlobalSymbolTable,
    image: Image,
    state: State,
}

impl LinkedProgram {
    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut State {
        &mut self.state
    }

    pub fn globals(&self) -> &GlobalSymbolTable {
        &self.globals
    }

    /// Statement at `address`, if the address holds one.
    pub fn statement_at(&self, address: u32) -> Option<&BuiltStatement> {
        self.statements.get(&address)
    }

    pub fn text_begin(&self) -> u32 {
        TEXT_BEGIN
    }

    /// Exclusive end of the text image.
    pub fn text_end(&self) -> u32 {
        self.image.text_end
    }

    pub fn heap_start(&self) -> u32 {
        self.image.heap_start
    }

    /// Restores registers, memory and cache to the just-loaded image.
    pub fn reset(&mut self) {
        self.state.xregs.reset();
        self.state.fregs.reset();
        self.state.memory.reset();
        self.load_image();
    }

    fn load_image(&mut self) {
        for (address, word) in &self.image.text {
            self.state.memory.store_image_word(*address, *word);
        }
        for (start, bytes) in &self.image.blobs {
            for (i, b) in bytes.iter().enumerate() {
                self.state.memory.store_image_byte(start + i as u32, *b);
            }
        }
        self.state.xregs.restore(GP, self.image.heap_start);
    }

    /// Writes the linked code as 8-hex-digit words, one per line, with a
    /// `<path>:` header per unit when more than one was linked.
    pub fn dump_code(&self, out: &mut dyn Write) -> std::io::Result<()> {
        let many = self.unit_code.len() > 1;
        for (path, words) in &self.unit_code {
            if many {
                writeln!(out, "{}:", path.display())?;
            }
            for word in words {
                writeln!(out, "{word:08x}")?;
            }
        }
        Ok(())
    }

    /// Writes the static image as 8-hex-digit words, one per line.
    pub fn dump_static(&self, out: &mut dyn Write) -> std::io::Result<()> {
        for (start, bytes) in &self.image.blobs {
            for chunk_start in (0..bytes.len()).step_by(4) {
                let mut word = [0u8; 4];
                for (i, slot) in word.iter_mut().enumerate() {
                    *slot = bytes.get(chunk_start + i).copied().unwrap_or(0);
                }
                let _ = start;
                writeln!(out, "{:08x}", u32::from_le_bytes(word))?;
            }
        }
        Ok(())
    }
}

/// Links the units in input order against the entry symbol in `settings`.
pub fn link(mut units: Vec<TranslationUnit>, settings: &Settings) -> Result<LinkedProgram, BuildError> {
    let mut diags: Vec<Diagnostic> = Vec::new();
    let mut state = State::new(settings);
    let mut blobs: Vec<(u32, Vec<u8>)> = Vec::new();

    // rodata first, word-aligned between units
    let mut cursor = STATIC_BEGIN;
    let rodata_begin = cursor;
    for unit in &mut units {
        unit.set_rodata_start(cursor);
        if !unit.rodata.is_empty() {
            blobs.push((cursor, unit.rodata.clone()));
            cursor = align_to_word(cursor + unit.rodata.len() as u32);
        }
    }
    let rodata = if cursor != rodata_begin {
        let range = (rodata_begin, cursor);
        // one-word gap so the first writable byte never shares a word
        cursor += 4;
        Some(range)
    } else {
        None
    };

    // then bss
    for unit in &mut units {
        unit.set_bss_start(cursor);
        if !unit.bss.is_empty() {
            blobs.push((cursor, unit.bss.clone()));
            cursor = align_to_word(cursor + unit.bss.len() as u32);
        }
    }

    // then data; the heap begins where data ends
    for unit in &mut units {
        unit.set_data_start(cursor);
        if !unit.data.is_empty() {
            blobs.push((cursor, unit.data.clone()));
            cursor = align_to_word(cursor + unit.data.len() as u32);
        }
    }
    let heap_start = cursor;

    // text starts after the two bootstrap slots
    let mut text_cursor = TEXT_BEGIN + 2 * INST_LENGTH;
    for unit in &mut units {
        unit.set_text_start(text_cursor);
        text_cursor += unit.text_size();
    }
    let text_end = text_cursor;
    if text_end > TEXT_CEILING + 1 {
        diags.push(Diagnostic::error("program too large for the text segment (> ~256MiB)"));
    }

    // local tables become absolute, exports merge into the global table
    let mut globals = GlobalSymbolTable::default();
    for unit in &mut units {
        unit.relocate_symbols();
    }
    for unit in &units {
        for (name, dbg) in &unit.globals {
            let Some(sym) = unit.symbols.get(name) else { continue };
            let global = GlobalSymbol {
                address: sym.address,
                segment: sym.segment,
                unit: unit.path.clone(),
            };
            if !globals.add(name, global) {
                diags.push(
                    Diagnostic::error(format!("duplicate global symbol: {name}")).at(
                        dbg.file.clone(),
                        dbg.line,
                        dbg.source.clone(),
                    ),
                );
            }
        }
    }

    // the entry symbol must be a text label
    let entry_ok = match globals.get(&settings.start) {
        Some(sym) if sym.segment == Segment::Text => true,
        Some(_) => {
            diags.push(Diagnostic::error(format!(
                "entry symbol '{}' is not in the text segment",
                settings.start
            )));
            false
        }
        None => {
            diags.push(Diagnostic::error(format!(
                "no global entry symbol '{}' defined",
                settings.start
            )));
            false
        }
    };

    let mut statements = HashMap::new();
    let mut unit_code = Vec::new();

    if entry_ok {
        // bootstrap far call into the entry symbol
        let boot_debug = DebugInfo::new("", 0, format!("call {}", settings.start));
        let bootstrap = [
            Statement::with_reloc(
                Instruction::Auipc { rd: 6, imm: 0 },
                Relocation::new(RelocKind::PcrelHi20, settings.start.clone()),
                boot_debug.clone(),
            ),
            Statement::with_reloc(
                Instruction::Jalr { rd: 1, rs1: 6, imm: 0 },
                Relocation::new(RelocKind::PcrelLo12, settings.start.clone()),
                boot_debug,
            ),
        ];
        let resolve_globals = |name: &str| globals.get(name).map(|s| s.address);
        let mut address = TEXT_BEGIN;
        for stmt in &bootstrap {
            match stmt.build(address, &resolve_globals) {
                Ok((inst, code)) => {
                    state.memory.store_image_word(address, code);
                    statements.insert(address, BuiltStatement { inst, code, debug: stmt.debug.clone() });
                }
                Err(d) => diags.push(d),
            }
            address += INST_LENGTH;
        }

        // build every unit's statements at their final addresses
        for unit in &units {
            let resolve = |name: &str| {
                unit.symbols.get(name).map(|s| s.address).or_else(|| resolve_globals(name))
            };
            let mut words = Vec::with_capacity(unit.statements.len());
            let mut address = unit.text_start();
            for stmt in &unit.statements {
                match stmt.build(address, &resolve) {
                    Ok((inst, code)) => {
                        state.memory.store_image_word(address, code);
                        statements.insert(address, BuiltStatement { inst, code, debug: stmt.debug.clone() });
                        words.push(code);
                    }
                    Err(d) => diags.push(d),
                }
                address += INST_LENGTH;
            }
            unit_code.push((unit.path.clone(), words));
        }
    }

    if diags.iter().any(|d| d.severity == Severity::Error) {
        return Err(BuildError::Diagnostics(diags));
    }

    // place the static image and fix the layout
    for (start, bytes) in &blobs {
        for (i, b) in bytes.iter().enumerate() {
            state.memory.store_image_byte(start + i as u32, *b);
        }
    }
    state.memory.set_layout(text_end, rodata, heap_start);
    state.xregs.restore(GP, heap_start);

    log::debug!(
        "linked {} unit(s): text 0x{:08x}..0x{:08x}, heap at 0x{heap_start:08x}",
        units.len(),
        TEXT_BEGIN,
        text_end
    );

    let mut text: Vec<(u32, u32)> =
        statements.iter().map(|(addr, stmt)| (*addr, stmt.code)).collect();
    text.sort_unstable_by_key(|(addr, _)| *addr);
    let program = LinkedProgram {
        statements,
        unit_code,
        globals,
        image: Image { text, blobs, text_end, rodata, heap_start },
        state,
    };

    // dumps are best-effort: failures warn, the link still succeeds
    if let Some(path) = &settings.code_dump {
        if let Err(e) = write_dump(path, |w| program.dump_code(w)) {
            log::warn!("could not write code dump '{}': {e}", path.display());
        }
    }
    if let Some(path) = &settings.data_dump {
        if let Err(e) = write_dump(path, |w| program.dump_static(w)) {
            log::warn!("could not write data dump '{}': {e}", path.display());
        }
    }

    Ok(program)
}

fn write_dump(
    path: &std::path::Path,
    emit: impl FnOnce(&mut dyn Write) -> std::io::Result<()>,
) -> std::io::Result<()> {
    let file = std::fs::File::create(path)?;
    let mut writer = BufWriter::new(file);
    emit(&mut writer)?;
    writer.flush()
}
