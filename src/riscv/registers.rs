//! Architectural register files. `x0` is hardwired at the file, not in the
//! executors: writes to it are silently discarded.

use std::collections::HashMap;

use crate::riscv::{STACK_POINTER, TEXT_BEGIN};
use crate::sink::{ChangeEvent, RegFile, SharedSink};

pub const REG_COUNT: usize = 32;

// ABI indices used by the driver and syscalls
pub const SP: u8 = 2;
pub const GP: u8 = 3;
pub const A0: u8 = 10;
pub const A1: u8 = 11;
pub const A2: u8 = 12;
pub const A7: u8 = 17;
pub const FA0: u8 = 10;

/// The 32x32-bit integer file plus the program counter.
#[derive(Clone)]
pub struct XRegisterFile {
    regs: [u32; REG_COUNT],
    pc: u32,
    diff: HashMap<usize, u32>,
    sink: Option<SharedSink>,
}

impl std::fmt::Debug for XRegisterFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XRegisterFile")
            .field("regs", &self.regs)
            .field("pc", &self.pc)
            .field("diff", &self.diff)
            .field("sink", &self.sink.is_some())
            .finish()
    }
}

impl XRegisterFile {
    pub fn new() -> Self {
        let mut file = XRegisterFile {
            regs: [0; REG_COUNT],
            pc: TEXT_BEGIN,
            diff: HashMap::new(),
            sink: None,
        };
        file.regs[SP as usize] = STACK_POINTER;
        file
    }

    pub fn set_sink(&mut self, sink: SharedSink) {
        self.sink = Some(sink);
    }

    #[inline]
    pub fn read(&self, r: u8) -> u32 {
        self.regs[r as usize]
    }

    /// Writes a register, saving the previous value for back-step. Writes
    /// to `x0` are discarded here.
    pub fn write(&mut self, r: u8, value: u32) {
        if r == 0 {
            return;
        }
        let idx = r as usize;
        self.diff.entry(idx).or_insert(self.regs[idx]);
        self.regs[idx] = value;
        if let Some(sink) = &self.sink {
            sink.on_change(ChangeEvent::RegisterChanged { file: RegFile::Integer, index: idx, value });
        }
    }

    /// Write used by the loader and by history restore: no diff capture.
    pub fn restore(&mut self, r: u8, value: u32) {
        if r == 0 {
            return;
        }
        self.regs[r as usize] = value;
        if let Some(sink) = &self.sink {
            sink.on_change(ChangeEvent::RegisterChanged {
                file: RegFile::Integer,
                index: r as usize,
                value,
            });
        }
    }

    #[inline]
    pub fn pc(&self) -> u32 {
        self.pc
    }

    #[inline]
    pub fn set_pc(&mut self, pc: u32) {
        self.pc = pc;
    }

    #[inline]
    pub fn inc_pc(&mut self) {
        self.pc = self.pc.wrapping_add(4);
    }

    /// Drains the per-step map of previous values.
    pub fn take_diff(&mut self) -> HashMap<usize, u32> {
        std::mem::take(&mut self.diff)
    }

    /// Zeroes every register, then re-seats `sp` and the PC. `gp` is set
    /// again by the program image on reload.
    pub fn reset(&mut self) {
        self.regs = [0; REG_COUNT];
        self.regs[SP as usize] = STACK_POINTER;
        self.pc = TEXT_BEGIN;
        self.diff.clear();
    }
}

impl Default for XRegisterFile {
    fn default() -> Self {
        Self::new()
    }
}

/// The 32-slot single-precision file; values live as raw bit patterns so
/// NaN payloads survive moves.
#[derive(Clone)]
pub struct FRegisterFile {
    regs: [u32; REG_COUNT],
    diff: HashMap<usize, u32>,
    sink: Option<SharedSink>,
}

impl std::fmt::Debug for FRegisterFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FRegisterFile")
            .field("regs", &self.regs)
            .field("diff", &self.diff)
            .field("sink", &self.sink.is_some())
            .finish()
    }
}

impl FRegisterFile {
    pub fn new() -> Self {
        FRegisterFile { regs: [0; REG_COUNT], diff: HashMap::new(), sink: None }
    }

    pub fn set_sink(&mut self, sink: SharedSink) {
        self.sink = Some(sink);
    }

    #[inline]
    pub fn read_bits(&self, r: u8) -> u32 {
        self.regs[r as usize]
    }

    #[inline]
    pub fn read(&self, r: u8) -> f32 {
        f32::from_bits(self.regs[r as usize])
    }

    pub fn write_bits(&mut self, r: u8, bits: u32) {
        let idx = r as usize;
        self.diff.entry(idx).or_insert(self.regs[idx]);
        self.regs[idx] = bits;
        if let Some(sink) = &self.sink {
            sink.on_change(ChangeEvent::RegisterChanged { file: RegFile::Float, index: idx, value: bits });
        }
    }

    #[inline]
    pub fn write(&mut self, r: u8, value: f32) {
        self.write_bits(r, value.to_bits());
    }

    pub fn restore(&mut self, r: u8, bits: u32) {
        self.regs[r as usize] = bits;
        if let Some(sink) = &self.sink {
            sink.on_change(ChangeEvent::RegisterChanged {
                file: RegFile::Float,
                index: r as usize,
                value: bits,
            });
        }
    }

    pub fn take_diff(&mut self) -> HashMap<usize, u32> {
        std::mem::take(&mut self.diff)
    }

    pub fn reset(&mut self) {
        self.regs = [0; REG_COUNT];
        self.diff.clear();
    }
}

impl Default for FRegisterFile {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn x0_is_hardwired() {
        let mut file = XRegisterFile::new();
        file.write(0, 0xdead_beef);
        assert_eq!(file.read(0), 0);
        assert!(file.take_diff().is_empty());
    }

    #[test]
    fn diff_keeps_first_previous_value() {
        let mut file = XRegisterFile::new();
        file.write(5, 1);
        file.write(5, 2);
        let diff = file.take_diff();
        assert_eq!(diff.get(&5), Some(&0));
        assert!(file.take_diff().is_empty());
    }

    #[test]
    fn sp_initialized_to_stack_top() {
        let file = XRegisterFile::new();
        assert_eq!(file.read(SP), STACK_POINTER);
    }

    #[test]
    fn float_bits_round_trip() {
        let mut file = FRegisterFile::new();
        file.write(1, -0.0);
        assert_eq!(file.read_bits(1), 0x8000_0000);
        assert_eq!(file.read(1), 0.0);
    }
}
