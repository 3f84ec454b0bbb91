//! The architectural state a linked program owns: both register files and
//! main memory (which carries the cache).

use crate::riscv::memory::Memory;
use crate::riscv::registers::{FRegisterFile, XRegisterFile};
use crate::settings::Settings;

#[derive(Debug)]
pub struct State {
    pub xregs: XRegisterFile,
    pub fregs: FRegisterFile,
    pub memory: Memory,
}

impl State {
    pub fn new(settings: &Settings) -> Self {
        State {
            xregs: XRegisterFile::new(),
            fregs: FRegisterFile::new(),
            memory: Memory::new(settings),
        }
    }
}
