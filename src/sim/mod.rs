//! The fetch-decode-execute driver: stepping, running with breakpoints
//! and cooperative cancellation, back-stepping through history, reset.

pub mod console;
pub mod history;
pub mod syscall;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::errors::SimulationFault;
use crate::linker::LinkedProgram;
use crate::riscv::decoder::decode;
use crate::riscv::disasm::disasm;
use crate::riscv::exec::execute;
use crate::riscv::instruction::Instruction;
use crate::riscv::state::State;
use crate::settings::Settings;
use crate::sim::console::{Console, StdConsole};
use crate::sim::history::{History, HistoryEntry};
use crate::sim::syscall::Environment;

/// Why a `run` returned without a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stop {
    Exit(i32),
    Breakpoint(u32),
    Cancelled,
}

pub struct Simulator {
    program: LinkedProgram,
    history: History,
    breakpoints: HashMap<u32, bool>,
    env: Environment,
    settings: Settings,
    exited: Option<i32>,
    cancel: Arc<AtomicBool>,
}

impl Simulator {
    pub fn new(program: LinkedProgram, settings: &Settings) -> Self {
        Self::with_console(program, settings, Box::new(StdConsole))
    }

    pub fn with_console(
        program: LinkedProgram,
        settings: &Settings,
        console: Box<dyn Console>,
    ) -> Self {
        Simulator {
            program,
            history: History::new(settings.history_size),
            breakpoints: HashMap::new(),
            env: Environment::new(console),
            settings: settings.clone(),
            exited: None,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn state(&self) -> &State {
        self.program.state()
    }

    pub fn state_mut(&mut self) -> &mut State {
        self.program.state_mut()
    }

    pub fn program(&self) -> &LinkedProgram {
        &self.program
    }

    pub fn exited(&self) -> Option<i32> {
        self.exited
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Flag a host sets from another thread to stop a `run` between
    /// instructions.
    pub fn cancel_token(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    // ---------- breakpoints ----------

    pub fn set_breakpoint(&mut self, address: u32) {
        self.breakpoints.insert(address, true);
    }

    pub fn clear_breakpoints(&mut self) {
        self.breakpoints.clear();
    }

    pub fn breakpoints(&self) -> impl Iterator<Item = u32> + '_ {
        self.breakpoints.keys().copied()
    }

    // ---------- cache reconfiguration ----------

    /// Changing geometry mid-run would desynchronize the history backups,
    /// so reconfiguration is gated on an empty history.
    pub fn configure_cache(
        &mut self,
        block_size: usize,
        num_blocks: usize,
        associativity: usize,
        policy: crate::riscv::cache::ReplacePolicy,
    ) -> bool {
        if !self.history.is_empty() {
            return false;
        }
        self.program
            .state_mut()
            .memory
            .cache_mut()
            .configure(block_size, num_blocks, associativity, policy)
    }

    // ---------- execution ----------

    /// Executes the next instruction and commits its diff.
    pub fn step(&mut self) -> Result<(), SimulationFault> {
        if let Some(code) = self.exited {
            return Err(SimulationFault::Halt(code));
        }
        match self.step_inner() {
            Err(SimulationFault::Halt(code)) => {
                self.exited = Some(code);
                Err(SimulationFault::Halt(code))
            }
            other => other,
        }
    }

    /// Runs until exit, an armed breakpoint, a fault or cancellation.
    pub fn run(&mut self) -> Result<Stop, SimulationFault> {
        if let Some(code) = self.exited {
            return Ok(Stop::Exit(code));
        }
        loop {
            if self.cancel.load(Ordering::Relaxed) {
                self.cancel.store(false, Ordering::Relaxed);
                return Ok(Stop::Cancelled);
            }
            let pc = self.program.state().xregs.pc();
            // armed breakpoints suspend before the fetch and disarm so the
            // user can step past
            if self.breakpoints.get(&pc) == Some(&true) {
                self.breakpoints.insert(pc, false);
                return Ok(Stop::Breakpoint(pc));
            }
            match self.step_inner() {
                Ok(()) => {
                    if let Some(armed) = self.breakpoints.get_mut(&pc) {
                        *armed = true;
                    }
                }
                // ebreak arms a breakpoint at its own address; the next
                // loop iteration suspends on it
                Err(SimulationFault::Breakpoint) => {
                    self.breakpoints.insert(pc, true);
                }
                Err(SimulationFault::Halt(code)) => {
                    self.exited = Some(code);
                    return Ok(Stop::Exit(code));
                }
                Err(fault) => return Err(fault),
            }
        }
    }

    /// Pops one history entry and restores the captured values.
    pub fn backstep(&mut self) -> bool {
        let Some(entry) = self.history.pop() else {
            return false;
        };
        self.exited = None;
        let state = self.program.state_mut();
        state.xregs.set_pc(entry.pc);
        state.memory.set_heap_pointer(entry.heap);
        state.memory.restore(&entry.mem);
        for (idx, value) in entry.xregs {
            state.xregs.restore(idx as u8, value);
        }
        for (idx, value) in entry.fregs {
            state.fregs.restore(idx as u8, value);
        }
        if let Some(backup) = entry.cache {
            state.memory.cache_mut().restore(backup);
        }
        true
    }

    /// Drops all diffs, re-arms breakpoints and reloads the image.
    pub fn reset(&mut self) {
        self.history.clear();
        self.exited = None;
        for armed in self.breakpoints.values_mut() {
            *armed = true;
        }
        self.program.reset();
    }

    fn fetch(&self, pc: u32) -> Result<Instruction, SimulationFault> {
        if self.settings.self_modifying {
            let word = self.program.state().memory.peek_word(pc);
            return decode(word).map_err(|_| SimulationFault::IllegalInstruction(word));
        }
        match self.program.statement_at(pc) {
            Some(stmt) => Ok(stmt.inst),
            None => {
                Err(SimulationFault::IllegalInstruction(self.program.state().memory.peek_word(pc)))
            }
        }
    }

    fn step_inner(&mut self) -> Result<(), SimulationFault> {
        let pc = self.program.state().xregs.pc();
        let inst = self.fetch(pc)?;
        if self.settings.debug {
            log::debug!("0x{pc:08x}  {}", disasm(&inst));
        }
        let heap = self.program.state().memory.heap_pointer();

        let state = self.program.state_mut();
        let result = execute(&inst, state, &mut self.env);
        match result {
            Ok(()) => {
                let entry = HistoryEntry {
                    pc,
                    heap,
                    mem: state.memory.take_diff(),
                    xregs: state.xregs.take_diff(),
                    fregs: state.fregs.take_diff(),
                    cache: state.memory.cache_mut().take_diff(),
                };
                self.history.push(entry);
                Ok(())
            }
            Err(fault) => {
                // abandon the pending diff; the suspended instruction did
                // not commit
                state.memory.take_diff();
                state.xregs.take_diff();
                state.fregs.take_diff();
                state.memory.cache_mut().take_diff();
                Err(fault)
            }
        }
    }
}
