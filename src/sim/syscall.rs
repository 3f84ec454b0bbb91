//! `ecall` dispatch. The selector lives in `a7`; arguments in `a0..a2`
//! and `fa0`. Unknown selectors warn and fall through so a stray call
//! does not kill the run.

use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::errors::SimulationFault;
use crate::riscv::exec::SyscallHandler;
use crate::riscv::registers::{A0, A1, A2, A7, FA0};
use crate::riscv::state::State;
use crate::sim::console::Console;

/// Open files beyond the three console descriptors.
#[derive(Default)]
pub struct FileTable {
    files: Vec<Option<File>>,
}

impl FileTable {
    const FIRST_FD: i32 = 3;

    fn open(&mut self, path: &str, flags: u32) -> i32 {
        let result = match flags {
            0 => OpenOptions::new().read(true).open(path),
            1 => OpenOptions::new().write(true).create(true).truncate(true).open(path),
            9 => OpenOptions::new().append(true).create(true).open(path),
            _ => return -1,
        };
        match result {
            Ok(file) => {
                for (i, slot) in self.files.iter_mut().enumerate() {
                    if slot.is_none() {
                        *slot = Some(file);
                        return Self::FIRST_FD + i as i32;
                    }
                }
                self.files.push(Some(file));
                Self::FIRST_FD + self.files.len() as i32 - 1
            }
            Err(_) => -1,
        }
    }

    fn get(&mut self, fd: i32) -> Option<&mut File> {
        let index = usize::try_from(fd - Self::FIRST_FD).ok()?;
        self.files.get_mut(index)?.as_mut()
    }

    fn close(&mut self, fd: i32) -> i32 {
        let Ok(index) = usize::try_from(fd - Self::FIRST_FD) else {
            return -1;
        };
        match self.files.get_mut(index) {
            Some(slot) if slot.is_some() => {
                *slot = None;
                0
            }
            _ => -1,
        }
    }
}

/// Everything the ecall executor needs from the outside world.
pub struct Environment {
    pub console: Box<dyn Console>,
    files: FileTable,
}

impl Environment {
    pub fn new(console: Box<dyn Console>) -> Self {
        Environment { console, files: FileTable::default() }
    }
}

impl SyscallHandler for Environment {
    fn ecall(&mut self, state: &mut State) -> Result<(), SimulationFault> {
        let code = state.xregs.read(A7);
        match code {
            // print-int
            1 => self.console.print(&(state.xregs.read(A0) as i32).to_string()),
            // print-float
            2 => self.console.print(&state.fregs.read(FA0).to_string()),
            // print-string, NUL-terminated at [a0]
            4 => {
                let address = state.xregs.read(A0);
                let text = read_cstring(state, address);
                self.console.print(&text);
            }
            // read-int
            5 => {
                let value = self
                    .console
                    .read_line()
                    .ok()
                    .and_then(|l| crate::utils::parse_imm32(l.trim()));
                match value {
                    Some(v) => state.xregs.write(A0, v as u32),
                    None => {
                        log::warn!("read-int: invalid input, returning 0");
                        state.xregs.write(A0, 0);
                    }
                }
            }
            // read-float
            6 => {
                let value =
                    self.console.read_line().ok().and_then(|l| l.trim().parse::<f32>().ok());
                match value {
                    Some(v) => state.fregs.write(FA0, v),
                    None => {
                        log::warn!("read-float: invalid input, returning 0");
                        state.fregs.write(FA0, 0.0);
                    }
                }
            }
            // read-string into [a0], at most a1 bytes including the NUL
            8 => {
                let buffer = state.xregs.read(A0);
                let max = state.xregs.read(A1);
                let line = self.console.read_line().unwrap_or_default();
                let line = line.trim_end_matches('\n');
                let take = (line.len() as u32).min(max.saturating_sub(1));
                for (i, b) in line.bytes().take(take as usize).enumerate() {
                    state.memory.priv_store_byte(buffer + i as u32, b as u32);
                }
                if max > 0 {
                    state.memory.priv_store_byte(buffer + take, 0);
                }
            }
            // sbrk
            9 => {
                let bytes = state.xregs.read(A0) as i32;
                let pointer = state.memory.allocate_from_heap(bytes);
                state.xregs.write(A0, pointer as u32);
            }
            // exit
            10 => return Err(SimulationFault::Halt(0)),
            // print-char
            11 => {
                let c = (state.xregs.read(A0) & 0xff) as u8 as char;
                self.console.print(&c.to_string());
            }
            // read-char
            12 => {
                let c = self
                    .console
                    .read_line()
                    .ok()
                    .and_then(|l| l.bytes().next())
                    .unwrap_or(0);
                state.xregs.write(A0, c as u32);
            }
            // open(path, flags)
            13 => {
                let address = state.xregs.read(A0);
                let path = read_cstring(state, address);
                let flags = state.xregs.read(A1);
                let fd = self.files.open(&path, flags);
                state.xregs.write(A0, fd as u32);
            }
            // read(fd, buffer, count)
            14 => {
                let fd = state.xregs.read(A0) as i32;
                let buffer = state.xregs.read(A1);
                let count = state.xregs.read(A2) as usize;
                let result = if fd == 0 {
                    let line = self.console.read_line().unwrap_or_default();
                    let bytes = &line.as_bytes()[..line.len().min(count)];
                    for (i, b) in bytes.iter().enumerate() {
                        state.memory.priv_store_byte(buffer + i as u32, *b as u32);
                    }
                    bytes.len() as i32
                } else {
                    match self.files.get(fd) {
                        Some(file) => {
                            let mut data = vec![0u8; count];
                            match file.read(&mut data) {
                                Ok(n) => {
                                    for (i, b) in data[..n].iter().enumerate() {
                                        state.memory.priv_store_byte(buffer + i as u32, *b as u32);
                                    }
                                    n as i32
                                }
                                Err(_) => -1,
                            }
                        }
                        None => -1,
                    }
                };
                state.xregs.write(A0, result as u32);
            }
            // write(fd, buffer, count)
            15 => {
                let fd = state.xregs.read(A0) as i32;
                let buffer = state.xregs.read(A1);
                let count = state.xregs.read(A2) as usize;
                let mut data = Vec::with_capacity(count);
                for i in 0..count {
                    data.push(state.memory.priv_load_byte_unsigned(buffer + i as u32) as u8);
                }
                let result = match fd {
                    1 | 2 => {
                        self.console.print(&String::from_utf8_lossy(&data));
                        count as i32
                    }
                    _ => match self.files.get(fd) {
                        Some(file) => match file.write_all(&data) {
                            Ok(()) => count as i32,
                            Err(_) => -1,
                        },
                        None => -1,
                    },
                };
                state.xregs.write(A0, result as u32);
            }
            // close(fd)
            16 => {
                let fd = state.xregs.read(A0) as i32;
                let result = self.files.close(fd);
                state.xregs.write(A0, result as u32);
            }
            // exit with code
            17 => return Err(SimulationFault::Halt(state.xregs.read(A0) as i32)),
            // milliseconds since the epoch, split low/high
            30 => {
                let ms = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_millis() as u64)
                    .unwrap_or(0);
                state.xregs.write(A0, ms as u32);
                state.xregs.write(A1, (ms >> 32) as u32);
            }
            // print-hex-int
            34 => self.console.print(&format!("0x{:08x}", state.xregs.read(A0))),
            // print-bin-int
            35 => self.console.print(&format!("0b{:032b}", state.xregs.read(A0))),
            // print-uns-int
            36 => self.console.print(&state.xregs.read(A0).to_string()),
            other => log::warn!("unknown syscall code {other}"),
        }
        Ok(())
    }
}

/// Walks memory from `address` to the NUL, through the cache-visible path.
fn read_cstring(state: &mut State, address: u32) -> String {
    let mut bytes = Vec::new();
    let mut addr = address;
    loop {
        let b = state.memory.priv_load_byte_unsigned(addr) as u8;
        if b == 0 {
            break;
        }
        bytes.push(b);
        addr = addr.wrapping_add(1);
    }
    String::from_utf8_lossy(&bytes).into_owned()
}
