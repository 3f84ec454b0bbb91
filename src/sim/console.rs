//! Console seam between syscalls and the host. Headless runs use the
//! process stdio; tests capture everything in memory.

use std::collections::VecDeque;
use std::io::{BufRead, Write};
use std::sync::{Arc, Mutex};

pub trait Console: Send {
    fn print(&mut self, text: &str);
    fn read_line(&mut self) -> std::io::Result<String>;
}

/// Process stdin/stdout console.
pub struct StdConsole;

impl Console for StdConsole {
    fn print(&mut self, text: &str) {
        let mut out = std::io::stdout().lock();
        let _ = out.write_all(text.as_bytes());
        let _ = out.flush();
    }

    fn read_line(&mut self) -> std::io::Result<String> {
        let mut line = String::new();
        std::io::stdin().lock().read_line(&mut line)?;
        Ok(line)
    }
}

/// In-memory console: queued input lines, output shared with the test
/// through a handle taken before the console is boxed.
pub struct BufferConsole {
    output: Arc<Mutex<String>>,
    input: VecDeque<String>,
}

impl BufferConsole {
    pub fn new() -> Self {
        BufferConsole { output: Arc::new(Mutex::new(String::new())), input: VecDeque::new() }
    }

    pub fn with_input(lines: &[&str]) -> Self {
        let mut console = Self::new();
        for line in lines {
            console.input.push_back(line.to_string());
        }
        console
    }

    pub fn output_handle(&self) -> Arc<Mutex<String>> {
        Arc::clone(&self.output)
    }
}

impl Default for BufferConsole {
    fn default() -> Self {
        Self::new()
    }
}

impl Console for BufferConsole {
    fn print(&mut self, text: &str) {
        let mut out = match self.output.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        out.push_str(text);
    }

    fn read_line(&mut self) -> std::io::Result<String> {
        self.input.pop_front().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "no queued console input")
        })
    }
}
