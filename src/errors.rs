use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Severity of a collected diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// A single assembler or linker diagnostic. Both phases accumulate these
/// and report them together at the end of the phase.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub file: Option<PathBuf>,
    pub line: Option<usize>,
    pub source: Option<String>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Error,
            message: message.into(),
            file: None,
            line: None,
            source: None,
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            ..Diagnostic::error(message)
        }
    }

    pub fn at(mut self, file: impl Into<PathBuf>, line: usize, source: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self.line = Some(line);
        self.source = Some(source.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        match (&self.file, self.line) {
            (Some(file), Some(line)) => {
                write!(f, "{}:{}: {}: {}", file.display(), line + 1, tag, self.message)?
            }
            (Some(file), None) => write!(f, "{}: {}: {}", file.display(), tag, self.message)?,
            _ => write!(f, "{}: {}", tag, self.message)?,
        }
        if let Some(src) = &self.source {
            write!(f, "\n  | {}", src.trim())?;
        }
        Ok(())
    }
}

/// Failure of the assemble or link phase.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("{}", format_diagnostics(.0))]
    Diagnostics(Vec<Diagnostic>),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl BuildError {
    /// All collected diagnostics, empty for I/O failures.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            BuildError::Diagnostics(d) => d,
            BuildError::Io(_) => &[],
        }
    }
}

fn format_diagnostics(diags: &[Diagnostic]) -> String {
    diags.iter().map(|d| d.to_string()).collect::<Vec<_>>().join("\n")
}

/// Faults raised by executors and caught by the simulation driver.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationFault {
    /// `ebreak` reached, or an armed breakpoint address.
    #[error("breakpoint")]
    Breakpoint,

    /// Program requested exit with the given code.
    #[error("exit({0})")]
    Halt(i32),

    /// Access outside the permitted address space.
    #[error("invalid memory {} at 0x{addr:08x}", if *.read { "read" } else { "write" })]
    InvalidAddress { addr: u32, read: bool },

    /// Fetched word does not decode, or PC points outside the program.
    #[error("illegal instruction 0x{0:08x}")]
    IllegalInstruction(u32),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_display_includes_location() {
        let d = Diagnostic::error("unknown mnemonic: frobnicate").at("foo.s", 4, "  frobnicate x1");
        let text = d.to_string();
        assert!(text.contains("foo.s:5"));
        assert!(text.contains("unknown mnemonic"));
        assert!(text.contains("frobnicate x1"));
    }

    #[test]
    fn fault_display() {
        let f = SimulationFault::InvalidAddress { addr: 0x100, read: false };
        assert_eq!(f.to_string(), "invalid memory write at 0x00000100");
        assert_eq!(SimulationFault::Halt(2).to_string(), "exit(2)");
    }
}
