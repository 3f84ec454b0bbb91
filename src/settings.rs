//! Caller-owned configuration. Nothing here is process-global: the host
//! builds a `Settings`, hands it to the pipeline and simulator, and may
//! load overrides from a TOML file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::riscv::cache::ReplacePolicy;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Bare machine mode: pseudo-instructions rejected.
    pub bare: bool,
    /// Extrict mode: assembler warnings are considered errors.
    pub extrict: bool,
    /// Self-modifying code: text becomes writable, misaligned access allowed.
    pub self_modifying: bool,
    /// Extra per-step trace output.
    pub debug: bool,
    /// Entry symbol the linker targets with the bootstrap far call.
    pub start: String,
    /// Maximum number of back-steppable entries.
    pub history_size: usize,
    /// Cache geometry and policy.
    pub cache_block_size: usize,
    pub cache_num_blocks: usize,
    pub cache_associativity: usize,
    pub cache_policy: ReplacePolicy,
    /// Write the linked machine code here after a successful link.
    pub code_dump: Option<PathBuf>,
    /// Write the linked static data here after a successful link.
    pub data_dump: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            bare: false,
            extrict: true,
            self_modifying: false,
            debug: false,
            start: "__start".to_string(),
            history_size: 2000,
            cache_block_size: 4,
            cache_num_blocks: 4,
            cache_associativity: 1,
            cache_policy: ReplacePolicy::Lru,
            code_dump: None,
            data_dump: None,
        }
    }
}

impl Settings {
    /// Loads settings from a TOML file. Missing keys keep their defaults.
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))
    }
}
