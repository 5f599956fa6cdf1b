//! Script sandbox configuration

use serde::{Deserialize, Serialize};

/// Limits applied to every script run by the sandbox
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptingConfig {
    /// Maximum heap the interpreter may allocate, in bytes
    #[serde(default = "default_memory_limit")]
    pub memory_limit_bytes: usize,
    /// Maximum VM instructions per script run
    #[serde(default = "default_instruction_limit")]
    pub instruction_limit: u32,
}

fn default_memory_limit() -> usize {
    8 * 1024 * 1024
}

fn default_instruction_limit() -> u32 {
    1_000_000
}

impl Default for ScriptingConfig {
    fn default() -> Self {
        Self {
            memory_limit_bytes: default_memory_limit(),
            instruction_limit: default_instruction_limit(),
        }
    }
}
