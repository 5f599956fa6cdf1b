//! Validation service configuration
//!
//! Controls where component code is sent for type checking and how the
//! two validation steps are paced for display.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Validation service configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Validator endpoint (POST `{componentCode}`)
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Pause after the validator answers, before the first step resolves
    #[serde(default = "default_first_step_delay_ms")]
    pub first_step_delay_ms: u64,
    /// Pause while the second step shows as loading
    #[serde(default = "default_step_delay_ms")]
    pub step_delay_ms: u64,
    /// Pause between the last success and the completion callback
    #[serde(default = "default_completion_delay_ms")]
    pub completion_delay_ms: u64,
}

fn default_endpoint() -> String {
    "http://localhost:3000/api/valid".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_first_step_delay_ms() -> u64 {
    1000
}

fn default_step_delay_ms() -> u64 {
    500
}

fn default_completion_delay_ms() -> u64 {
    1000
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_secs: default_timeout_secs(),
            first_step_delay_ms: default_first_step_delay_ms(),
            step_delay_ms: default_step_delay_ms(),
            completion_delay_ms: default_completion_delay_ms(),
        }
    }
}

impl ValidationConfig {
    /// Request timeout as a [`Duration`]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// First-step pacing delay as a [`Duration`]
    pub fn first_step_delay(&self) -> Duration {
        Duration::from_millis(self.first_step_delay_ms)
    }

    /// Second-step pacing delay as a [`Duration`]
    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.step_delay_ms)
    }

    /// Completion pacing delay as a [`Duration`]
    pub fn completion_delay(&self) -> Duration {
        Duration::from_millis(self.completion_delay_ms)
    }
}
