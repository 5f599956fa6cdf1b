//! Action dispatch configuration

use serde::{Deserialize, Serialize};

/// Action dispatch configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// How many watcher hops a single state update may trigger before the
    /// cascade is cut off
    #[serde(default = "default_max_watcher_depth")]
    pub max_watcher_depth: usize,
}

fn default_max_watcher_depth() -> usize {
    8
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_watcher_depth: default_max_watcher_depth(),
        }
    }
}
