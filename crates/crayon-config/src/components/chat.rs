//! Chat backend configuration

use serde::{Deserialize, Serialize};

/// Default chat service base URL (apps are addressed as `{base}/{app_id}/chat`)
pub const DEFAULT_CHAT_BASE_URL: &str = "http://localhost:3000/api/apps";

/// Default request timeout for chat turns, in seconds
pub const DEFAULT_CHAT_TIMEOUT_SECS: u64 = 120;

/// Chat backend configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Base URL of the chat service
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Model to request (omitted from the query string when unset)
    #[serde(default)]
    pub model: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: Option<u64>,
}

fn default_base_url() -> String {
    DEFAULT_CHAT_BASE_URL.to_string()
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: None,
            timeout_secs: None,
        }
    }
}

impl ChatConfig {
    /// Get the timeout in seconds, using the default if not specified
    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs.unwrap_or(DEFAULT_CHAT_TIMEOUT_SECS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_use_defaults() {
        let config: ChatConfig = toml::from_str(r#"model = "gpt-4o""#).unwrap();
        assert_eq!(config.base_url, DEFAULT_CHAT_BASE_URL);
        assert_eq!(config.model.as_deref(), Some("gpt-4o"));
        assert_eq!(config.timeout_secs(), DEFAULT_CHAT_TIMEOUT_SECS);
    }

    #[test]
    fn test_explicit_timeout() {
        let config: ChatConfig = toml::from_str("timeout_secs = 5").unwrap();
        assert_eq!(config.timeout_secs(), 5);
    }
}
