//! Top-level configuration and its errors

use crate::components::{
    ChatConfig, DispatchConfig, LoggingConfig, ScriptingConfig, ValidationConfig,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("Failed to read config file {path}: {source}")]
    Io {
        /// Path that was being read
        path: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Config file could not be parsed
    #[error("Failed to parse {format} config {path}: {message}")]
    Parse {
        /// Path that was being parsed
        path: String,
        /// Detected format (toml or json)
        format: &'static str,
        /// Parser message
        message: String,
    },

    /// A field holds a value the engine cannot use
    #[error("Invalid value for {field}: {value}")]
    InvalidValue {
        /// Dotted field name
        field: String,
        /// Offending value or reason
        value: String,
    },
}

impl ConfigError {
    /// Create an invalid value error
    pub fn invalid(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.into(),
        }
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrayonConfig {
    /// Chat backend
    #[serde(default)]
    pub chat: ChatConfig,
    /// Component validation service and pacing
    #[serde(default)]
    pub validation: ValidationConfig,
    /// Action dispatch limits
    #[serde(default)]
    pub dispatch: DispatchConfig,
    /// Script sandbox limits
    #[serde(default)]
    pub scripting: ScriptingConfig,
    /// Logging
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl CrayonConfig {
    /// Check that every value is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_url("chat.base_url", &self.chat.base_url)?;
        check_url("validation.endpoint", &self.validation.endpoint)?;

        if self.validation.timeout_secs == 0 {
            return Err(ConfigError::invalid("validation.timeout_secs", "must be > 0"));
        }
        if self.dispatch.max_watcher_depth == 0 {
            return Err(ConfigError::invalid(
                "dispatch.max_watcher_depth",
                "must be > 0",
            ));
        }
        if self.scripting.memory_limit_bytes == 0 {
            return Err(ConfigError::invalid(
                "scripting.memory_limit_bytes",
                "must be > 0",
            ));
        }
        if self.scripting.instruction_limit == 0 {
            return Err(ConfigError::invalid(
                "scripting.instruction_limit",
                "must be > 0",
            ));
        }
        Ok(())
    }
}

fn check_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::invalid(field, "must not be empty"));
    }
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ConfigError::invalid(field, format!("not an http(s) URL: {value}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(CrayonConfig::default().validate().is_ok());
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config: CrayonConfig = toml::from_str("").unwrap();
        assert_eq!(config, CrayonConfig::default());
    }

    #[test]
    fn test_rejects_non_http_endpoint() {
        let mut config = CrayonConfig::default();
        config.validation.endpoint = "ftp://example.com".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("validation.endpoint"));
    }

    #[test]
    fn test_rejects_zero_watcher_depth() {
        let mut config = CrayonConfig::default();
        config.dispatch.max_watcher_depth = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field, .. }) if field == "dispatch.max_watcher_depth"
        ));
    }

    #[test]
    fn test_nested_sections() {
        let config: CrayonConfig = toml::from_str(
            r#"
            [chat]
            base_url = "https://chat.example.com/api/apps"
            model = "claude"

            [validation]
            step_delay_ms = 0

            [dispatch]
            max_watcher_depth = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.chat.model.as_deref(), Some("claude"));
        assert_eq!(config.validation.step_delay_ms, 0);
        assert_eq!(config.dispatch.max_watcher_depth, 3);
        assert_eq!(config.scripting, ScriptingConfig::default());
    }
}
