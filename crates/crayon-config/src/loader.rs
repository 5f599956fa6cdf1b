//! Config file discovery and loading

use crate::config::{ConfigError, CrayonConfig};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Loads [`CrayonConfig`] from disk
pub struct ConfigLoader;

impl ConfigLoader {
    /// Default config location: `~/.config/crayon/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("crayon").join("config.toml"))
    }

    /// Load and validate a config file. `.json` files are parsed as JSON,
    /// everything else as TOML.
    pub async fn load_from_file(path: impl AsRef<Path>) -> Result<CrayonConfig, ConfigError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: display.clone(),
                source,
            })?;

        let config = Self::parse(&contents, path)?;
        config.validate()?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load from an explicit path, else the default path if it exists,
    /// else built-in defaults.
    pub async fn load_or_default(path: Option<&Path>) -> Result<CrayonConfig, ConfigError> {
        if let Some(path) = path {
            return Self::load_from_file(path).await;
        }

        match Self::default_path() {
            Some(default) if tokio::fs::try_exists(&default).await.unwrap_or(false) => {
                Self::load_from_file(default).await
            }
            _ => {
                debug!("No config file found, using defaults");
                Ok(CrayonConfig::default())
            }
        }
    }

    fn parse(contents: &str, path: &Path) -> Result<CrayonConfig, ConfigError> {
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        if is_json {
            serde_json::from_str(contents).map_err(|e| ConfigError::Parse {
                path: path.display().to_string(),
                format: "json",
                message: e.to_string(),
            })
        } else {
            toml::from_str(contents).map_err(|e| ConfigError::Parse {
                path: path.display().to_string(),
                format: "toml",
                message: e.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_load_toml_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("crayon.toml");
        tokio::fs::write(
            &path,
            r#"
            [validation]
            endpoint = "https://validator.example.com/api/valid"
            completion_delay_ms = 0
            "#,
        )
        .await
        .unwrap();

        let config = ConfigLoader::load_from_file(&path).await.unwrap();
        assert_eq!(
            config.validation.endpoint,
            "https://validator.example.com/api/valid"
        );
        assert_eq!(config.validation.completion_delay_ms, 0);
    }

    #[tokio::test]
    async fn test_load_json_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("crayon.json");
        tokio::fs::write(&path, r#"{"dispatch": {"max_watcher_depth": 2}}"#)
            .await
            .unwrap();

        let config = ConfigLoader::load_from_file(&path).await.unwrap();
        assert_eq!(config.dispatch.max_watcher_depth, 2);
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = ConfigLoader::load_from_file(dir.path().join("nope.toml"))
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[tokio::test]
    async fn test_parse_error_names_format() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.toml");
        tokio::fs::write(&path, "[chat\nbase_url = ").await.unwrap();

        let err = ConfigLoader::load_from_file(&path).await.unwrap_err();
        assert!(matches!(err, ConfigError::Parse { format: "toml", .. }));
    }

    #[tokio::test]
    async fn test_invalid_values_rejected_on_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("crayon.toml");
        tokio::fs::write(&path, "[chat]\nbase_url = \"\"\n").await.unwrap();

        let err = ConfigLoader::load_from_file(&path).await.unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }
}
