//! Configuration management for the CLI

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::output::OutputFormat;

/// API URL used when neither the flag, the environment nor the config file set one
pub const DEFAULT_API_URL: &str = "http://localhost:8080";

/// CLI configuration, read from `~/.config/monctl/config.json`
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// API endpoint URL
    pub api_url: Option<String>,
    /// Default output format (`table` or `json`)
    pub default_format: Option<String>,
}

impl Config {
    /// Load configuration from the per-user file, or defaults when it is absent
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        serde_json::from_str(&content).context("Failed to parse config file")
    }

    /// Default output format, ignoring unknown values
    pub fn format(&self) -> Option<OutputFormat> {
        self.default_format
            .as_deref()
            .and_then(|f| OutputFormat::from_str(f, true).ok())
    }

    /// Get the configuration file path
    fn config_path() -> Option<PathBuf> {
        let home = dirs_next::home_dir()?;
        Some(home.join(".config").join("monctl").join("config.json"))
    }
}

/// Flag or environment value first, then the config file, then the default
pub fn resolve_api_url(flag: Option<String>, config: &Config) -> String {
    flag.or_else(|| config.api_url.clone())
        .unwrap_or_else(|| DEFAULT_API_URL.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();

        assert!(config.api_url.is_none());
        assert!(config.format().is_none());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"api_url": "http://monitor:9000", "default_format": "JSON"}"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.api_url.as_deref(), Some("http://monitor:9000"));
        assert!(matches!(config.format(), Some(OutputFormat::Json)));
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "not json").unwrap();

        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_api_url_precedence() {
        let config = Config {
            api_url: Some("http://from-file:8080".to_string()),
            default_format: None,
        };

        assert_eq!(
            resolve_api_url(Some("http://from-flag:8080".to_string()), &config),
            "http://from-flag:8080"
        );
        assert_eq!(resolve_api_url(None, &config), "http://from-file:8080");
        assert_eq!(resolve_api_url(None, &Config::default()), DEFAULT_API_URL);
    }
}
