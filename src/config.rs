//! Trev Configuration
//!
//! Settings for the `trev` CLI, read from a YAML file (`trev.yaml` by default).
//!
//! ## Priority Order (highest to lowest)
//!
//! 1. Environment variables (`TREV_TRACE_DIR`, `TREV_LOG`)
//! 2. Config file
//! 3. Defaults

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrevError};

/// Default config file name, looked up in the working directory
pub const CONFIG_FILE: &str = "trev.yaml";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TrevConfig {
    /// Directory holding `.ndjson` trace files
    pub trace_dir: PathBuf,

    /// `tracing` filter directive (e.g. `warn`, `trev=debug`)
    pub log_filter: String,

    /// Rows shown per facet table
    pub facet_limit: usize,
}

impl Default for TrevConfig {
    fn default() -> Self {
        Self {
            trace_dir: PathBuf::from(".trev/traces"),
            log_filter: "warn".to_string(),
            facet_limit: 10,
        }
    }
}

impl TrevConfig {
    /// Load configuration from file
    ///
    /// Returns default config if file doesn't exist.
    /// Returns error if file exists but is malformed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| TrevError::ConfigError {
            reason: format!("Failed to read {}: {}", path.display(), e),
        })?;

        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        // An empty file parses as null, not as an empty mapping
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(|e| TrevError::ConfigError {
            reason: format!("Failed to parse config: {}", e),
        })
    }

    /// Save configuration to file, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| TrevError::ConfigError {
                reason: format!("Failed to create config directory: {}", e),
            })?;
        }

        let content = serde_yaml::to_string(self).map_err(|e| TrevError::ConfigError {
            reason: format!("Failed to serialize config: {}", e),
        })?;

        fs::write(path, content).map_err(|e| TrevError::ConfigError {
            reason: format!("Failed to write config file: {}", e),
        })
    }

    /// Merge with environment variables
    ///
    /// Environment variables take precedence over config file values.
    pub fn with_env(self) -> Self {
        self.with_env_from(|name| std::env::var(name).ok())
    }

    fn with_env_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("TREV_TRACE_DIR").filter(|v| !v.is_empty()) {
            self.trace_dir = PathBuf::from(dir);
        }
        if let Some(filter) = lookup("TREV_LOG").filter(|v| !v.is_empty()) {
            self.log_filter = filter;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = TrevConfig::load(&temp_dir.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(config, TrevConfig::default());
        assert_eq!(config.facet_limit, 10);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = TrevConfig::from_yaml("facet_limit: 3\n").unwrap();
        assert_eq!(config.facet_limit, 3);
        assert_eq!(config.log_filter, "warn");
        assert_eq!(config.trace_dir, PathBuf::from(".trev/traces"));
    }

    #[test]
    fn empty_file_yields_defaults() {
        assert_eq!(TrevConfig::from_yaml("  \n").unwrap(), TrevConfig::default());
    }

    #[test]
    fn malformed_file_is_config_error() {
        let err = TrevConfig::from_yaml("facet_limit: [oops").unwrap_err();
        assert!(matches!(err, TrevError::ConfigError { .. }));
    }

    #[test]
    fn save_then_load_round_trips() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join(CONFIG_FILE);
        let config = TrevConfig {
            trace_dir: PathBuf::from("/tmp/traces"),
            log_filter: "trev=debug".to_string(),
            facet_limit: 25,
        };
        config.save(&path).unwrap();
        assert_eq!(TrevConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn env_overrides_file_values() {
        let env: HashMap<&str, &str> = [("TREV_TRACE_DIR", "/var/trev"), ("TREV_LOG", "")]
            .into_iter()
            .collect();
        let config = TrevConfig::default().with_env_from(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.trace_dir, PathBuf::from("/var/trev"));
        // Empty values are ignored
        assert_eq!(config.log_filter, "warn");
    }
}
