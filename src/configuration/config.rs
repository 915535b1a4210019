use super::types::*;
use crate::error_handling::types::ConfigError;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Application configuration structure that defines all runtime parameters.
///
/// The configuration is read from a TOML file whose path is given on the
/// command line. Every section except `storage` and `keywords` has defaults
/// matching the monitor's capture policy.
///
/// # Examples
///
/// ```
/// use keepwatch::configuration::config::Config;
///
/// let config = Config::from_toml_str(r#"
///     keywords = ["bad"]
///
///     [storage]
///     backend = "file"
///     path = "/tmp/keepwatch"
/// "#).unwrap();
/// assert_eq!(config.capture.max_frames, 2000);
/// ```
///
/// # Fields Overview
///
/// - `keywords`: the objectionable keyword set; a frame matches when any of
///   them appears verbatim in its rendered text
/// - `ignored_sites`: frames mentioning any of these are never inspected
/// - `capture`: live capture settings (interface, snapshot length, timeout, frame budget)
/// - `schedule`: whether sessions repeat and how long to pause between them
/// - `storage`: where findings are persisted
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Config {
    pub keywords: Vec<String>,
    #[serde(default)]
    pub ignored_sites: Vec<String>,
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    pub storage: StorageConfig,
}

impl Config {
    /// Reads, parses and validates the configuration file at `path`.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&contents)?;
        info!(
            "Configuration loaded from {} ({} keyword(s))",
            path.display(),
            config.keywords.len()
        );
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Config =
            toml::from_str(contents).map_err(|e| ConfigError::TomlError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges and paths.
    ///
    /// An empty keyword list is accepted: sessions then simply never match.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capture.snapshot_len <= 0 {
            return Err(ConfigError::InvalidValue(format!(
                "capture.snapshot_len must be positive, got {}",
                self.capture.snapshot_len
            )));
        }
        if self.capture.read_timeout_ms <= 0 {
            return Err(ConfigError::InvalidValue(format!(
                "capture.read_timeout_ms must be positive, got {}",
                self.capture.read_timeout_ms
            )));
        }
        if self.capture.max_frames == 0 {
            return Err(ConfigError::InvalidValue(
                "capture.max_frames must be at least 1".to_string(),
            ));
        }
        if self.keywords.iter().any(|k| k.is_empty()) {
            return Err(ConfigError::InvalidValue(
                "keywords must not contain an empty string".to_string(),
            ));
        }
        if self.ignored_sites.iter().any(|s| s.is_empty()) {
            return Err(ConfigError::InvalidValue(
                "ignored_sites must not contain an empty string".to_string(),
            ));
        }
        if self.keywords.is_empty() {
            warn!("No keywords configured, no traffic will ever be reported");
        }

        if self.storage.backend == StorageBackend::Database {
            if let Some(parent) = self.storage.path.parent() {
                if !parent.as_os_str().is_empty() && !parent.is_dir() {
                    return Err(ConfigError::DirectoryDoesNotExist(format!(
                        "database directory {} does not exist",
                        parent.display()
                    )));
                }
            }
        }

        Ok(())
    }
}
