//! Core configuration.
//!
//! # Responsibility
//! - Describe everything the composition root needs: store location, logging
//!   and the zoom → clustering threshold policy.
//! - Load configuration from JSON with defaults for every missing field.
//!
//! # Invariants
//! - A relative `db_path` loaded from a file resolves against that file's
//!   directory.
//! - `validate()` runs on every load path.

use crate::cluster::ThresholdPolicy;
use crate::logging::default_log_level;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Configuration error for load/validation paths.
#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse(serde_json::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config json: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

/// Runtime configuration for [`crate::runtime::CoreRuntime`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// SQLite file. In-memory database when `None`.
    pub db_path: Option<PathBuf>,
    /// One of `trace|debug|info|warn|error`.
    pub log_level: String,
    /// Absolute directory for rolling log files. Logging stays off when `None`.
    pub log_dir: Option<PathBuf>,
    pub clustering: ThresholdPolicy,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            log_level: default_log_level().to_string(),
            log_dir: None,
            clustering: ThresholdPolicy::default(),
        }
    }
}

impl CoreConfig {
    /// Parses and validates JSON config text.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_json_str(&text)?;
        if let (Some(db_path), Some(base)) = (config.db_path.as_mut(), path.parent()) {
            if db_path.is_relative() {
                *db_path = base.join(&*db_path);
            }
        }
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.clustering.validate().map_err(ConfigError::Invalid)?;
        if let Some(log_dir) = &self.log_dir {
            if !log_dir.is_absolute() {
                return Err(ConfigError::Invalid(format!(
                    "log_dir must be an absolute path, got `{}`",
                    log_dir.display()
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, CoreConfig};

    #[test]
    fn empty_object_yields_defaults() {
        let config = CoreConfig::from_json_str("{}").unwrap();
        assert_eq!(config, CoreConfig::default());
        assert_eq!(config.clustering.max_clustering_zoom, 14.0);
    }

    #[test]
    fn partial_clustering_section_keeps_other_defaults() {
        let config =
            CoreConfig::from_json_str(r#"{"clustering":{"double_per_zoom_level":false}}"#)
                .unwrap();
        assert!(!config.clustering.double_per_zoom_level);
        assert_eq!(config.clustering.base_threshold_degrees, 0.02);
    }

    #[test]
    fn rejects_relative_log_dir_and_negative_threshold() {
        let err = CoreConfig::from_json_str(r#"{"log_dir":"logs"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = CoreConfig::from_json_str(r#"{"clustering":{"base_threshold_degrees":-1}}"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn load_resolves_relative_db_path_against_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("harupin.json");
        std::fs::write(&path, r#"{"db_path":"notes.db"}"#).unwrap();

        let config = CoreConfig::load(&path).unwrap();
        assert_eq!(config.db_path, Some(dir.path().join("notes.db")));
    }
}
