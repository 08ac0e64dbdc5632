//! File-based engine configuration.
//!
//! The configuration is a small TOML document:
//!
//! ```toml
//! [optimizer]
//! general = true
//! specific = true
//! trace = false
//!
//! [data]
//! dir = "samples"
//!
//! [logging]
//! level = "warn"
//! ```
//!
//! Every section and key is optional. A missing file yields the defaults.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::query::optimizer::OptimizerConfig;

/// Log level used when neither the file nor the command line names one.
pub const DEFAULT_LOG_LEVEL: &str = "warn";

/// Loaded configuration plus the path it came from.
#[derive(Debug, Default)]
pub struct EngineConfig {
    path: Option<PathBuf>,
    data: RawConfig,
}

impl EngineConfig {
    /// Loads `explicit`, or the default location when `None`.
    pub fn load(explicit: Option<PathBuf>) -> Result<Self, ConfigError> {
        let path = explicit.or_else(default_config_path);
        let data = match path.as_ref() {
            Some(config_path) if config_path.exists() => read_file(config_path)?,
            _ => RawConfig::default(),
        };
        Ok(Self { path, data })
    }

    /// Parses configuration text that did not come from a file.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let data = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: PathBuf::from("<inline>"),
            source,
        })?;
        Ok(Self { path: None, data })
    }

    /// Path the configuration was (or would be) read from.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Rule selection and tracing for the optimizer.
    pub fn optimizer(&self) -> OptimizerConfig {
        let section = &self.data.optimizer;
        OptimizerConfig {
            general: section.general.unwrap_or(true),
            specific: section.specific.unwrap_or(true),
            trace: section.trace.unwrap_or(false),
        }
    }

    /// Directory whose relation files are preloaded, if any.
    pub fn data_dir(&self) -> Option<&Path> {
        self.data.data.dir.as_deref()
    }

    /// Configured log filter.
    pub fn log_level(&self) -> &str {
        self.data
            .logging
            .level
            .as_deref()
            .unwrap_or(DEFAULT_LOG_LEVEL)
    }

    /// Writes the configuration back to its path, creating parent directories.
    pub fn persist(&self) -> Result<PathBuf, ConfigError> {
        let target = match &self.path {
            Some(path) => path.clone(),
            None => default_config_path().ok_or(ConfigError::NoConfigPath)?,
        };
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let serialized = toml::to_string_pretty(&self.data)
            .map_err(|source| ConfigError::Serialize { source })?;
        fs::write(&target, serialized).map_err(|source| ConfigError::Write {
            path: target.clone(),
            source,
        })?;
        Ok(target)
    }
}

fn read_file(path: &Path) -> Result<RawConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    optimizer: OptimizerSection,
    #[serde(default)]
    data: DataSection,
    #[serde(default)]
    logging: LoggingSection,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct OptimizerSection {
    general: Option<bool>,
    specific: Option<bool>,
    trace: Option<bool>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct DataSection {
    dir: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct LoggingSection {
    level: Option<String>,
}

/// Failures while reading or writing the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("failed to read config {path}: {source}")]
    Read {
        /// Offending file.
        path: PathBuf,
        /// Underlying I/O failure.
        source: std::io::Error,
    },
    /// The file is not valid TOML or has unknown keys.
    #[error("failed to parse config {path}: {source}")]
    Parse {
        /// Offending file.
        path: PathBuf,
        /// Underlying TOML failure.
        source: toml::de::Error,
    },
    /// Serializing the configuration failed.
    #[error("failed to serialize config: {source}")]
    Serialize {
        /// Underlying TOML failure.
        source: toml::ser::Error,
    },
    /// Writing the file failed.
    #[error("failed to write config {path}: {source}")]
    Write {
        /// Target file.
        path: PathBuf,
        /// Underlying I/O failure.
        source: std::io::Error,
    },
    /// Creating the parent directory failed.
    #[error("failed to create config directory {path}: {source}")]
    CreateDir {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying I/O failure.
        source: std::io::Error,
    },
    /// No explicit path and no platform config directory.
    #[error("no config directory found; pass --config or set RELALG_CONFIG")]
    NoConfigPath,
}

/// `<config_dir>/relalg/config.toml`, when the platform has a config directory.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|base| base.join("relalg").join("config.toml"))
}
