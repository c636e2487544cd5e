//! Runtime settings
//!
//! Settings come from `blockflow.toml` (working directory first, then the
//! platform config directory) with `BLOCKFLOW_*` environment overrides on top.
//! Per-block engine configuration is not here: it travels with each
//! invocation as JSON.

use crate::script::ScriptLimits;
use crate::stop_error::DEFAULT_LOG_FILE;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

pub mod loader;

pub use loader::ConfigLoader;

pub const CONFIG_FILE_NAME: &str = "blockflow.toml";

pub const ENV_LOG_LEVEL: &str = "BLOCKFLOW_LOG_LEVEL";
pub const ENV_MAX_OPERATIONS: &str = "BLOCKFLOW_MAX_OPERATIONS";
pub const ENV_ERROR_LOG: &str = "BLOCKFLOW_ERROR_LOG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Filter directive used when no `-v` flag is given
    pub log_level: String,
    pub script: ScriptLimits,
    pub stop_error: StopErrorSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            script: ScriptLimits::default(),
            stop_error: StopErrorSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StopErrorSettings {
    /// Log file for blocks that enable file logging without naming a path
    pub default_log_file: PathBuf,
}

impl Default for StopErrorSettings {
    fn default() -> Self {
        Self {
            default_log_file: PathBuf::from(DEFAULT_LOG_FILE),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value for {variable}: {value:?}")]
    InvalidOverride { variable: &'static str, value: String },
}

impl Config {
    pub fn from_toml(content: &str, path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.into(),
            source,
        })
    }

    /// Apply `BLOCKFLOW_*` overrides from the process environment
    pub fn merge_env_vars(&mut self) -> Result<(), ConfigError> {
        self.merge_env_with(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable lookup
    pub fn merge_env_with<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(level) = lookup(ENV_LOG_LEVEL).filter(|v| !v.is_empty()) {
            self.log_level = level;
        }

        if let Some(raw) = lookup(ENV_MAX_OPERATIONS) {
            self.script.max_operations =
                raw.trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidOverride {
                        variable: ENV_MAX_OPERATIONS,
                        value: raw.clone(),
                    })?;
        }

        if let Some(path) = lookup(ENV_ERROR_LOG).filter(|v| !v.is_empty()) {
            self.stop_error.default_log_file = PathBuf::from(path);
        }

        Ok(())
    }
}
