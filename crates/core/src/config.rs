//! Watch configuration
//!
//! Loaded from an optional TOML file; every key has a default so an empty
//! file (or no file at all) yields a working configuration.
//!
//! ```toml
//! delay_ms = 50
//! spam_threshold_secs = 60
//! follow_symlinks = true
//! verbose = false
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default quiet period before a window is flushed
pub const DEFAULT_DELAY_MS: u64 = 50;

/// Default length of continuous activity before a spam warning
pub const DEFAULT_SPAM_THRESHOLD_SECS: u64 = 60;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Settings shared by the debouncer and the watch tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WatchConfig {
    /// Quiet period in milliseconds required before buffered events flush
    pub delay_ms: u64,

    /// Seconds of uninterrupted activity before a single spam warning is logged
    pub spam_threshold_secs: u64,

    /// Install nested watches for symlinked directories
    pub follow_symlinks: bool,

    /// Emit log records for registration changes
    pub verbose: bool,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            delay_ms: DEFAULT_DELAY_MS,
            spam_threshold_secs: DEFAULT_SPAM_THRESHOLD_SECS,
            follow_symlinks: true,
            verbose: false,
        }
    }
}

impl WatchConfig {
    /// Parse a configuration from TOML text
    pub fn from_toml(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text, path)
    }

    /// Load `path` if it exists, otherwise fall back to defaults
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Reject values the debouncer cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.delay_ms == 0 {
            return Err(ConfigError::Invalid {
                key: "delay_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.spam_threshold_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "spam_threshold_secs",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn spam_threshold(&self) -> Duration {
        Duration::from_secs(self.spam_threshold_secs)
    }
}
