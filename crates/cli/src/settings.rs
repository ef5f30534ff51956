//! Resolve the effective watch configuration
//!
//! Precedence, lowest first: built-in defaults, the config file, flags.

use crate::args::Args;
use anyhow::{Context, Result};
use std::path::PathBuf;
use treewatch_core::WatchConfig;

/// Default config location: `<config dir>/treewatch/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("treewatch").join("config.toml"))
}

/// Build the configuration for `args`
///
/// An explicit `--config` must exist; the default file is optional.
pub fn resolve(args: &Args) -> Result<WatchConfig> {
    resolve_with_default(args, default_config_path())
}

pub(crate) fn resolve_with_default(args: &Args, default_path: Option<PathBuf>) -> Result<WatchConfig> {
    let mut config = match (&args.config, default_path) {
        (Some(path), _) => WatchConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        (None, Some(path)) => WatchConfig::load_or_default(&path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        (None, None) => WatchConfig::default(),
    };

    if args.verbose {
        config.verbose = true;
    }
    if let Some(delay_ms) = args.delay_ms {
        config.delay_ms = delay_ms;
    }
    if args.no_follow_symlinks {
        config.follow_symlinks = false;
    }

    config.validate().context("Invalid configuration value")?;
    Ok(config)
}
