//! Command-line arguments

use crate::output::Format;
use clap::Parser;
use std::path::PathBuf;

/// treewatch - Debounced, symlink-aware change stream for a directory tree
#[derive(Parser, Debug)]
#[command(name = "treewatch")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Directory to watch recursively
    pub root: PathBuf,

    /// Report watch registrations and log at debug level
    #[arg(short, long)]
    pub verbose: bool,

    /// Quiet period in milliseconds before a batch is emitted (default: 50)
    #[arg(long)]
    pub delay_ms: Option<u64>,

    /// Config file (default: <config dir>/treewatch/config.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Output framing
    #[arg(long, value_enum, default_value_t = Format::Text)]
    pub format: Format,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Do not install watches for symlinked directories
    #[arg(long)]
    pub no_follow_symlinks: bool,
}
