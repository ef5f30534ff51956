//! Error taxonomy for the watch tree and its backends

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while installing or running watches
///
/// Only [`WatchError::PathNotFound`], [`WatchError::NotADirectory`],
/// [`WatchError::Inaccessible`], [`WatchError::NoRuntime`] and an `Install`
/// failure on the root are fatal.
/// Everything else is reported through the error channel while the
/// remaining watches keep running.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("path not found: {}", .0.display())]
    PathNotFound(PathBuf),

    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("cannot access {}: {source}", path.display())]
    Inaccessible {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to install watch on {}: {source}", path.display())]
    Install {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    #[error("watch on {} failed: {source}", path.display())]
    Backend {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    #[error("watch on {} dropped events, a rescan is needed", path.display())]
    Overflow { path: PathBuf },

    #[error("failed to scan {}: {source}", path.display())]
    Scan {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("watcher must be started from within a tokio runtime")]
    NoRuntime,
}

impl WatchError {
    /// True for errors that prevent the watcher from starting at all
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            WatchError::PathNotFound(_)
                | WatchError::NotADirectory(_)
                | WatchError::Inaccessible { .. }
                | WatchError::NoRuntime
        )
    }
}
