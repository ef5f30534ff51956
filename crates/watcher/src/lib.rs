//! File system watching for treewatch
//!
//! This crate connects the pieces between a native watch and a record sink:
//! - Pluggable raw event backends (notify, or driven by hand)
//! - A watch tree that follows symlinked directories
//! - Quiet-period debouncing with per-window normalization
//!
//! [`TreeWatcher`] wires all three together for one root directory.

pub mod debounce;
pub mod error;
pub mod platform;
pub mod tree;

pub use debounce::Debouncer;
pub use error::WatchError;
pub use platform::{ManualBackend, NotifyBackend, WatchBackend, WatchHandle, WatchSignal};
pub use tree::{resolve_root, TreeListener, WatchTree};

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::info;
use treewatch_core::{RawEvent, Sink, WatchConfig};

/// Routes tree output into the debouncer
struct Pipeline {
    debouncer: Debouncer,
    verbose: bool,
}

impl TreeListener for Pipeline {
    fn on_event(&self, event: RawEvent) {
        self.debouncer.push(event);
    }

    fn on_error(&self, error: WatchError) {
        self.debouncer.log(error.to_string());
    }

    fn on_registered(&self, path: &Path) {
        if self.verbose {
            self.debouncer
                .log(format!("Watching symlinked directory {}", path.display()));
        }
    }

    fn on_released(&self, path: &Path) {
        if self.verbose {
            self.debouncer
                .log(format!("Released watch on {}", path.display()));
        }
    }
}

/// Debounced, symlink-aware watch over one directory tree
///
/// Must be started inside a tokio runtime; flush timers run on it. Dropping
/// the watcher stops it.
pub struct TreeWatcher {
    tree: WatchTree,
    debouncer: Debouncer,
}

impl TreeWatcher {
    /// Watch `root` with the platform's native backend
    pub fn start(root: &Path, config: &WatchConfig, sink: Arc<dyn Sink>) -> Result<Self, WatchError> {
        Self::start_with_backend(root, config, sink, Arc::new(NotifyBackend::new()))
    }

    /// Watch `root` with a caller-supplied backend
    pub fn start_with_backend(
        root: &Path,
        config: &WatchConfig,
        sink: Arc<dyn Sink>,
        backend: Arc<dyn WatchBackend>,
    ) -> Result<Self, WatchError> {
        let runtime = Handle::try_current().map_err(|_| WatchError::NoRuntime)?;
        let root = resolve_root(root)?;

        let debouncer = Debouncer::new(root.clone(), config, sink, runtime);
        let pipeline = Arc::new(Pipeline {
            debouncer: debouncer.clone(),
            verbose: config.verbose,
        });
        let tree = WatchTree::start(&root, backend, config.follow_symlinks, pipeline)?;

        info!(
            "Started watcher on {} (delay {}ms, {} watches)",
            root.display(),
            config.delay_ms,
            tree.registrations().len()
        );

        Ok(Self { tree, debouncer })
    }

    /// Canonical root being watched
    pub fn root(&self) -> &Path {
        self.tree.root()
    }

    /// Paths holding a native watch, root included
    pub fn registrations(&self) -> Vec<PathBuf> {
        self.tree.registrations()
    }

    /// Release every watch and deliver whatever is still buffered
    ///
    /// Idempotent.
    pub fn stop(&self) {
        if self.tree.is_stopped() {
            return;
        }
        self.tree.stop();
        self.debouncer.flush_now();
    }
}

impl Drop for TreeWatcher {
    fn drop(&mut self) {
        self.tree.stop();
    }
}
