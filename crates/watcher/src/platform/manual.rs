//! Backend driven by hand
//!
//! Nothing is observed on disk: callers inject events and errors for a
//! watched path themselves. Used to embed the watch tree behind a custom
//! event source (and heavily in tests).

use super::{SignalCallback, WatchBackend, WatchHandle, WatchSignal};
use crate::error::WatchError;
use ahash::{AHashMap, AHashSet};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use treewatch_core::RawEvent;

#[derive(Default)]
struct ManualState {
    /// Live watches by path
    watches: AHashMap<PathBuf, SignalCallback>,
    /// Paths whose install should fail
    refused: AHashSet<PathBuf>,
}

/// Backend whose watches only report what they are told to
#[derive(Clone, Default)]
pub struct ManualBackend {
    state: Arc<Mutex<ManualState>>,
}

impl ManualBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make future installs on `path` fail
    pub fn refuse(&self, path: impl Into<PathBuf>) {
        self.state.lock().refused.insert(path.into());
    }

    /// Whether a live watch exists on `path`
    pub fn is_watching(&self, path: &Path) -> bool {
        self.state.lock().watches.contains_key(path)
    }

    /// Paths with a live watch, sorted
    pub fn watched(&self) -> Vec<PathBuf> {
        let mut paths: Vec<_> = self.state.lock().watches.keys().cloned().collect();
        paths.sort();
        paths
    }

    /// Deliver `event` as if the watch on `watch` had observed it
    ///
    /// Returns false when no watch is live on that path.
    pub fn emit(&self, watch: &Path, event: RawEvent) -> bool {
        self.signal(watch, WatchSignal::Event(event))
    }

    /// Report `error` from the watch on `watch`
    pub fn fail(&self, watch: &Path, error: WatchError) -> bool {
        self.signal(watch, WatchSignal::Error(error))
    }

    fn signal(&self, watch: &Path, signal: WatchSignal) -> bool {
        // Callback runs unlocked: it may install or drop watches
        let callback = self.state.lock().watches.get(watch).cloned();
        match callback {
            Some(callback) => {
                callback(signal);
                true
            }
            None => false,
        }
    }
}

impl WatchBackend for ManualBackend {
    fn install(
        &self,
        path: &Path,
        on_signal: SignalCallback,
    ) -> Result<Box<dyn WatchHandle>, WatchError> {
        let mut state = self.state.lock();
        if state.refused.contains(path) {
            return Err(WatchError::Install {
                path: path.to_path_buf(),
                source: notify::Error::generic("install refused"),
            });
        }
        state.watches.insert(path.to_path_buf(), on_signal);

        Ok(Box::new(ManualHandle {
            path: path.to_path_buf(),
            state: self.state.clone(),
        }))
    }
}

struct ManualHandle {
    path: PathBuf,
    state: Arc<Mutex<ManualState>>,
}

impl WatchHandle for ManualHandle {
    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ManualHandle {
    fn drop(&mut self) {
        // Callback dropped after unlocking
        let callback = self.state.lock().watches.remove(&self.path);
        drop(callback);
    }
}
