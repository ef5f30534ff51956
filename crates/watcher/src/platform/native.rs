//! Native backend built on `notify`'s recommended watcher

use super::{SignalCallback, WatchBackend, WatchHandle, WatchSignal};
use crate::error::WatchError;
use notify::event::{EventKind as NotifyKind, ModifyKind, RenameMode};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use tracing::trace;
use treewatch_core::RawEvent;

/// Backend using the platform's recommended notification API
/// (inotify, FSEvents, ReadDirectoryChangesW)
#[derive(Debug, Default, Clone, Copy)]
pub struct NotifyBackend;

impl NotifyBackend {
    pub fn new() -> Self {
        Self
    }
}

impl WatchBackend for NotifyBackend {
    fn install(
        &self,
        path: &Path,
        on_signal: SignalCallback,
    ) -> Result<Box<dyn WatchHandle>, WatchError> {
        let watch_path = path.to_path_buf();
        let handler = move |res: notify::Result<notify::Event>| match res {
            Ok(event) => {
                if event.need_rescan() {
                    on_signal(WatchSignal::Error(WatchError::Overflow {
                        path: watch_path.clone(),
                    }));
                }
                for raw in translate(event) {
                    on_signal(WatchSignal::Event(raw));
                }
            }
            Err(source) => on_signal(WatchSignal::Error(WatchError::Backend {
                path: watch_path.clone(),
                source,
            })),
        };

        let install_err = |source| WatchError::Install {
            path: path.to_path_buf(),
            source,
        };
        let mut watcher = notify::recommended_watcher(handler).map_err(install_err)?;
        watcher
            .watch(path, RecursiveMode::Recursive)
            .map_err(install_err)?;

        Ok(Box::new(NotifyHandle {
            path: path.to_path_buf(),
            _watcher: watcher,
        }))
    }
}

/// Owns the notify watcher; the watch ends when this drops
struct NotifyHandle {
    path: PathBuf,
    _watcher: RecommendedWatcher,
}

impl WatchHandle for NotifyHandle {
    fn path(&self) -> &Path {
        &self.path
    }
}

/// Map a notify event onto raw events
///
/// Access notifications carry no change and are dropped.
pub(crate) fn translate(event: notify::Event) -> Vec<RawEvent> {
    trace!("notify event: {:?}", event);
    let notify::Event { kind, mut paths, .. } = event;

    match kind {
        NotifyKind::Access(_) => Vec::new(),
        NotifyKind::Create(_) => paths.into_iter().map(RawEvent::created).collect(),
        NotifyKind::Remove(_) => paths.into_iter().map(RawEvent::deleted).collect(),
        NotifyKind::Modify(ModifyKind::Name(RenameMode::Both)) if paths.len() == 2 => {
            let to = paths.pop().unwrap_or_default();
            let from = paths.pop().unwrap_or_default();
            vec![RawEvent::rename(from, to)]
        }
        NotifyKind::Modify(ModifyKind::Name(RenameMode::From)) => {
            paths.into_iter().map(RawEvent::deleted).collect()
        }
        NotifyKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            paths.into_iter().map(RawEvent::created).collect()
        }
        // Backends that cannot tell the two sides apart (FSEvents) report
        // each side on its own; whether the path still exists decides which
        NotifyKind::Modify(ModifyKind::Name(_)) => paths
            .into_iter()
            .map(|path| {
                if path.symlink_metadata().is_ok() {
                    RawEvent::created(path)
                } else {
                    RawEvent::deleted(path)
                }
            })
            .collect(),
        NotifyKind::Modify(_) | NotifyKind::Any | NotifyKind::Other => {
            paths.into_iter().map(RawEvent::changed).collect()
        }
    }
}
