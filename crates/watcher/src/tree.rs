//! Recursive, symlink-aware watch tree
//!
//! Native recursive watches do not descend through symbolic links, so every
//! symlinked directory reachable from the root gets a watch of its own. The
//! tree keeps exactly one registration per path:
//! - the root, installed at start and held until [`WatchTree::stop`]
//! - one per symlinked directory, found by the startup scan or by a later
//!   `Created` event
//!
//! A `Deleted` event releases the registration at that path together with
//! every registration beneath it, including installs still in progress.
//! Handles are always created and dropped outside the registry lock.

use crate::error::WatchError;
use crate::platform::{SignalCallback, WatchBackend, WatchHandle, WatchSignal};
use ahash::{AHashMap, AHashSet};
use parking_lot::Mutex;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};
use treewatch_core::{EventKind, RawEvent};
use walkdir::WalkDir;

/// Receives everything the tree observes
///
/// Called from backend threads, possibly concurrently.
pub trait TreeListener: Send + Sync + 'static {
    /// Raw event from any registered watch, after registrations were updated
    fn on_event(&self, event: RawEvent);

    /// Non-fatal failure from a watch, an install or a scan
    fn on_error(&self, error: WatchError);

    /// A nested watch was installed
    fn on_registered(&self, _path: &Path) {}

    /// A nested watch was released because its directory went away
    fn on_released(&self, _path: &Path) {}
}

/// Make `root` absolute and canonical, checking it is an existing directory
pub fn resolve_root(root: &Path) -> Result<PathBuf, WatchError> {
    let resolved = std::fs::canonicalize(root).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => WatchError::PathNotFound(root.to_path_buf()),
        _ => WatchError::Inaccessible {
            path: root.to_path_buf(),
            source,
        },
    })?;
    if !resolved.is_dir() {
        return Err(WatchError::NotADirectory(resolved));
    }
    Ok(resolved)
}

/// True if `path` itself is a symbolic link whose target is a directory
fn is_symlinked_dir(path: &Path) -> bool {
    let is_link = std::fs::symlink_metadata(path)
        .map(|meta| meta.file_type().is_symlink())
        .unwrap_or(false);
    is_link && path.is_dir()
}

/// Registration table
#[derive(Default)]
struct Registry {
    handles: AHashMap<PathBuf, Box<dyn WatchHandle>>,
    /// Paths whose native watch is being installed right now
    pending: AHashSet<PathBuf>,
    stopped: bool,
}

struct TreeInner {
    root: PathBuf,
    follow_symlinks: bool,
    backend: Arc<dyn WatchBackend>,
    listener: Arc<dyn TreeListener>,
    registry: Mutex<Registry>,
    /// Handed to backend callbacks so a live watch never keeps the tree alive
    self_ref: Weak<TreeInner>,
}

/// Set of native watches covering one directory tree
#[derive(Clone)]
pub struct WatchTree {
    inner: Arc<TreeInner>,
}

impl WatchTree {
    /// Install the root watch and every nested symlink watch under it
    ///
    /// Fails if the root is missing or its watch cannot be installed.
    /// Nested install or scan failures go to `listener` instead.
    pub fn start(
        root: &Path,
        backend: Arc<dyn WatchBackend>,
        follow_symlinks: bool,
        listener: Arc<dyn TreeListener>,
    ) -> Result<Self, WatchError> {
        let root = resolve_root(root)?;

        let inner = Arc::new_cyclic(|self_ref| TreeInner {
            root: root.clone(),
            follow_symlinks,
            backend,
            listener,
            registry: Mutex::new(Registry::default()),
            self_ref: self_ref.clone(),
        });

        let handle = inner.backend.install(&root, inner.signal_callback())?;
        inner.registry.lock().handles.insert(root.clone(), handle);
        info!("Watching {}", root.display());

        if follow_symlinks {
            inner.scan(&root, &mut AHashSet::new());
        }

        Ok(Self { inner })
    }

    /// Canonical root of the tree
    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    /// Registered paths (root included), sorted
    pub fn registrations(&self) -> Vec<PathBuf> {
        let mut paths: Vec<_> = self.inner.registry.lock().handles.keys().cloned().collect();
        paths.sort();
        paths
    }

    pub fn is_registered(&self, path: &Path) -> bool {
        self.inner.registry.lock().handles.contains_key(path)
    }

    /// Release every watch; later calls are no-ops
    pub fn stop(&self) {
        let released: Vec<_> = {
            let mut registry = self.inner.registry.lock();
            if registry.stopped {
                return;
            }
            registry.stopped = true;
            registry.pending.clear();
            registry.handles.drain().collect()
        };

        let count = released.len();
        drop(released);
        info!("Stopped watching {} ({} watches released)", self.inner.root.display(), count);
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.registry.lock().stopped
    }
}

impl TreeInner {
    fn signal_callback(&self) -> SignalCallback {
        let tree = self.self_ref.clone();
        Arc::new(move |signal| {
            if let Some(tree) = tree.upgrade() {
                tree.handle_signal(signal);
            }
        })
    }

    fn handle_signal(&self, signal: WatchSignal) {
        match signal {
            WatchSignal::Event(event) => {
                self.intercept(&event);
                self.listener.on_event(event);
            }
            WatchSignal::Error(error) => {
                warn!("{}", error);
                self.listener.on_error(error);
            }
        }
    }

    /// Keep registrations in step with the tree before the event moves on
    fn intercept(&self, event: &RawEvent) {
        match event {
            RawEvent::Change { kind: EventKind::Created, path } => self.on_created(path),
            RawEvent::Change { kind: EventKind::Deleted, path } => self.release_under(path),
            RawEvent::Change { kind: EventKind::Changed, .. } => {}
            RawEvent::Rename { from, to } => {
                self.release_under(from);
                self.on_created(to);
            }
        }
    }

    fn on_created(&self, path: &Path) {
        if !self.follow_symlinks || !path.starts_with(&self.root) {
            return;
        }

        let mut chain = AHashSet::new();
        if is_symlinked_dir(path) {
            self.register_and_scan(path, &mut chain);
        } else if path.is_dir() {
            // A directory moved in may already hold symlinks
            self.scan(path, &mut chain);
        }
    }

    /// Register a symlinked directory and everything symlinked beneath it
    ///
    /// `chain` holds the canonical targets of the links currently being
    /// descended; meeting one of them again is a cycle and stops the descent.
    fn register_and_scan(&self, link: &Path, chain: &mut AHashSet<PathBuf>) {
        let Ok(target) = std::fs::canonicalize(link) else {
            debug!("Dangling symlink {}", link.display());
            return;
        };
        if chain.contains(&target) {
            debug!("Symlink cycle at {}, not descending", link.display());
            return;
        }

        if !self.register(link) {
            return;
        }

        chain.insert(target.clone());
        self.scan(link, chain);
        chain.remove(&target);
    }

    /// Walk `dir` without following links and register each symlinked directory
    fn scan(&self, dir: &Path, chain: &mut AHashSet<PathBuf>) {
        for entry in WalkDir::new(dir).min_depth(1).follow_links(false) {
            match entry {
                Ok(entry) => {
                    if entry.path_is_symlink() && entry.path().is_dir() {
                        self.register_and_scan(entry.path(), chain);
                    }
                }
                Err(source) => {
                    let path = source.path().unwrap_or(dir).to_path_buf();
                    let error = WatchError::Scan { path, source };
                    warn!("{}", error);
                    self.listener.on_error(error);
                }
            }
        }
    }

    /// Install a watch on `path` unless it is registered or being installed
    ///
    /// The path is marked pending for the duration of the install. A delete
    /// or stop in the meantime clears the mark, and the new handle is then
    /// dropped instead of registered. Returns true if the watch was kept.
    fn register(&self, path: &Path) -> bool {
        {
            let mut registry = self.registry.lock();
            if registry.stopped
                || registry.handles.contains_key(path)
                || registry.pending.contains(path)
            {
                return false;
            }
            registry.pending.insert(path.to_path_buf());
        }

        let handle = match self.backend.install(path, self.signal_callback()) {
            Ok(handle) => handle,
            Err(error) => {
                self.registry.lock().pending.remove(path);
                warn!("{}", error);
                self.listener.on_error(error);
                return false;
            }
        };

        let stale = {
            let mut registry = self.registry.lock();
            if registry.pending.remove(path) && !registry.stopped {
                registry.handles.insert(path.to_path_buf(), handle);
                None
            } else {
                Some(handle)
            }
        };

        if let Some(handle) = stale {
            debug!("{} went away while its watch was installed", handle.path().display());
            return false;
        }

        debug!("Registered nested watch {}", path.display());
        self.listener.on_registered(path);
        true
    }

    /// Release the registration at `path` and every one beneath it
    ///
    /// The root registration only goes away on stop.
    fn release_under(&self, path: &Path) {
        let released: Vec<(PathBuf, Box<dyn WatchHandle>)> = {
            let mut registry = self.registry.lock();
            registry.pending.retain(|pending| !pending.starts_with(path));
            let doomed: Vec<PathBuf> = registry
                .handles
                .keys()
                .filter(|key| key.starts_with(path) && **key != self.root)
                .cloned()
                .collect();
            doomed
                .into_iter()
                .filter_map(|key| registry.handles.remove_entry(&key))
                .collect()
        };

        for (path, handle) in released {
            debug!("Releasing nested watch {}", handle.path().display());
            drop(handle);
            self.listener.on_released(&path);
        }
    }
}
