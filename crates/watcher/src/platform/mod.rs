//! Raw event sources
//!
//! A [`WatchBackend`] installs one recursive watch per directory and reports
//! what it sees through a [`SignalCallback`]. The watch stays alive as long
//! as its [`WatchHandle`] does; dropping the handle releases the native
//! resources before `drop` returns.

pub mod manual;
pub mod native;

pub use manual::ManualBackend;
pub use native::NotifyBackend;

use crate::error::WatchError;
use std::path::Path;
use std::sync::Arc;
use treewatch_core::RawEvent;

/// What a running watch reports
#[derive(Debug)]
pub enum WatchSignal {
    Event(RawEvent),
    Error(WatchError),
}

/// Callback invoked by a backend, possibly from its own thread
pub type SignalCallback = Arc<dyn Fn(WatchSignal) + Send + Sync>;

/// Source of raw filesystem events
pub trait WatchBackend: Send + Sync + 'static {
    /// Start a recursive watch on `path`
    fn install(
        &self,
        path: &Path,
        on_signal: SignalCallback,
    ) -> Result<Box<dyn WatchHandle>, WatchError>;
}

/// Live native watch; dropping it stops the watch
pub trait WatchHandle: Send {
    /// Directory this handle watches
    fn path(&self) -> &Path;
}
