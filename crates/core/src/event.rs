//! Event types flowing from the raw watch source to the sink

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Kind of a filesystem change
///
/// The discriminants are the wire codes emitted to consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum EventKind {
    /// Contents or metadata of an existing entry changed
    Changed = 0,
    /// Entry appeared
    Created = 1,
    /// Entry disappeared
    Deleted = 2,
}

impl EventKind {
    /// Wire code for this kind
    pub const fn code(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventKind::Changed => "changed",
            EventKind::Created => "created",
            EventKind::Deleted => "deleted",
        };
        f.write_str(name)
    }
}

/// Event as reported by a native watch, before debouncing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawEvent {
    /// Single-path change
    Change { kind: EventKind, path: PathBuf },
    /// Move of an entry from `from` to `to`
    Rename { from: PathBuf, to: PathBuf },
}

impl RawEvent {
    pub fn changed(path: impl Into<PathBuf>) -> Self {
        RawEvent::Change { kind: EventKind::Changed, path: path.into() }
    }

    pub fn created(path: impl Into<PathBuf>) -> Self {
        RawEvent::Change { kind: EventKind::Created, path: path.into() }
    }

    pub fn deleted(path: impl Into<PathBuf>) -> Self {
        RawEvent::Change { kind: EventKind::Deleted, path: path.into() }
    }

    pub fn rename(from: impl Into<PathBuf>, to: impl Into<PathBuf>) -> Self {
        RawEvent::Rename { from: from.into(), to: to.into() }
    }

    /// Path used when describing this event in diagnostics
    ///
    /// For renames this is the destination.
    pub fn path(&self) -> &Path {
        match self {
            RawEvent::Change { path, .. } => path,
            RawEvent::Rename { to, .. } => to,
        }
    }
}

/// Debounced, deduplicated change ready for delivery
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalizedEvent {
    pub kind: EventKind,
    pub path: PathBuf,
}

impl NormalizedEvent {
    pub fn new(kind: EventKind, path: impl Into<PathBuf>) -> Self {
        Self { kind, path: path.into() }
    }
}

/// Unit delivered to a [`Sink`](crate::Sink)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    /// A normalized filesystem change
    Event(NormalizedEvent),
    /// A diagnostic message interleaved with the event stream
    Log(String),
}

impl Record {
    /// Wire code of the log record kind
    pub const LOG_CODE: u8 = 3;

    pub fn log(message: impl Into<String>) -> Self {
        Record::Log(message.into())
    }

    /// Wire code for this record
    pub fn code(&self) -> u8 {
        match self {
            Record::Event(event) => event.kind.code(),
            Record::Log(_) => Self::LOG_CODE,
        }
    }
}

impl From<NormalizedEvent> for Record {
    fn from(event: NormalizedEvent) -> Self {
        Record::Event(event)
    }
}
