//! Core types for treewatch
//!
//! This crate provides the pure half of the watcher:
//! - Raw and normalized event types
//! - The per-window normalization algorithm
//! - Watch configuration
//! - The sink trait records are delivered through

pub mod config;
pub mod event;
pub mod normalize;
pub mod sink;

// Re-export main types for convenience
pub use config::{ConfigError, WatchConfig};
pub use event::{EventKind, NormalizedEvent, RawEvent, Record};
pub use normalize::normalize;
pub use sink::{FnSink, MemorySink, Sink};
