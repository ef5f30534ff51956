//! Delivery seam between the debouncer and whatever transports records

use crate::event::Record;
use parking_lot::Mutex;
use std::sync::Arc;

/// Consumer of the normalized record stream
///
/// `deliver` is called in stream order, never concurrently with itself for
/// records of the same stream. Implementations should not block for long;
/// transports that do I/O usually hand records to a channel.
pub trait Sink: Send + Sync + 'static {
    fn deliver(&self, record: Record);
}

/// Adapter turning a closure into a [`Sink`]
pub struct FnSink<F>(pub F);

impl<F> Sink for FnSink<F>
where
    F: Fn(Record) + Send + Sync + 'static,
{
    fn deliver(&self, record: Record) {
        (self.0)(record)
    }
}

impl<S: Sink + ?Sized> Sink for Arc<S> {
    fn deliver(&self, record: Record) {
        (**self).deliver(record)
    }
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn deliver(&self, record: Record) {
        (**self).deliver(record)
    }
}

/// Sink that keeps every record in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<Record>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything delivered so far
    pub fn records(&self) -> Vec<Record> {
        self.records.lock().clone()
    }

    /// Remove and return everything delivered so far
    pub fn take(&self) -> Vec<Record> {
        std::mem::take(&mut *self.records.lock())
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl Sink for MemorySink {
    fn deliver(&self, record: Record) {
        self.records.lock().push(record);
    }
}
