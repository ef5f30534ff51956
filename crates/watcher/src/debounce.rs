//! Window debouncing
//!
//! Raw events are buffered until the tree has been quiet for a full delay,
//! then the whole window is normalized and delivered in one batch. A single
//! timer task is ever in flight per window: when it fires and sees a newer
//! event than the one it was scheduled for, it sleeps for another delay
//! instead of being cancelled and replaced.

use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::time::Instant;
use tracing::{debug, warn};
use treewatch_core::{normalize, RawEvent, Record, Sink, WatchConfig};

/// Continuous-activity tracking for the spam warning
struct SpamTracker {
    window_start: Instant,
    warned: bool,
}

struct WindowState {
    buffer: Vec<RawEvent>,
    last_event: Instant,
    /// Token of the live timer task, if one is scheduled
    flush_token: Option<u64>,
    next_token: u64,
    spam: SpamTracker,
}

struct DebounceInner {
    root: PathBuf,
    delay: Duration,
    spam_threshold: Duration,
    sink: Arc<dyn Sink>,
    runtime: Handle,
    state: Mutex<WindowState>,
    /// Held while delivering, taken before `state` is released so batches keep their order
    emit: Mutex<()>,
}

/// Buffers raw events and delivers normalized batches after a quiet period
///
/// Cheap to clone; clones share one window. `push` may be called from any
/// thread. Sinks must not call back into the debouncer.
#[derive(Clone)]
pub struct Debouncer {
    inner: Arc<DebounceInner>,
}

impl Debouncer {
    /// Create a debouncer for the tree at `root`, spawning timers on `runtime`
    pub fn new(
        root: impl Into<PathBuf>,
        config: &WatchConfig,
        sink: Arc<dyn Sink>,
        runtime: Handle,
    ) -> Self {
        let now = Instant::now();
        Self {
            inner: Arc::new(DebounceInner {
                root: root.into(),
                delay: config.delay(),
                spam_threshold: config.spam_threshold(),
                sink,
                runtime,
                state: Mutex::new(WindowState {
                    buffer: Vec::new(),
                    last_event: now,
                    flush_token: None,
                    next_token: 0,
                    spam: SpamTracker {
                        window_start: now,
                        warned: false,
                    },
                }),
                emit: Mutex::new(()),
            }),
        }
    }

    /// Number of raw events waiting for the window to close
    pub fn pending(&self) -> usize {
        self.inner.state.lock().buffer.len()
    }

    /// Buffer one raw event, scheduling a flush if none is pending
    pub fn push(&self, event: RawEvent) {
        let now = Instant::now();
        let mut state = self.inner.state.lock();

        if state.buffer.is_empty() {
            state.spam = SpamTracker {
                window_start: now,
                warned: false,
            };
        }

        let mut warning = None;
        if !state.spam.warned
            && now.duration_since(state.spam.window_start) >= self.inner.spam_threshold
        {
            state.spam.warned = true;
            let message = format!(
                "Sustained activity for over {}s without a quiet period ({} events buffered, latest {})",
                self.inner.spam_threshold.as_secs(),
                state.buffer.len(),
                event.path().display()
            );
            warn!("{}", message);
            warning = Some(message);
        }

        state.buffer.push(event);
        state.last_event = now;

        if state.flush_token.is_none() {
            let token = state.next_token;
            state.next_token += 1;
            state.flush_token = Some(token);
            self.inner
                .runtime
                .spawn(self.clone().flush_after_quiet(token, now));
        }

        if let Some(message) = warning {
            let _emit = self.inner.emit.lock();
            drop(state);
            self.inner.sink.deliver(Record::Log(message));
        }
    }

    /// Deliver a diagnostic between batches
    pub fn log(&self, message: impl Into<String>) {
        let _emit = self.inner.emit.lock();
        self.inner.sink.deliver(Record::Log(message.into()));
    }

    /// Flush whatever is buffered right now, without waiting for quiet
    ///
    /// A timer still in flight for this window becomes a no-op.
    pub fn flush_now(&self) {
        let mut state = self.inner.state.lock();
        state.flush_token = None;
        let batch = std::mem::take(&mut state.buffer);
        self.deliver(batch, state);
    }

    /// Timer task: sleep, then flush if nothing arrived since `snapshot`
    async fn flush_after_quiet(self, token: u64, mut snapshot: Instant) {
        loop {
            tokio::time::sleep(self.inner.delay).await;

            let mut state = self.inner.state.lock();
            if state.flush_token != Some(token) {
                // Window already flushed by hand
                return;
            }

            if state.last_event != snapshot {
                // Newer arrivals: wait another full delay from now
                snapshot = state.last_event;
                continue;
            }

            state.flush_token = None;
            let batch = std::mem::take(&mut state.buffer);
            self.deliver(batch, state);
            return;
        }
    }

    /// Normalize `batch` and hand it to the sink outside the state lock
    fn deliver(&self, batch: Vec<RawEvent>, state: parking_lot::MutexGuard<'_, WindowState>) {
        if batch.is_empty() {
            return;
        }

        let _emit = self.inner.emit.lock();
        drop(state);

        let records = normalize(&self.inner.root, &batch);
        debug!("Flushing {} raw events as {} records", batch.len(), records.len());
        for event in records {
            self.inner.sink.deliver(Record::Event(event));
        }
    }
}
