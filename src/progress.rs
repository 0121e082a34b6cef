//! Progress tracking for archive operations.
//!
//! One [`ProgressTracker`] exists per create/extract call. Workers and the
//! sequential writer report each completed file; the tracker updates its
//! counters and invokes the caller's callback under the same lock, so callback
//! invocations are serialized and observe a non-decreasing byte count.

use std::sync::{Mutex, MutexGuard};

/// Snapshot handed to the progress callback.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProgressState {
    pub bytes_done: u64,
    pub total_bytes: u64,
    /// Relative name of the most recently completed file, if any.
    pub current_file: Option<String>,
}

impl ProgressState {
    /// Completion in `0.0..=1.0`. An empty payload counts as complete.
    pub fn fraction(&self) -> f64 {
        if self.total_bytes == 0 {
            return 1.0;
        }
        (self.bytes_done as f64 / self.total_bytes as f64).min(1.0)
    }
}

/// Progress callback function type
pub type ProgressCallback = dyn Fn(ProgressState) + Send + Sync;

/// Wraps a `(done, total)` closure for callers that ignore file names.
pub fn bytes_only<F>(f: F) -> Box<ProgressCallback>
where
    F: Fn(u64, u64) + Send + Sync + 'static,
{
    Box::new(move |state: ProgressState| f(state.bytes_done, state.total_bytes))
}

/// Shared counters for one operation.
pub struct ProgressTracker {
    state: Mutex<ProgressState>,
    callback: Option<Box<ProgressCallback>>,
}

impl ProgressTracker {
    pub fn new(total_bytes: u64, callback: Option<Box<ProgressCallback>>) -> Self {
        Self {
            state: Mutex::new(ProgressState { total_bytes, ..Default::default() }),
            callback,
        }
    }

    fn lock(&self) -> MutexGuard<'_, ProgressState> {
        // A panicking callback must not wedge the remaining workers.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Invokes the callback with the current snapshot.
    pub fn emit(&self) {
        if let Some(cb) = &self.callback {
            let state = self.lock();
            cb(state.clone());
        }
    }

    /// Records one completed file and notifies the callback.
    pub fn record_file(&self, bytes: u64, name: &str) {
        let mut state = self.lock();
        state.bytes_done = state.bytes_done.saturating_add(bytes);
        state.current_file = Some(name.to_string());
        if let Some(cb) = &self.callback {
            cb(state.clone());
        }
    }

    /// Final emission once all work has drained.
    pub fn finish(&self) {
        self.emit();
    }

    pub fn bytes_done(&self) -> u64 {
        self.lock().bytes_done
    }

    pub fn snapshot(&self) -> ProgressState {
        self.lock().clone()
    }
}
