//! Batch callbacks.

use std::time::Duration;

use crate::models::ValidationResult;

/// Receives batch events.
///
/// Calls for one batch are serialized: no two of them ever run at the same
/// time, even though probes run in parallel. Implementations should return
/// quickly since workers wait on them.
pub trait ValidationObserver: Send + Sync {
    /// After each probe, with `percent` in `0.0..=100.0`.
    fn on_progress(&self, _percent: f64, _completed: usize, _total: usize) {}

    /// After each probe, following `on_progress`.
    fn on_result(&self, _result: &ValidationResult) {}

    /// Once, when every endpoint was probed without a stop request.
    fn on_complete(&self, _working: usize, _total: usize, _elapsed: Duration) {}

    /// Once, when a stopped batch has drained its in-flight probes.
    fn on_stopped(&self, _completed: usize, _total: usize) {}
}

/// Observer that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl ValidationObserver for NoopObserver {}
