//! State shared by the workers of one batch.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use log::debug;
use serde::Serialize;
use tokio::sync::watch;

use crate::error_handling::{ProbeErrorKind, ProcessingStats};
use crate::models::{Endpoint, ValidationResult};
use crate::probe::{Probe, ProbeOptions};
use crate::storage::ReliabilityStore;

use super::observer::ValidationObserver;

/// Lifecycle of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchState {
    Idle,
    Running,
    Completed,
    Stopped,
}

/// Final account of a batch.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub state: BatchState,
    /// In completion order
    pub results: Vec<ValidationResult>,
    pub working: usize,
    pub total: usize,
    pub elapsed: Duration,
    /// Non-zero failure counts by kind
    pub error_counts: Vec<(ProbeErrorKind, usize)>,
}

impl BatchOutcome {
    /// Endpoints that never got probed because of a stop.
    pub fn skipped(&self) -> usize {
        self.total - self.results.len()
    }
}

struct JobQueue {
    pending: VecDeque<Endpoint>,
    stopped: bool,
}

#[derive(Default)]
struct Aggregate {
    working: usize,
    results: Vec<ValidationResult>,
}

pub(super) struct Batch {
    pub(super) id: u64,
    pub(super) total: usize,
    pub(super) started_at: Instant,
    pub(super) options: ProbeOptions,
    probe: Arc<dyn Probe>,
    store: Arc<ReliabilityStore>,
    observer: Arc<dyn ValidationObserver>,
    queue: Mutex<JobQueue>,
    state: Mutex<BatchState>,
    aggregate: tokio::sync::Mutex<Aggregate>,
    dispatched: AtomicUsize,
    completed: AtomicUsize,
    stats: ProcessingStats,
    done: watch::Sender<Option<BatchOutcome>>,
}

impl Batch {
    pub(super) fn new(
        id: u64,
        endpoints: Vec<Endpoint>,
        options: ProbeOptions,
        probe: Arc<dyn Probe>,
        store: Arc<ReliabilityStore>,
        observer: Arc<dyn ValidationObserver>,
    ) -> (Self, watch::Receiver<Option<BatchOutcome>>) {
        let (done, done_rx) = watch::channel(None);
        let batch = Self {
            id,
            total: endpoints.len(),
            started_at: Instant::now(),
            options,
            probe,
            store,
            observer,
            queue: Mutex::new(JobQueue {
                pending: endpoints.into(),
                stopped: false,
            }),
            state: Mutex::new(BatchState::Running),
            aggregate: tokio::sync::Mutex::new(Aggregate::default()),
            dispatched: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
            stats: ProcessingStats::new(),
            done,
        };
        (batch, done_rx)
    }

    pub(super) fn state(&self) -> BatchState {
        *lock(&self.state)
    }

    /// Probes handed to workers so far.
    pub(super) fn dispatched(&self) -> usize {
        self.dispatched.load(Ordering::SeqCst)
    }

    /// Probes whose results have been aggregated so far.
    pub(super) fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    /// Requests a stop. Returns how many queued endpoints were dropped.
    ///
    /// Once this returns no worker can take another endpoint.
    pub(super) fn request_stop(&self) -> usize {
        let mut queue = lock(&self.queue);
        if queue.stopped {
            return 0;
        }
        queue.stopped = true;
        let dropped = queue.pending.len();
        queue.pending.clear();
        dropped
    }

    fn next_job(&self) -> Option<Endpoint> {
        let mut queue = lock(&self.queue);
        if queue.stopped {
            return None;
        }
        let endpoint = queue.pending.pop_front()?;
        self.dispatched.fetch_add(1, Ordering::SeqCst);
        Some(endpoint)
    }

    /// Takes endpoints until the queue is empty or a stop is requested.
    pub(super) async fn run_worker(self: Arc<Self>, worker: usize) {
        while let Some(endpoint) = self.next_job() {
            let result = self.probe.check(&endpoint, &self.options).await;
            self.aggregate(result).await;
        }
        debug!("Batch {} worker {worker} finished", self.id);
    }

    /// Records one result and notifies the observer, all under the aggregate lock.
    async fn aggregate(&self, result: ValidationResult) {
        let mut aggregate = self.aggregate.lock().await;

        // Failures are logged by the store and must not abort the batch
        let _ = self.store.record_result(&result).await;

        match result.error() {
            Some(kind) => self.stats.increment_error(kind),
            None => aggregate.working += 1,
        }
        let completed = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
        let percent = completed as f64 * 100.0 / self.total as f64;

        self.observer.on_progress(percent, completed, self.total);
        self.observer.on_result(&result);
        aggregate.results.push(result);
    }

    /// Settles the final state once every worker has returned.
    pub(super) async fn finish(&self) -> BatchOutcome {
        let aggregate = self.aggregate.lock().await;
        let elapsed = self.started_at.elapsed();
        let completed = aggregate.results.len();

        let state = if lock(&self.queue).stopped && completed < self.total {
            BatchState::Stopped
        } else {
            BatchState::Completed
        };
        *lock(&self.state) = state;

        match state {
            BatchState::Completed => {
                self.observer
                    .on_complete(aggregate.working, self.total, elapsed)
            }
            _ => self.observer.on_stopped(completed, self.total),
        }

        let outcome = BatchOutcome {
            state,
            results: aggregate.results.clone(),
            working: aggregate.working,
            total: self.total,
            elapsed,
            error_counts: self.stats.snapshot(),
        };
        self.done.send_replace(Some(outcome.clone()));
        outcome
    }

    /// Marks the batch stopped without a normal finish.
    pub(super) fn abandon(&self) {
        self.request_stop();
        *lock(&self.state) = BatchState::Stopped;
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
