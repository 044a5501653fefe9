//! Validation orchestrator.
//!
//! A batch moves `Idle -> Running -> Completed | Stopped`. `max_workers`
//! worker tasks pull endpoints from a shared queue, so no more than that many
//! probes run at once. Each result is written to the reliability store and
//! reported to the observer under one aggregation lock, which serializes all
//! callbacks of a batch.
//!
//! Stopping is cooperative: queued endpoints are dropped immediately, probes
//! already in flight finish or time out on their own.

mod batch;
mod observer;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use futures::stream::FuturesUnordered;
use futures::StreamExt;
use log::{error, info, warn};
use tokio::sync::watch;

use crate::config::ValidationSettings;
use crate::error_handling::UsageError;
use crate::interface::InterfaceSelection;
use crate::models::Endpoint;
use crate::pipeline::Pipeline;
use crate::probe::{Probe, ProbeOptions};
use crate::storage::ReliabilityStore;

use batch::Batch;
pub use batch::{BatchOutcome, BatchState};
pub use observer::{NoopObserver, ValidationObserver};

/// Everything needed to start a batch.
pub struct BatchRequest {
    pub endpoints: Vec<Endpoint>,
    pub settings: ValidationSettings,
    pub interface: Option<InterfaceSelection>,
    pub observer: Arc<dyn ValidationObserver>,
}

impl BatchRequest {
    /// A request with default settings and no observer.
    pub fn new(endpoints: Vec<Endpoint>) -> Self {
        Self {
            endpoints,
            settings: ValidationSettings::default(),
            interface: None,
            observer: Arc::new(NoopObserver),
        }
    }

    pub fn with_settings(mut self, settings: ValidationSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_interface(mut self, interface: Option<InterfaceSelection>) -> Self {
        self.interface = interface;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn ValidationObserver>) -> Self {
        self.observer = observer;
        self
    }
}

/// Handle to a started batch.
#[derive(Clone)]
pub struct ValidationHandle {
    batch: Arc<Batch>,
    done: watch::Receiver<Option<BatchOutcome>>,
}

impl ValidationHandle {
    pub fn id(&self) -> u64 {
        self.batch.id
    }

    pub fn state(&self) -> BatchState {
        self.batch.state()
    }

    /// Endpoints in the batch after pipeline stages ran.
    pub fn total(&self) -> usize {
        self.batch.total
    }

    /// Results aggregated so far.
    pub fn completed(&self) -> usize {
        self.batch.completed()
    }

    /// Probes started so far.
    pub fn dispatched(&self) -> usize {
        self.batch.dispatched()
    }

    pub fn elapsed(&self) -> std::time::Duration {
        self.batch.started_at.elapsed()
    }

    /// Requests a cooperative stop.
    ///
    /// No new probe starts once this returns; probes in flight run to
    /// completion or to their own timeout.
    pub fn stop(&self) {
        let dropped = self.batch.request_stop();
        if dropped > 0 {
            info!(
                "Stop requested for batch {}: {dropped} queued endpoints skipped",
                self.batch.id
            );
        }
    }

    /// Waits until the batch has completed or stopped.
    pub async fn wait(&self) -> BatchOutcome {
        let mut done = self.done.clone();
        let outcome = match done.wait_for(Option::is_some).await {
            Ok(outcome) => outcome.clone(),
            Err(_) => None,
        };
        match outcome {
            Some(outcome) => outcome,
            // The coordinator went away without finishing
            None => BatchOutcome {
                state: BatchState::Stopped,
                results: Vec::new(),
                working: 0,
                total: self.batch.total,
                elapsed: self.elapsed(),
                error_counts: Vec::new(),
            },
        }
    }
}

/// Runs validation batches, one at a time.
pub struct Validator {
    probe: Arc<dyn Probe>,
    store: Arc<ReliabilityStore>,
    pipeline: Pipeline,
    active: Mutex<Option<Arc<Batch>>>,
    next_id: AtomicU64,
}

impl Validator {
    pub fn new(probe: Arc<dyn Probe>, store: Arc<ReliabilityStore>) -> Self {
        Self::with_pipeline(probe, store, Pipeline::default())
    }

    pub fn with_pipeline(
        probe: Arc<dyn Probe>,
        store: Arc<ReliabilityStore>,
        pipeline: Pipeline,
    ) -> Self {
        Self {
            probe,
            store,
            pipeline,
            active: Mutex::new(None),
            next_id: AtomicU64::new(1),
        }
    }

    /// State of the most recent batch, `Idle` if none was started.
    pub fn state(&self) -> BatchState {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map_or(BatchState::Idle, |batch| batch.state())
    }

    /// Starts a batch in the background.
    ///
    /// # Errors
    ///
    /// - `UsageError::BatchAlreadyRunning` while another batch is running
    /// - `UsageError::InvalidConfig` for out-of-bounds settings
    /// - `UsageError::NoEndpoints` for an empty batch
    pub fn start(&self, request: BatchRequest) -> Result<ValidationHandle, UsageError> {
        request.settings.validate()?;

        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if matches!(active.as_ref(), Some(batch) if batch.state() == BatchState::Running) {
            return Err(UsageError::BatchAlreadyRunning);
        }

        let endpoints = self.pipeline.before_validation(request.endpoints);
        if endpoints.is_empty() {
            return Err(UsageError::NoEndpoints);
        }

        let options = ProbeOptions {
            timeout_budget: request.settings.timeout_budget,
            socket_timeout: request.settings.socket_timeout,
            interface: request.interface,
        };
        let worker_count = request.settings.max_workers.min(endpoints.len());
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (batch, done) = Batch::new(
            id,
            endpoints,
            options,
            Arc::clone(&self.probe),
            Arc::clone(&self.store),
            request.observer,
        );
        let batch = Arc::new(batch);
        *active = Some(Arc::clone(&batch));
        drop(active);

        info!(
            "Starting batch {id}: {} endpoints, {worker_count} workers, {:.1}s budget",
            batch.total,
            batch.options.timeout_budget.as_secs_f64()
        );

        let pipeline = self.pipeline.clone();
        let coordinator = Arc::clone(&batch);
        tokio::spawn(async move {
            let mut workers = FuturesUnordered::new();
            for worker in 0..worker_count {
                workers.push(tokio::spawn(Arc::clone(&coordinator).run_worker(worker)));
            }
            while let Some(joined) = workers.next().await {
                if let Err(e) = joined {
                    error!("Validation worker failed: {e}");
                    coordinator.abandon();
                }
            }

            let outcome = coordinator.finish().await;
            pipeline.after_validation(&outcome.results);
            if outcome.state == BatchState::Stopped {
                warn!(
                    "Batch {} stopped: {}/{} endpoints probed",
                    coordinator.id,
                    outcome.results.len(),
                    outcome.total
                );
            }
        });

        Ok(ValidationHandle { batch, done })
    }

    /// Requests a cooperative stop of the batch behind `handle`.
    pub fn stop(&self, handle: &ValidationHandle) {
        handle.stop();
    }
}
