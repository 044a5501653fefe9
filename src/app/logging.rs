//! Progress logging utilities.

use std::time::Duration;

use log::info;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::LOGGING_INTERVAL;
use crate::validation::{BatchState, ValidationHandle};

/// Logs how far a running batch has come.
pub fn log_progress(handle: &ValidationHandle) {
    let completed = handle.completed();
    let total = handle.total();
    let elapsed_secs = handle.elapsed().as_secs_f64();
    let rate = if elapsed_secs > 0.0 {
        completed as f64 / elapsed_secs
    } else {
        0.0
    };
    info!(
        "Validated {completed}/{total} trackers in {elapsed_secs:.1}s (~{rate:.2} trackers/sec)"
    );
}

/// Logs progress every `LOGGING_INTERVAL` seconds until cancelled or the batch ends.
pub fn spawn_progress_logger(
    handle: ValidationHandle,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(LOGGING_INTERVAL));
        // First tick fires immediately
        interval.tick().await;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {
                    if handle.state() != BatchState::Running {
                        break;
                    }
                    log_progress(&handle);
                }
            }
        }
    })
}
