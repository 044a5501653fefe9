//! Graceful shutdown handling.

use log::debug;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::engine::TrackerEngine;

/// Stops background tasks, then flushes settings and closes the database.
pub async fn shutdown_gracefully(
    cancel: CancellationToken,
    logging_task: Option<JoinHandle<()>>,
    engine: TrackerEngine,
) {
    cancel.cancel();
    if let Some(logging_task) = logging_task {
        let _ = logging_task.await;
    }
    engine.shutdown().await;
    debug!("Shutdown complete");
}
