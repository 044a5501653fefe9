//! Main application helpers.
//!
//! Progress logging, end-of-run summaries and shutdown used by the CLI.

pub mod logging;
pub mod shutdown;
pub mod statistics;

// Re-export public API
pub use logging::{log_progress, spawn_progress_logger};
pub use shutdown::shutdown_gracefully;
pub use statistics::{
    print_batch_summary, print_dedup_summary, print_error_statistics, print_reliability_report,
};
