//! Error handling and processing statistics.
//!
//! This module provides:
//! - The probe failure taxonomy surfaced in validation results
//! - Usage, database and initialization error types
//! - Categorization of transport errors into the taxonomy
//! - Per-kind failure counters shared by a batch

mod categorization;
mod stats;
mod types;

// Re-export public API
pub use categorization::{categorize_io_error, categorize_reqwest_error, get_retry_strategy};
pub use stats::ProcessingStats;
pub use types::{DatabaseError, InitializationError, ProbeErrorKind, UsageError};
