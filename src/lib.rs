//! tracker_status library: BitTorrent tracker validation
//!
//! This library imports tracker lists, removes duplicates by a normalized key,
//! probes every unique tracker concurrently (UDP connect handshake or HTTP
//! GET) and keeps a per-tracker reliability history in SQLite.
//!
//! # Example
//!
//! ```no_run
//! use tracker_status::{Config, TrackerEngine};
//! use tracker_status::parse::ImportFormat;
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let engine = TrackerEngine::open(Config::default(), None).await?;
//!
//! let list = "udp://tracker.opentrackr.org:1337/announce\n\
//!             UDP://Tracker.Opentrackr.org:1337/announce?tr=x";
//! let deduplicated = engine.import(list, ImportFormat::Auto)?;
//!
//! let handle = engine.start_validation(engine.batch_request(deduplicated.endpoints))?;
//! let outcome = handle.wait().await;
//! println!("{}/{} working", outcome.working, outcome.total);
//!
//! engine.shutdown().await;
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime. Use `#[tokio::main]` in your application
//! or ensure you're calling library functions within an async context.

pub mod app;
pub mod config;
pub mod dedupe;
mod engine;
pub mod error_handling;
pub mod export;
pub mod initialization;
pub mod interface;
pub mod models;
pub mod normalize;
pub mod parse;
pub mod pipeline;
pub mod probe;
pub mod storage;
pub mod validation;

// Re-export public API
pub use config::{Config, LogFormat, LogLevel, ValidationSettings};
pub use dedupe::{dedupe, Deduplicated};
pub use engine::TrackerEngine;
pub use error_handling::{DatabaseError, ProbeErrorKind, UsageError};
pub use models::{
    DedupStats, Endpoint, ProbeOutcome, ProtocolKind, ReliabilityBand, ReliabilityRecord,
    ValidationBatchStats, ValidationResult,
};
pub use normalize::{normalize_uncached, sanitize, Normalizer};
pub use validation::{
    BatchOutcome, BatchRequest, BatchState, ValidationHandle, ValidationObserver, Validator,
};
