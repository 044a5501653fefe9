//! Configuration constants.
//!
//! This module defines all configuration constants used throughout the application,
//! including worker limits, timeouts, wire-protocol values and cache sizes.

use std::time::Duration;

// Worker pool bounds
/// Smallest accepted worker pool size
pub const MIN_WORKERS: usize = 1;
/// Largest accepted worker pool size
pub const MAX_WORKERS: usize = 50;
/// Default worker pool size when nothing is configured
pub const DEFAULT_MAX_WORKERS: usize = 10;

// Probe timeouts
/// Default total time budget for a single probe, retries included
pub const DEFAULT_TIMEOUT_BUDGET: Duration = Duration::from_secs(10);
/// Default wait for a single UDP reply
pub const DEFAULT_SOCKET_TIMEOUT: Duration = Duration::from_secs(5);

/// Progress logging interval in seconds for CLI validation runs
pub const LOGGING_INTERVAL: u64 = 5;

// Storage
pub const DB_PATH: &str = "./tracker_status.db";
pub const SETTINGS_PATH: &str = "./tracker_status.json";

// Settings persistence coalescing window
/// Number of pending settings writes that forces an immediate flush
pub const SETTINGS_FLUSH_MAX_PENDING: usize = 10;
/// Maximum delay between the first pending settings write and its flush
pub const SETTINGS_FLUSH_INTERVAL: Duration = Duration::from_secs(1);

// Normalization
/// Capacity of the normalization cache (least-recently-used eviction)
pub const NORMALIZE_CACHE_CAPACITY: usize = 1000;
/// Query parameters stripped from tracker URLs before comparison.
///
/// These decorate announce URLs (embedded tracker lists, web seeds, acceptable sources)
/// without changing which tracker is addressed.
pub const IGNORED_QUERY_PARAMS: &[&str] = &["tr", "ws", "as"];

// UDP tracker protocol (BEP 15)
/// Magic connection id every connect request starts with
pub const UDP_PROTOCOL_ID: u64 = 0x41727101980;
/// Action code of the connect exchange
pub const UDP_ACTION_CONNECT: u32 = 0;
/// Action code trackers use to report an error
pub const UDP_ACTION_ERROR: u32 = 3;
/// Size of a connect request in bytes
pub const UDP_CONNECT_REQUEST_LEN: usize = 16;
/// Minimum size of a valid connect response in bytes
pub const UDP_CONNECT_RESPONSE_MIN_LEN: usize = 16;
/// Additional connect attempts after the first one times out
pub const UDP_MAX_RETRIES: usize = 2;
/// Receive buffer for UDP replies; connect responses are 16 bytes but some trackers pad
pub const UDP_RECV_BUFFER_LEN: usize = 2048;

// HTTP probe
pub const DEFAULT_USER_AGENT: &str = concat!("tracker_status/", env!("CARGO_PKG_VERSION"));

// Reliability classification
/// Observations needed before a success rate is considered meaningful
pub const MIN_CHECKS_FOR_CLASSIFICATION: i64 = 3;
/// Lower bound of the "high" reliability band
pub const HIGH_RELIABILITY_THRESHOLD: f64 = 0.9;
/// Lower bound of the "medium" reliability band
pub const MEDIUM_RELIABILITY_THRESHOLD: f64 = 0.7;

// Database write circuit breaker
/// Consecutive failed reliability writes before writes are paused
pub const DB_WRITE_FAILURE_THRESHOLD: u32 = 5;
/// How long writes stay paused once the circuit opens
pub const DB_WRITE_COOLDOWN: Duration = Duration::from_secs(60);

// Import limits
/// Maximum tracker URL length; longer entries are dropped during sanitation
pub const MAX_URL_LENGTH: usize = 2048;

// Ports and report defaults
/// Port used for UDP trackers whose URL has none.
pub const DEFAULT_UDP_PORT: u16 = 6969;
/// Rows shown by the history view.
pub const DEFAULT_HISTORY_LIMIT: u32 = 50;
/// Default minimum success rate for the reliable tracker list.
pub const DEFAULT_MIN_SUCCESS_RATE: f64 = 0.7;
/// Default minimum number of checks for the reliable tracker list.
pub const DEFAULT_MIN_CHECKS: i64 = 2;
