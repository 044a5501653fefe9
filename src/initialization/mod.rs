//! Application initialization and resource setup.
//!
//! This module provides functions to initialize shared resources:
//! - Logger (plain or JSON)
//! - HTTP clients for probes

mod client;
mod logger;

// Re-export public API
pub use client::{client_builder, init_client};
pub use logger::init_logger_with;
