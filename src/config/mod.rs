//! Application configuration and constants.
//!
//! This module provides:
//! - Configuration constants (worker bounds, timeouts, wire values, etc.)
//! - Configuration types and option enums
//! - The persisted settings file with coalesced writes
//! - The command-line interface

mod cli;
mod constants;
mod store;
mod types;

// Re-export all constants
pub use constants::*;
pub use cli::{Cli, Command, FavoritesAction, InputArgs, OutputArgs, ValidateArgs};
pub use store::{NetworkSettings, Settings, SettingsStore, TrackerSettings};
pub use types::{Config, LogFormat, LogLevel, ValidationSettings};
