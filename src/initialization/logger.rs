//! Logger initialization.
//!
//! `env_logger` backend with a colored plain formatter or a JSON-lines
//! formatter. `RUST_LOG` is read first; the explicit level overrides it.
//!
//! ```bash
//! RUST_LOG=tracker_status=debug tracker_status validate trackers.txt
//! tracker_status --log-format json validate trackers.txt
//! ```

use std::io::Write;

use colored::Colorize;
use env_logger::fmt::Formatter;
use log::{Level, LevelFilter, Record};

use crate::config::LogFormat;
use crate::error_handling::InitializationError;

/// Dependency modules whose chatter is clamped to Info.
const NOISY_MODULES: &[&str] = &["sqlx", "reqwest", "hyper", "hyper_util"];

/// Initializes the logger with the specified level and format.
///
/// # Errors
///
/// Returns `InitializationError::LoggerError` if a logger is already installed.
pub fn init_logger_with(level: LevelFilter, format: LogFormat) -> Result<(), InitializationError> {
    let mut builder = env_logger::Builder::from_default_env();

    builder.filter_level(level);
    for module in NOISY_MODULES {
        builder.filter_module(module, level.min(LevelFilter::Info));
    }
    builder.filter_module("tracker_status", level);

    match format {
        LogFormat::Json => {
            builder.format(format_json);
        }
        LogFormat::Plain => {
            colored::control::set_override(true);
            builder.format(format_plain);
        }
    }

    builder.try_init().map_err(InitializationError::from)?;
    Ok(())
}

fn format_plain(buf: &mut Formatter, record: &Record) -> std::io::Result<()> {
    let level = record.level();
    let label = format!("{level:<5}");
    let label = match level {
        Level::Error => label.red(),
        Level::Warn => label.yellow(),
        Level::Info => label.green(),
        Level::Debug => label.blue(),
        Level::Trace => label.purple(),
    };
    writeln!(
        buf,
        "{} {} {} {}",
        chrono::Local::now().format("%H:%M:%S%.3f").to_string().dimmed(),
        label,
        record.target().cyan(),
        record.args()
    )
}

fn format_json(buf: &mut Formatter, record: &Record) -> std::io::Result<()> {
    writeln!(
        buf,
        "{{\"ts\":{},\"level\":\"{}\",\"target\":{},\"msg\":{}}}",
        chrono::Utc::now().timestamp_millis(),
        record.level(),
        serde_json::to_string(record.target()).unwrap_or_else(|_| "\"\"".into()),
        serde_json::to_string(&record.args().to_string()).unwrap_or_else(|_| "\"\"".into())
    )
}
