//! Command-line interface.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::config::constants::{
    DB_PATH, DEFAULT_HISTORY_LIMIT, DEFAULT_MIN_CHECKS, DEFAULT_MIN_SUCCESS_RATE, SETTINGS_PATH,
};
use crate::config::store::Settings;
use crate::config::types::{Config, LogFormat, LogLevel};
use crate::export::ExportFormat;
use crate::parse::ImportFormat;

/// Validate BitTorrent tracker lists and track their reliability.
#[derive(Debug, Parser)]
#[command(name = "tracker_status", version, about)]
pub struct Cli {
    /// Log level: error, warn, info, debug or trace
    #[arg(long, value_enum, default_value = "info", global = true)]
    pub log_level: LogLevel,

    /// Log format: plain or json
    #[arg(long, value_enum, default_value = "plain", global = true)]
    pub log_format: LogFormat,

    /// SQLite database holding reliability history
    #[arg(long, default_value = DB_PATH, global = true)]
    pub db_path: PathBuf,

    /// JSON settings file
    #[arg(long, default_value = SETTINGS_PATH, global = true)]
    pub settings: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Report duplicates in a tracker list without probing anything
    Dedupe(InputArgs),

    /// Probe every unique tracker in a list
    Validate(ValidateArgs),

    /// Show recently checked trackers
    History {
        /// Number of trackers to show
        #[arg(long, default_value_t = DEFAULT_HISTORY_LIMIT)]
        limit: u32,
    },

    /// List trackers with a good track record
    Reliable {
        /// Minimum success rate (0.0 to 1.0)
        #[arg(long, default_value_t = DEFAULT_MIN_SUCCESS_RATE)]
        min_rate: f64,

        /// Minimum number of checks
        #[arg(long, default_value_t = DEFAULT_MIN_CHECKS)]
        min_checks: i64,
    },

    /// Count stored trackers per reliability band
    Report,

    /// Manage favorite trackers
    Favorites {
        #[command(subcommand)]
        action: FavoritesAction,
    },

    /// Export stored reliability history
    Export {
        #[command(flatten)]
        output: OutputArgs,

        /// Number of most recently checked trackers to export
        #[arg(long, default_value_t = u32::MAX)]
        limit: u32,
    },

    /// List network interfaces available for binding
    Interfaces,
}

#[derive(Debug, Subcommand)]
pub enum FavoritesAction {
    /// Show favorites with their reliability
    List,
    /// Add or update a favorite
    Add {
        url: String,
        #[arg(long)]
        note: Option<String>,
    },
    /// Remove a favorite
    Remove { url: String },
}

/// Where trackers are read from.
#[derive(Debug, Clone, Args)]
pub struct InputArgs {
    /// Tracker list file; stdin when omitted or `-`
    pub input: Option<PathBuf>,

    /// Input format
    #[arg(long, value_enum, default_value = "auto")]
    pub format: ImportFormat,

    /// Keep only trackers containing this text (case-insensitive)
    #[arg(long)]
    pub filter: Option<String>,

    /// Add the trackers of a preset from the settings file
    #[arg(long)]
    pub preset: Option<String>,
}

impl InputArgs {
    /// Whether the list should be read from stdin.
    pub fn reads_stdin(&self) -> bool {
        match &self.input {
            None => self.preset.is_none(),
            Some(path) => path.as_os_str() == "-",
        }
    }
}

/// Export destination.
#[derive(Debug, Clone, Args)]
pub struct OutputArgs {
    /// Output file; stdout when omitted
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Export format
    #[arg(long = "export-format", value_enum, default_value = "text")]
    pub export_format: ExportFormat,
}

#[derive(Debug, Clone, Args)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Parallel probes (1 to 50)
    #[arg(long, short = 'w')]
    pub workers: Option<usize>,

    /// Time budget per tracker in seconds, retries included
    #[arg(long)]
    pub timeout: Option<f64>,

    /// Wait for a single UDP reply in seconds
    #[arg(long)]
    pub socket_timeout: Option<f64>,

    /// Bind probes to this network interface
    #[arg(long)]
    pub interface: Option<String>,

    /// Fail probes instead of falling back when binding fails
    #[arg(long)]
    pub require_interface: bool,

    /// Also write the results here
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Format of the results file
    #[arg(long = "export-format", value_enum, default_value = "text")]
    pub export_format: ExportFormat,
}

impl Cli {
    /// Builds the effective configuration: settings file values overridden by flags.
    pub fn to_config(&self, settings: &Settings) -> Config {
        let mut config = Config {
            log_level: self.log_level.clone(),
            log_format: self.log_format.clone(),
            db_path: self.db_path.clone(),
            settings_path: self.settings.clone(),
            validation: settings.validation,
            interface: settings.network.interface.clone(),
            require_interface: settings.network.require_interface,
        };

        if let Command::Validate(args) = &self.command {
            if let Some(workers) = args.workers {
                config.validation.max_workers = workers;
            }
            if let Some(timeout) = args.timeout.and_then(seconds) {
                config.validation.timeout_budget = timeout;
            }
            if let Some(socket_timeout) = args.socket_timeout.and_then(seconds) {
                config.validation.socket_timeout = socket_timeout;
            }
            if args.interface.is_some() {
                config.interface = args.interface.clone();
            }
            config.require_interface |= args.require_interface;
        }
        config
    }
}

/// Non-finite or negative values become zero and fail validation later.
fn seconds(value: f64) -> Option<Duration> {
    Some(Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_flags_override_settings() {
        let cli = Cli::parse_from([
            "tracker_status",
            "validate",
            "list.txt",
            "--workers",
            "20",
            "--timeout",
            "2.5",
            "--interface",
            "wg0",
            "--require-interface",
        ]);
        let config = cli.to_config(&Settings::default());
        assert_eq!(config.validation.max_workers, 20);
        assert_eq!(config.validation.timeout_budget, Duration::from_millis(2500));
        assert_eq!(config.interface.as_deref(), Some("wg0"));
        assert!(config.require_interface);
    }

    #[test]
    fn test_settings_used_without_flags() {
        let mut settings = Settings::default();
        settings.validation.max_workers = 7;
        settings.network.interface = Some("tun0".into());

        let cli = Cli::parse_from(["tracker_status", "history"]);
        let config = cli.to_config(&settings);
        assert_eq!(config.validation.max_workers, 7);
        assert_eq!(config.interface.as_deref(), Some("tun0"));
    }

    #[test]
    fn test_invalid_timeout_fails_validation() {
        let cli = Cli::parse_from(["tracker_status", "validate", "--timeout", "-1"]);
        let config = cli.to_config(&Settings::default());
        assert!(config.validation.validate().is_err());
    }

    #[test]
    fn test_stdin_detection() {
        let parse = |args: &[&str]| match Cli::parse_from(args).command {
            Command::Dedupe(input) => input.reads_stdin(),
            _ => unreachable!(),
        };
        assert!(parse(&["tracker_status", "dedupe"]));
        assert!(parse(&["tracker_status", "dedupe", "-"]));
        assert!(!parse(&["tracker_status", "dedupe", "list.txt"]));
        assert!(!parse(&["tracker_status", "dedupe", "--preset", "minimal"]));
    }

    #[test]
    fn test_global_options_after_subcommand() {
        let cli = Cli::parse_from(["tracker_status", "report", "--db-path", "/tmp/t.db"]);
        assert_eq!(cli.db_path, PathBuf::from("/tmp/t.db"));
    }
}
