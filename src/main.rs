//! Main application entry point (CLI binary).
//!
//! This is a thin wrapper around the `tracker_status` library that handles:
//! - Command-line argument parsing
//! - Logger initialization
//! - Reading tracker lists from files or stdin
//! - User-facing output formatting
//!
//! All core functionality is implemented in the library crate.

use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;

use tracker_status::app::{
    print_batch_summary, print_dedup_summary, print_reliability_report, shutdown_gracefully,
    spawn_progress_logger,
};
use tracker_status::config::{
    Cli, Command, FavoritesAction, InputArgs, OutputArgs, SettingsStore, ValidateArgs,
};
use tracker_status::dedupe::Deduplicated;
use tracker_status::export::{export_history, export_results, ExportOptions};
use tracker_status::initialization::init_logger_with;
use tracker_status::interface::DeviceBinder;
use tracker_status::models::ValidationBatchStats;
use tracker_status::parse::filter_trackers;
use tracker_status::TrackerEngine;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logger_with(cli.log_level.clone().into(), cli.log_format.clone())
        .context("Failed to initialize logger")?;

    if let Err(e) = run(cli).await {
        eprintln!("tracker_status error: {:#}", e);
        process::exit(1);
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    if let Command::Interfaces = cli.command {
        list_interfaces();
        return Ok(());
    }

    let settings = SettingsStore::load(&cli.settings)
        .await
        .context("Failed to load settings")?;
    let config = cli.to_config(&settings.get());
    let engine = TrackerEngine::open(config, Some(settings)).await?;

    let result = match cli.command {
        Command::Dedupe(input) => run_dedupe(&engine, &input).await,
        Command::Validate(args) => {
            // Validation owns the engine so it can shut it down gracefully
            return run_validate(engine, args).await;
        }
        Command::History { limit } => run_history(&engine, limit).await,
        Command::Reliable {
            min_rate,
            min_checks,
        } => run_reliable(&engine, min_rate, min_checks).await,
        Command::Report => engine
            .reliability_report()
            .await
            .map(|counts| print_reliability_report(&counts))
            .context("Failed to compute reliability report"),
        Command::Favorites { action } => run_favorites(&engine, action).await,
        Command::Export { output, limit } => run_export(&engine, &output, limit).await,
        Command::Interfaces => Ok(()),
    };

    engine.shutdown().await;
    result
}

/// Reads the tracker list named by `input`, appending preset trackers.
async fn load_trackers(engine: &TrackerEngine, input: &InputArgs) -> Result<Deduplicated> {
    let mut content = String::new();
    if input.reads_stdin() {
        info!("Reading trackers from stdin");
        tokio::io::stdin()
            .read_to_string(&mut content)
            .await
            .context("Failed to read trackers from stdin")?;
    } else if let Some(path) = &input.input {
        content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read tracker list {}", path.display()))?;
    }

    if let Some(preset) = &input.preset {
        let presets = engine
            .settings()
            .map(|s| s.get().trackers.presets)
            .unwrap_or_default();
        let trackers = presets
            .get(preset)
            .with_context(|| format!("Unknown tracker preset '{preset}'"))?;
        info!("Adding {} trackers from preset '{preset}'", trackers.len());
        for tracker in trackers {
            content.push('\n');
            content.push_str(tracker);
        }
    }

    let mut deduplicated = engine
        .import(&content, input.format)
        .context("Failed to parse tracker list")?;

    if let Some(query) = &input.filter {
        let raw: Vec<String> = deduplicated.unique().into_iter().map(String::from).collect();
        let kept = filter_trackers(&raw, query);
        deduplicated
            .endpoints
            .retain(|endpoint| kept.iter().any(|k| k == endpoint.raw()));
        info!("Filter '{query}' kept {}/{} trackers", kept.len(), raw.len());
    }
    Ok(deduplicated)
}

async fn run_dedupe(engine: &TrackerEngine, input: &InputArgs) -> Result<()> {
    let deduplicated = load_trackers(engine, input).await?;
    print_dedup_summary(&ValidationBatchStats::from_endpoints(
        deduplicated.stats,
        &deduplicated.endpoints,
    ));
    for raw in deduplicated.unique() {
        println!("{raw}");
    }
    Ok(())
}

async fn run_validate(engine: TrackerEngine, args: ValidateArgs) -> Result<()> {
    let cancel = CancellationToken::new();
    let mut logging_task = None;

    let result = async {
        let deduplicated = load_trackers(&engine, &args.input).await?;
        let dedup_stats = deduplicated.stats;
        let request = engine.batch_request(deduplicated.endpoints);
        let handle = engine
            .start_validation(request)
            .context("Failed to start validation")?;
        info!("Validating {} trackers", handle.total());

        logging_task = Some(spawn_progress_logger(handle.clone(), cancel.clone()));

        let outcome = tokio::select! {
            outcome = handle.wait() => outcome,
            _ = tokio::signal::ctrl_c() => {
                warn!("Interrupted, stopping validation");
                engine.stop_validation(&handle);
                handle.wait().await
            }
        };
        print_batch_summary(&outcome);

        let stats = ValidationBatchStats::from_results(dedup_stats, &outcome.results);
        if let Some(path) = &args.export {
            let opts = ExportOptions {
                output: Some(path.clone()),
                format: args.export_format,
            };
            let written = export_results(&opts, &outcome.results, &stats).await?;
            info!("Exported {written} trackers to {}", path.display());
        } else {
            for result in outcome.results.iter().filter(|r| r.is_alive()) {
                println!("{}", result.endpoint.raw());
            }
        }
        Ok::<(), anyhow::Error>(())
    }
    .await;

    shutdown_gracefully(cancel, logging_task, engine).await;
    result
}

async fn run_history(engine: &TrackerEngine, limit: u32) -> Result<()> {
    let records = engine
        .get_history(limit)
        .await
        .context("Failed to read history")?;
    if records.is_empty() {
        println!("No trackers checked yet");
    }
    for record in records {
        println!(
            "{:<60} {:>3}/{:<3} {:>5.1}%  {:<8} {}",
            record.url,
            record.success_count,
            record.check_count,
            record.success_rate() * 100.0,
            if record.last_alive { "alive" } else { "dead" },
            record.band().as_str()
        );
    }
    Ok(())
}

async fn run_reliable(engine: &TrackerEngine, min_rate: f64, min_checks: i64) -> Result<()> {
    let records = engine
        .get_reliable_trackers(min_rate, min_checks)
        .await
        .context("Failed to query reliable trackers")?;
    info!(
        "{} trackers with success rate >= {:.0}% over at least {min_checks} checks",
        records.len(),
        min_rate * 100.0
    );
    for record in records {
        println!("{}", record.url);
    }
    Ok(())
}

async fn run_favorites(engine: &TrackerEngine, action: FavoritesAction) -> Result<()> {
    match action {
        FavoritesAction::List => {
            let favorites = engine
                .list_favorites()
                .await
                .context("Failed to list favorites")?;
            for favorite in favorites {
                let reliability = favorite
                    .reliability
                    .as_ref()
                    .map(|r| format!("{:.1}% of {}", r.success_rate() * 100.0, r.check_count))
                    .unwrap_or_else(|| "never checked".to_string());
                let note = favorite.note.as_deref().unwrap_or("");
                println!("{:<60} {:<20} {note}", favorite.url, reliability);
            }
        }
        FavoritesAction::Add { url, note } => {
            engine
                .add_favorite(&url, note.as_deref())
                .await
                .context("Failed to add favorite")?;
            info!("Added {url} to favorites");
        }
        FavoritesAction::Remove { url } => {
            let removed = engine
                .remove_favorite(&url)
                .await
                .context("Failed to remove favorite")?;
            if removed {
                info!("Removed {url} from favorites");
            } else {
                warn!("{url} is not a favorite");
            }
        }
    }
    Ok(())
}

async fn run_export(engine: &TrackerEngine, output: &OutputArgs, limit: u32) -> Result<()> {
    let records = engine
        .get_history(limit)
        .await
        .context("Failed to read history")?;
    let opts = ExportOptions {
        output: output.output.clone(),
        format: output.export_format,
    };
    let written = export_history(&opts, &records).await?;
    if let Some(path) = &opts.output {
        info!("Exported {written} trackers to {}", path.display());
    }
    Ok(())
}

fn list_interfaces() {
    let interfaces = DeviceBinder::available_interfaces();
    if interfaces.is_empty() {
        println!("No network interfaces found");
    }
    for interface in interfaces {
        println!("{:<16} {:?}", interface.name, interface.kind);
    }
}
