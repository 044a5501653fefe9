//! Engine facade used by the CLI and library callers.
//!
//! Bundles the normalizer, the reliability store, the probes and the
//! validator behind the operations a front end needs.

use std::sync::Arc;

use anyhow::{Context, Result};
use log::info;

use crate::config::{Config, SettingsStore, DEFAULT_UDP_PORT, DEFAULT_USER_AGENT};
use crate::dedupe::{dedupe, Deduplicated};
use crate::error_handling::{DatabaseError, UsageError};
use crate::interface::{DeviceBinder, InterfaceSelection};
use crate::models::{Endpoint, ReliabilityRecord, ValidationBatchStats};
use crate::normalize::Normalizer;
use crate::parse::{parse_multiple_formats, ImportFormat, ParseError};
use crate::probe::{Probe, ProbeRouter};
use crate::storage::{self, init_db_pool_with_path, run_migrations, BandCounts, Favorite, ReliabilityStore};
use crate::validation::{BatchRequest, ValidationHandle, Validator};

/// Tracker validation engine.
pub struct TrackerEngine {
    config: Config,
    normalizer: Normalizer,
    store: Arc<ReliabilityStore>,
    validator: Validator,
    settings: Option<SettingsStore>,
}

impl TrackerEngine {
    /// Opens the database at `config.db_path` and sets up the network probes.
    ///
    /// `settings` supplies per-scheme default ports and is flushed on
    /// [`TrackerEngine::shutdown`].
    pub async fn open(config: Config, settings: Option<SettingsStore>) -> Result<Self> {
        let pool = init_db_pool_with_path(&config.db_path)
            .await
            .context("Failed to initialize database pool")?;
        run_migrations(&pool)
            .await
            .context("Failed to run database migrations")?;

        let udp_port = settings
            .as_ref()
            .and_then(|s| s.get().trackers.default_port("udp"))
            .unwrap_or(DEFAULT_UDP_PORT);
        let router = ProbeRouter::new(DEFAULT_USER_AGENT, udp_port, Arc::new(DeviceBinder))
            .context("Failed to initialize HTTP client")?;

        info!("Reliability database: {}", config.db_path.display());
        Ok(Self::with_parts(
            config,
            Arc::new(router),
            Arc::new(ReliabilityStore::new(pool)),
            settings,
        ))
    }

    /// Assembles an engine from ready-made parts.
    pub fn with_parts(
        config: Config,
        probe: Arc<dyn Probe>,
        store: Arc<ReliabilityStore>,
        settings: Option<SettingsStore>,
    ) -> Self {
        Self {
            config,
            normalizer: Normalizer::new(),
            validator: Validator::new(probe, Arc::clone(&store)),
            store,
            settings,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    pub fn settings(&self) -> Option<&SettingsStore> {
        self.settings.as_ref()
    }

    /// Parses a tracker list and removes duplicates.
    pub fn import(&self, content: &str, format: ImportFormat) -> Result<Deduplicated, ParseError> {
        let raw = parse_multiple_formats(content, format)?;
        Ok(dedupe(&self.normalizer, &raw))
    }

    /// Duplicate statistics for pasted text; nothing is probed.
    pub fn find_duplicates(&self, raw_text: &str) -> ValidationBatchStats {
        let deduplicated = self
            .import(raw_text, ImportFormat::Auto)
            .unwrap_or_default();
        ValidationBatchStats::from_endpoints(deduplicated.stats, &deduplicated.endpoints)
    }

    /// A batch request using the configured settings and interface.
    pub fn batch_request(&self, endpoints: Vec<Endpoint>) -> BatchRequest {
        let interface = self
            .config
            .interface
            .as_deref()
            .and_then(|name| InterfaceSelection::new(name, self.config.require_interface));
        BatchRequest::new(endpoints)
            .with_settings(self.config.validation)
            .with_interface(interface)
    }

    pub fn start_validation(&self, request: BatchRequest) -> Result<ValidationHandle, UsageError> {
        self.validator.start(request)
    }

    pub fn stop_validation(&self, handle: &ValidationHandle) {
        self.validator.stop(handle);
    }

    /// Most recently checked trackers first.
    pub async fn get_history(&self, limit: u32) -> Result<Vec<ReliabilityRecord>, DatabaseError> {
        self.store.get_history(limit).await
    }

    pub async fn get_reliable_trackers(
        &self,
        min_success_rate: f64,
        min_checks: i64,
    ) -> Result<Vec<ReliabilityRecord>, DatabaseError> {
        self.store.query_reliable(min_success_rate, min_checks).await
    }

    /// Reliability record for a tracker URL in any spelling.
    pub async fn reliability_of(&self, url: &str) -> Result<Option<ReliabilityRecord>, DatabaseError> {
        self.store.get_record(&self.normalizer.normalize(url)).await
    }

    pub async fn reliability_report(&self) -> Result<BandCounts, DatabaseError> {
        self.store.band_counts().await
    }

    pub async fn add_favorite(&self, url: &str, note: Option<&str>) -> Result<(), DatabaseError> {
        let endpoint = self.normalizer.endpoint(url.trim());
        storage::add_favorite(self.store.pool(), endpoint.key(), endpoint.raw(), note).await
    }

    pub async fn remove_favorite(&self, url: &str) -> Result<bool, DatabaseError> {
        storage::remove_favorite(self.store.pool(), &self.normalizer.normalize(url)).await
    }

    pub async fn list_favorites(&self) -> Result<Vec<Favorite>, DatabaseError> {
        storage::list_favorites(self.store.pool()).await
    }

    /// Flushes pending settings and closes the database.
    pub async fn shutdown(self) {
        if let Some(settings) = self.settings {
            settings.shutdown().await;
        }
        self.store.pool().close().await;
    }
}
