//! Persisted settings with coalesced writes.
//!
//! Settings live in a JSON file. Mutations are applied in memory immediately and
//! handed to a background flush task, which writes the file once
//! `SETTINGS_FLUSH_MAX_PENDING` changes have accumulated or `SETTINGS_FLUSH_INTERVAL`
//! has passed since the first unsaved change, whichever comes first.
//!
//! The flush task is owned by [`SettingsStore`] and stopped with
//! [`SettingsStore::shutdown`], which always performs a final flush. Dropping the
//! store without calling `shutdown` loses unsaved changes.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::constants::{
    DEFAULT_UDP_PORT, SETTINGS_FLUSH_INTERVAL, SETTINGS_FLUSH_MAX_PENDING,
};
use crate::config::types::ValidationSettings;

/// Network section of the settings file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkSettings {
    /// Interface probes are bound to; `None` uses the default route
    pub interface: Option<String>,
    /// Report `BindFailure` instead of falling back when binding fails
    pub require_interface: bool,
}

/// Tracker section of the settings file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerSettings {
    /// Port assumed per scheme when a tracker URL omits it
    pub default_ports: BTreeMap<String, u16>,
    /// Named tracker lists offered as starting points
    pub presets: BTreeMap<String, Vec<String>>,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        let default_ports = BTreeMap::from([
            ("http".to_string(), 80),
            ("https".to_string(), 443),
            ("udp".to_string(), DEFAULT_UDP_PORT),
        ]);
        let presets = BTreeMap::from([
            (
                "default".to_string(),
                vec![
                    "udp://tracker.opentrackr.org:1337/announce".to_string(),
                    "http://tracker.openbittorrent.com:80/announce".to_string(),
                    "udp://9.rarbg.to:2710/announce".to_string(),
                ],
            ),
            (
                "minimal".to_string(),
                vec!["udp://tracker.opentrackr.org:1337/announce".to_string()],
            ),
        ]);
        Self {
            default_ports,
            presets,
        }
    }
}

impl TrackerSettings {
    /// Port to use for `scheme` when the URL carries none.
    pub fn default_port(&self, scheme: &str) -> Option<u16> {
        self.default_ports.get(scheme).copied()
    }
}

/// Everything stored in the settings file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub validation: ValidationSettings,
    pub network: NetworkSettings,
    pub trackers: TrackerSettings,
}

enum FlushCommand {
    Changed,
    Flush(oneshot::Sender<()>),
    Shutdown(oneshot::Sender<()>),
}

/// Settings file handle with a background flush task.
pub struct SettingsStore {
    path: PathBuf,
    current: Arc<RwLock<Settings>>,
    commands: mpsc::UnboundedSender<FlushCommand>,
    flush_task: JoinHandle<()>,
}

impl SettingsStore {
    /// Loads settings from `path` and starts the flush task.
    ///
    /// A missing or unreadable file falls back to defaults, which are written
    /// back immediately so the user has a file to edit.
    ///
    /// # Errors
    ///
    /// Returns an error only if the defaults cannot be written after a fallback.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let settings = match tokio::fs::read_to_string(&path).await {
            Ok(content) => match serde_json::from_str::<Settings>(&content) {
                Ok(settings) => {
                    debug!("Loaded settings from {}", path.display());
                    Some(settings)
                }
                Err(e) => {
                    warn!(
                        "Error loading settings from {}: {e}, using defaults",
                        path.display()
                    );
                    None
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No settings file at {}, creating defaults", path.display());
                None
            }
            Err(e) => {
                warn!(
                    "Could not read settings file {}: {e}, using defaults",
                    path.display()
                );
                None
            }
        };

        let settings = match settings {
            Some(settings) => settings,
            None => {
                let defaults = Settings::default();
                write_settings(&path, &defaults)
                    .await
                    .context("Failed to write default settings")?;
                defaults
            }
        };

        let current = Arc::new(RwLock::new(settings));
        let (commands, receiver) = mpsc::unbounded_channel();
        let flush_task = tokio::spawn(run_flush_task(
            path.clone(),
            Arc::clone(&current),
            receiver,
        ));

        Ok(Self {
            path,
            current,
            commands,
            flush_task,
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot of the current settings.
    pub fn get(&self) -> Settings {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Applies `change` in memory and schedules a coalesced write.
    pub fn update<F>(&self, change: F)
    where
        F: FnOnce(&mut Settings),
    {
        {
            let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
            change(&mut guard);
        }
        if self.commands.send(FlushCommand::Changed).is_err() {
            warn!("Settings flush task is not running; change kept in memory only");
        }
    }

    /// Writes pending changes now and waits for the write to finish.
    pub async fn flush(&self) {
        let (ack, done) = oneshot::channel();
        if self.commands.send(FlushCommand::Flush(ack)).is_ok() {
            let _ = done.await;
        }
    }

    /// Stops the flush task after a final flush of pending changes.
    pub async fn shutdown(self) {
        let (ack, done) = oneshot::channel();
        if self.commands.send(FlushCommand::Shutdown(ack)).is_ok() {
            let _ = done.await;
        }
        if let Err(e) = self.flush_task.await {
            warn!("Settings flush task ended abnormally: {e}");
        }
    }
}

async fn run_flush_task(
    path: PathBuf,
    current: Arc<RwLock<Settings>>,
    mut commands: mpsc::UnboundedReceiver<FlushCommand>,
) {
    let mut pending = 0usize;
    let mut deadline: Option<Instant> = None;

    loop {
        let command = match deadline {
            Some(at) => {
                tokio::select! {
                    command = commands.recv() => command,
                    _ = tokio::time::sleep_until(at) => {
                        persist(&path, &current, &mut pending).await;
                        deadline = None;
                        continue;
                    }
                }
            }
            None => commands.recv().await,
        };

        match command {
            Some(FlushCommand::Changed) => {
                pending += 1;
                if pending >= SETTINGS_FLUSH_MAX_PENDING {
                    persist(&path, &current, &mut pending).await;
                    deadline = None;
                } else if deadline.is_none() {
                    deadline = Some(Instant::now() + SETTINGS_FLUSH_INTERVAL);
                }
            }
            Some(FlushCommand::Flush(ack)) => {
                persist(&path, &current, &mut pending).await;
                deadline = None;
                let _ = ack.send(());
            }
            Some(FlushCommand::Shutdown(ack)) => {
                persist(&path, &current, &mut pending).await;
                let _ = ack.send(());
                break;
            }
            None => {
                if pending > 0 {
                    warn!(
                        "Settings store dropped with {pending} unsaved change(s); call shutdown() to persist them"
                    );
                }
                break;
            }
        }
    }
}

async fn persist(path: &Path, current: &RwLock<Settings>, pending: &mut usize) {
    if *pending == 0 {
        return;
    }
    let snapshot = current
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone();
    match write_settings(path, &snapshot).await {
        Ok(()) => debug!("Flushed {} settings change(s) to {}", pending, path.display()),
        Err(e) => warn!("Error saving settings to {}: {e:#}", path.display()),
    }
    *pending = 0;
}

async fn write_settings(path: &Path, settings: &Settings) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    let json = serde_json::to_string_pretty(settings).context("Failed to serialize settings")?;
    tokio::fs::write(path, json)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn read_back(path: &Path) -> Settings {
        let content = tokio::fs::read_to_string(path).await.unwrap();
        serde_json::from_str(&content).unwrap()
    }

    #[tokio::test]
    async fn test_missing_file_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let store = SettingsStore::load(&path).await.unwrap();
        assert_eq!(store.get(), Settings::default());
        assert_eq!(read_back(&path).await, Settings::default());
        store.shutdown().await;
    }

    #[tokio::test]
    async fn test_corrupt_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        tokio::fs::write(&path, "{ not json").await.unwrap();

        let store = SettingsStore::load(&path).await.unwrap();
        assert_eq!(store.get(), Settings::default());
        store.shutdown().await;
    }

    #[tokio::test]
    async fn test_partial_file_fills_missing_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        tokio::fs::write(&path, r#"{"network": {"interface": "wg0"}}"#)
            .await
            .unwrap();

        let store = SettingsStore::load(&path).await.unwrap();
        let settings = store.get();
        assert_eq!(settings.network.interface.as_deref(), Some("wg0"));
        assert_eq!(settings.validation, ValidationSettings::default());
        assert_eq!(settings.trackers.default_port("udp"), Some(6969));
        store.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_flushes_pending_change() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let store = SettingsStore::load(&path).await.unwrap();
        store.update(|s| s.validation.max_workers = 7);
        store.shutdown().await;

        assert_eq!(read_back(&path).await.validation.max_workers, 7);
    }

    #[tokio::test]
    async fn test_many_changes_flush_without_waiting_for_interval() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let store = SettingsStore::load(&path).await.unwrap();
        for i in 0..SETTINGS_FLUSH_MAX_PENDING {
            store.update(|s| s.validation.max_workers = i + 1);
        }

        // Well below SETTINGS_FLUSH_INTERVAL
        let mut flushed = false;
        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            if read_back(&path).await.validation.max_workers == SETTINGS_FLUSH_MAX_PENDING {
                flushed = true;
                break;
            }
        }
        assert!(flushed, "count threshold should trigger a flush");
        store.shutdown().await;
    }

    #[tokio::test]
    async fn test_single_change_flushes_after_interval() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let store = SettingsStore::load(&path).await.unwrap();
        store.update(|s| s.network.require_interface = true);
        assert!(!read_back(&path).await.network.require_interface);

        tokio::time::sleep(SETTINGS_FLUSH_INTERVAL + Duration::from_millis(300)).await;
        assert!(read_back(&path).await.network.require_interface);
        store.shutdown().await;
    }
}
