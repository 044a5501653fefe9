//! Reliability history: one running tally per normalized tracker key.

use std::cmp::Ordering;

use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::error_handling::DatabaseError;
use crate::models::{ReliabilityBand, ReliabilityRecord, ValidationResult};

const RECORD_COLUMNS: &str = "normalized_key, url, check_count, success_count, \
     last_response_time, last_checked_at_ms, last_alive";

/// Number of trackers in each reliability band.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BandCounts {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub insufficient_data: usize,
}

impl BandCounts {
    pub fn add(&mut self, band: ReliabilityBand) {
        match band {
            ReliabilityBand::High => self.high += 1,
            ReliabilityBand::Medium => self.medium += 1,
            ReliabilityBand::Low => self.low += 1,
            ReliabilityBand::InsufficientData => self.insufficient_data += 1,
        }
    }

    /// Trackers with enough checks to be classified.
    pub fn classified(&self) -> usize {
        self.high + self.medium + self.low
    }
}

/// Folds one validation result into the tally for its normalized key.
///
/// A single upsert statement, so concurrent writes to the same key are
/// serialized by SQLite and never lose an increment.
pub async fn record_result(
    pool: &SqlitePool,
    result: &ValidationResult,
) -> Result<(), DatabaseError> {
    let alive = result.is_alive();
    sqlx::query(
        "INSERT INTO tracker_reliability (
            normalized_key, url, check_count, success_count,
            last_response_time, last_checked_at_ms, last_alive
         ) VALUES (?, ?, 1, ?, ?, ?, ?)
         ON CONFLICT(normalized_key) DO UPDATE SET
             url = excluded.url,
             check_count = tracker_reliability.check_count + 1,
             success_count = tracker_reliability.success_count + excluded.success_count,
             last_response_time = excluded.last_response_time,
             last_checked_at_ms = excluded.last_checked_at_ms,
             last_alive = excluded.last_alive",
    )
    .bind(result.endpoint.key())
    .bind(result.endpoint.raw())
    .bind(i64::from(alive))
    .bind(result.response_time_seconds())
    .bind(result.validated_at.timestamp_millis())
    .bind(alive)
    .execute(pool)
    .await?;

    Ok(())
}

/// Fetches the record for one normalized key.
pub async fn get_record(
    pool: &SqlitePool,
    normalized_key: &str,
) -> Result<Option<ReliabilityRecord>, DatabaseError> {
    let row = sqlx::query(&format!(
        "SELECT {RECORD_COLUMNS} FROM tracker_reliability WHERE normalized_key = ?"
    ))
    .bind(normalized_key)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(record_from_row).transpose()
}

/// Most recently checked trackers first, at most `limit` of them.
pub async fn get_history(
    pool: &SqlitePool,
    limit: u32,
) -> Result<Vec<ReliabilityRecord>, DatabaseError> {
    let rows = sqlx::query(&format!(
        "SELECT {RECORD_COLUMNS} FROM tracker_reliability
         ORDER BY last_checked_at_ms DESC, normalized_key ASC
         LIMIT ?"
    ))
    .bind(i64::from(limit))
    .fetch_all(pool)
    .await?;

    rows.iter().map(record_from_row).collect()
}

/// Trackers with at least `min_checks` checks and a success rate of at least
/// `min_success_rate`, best rate first and then most checks first.
pub async fn query_reliable(
    pool: &SqlitePool,
    min_success_rate: f64,
    min_checks: i64,
) -> Result<Vec<ReliabilityRecord>, DatabaseError> {
    let rows = sqlx::query(&format!(
        "SELECT {RECORD_COLUMNS} FROM tracker_reliability WHERE check_count >= ?"
    ))
    .bind(min_checks)
    .fetch_all(pool)
    .await?;

    let mut records = rows
        .iter()
        .map(record_from_row)
        .collect::<Result<Vec<_>, _>>()?;
    records.retain(|r| r.check_count > 0 && r.success_rate() >= min_success_rate);
    records.sort_by(|a, b| {
        b.success_rate()
            .partial_cmp(&a.success_rate())
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.check_count.cmp(&a.check_count))
    });
    Ok(records)
}

/// Counts every stored tracker by reliability band.
pub async fn band_counts(pool: &SqlitePool) -> Result<BandCounts, DatabaseError> {
    let rows: Vec<(i64, i64)> =
        sqlx::query_as("SELECT check_count, success_count FROM tracker_reliability")
            .fetch_all(pool)
            .await?;

    let mut counts = BandCounts::default();
    for (check_count, success_count) in rows {
        counts.add(ReliabilityBand::classify(check_count, success_count));
    }
    Ok(counts)
}

pub(crate) fn record_from_row(row: &SqliteRow) -> Result<ReliabilityRecord, DatabaseError> {
    Ok(ReliabilityRecord {
        normalized_key: row.try_get("normalized_key")?,
        url: row.try_get("url")?,
        check_count: row.try_get("check_count")?,
        success_count: row.try_get("success_count")?,
        last_response_time: row.try_get("last_response_time")?,
        last_checked_at_ms: row.try_get("last_checked_at_ms")?,
        last_alive: row.try_get("last_alive")?,
    })
}
