// storage/migrations.rs
// Schema creation for the reliability database

use sqlx::SqlitePool;

use crate::error_handling::DatabaseError;

/// Schema statements, applied in order. Each one is idempotent.
const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS tracker_reliability (
        normalized_key TEXT PRIMARY KEY NOT NULL,
        url TEXT NOT NULL,
        check_count INTEGER NOT NULL DEFAULT 0,
        success_count INTEGER NOT NULL DEFAULT 0,
        last_response_time REAL,
        last_checked_at_ms INTEGER NOT NULL,
        last_alive INTEGER NOT NULL DEFAULT 0
    )",
    "CREATE INDEX IF NOT EXISTS idx_tracker_reliability_last_checked
        ON tracker_reliability (last_checked_at_ms DESC)",
    "CREATE TABLE IF NOT EXISTS tracker_favorites (
        normalized_key TEXT PRIMARY KEY NOT NULL,
        url TEXT NOT NULL,
        note TEXT,
        added_at_ms INTEGER NOT NULL
    )",
];

/// Creates the reliability and favorites tables if they don't exist yet.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), DatabaseError> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}
