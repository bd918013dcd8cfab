//! Run records
//!
//! One row per orchestrator execution. The newest catalog entry seen by a run
//! becomes the cutoff of the next incremental run.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub id: i64,
    pub ran_at: String,
    /// "full" or "incremental"
    pub mode: String,
    /// Absent for full runs
    pub cutoff: Option<String>,
    pub new_tracks: i64,
    pub latest_entry_at: Option<String>,
}

/// Newest catalog timestamp recorded by any previous run
pub async fn latest_cutoff(pool: &SqlitePool) -> Result<Option<DateTime<Utc>>> {
    let latest: Option<String> = sqlx::query_scalar("SELECT MAX(latest_entry_at) FROM run_history")
        .fetch_one(pool)
        .await?;

    Ok(latest.as_deref().and_then(super::parse_timestamp))
}

/// Append a run record, returning its id
pub async fn append_run_record(
    pool: &SqlitePool,
    mode: &str,
    cutoff: Option<DateTime<Utc>>,
    new_tracks: usize,
    latest_entry_at: Option<DateTime<Utc>>,
) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO run_history (ran_at, mode, cutoff, new_tracks, latest_entry_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(super::format_timestamp(Utc::now()))
    .bind(mode)
    .bind(cutoff.map(super::format_timestamp))
    .bind(new_tracks as i64)
    .bind(latest_entry_at.map(super::format_timestamp))
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Most recent run, if any
pub async fn last_run(pool: &SqlitePool) -> Result<Option<RunRecord>> {
    let row = sqlx::query(
        r#"
        SELECT id, ran_at, mode, cutoff, new_tracks, latest_entry_at
        FROM run_history
        ORDER BY id DESC
        LIMIT 1
        "#,
    )
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => Ok(Some(RunRecord {
            id: row.try_get("id")?,
            ran_at: row.try_get("ran_at")?,
            mode: row.try_get("mode")?,
            cutoff: row.try_get("cutoff")?,
            new_tracks: row.try_get("new_tracks")?,
            latest_entry_at: row.try_get("latest_entry_at")?,
        })),
        None => Ok(None),
    }
}
