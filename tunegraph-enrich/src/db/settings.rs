//! Settings table accessors
//!
//! Operator-managed key/value pairs. Credentials stored here take priority
//! over environment variables and the TOML file.

use sqlx::SqlitePool;
use tunegraph_common::{Error, Result};

pub const LASTFM_API_KEY: &str = "lastfm_api_key";
pub const ACOUSTID_API_KEY: &str = "acoustid_api_key";
pub const PLEX_TOKEN: &str = "plex_token";

/// Read a setting value, `None` if unset or NULL
pub async fn get_setting(db: &SqlitePool, key: &str) -> Result<Option<String>> {
    let row: Option<(Option<String>,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(db)
        .await
        .map_err(Error::Database)?;

    Ok(row.and_then(|(value,)| value))
}

/// Insert or replace a setting value
pub async fn set_setting(db: &SqlitePool, key: &str, value: &str) -> Result<()> {
    sqlx::query(
        "INSERT INTO settings (key, value) VALUES (?, ?)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP",
    )
    .bind(key)
    .bind(value)
    .execute(db)
    .await
    .map_err(Error::Database)?;

    Ok(())
}
