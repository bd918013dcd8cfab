//! Artist database operations
//!
//! Artists are identified by their lowercased name (`name_key`), so "MÖTLEY
//! CRÜE" from the catalog and "Mötley Crüe" from a similarity answer are one
//! node.
//! An artist with at least one track is *primary*; one with none is a *stub*.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

/// Artist row
#[derive(Debug, Clone, PartialEq)]
pub struct ArtistRecord {
    pub id: i64,
    pub name: String,
    pub musicbrainz_id: Option<String>,
    /// Last social-metadata enrichment attempt, regardless of outcome
    pub enrichment_attempted_at: Option<String>,
}

impl ArtistRecord {
    fn from_row(row: &SqliteRow) -> Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            musicbrainz_id: row.try_get("musicbrainz_id")?,
            enrichment_attempted_at: row.try_get("enrichment_attempted_at")?,
        })
    }

    pub fn mbid(&self) -> Option<&str> {
        self.musicbrainz_id.as_deref().filter(|m| !m.trim().is_empty())
    }
}

/// Identity key of an artist name: trimmed and Unicode-lowercased
pub fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

async fn fetch_artists(pool: &SqlitePool, sql: &str) -> Result<Vec<ArtistRecord>> {
    let rows = sqlx::query(sql).fetch_all(pool).await?;
    rows.iter().map(ArtistRecord::from_row).collect()
}

/// Find an artist by name, ignoring case
pub async fn find_artist_by_name(pool: &SqlitePool, name: &str) -> Result<Option<ArtistRecord>> {
    let row = sqlx::query(
        r#"
        SELECT id, name, musicbrainz_id, enrichment_attempted_at
        FROM artists
        WHERE name_key = ?
        "#,
    )
    .bind(name_key(name))
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(ArtistRecord::from_row).transpose()
}

pub async fn load_artist(pool: &SqlitePool, artist_id: i64) -> Result<Option<ArtistRecord>> {
    let row = sqlx::query(
        "SELECT id, name, musicbrainz_id, enrichment_attempted_at FROM artists WHERE id = ?",
    )
    .bind(artist_id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(ArtistRecord::from_row).transpose()
}

/// Find-or-create an artist by name
///
/// Returns the artist id and whether a new row was created. New artists start
/// with no MBID and no enrichment attempt.
pub async fn ensure_artist(pool: &SqlitePool, name: &str) -> Result<(i64, bool)> {
    let name = name.trim();
    let key = name_key(name);

    let result = sqlx::query("INSERT INTO artists (name, name_key) VALUES (?, ?) ON CONFLICT(name_key) DO NOTHING")
        .bind(name)
        .bind(&key)
        .execute(pool)
        .await?;
    let created = result.rows_affected() > 0;

    let id: i64 = sqlx::query_scalar("SELECT id FROM artists WHERE name_key = ?")
        .bind(&key)
        .fetch_one(pool)
        .await
        .with_context(|| format!("artist '{}' missing after insert", name))?;

    Ok((id, created))
}

/// Artists linked to at least one track
///
/// With `pending_only`, only those never attempted by social-metadata
/// enrichment.
pub async fn primary_artists(pool: &SqlitePool, pending_only: bool) -> Result<Vec<ArtistRecord>> {
    let guard = if pending_only {
        "WHERE a.enrichment_attempted_at IS NULL"
    } else {
        ""
    };
    let sql = format!(
        r#"
        SELECT DISTINCT a.id, a.name, a.musicbrainz_id, a.enrichment_attempted_at
        FROM artists a
        INNER JOIN tracks t ON t.artist_id = a.id
        {}
        ORDER BY a.id
        "#,
        guard
    );

    fetch_artists(pool, &sql).await
}

/// Artists with no tracks (graph nodes created by similarity expansion)
pub async fn stub_artists(pool: &SqlitePool, pending_only: bool) -> Result<Vec<ArtistRecord>> {
    let guard = if pending_only {
        "AND a.enrichment_attempted_at IS NULL"
    } else {
        ""
    };
    let sql = format!(
        r#"
        SELECT a.id, a.name, a.musicbrainz_id, a.enrichment_attempted_at
        FROM artists a
        WHERE NOT EXISTS (SELECT 1 FROM tracks t WHERE t.artist_id = a.id)
        {}
        ORDER BY a.id
        "#,
        guard
    );

    fetch_artists(pool, &sql).await
}

/// Primary artists without MBID whose tracks have file locators
pub async fn artists_missing_mbid_with_files(pool: &SqlitePool) -> Result<Vec<ArtistRecord>> {
    fetch_artists(
        pool,
        r#"
        SELECT a.id, a.name, a.musicbrainz_id, a.enrichment_attempted_at
        FROM artists a
        WHERE (a.musicbrainz_id IS NULL OR a.musicbrainz_id = '')
          AND EXISTS (
              SELECT 1 FROM tracks t
              WHERE t.artist_id = a.id AND t.file_path IS NOT NULL AND t.file_path != ''
          )
        ORDER BY a.id
        "#,
    )
    .await
}

/// Catalog file paths of an artist's tracks, oldest track first
pub async fn track_paths_for_artist(pool: &SqlitePool, artist_id: i64) -> Result<Vec<String>> {
    let paths: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT file_path FROM tracks
        WHERE artist_id = ? AND file_path IS NOT NULL AND file_path != ''
        ORDER BY id
        "#,
    )
    .bind(artist_id)
    .fetch_all(pool)
    .await?;

    Ok(paths)
}

/// Set the artist MBID only if none is stored yet
pub async fn set_artist_mbid_if_empty(pool: &SqlitePool, artist_id: i64, mbid: &str) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE artists SET musicbrainz_id = ?, updated_at = CURRENT_TIMESTAMP
        WHERE id = ? AND (musicbrainz_id IS NULL OR musicbrainz_id = '')
        "#,
    )
    .bind(mbid)
    .bind(artist_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Replace the artist MBID unconditionally (refresh only)
pub async fn overwrite_artist_mbid(pool: &SqlitePool, artist_id: i64, mbid: &str) -> Result<()> {
    sqlx::query("UPDATE artists SET musicbrainz_id = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?")
        .bind(mbid)
        .bind(artist_id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Record a social-metadata enrichment attempt
pub async fn mark_enrichment_attempted(
    pool: &SqlitePool,
    artist_id: i64,
    at: DateTime<Utc>,
) -> Result<()> {
    sqlx::query("UPDATE artists SET enrichment_attempted_at = ? WHERE id = ?")
        .bind(super::format_timestamp(at))
        .bind(artist_id)
        .execute(pool)
        .await?;

    Ok(())
}
