//! Track database operations
//!
//! Tracks enter the store from the media catalog and are then enriched in
//! place. A recording MBID, once set, is only replaced through
//! [`overwrite_track_mbid`], which the default passes never call.

use crate::types::CatalogTrack;
use anyhow::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

/// Track row joined with its artist name
#[derive(Debug, Clone, PartialEq)]
pub struct TrackRecord {
    pub id: i64,
    pub catalog_id: String,
    pub title: String,
    pub artist_id: Option<i64>,
    pub artist_name: Option<String>,
    pub album: Option<String>,
    pub file_path: Option<String>,
    pub added_at: Option<String>,
    pub musicbrainz_id: Option<String>,
    pub acoustid_id: Option<String>,
    pub bpm: Option<i64>,
}

impl TrackRecord {
    fn from_row(row: &SqliteRow) -> Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            catalog_id: row.try_get("catalog_id")?,
            title: row.try_get("title")?,
            artist_id: row.try_get("artist_id")?,
            artist_name: row.try_get("artist_name")?,
            album: row.try_get("album")?,
            file_path: row.try_get("file_path")?,
            added_at: row.try_get("added_at")?,
            musicbrainz_id: row.try_get("musicbrainz_id")?,
            acoustid_id: row.try_get("acoustid_id")?,
            bpm: row.try_get("bpm")?,
        })
    }

    /// Recording MBID if present and non-empty
    pub fn mbid(&self) -> Option<&str> {
        self.musicbrainz_id.as_deref().filter(|m| !m.trim().is_empty())
    }
}

const SELECT_TRACKS: &str = r#"
    SELECT t.id, t.catalog_id, t.title, t.artist_id, a.name AS artist_name,
           t.album, t.file_path, t.added_at, t.musicbrainz_id, t.acoustid_id, t.bpm
    FROM tracks t
    LEFT JOIN artists a ON a.id = t.artist_id
"#;

async fn fetch_tracks(pool: &SqlitePool, filter: &str) -> Result<Vec<TrackRecord>> {
    let sql = format!("{} {} ORDER BY t.id", SELECT_TRACKS, filter);
    let rows = sqlx::query(&sql).fetch_all(pool).await?;
    rows.iter().map(TrackRecord::from_row).collect()
}

/// Look up the internal id of a catalog track
pub async fn find_track_id(pool: &SqlitePool, catalog_id: &str) -> Result<Option<i64>> {
    let id: Option<i64> = sqlx::query_scalar("SELECT id FROM tracks WHERE catalog_id = ?")
        .bind(catalog_id)
        .fetch_optional(pool)
        .await?;

    Ok(id)
}

/// Insert a catalog track unless its catalog id is already known
///
/// Returns the new internal id, or `None` for a duplicate.
pub async fn insert_track_if_new(
    pool: &SqlitePool,
    track: &CatalogTrack,
    artist_id: i64,
) -> Result<Option<i64>> {
    let result = sqlx::query(
        r#"
        INSERT INTO tracks (catalog_id, title, artist_id, album, file_path, added_at)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(catalog_id) DO NOTHING
        "#,
    )
    .bind(&track.catalog_id)
    .bind(&track.title)
    .bind(artist_id)
    .bind(&track.album)
    .bind(&track.file_path)
    .bind(super::format_timestamp(track.added_at))
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        Ok(None)
    } else {
        Ok(Some(result.last_insert_rowid()))
    }
}

/// Refresh the catalog-owned fields of an existing track
///
/// Enrichment results (MBID, fingerprint id, tempo) are left alone.
pub async fn refresh_catalog_fields(
    pool: &SqlitePool,
    track_id: i64,
    track: &CatalogTrack,
    artist_id: i64,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE tracks
        SET title = ?, artist_id = ?, album = ?, file_path = ?, added_at = ?,
            updated_at = CURRENT_TIMESTAMP
        WHERE id = ?
        "#,
    )
    .bind(&track.title)
    .bind(artist_id)
    .bind(&track.album)
    .bind(&track.file_path)
    .bind(super::format_timestamp(track.added_at))
    .bind(track_id)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn load_track(pool: &SqlitePool, track_id: i64) -> Result<Option<TrackRecord>> {
    let sql = format!("{} WHERE t.id = ?", SELECT_TRACKS);
    let row = sqlx::query(&sql).bind(track_id).fetch_optional(pool).await?;

    row.as_ref().map(TrackRecord::from_row).transpose()
}

/// Tracks with no recording MBID and a known file locator
pub async fn tracks_missing_mbid(pool: &SqlitePool) -> Result<Vec<TrackRecord>> {
    fetch_tracks(
        pool,
        "WHERE (t.musicbrainz_id IS NULL OR t.musicbrainz_id = '')
           AND t.file_path IS NOT NULL AND t.file_path != ''",
    )
    .await
}

/// Tracks still without MBID that carry an embedded fingerprint id
pub async fn tracks_with_unresolved_fingerprint(pool: &SqlitePool) -> Result<Vec<TrackRecord>> {
    fetch_tracks(
        pool,
        "WHERE (t.musicbrainz_id IS NULL OR t.musicbrainz_id = '')
           AND t.acoustid_id IS NOT NULL AND t.acoustid_id != ''",
    )
    .await
}

/// Tracks whose tempo is unknown or non-positive
pub async fn tracks_missing_bpm(pool: &SqlitePool) -> Result<Vec<TrackRecord>> {
    fetch_tracks(pool, "WHERE t.bpm IS NULL OR t.bpm <= 0").await
}

/// Tracks with no genre association at all
pub async fn tracks_without_genres(pool: &SqlitePool) -> Result<Vec<TrackRecord>> {
    fetch_tracks(
        pool,
        "WHERE NOT EXISTS (SELECT 1 FROM track_genres tg WHERE tg.track_id = t.id)",
    )
    .await
}

/// All tracks linked to an artist
pub async fn tracks_for_artist(pool: &SqlitePool, artist_id: i64) -> Result<Vec<TrackRecord>> {
    let sql = format!("{} WHERE t.artist_id = ? ORDER BY t.id", SELECT_TRACKS);
    let rows = sqlx::query(&sql).bind(artist_id).fetch_all(pool).await?;
    rows.iter().map(TrackRecord::from_row).collect()
}

/// Catalog path of any one track, for environment checks
pub async fn sample_file_path(pool: &SqlitePool) -> Result<Option<String>> {
    let path: Option<String> = sqlx::query_scalar(
        "SELECT file_path FROM tracks WHERE file_path IS NOT NULL AND file_path != '' ORDER BY id LIMIT 1",
    )
    .fetch_optional(pool)
    .await?;
    Ok(path)
}

/// Set the recording MBID only if none is stored yet
///
/// Returns whether the row changed.
pub async fn set_track_mbid_if_empty(pool: &SqlitePool, track_id: i64, mbid: &str) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE tracks SET musicbrainz_id = ?, updated_at = CURRENT_TIMESTAMP
        WHERE id = ? AND (musicbrainz_id IS NULL OR musicbrainz_id = '')
        "#,
    )
    .bind(mbid)
    .bind(track_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Replace the recording MBID unconditionally (refresh only)
pub async fn overwrite_track_mbid(pool: &SqlitePool, track_id: i64, mbid: &str) -> Result<()> {
    sqlx::query("UPDATE tracks SET musicbrainz_id = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?")
        .bind(mbid)
        .bind(track_id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Record the embedded fingerprint id if none is stored yet
pub async fn set_track_acoustid_if_empty(
    pool: &SqlitePool,
    track_id: i64,
    acoustid_id: &str,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE tracks SET acoustid_id = ?, updated_at = CURRENT_TIMESTAMP
        WHERE id = ? AND (acoustid_id IS NULL OR acoustid_id = '')
        "#,
    )
    .bind(acoustid_id)
    .bind(track_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Store a tempo estimate, rounded to whole beats per minute
pub async fn set_track_bpm(pool: &SqlitePool, track_id: i64, bpm: f64) -> Result<()> {
    sqlx::query("UPDATE tracks SET bpm = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?")
        .bind(bpm.round() as i64)
        .bind(track_id)
        .execute(pool)
        .await?;

    Ok(())
}
