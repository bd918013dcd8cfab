//! Library status report
//!
//! Read-only counts describing how far enrichment has progressed.

use super::history::{self, RunRecord};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LibraryStatus {
    pub total_tracks: i64,
    pub tracks_with_mbid: i64,
    pub tracks_with_fingerprint: i64,
    pub tracks_with_bpm: i64,
    pub tracks_with_genres: i64,
    pub total_artists: i64,
    pub artists_with_mbid: i64,
    pub primary_artists: i64,
    pub stub_artists: i64,
    /// Primary artists never attempted by social-metadata enrichment
    pub pending_primary_artists: i64,
    pub pending_stub_artists: i64,
    pub similarity_edges: i64,
    pub genres: i64,
    pub last_run: Option<RunRecord>,
}

impl LibraryStatus {
    pub fn display_string(&self) -> String {
        format!(
            "{} tracks ({} with MBID, {} with BPM, {} with genres), {} artists ({} primary, {} stub, {} pending), {} similarity edges",
            self.total_tracks,
            self.tracks_with_mbid,
            self.tracks_with_bpm,
            self.tracks_with_genres,
            self.total_artists,
            self.primary_artists,
            self.stub_artists,
            self.pending_primary_artists + self.pending_stub_artists,
            self.similarity_edges,
        )
    }
}

async fn count(pool: &SqlitePool, sql: &str) -> Result<i64> {
    let n: i64 = sqlx::query_scalar(sql).fetch_one(pool).await?;
    Ok(n)
}

/// Gather enrichment progress counts
pub async fn check_status(pool: &SqlitePool) -> Result<LibraryStatus> {
    const PRIMARY: &str = "EXISTS (SELECT 1 FROM tracks t WHERE t.artist_id = a.id)";

    Ok(LibraryStatus {
        total_tracks: count(pool, "SELECT COUNT(*) FROM tracks").await?,
        tracks_with_mbid: count(
            pool,
            "SELECT COUNT(*) FROM tracks WHERE musicbrainz_id IS NOT NULL AND musicbrainz_id != ''",
        )
        .await?,
        tracks_with_fingerprint: count(
            pool,
            "SELECT COUNT(*) FROM tracks WHERE acoustid_id IS NOT NULL AND acoustid_id != ''",
        )
        .await?,
        tracks_with_bpm: count(pool, "SELECT COUNT(*) FROM tracks WHERE bpm > 0").await?,
        tracks_with_genres: count(pool, "SELECT COUNT(DISTINCT track_id) FROM track_genres").await?,
        total_artists: count(pool, "SELECT COUNT(*) FROM artists").await?,
        artists_with_mbid: count(
            pool,
            "SELECT COUNT(*) FROM artists WHERE musicbrainz_id IS NOT NULL AND musicbrainz_id != ''",
        )
        .await?,
        primary_artists: count(pool, &format!("SELECT COUNT(*) FROM artists a WHERE {}", PRIMARY)).await?,
        stub_artists: count(pool, &format!("SELECT COUNT(*) FROM artists a WHERE NOT {}", PRIMARY)).await?,
        pending_primary_artists: count(
            pool,
            &format!(
                "SELECT COUNT(*) FROM artists a WHERE {} AND a.enrichment_attempted_at IS NULL",
                PRIMARY
            ),
        )
        .await?,
        pending_stub_artists: count(
            pool,
            &format!(
                "SELECT COUNT(*) FROM artists a WHERE NOT {} AND a.enrichment_attempted_at IS NULL",
                PRIMARY
            ),
        )
        .await?,
        similarity_edges: count(pool, "SELECT COUNT(*) FROM similar_artists").await?,
        genres: count(pool, "SELECT COUNT(*) FROM genres").await?,
        last_run: history::last_run(pool).await?,
    })
}
