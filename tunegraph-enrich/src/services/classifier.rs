//! Enrichment classifier
//!
//! Derives each phase's work set from current store state. Pure reads: nothing
//! here writes, and a failed query is returned to the caller instead of being
//! turned into an empty set.

use crate::db::artists::{self, ArtistRecord};
use crate::db::tracks::{self, TrackRecord};
use anyhow::{Context, Result};
use sqlx::SqlitePool;

/// Which entities a phase should consider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkScope {
    /// Only entities not yet attempted (incremental runs)
    Pending,
    /// Everything eligible, ignoring attempt markers (full runs)
    All,
}

/// Work sets for one run
#[derive(Debug, Clone, Default)]
pub struct WorkSets {
    /// Tracks without MBID that have a file locator
    pub tracks_needing_ids: Vec<TrackRecord>,
    /// Artists without MBID that have at least one track file
    pub artists_needing_ids: Vec<ArtistRecord>,
    /// Track-bearing artists for full enrichment
    pub primary_artists: Vec<ArtistRecord>,
    /// Track-less artists for core enrichment
    pub stub_artists: Vec<ArtistRecord>,
    /// Tracks whose tempo is unknown or non-positive
    pub tracks_needing_tempo: Vec<TrackRecord>,
}

impl WorkSets {
    pub fn is_empty(&self) -> bool {
        self.tracks_needing_ids.is_empty()
            && self.artists_needing_ids.is_empty()
            && self.primary_artists.is_empty()
            && self.stub_artists.is_empty()
            && self.tracks_needing_tempo.is_empty()
    }
}

pub async fn tracks_needing_identifiers(pool: &SqlitePool) -> Result<Vec<TrackRecord>> {
    tracks::tracks_missing_mbid(pool)
        .await
        .context("Failed to classify tracks needing identifiers")
}

pub async fn artists_needing_identifiers(pool: &SqlitePool) -> Result<Vec<ArtistRecord>> {
    artists::artists_missing_mbid_with_files(pool)
        .await
        .context("Failed to classify artists needing identifiers")
}

pub async fn primary_artists_for_enrichment(
    pool: &SqlitePool,
    scope: WorkScope,
) -> Result<Vec<ArtistRecord>> {
    artists::primary_artists(pool, scope == WorkScope::Pending)
        .await
        .context("Failed to classify primary artists")
}

pub async fn stub_artists_for_enrichment(
    pool: &SqlitePool,
    scope: WorkScope,
) -> Result<Vec<ArtistRecord>> {
    artists::stub_artists(pool, scope == WorkScope::Pending)
        .await
        .context("Failed to classify stub artists")
}

pub async fn tracks_needing_tempo(pool: &SqlitePool) -> Result<Vec<TrackRecord>> {
    tracks::tracks_missing_bpm(pool)
        .await
        .context("Failed to classify tracks needing tempo")
}

/// Compute every work set from the current store state
pub async fn classify(pool: &SqlitePool, scope: WorkScope) -> Result<WorkSets> {
    let sets = WorkSets {
        tracks_needing_ids: tracks_needing_identifiers(pool).await?,
        artists_needing_ids: artists_needing_identifiers(pool).await?,
        primary_artists: primary_artists_for_enrichment(pool, scope).await?,
        stub_artists: stub_artists_for_enrichment(pool, scope).await?,
        tracks_needing_tempo: tracks_needing_tempo(pool).await?,
    };

    Ok(sets)
}
