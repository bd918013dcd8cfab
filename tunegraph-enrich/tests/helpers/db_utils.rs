//! Database Test Utilities

use super::fakes::Calls;
use anyhow::Result;
use chrono::{DateTime, TimeZone, Utc};
use sqlx::SqlitePool;
use tempfile::TempDir;
use tunegraph_enrich::db::{artists, tracks};
use tunegraph_enrich::types::CatalogTrack;
use tunegraph_enrich::{EnrichmentOrchestrator, PacingSet, Providers};

/// Create temporary test database with the schema applied
///
/// Returns (TempDir, SqlitePool) - TempDir must be kept alive for duration of test
pub async fn create_test_db() -> Result<(TempDir, SqlitePool)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test_tunegraph.db");

    let pool = tunegraph_common::db::init_database(&db_path).await?;

    Ok((temp_dir, pool))
}

/// Catalog entry added `day` days after 2023-01-01
pub fn catalog_track(catalog_id: &str, artist: &str, title: &str, day: i64) -> CatalogTrack {
    CatalogTrack {
        catalog_id: catalog_id.to_string(),
        title: title.to_string(),
        artist: artist.to_string(),
        album: None,
        genres: Vec::new(),
        added_at: added_at(day),
        file_path: Some(format!("/data/music/{}/{}.flac", artist, title)),
    }
}

pub fn added_at(day: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::days(day)
}

/// Insert a track and its artist directly, returning (track_id, artist_id)
pub async fn seed_track(pool: &SqlitePool, track: &CatalogTrack) -> (i64, i64) {
    let (artist_id, _) = artists::ensure_artist(pool, &track.artist).await.unwrap();
    let track_id = tracks::insert_track_if_new(pool, track, artist_id)
        .await
        .unwrap()
        .expect("track should be new");
    (track_id, artist_id)
}

/// Orchestrator over the given providers with every wait removed
pub fn test_orchestrator(pool: &SqlitePool, providers: Providers) -> EnrichmentOrchestrator {
    EnrichmentOrchestrator::new(pool.clone(), providers).with_pacing(PacingSet::unpaced())
}

/// Total calls made against a fake
pub fn total(calls: &Calls) -> usize {
    calls.load(std::sync::atomic::Ordering::SeqCst)
}

/// Create local copies of the tracks' files under `root`, mirroring the
/// catalog layout below `/data/music`
pub fn create_music_files(root: &std::path::Path, tracks: &[&CatalogTrack]) {
    let mapper = music_mapper(root);
    for track in tracks {
        let path = track
            .file_path
            .as_deref()
            .and_then(|p| mapper.map(p))
            .expect("track path under /data/music");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"not really audio").unwrap();
    }
}

/// Mapper from the catalog's `/data/music` to a local test root
pub fn music_mapper(root: &std::path::Path) -> tunegraph_enrich::utils::PathMapper {
    tunegraph_enrich::utils::PathMapper::new("/data/music", root)
}
