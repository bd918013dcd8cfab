//! Two-stage tempo enrichment
//!
//! Every candidate ends in exactly one outcome bucket, and a track both
//! stages miss is counted once.

mod helpers;

use helpers::db_utils::total;
use helpers::{
    catalog_track, create_music_files, create_test_db, music_mapper, seed_track, test_orchestrator,
    FakeFeatures, FakeTempo,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tunegraph_enrich::db::tracks;
use tunegraph_enrich::services::workflow_orchestrator::TempoStats;
use tunegraph_enrich::utils::PacingPolicy;
use tunegraph_enrich::{PacingSet, Providers, RunOptions};

const MBID_A: &str = "a0000000-0000-4000-8000-00000000000a";
const MBID_B: &str = "b0000000-0000-4000-8000-00000000000b";
const MBID_C: &str = "c0000000-0000-4000-8000-00000000000c";

fn tempo_only() -> RunOptions {
    RunOptions {
        skip_identifiers: true,
        skip_fingerprints: true,
        skip_artists: true,
        skip_track_tags: true,
        ..Default::default()
    }
}

struct Library {
    _db_dir: TempDir,
    music_dir: TempDir,
    pool: sqlx::SqlitePool,
    ids: HashMap<&'static str, i64>,
}

/// Five tracks:
/// - A: MBID, remote tempo
/// - B: MBID, no remote tempo, local tempo
/// - C: MBID, no tempo anywhere
/// - D: no MBID, file missing
/// - E: no MBID, local tempo
async fn library() -> Library {
    let (db_dir, pool) = create_test_db().await.unwrap();
    let music_dir = TempDir::new().unwrap();

    let entries = [
        ("A", catalog_track("1", "Kyuss", "A", 0), Some(MBID_A)),
        ("B", catalog_track("2", "Kyuss", "B", 1), Some(MBID_B)),
        ("C", catalog_track("3", "Kyuss", "C", 2), Some(MBID_C)),
        ("D", catalog_track("4", "Sleep", "D", 3), None),
        ("E", catalog_track("5", "Sleep", "E", 4), None),
    ];

    let with_files: Vec<_> = entries
        .iter()
        .filter(|(key, _, _)| *key != "D")
        .map(|(_, track, _)| track)
        .collect();
    create_music_files(music_dir.path(), &with_files);

    let mut ids = HashMap::new();
    for (key, track, mbid) in &entries {
        let (track_id, _) = seed_track(&pool, track).await;
        if let Some(mbid) = mbid {
            tracks::set_track_mbid_if_empty(&pool, track_id, mbid).await.unwrap();
        }
        ids.insert(*key, track_id);
    }

    Library {
        _db_dir: db_dir,
        music_dir,
        pool,
        ids,
    }
}

fn features() -> FakeFeatures {
    FakeFeatures {
        tempos: HashMap::from([(MBID_A.to_string(), 120.4)]),
        ..Default::default()
    }
}

fn local() -> FakeTempo {
    FakeTempo {
        tempos: HashMap::from([("B.flac".to_string(), 95.0), ("E.flac".to_string(), 140.0)]),
        ..Default::default()
    }
}

fn assert_buckets_partition(stats: &TempoStats) {
    assert_eq!(
        stats.resolved_remote + stats.resolved_local + stats.misses + stats.failures + stats.write_failures,
        stats.total,
        "buckets must partition the work set: {:?}",
        stats
    );
    assert!(stats.resolved_remote + stats.resolved_local <= stats.hits());
}

async fn bpm(lib: &Library, key: &str) -> Option<i64> {
    tracks::load_track(&lib.pool, lib.ids[key]).await.unwrap().unwrap().bpm
}

#[tokio::test]
async fn test_remote_then_local() {
    let lib = library().await;
    let features = Arc::new(features());
    let local = Arc::new(local());

    let report = test_orchestrator(
        &lib.pool,
        Providers {
            features: Some(features.clone()),
            tempo: Some(local.clone()),
            ..Default::default()
        },
    )
    .with_path_mapper(Some(music_mapper(lib.music_dir.path())))
    .with_options(tempo_only())
    .run_incremental(None)
    .await
    .unwrap();

    let stats = &report.tempo.stats;
    assert_eq!(stats.total, 5);
    assert_eq!(stats.remote_queried, 3);
    assert_eq!(stats.resolved_remote, 1);
    assert_eq!(stats.resolved_local, 2);
    assert_eq!(stats.misses, 1, "C is missed by both stages but counted once");
    assert_eq!(stats.failures, 1);
    assert_eq!(stats.inaccessible, 1);
    assert_eq!(stats.local_attempted, 3);
    assert_buckets_partition(stats);

    assert_eq!(total(&features.bulk_calls), 1);
    assert_eq!(total(&features.single_calls), 0);

    assert_eq!(bpm(&lib, "A").await, Some(120));
    assert_eq!(bpm(&lib, "B").await, Some(95));
    assert_eq!(bpm(&lib, "C").await, None);
    assert_eq!(bpm(&lib, "D").await, None);
    assert_eq!(bpm(&lib, "E").await, Some(140));
}

#[tokio::test]
async fn test_rerun_only_visits_unresolved() {
    let lib = library().await;
    let orchestrator = test_orchestrator(
        &lib.pool,
        Providers {
            features: Some(Arc::new(features())),
            tempo: Some(Arc::new(local())),
            ..Default::default()
        },
    )
    .with_path_mapper(Some(music_mapper(lib.music_dir.path())))
    .with_options(tempo_only());

    orchestrator.run_incremental(None).await.unwrap();
    let second = orchestrator.run_incremental(None).await.unwrap();

    assert_eq!(second.tempo.stats.total, 2);
    assert_eq!(second.tempo.stats.resolved_remote + second.tempo.stats.resolved_local, 0);
}

#[tokio::test]
async fn test_failed_bulk_falls_back_to_single_lookups() {
    let lib = library().await;
    let features = Arc::new(FakeFeatures {
        bulk_fails: true,
        ..features()
    });

    let report = test_orchestrator(
        &lib.pool,
        Providers {
            features: Some(features.clone()),
            tempo: Some(Arc::new(local())),
            ..Default::default()
        },
    )
    .with_path_mapper(Some(music_mapper(lib.music_dir.path())))
    .with_options(tempo_only())
    .run_incremental(None)
    .await
    .unwrap();

    assert_eq!(total(&features.single_calls), 3);
    assert_eq!(report.tempo.stats.resolved_remote, 1);
    assert_eq!(report.tempo.stats.resolved_local, 2);
    assert_buckets_partition(&report.tempo.stats);
}

#[tokio::test]
async fn test_local_stage_alone_without_feature_lookup() {
    let lib = library().await;
    let local = Arc::new(local());

    let report = test_orchestrator(
        &lib.pool,
        Providers {
            tempo: Some(local.clone()),
            ..Default::default()
        },
    )
    .with_path_mapper(Some(music_mapper(lib.music_dir.path())))
    .with_options(tempo_only())
    .run_incremental(None)
    .await
    .unwrap();

    let stats = &report.tempo.stats;
    assert!(stats.remote_skipped.is_some());
    assert_eq!(stats.remote_queried, 0);
    assert_eq!(stats.resolved_local, 2);
    assert_eq!(stats.local_attempted, 4);
    assert_eq!(stats.misses, 2);
    assert_eq!(stats.failures, 1);
    assert_buckets_partition(stats);
}

#[tokio::test]
async fn test_remote_stage_alone_without_extractor() {
    let lib = library().await;

    let report = test_orchestrator(
        &lib.pool,
        Providers {
            features: Some(Arc::new(features())),
            ..Default::default()
        },
    )
    .with_path_mapper(Some(music_mapper(lib.music_dir.path())))
    .with_options(tempo_only())
    .run_incremental(None)
    .await
    .unwrap();

    let stats = &report.tempo.stats;
    assert!(stats.local_skipped.is_some());
    assert_eq!(stats.resolved_remote, 1);
    assert_eq!(stats.local_attempted, 0);
    assert_eq!(stats.misses, 4);
    assert_buckets_partition(stats);
    assert!(!report.tempo.is_skipped(), "the phase itself still ran");
}

#[tokio::test]
async fn test_local_batches_cool_down_and_skip_missing_files() {
    let lib = library().await;
    let local = Arc::new(local());
    let cooldown = Duration::from_millis(300);

    let report = test_orchestrator(
        &lib.pool,
        Providers {
            tempo: Some(local.clone()),
            ..Default::default()
        },
    )
    .with_path_mapper(Some(music_mapper(lib.music_dir.path())))
    .with_pacing(PacingSet {
        local_tempo: PacingPolicy {
            interval: Duration::ZERO,
            batch_size: 2,
            cooldown,
        },
        ..PacingSet::unpaced()
    })
    .with_options(tempo_only())
    .run_incremental(None)
    .await
    .unwrap();

    assert_eq!(report.tempo.stats.local_attempted, 4);
    assert_eq!(report.tempo.stats.inaccessible, 1);

    let names: Vec<_> = local
        .paths
        .lock()
        .unwrap()
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
        .collect();
    assert_eq!(names, vec!["A.flac", "B.flac", "C.flac", "E.flac"]);

    // Batches [A, B] and [C, E]: D's missing file does not fill a batch slot
    let started = local.started.lock().unwrap();
    let gaps: Vec<Duration> = started.windows(2).map(|w| w[1] - w[0]).collect();
    let cooled: Vec<bool> = gaps.iter().map(|gap| *gap >= cooldown).collect();
    assert_eq!(cooled, vec![false, true, false], "gaps between calls: {:?}", gaps);
}
