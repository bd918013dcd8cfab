//! Store-level behavior: classification, idempotent writes, status

mod helpers;

use chrono::Utc;
use helpers::{catalog_track, create_test_db, seed_track};
use tunegraph_enrich::db::{artists, genres, history, similar, status, tracks};
use tunegraph_enrich::services::classifier::{self, WorkScope};

#[tokio::test]
async fn test_artist_names_unique_ignoring_case() {
    let (_temp_dir, pool) = create_test_db().await.unwrap();

    let (id, created) = artists::ensure_artist(&pool, "AC/DC").await.unwrap();
    assert!(created);
    let (again, created_again) = artists::ensure_artist(&pool, "ac/dc").await.unwrap();
    assert!(!created_again);
    assert_eq!(id, again);
}

#[tokio::test]
async fn test_artist_names_unique_ignoring_non_ascii_case() {
    let (_temp_dir, pool) = create_test_db().await.unwrap();

    let (id, _) = artists::ensure_artist(&pool, "MÖTLEY CRÜE").await.unwrap();
    let (again, created_again) = artists::ensure_artist(&pool, " Mötley Crüe").await.unwrap();
    assert!(!created_again);
    assert_eq!(id, again);

    let found = artists::find_artist_by_name(&pool, "mötley crüe").await.unwrap().unwrap();
    assert_eq!(found.id, id);
    assert_eq!(found.name, "MÖTLEY CRÜE");
}

#[tokio::test]
async fn test_classifier_splits_primary_and_stub_artists() {
    let (_temp_dir, pool) = create_test_db().await.unwrap();
    let (track_id, sabbath) = seed_track(&pool, &catalog_track("1", "Black Sabbath", "Paranoid", 0)).await;
    let (dio, _) = artists::ensure_artist(&pool, "Dio").await.unwrap();

    let sets = classifier::classify(&pool, WorkScope::Pending).await.unwrap();
    assert_eq!(sets.primary_artists.iter().map(|a| a.id).collect::<Vec<_>>(), vec![sabbath]);
    assert_eq!(sets.stub_artists.iter().map(|a| a.id).collect::<Vec<_>>(), vec![dio]);
    assert_eq!(sets.tracks_needing_ids.len(), 1);
    assert_eq!(sets.artists_needing_ids.len(), 1);
    assert_eq!(sets.tracks_needing_tempo.len(), 1);

    artists::mark_enrichment_attempted(&pool, sabbath, Utc::now()).await.unwrap();
    artists::mark_enrichment_attempted(&pool, dio, Utc::now()).await.unwrap();
    tracks::set_track_bpm(&pool, track_id, 128.0).await.unwrap();
    tracks::set_track_mbid_if_empty(&pool, track_id, "8f3471b5-7e6a-48da-86a9-c1c07a0f47ae")
        .await
        .unwrap();
    artists::set_artist_mbid_if_empty(&pool, sabbath, "5182c1d9-c7d2-4dad-afa0-ccfeada921a8")
        .await
        .unwrap();

    let pending = classifier::classify(&pool, WorkScope::Pending).await.unwrap();
    assert!(pending.is_empty(), "nothing left: {:?}", pending);

    let all = classifier::classify(&pool, WorkScope::All).await.unwrap();
    assert_eq!(all.primary_artists.len(), 1);
    assert_eq!(all.stub_artists.len(), 1);
}

#[tokio::test]
async fn test_non_positive_tempo_counts_as_missing() {
    let (_temp_dir, pool) = create_test_db().await.unwrap();
    let (track_id, _) = seed_track(&pool, &catalog_track("1", "Sleep", "Dragonaut", 0)).await;

    tracks::set_track_bpm(&pool, track_id, 0.0).await.unwrap();
    assert_eq!(classifier::tracks_needing_tempo(&pool).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_write_once_mbid() {
    let (_temp_dir, pool) = create_test_db().await.unwrap();
    let (track_id, _) = seed_track(&pool, &catalog_track("1", "Sleep", "Dragonaut", 0)).await;

    let first = "11111111-1111-4111-8111-111111111111";
    let second = "22222222-2222-4222-8222-222222222222";
    assert!(tracks::set_track_mbid_if_empty(&pool, track_id, first).await.unwrap());
    assert!(!tracks::set_track_mbid_if_empty(&pool, track_id, second).await.unwrap());

    let track = tracks::load_track(&pool, track_id).await.unwrap().unwrap();
    assert_eq!(track.mbid(), Some(first));

    tracks::overwrite_track_mbid(&pool, track_id, second).await.unwrap();
    let track = tracks::load_track(&pool, track_id).await.unwrap().unwrap();
    assert_eq!(track.mbid(), Some(second));
}

#[tokio::test]
async fn test_links_are_idempotent() {
    let (_temp_dir, pool) = create_test_db().await.unwrap();
    let (_, a) = seed_track(&pool, &catalog_track("1", "Kyuss", "Gardenia", 0)).await;
    let (b, _) = artists::ensure_artist(&pool, "Fu Manchu").await.unwrap();

    assert!(genres::link_artist_genre(&pool, a, "Stoner Rock").await.unwrap());
    assert!(!genres::link_artist_genre(&pool, a, "stoner rock").await.unwrap());
    assert!(!genres::link_artist_genre(&pool, a, "  ").await.unwrap());

    assert!(similar::link_similar_artist(&pool, a, b).await.unwrap());
    assert!(!similar::link_similar_artist(&pool, a, b).await.unwrap());
    assert!(!similar::link_similar_artist(&pool, a, a).await.unwrap());

    assert_eq!(similar::count_outgoing_edges(&pool, a).await.unwrap(), 1);
    assert_eq!(similar::similar_artist_names(&pool, a).await.unwrap(), vec!["Fu Manchu"]);
}

#[tokio::test]
async fn test_status_counts() {
    let (_temp_dir, pool) = create_test_db().await.unwrap();
    let (track_id, sabbath) = seed_track(&pool, &catalog_track("1", "Black Sabbath", "Paranoid", 0)).await;
    seed_track(&pool, &catalog_track("2", "Black Sabbath", "Iron Man", 1)).await;
    let (dio, _) = artists::ensure_artist(&pool, "Dio").await.unwrap();
    similar::link_similar_artist(&pool, sabbath, dio).await.unwrap();
    genres::link_track_genre(&pool, track_id, "heavy metal").await.unwrap();
    tracks::set_track_bpm(&pool, track_id, 162.0).await.unwrap();
    history::append_run_record(&pool, "full", None, 2, Some(Utc::now())).await.unwrap();

    let report = status::check_status(&pool).await.unwrap();

    assert_eq!(report.total_tracks, 2);
    assert_eq!(report.tracks_with_bpm, 1);
    assert_eq!(report.tracks_with_genres, 1);
    assert_eq!(report.total_artists, 2);
    assert_eq!(report.primary_artists, 1);
    assert_eq!(report.stub_artists, 1);
    assert_eq!(report.pending_primary_artists, 1);
    assert_eq!(report.pending_stub_artists, 1);
    assert_eq!(report.similarity_edges, 1);
    assert_eq!(report.genres, 1);
    assert_eq!(report.last_run.clone().map(|r| r.mode), Some("full".to_string()));
    assert!(report.display_string().starts_with("2 tracks"));
}
