//! Settings resolution
//!
//! Credentials resolve Database → ENV → TOML. Tests that touch the process
//! environment are marked #[serial] so they never run concurrently.

mod helpers;

use helpers::create_test_db;
use serial_test::serial;
use tunegraph_common::config::{CatalogConfig, PathsConfig, TomlConfig};
use tunegraph_enrich::config::{is_valid_key, EnrichSettings, LASTFM_API_KEY_ENV, PLEX_TOKEN_ENV};
use tunegraph_enrich::db::settings::{set_setting, LASTFM_API_KEY};
use tunegraph_enrich::utils::PacingPolicy;

fn toml_with_lastfm(key: &str) -> TomlConfig {
    let mut config = TomlConfig::default();
    config.credentials.lastfm_api_key = Some(key.to_string());
    config
}

#[tokio::test]
#[serial]
async fn test_database_overrides_env_and_toml() {
    let (_temp_dir, pool) = create_test_db().await.unwrap();
    set_setting(&pool, LASTFM_API_KEY, "db-key").await.unwrap();
    std::env::set_var(LASTFM_API_KEY_ENV, "env-key");

    let settings = EnrichSettings::resolve(&pool, &toml_with_lastfm("toml-key"))
        .await
        .unwrap();
    assert_eq!(settings.lastfm_api_key.as_deref(), Some("db-key"));

    std::env::remove_var(LASTFM_API_KEY_ENV);
}

#[tokio::test]
#[serial]
async fn test_env_fallback_when_database_empty() {
    let (_temp_dir, pool) = create_test_db().await.unwrap();
    std::env::set_var(LASTFM_API_KEY_ENV, "env-key");

    let settings = EnrichSettings::resolve(&pool, &toml_with_lastfm("toml-key"))
        .await
        .unwrap();
    assert_eq!(settings.lastfm_api_key.as_deref(), Some("env-key"));

    std::env::remove_var(LASTFM_API_KEY_ENV);
}

#[tokio::test]
#[serial]
async fn test_toml_fallback_and_blank_values_ignored() {
    let (_temp_dir, pool) = create_test_db().await.unwrap();
    set_setting(&pool, LASTFM_API_KEY, "   ").await.unwrap();
    std::env::set_var(LASTFM_API_KEY_ENV, "");

    let settings = EnrichSettings::resolve(&pool, &toml_with_lastfm("toml-key"))
        .await
        .unwrap();
    assert_eq!(settings.lastfm_api_key.as_deref(), Some("toml-key"));

    std::env::remove_var(LASTFM_API_KEY_ENV);
}

#[tokio::test]
#[serial]
async fn test_missing_credentials_are_not_an_error() {
    let (_temp_dir, pool) = create_test_db().await.unwrap();
    std::env::remove_var(LASTFM_API_KEY_ENV);
    std::env::remove_var(PLEX_TOKEN_ENV);

    let settings = EnrichSettings::resolve(&pool, &TomlConfig::default()).await.unwrap();

    assert!(settings.lastfm_api_key.is_none());
    assert!(settings.catalog.is_none());
    assert!(settings.path_mapper.is_none());
    assert_eq!(settings.lastfm_pacing, PacingPolicy::LASTFM);
}

#[tokio::test]
#[serial]
async fn test_catalog_requires_url_and_token() {
    let (_temp_dir, pool) = create_test_db().await.unwrap();
    std::env::set_var(PLEX_TOKEN_ENV, "plex-token");

    let mut config = TomlConfig::default();
    config.catalog = CatalogConfig {
        base_url: Some("http://plex.local:32400/".to_string()),
        token: None,
        section_id: None,
    };
    config.paths = PathsConfig {
        catalog_prefix: Some("/data/music".to_string()),
        local_prefix: Some("/mnt/music".into()),
        passthrough: false,
    };

    let settings = EnrichSettings::resolve(&pool, &config).await.unwrap();
    let catalog = settings.catalog.expect("catalog configured");
    assert_eq!(catalog.base_url, "http://plex.local:32400");
    assert_eq!(catalog.token, "plex-token");
    assert_eq!(catalog.section_id, "1");

    let mapper = settings.path_mapper.expect("mapping configured");
    assert_eq!(
        mapper.map("/data/music/Kyuss/Gardenia.flac"),
        Some("/mnt/music/Kyuss/Gardenia.flac".into())
    );

    std::env::remove_var(PLEX_TOKEN_ENV);
}

#[test]
fn test_is_valid_key() {
    assert!(is_valid_key("abc123"));
    assert!(!is_valid_key(""));
    assert!(!is_valid_key(" \t "));
}

#[tokio::test]
#[serial]
async fn test_environment_check_reports_gaps() {
    let (_temp_dir, pool) = create_test_db().await.unwrap();
    std::env::remove_var(LASTFM_API_KEY_ENV);
    std::env::remove_var(PLEX_TOKEN_ENV);

    let music_dir = tempfile::TempDir::new().unwrap();
    let mut config = toml_with_lastfm("toml-key");
    config.paths = PathsConfig {
        catalog_prefix: Some("/data/music".to_string()),
        local_prefix: Some(music_dir.path().to_path_buf()),
        passthrough: false,
    };
    config.tempo.extractor_binary = Some("/nonexistent/essentia_extractor".to_string());

    let settings = EnrichSettings::resolve(&pool, &config).await.unwrap();
    let report = tunegraph_enrich::services::validate_environment(&pool, &settings).await;

    assert!(report.database_ok);
    assert!(report.paths_ok);
    assert!(report.is_ready());
    assert!(!report.extractor_ok);
    assert!(report.lastfm_configured);
    assert!(!report.catalog_configured);
    assert!(report.errors.iter().any(|e| e.contains("Tempo extractor")));
}
