//! Configuration resolution for tunegraph-enrich
//!
//! Credentials use multi-tier resolution with Database → ENV → TOML priority.
//! A missing credential is never an error: the provider that needs it is not
//! constructed and its phase reports "skipped".

use crate::utils::{PacingPolicy, PathMapper};
use sqlx::SqlitePool;
use tracing::{info, warn};
use tunegraph_common::config::TomlConfig;
use tunegraph_common::Result;

pub const LASTFM_API_KEY_ENV: &str = "LASTFM_API_KEY";
pub const ACOUSTID_API_KEY_ENV: &str = "ACOUSTID_API_KEY";
pub const PLEX_TOKEN_ENV: &str = "PLEX_TOKEN";

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Resolve a secret from the settings table, the environment, or TOML
///
/// **Priority:** Database → ENV → TOML. Returns `None` when no tier holds a
/// valid value.
pub async fn resolve_secret(
    db: &SqlitePool,
    label: &str,
    setting_key: &str,
    env_var: &str,
    toml_value: Option<&String>,
) -> Result<Option<String>> {
    let db_key = crate::db::settings::get_setting(db, setting_key)
        .await?
        .filter(|k| is_valid_key(k));
    let env_key = std::env::var(env_var).ok().filter(|k| is_valid_key(k));
    let toml_key = toml_value.filter(|k| is_valid_key(k)).cloned();

    let sources: Vec<&str> = [
        db_key.as_ref().map(|_| "database"),
        env_key.as_ref().map(|_| "environment"),
        toml_key.as_ref().map(|_| "TOML"),
    ]
    .into_iter()
    .flatten()
    .collect();

    if sources.len() > 1 {
        warn!(
            "{} found in multiple sources: {}. Using {} (highest priority).",
            label,
            sources.join(", "),
            sources[0]
        );
    }

    match sources.first() {
        Some(source) => info!("{} loaded from {}", label, source),
        None => warn!("{} not configured", label),
    }

    Ok(db_key.or(env_key).or(toml_key))
}

/// Catalog connection after credential resolution
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogSettings {
    pub base_url: String,
    pub token: String,
    pub section_id: String,
}

/// Effective runtime configuration for one run
#[derive(Debug, Clone)]
pub struct EnrichSettings {
    pub catalog: Option<CatalogSettings>,
    pub lastfm_api_key: Option<String>,
    pub acoustid_api_key: Option<String>,
    pub path_mapper: Option<PathMapper>,
    pub lastfm_pacing: PacingPolicy,
    pub acousticbrainz_pacing: PacingPolicy,
    pub acoustid_pacing: PacingPolicy,
    pub local_tempo_pacing: PacingPolicy,
    pub extractor_binary: String,
    pub min_bpm: f64,
    pub max_bpm: f64,
}

impl EnrichSettings {
    /// Resolve credentials and merge TOML overrides onto built-in defaults
    pub async fn resolve(db: &SqlitePool, toml_config: &TomlConfig) -> Result<Self> {
        use crate::db::settings::{ACOUSTID_API_KEY, LASTFM_API_KEY, PLEX_TOKEN};

        let lastfm_api_key = resolve_secret(
            db,
            "Last.fm API key",
            LASTFM_API_KEY,
            LASTFM_API_KEY_ENV,
            toml_config.credentials.lastfm_api_key.as_ref(),
        )
        .await?;

        let acoustid_api_key = resolve_secret(
            db,
            "AcoustID API key",
            ACOUSTID_API_KEY,
            ACOUSTID_API_KEY_ENV,
            toml_config.credentials.acoustid_api_key.as_ref(),
        )
        .await?;

        let plex_token = resolve_secret(
            db,
            "Plex token",
            PLEX_TOKEN,
            PLEX_TOKEN_ENV,
            toml_config.catalog.token.as_ref(),
        )
        .await?;

        let catalog = match (&toml_config.catalog.base_url, plex_token) {
            (Some(base_url), Some(token)) => Some(CatalogSettings {
                base_url: base_url.trim_end_matches('/').to_string(),
                token,
                section_id: toml_config
                    .catalog
                    .section_id
                    .clone()
                    .unwrap_or_else(|| "1".to_string()),
            }),
            _ => None,
        };

        let pacing = &toml_config.pacing;
        Ok(Self {
            catalog,
            lastfm_api_key,
            acoustid_api_key,
            path_mapper: PathMapper::from_config(&toml_config.paths),
            lastfm_pacing: PacingPolicy::LASTFM.with_overrides(&pacing.lastfm),
            acousticbrainz_pacing: PacingPolicy::ACOUSTICBRAINZ.with_overrides(&pacing.acousticbrainz),
            acoustid_pacing: PacingPolicy::ACOUSTID.with_overrides(&pacing.acoustid),
            local_tempo_pacing: PacingPolicy::LOCAL_TEMPO.with_overrides(&pacing.local_tempo),
            extractor_binary: toml_config
                .tempo
                .extractor_binary
                .clone()
                .unwrap_or_else(|| crate::services::essentia_client::DEFAULT_BINARY.to_string()),
            min_bpm: toml_config.tempo.min_bpm.unwrap_or(crate::services::essentia_client::MIN_PLAUSIBLE_BPM),
            max_bpm: toml_config.tempo.max_bpm.unwrap_or(crate::services::essentia_client::MAX_PLAUSIBLE_BPM),
        })
    }
}
