//! Enrichment workflow orchestrator
//!
//! Sequences the enrichment phases over the entity store:
//!
//! IMPORT → IDENTIFIERS → FINGERPRINTS → ARTISTS → TRACK TAGS → TEMPO
//!
//! Each phase lives in its own `phase_*` module as a method on
//! [`EnrichmentOrchestrator`]. Phases re-derive their work sets from the store
//! when they start, so items left incomplete by an earlier run are picked up
//! again no matter when they were imported. A phase whose provider is missing
//! reports itself skipped and the run continues; only store failures in a
//! classifier query or the run-record write end a run with an error.

use super::classifier::WorkScope;
use crate::config::EnrichSettings;
use crate::services::{
    AcousticBrainzClient, AcoustIdClient, EssentiaTempoExtractor, LastFmClient, LoftyTagProbe,
    PlexClient,
};
use crate::types::{
    ArtistInfoSource, FeatureLookup, FingerprintResolver, MediaCatalog, TagProbe, TempoEstimator,
};
use crate::utils::{PacingPolicy, PathMapper};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;

mod phase_artists;
mod phase_fingerprints;
mod phase_identifiers;
mod phase_import;
mod phase_tempo;
mod phase_track_tags;
mod refresh;
pub mod statistics;

pub use refresh::{ChangeTarget, MbidChange, RefreshArtistStats, RefreshStats, RefreshTrackStats};
pub use statistics::{
    ArtistEnrichmentStats, ArtistPolicyStats, IdentifierStats, ImportStats, LookupStats,
    PhaseOutcome, RunReport, SkipReason, TempoStats,
};

/// External collaborators for one run
///
/// A `None` provider makes its phase report "skipped".
#[derive(Clone, Default)]
pub struct Providers {
    pub catalog: Option<Arc<dyn MediaCatalog>>,
    pub tag_probe: Option<Arc<dyn TagProbe>>,
    pub fingerprints: Option<Arc<dyn FingerprintResolver>>,
    pub features: Option<Arc<dyn FeatureLookup>>,
    pub social: Option<Arc<dyn ArtistInfoSource>>,
    pub tempo: Option<Arc<dyn TempoEstimator>>,
}

impl Providers {
    /// Construct the production clients that the settings allow
    ///
    /// Clients that cannot be built are left out with a warning.
    pub fn from_settings(settings: &EnrichSettings) -> Self {
        let catalog = settings.catalog.as_ref().and_then(|c| {
            match PlexClient::new(&c.base_url, &c.token, &c.section_id) {
                Ok(client) => Some(Arc::new(client) as Arc<dyn MediaCatalog>),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to initialize Plex client");
                    None
                }
            }
        });
        if catalog.is_none() {
            tracing::warn!("Media catalog not configured (catalog.base_url and Plex token required)");
        }

        let social = settings.lastfm_api_key.as_ref().and_then(|key| {
            match LastFmClient::new(key.clone()) {
                Ok(client) => {
                    tracing::info!("Last.fm client initialized with configured API key");
                    Some(Arc::new(client) as Arc<dyn ArtistInfoSource>)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Last.fm enrichment disabled");
                    None
                }
            }
        });

        let fingerprints = settings.acoustid_api_key.as_ref().and_then(|key| {
            match AcoustIdClient::new(key.clone()) {
                Ok(client) => Some(Arc::new(client) as Arc<dyn FingerprintResolver>),
                Err(e) => {
                    tracing::warn!(error = %e, "AcoustID lookups disabled");
                    None
                }
            }
        });

        let features = match AcousticBrainzClient::new() {
            Ok(client) => Some(Arc::new(client) as Arc<dyn FeatureLookup>),
            Err(e) => {
                tracing::warn!(error = %e, "AcousticBrainz lookups disabled");
                None
            }
        };

        let tempo = match EssentiaTempoExtractor::new(
            settings.extractor_binary.clone(),
            settings.min_bpm,
            settings.max_bpm,
        ) {
            Ok(extractor) => {
                tracing::info!("Essentia available for local tempo extraction");
                Some(Arc::new(extractor) as Arc<dyn TempoEstimator>)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Essentia not available - local tempo extraction disabled");
                None
            }
        };

        Self {
            catalog,
            tag_probe: Some(Arc::new(LoftyTagProbe::default())),
            fingerprints,
            features,
            social,
            tempo,
        }
    }
}

/// Pacing policy per provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PacingSet {
    pub social: PacingPolicy,
    pub features: PacingPolicy,
    pub fingerprints: PacingPolicy,
    pub local_tempo: PacingPolicy,
}

impl Default for PacingSet {
    fn default() -> Self {
        Self {
            social: PacingPolicy::LASTFM,
            features: PacingPolicy::ACOUSTICBRAINZ,
            fingerprints: PacingPolicy::ACOUSTID,
            local_tempo: PacingPolicy::LOCAL_TEMPO,
        }
    }
}

impl PacingSet {
    pub fn from_settings(settings: &EnrichSettings) -> Self {
        Self {
            social: settings.lastfm_pacing,
            features: settings.acousticbrainz_pacing,
            fingerprints: settings.acoustid_pacing,
            local_tempo: settings.local_tempo_pacing,
        }
    }

    /// Default batch sizes with every wait removed
    pub fn unpaced() -> Self {
        fn no_wait(policy: PacingPolicy) -> PacingPolicy {
            PacingPolicy {
                interval: std::time::Duration::ZERO,
                cooldown: std::time::Duration::ZERO,
                ..policy
            }
        }

        let defaults = Self::default();
        Self {
            social: no_wait(defaults.social),
            features: no_wait(defaults.features),
            fingerprints: no_wait(defaults.fingerprints),
            local_tempo: no_wait(defaults.local_tempo),
        }
    }
}

/// Per-run switches
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    pub skip_identifiers: bool,
    pub skip_fingerprints: bool,
    pub skip_artists: bool,
    pub skip_track_tags: bool,
    pub skip_tempo: bool,
    /// Cap on items per work set
    pub limit: Option<usize>,
}

/// Pipeline entry mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Full,
    Incremental,
}

impl RunMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunMode::Full => "full",
            RunMode::Incremental => "incremental",
        }
    }

    fn scope(&self) -> WorkScope {
        match self {
            RunMode::Full => WorkScope::All,
            RunMode::Incremental => WorkScope::Pending,
        }
    }
}

/// Where a catalog file path leads locally
#[derive(Debug, Clone, PartialEq)]
enum LocalFile {
    Found(PathBuf),
    Inaccessible,
}

/// Enrichment workflow orchestrator
pub struct EnrichmentOrchestrator {
    db: SqlitePool,
    providers: Providers,
    path_mapper: Option<PathMapper>,
    pacing: PacingSet,
    options: RunOptions,
}

impl EnrichmentOrchestrator {
    /// Orchestrator with default pacing, no file mapping and default options
    pub fn new(db: SqlitePool, providers: Providers) -> Self {
        Self {
            db,
            providers,
            path_mapper: None,
            pacing: PacingSet::default(),
            options: RunOptions::default(),
        }
    }

    /// Orchestrator wired with production clients
    pub fn from_settings(db: SqlitePool, settings: &EnrichSettings, options: RunOptions) -> Self {
        Self::new(db, Providers::from_settings(settings))
            .with_path_mapper(settings.path_mapper.clone())
            .with_pacing(PacingSet::from_settings(settings))
            .with_options(options)
    }

    pub fn with_path_mapper(mut self, path_mapper: Option<PathMapper>) -> Self {
        self.path_mapper = path_mapper;
        self
    }

    pub fn with_pacing(mut self, pacing: PacingSet) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    pub fn db(&self) -> &SqlitePool {
        &self.db
    }

    /// Pull the whole catalog and run every phase over the whole library
    pub async fn run_full(&self) -> Result<RunReport> {
        tracing::info!("Starting full enrichment pipeline");

        let import = self.phase_import(RunMode::Full, None).await;
        self.finish_run(RunMode::Full, None, import).await
    }

    /// Import catalog entries added since the cutoff and enrich what is pending
    ///
    /// The cutoff is `since` if given, else the newest entry timestamp of any
    /// earlier run, else the Unix epoch.
    pub async fn run_incremental(&self, since: Option<DateTime<Utc>>) -> Result<RunReport> {
        let cutoff = match since {
            Some(cutoff) => cutoff,
            None => crate::db::history::latest_cutoff(&self.db)
                .await
                .context("Failed to read run history")?
                .unwrap_or_default(),
        };

        tracing::info!(
            cutoff = %crate::db::format_timestamp(cutoff),
            "Starting incremental enrichment pipeline"
        );

        let import = self.phase_import(RunMode::Incremental, Some(cutoff)).await;
        self.finish_run(RunMode::Incremental, Some(cutoff), import).await
    }

    /// Run the enrichment phases and append the run record
    async fn finish_run(
        &self,
        mode: RunMode,
        cutoff: Option<DateTime<Utc>>,
        import: PhaseOutcome<ImportStats>,
    ) -> Result<RunReport> {
        let scope = mode.scope();

        // Work sets are re-derived after the import so older incomplete rows count too
        let pending = crate::services::classifier::classify(&self.db, scope).await?;
        tracing::info!(
            scope = ?scope,
            tracks_needing_ids = pending.tracks_needing_ids.len(),
            artists_needing_ids = pending.artists_needing_ids.len(),
            primary_artists = pending.primary_artists.len(),
            stub_artists = pending.stub_artists.len(),
            tracks_needing_tempo = pending.tracks_needing_tempo.len(),
            "Pending work"
        );

        let mut report = RunReport {
            mode: mode.as_str().to_string(),
            cutoff,
            ..Default::default()
        };

        report.identifiers = if self.options.skip_identifiers {
            PhaseOutcome::skipped(SkipReason::Disabled)
        } else {
            self.phase_identifiers().await?
        };

        report.fingerprints = if self.options.skip_fingerprints {
            PhaseOutcome::skipped(SkipReason::Disabled)
        } else {
            self.phase_fingerprints().await?
        };

        report.artists = if self.options.skip_artists {
            PhaseOutcome::skipped(SkipReason::Disabled)
        } else {
            self.phase_artists(scope).await?
        };

        report.track_tags = if self.options.skip_track_tags {
            PhaseOutcome::skipped(SkipReason::Disabled)
        } else {
            self.phase_track_tags().await?
        };

        report.tempo = if self.options.skip_tempo {
            PhaseOutcome::skipped(SkipReason::Disabled)
        } else {
            self.phase_tempo().await?
        };

        let run_id = crate::db::history::append_run_record(
            &self.db,
            mode.as_str(),
            cutoff,
            import.stats.new_tracks,
            import.stats.latest_entry_at,
        )
        .await
        .context("Failed to write run record")?;

        report.import = import;
        report.run_record_id = Some(run_id);

        tracing::info!(
            mode = mode.as_str(),
            new_tracks = report.import.stats.new_tracks,
            run_id,
            "Enrichment pipeline complete"
        );

        Ok(report)
    }

    /// Apply the configured item cap to a work set
    fn limited<T>(&self, mut items: Vec<T>) -> Vec<T> {
        if let Some(limit) = self.options.limit {
            items.truncate(limit);
        }
        items
    }

    /// Why file-based phases cannot run, if they cannot
    fn file_access_unavailable(&self) -> Option<SkipReason> {
        match &self.path_mapper {
            None => Some(SkipReason::Unavailable("no file path mapping configured".to_string())),
            Some(mapper) if !mapper.local_root_exists() => Some(SkipReason::Unavailable(
                "local music root not mounted".to_string(),
            )),
            Some(_) => None,
        }
    }

    /// Map a catalog path to an existing local file
    fn local_file(&self, catalog_path: Option<&str>) -> LocalFile {
        let mapped = match (&self.path_mapper, catalog_path) {
            (Some(mapper), Some(path)) => mapper.resolve_existing(path),
            _ => None,
        };
        match mapped {
            Some(path) => LocalFile::Found(path),
            None => LocalFile::Inaccessible,
        }
    }
}

/// Read tags on the blocking pool
async fn probe_tags(
    probe: &Arc<dyn TagProbe>,
    path: PathBuf,
) -> crate::types::ProviderResult<crate::types::FileTags> {
    let probe = Arc::clone(probe);
    tokio::task::spawn_blocking(move || probe.read_tags(&path))
        .await
        .map_err(|e| crate::types::ProviderError::Io(format!("Task join error: {}", e)))?
}
