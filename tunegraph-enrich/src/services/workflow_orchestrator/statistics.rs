//! Enrichment run statistics
//!
//! Every phase returns one of the records below so the caller can report hit
//! rates without querying the store again. All records serialize to JSON for
//! `--json` output.

use serde::{Deserialize, Serialize};

/// Why a phase did not run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// Disabled on the command line
    Disabled,
    /// Capability missing (credentials, tool, file mapping)
    Unavailable(String),
    /// Provider failed for the phase as a whole (e.g. catalog listing)
    Failed(String),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::Disabled => write!(f, "disabled"),
            SkipReason::Unavailable(reason) => write!(f, "unavailable: {}", reason),
            SkipReason::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// Counters for a lookup-style phase
///
/// Each item lands in exactly one of `hits` or `misses`, so
/// `hits + misses == total`. Provider failures are misses and additionally
/// counted in `provider_errors`. `updated` counts hits that changed the store
/// and never exceeds `hits`; hits whose write failed go to `write_failures`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LookupStats {
    pub total: usize,
    pub hits: usize,
    pub misses: usize,
    pub updated: usize,
    pub write_failures: usize,
    pub provider_errors: usize,
}

impl LookupStats {
    pub fn record_miss(&mut self) {
        self.total += 1;
        self.misses += 1;
    }

    pub fn record_provider_error(&mut self) {
        self.record_miss();
        self.provider_errors += 1;
    }

    /// Record a hit and the outcome of writing it
    ///
    /// `write` is `Ok(true)` when the store changed, `Ok(false)` when the value
    /// was already present.
    pub fn record_hit<E>(&mut self, write: &Result<bool, E>) {
        self.total += 1;
        self.hits += 1;
        match write {
            Ok(true) => self.updated += 1,
            Ok(false) => {}
            Err(_) => self.write_failures += 1,
        }
    }

    pub fn hit_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.hits as f64 / self.total as f64
        }
    }

    pub fn display_string(&self) -> String {
        format!(
            "{} of {} found ({:.0}%), {} updated, {} provider errors, {} write failures",
            self.hits,
            self.total,
            self.hit_rate() * 100.0,
            self.updated,
            self.provider_errors,
            self.write_failures
        )
    }
}

/// Embedded-tag identifier extraction
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IdentifierStats {
    pub tracks: LookupStats,
    pub artists: LookupStats,
    /// Files whose mapped local path does not exist (counted as misses)
    pub inaccessible: usize,
    /// Embedded fingerprint ids recorded for the fingerprint phase
    pub fingerprint_ids_recorded: usize,
    /// Failed fingerprint id writes
    pub fingerprint_write_failures: usize,
}

impl IdentifierStats {
    pub fn display_string(&self) -> String {
        format!(
            "tracks: {}; artists: {}; {} inaccessible files; {} fingerprint ids recorded, {} write failures",
            self.tracks.display_string(),
            self.artists.display_string(),
            self.inaccessible,
            self.fingerprint_ids_recorded,
            self.fingerprint_write_failures
        )
    }
}

/// One artist enrichment policy (core or full)
///
/// `lookup` follows the [`LookupStats`] rules. The remaining counters describe
/// what the hits added to the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArtistPolicyStats {
    pub lookup: LookupStats,
    pub mbids_set: usize,
    pub genre_links: usize,
    pub similar_edges: usize,
    pub stubs_created: usize,
    /// Failed `enrichment_attempted_at` writes
    pub mark_failures: usize,
}

impl ArtistPolicyStats {
    pub fn display_string(&self) -> String {
        format!(
            "{}; {} MBIDs, {} genre links, {} similarity edges, {} new stubs",
            self.lookup.display_string(),
            self.mbids_set,
            self.genre_links,
            self.similar_edges,
            self.stubs_created
        )
    }
}

/// Social-metadata artist enrichment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArtistEnrichmentStats {
    /// Full policy over primary artists
    pub primary: ArtistPolicyStats,
    /// Core policy over stub artists
    pub stubs: ArtistPolicyStats,
}

impl ArtistEnrichmentStats {
    pub fn display_string(&self) -> String {
        format!(
            "primary [{}]; stubs [{}]",
            self.primary.display_string(),
            self.stubs.display_string()
        )
    }
}

/// Two-stage tempo enrichment
///
/// Every candidate track ends in exactly one outcome bucket:
/// `resolved_remote + resolved_local + misses + failures + write_failures == total`.
/// A track that neither stage could resolve is counted once, by the last
/// stage that handled it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TempoStats {
    pub total: usize,
    pub resolved_remote: usize,
    pub resolved_local: usize,
    /// No stage had data
    pub misses: usize,
    /// Last attempt ended in a provider or file error
    pub failures: usize,
    pub write_failures: usize,
    /// Tracks sent to the remote lookup
    pub remote_queried: usize,
    /// Tracks handed to the local extractor
    pub local_attempted: usize,
    /// Local candidates whose file was not reachable
    pub inaccessible: usize,
    pub remote_skipped: Option<SkipReason>,
    pub local_skipped: Option<SkipReason>,
}

impl TempoStats {
    /// Tracks a stage returned a tempo for
    pub fn hits(&self) -> usize {
        self.resolved_remote + self.resolved_local + self.write_failures
    }

    /// Tracks still without tempo after both stages
    pub fn unresolved(&self) -> usize {
        self.misses + self.failures + self.write_failures
    }

    pub fn display_string(&self) -> String {
        let mut text = format!(
            "{} of {} resolved ({} remote, {} local), {} misses, {} failures",
            self.resolved_remote + self.resolved_local,
            self.total,
            self.resolved_remote,
            self.resolved_local,
            self.misses,
            self.failures
        );
        if let Some(reason) = &self.remote_skipped {
            text.push_str(&format!("; remote skipped ({})", reason));
        }
        if let Some(reason) = &self.local_skipped {
            text.push_str(&format!("; local skipped ({})", reason));
        }
        text
    }
}

/// Catalog import
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportStats {
    /// Entries returned by the catalog
    pub fetched: usize,
    pub new_tracks: usize,
    /// Already known tracks whose catalog fields were refreshed
    pub refreshed: usize,
    pub new_artists: usize,
    pub genre_links: usize,
    pub write_failures: usize,
    /// Newest `added_at` among the imported entries, capped at the oldest
    /// entry whose store write failed
    pub latest_entry_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl ImportStats {
    pub fn display_string(&self) -> String {
        format!(
            "{} fetched, {} new tracks, {} new artists, {} genre links, {} write failures",
            self.fetched, self.new_tracks, self.new_artists, self.genre_links, self.write_failures
        )
    }
}

/// Result of one phase: its statistics, or why it was skipped
///
/// A phase that becomes unavailable part-way keeps the statistics gathered so
/// far alongside the skip reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseOutcome<T> {
    pub stats: T,
    pub skipped: Option<SkipReason>,
}

impl<T: Default> PhaseOutcome<T> {
    pub fn completed(stats: T) -> Self {
        Self { stats, skipped: None }
    }

    pub fn skipped(reason: SkipReason) -> Self {
        Self {
            stats: T::default(),
            skipped: Some(reason),
        }
    }

    /// Phase stopped part-way; keeps what was counted so far
    pub fn interrupted(stats: T, reason: SkipReason) -> Self {
        Self {
            stats,
            skipped: Some(reason),
        }
    }

    pub fn is_skipped(&self) -> bool {
        self.skipped.is_some()
    }
}

impl<T: Default> Default for PhaseOutcome<T> {
    fn default() -> Self {
        Self::completed(T::default())
    }
}

/// Aggregated statistics of one orchestrator run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub mode: String,
    pub cutoff: Option<chrono::DateTime<chrono::Utc>>,
    pub import: PhaseOutcome<ImportStats>,
    pub identifiers: PhaseOutcome<IdentifierStats>,
    pub fingerprints: PhaseOutcome<LookupStats>,
    pub artists: PhaseOutcome<ArtistEnrichmentStats>,
    pub track_tags: PhaseOutcome<LookupStats>,
    pub tempo: PhaseOutcome<TempoStats>,
    /// Run record written for this run
    pub run_record_id: Option<i64>,
}

fn phase_line<T>(name: &str, outcome: &PhaseOutcome<T>, display: impl Fn(&T) -> String) -> String {
    match &outcome.skipped {
        Some(reason) => format!("{:<13} skipped ({}) {}", name, reason, display(&outcome.stats)),
        None => format!("{:<13} {}", name, display(&outcome.stats)),
    }
}

impl RunReport {
    pub fn display_string(&self) -> String {
        let cutoff = self
            .cutoff
            .map(crate::db::format_timestamp)
            .unwrap_or_else(|| "none".to_string());

        [
            format!("{} run (cutoff {})", self.mode, cutoff),
            phase_line("import", &self.import, ImportStats::display_string),
            phase_line("identifiers", &self.identifiers, IdentifierStats::display_string),
            phase_line("fingerprints", &self.fingerprints, LookupStats::display_string),
            phase_line("artists", &self.artists, ArtistEnrichmentStats::display_string),
            phase_line("track tags", &self.track_tags, LookupStats::display_string),
            phase_line("tempo", &self.tempo, TempoStats::display_string),
        ]
        .join("\n")
    }
}
