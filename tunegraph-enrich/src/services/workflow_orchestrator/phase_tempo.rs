//! Phase 6: TEMPO
//!
//! Two stages in strict order:
//! 1. Remote bulk lookup by recording MBID (AcousticBrainz), falling back to
//!    single lookups for a chunk whose bulk request failed
//! 2. Local extraction (Essentia) for whatever is still missing, in batches
//!    with a cooldown between them
//!
//! Each track is counted in exactly one outcome bucket of [`TempoStats`].

use super::{EnrichmentOrchestrator, LocalFile, PhaseOutcome, SkipReason, TempoStats};
use crate::db::tracks::{self, TrackRecord};
use crate::services::acousticbrainz_client::MAX_BULK_IDS;
use crate::services::classifier;
use crate::types::{FeatureLookup, TempoEstimator};
use crate::utils::Pacer;
use anyhow::Result;
use std::collections::HashMap;

/// What the remote stage learned about a track it did not resolve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RemoteOutcome {
    /// No MBID, or the remote stage did not run
    NotQueried,
    /// Provider answered without a tempo
    NotFound,
    /// Provider errored for this track
    Failed,
}

impl TempoStats {
    /// Final bucket for a track no later stage resolved
    fn record_unresolved(&mut self, remote: RemoteOutcome) {
        match remote {
            RemoteOutcome::Failed => self.failures += 1,
            RemoteOutcome::NotQueried | RemoteOutcome::NotFound => self.misses += 1,
        }
    }
}

/// Tempo for an MBID from a bulk answer, tolerating key case differences
fn bulk_tempo(found: &HashMap<String, f64>, mbid: &str) -> Option<f64> {
    found
        .get(mbid)
        .or_else(|| found.get(&mbid.to_lowercase()))
        .copied()
}

impl EnrichmentOrchestrator {
    /// Phase 6: TEMPO - remote lookup, then local extraction
    pub(super) async fn phase_tempo(&self) -> Result<PhaseOutcome<TempoStats>> {
        let work = self.limited(classifier::tracks_needing_tempo(&self.db).await?);
        tracing::info!(tracks = work.len(), "Phase 6: TEMPO");

        let mut stats = TempoStats {
            total: work.len(),
            ..Default::default()
        };

        let (with_mbid, without_mbid): (Vec<&TrackRecord>, Vec<&TrackRecord>) =
            work.iter().partition(|t| t.mbid().is_some());

        let mut remaining: Vec<(&TrackRecord, RemoteOutcome)> = without_mbid
            .into_iter()
            .map(|t| (t, RemoteOutcome::NotQueried))
            .collect();

        match &self.providers.features {
            Some(features) => {
                remaining.extend(self.tempo_remote(features.as_ref(), &with_mbid, &mut stats).await);
            }
            None => {
                tracing::warn!("No feature lookup configured, skipping remote tempo stage");
                stats.remote_skipped = Some(SkipReason::Unavailable(
                    "no feature lookup configured".to_string(),
                ));
                remaining.extend(with_mbid.into_iter().map(|t| (t, RemoteOutcome::NotQueried)));
            }
        }

        let local_unavailable = match (&self.providers.tempo, self.file_access_unavailable()) {
            (None, _) => Some(SkipReason::Unavailable("no local tempo extractor".to_string())),
            (Some(_), Some(reason)) => Some(reason),
            (Some(_), None) => None,
        };

        match (&self.providers.tempo, local_unavailable) {
            (Some(extractor), None) => {
                self.tempo_local(extractor.as_ref(), &remaining, &mut stats).await;
            }
            (_, reason) => {
                tracing::warn!(reason = ?reason, "Skipping local tempo stage");
                stats.local_skipped = reason;
                for (_, remote) in &remaining {
                    stats.record_unresolved(*remote);
                }
            }
        }

        tracing::info!(
            total = stats.total,
            resolved_remote = stats.resolved_remote,
            resolved_local = stats.resolved_local,
            unresolved = stats.unresolved(),
            "Tempo enrichment complete"
        );

        Ok(PhaseOutcome::completed(stats))
    }

    /// Store a tempo; returns whether it was written
    async fn store_tempo(&self, track: &TrackRecord, bpm: f64, stats: &mut TempoStats) -> bool {
        match tracks::set_track_bpm(&self.db, track.id, bpm).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(track_id = track.id, error = %e, "Failed to store tempo");
                stats.write_failures += 1;
                false
            }
        }
    }

    /// Stage 1: remote lookup; returns the tracks it did not resolve
    async fn tempo_remote<'a>(
        &self,
        features: &dyn FeatureLookup,
        candidates: &[&'a TrackRecord],
        stats: &mut TempoStats,
    ) -> Vec<(&'a TrackRecord, RemoteOutcome)> {
        let pacer = Pacer::new("acousticbrainz", self.pacing.features);
        let chunk_size = pacer.policy().batch_size.clamp(1, MAX_BULK_IDS);
        let mut unresolved = Vec::new();

        for chunk in candidates.chunks(chunk_size) {
            if stats.remote_skipped.is_some() {
                unresolved.extend(chunk.iter().map(|t| (*t, RemoteOutcome::NotQueried)));
                continue;
            }

            let ids: Vec<String> = chunk
                .iter()
                .filter_map(|t| t.mbid().map(str::to_string))
                .collect();

            pacer.wait().await;
            stats.remote_queried += chunk.len();

            match features.lookup_bulk(&ids).await {
                Ok(found) => {
                    for track in chunk {
                        match track.mbid().and_then(|m| bulk_tempo(&found, m)) {
                            Some(bpm) => {
                                if self.store_tempo(track, bpm, stats).await {
                                    stats.resolved_remote += 1;
                                }
                            }
                            None => unresolved.push((*track, RemoteOutcome::NotFound)),
                        }
                    }
                }
                Err(e) if e.is_unavailable() => {
                    tracing::warn!(error = %e, "Feature lookup unavailable, stopping remote tempo stage");
                    stats.remote_skipped = Some(SkipReason::Unavailable(e.to_string()));
                    unresolved.extend(chunk.iter().map(|t| (*t, RemoteOutcome::NotQueried)));
                }
                Err(e) => {
                    tracing::warn!(error = %e, count = chunk.len(), "Bulk tempo lookup failed, trying single lookups");
                    for track in chunk {
                        let outcome = self.tempo_remote_single(features, &pacer, track, stats).await;
                        if let Some(outcome) = outcome {
                            unresolved.push((*track, outcome));
                        }
                    }
                }
            }
        }

        unresolved
    }

    /// Single lookup for one track; `None` once the track is settled
    async fn tempo_remote_single(
        &self,
        features: &dyn FeatureLookup,
        pacer: &Pacer,
        track: &TrackRecord,
        stats: &mut TempoStats,
    ) -> Option<RemoteOutcome> {
        let Some(mbid) = track.mbid() else {
            return Some(RemoteOutcome::NotQueried);
        };
        pacer.wait().await;

        match features.lookup_one(mbid).await {
            Ok(Some(bpm)) => {
                if self.store_tempo(track, bpm, stats).await {
                    stats.resolved_remote += 1;
                }
                None
            }
            Ok(None) => Some(RemoteOutcome::NotFound),
            Err(e) => {
                tracing::debug!(track_id = track.id, error = %e, "Single tempo lookup failed");
                Some(RemoteOutcome::Failed)
            }
        }
    }

    /// Stage 2: local extraction in cooled-down batches
    async fn tempo_local(
        &self,
        extractor: &dyn TempoEstimator,
        remaining: &[(&TrackRecord, RemoteOutcome)],
        stats: &mut TempoStats,
    ) {
        let pacer = Pacer::new("local_tempo", self.pacing.local_tempo);
        let batch_size = pacer.policy().batch_size.max(1);
        let mut in_batch = 0usize;

        tracing::info!(tracks = remaining.len(), batch_size, "Running local tempo extraction");

        for (track, remote) in remaining {
            if stats.local_skipped.is_some() {
                stats.record_unresolved(*remote);
                continue;
            }

            let path = match self.local_file(track.file_path.as_deref()) {
                LocalFile::Found(path) => path,
                LocalFile::Inaccessible => {
                    tracing::debug!(track_id = track.id, file = ?track.file_path, "Track file not accessible");
                    stats.inaccessible += 1;
                    stats.failures += 1;
                    continue;
                }
            };

            if in_batch == batch_size {
                pacer.cool_down().await;
                in_batch = 0;
            }
            in_batch += 1;

            pacer.wait().await;
            stats.local_attempted += 1;

            match extractor.estimate_tempo(&path).await {
                Ok(Some(bpm)) => {
                    if self.store_tempo(track, bpm, stats).await {
                        stats.resolved_local += 1;
                    }
                }
                Ok(None) => {
                    tracing::debug!(track_id = track.id, "No tempo detected");
                    stats.misses += 1;
                }
                Err(e) if e.is_unavailable() => {
                    tracing::warn!(error = %e, "Local extractor unavailable, stopping local tempo stage");
                    stats.local_skipped = Some(SkipReason::Unavailable(e.to_string()));
                    stats.record_unresolved(*remote);
                }
                Err(e) => {
                    tracing::warn!(track_id = track.id, error = %e, "Local tempo extraction failed");
                    stats.failures += 1;
                }
            }
        }
    }
}
