//! Phase 3: FINGERPRINTS
//!
//! Recording MBIDs for tracks that carry an embedded AcoustID id but no MBID

use super::{EnrichmentOrchestrator, LookupStats, PhaseOutcome, SkipReason};
use crate::db::tracks;
use crate::utils::Pacer;
use anyhow::Result;

impl EnrichmentOrchestrator {
    /// Phase 3: FINGERPRINTS - resolve fingerprint ids to recording MBIDs
    pub(super) async fn phase_fingerprints(&self) -> Result<PhaseOutcome<LookupStats>> {
        let Some(resolver) = &self.providers.fingerprints else {
            tracing::warn!("No AcoustID API key configured, skipping fingerprint resolution");
            return Ok(PhaseOutcome::skipped(SkipReason::Unavailable(
                "no fingerprint resolver configured".to_string(),
            )));
        };

        let work = self.limited(tracks::tracks_with_unresolved_fingerprint(&self.db).await?);
        tracing::info!(tracks = work.len(), "Phase 3: FINGERPRINTS");

        let pacer = Pacer::new("acoustid", self.pacing.fingerprints);
        let mut stats = LookupStats::default();

        for track in &work {
            let Some(fingerprint) = track.acoustid_id.as_deref() else {
                stats.record_miss();
                continue;
            };

            pacer.wait().await;

            match resolver.resolve(fingerprint).await {
                Ok(Some(mbid)) => {
                    let write = tracks::set_track_mbid_if_empty(&self.db, track.id, &mbid).await;
                    if let Err(e) = &write {
                        tracing::warn!(track_id = track.id, error = %e, "Failed to store recording MBID");
                    }
                    stats.record_hit(&write);
                }
                Ok(None) => {
                    tracing::debug!(track_id = track.id, acoustid = %fingerprint, "No recording for fingerprint");
                    stats.record_miss();
                }
                Err(e) if e.is_unavailable() => {
                    tracing::warn!(error = %e, "Fingerprint resolver unavailable, stopping phase");
                    return Ok(PhaseOutcome::interrupted(stats, SkipReason::Unavailable(e.to_string())));
                }
                Err(e) => {
                    tracing::warn!(track_id = track.id, error = %e, "Fingerprint lookup failed");
                    stats.record_provider_error();
                }
            }
        }

        tracing::info!(
            total = stats.total,
            resolved = stats.hits,
            updated = stats.updated,
            "Fingerprint resolution complete"
        );

        Ok(PhaseOutcome::completed(stats))
    }
}
