//! Phase 5: TRACK TAGS
//!
//! Social-metadata tags for tracks the catalog gave no genre

use super::{EnrichmentOrchestrator, LookupStats, PhaseOutcome, SkipReason};
use crate::db::tracks::{self, TrackRecord};
use crate::db::genres;
use crate::types::TrackInfo;
use crate::utils::Pacer;
use anyhow::Result;

impl EnrichmentOrchestrator {
    /// Phase 5: TRACK TAGS - link provider tags to genre-less tracks
    pub(super) async fn phase_track_tags(&self) -> Result<PhaseOutcome<LookupStats>> {
        let Some(source) = &self.providers.social else {
            return Ok(PhaseOutcome::skipped(SkipReason::Unavailable(
                "no social-metadata provider configured".to_string(),
            )));
        };

        let work = self.limited(tracks::tracks_without_genres(&self.db).await?);
        tracing::info!(tracks = work.len(), "Phase 5: TRACK TAGS");

        let pacer = Pacer::new("lastfm", self.pacing.social);
        let mut stats = LookupStats::default();

        for track in &work {
            let Some(artist) = track.artist_name.as_deref() else {
                stats.record_miss();
                continue;
            };

            pacer.wait().await;

            match source.track_info(artist, &track.title).await {
                Ok(Some(info)) if !info.tags.is_empty() || info.mbid.is_some() => {
                    let write = self.apply_track_info(track, &info).await;
                    if let Err(e) = &write {
                        tracing::warn!(track_id = track.id, error = %e, "Failed to store track tags");
                    }
                    stats.record_hit(&write);
                }
                Ok(_) => {
                    tracing::debug!(track_id = track.id, artist = %artist, title = %track.title, "No track tags");
                    stats.record_miss();
                }
                Err(e) if e.is_unavailable() => {
                    tracing::warn!(error = %e, "Social-metadata provider unavailable, stopping track tags");
                    return Ok(PhaseOutcome::interrupted(stats, SkipReason::Unavailable(e.to_string())));
                }
                Err(e) => {
                    tracing::warn!(track_id = track.id, error = %e, "Track lookup failed");
                    stats.record_provider_error();
                }
            }
        }

        tracing::info!(total = stats.total, found = stats.hits, "Track tag enrichment complete");

        Ok(PhaseOutcome::completed(stats))
    }

    async fn apply_track_info(&self, track: &TrackRecord, info: &TrackInfo) -> Result<bool> {
        let mut changed = false;

        for tag in &info.tags {
            changed |= genres::link_track_genre(&self.db, track.id, tag).await?;
        }
        if let Some(mbid) = &info.mbid {
            changed |= tracks::set_track_mbid_if_empty(&self.db, track.id, mbid).await?;
        }

        Ok(changed)
    }
}
