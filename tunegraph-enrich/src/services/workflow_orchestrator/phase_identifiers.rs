//! Phase 2: IDENTIFIERS
//!
//! MusicBrainz ids from the files' embedded tags

use super::{probe_tags, EnrichmentOrchestrator, IdentifierStats, LocalFile, PhaseOutcome, SkipReason};
use crate::db::{artists, tracks};
use crate::services::classifier;
use anyhow::Result;

impl EnrichmentOrchestrator {
    /// Phase 2: IDENTIFIERS - read recording and artist MBIDs from file tags
    ///
    /// Tracks are probed one by one. Each artist is probed once, through the
    /// first of its track files that is reachable locally. Existing MBIDs are
    /// never replaced here.
    pub(super) async fn phase_identifiers(&self) -> Result<PhaseOutcome<IdentifierStats>> {
        let Some(probe) = &self.providers.tag_probe else {
            return Ok(PhaseOutcome::skipped(SkipReason::Unavailable(
                "no tag probe configured".to_string(),
            )));
        };
        if let Some(reason) = self.file_access_unavailable() {
            tracing::warn!(reason = %reason, "Skipping identifier extraction");
            return Ok(PhaseOutcome::skipped(reason));
        }

        let track_set = self.limited(classifier::tracks_needing_identifiers(&self.db).await?);
        tracing::info!(tracks = track_set.len(), "Phase 2: IDENTIFIERS");

        let mut stats = IdentifierStats::default();

        for track in &track_set {
            let path = match self.local_file(track.file_path.as_deref()) {
                LocalFile::Found(path) => path,
                LocalFile::Inaccessible => {
                    tracing::debug!(track_id = track.id, file = ?track.file_path, "Track file not accessible");
                    stats.inaccessible += 1;
                    stats.tracks.record_miss();
                    continue;
                }
            };

            let tags = match probe_tags(probe, path).await {
                Ok(tags) => tags,
                Err(e) if e.is_unavailable() => {
                    tracing::warn!(error = %e, "Tag probe unavailable, stopping identifier extraction");
                    return Ok(PhaseOutcome::interrupted(stats, SkipReason::Unavailable(e.to_string())));
                }
                Err(e) => {
                    tracing::warn!(track_id = track.id, error = %e, "Failed to read file tags");
                    stats.tracks.record_provider_error();
                    continue;
                }
            };

            if let Some(acoustid) = &tags.acoustid_id {
                match tracks::set_track_acoustid_if_empty(&self.db, track.id, acoustid).await {
                    Ok(true) => stats.fingerprint_ids_recorded += 1,
                    Ok(false) => {}
                    Err(e) => {
                        tracing::warn!(track_id = track.id, error = %e, "Failed to store fingerprint id");
                        stats.fingerprint_write_failures += 1;
                    }
                }
            }

            match tags.recording_mbid {
                Some(mbid) => {
                    let write = tracks::set_track_mbid_if_empty(&self.db, track.id, &mbid).await;
                    if let Err(e) = &write {
                        tracing::warn!(track_id = track.id, error = %e, "Failed to store recording MBID");
                    }
                    stats.tracks.record_hit(&write);
                }
                None => {
                    tracing::debug!(track_id = track.id, title = %track.title, "No recording MBID in file tags");
                    stats.tracks.record_miss();
                }
            }
        }

        let artist_set = self.limited(classifier::artists_needing_identifiers(&self.db).await?);
        tracing::info!(artists = artist_set.len(), "Extracting artist MBIDs from sample files");

        for artist in &artist_set {
            let paths = match artists::track_paths_for_artist(&self.db, artist.id).await {
                Ok(paths) => paths,
                Err(e) => {
                    tracing::warn!(artist = %artist.name, error = %e, "Failed to load artist track paths");
                    stats.artists.record_miss();
                    continue;
                }
            };

            let sample = paths.iter().find_map(|p| match self.local_file(Some(p)) {
                LocalFile::Found(path) => Some(path),
                LocalFile::Inaccessible => None,
            });
            let Some(path) = sample else {
                tracing::debug!(artist = %artist.name, "No accessible track file for artist");
                stats.inaccessible += 1;
                stats.artists.record_miss();
                continue;
            };

            match probe_tags(probe, path).await {
                Ok(tags) => match tags.artist_mbid {
                    Some(mbid) => {
                        let write = artists::set_artist_mbid_if_empty(&self.db, artist.id, &mbid).await;
                        if let Err(e) = &write {
                            tracing::warn!(artist = %artist.name, error = %e, "Failed to store artist MBID");
                        }
                        stats.artists.record_hit(&write);
                    }
                    None => stats.artists.record_miss(),
                },
                Err(e) if e.is_unavailable() => {
                    tracing::warn!(error = %e, "Tag probe unavailable, stopping identifier extraction");
                    return Ok(PhaseOutcome::interrupted(stats, SkipReason::Unavailable(e.to_string())));
                }
                Err(e) => {
                    tracing::warn!(artist = %artist.name, error = %e, "Failed to read sample file tags");
                    stats.artists.record_provider_error();
                }
            }
        }

        tracing::info!(
            tracks_found = stats.tracks.hits,
            artists_found = stats.artists.hits,
            inaccessible = stats.inaccessible,
            "Identifier extraction complete"
        );

        Ok(PhaseOutcome::completed(stats))
    }
}
