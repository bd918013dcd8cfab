//! Phase 1: IMPORT
//!
//! Catalog entries into the store: tracks, their artists, catalog genres

use super::{EnrichmentOrchestrator, ImportStats, PhaseOutcome, RunMode, SkipReason};
use crate::db::{artists, genres, tracks};
use crate::types::CatalogTrack;
use anyhow::{bail, Result};
use chrono::{DateTime, Utc};

/// Newest `added_at` the next incremental run may start from
///
/// Capped at the oldest entry whose store write failed: the catalog listing is
/// inclusive, so that entry is fetched again.
#[derive(Debug, Default)]
struct ImportWatermark {
    newest_consumed: Option<DateTime<Utc>>,
    oldest_failed: Option<DateTime<Utc>>,
}

impl ImportWatermark {
    fn consumed(&mut self, added_at: DateTime<Utc>) {
        self.newest_consumed = self.newest_consumed.max(Some(added_at));
    }

    fn failed(&mut self, added_at: DateTime<Utc>) {
        self.oldest_failed = Some(match self.oldest_failed {
            Some(oldest) => oldest.min(added_at),
            None => added_at,
        });
    }

    fn latest(&self) -> Option<DateTime<Utc>> {
        match (self.newest_consumed, self.oldest_failed) {
            (Some(newest), Some(failed)) => Some(newest.min(failed)),
            (newest, _) => newest,
        }
    }
}

impl EnrichmentOrchestrator {
    /// Phase 1: IMPORT - load catalog entries into the store
    ///
    /// With a cutoff only entries added at or after it are requested. Known
    /// tracks keep their enrichment results; a full run refreshes their
    /// catalog-owned fields.
    pub(super) async fn phase_import(
        &self,
        mode: RunMode,
        cutoff: Option<DateTime<Utc>>,
    ) -> PhaseOutcome<ImportStats> {
        let Some(catalog) = &self.providers.catalog else {
            tracing::warn!("No media catalog configured, skipping import");
            return PhaseOutcome::skipped(SkipReason::Unavailable(
                "no media catalog configured".to_string(),
            ));
        };

        tracing::info!(mode = mode.as_str(), "Phase 1: IMPORT");

        let listing = match cutoff {
            Some(cutoff) => catalog.list_tracks_since(cutoff).await,
            None => catalog.list_all_tracks().await,
        };

        let entries = match listing {
            Ok(entries) => entries,
            Err(e) if e.is_unavailable() => {
                tracing::warn!(error = %e, "Media catalog unavailable, skipping import");
                return PhaseOutcome::skipped(SkipReason::Unavailable(e.to_string()));
            }
            Err(e) => {
                tracing::warn!(error = %e, "Media catalog listing failed, skipping import");
                return PhaseOutcome::skipped(SkipReason::Failed(e.to_string()));
            }
        };

        let mut stats = ImportStats {
            fetched: entries.len(),
            ..Default::default()
        };
        let mut watermark = ImportWatermark::default();

        for entry in &entries {
            if entry.artist.trim().is_empty() {
                // Unfixable by retry; consumed for the cutoff
                stats.write_failures += 1;
                watermark.consumed(entry.added_at);
                tracing::warn!(catalog_id = %entry.catalog_id, title = %entry.title, "Catalog entry has no artist");
                continue;
            }

            match self.import_entry(mode, entry, &mut stats).await {
                Ok(()) => watermark.consumed(entry.added_at),
                Err(e) => {
                    stats.write_failures += 1;
                    watermark.failed(entry.added_at);
                    tracing::warn!(
                        catalog_id = %entry.catalog_id,
                        title = %entry.title,
                        error = %e,
                        "Failed to import catalog entry"
                    );
                }
            }
        }
        stats.latest_entry_at = watermark.latest();

        tracing::info!(
            fetched = stats.fetched,
            new_tracks = stats.new_tracks,
            new_artists = stats.new_artists,
            write_failures = stats.write_failures,
            "Import complete"
        );

        PhaseOutcome::completed(stats)
    }

    async fn import_entry(
        &self,
        mode: RunMode,
        entry: &CatalogTrack,
        stats: &mut ImportStats,
    ) -> Result<()> {
        let (artist_id, created) = artists::ensure_artist(&self.db, &entry.artist).await?;
        if created {
            stats.new_artists += 1;
        }

        let track_id = match tracks::insert_track_if_new(&self.db, entry, artist_id).await? {
            Some(track_id) => {
                stats.new_tracks += 1;
                track_id
            }
            None => {
                let Some(track_id) = tracks::find_track_id(&self.db, &entry.catalog_id).await? else {
                    bail!("track {} missing after insert", entry.catalog_id);
                };
                if mode == RunMode::Full {
                    tracks::refresh_catalog_fields(&self.db, track_id, entry, artist_id).await?;
                    stats.refreshed += 1;
                }
                track_id
            }
        };

        for genre in &entry.genres {
            if genres::link_track_genre(&self.db, track_id, genre).await? {
                stats.genre_links += 1;
            }
        }

        Ok(())
    }
}
