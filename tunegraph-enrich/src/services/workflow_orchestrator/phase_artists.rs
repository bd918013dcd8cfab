//! Phase 4: ARTISTS
//!
//! Social-metadata enrichment with a bounded similarity graph.
//!
//! Primary artists (with tracks) get the full policy: MBID, genres and
//! similarity edges, creating unknown similar artists as stubs. Stub artists
//! get the core policy only, so the graph never grows past one hop from the
//! library. An artist the provider answered for, with or without data, is
//! marked attempted and not selected again by incremental runs.

use super::{ArtistEnrichmentStats, ArtistPolicyStats, EnrichmentOrchestrator, PhaseOutcome, SkipReason};
use crate::db::artists::{self, ArtistRecord};
use crate::db::{genres, similar};
use crate::services::classifier::{self, WorkScope};
use crate::types::{ArtistInfo, ArtistInfoSource, ProviderError};
use crate::utils::Pacer;
use anyhow::Result;
use chrono::Utc;

/// Enrichment depth for one artist
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EnrichmentPolicy {
    /// Identifier and genres
    Core,
    /// Core plus similarity edges
    Full,
}

impl EnrichmentOrchestrator {
    /// Phase 4: ARTISTS - full policy for primary artists, then core for stubs
    ///
    /// Stubs are classified after the primary pass so stubs created by it are
    /// enriched in the same run.
    pub(super) async fn phase_artists(
        &self,
        scope: WorkScope,
    ) -> Result<PhaseOutcome<ArtistEnrichmentStats>> {
        let Some(source) = &self.providers.social else {
            tracing::warn!("No Last.fm API key configured, skipping artist enrichment");
            return Ok(PhaseOutcome::skipped(SkipReason::Unavailable(
                "no social-metadata provider configured".to_string(),
            )));
        };

        let pacer = Pacer::new("lastfm", self.pacing.social);
        let mut stats = ArtistEnrichmentStats::default();

        let primary = self.limited(classifier::primary_artists_for_enrichment(&self.db, scope).await?);
        tracing::info!(primary_artists = primary.len(), "Phase 4: ARTISTS (full enrichment)");

        if let Err(e) = self
            .enrich_artists(source.as_ref(), &pacer, &primary, EnrichmentPolicy::Full, &mut stats.primary)
            .await
        {
            return Ok(PhaseOutcome::interrupted(stats, SkipReason::Unavailable(e.to_string())));
        }

        let stubs = self.limited(classifier::stub_artists_for_enrichment(&self.db, scope).await?);
        tracing::info!(stub_artists = stubs.len(), "Phase 4: ARTISTS (core enrichment)");

        if let Err(e) = self
            .enrich_artists(source.as_ref(), &pacer, &stubs, EnrichmentPolicy::Core, &mut stats.stubs)
            .await
        {
            return Ok(PhaseOutcome::interrupted(stats, SkipReason::Unavailable(e.to_string())));
        }

        tracing::info!(
            primary = %stats.primary.display_string(),
            stubs = %stats.stubs.display_string(),
            "Artist enrichment complete"
        );

        Ok(PhaseOutcome::completed(stats))
    }

    /// Enrich a work set under one policy
    ///
    /// Returns `Err` only when the provider reports itself unavailable.
    async fn enrich_artists(
        &self,
        source: &dyn ArtistInfoSource,
        pacer: &Pacer,
        work: &[ArtistRecord],
        policy: EnrichmentPolicy,
        stats: &mut ArtistPolicyStats,
    ) -> Result<(), ProviderError> {
        for artist in work {
            pacer.wait().await;

            let info = match source.artist_info(&artist.name).await {
                Ok(info) => info,
                Err(e) if e.is_unavailable() => {
                    tracing::warn!(error = %e, "Social-metadata provider unavailable, stopping artist enrichment");
                    return Err(e);
                }
                Err(e) => {
                    // Not marked attempted: a transient failure is retried next run
                    tracing::warn!(artist = %artist.name, error = %e, "Artist lookup failed");
                    stats.lookup.record_provider_error();
                    continue;
                }
            };

            match info {
                Some(info) => {
                    let write = self.apply_artist_info(artist, &info, policy, stats).await;
                    if let Err(e) = &write {
                        tracing::warn!(artist = %artist.name, error = %e, "Failed to store artist enrichment");
                    }
                    stats.lookup.record_hit(&write);
                }
                None => {
                    tracing::debug!(artist = %artist.name, "Artist unknown to provider");
                    stats.lookup.record_miss();
                }
            }

            if let Err(e) = artists::mark_enrichment_attempted(&self.db, artist.id, Utc::now()).await {
                tracing::warn!(artist = %artist.name, error = %e, "Failed to mark enrichment attempt");
                stats.mark_failures += 1;
            }
        }

        Ok(())
    }

    /// Write one provider answer; returns whether anything changed
    async fn apply_artist_info(
        &self,
        artist: &ArtistRecord,
        info: &ArtistInfo,
        policy: EnrichmentPolicy,
        stats: &mut ArtistPolicyStats,
    ) -> Result<bool> {
        let mut changed = false;

        if let Some(mbid) = &info.mbid {
            if artists::set_artist_mbid_if_empty(&self.db, artist.id, mbid).await? {
                stats.mbids_set += 1;
                changed = true;
            }
        }

        for tag in &info.tags {
            if genres::link_artist_genre(&self.db, artist.id, tag).await? {
                stats.genre_links += 1;
                changed = true;
            }
        }

        if policy == EnrichmentPolicy::Full {
            for name in &info.similar {
                if name.trim().is_empty() {
                    continue;
                }
                let (similar_id, created) = artists::ensure_artist(&self.db, name).await?;
                if created {
                    stats.stubs_created += 1;
                }
                if similar::link_similar_artist(&self.db, artist.id, similar_id).await? {
                    stats.similar_edges += 1;
                    changed = true;
                }
            }
        }

        tracing::debug!(
            artist = %artist.name,
            policy = ?policy,
            tags = info.tags.len(),
            similar = info.similar.len(),
            "Applied artist enrichment"
        );

        Ok(changed)
    }
}
