//! Targeted identifier refresh
//!
//! Re-reads the file tags of named artists' tracks and replaces stored MBIDs
//! that differ. Meant for use after tags were corrected by hand; the default
//! pipeline never overwrites an MBID.

use super::{probe_tags, EnrichmentOrchestrator, LocalFile, SkipReason};
use crate::db::{artists, tracks};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Kind of entity a change applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeTarget {
    Track,
    Artist,
}

/// One MBID difference between store and file tags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MbidChange {
    pub target: ChangeTarget,
    pub id: i64,
    /// Track title or artist name
    pub name: String,
    pub old: Option<String>,
    pub new: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RefreshTrackStats {
    pub total: usize,
    pub accessible: usize,
    pub inaccessible: usize,
    /// Files whose tags held a recording MBID
    pub extracted: usize,
    /// Files without a recording MBID
    pub missing: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub errors: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RefreshArtistStats {
    pub updated: usize,
    pub unchanged: usize,
    /// Artists none of whose files carried an artist MBID
    pub missing: usize,
    pub errors: usize,
}

/// Outcome of a refresh
///
/// In a dry run `updated` counts the changes that would have been written.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RefreshStats {
    pub artists_requested: usize,
    pub artists_found: usize,
    pub artists_not_found: Vec<String>,
    pub tracks: RefreshTrackStats,
    pub artist_mbids: RefreshArtistStats,
    pub changes: Vec<MbidChange>,
    pub dry_run: bool,
    pub skipped: Option<SkipReason>,
}

impl RefreshStats {
    pub fn display_string(&self) -> String {
        if let Some(reason) = &self.skipped {
            return format!("refresh skipped ({})", reason);
        }
        format!(
            "{}{}/{} artists found, {} tracks updated, {} unchanged, {} inaccessible, {} artist MBIDs updated",
            if self.dry_run { "[DRY RUN] " } else { "" },
            self.artists_found,
            self.artists_requested,
            self.tracks.updated,
            self.tracks.unchanged,
            self.tracks.inaccessible,
            self.artist_mbids.updated
        )
    }
}

fn same_mbid(old: Option<&str>, new: &str) -> bool {
    old.is_some_and(|old| old.trim().eq_ignore_ascii_case(new.trim()))
}

impl EnrichmentOrchestrator {
    /// Re-extract identifiers for the named artists, overwriting differences
    ///
    /// With `dry_run` the differences are computed and logged but nothing is
    /// written.
    pub async fn refresh_identifiers(&self, artist_names: &[String], dry_run: bool) -> Result<RefreshStats> {
        let prefix = if dry_run { "[DRY RUN] " } else { "" };
        let mut stats = RefreshStats {
            artists_requested: artist_names.len(),
            dry_run,
            ..Default::default()
        };

        let Some(probe) = &self.providers.tag_probe else {
            stats.skipped = Some(SkipReason::Unavailable("no tag probe configured".to_string()));
            return Ok(stats);
        };
        if let Some(reason) = self.file_access_unavailable() {
            tracing::warn!(reason = %reason, "Metadata refresh skipped");
            stats.skipped = Some(reason);
            return Ok(stats);
        }

        tracing::info!(artists = ?artist_names, "{}Refreshing identifiers", prefix);

        for name in artist_names {
            let Some(artist) = artists::find_artist_by_name(&self.db, name)
                .await
                .with_context(|| format!("Failed to look up artist '{}'", name))?
            else {
                tracing::warn!(artist = %name, "Artist not found in store");
                stats.artists_not_found.push(name.clone());
                continue;
            };
            stats.artists_found += 1;

            let artist_tracks = tracks::tracks_for_artist(&self.db, artist.id)
                .await
                .with_context(|| format!("Failed to load tracks of '{}'", artist.name))?;

            let mut file_artist_mbid: Option<String> = None;

            for track in &artist_tracks {
                stats.tracks.total += 1;

                let path = match self.local_file(track.file_path.as_deref()) {
                    LocalFile::Found(path) => path,
                    LocalFile::Inaccessible => {
                        stats.tracks.inaccessible += 1;
                        continue;
                    }
                };
                stats.tracks.accessible += 1;

                let tags = match probe_tags(probe, path).await {
                    Ok(tags) => tags,
                    Err(e) => {
                        tracing::warn!(track_id = track.id, error = %e, "Failed to read file tags");
                        stats.tracks.errors += 1;
                        continue;
                    }
                };

                if file_artist_mbid.is_none() {
                    file_artist_mbid = tags.artist_mbid.clone();
                }

                let Some(new_mbid) = tags.recording_mbid else {
                    stats.tracks.missing += 1;
                    continue;
                };
                stats.tracks.extracted += 1;

                if same_mbid(track.mbid(), &new_mbid) {
                    stats.tracks.unchanged += 1;
                    continue;
                }

                tracing::info!(
                    track_id = track.id,
                    title = %track.title,
                    old = ?track.mbid(),
                    new = %new_mbid,
                    "{}Track MBID changed",
                    prefix
                );

                if !dry_run {
                    if let Err(e) = tracks::overwrite_track_mbid(&self.db, track.id, &new_mbid).await {
                        tracing::warn!(track_id = track.id, error = %e, "Failed to update track MBID");
                        stats.tracks.errors += 1;
                        continue;
                    }
                }
                stats.tracks.updated += 1;
                stats.changes.push(MbidChange {
                    target: ChangeTarget::Track,
                    id: track.id,
                    name: track.title.clone(),
                    old: track.mbid().map(str::to_string),
                    new: new_mbid,
                });
            }

            let Some(new_mbid) = file_artist_mbid else {
                stats.artist_mbids.missing += 1;
                continue;
            };

            if same_mbid(artist.mbid(), &new_mbid) {
                stats.artist_mbids.unchanged += 1;
                continue;
            }

            tracing::info!(
                artist = %artist.name,
                old = ?artist.mbid(),
                new = %new_mbid,
                "{}Artist MBID changed",
                prefix
            );

            if !dry_run {
                if let Err(e) = artists::overwrite_artist_mbid(&self.db, artist.id, &new_mbid).await {
                    tracing::warn!(artist = %artist.name, error = %e, "Failed to update artist MBID");
                    stats.artist_mbids.errors += 1;
                    continue;
                }
            }
            stats.artist_mbids.updated += 1;
            stats.changes.push(MbidChange {
                target: ChangeTarget::Artist,
                id: artist.id,
                name: artist.name.clone(),
                old: artist.mbid().map(str::to_string),
                new: new_mbid,
            });
        }

        tracing::info!("{}", stats.display_string());

        Ok(stats)
    }
}
