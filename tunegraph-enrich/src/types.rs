//! Core types and provider traits
//!
//! Every external collaborator of the enrichment pipeline sits behind one of
//! the traits below, so phases receive their providers as explicit
//! dependencies and tests can substitute canned implementations.
//!
//! # Result convention
//! Providers return `Result<Option<T>, ProviderError>`:
//! - `Ok(Some(_))` - data found
//! - `Ok(None)` - the provider answered but knows nothing (normal miss)
//! - `Err(ProviderError::Unavailable(_))` - capability missing, phase is skipped
//! - any other `Err` - per-item failure, counted and the phase continues

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

// ============================================================================
// Common Types
// ============================================================================

/// Track as reported by the media catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogTrack {
    /// Catalog-side identity (Plex `ratingKey`)
    pub catalog_id: String,
    pub title: String,
    /// Display name of the track artist
    pub artist: String,
    pub album: Option<String>,
    /// Genre tags assigned in the catalog
    pub genres: Vec<String>,
    /// When the catalog first saw the track
    pub added_at: DateTime<Utc>,
    /// File path as seen by the catalog server
    pub file_path: Option<String>,
}

/// Social-metadata answer for an artist
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArtistInfo {
    /// MusicBrainz artist id, when the provider knows it
    pub mbid: Option<String>,
    pub tags: Vec<String>,
    /// Names of similar artists, provider order
    pub similar: Vec<String>,
}

/// Social-metadata answer for a single track
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackInfo {
    pub mbid: Option<String>,
    pub tags: Vec<String>,
}

/// Identifiers read from a file's embedded tags
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileTags {
    /// MusicBrainz recording id
    pub recording_mbid: Option<String>,
    /// MusicBrainz artist id
    pub artist_mbid: Option<String>,
    pub artist_name: Option<String>,
    /// AcoustID track id (fingerprint identifier)
    pub acoustid_id: Option<String>,
}

// ============================================================================
// Errors
// ============================================================================

/// Error signalled by any provider
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
    /// Capability missing (no credentials, tool not installed, service down)
    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    /// Transport failure or timeout
    #[error("Network error: {0}")]
    Network(String),

    /// Provider rejected the call for exceeding its rate limit
    #[error("Rate limited by provider")]
    RateLimited,

    /// Provider answered with an error status
    #[error("API error {0}: {1}")]
    Api(u16, String),

    /// Response could not be interpreted
    #[error("Parse error: {0}")]
    Parse(String),

    /// Local file could not be read
    #[error("I/O error: {0}")]
    Io(String),
}

impl ProviderError {
    /// Whether this error means "skip the phase" rather than "count a failure"
    pub fn is_unavailable(&self) -> bool {
        matches!(self, ProviderError::Unavailable(_))
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ProviderError::Parse(err.to_string())
        } else {
            ProviderError::Network(err.to_string())
        }
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

// ============================================================================
// Provider Traits
// ============================================================================

/// Media catalog listing tracks
#[async_trait::async_trait]
pub trait MediaCatalog: Send + Sync {
    /// Every music track in the catalog
    async fn list_all_tracks(&self) -> ProviderResult<Vec<CatalogTrack>>;

    /// Tracks added at or after `cutoff`
    async fn list_tracks_since(&self, cutoff: DateTime<Utc>) -> ProviderResult<Vec<CatalogTrack>>;
}

/// Resolves a fingerprint identifier to a MusicBrainz recording id
#[async_trait::async_trait]
pub trait FingerprintResolver: Send + Sync {
    async fn resolve(&self, fingerprint: &str) -> ProviderResult<Option<String>>;
}

/// Low-level audio feature lookup keyed by recording id
#[async_trait::async_trait]
pub trait FeatureLookup: Send + Sync {
    /// Tempo for a single recording
    async fn lookup_one(&self, mbid: &str) -> ProviderResult<Option<f64>>;

    /// Tempo for up to [`crate::services::acousticbrainz_client::MAX_BULK_IDS`]
    /// recordings. Recordings the provider lacks are absent from the map.
    async fn lookup_bulk(&self, mbids: &[String]) -> ProviderResult<HashMap<String, f64>>;
}

/// Social-metadata service (tags and similar artists)
#[async_trait::async_trait]
pub trait ArtistInfoSource: Send + Sync {
    async fn artist_info(&self, name: &str) -> ProviderResult<Option<ArtistInfo>>;

    async fn track_info(&self, artist: &str, title: &str) -> ProviderResult<Option<TrackInfo>>;
}

/// Reads embedded identifiers from an audio file
pub trait TagProbe: Send + Sync {
    fn read_tags(&self, path: &Path) -> ProviderResult<FileTags>;
}

/// Local tempo estimation from an audio file
#[async_trait::async_trait]
pub trait TempoEstimator: Send + Sync {
    async fn estimate_tempo(&self, path: &Path) -> ProviderResult<Option<f64>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_unavailable_skips() {
        assert!(ProviderError::Unavailable("no key".into()).is_unavailable());
        assert!(!ProviderError::RateLimited.is_unavailable());
        assert!(!ProviderError::Api(500, "boom".into()).is_unavailable());
        assert!(!ProviderError::Io("missing".into()).is_unavailable());
    }
}
