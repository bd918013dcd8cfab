//! Canned providers
//!
//! Each fake answers from a fixed table and counts its calls.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tunegraph_enrich::types::{
    ArtistInfo, ArtistInfoSource, CatalogTrack, FeatureLookup, FileTags, FingerprintResolver,
    MediaCatalog, ProviderError, ProviderResult, TagProbe, TempoEstimator, TrackInfo,
};

pub type Calls = AtomicUsize;

fn bump(calls: &Calls) {
    calls.fetch_add(1, Ordering::SeqCst);
}

// ============================================================================
// Media catalog
// ============================================================================

#[derive(Default)]
pub struct FakeCatalog {
    pub tracks: Vec<CatalogTrack>,
    pub error: Option<ProviderError>,
    /// Cutoffs passed to `list_tracks_since`
    pub requested_since: Mutex<Vec<DateTime<Utc>>>,
}

impl FakeCatalog {
    pub fn new(tracks: Vec<CatalogTrack>) -> Arc<Self> {
        Arc::new(Self {
            tracks,
            ..Default::default()
        })
    }

    pub fn failing(error: ProviderError) -> Arc<Self> {
        Arc::new(Self {
            error: Some(error),
            ..Default::default()
        })
    }
}

#[async_trait::async_trait]
impl MediaCatalog for FakeCatalog {
    async fn list_all_tracks(&self) -> ProviderResult<Vec<CatalogTrack>> {
        match &self.error {
            Some(e) => Err(e.clone()),
            None => Ok(self.tracks.clone()),
        }
    }

    async fn list_tracks_since(&self, cutoff: DateTime<Utc>) -> ProviderResult<Vec<CatalogTrack>> {
        self.requested_since.lock().unwrap().push(cutoff);
        match &self.error {
            Some(e) => Err(e.clone()),
            None => Ok(self
                .tracks
                .iter()
                .filter(|t| t.added_at >= cutoff)
                .cloned()
                .collect()),
        }
    }
}

// ============================================================================
// Social metadata
// ============================================================================

#[derive(Default)]
pub struct FakeSocial {
    pub artists: HashMap<String, ArtistInfo>,
    pub tracks: HashMap<(String, String), TrackInfo>,
    /// Artist names answered with a transient error
    pub failing_artists: Vec<String>,
    pub unavailable: bool,
    pub artist_calls: Calls,
    pub track_calls: Calls,
    pub artists_queried: Mutex<Vec<String>>,
}

impl FakeSocial {
    pub fn with_artist(mut self, name: &str, info: ArtistInfo) -> Self {
        self.artists.insert(name.to_lowercase(), info);
        self
    }

    pub fn with_track(mut self, artist: &str, title: &str, info: TrackInfo) -> Self {
        self.tracks
            .insert((artist.to_lowercase(), title.to_lowercase()), info);
        self
    }

    pub fn queried(&self) -> Vec<String> {
        self.artists_queried.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ArtistInfoSource for FakeSocial {
    async fn artist_info(&self, name: &str) -> ProviderResult<Option<ArtistInfo>> {
        bump(&self.artist_calls);
        self.artists_queried.lock().unwrap().push(name.to_string());
        if self.unavailable {
            return Err(ProviderError::Unavailable("API key rejected".to_string()));
        }
        if self.failing_artists.iter().any(|a| a.eq_ignore_ascii_case(name)) {
            return Err(ProviderError::Network("connection reset".to_string()));
        }
        Ok(self.artists.get(&name.to_lowercase()).cloned())
    }

    async fn track_info(&self, artist: &str, title: &str) -> ProviderResult<Option<TrackInfo>> {
        bump(&self.track_calls);
        if self.unavailable {
            return Err(ProviderError::Unavailable("API key rejected".to_string()));
        }
        Ok(self
            .tracks
            .get(&(artist.to_lowercase(), title.to_lowercase()))
            .cloned())
    }
}

// ============================================================================
// File tags
// ============================================================================

/// Tags keyed by local file name
#[derive(Default)]
pub struct FakeTagProbe {
    pub tags: Mutex<HashMap<String, FileTags>>,
    pub calls: Calls,
}

impl FakeTagProbe {
    pub fn with_file(self, file_name: &str, tags: FileTags) -> Self {
        self.tags.lock().unwrap().insert(file_name.to_string(), tags);
        self
    }

    /// Replace the tags of a file, as a user retagging it would
    pub fn retag(&self, file_name: &str, tags: FileTags) {
        self.tags.lock().unwrap().insert(file_name.to_string(), tags);
    }
}

impl TagProbe for FakeTagProbe {
    fn read_tags(&self, path: &Path) -> ProviderResult<FileTags> {
        bump(&self.calls);
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Ok(self.tags.lock().unwrap().get(&name).cloned().unwrap_or_default())
    }
}

// ============================================================================
// Fingerprints
// ============================================================================

#[derive(Default)]
pub struct FakeFingerprints {
    pub recordings: HashMap<String, String>,
    pub calls: Calls,
}

#[async_trait::async_trait]
impl FingerprintResolver for FakeFingerprints {
    async fn resolve(&self, fingerprint: &str) -> ProviderResult<Option<String>> {
        bump(&self.calls);
        Ok(self.recordings.get(fingerprint).cloned())
    }
}

// ============================================================================
// Tempo
// ============================================================================

#[derive(Default)]
pub struct FakeFeatures {
    pub tempos: HashMap<String, f64>,
    pub bulk_fails: bool,
    pub bulk_calls: Calls,
    pub single_calls: Calls,
}

#[async_trait::async_trait]
impl FeatureLookup for FakeFeatures {
    async fn lookup_one(&self, mbid: &str) -> ProviderResult<Option<f64>> {
        bump(&self.single_calls);
        Ok(self.tempos.get(mbid).copied())
    }

    async fn lookup_bulk(&self, mbids: &[String]) -> ProviderResult<HashMap<String, f64>> {
        bump(&self.bulk_calls);
        if self.bulk_fails {
            return Err(ProviderError::Api(500, "bulk endpoint down".to_string()));
        }
        Ok(mbids
            .iter()
            .filter_map(|m| self.tempos.get(m).map(|bpm| (m.clone(), *bpm)))
            .collect())
    }
}

/// Local estimator answering by file name
#[derive(Default)]
pub struct FakeTempo {
    pub tempos: HashMap<String, f64>,
    pub calls: Calls,
    pub paths: Mutex<Vec<PathBuf>>,
    /// When each call started
    pub started: Mutex<Vec<Instant>>,
}

#[async_trait::async_trait]
impl TempoEstimator for FakeTempo {
    async fn estimate_tempo(&self, path: &Path) -> ProviderResult<Option<f64>> {
        bump(&self.calls);
        self.started.lock().unwrap().push(Instant::now());
        self.paths.lock().unwrap().push(path.to_path_buf());
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Ok(self.tempos.get(&name).copied())
    }
}
