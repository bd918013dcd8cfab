//! Plex Media Server catalog client
//!
//! Lists the music tracks of one library section. Only the fields the
//! enrichment pipeline needs are read from the JSON `MediaContainer`.

use crate::types::{CatalogTrack, MediaCatalog, ProviderError, ProviderResult};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::time::Duration;

const USER_AGENT: &str = "tunegraph/0.1.0";
/// Plex metadata type for music tracks
const TRACK_TYPE: &str = "10";

#[derive(Debug, Deserialize)]
struct PlexResponse {
    #[serde(rename = "MediaContainer")]
    media_container: PlexContainer,
}

#[derive(Debug, Deserialize)]
struct PlexContainer {
    #[serde(rename = "Metadata", default)]
    metadata: Vec<PlexTrack>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlexTrack {
    rating_key: Option<String>,
    title: Option<String>,
    /// Track artist for a music track
    grandparent_title: Option<String>,
    /// Album title
    parent_title: Option<String>,
    added_at: Option<i64>,
    #[serde(rename = "Genre", default)]
    genres: Vec<PlexTag>,
    #[serde(rename = "Media", default)]
    media: Vec<PlexMedia>,
}

#[derive(Debug, Deserialize)]
struct PlexTag {
    tag: String,
}

#[derive(Debug, Deserialize)]
struct PlexMedia {
    #[serde(rename = "Part", default)]
    parts: Vec<PlexPart>,
}

#[derive(Debug, Deserialize)]
struct PlexPart {
    file: Option<String>,
}

impl PlexTrack {
    fn into_catalog_track(self) -> Option<CatalogTrack> {
        let catalog_id = self.rating_key?;
        let artist = self.grandparent_title.filter(|a| !a.trim().is_empty())?;
        let added_at = self
            .added_at
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
            .unwrap_or_default();
        let file_path = self
            .media
            .into_iter()
            .flat_map(|m| m.parts)
            .find_map(|p| p.file);

        Some(CatalogTrack {
            catalog_id,
            title: self.title.unwrap_or_default(),
            artist,
            album: self.parent_title,
            genres: self.genres.into_iter().map(|g| g.tag).collect(),
            added_at,
            file_path,
        })
    }
}

/// Plex catalog client
pub struct PlexClient {
    http_client: reqwest::Client,
    base_url: String,
    token: String,
    section_id: String,
}

impl PlexClient {
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
        section_id: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            section_id: section_id.into(),
        })
    }

    async fn fetch_tracks(&self, added_after: Option<i64>) -> ProviderResult<Vec<CatalogTrack>> {
        let url = format!("{}/library/sections/{}/all", self.base_url, self.section_id);

        let mut query = vec![("type".to_string(), TRACK_TYPE.to_string())];
        if let Some(secs) = added_after {
            query.push(("addedAt>>".to_string(), secs.to_string()));
        }

        tracing::debug!(url = %url, added_after = ?added_after, "Querying Plex library section");

        let response = self
            .http_client
            .get(&url)
            .header("X-Plex-Token", &self.token)
            .header("Accept", "application/json")
            .query(&query)
            .send()
            .await
            .map_err(|e| ProviderError::Unavailable(format!("Plex unreachable: {}", e)))?;

        let status = response.status();
        if status == 401 {
            return Err(ProviderError::Unavailable("Plex token rejected".to_string()));
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api(status.as_u16(), error_text));
        }

        let body: PlexResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        let total = body.media_container.metadata.len();
        let tracks: Vec<CatalogTrack> = body
            .media_container
            .metadata
            .into_iter()
            .filter_map(PlexTrack::into_catalog_track)
            .collect();

        if tracks.len() < total {
            tracing::warn!(
                skipped = total - tracks.len(),
                "Plex entries without id or artist ignored"
            );
        }

        Ok(tracks)
    }
}

#[async_trait::async_trait]
impl MediaCatalog for PlexClient {
    async fn list_all_tracks(&self) -> ProviderResult<Vec<CatalogTrack>> {
        self.fetch_tracks(None).await
    }

    async fn list_tracks_since(&self, cutoff: DateTime<Utc>) -> ProviderResult<Vec<CatalogTrack>> {
        // Server filter is strictly-after; step back one second and filter inclusively here
        let tracks = self.fetch_tracks(Some(cutoff.timestamp() - 1)).await?;
        Ok(tracks.into_iter().filter(|t| t.added_at >= cutoff).collect())
    }
}
