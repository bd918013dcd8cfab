//! Last.fm API client
//!
//! Social metadata: artist tags, similar artists and MusicBrainz ids
//! (`artist.getInfo`), plus per-track tags (`track.getInfo`).
//!
//! Last.fm reports most failures as a JSON `{"error": code, "message": ..}`
//! body, sometimes with HTTP 200. Its XML-derived JSON also collapses
//! single-element lists into a bare object, so lists are read leniently.

use crate::types::{ArtistInfo, ArtistInfoSource, ProviderError, ProviderResult, TrackInfo};
use serde_json::Value;
use std::time::Duration;

const LASTFM_BASE_URL: &str = "https://ws.audioscrobbler.com/2.0/";
const USER_AGENT: &str = "tunegraph/0.1.0";

/// Last.fm error codes that matter here
mod code {
    pub const NOT_FOUND: i64 = 6;
    pub const INVALID_API_KEY: i64 = 10;
    pub const SUSPENDED_API_KEY: i64 = 26;
    pub const RATE_LIMIT_EXCEEDED: i64 = 29;
}

/// Items of a Last.fm list that may be an array, a single object, or absent
fn as_list(value: Option<&Value>) -> Vec<&Value> {
    match value {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(obj @ Value::Object(_)) => vec![obj],
        _ => Vec::new(),
    }
}

fn non_empty(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn names(list: Option<&Value>) -> Vec<String> {
    as_list(list)
        .into_iter()
        .filter_map(|item| non_empty(item.get("name")))
        .collect()
}

/// Map an error body to `Ok(None)` for not-found or the matching error
fn check_error(body: &Value, http_status: u16) -> ProviderResult<Option<()>> {
    let Some(error_code) = body.get("error").and_then(Value::as_i64) else {
        return Ok(Some(()));
    };
    let message = non_empty(body.get("message")).unwrap_or_default();

    match error_code {
        code::NOT_FOUND => Ok(None),
        code::INVALID_API_KEY | code::SUSPENDED_API_KEY => Err(ProviderError::Unavailable(
            format!("Last.fm rejected API key: {}", message),
        )),
        code::RATE_LIMIT_EXCEEDED => Err(ProviderError::RateLimited),
        _ => Err(ProviderError::Api(http_status, format!("{}: {}", error_code, message))),
    }
}

/// Parse an `artist.getInfo` body
pub fn parse_artist_info(body: &Value) -> Option<ArtistInfo> {
    let artist = body.get("artist")?;

    Some(ArtistInfo {
        mbid: non_empty(artist.get("mbid")),
        tags: names(artist.get("tags").and_then(|t| t.get("tag"))),
        similar: names(artist.get("similar").and_then(|s| s.get("artist"))),
    })
}

/// Parse a `track.getInfo` body
pub fn parse_track_info(body: &Value) -> Option<TrackInfo> {
    let track = body.get("track")?;

    Some(TrackInfo {
        mbid: non_empty(track.get("mbid")),
        tags: names(track.get("toptags").and_then(|t| t.get("tag"))),
    })
}

/// Last.fm API client
pub struct LastFmClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl LastFmClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self, ProviderError> {
        Self::with_base_url(LASTFM_BASE_URL, api_key)
    }

    pub fn with_base_url(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ProviderError::Unavailable("Last.fm API key is empty".to_string()));
        }

        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.into(),
            api_key,
        })
    }

    /// Call a method and return the body, or `None` if Last.fm reports not-found
    async fn call(&self, params: &[(&str, &str)]) -> ProviderResult<Option<Value>> {
        let mut query: Vec<(&str, &str)> = vec![("api_key", self.api_key.as_str()), ("format", "json")];
        query.extend_from_slice(params);

        let response = self.http_client.get(&self.base_url).query(&query).send().await?;
        let status = response.status();
        if status == 429 {
            return Err(ProviderError::RateLimited);
        }

        let text = response.text().await?;
        let body: Value = match serde_json::from_str(&text) {
            Ok(body) => body,
            Err(_) if !status.is_success() => return Err(ProviderError::Api(status.as_u16(), text)),
            Err(e) => return Err(ProviderError::Parse(e.to_string())),
        };

        match check_error(&body, status.as_u16())? {
            Some(()) if status.is_success() => Ok(Some(body)),
            Some(()) => Err(ProviderError::Api(status.as_u16(), text)),
            None => Ok(None),
        }
    }
}

#[async_trait::async_trait]
impl ArtistInfoSource for LastFmClient {
    async fn artist_info(&self, name: &str) -> ProviderResult<Option<ArtistInfo>> {
        tracing::debug!(artist = %name, "Querying Last.fm artist.getInfo");

        let body = self
            .call(&[("method", "artist.getinfo"), ("artist", name), ("autocorrect", "1")])
            .await?;

        match body {
            Some(body) => parse_artist_info(&body)
                .map(Some)
                .ok_or_else(|| ProviderError::Parse("artist.getInfo without artist".to_string())),
            None => Ok(None),
        }
    }

    async fn track_info(&self, artist: &str, title: &str) -> ProviderResult<Option<TrackInfo>> {
        tracing::debug!(artist = %artist, title = %title, "Querying Last.fm track.getInfo");

        let body = self
            .call(&[
                ("method", "track.getInfo"),
                ("artist", artist),
                ("track", title),
                ("autocorrect", "1"),
            ])
            .await?;

        match body {
            Some(body) => parse_track_info(&body)
                .map(Some)
                .ok_or_else(|| ProviderError::Parse("track.getInfo without track".to_string())),
            None => Ok(None),
        }
    }
}
