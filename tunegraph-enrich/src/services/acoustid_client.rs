//! AcoustID API client
//!
//! Resolves an AcoustID track id (embedded in files by tagging tools) to a
//! MusicBrainz recording id. Pacing is applied by the calling phase.

use crate::types::{FingerprintResolver, ProviderError, ProviderResult};
use serde::Deserialize;
use std::time::Duration;

const ACOUSTID_BASE_URL: &str = "https://api.acoustid.org/v2/lookup";
const USER_AGENT: &str = "tunegraph/0.1.0";
/// AcoustID error code for a bad application key
const INVALID_API_KEY: i64 = 4;

#[derive(Debug, Deserialize)]
struct AcoustIdResponse {
    status: String,
    #[serde(default)]
    results: Vec<AcoustIdResult>,
    error: Option<AcoustIdErrorBody>,
}

#[derive(Debug, Deserialize)]
struct AcoustIdResult {
    #[serde(default)]
    recordings: Option<Vec<AcoustIdRecording>>,
}

#[derive(Debug, Deserialize)]
struct AcoustIdRecording {
    id: String,
}

#[derive(Debug, Deserialize)]
struct AcoustIdErrorBody {
    code: Option<i64>,
    message: Option<String>,
}

impl AcoustIdResponse {
    /// First recording id across all results
    fn first_recording(self) -> Option<String> {
        self.results
            .into_iter()
            .filter_map(|r| r.recordings)
            .flatten()
            .map(|rec| rec.id)
            .find(|id| !id.trim().is_empty())
    }
}

/// AcoustID client
pub struct AcoustIdClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl AcoustIdClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self, ProviderError> {
        Self::with_base_url(ACOUSTID_BASE_URL, api_key)
    }

    /// Client against a non-default endpoint (mirrors, tests)
    pub fn with_base_url(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ProviderError::Unavailable("AcoustID API key is empty".to_string()));
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
}

#[async_trait::async_trait]
impl FingerprintResolver for AcoustIdClient {
    async fn resolve(&self, fingerprint: &str) -> ProviderResult<Option<String>> {
        tracing::debug!(acoustid = %fingerprint, "Querying AcoustID API");

        let response = self
            .http_client
            .get(&self.base_url)
            .query(&[
                ("client", self.api_key.as_str()),
                ("trackid", fingerprint),
                ("meta", "recordings"),
            ])
            .send()
            .await?;

        let status = response.status();
        if status == 429 {
            return Err(ProviderError::RateLimited);
        }

        let text = response.text().await?;
        let body: AcoustIdResponse = match serde_json::from_str(&text) {
            Ok(body) => body,
            Err(_) if !status.is_success() => {
                return Err(ProviderError::Api(status.as_u16(), text));
            }
            Err(e) => return Err(ProviderError::Parse(e.to_string())),
        };

        if body.status != "ok" {
            let (code, message) = body
                .error
                .map(|e| (e.code, e.message.unwrap_or_default()))
                .unwrap_or((None, String::new()));

            if code == Some(INVALID_API_KEY) {
                return Err(ProviderError::Unavailable(format!(
                    "AcoustID rejected API key: {}",
                    message
                )));
            }
            return Err(ProviderError::Api(status.as_u16(), message));
        }

        Ok(body.first_recording())
    }
}
