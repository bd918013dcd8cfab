//! AcousticBrainz API client
//!
//! Tempo lookup by MusicBrainz recording id. Only `rhythm.bpm` is read from
//! the low-level documents.
//!
//! Note: AcousticBrainz stopped accepting submissions in 2022, so data exists
//! only for recordings analyzed before then. Misses are common.

use crate::types::{FeatureLookup, ProviderError, ProviderResult};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

const ACOUSTICBRAINZ_BASE_URL: &str = "https://acousticbrainz.org/api/v1";
const USER_AGENT: &str = "tunegraph/0.1.0";

/// Most recording ids the bulk endpoint accepts per request
pub const MAX_BULK_IDS: usize = 25;

#[derive(Debug, Deserialize)]
struct LowLevelDoc {
    rhythm: Option<Rhythm>,
}

#[derive(Debug, Deserialize)]
struct Rhythm {
    bpm: Option<f64>,
}

impl LowLevelDoc {
    fn bpm(&self) -> Option<f64> {
        self.rhythm
            .as_ref()
            .and_then(|r| r.bpm)
            .filter(|bpm| bpm.is_finite() && *bpm > 0.0)
    }
}

/// Extract `{mbid: bpm}` from a bulk response
///
/// The bulk document maps each found recording id to its submissions keyed
/// "0", "1", ...; the first submission is used. Other top-level keys (such as
/// `mbid_mapping`) are ignored.
fn parse_bulk(body: &serde_json::Value) -> HashMap<String, f64> {
    let mut found = HashMap::new();

    let Some(entries) = body.as_object() else {
        return found;
    };

    for (mbid, submissions) in entries {
        let bpm = submissions
            .get("0")
            .and_then(|doc| doc.get("rhythm"))
            .and_then(|rhythm| rhythm.get("bpm"))
            .and_then(|bpm| bpm.as_f64())
            .filter(|bpm| bpm.is_finite() && *bpm > 0.0);

        if let Some(bpm) = bpm {
            found.insert(mbid.clone(), bpm);
        }
    }

    found
}

/// AcousticBrainz API client
pub struct AcousticBrainzClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl AcousticBrainzClient {
    pub fn new() -> Result<Self, ProviderError> {
        Self::with_base_url(ACOUSTICBRAINZ_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, ProviderError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn get(&self, url: &str, query: &[(&str, String)]) -> ProviderResult<reqwest::Response> {
        let response = self.http_client.get(url).query(query).send().await?;

        let status = response.status();
        if status == 429 {
            return Err(ProviderError::RateLimited);
        }
        if status == 404 || status.is_success() {
            return Ok(response);
        }

        let error_text = response.text().await.unwrap_or_default();
        Err(ProviderError::Api(status.as_u16(), error_text))
    }
}

#[async_trait::async_trait]
impl FeatureLookup for AcousticBrainzClient {
    async fn lookup_one(&self, mbid: &str) -> ProviderResult<Option<f64>> {
        let url = format!("{}/{}/low-level", self.base_url, mbid);
        tracing::debug!(mbid = %mbid, url = %url, "Querying AcousticBrainz API");

        let response = self.get(&url, &[]).await?;
        if response.status() == 404 {
            return Ok(None);
        }

        let doc: LowLevelDoc = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        Ok(doc.bpm())
    }

    async fn lookup_bulk(&self, mbids: &[String]) -> ProviderResult<HashMap<String, f64>> {
        if mbids.is_empty() {
            return Ok(HashMap::new());
        }
        if mbids.len() > MAX_BULK_IDS {
            return Err(ProviderError::Parse(format!(
                "bulk lookup takes at most {} ids, got {}",
                MAX_BULK_IDS,
                mbids.len()
            )));
        }

        let url = format!("{}/low-level", self.base_url);
        tracing::debug!(count = mbids.len(), "Querying AcousticBrainz bulk API");

        let response = self.get(&url, &[("recording_ids", mbids.join(";"))]).await?;
        if response.status() == 404 {
            return Ok(HashMap::new());
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        Ok(parse_bulk(&body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        assert!(AcousticBrainzClient::new().is_ok());
    }

    #[test]
    fn test_parse_bulk_reads_first_submission() {
        let body = serde_json::json!({
            "c8a7d2b1-0000-4000-8000-000000000001": {
                "0": {"rhythm": {"bpm": 128.4}},
                "1": {"rhythm": {"bpm": 64.2}}
            },
            "c8a7d2b1-0000-4000-8000-000000000002": {
                "0": {"rhythm": {}}
            },
            "mbid_mapping": {}
        });

        let found = parse_bulk(&body);
        assert_eq!(found.len(), 1);
        assert_eq!(found["c8a7d2b1-0000-4000-8000-000000000001"], 128.4);
    }

    #[test]
    fn test_single_doc_rejects_zero_bpm() {
        let doc: LowLevelDoc = serde_json::from_str(r#"{"rhythm": {"bpm": 0.0}}"#).unwrap();
        assert_eq!(doc.bpm(), None);
    }
}
