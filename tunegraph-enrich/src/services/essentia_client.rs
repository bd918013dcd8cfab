//! Essentia local tempo extraction
//!
//! Runs the `essentia_streaming_extractor_music` command-line tool on an audio
//! file and reads `rhythm.bpm` from its JSON output. Used for tracks the
//! remote feature lookup could not resolve.

use crate::types::{ProviderError, ProviderResult, TempoEstimator};
use serde::Deserialize;
use std::path::Path;
use std::process::Command;

pub const DEFAULT_BINARY: &str = "essentia_streaming_extractor_music";
pub const MIN_PLAUSIBLE_BPM: f64 = 40.0;
pub const MAX_PLAUSIBLE_BPM: f64 = 220.0;

#[derive(Debug, Deserialize)]
struct EssentiaOutput {
    rhythm: Option<EssentiaRhythm>,
}

#[derive(Debug, Deserialize)]
struct EssentiaRhythm {
    bpm: Option<f64>,
}

/// Parse extractor output JSON into a tempo
fn parse_bpm(json: &str) -> ProviderResult<Option<f64>> {
    let output: EssentiaOutput =
        serde_json::from_str(json).map_err(|e| ProviderError::Parse(e.to_string()))?;

    Ok(output
        .rhythm
        .and_then(|r| r.bpm)
        .filter(|bpm| bpm.is_finite() && *bpm > 0.0))
}

/// Essentia tempo extractor
pub struct EssentiaTempoExtractor {
    binary_path: String,
    min_bpm: f64,
    max_bpm: f64,
}

impl EssentiaTempoExtractor {
    /// Create an extractor after checking that the binary runs
    ///
    /// A missing binary is reported as [`ProviderError::Unavailable`].
    pub fn new(binary_path: impl Into<String>, min_bpm: f64, max_bpm: f64) -> Result<Self, ProviderError> {
        let binary_path = binary_path.into();

        match Command::new(&binary_path).arg("--version").output() {
            Ok(_) => Ok(Self {
                binary_path,
                min_bpm,
                max_bpm,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ProviderError::Unavailable(
                format!("{} not found in PATH", binary_path),
            )),
            Err(e) => Err(ProviderError::Unavailable(e.to_string())),
        }
    }

    /// Whether the binary can be executed
    pub fn is_available(binary_path: &str) -> bool {
        Command::new(binary_path).arg("--version").output().is_ok()
    }
}

#[async_trait::async_trait]
impl TempoEstimator for EssentiaTempoExtractor {
    async fn estimate_tempo(&self, audio_path: &Path) -> ProviderResult<Option<f64>> {
        if !audio_path.exists() {
            return Err(ProviderError::Io(format!(
                "audio file not found: {}",
                audio_path.display()
            )));
        }

        let temp_output = std::env::temp_dir().join(format!("essentia_{}.json", uuid::Uuid::new_v4()));

        tracing::debug!(
            audio_file = %audio_path.display(),
            output_file = %temp_output.display(),
            "Running Essentia analysis"
        );

        // Usage: essentia_streaming_extractor_music input.mp3 output.json
        let output = tokio::task::spawn_blocking({
            let binary = self.binary_path.clone();
            let audio = audio_path.to_path_buf();
            let output_file = temp_output.clone();

            move || Command::new(&binary).arg(&audio).arg(&output_file).output()
        })
        .await
        .map_err(|e| ProviderError::Io(format!("Task join error: {}", e)))?
        .map_err(|e| ProviderError::Io(e.to_string()))?;

        if !output.status.success() {
            let _ = std::fs::remove_file(&temp_output);
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ProviderError::Parse(format!(
                "Essentia exit code {:?}: {}",
                output.status.code(),
                stderr.trim()
            )));
        }

        let json_content = tokio::fs::read_to_string(&temp_output)
            .await
            .map_err(|e| ProviderError::Io(e.to_string()));
        let _ = std::fs::remove_file(&temp_output);

        let bpm = parse_bpm(&json_content?)?;

        if let Some(bpm) = bpm {
            if bpm < self.min_bpm || bpm > self.max_bpm {
                tracing::warn!(
                    audio_file = %audio_path.display(),
                    bpm,
                    "Essentia tempo outside plausible range"
                );
            }
        }

        Ok(bpm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_binary_unavailable() {
        let result = EssentiaTempoExtractor::new("definitely-not-an-essentia-binary", 40.0, 220.0);
        assert!(matches!(result, Err(ProviderError::Unavailable(_))));
    }

    #[test]
    fn test_parse_bpm() {
        assert_eq!(
            parse_bpm(r#"{"rhythm": {"bpm": 92.7, "danceability": 1.1}, "tonal": {}}"#).unwrap(),
            Some(92.7)
        );
        assert_eq!(parse_bpm(r#"{"lowlevel": {}}"#).unwrap(), None);
        assert!(parse_bpm("not json").is_err());
    }
}
