//! Configuration loading and database path resolution
//!
//! The TOML file is bootstrap configuration only: where the database lives,
//! how to log, how to reach the media catalog, and optional overrides for
//! provider pacing. Secrets may also be stored in the database `settings`
//! table or the environment; that resolution lives in the enrichment crate.
//!
//! Every section is optional. A missing file yields the built-in defaults.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TomlConfig {
    /// Path to the SQLite library database
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub catalog: CatalogConfig,

    #[serde(default)]
    pub credentials: CredentialsConfig,

    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub pacing: PacingConfig,

    #[serde(default)]
    pub tempo: TempoConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (console only when unset)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Media catalog (Plex) connection
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CatalogConfig {
    /// Server base URL, e.g. `http://localhost:32400`
    #[serde(default)]
    pub base_url: Option<String>,
    /// Access token (prefer the settings table or `PLEX_TOKEN`)
    #[serde(default)]
    pub token: Option<String>,
    /// Library section holding the music collection
    #[serde(default)]
    pub section_id: Option<String>,
}

/// API keys for external providers
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CredentialsConfig {
    #[serde(default)]
    pub lastfm_api_key: Option<String>,
    #[serde(default)]
    pub acoustid_api_key: Option<String>,
}

/// Mapping between catalog file paths and the local mount
///
/// The catalog reports paths as seen by the media server. When the audio files
/// are mounted elsewhere locally, `catalog_prefix` is replaced by `local_prefix`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PathsConfig {
    #[serde(default)]
    pub catalog_prefix: Option<String>,
    #[serde(default)]
    pub local_prefix: Option<PathBuf>,
    /// Use catalog paths unchanged (audio files at the same location locally)
    #[serde(default)]
    pub passthrough: bool,
}

/// Per-provider pacing overrides
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PacingConfig {
    #[serde(default)]
    pub lastfm: PacingOverrides,
    #[serde(default)]
    pub acousticbrainz: PacingOverrides,
    #[serde(default)]
    pub acoustid: PacingOverrides,
    /// Local tempo extraction batches
    #[serde(default)]
    pub local_tempo: PacingOverrides,
}

/// Optional overrides for a single pacing policy; unset fields keep the
/// provider's built-in default.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PacingOverrides {
    #[serde(default)]
    pub interval_ms: Option<u64>,
    #[serde(default)]
    pub batch_size: Option<usize>,
    #[serde(default)]
    pub cooldown_secs: Option<u64>,
}

/// Local tempo extraction settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TempoConfig {
    /// Extractor binary name or path
    #[serde(default)]
    pub extractor_binary: Option<String>,
    #[serde(default)]
    pub min_bpm: Option<f64>,
    #[serde(default)]
    pub max_bpm: Option<f64>,
}

/// Default configuration file location (`~/.config/tunegraph/config.toml` on Linux)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("tunegraph").join("config.toml"))
}

/// Load TOML configuration from `path`
///
/// A missing file is not an error and yields defaults. A file that exists but
/// cannot be read or parsed is a configuration error.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        tracing::debug!("Config file {} not found, using defaults", path.display());
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;

    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Resolve the database path
///
/// Priority order:
/// 1. Command-line argument
/// 2. Environment variable
/// 3. TOML `database_path`
/// 4. OS-dependent default under the local data directory
pub fn resolve_database_path(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    toml_config: &TomlConfig,
) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &toml_config.database_path {
        return path.clone();
    }

    default_data_folder().join("library.db")
}

/// OS-dependent data folder
fn default_data_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("tunegraph"))
        .unwrap_or_else(|| PathBuf::from("./tunegraph_data"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    const ENV_VAR: &str = "TUNEGRAPH_TEST_DATABASE";

    #[test]
    fn test_missing_file_yields_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = load_toml_config(&temp_dir.path().join("absent.toml")).unwrap();

        assert!(config.database_path.is_none());
        assert_eq!(config.logging.level, "info");
        assert!(config.credentials.lastfm_api_key.is_none());
    }

    #[test]
    fn test_parses_sections() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
database_path = "/srv/music/library.db"

[logging]
level = "debug"

[catalog]
base_url = "http://plex.local:32400"
section_id = "3"

[credentials]
lastfm_api_key = "abc123"

[paths]
catalog_prefix = "/data/music"
local_prefix = "/mnt/nas/music"

[pacing.local_tempo]
batch_size = 10
cooldown_secs = 30
"#,
        )
        .unwrap();

        let config = load_toml_config(&path).unwrap();
        assert_eq!(config.database_path, Some(PathBuf::from("/srv/music/library.db")));
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.catalog.section_id.as_deref(), Some("3"));
        assert_eq!(config.credentials.lastfm_api_key.as_deref(), Some("abc123"));
        assert_eq!(config.paths.catalog_prefix.as_deref(), Some("/data/music"));
        assert_eq!(config.pacing.local_tempo.batch_size, Some(10));
        assert_eq!(config.pacing.local_tempo.interval_ms, None);
        assert_eq!(config.pacing.lastfm.interval_ms, None);
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "database_path = [unterminated").unwrap();

        match load_toml_config(&path) {
            Err(Error::Config(msg)) => assert!(msg.contains("Parse")),
            other => panic!("expected config error, got {:?}", other),
        }
    }

    #[test]
    #[serial]
    fn test_database_path_priority() {
        let toml_config = TomlConfig {
            database_path: Some(PathBuf::from("/from/toml.db")),
            ..Default::default()
        };

        std::env::set_var(ENV_VAR, "/from/env.db");
        let cli = PathBuf::from("/from/cli.db");
        assert_eq!(
            resolve_database_path(Some(&cli), ENV_VAR, &toml_config),
            PathBuf::from("/from/cli.db")
        );
        assert_eq!(
            resolve_database_path(None, ENV_VAR, &toml_config),
            PathBuf::from("/from/env.db")
        );

        std::env::remove_var(ENV_VAR);
        assert_eq!(
            resolve_database_path(None, ENV_VAR, &toml_config),
            PathBuf::from("/from/toml.db")
        );

        let fallback = resolve_database_path(None, ENV_VAR, &TomlConfig::default());
        assert!(fallback.ends_with("library.db"));
    }
}
