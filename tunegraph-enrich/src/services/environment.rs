//! Pre-flight environment check
//!
//! Reports which capabilities a run would have. Never fails: every problem is
//! recorded in [`EnvironmentReport::errors`].

use crate::config::EnrichSettings;
use crate::services::EssentiaTempoExtractor;
use serde::Serialize;
use sqlx::SqlitePool;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EnvironmentReport {
    pub database_ok: bool,
    /// Path mapping configured and local root reachable
    pub paths_ok: bool,
    /// A stored track path resolves to an existing local file
    pub sample_file_ok: bool,
    pub extractor_ok: bool,
    pub catalog_configured: bool,
    pub lastfm_configured: bool,
    pub acoustid_configured: bool,
    pub errors: Vec<String>,
}

impl EnvironmentReport {
    /// Whether file-based phases can run
    pub fn is_ready(&self) -> bool {
        self.database_ok && self.paths_ok
    }

    pub fn display_string(&self) -> String {
        fn mark(ok: bool) -> &'static str {
            if ok {
                "ok"
            } else {
                "MISSING"
            }
        }

        let mut lines = vec![
            format!("database        {}", mark(self.database_ok)),
            format!("path mapping    {}", mark(self.paths_ok)),
            format!("sample file     {}", mark(self.sample_file_ok)),
            format!("tempo extractor {}", mark(self.extractor_ok)),
            format!("media catalog   {}", mark(self.catalog_configured)),
            format!("Last.fm key     {}", mark(self.lastfm_configured)),
            format!("AcoustID key    {}", mark(self.acoustid_configured)),
        ];
        lines.extend(self.errors.iter().map(|e| format!("error: {}", e)));
        lines.join("\n")
    }
}

/// Check store, file mapping, local tools and credentials
pub async fn validate_environment(pool: &SqlitePool, settings: &EnrichSettings) -> EnvironmentReport {
    let mut report = EnvironmentReport::default();

    match sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(pool).await {
        Ok(_) => report.database_ok = true,
        Err(e) => report.errors.push(format!("Database connection failed: {}", e)),
    }

    match &settings.path_mapper {
        None => report.errors.push("Path mapping not configured".to_string()),
        Some(mapper) if !mapper.local_root_exists() => {
            report.errors.push("Local music root not accessible".to_string());
        }
        Some(mapper) => {
            report.paths_ok = true;
            if report.database_ok {
                match crate::db::tracks::sample_file_path(pool).await {
                    Ok(Some(path)) => {
                        report.sample_file_ok = mapper.resolve_existing(&path).is_some();
                        if !report.sample_file_ok {
                            report.errors.push(format!("Sample track file not found: {}", path));
                        }
                    }
                    Ok(None) => {}
                    Err(e) => report.errors.push(format!("Failed to read sample track: {}", e)),
                }
            }
        }
    }

    report.extractor_ok = EssentiaTempoExtractor::is_available(&settings.extractor_binary);
    if !report.extractor_ok {
        report
            .errors
            .push(format!("Tempo extractor not found: {}", settings.extractor_binary));
    }

    report.catalog_configured = settings.catalog.is_some();
    report.lastfm_configured = settings.lastfm_api_key.is_some();
    report.acoustid_configured = settings.acoustid_api_key.is_some();

    tracing::debug!(
        database_ok = report.database_ok,
        paths_ok = report.paths_ok,
        extractor_ok = report.extractor_ok,
        errors = report.errors.len(),
        "Environment validated"
    );

    report
}
