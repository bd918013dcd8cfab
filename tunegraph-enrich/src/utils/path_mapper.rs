//! Catalog path to local path mapping
//!
//! The media server reports file locations as it sees them. Enrichment reads
//! the same files through a local mount, so the catalog prefix is swapped for
//! the local one. Paths outside the catalog prefix have no local counterpart.

use std::path::{Path, PathBuf};
use tunegraph_common::config::PathsConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMapper {
    catalog_prefix: String,
    local_prefix: PathBuf,
}

impl PathMapper {
    /// Rewrite paths starting with `catalog_prefix` to live under `local_prefix`
    pub fn new(catalog_prefix: impl Into<String>, local_prefix: impl Into<PathBuf>) -> Self {
        let catalog_prefix = catalog_prefix.into();
        Self {
            catalog_prefix: catalog_prefix.trim_end_matches('/').to_string(),
            local_prefix: local_prefix.into(),
        }
    }

    /// Use catalog paths unchanged
    pub fn passthrough() -> Self {
        Self {
            catalog_prefix: String::new(),
            local_prefix: PathBuf::new(),
        }
    }

    /// Build a mapper from configuration, or `None` when no mapping is configured
    pub fn from_config(paths: &PathsConfig) -> Option<Self> {
        match (&paths.catalog_prefix, &paths.local_prefix) {
            (Some(catalog), Some(local)) => Some(Self::new(catalog.clone(), local.clone())),
            _ if paths.passthrough => Some(Self::passthrough()),
            _ => None,
        }
    }

    fn is_passthrough(&self) -> bool {
        self.catalog_prefix.is_empty() && self.local_prefix.as_os_str().is_empty()
    }

    /// Local path for a catalog path, without checking existence
    pub fn map(&self, catalog_path: &str) -> Option<PathBuf> {
        if self.is_passthrough() {
            return Some(PathBuf::from(catalog_path));
        }

        let rest = catalog_path.strip_prefix(&self.catalog_prefix)?;
        // Guard against "/music" matching "/music2/..."
        if !rest.is_empty() && !rest.starts_with('/') {
            return None;
        }

        let rest = rest.trim_start_matches('/');
        if rest.is_empty() {
            Some(self.local_prefix.clone())
        } else {
            Some(self.local_prefix.join(rest))
        }
    }

    /// Local path for a catalog path, only if the file is present
    pub fn resolve_existing(&self, catalog_path: &str) -> Option<PathBuf> {
        self.map(catalog_path).filter(|p| p.exists())
    }

    /// Whether the local side of the mapping is reachable
    pub fn local_root_exists(&self) -> bool {
        self.is_passthrough() || Path::new(&self.local_prefix).is_dir()
    }
}
