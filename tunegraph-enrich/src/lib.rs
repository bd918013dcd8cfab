//! tunegraph-enrich library interface
//!
//! Incremental enrichment of a music library store: MusicBrainz ids, genre
//! tags, a bounded artist-similarity graph and track tempo, pulled from a
//! media catalog and several external providers.

pub mod config;
pub mod db;
pub mod services;
pub mod types;
pub mod utils;

pub use services::workflow_orchestrator::{
    EnrichmentOrchestrator, PacingSet, Providers, RunOptions, RunReport,
};
pub use types::{ProviderError, ProviderResult};
