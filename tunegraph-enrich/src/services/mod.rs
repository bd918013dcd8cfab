//! Enrichment services
//!
//! Provider clients for each external collaborator, the classifier deriving
//! work sets from the store, and the orchestrator running the phases.

pub mod acousticbrainz_client;
pub mod acoustid_client;
pub mod classifier;
pub mod environment;
pub mod essentia_client;
pub mod lastfm_client;
pub mod plex_client;
pub mod tag_probe;
pub mod workflow_orchestrator;

pub use acousticbrainz_client::AcousticBrainzClient;
pub use acoustid_client::AcoustIdClient;
pub use classifier::{WorkScope, WorkSets};
pub use environment::{validate_environment, EnvironmentReport};
pub use essentia_client::EssentiaTempoExtractor;
pub use lastfm_client::LastFmClient;
pub use plex_client::PlexClient;
pub use tag_probe::{LoftyTagProbe, TagKeys};
pub use workflow_orchestrator::{
    EnrichmentOrchestrator, PacingSet, Providers, RefreshStats, RunOptions, RunReport,
};
