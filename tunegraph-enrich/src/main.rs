//! tunegraph-enrich - music library enrichment
//!
//! Pulls tracks from the media catalog into the library store and enriches
//! them with MusicBrainz ids, genres, similar artists and tempo.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tunegraph_common::config::{default_config_path, load_toml_config, resolve_database_path};
use tunegraph_enrich::config::EnrichSettings;
use tunegraph_enrich::services::validate_environment;
use tunegraph_enrich::{EnrichmentOrchestrator, RunOptions};

const DATABASE_ENV: &str = "TUNEGRAPH_DATABASE";

/// Command-line arguments for tunegraph-enrich
#[derive(Parser, Debug)]
#[command(name = "tunegraph-enrich")]
#[command(about = "Incremental metadata enrichment for a music library")]
#[command(version)]
struct Cli {
    /// Configuration file
    #[arg(short, long, global = true, env = "TUNEGRAPH_CONFIG")]
    config: Option<PathBuf>,

    /// Library database (overrides TUNEGRAPH_DATABASE and the config file)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import the whole catalog and enrich everything
    Full(PhaseArgs),
    /// Import entries added since the last run and enrich what is pending
    Incremental {
        /// Cutoff override (YYYY-MM-DD or RFC 3339)
        #[arg(long, value_parser = parse_since)]
        since: Option<DateTime<Utc>>,

        #[command(flatten)]
        phases: PhaseArgs,
    },
    /// Re-read file tags of the given artists and replace differing MBIDs
    Refresh {
        /// Artist name (repeatable)
        #[arg(long = "artist", required = true)]
        artists: Vec<String>,

        /// Show changes without writing them
        #[arg(long)]
        dry_run: bool,
    },
    /// Show enrichment coverage of the library
    Status,
    /// Check database, file access, tools and credentials
    Check,
}

#[derive(Args, Debug, Default)]
struct PhaseArgs {
    /// Skip embedded-tag identifier extraction
    #[arg(long)]
    skip_identifiers: bool,

    /// Skip AcoustID fingerprint resolution
    #[arg(long)]
    skip_fingerprints: bool,

    /// Skip Last.fm artist enrichment
    #[arg(long)]
    skip_artists: bool,

    /// Skip Last.fm track tags
    #[arg(long)]
    skip_track_tags: bool,

    /// Skip tempo enrichment
    #[arg(long)]
    skip_tempo: bool,

    /// Process at most N items per work set
    #[arg(long, value_name = "N")]
    limit: Option<usize>,
}

impl From<PhaseArgs> for RunOptions {
    fn from(args: PhaseArgs) -> Self {
        RunOptions {
            skip_identifiers: args.skip_identifiers,
            skip_fingerprints: args.skip_fingerprints,
            skip_artists: args.skip_artists,
            skip_track_tags: args.skip_track_tags,
            skip_tempo: args.skip_tempo,
            limit: args.limit,
        }
    }
}

fn parse_since(value: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return date
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc())
            .ok_or_else(|| format!("invalid date: {}", value));
    }
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("expected YYYY-MM-DD or RFC 3339 timestamp: {}", e))
}

/// Console logging filtered by RUST_LOG or the configured level, plus an
/// optional plain-text log file
fn init_tracing(level: &str, log_file: Option<&PathBuf>) -> Result<()> {
    let file_layer = match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(std::sync::Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    Ok(())
}

fn print_output<T: Serialize>(json: bool, value: &T, text: String) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        println!("{}", text);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().or_else(default_config_path);
    let toml_config = match &config_path {
        Some(path) => load_toml_config(path).context("Failed to load configuration")?,
        None => Default::default(),
    };

    init_tracing(&toml_config.logging.level, toml_config.logging.file.as_ref())?;

    info!("Starting tunegraph-enrich {}", env!("CARGO_PKG_VERSION"));

    let db_path = resolve_database_path(cli.database.as_deref(), DATABASE_ENV, &toml_config);
    info!("Database: {}", db_path.display());

    // Store failure at startup is the one fatal condition
    let db = tunegraph_common::db::init_database(&db_path)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;

    let settings = EnrichSettings::resolve(&db, &toml_config)
        .await
        .context("Failed to resolve settings")?;

    match cli.command {
        Command::Full(phases) => {
            let orchestrator = EnrichmentOrchestrator::from_settings(db, &settings, phases.into());
            let report = orchestrator.run_full().await?;
            print_output(cli.json, &report, report.display_string())?;
        }
        Command::Incremental { since, phases } => {
            let orchestrator = EnrichmentOrchestrator::from_settings(db, &settings, phases.into());
            let report = orchestrator.run_incremental(since).await?;
            print_output(cli.json, &report, report.display_string())?;
        }
        Command::Refresh { artists, dry_run } => {
            let orchestrator =
                EnrichmentOrchestrator::from_settings(db, &settings, RunOptions::default());
            let stats = orchestrator.refresh_identifiers(&artists, dry_run).await?;
            print_output(cli.json, &stats, stats.display_string())?;
        }
        Command::Status => {
            let status = tunegraph_enrich::db::status::check_status(&db).await?;
            print_output(cli.json, &status, status.display_string())?;
        }
        Command::Check => {
            let report = validate_environment(&db, &settings).await;
            print_output(cli.json, &report, report.display_string())?;
        }
    }

    Ok(())
}
