//! # tunegraph common library
//!
//! Shared pieces used by the enrichment binary and its tests:
//! - Error type and result alias
//! - TOML configuration loading and database path resolution
//! - SQLite pool initialization and schema creation

pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};
