//! Common error types for tunegraph

use thiserror::Error;

/// Result alias used across the common crate
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by configuration loading and store initialization
#[derive(Error, Debug)]
pub enum Error {
    /// Store operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Filesystem operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file unreadable or malformed
    #[error("Configuration error: {0}")]
    Config(String),
}
