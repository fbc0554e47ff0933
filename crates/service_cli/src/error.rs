//! CLI error types.

use rkopt_methods::MethodError;
use rkopt_optimiser::OptimiserError;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors surfaced by the `rkopt` binary.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration could not be loaded or is inconsistent.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Unknown class, objective or invalid descriptor.
    #[error(transparent)]
    Method(#[from] MethodError),

    /// Search configuration error or unacceptable search result.
    #[error(transparent)]
    Optimiser(#[from] OptimiserError),

    /// Writing output failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Encoding output failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;
