//! Error types for the coefficient search.
//!
//! This module provides:
//! - `OptimiserError`: Configuration errors (fatal, raised before any
//!   search work) and the `Failure` arm of an unsuccessful search
//! - `OptimisationFailure`: Why a completed search produced no
//!   acceptable method

use rkopt_core::types::SolverError;
use rkopt_methods::MethodError;
use thiserror::Error;

use crate::multistart::SearchStatus;

/// Acceptance failures of a completed search.
///
/// No coefficients are carried: a failed search exposes only diagnostics.
///
/// # Examples
///
/// ```
/// use rkopt_optimiser::OptimisationFailure;
///
/// let failure = OptimisationFailure::OrderShortfall { requested: 4, attained: 3 };
/// assert!(format!("{}", failure).contains("order 3"));
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OptimisationFailure {
    /// No local run converged.
    #[error("No local run converged (search status {status})")]
    NoConvergence {
        /// Aggregated search status
        status: SearchStatus,
    },

    /// The solver converged to a method of lower order than requested.
    #[error("Converged method has order {attained}, requested {requested}")]
    OrderShortfall {
        /// Requested order
        requested: usize,
        /// Numerically attained order
        attained: usize,
    },

    /// SSP radius at or below the caller's minimum.
    #[error("SSP radius {radius} does not exceed the minimum {minimum}")]
    RadiusBelowThreshold {
        /// Achieved radius
        radius: f64,
        /// Required minimum
        minimum: f64,
    },
}

/// Optimiser errors.
///
/// # Variants
/// - `Method`: Descriptor, codec or analysis error
/// - `Solver`: Local solver or constraint-set error
/// - `InvalidOptions`: Inconsistent options, with every violation listed
/// - `InvalidStartingPoint`: Explicit starting vector of the wrong length
/// - `WorkerPool`: The parallel worker pool could not be created
/// - `Failure`: The search completed without an acceptable method
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OptimiserError {
    /// Descriptor, codec or analysis error.
    #[error(transparent)]
    Method(#[from] MethodError),

    /// Solver or constraint-set error.
    #[error(transparent)]
    Solver(#[from] SolverError),

    /// Inconsistent options.
    #[error("Invalid options: {}", .0.join("; "))]
    InvalidOptions(Vec<String>),

    /// Explicit starting vector does not fit the descriptor.
    #[error("Starting point has length {got}, expected {expected}")]
    InvalidStartingPoint {
        /// Parameter count of the descriptor
        expected: usize,
        /// Length supplied
        got: usize,
    },

    /// Worker pool construction failed.
    #[error("Failed to build worker pool: {0}")]
    WorkerPool(String),

    /// Search finished without an acceptable method.
    #[error("Optimisation failed: {0}")]
    Failure(#[from] OptimisationFailure),
}

impl OptimiserError {
    /// Single-message configuration error.
    pub fn invalid_option(message: impl Into<String>) -> Self {
        OptimiserError::InvalidOptions(vec![message.into()])
    }

    /// Whether this is a search failure rather than a configuration error.
    pub fn is_failure(&self) -> bool {
        matches!(self, OptimiserError::Failure(_))
    }
}
