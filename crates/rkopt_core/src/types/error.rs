//! Error types for structured error handling.
//!
//! This module provides:
//! - `SolverError`: Errors from equation solvers and local optimisers
//! - `LinalgError`: Errors from dense linear algebra routines

use thiserror::Error;

/// Solver errors.
///
/// Provides structured error handling for the Levenberg-Marquardt solver
/// and the constrained local solvers, with descriptive context for each
/// failure mode.
///
/// # Variants
/// - `MaxIterationsExceeded`: Solver failed to converge within iteration limit
/// - `DimensionMismatch`: Input vector does not match the problem dimension
/// - `InfeasibleBounds`: A lower bound exceeds its upper bound
/// - `NumericalInstability`: General numerical instability
///
/// # Examples
/// ```
/// use rkopt_core::types::SolverError;
///
/// let err = SolverError::MaxIterationsExceeded { iterations: 100 };
/// assert!(format!("{}", err).contains("100 iterations"));
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SolverError {
    /// Solver failed to converge within maximum iterations.
    #[error("Failed to converge after {iterations} iterations")]
    MaxIterationsExceeded {
        /// Number of iterations attempted
        iterations: usize,
    },

    /// Vector length does not match the problem dimension.
    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch {
        /// Dimension declared by the problem
        expected: usize,
        /// Length of the supplied vector
        got: usize,
    },

    /// Box bounds with `lower > upper` on some coordinate.
    #[error("Infeasible bounds at index {index}: [{lower}, {upper}]")]
    InfeasibleBounds {
        /// Coordinate index
        index: usize,
        /// Lower bound
        lower: f64,
        /// Upper bound
        upper: f64,
    },

    /// Numerical instability during computation.
    #[error("Numerical instability: {0}")]
    NumericalInstability(String),
}

impl SolverError {
    /// Create a numerical instability error.
    pub fn instability(message: impl Into<String>) -> Self {
        Self::NumericalInstability(message.into())
    }
}

/// Dense linear algebra errors.
#[derive(Error, Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LinalgError {
    /// Pivot below the singularity threshold.
    #[error("Singular matrix: pivot {pivot:e} in column {column}")]
    SingularMatrix {
        /// Column where elimination broke down
        column: usize,
        /// Magnitude of the best available pivot
        pivot: f64,
    },

    /// Operand shapes are incompatible.
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),
}

impl From<LinalgError> for SolverError {
    fn from(err: LinalgError) -> Self {
        SolverError::NumericalInstability(err.to_string())
    }
}
