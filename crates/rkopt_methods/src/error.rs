//! Error types for method descriptions and analysis.
//!
//! This module provides:
//! - `MethodError`: Errors from descriptor construction, the coefficient
//!   codec and the analysis routines

use rkopt_core::types::{LinalgError, SolverError};
use thiserror::Error;

/// Method errors.
///
/// # Variants
/// - `UnknownClass` / `UnknownObjective`: Unrecognised names
/// - `InvalidDescriptor`: Inconsistent stage, step or order counts
/// - `LengthMismatch`: Parameter vector does not fit the descriptor
/// - `StructureViolation`: Coefficients break the class's zero pattern
/// - `MissingEmbedded`: Embedded weights requested from a class without them
/// - `Unsupported`: Analysis not defined for this kind of method
/// - `Linalg` / `Solver`: Propagated numerical errors
///
/// # Examples
/// ```
/// use rkopt_methods::MethodError;
///
/// let err = MethodError::UnknownClass("rk4".to_string());
/// assert!(format!("{}", err).contains("rk4"));
/// ```
#[derive(Debug, Clone, Error, PartialEq)]
pub enum MethodError {
    /// Class name not recognised.
    #[error("Unknown method class '{0}'")]
    UnknownClass(String),

    /// Objective name not recognised.
    #[error("Unknown objective '{0}' (expected 'ssp' or 'acc')")]
    UnknownObjective(String),

    /// Inconsistent descriptor.
    #[error("Invalid method descriptor: {0}")]
    InvalidDescriptor(String),

    /// Parameter vector length does not match the descriptor.
    #[error("Parameter vector has length {got}, expected {expected}")]
    LengthMismatch {
        /// Length implied by the descriptor
        expected: usize,
        /// Length supplied
        got: usize,
    },

    /// Coefficient set violates the class structure.
    #[error("Structure violation: {0}")]
    StructureViolation(String),

    /// The method has no embedded pair.
    #[error("Method has no embedded weights")]
    MissingEmbedded,

    /// Analysis is not defined for this method.
    #[error("Unsupported analysis: {0}")]
    Unsupported(String),

    /// Linear algebra failure.
    #[error(transparent)]
    Linalg(#[from] LinalgError),

    /// Solver or constraint-set failure.
    #[error(transparent)]
    Solver(#[from] SolverError),
}

impl MethodError {
    /// Create an invalid descriptor error.
    pub fn invalid_descriptor(message: impl Into<String>) -> Self {
        Self::InvalidDescriptor(message.into())
    }

    /// Create a structure violation error.
    pub fn structure(message: impl Into<String>) -> Self {
        Self::StructureViolation(message.into())
    }
}
