//! Shared types: errors, bounds and linear constraint sets.

pub mod bounds;
pub mod error;

pub use bounds::{LinearConstraints, LinearEquality, ParameterBounds};
pub use error::{LinalgError, SolverError};
