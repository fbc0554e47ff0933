//! Numerical building blocks.
//!
//! - `linalg`: dense row-major matrix helpers and LU solves
//! - `finite_diff`: central-difference gradients and Jacobians
//! - `solvers`: Levenberg-Marquardt and constrained local solvers

pub mod finite_diff;
pub mod linalg;
pub mod solvers;
