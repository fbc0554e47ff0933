//! Equation solvers and constrained local optimisers.
//!
//! ## Available Solvers
//!
//! - [`LevenbergMarquardtSolver`]: nonlinear least squares, used to project
//!   points onto a constraint manifold
//! - [`AugmentedLagrangianSolver`]: constrained local minimisation behind
//!   the [`LocalSolver`] trait
//!
//! ## Configuration
//!
//! The LM solver uses [`LMConfig`]; the constrained solver uses
//! [`LocalSolverConfig`], whose defaults are tight enough for order
//! conditions (`constraint_tolerance = 1e-12`).

mod constrained;
mod levenberg_marquardt;

pub use constrained::{
    AugmentedLagrangianSolver, ConstraintValues, LocalAlgorithm, LocalSolution, LocalSolver,
    LocalSolverConfig, LocalStatus, NlpProblem,
};
pub use levenberg_marquardt::{LMConfig, LMResult, LevenbergMarquardtSolver};
