//! # rkopt_core: Numerical Foundation for Runge-Kutta Coefficient Search
//!
//! ## Layer 1 (Foundation) Role
//!
//! rkopt_core is the bottom layer of the workspace, providing:
//! - Dense linear algebra on small matrices (`math::linalg`)
//! - Finite-difference derivatives (`math::finite_diff`)
//! - Levenberg-Marquardt least squares (`math::solvers`)
//! - The constrained local solver seam, [`NlpProblem`](math::solvers::NlpProblem)
//!   and [`LocalSolver`](math::solvers::LocalSolver), with an augmented-Lagrangian
//!   reference implementation
//! - Error types and linear constraint sets (`types`)
//!
//! ## Zero Dependency Principle
//!
//! Layer 1 has no dependencies on other rkopt_* crates, with minimal external dependencies:
//! - thiserror: Error derivation
//! - serde: Serialisation support (optional)
//!
//! ## Usage Examples
//!
//! ```rust
//! use rkopt_core::math::linalg;
//! use rkopt_core::math::solvers::LevenbergMarquardtSolver;
//!
//! let a = vec![vec![2.0, 0.0], vec![1.0, 1.0]];
//! let x = linalg::solve(&a, &[2.0, 3.0]).unwrap();
//! assert!((x[1] - 2.0).abs() < 1e-14);
//!
//! let solver = LevenbergMarquardtSolver::with_defaults();
//! let fit = solver.solve(|p| vec![p[0] * p[0] - 2.0], vec![1.0]).unwrap();
//! assert!((fit.params[0] - 2.0_f64.sqrt()).abs() < 1e-10);
//! ```
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialisation for errors, bounds and solver configuration

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

pub mod math;
pub mod types;
