//! # rkopt_optimiser
//!
//! Multi-start constrained search for optimal Runge-Kutta coefficients.
//!
//! This crate sits between the method domain (L2) and the command-line
//! service, turning a method descriptor and search options into a verified
//! method with its derived properties.
//!
//! ## Architecture Position
//!
//! Layer 2.5. Depends on `rkopt_core` (L1) for the local solver and
//! `rkopt_methods` (L2) for codecs and analysis.
//!
//! ## Modules
//!
//! - `options`: Search options, start modes and verbosity
//! - `rng`: Session random-number handle with derived streams
//! - `guess`: Starting points and the order-condition projection
//! - `constraints`: Linear constraints and composable nonlinear contributors
//! - `objective`: SSP anchor or truncation-error norm
//! - `problem`: The nonlinear program handed to the local solver
//! - `multistart`: Parallel multi-start driver and best-run selection
//! - `finalize`: Acceptance checks and property extraction
//! - `optimise`: The entry point
//!
//! ## Example
//!
//! ```no_run
//! use rkopt_optimiser::prelude::*;
//!
//! let options = OptimiseOptions::default()
//!     .with_starting_point_count(8)
//!     .with_worker_count(4)
//!     .with_seed(42);
//! match optimise(4, 3, "erk", "ssp", &options) {
//!     Ok(method) => println!("{}", method.summary()),
//!     Err(e) if e.is_failure() => eprintln!("no acceptable method: {}", e),
//!     Err(e) => return Err(e),
//! }
//! # Ok::<(), OptimiserError>(())
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

pub mod constraints;
pub mod finalize;
pub mod guess;
pub mod multistart;
pub mod objective;
pub mod options;
pub mod problem;
pub mod rng;

mod error;
mod optimise;

pub use error::{OptimisationFailure, OptimiserError};
pub use finalize::{finalize, EnrichedMethod, SearchReport};
pub use multistart::{search, RunResult, SearchOutcome, SearchSettings, SearchStatus};
pub use optimise::optimise;
pub use options::{OptimiseOptions, StartMode, Verbosity};
pub use problem::MethodProblem;
pub use rng::SearchRng;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::finalize::{EnrichedMethod, SearchReport};
    pub use crate::multistart::SearchStatus;
    pub use crate::optimise::optimise;
    pub use crate::options::{OptimiseOptions, StartMode, Verbosity};
    pub use crate::{OptimisationFailure, OptimiserError};
}
