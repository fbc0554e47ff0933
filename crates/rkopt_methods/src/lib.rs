//! # rkopt_methods (L2: Method Domain)
//!
//! Runge-Kutta method classes, coefficient codecs and method analysis.
//!
//! This crate provides:
//! - Method classes, objectives and validated descriptors
//! - Structured coefficient sets (Butcher, multistep and low-storage forms)
//! - Per-class codecs between parameter vectors and coefficients, with
//!   structural linear constraints and starting-point heuristics
//! - Rooted trees and B-series order conditions
//! - SSP analysis: absolute monotonicity, radius, Shu-Osher form
//! - Linear stability functions
//!
//! ## Design Principles
//!
//! - **Enum-based families** for static dispatch, selected once per descriptor
//! - **General multistep form** so every analysis routine covers every class
//! - **Pure functions** of the coefficients; no shared mutable state
//!
//! ## Example
//!
//! ```
//! use rkopt_methods::analysis::{am_radius, check_order, DEFAULT_ORDER_TOLERANCE};
//! use rkopt_methods::{MethodClass, MethodDescriptor, MethodFamily, Objective};
//!
//! let desc = MethodDescriptor::new(MethodClass::TwoSStar, 3, 1, 2, Objective::Ssp).unwrap();
//! let family = desc.family();
//! let coeffs = family.decode(&family.smart_guess()).unwrap();
//! assert_eq!(check_order(&coeffs, DEFAULT_ORDER_TOLERANCE), 2);
//! assert!((am_radius(&coeffs) - 2.0).abs() < 1e-10);
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

pub mod analysis;
pub mod class;
pub mod coefficients;
pub mod descriptor;
pub mod error;
pub mod family;
pub mod trees;

pub use class::{ButcherStructure, LowStorageScheme, MethodClass, Objective};
pub use coefficients::{EmbeddedWeights, LowStorageCoefficients, MethodCoefficients};
pub use descriptor::{history_nodes, MethodDescriptor, MAX_ORDER};
pub use error::MethodError;
pub use family::{ButcherFamily, Family, LowStorageFamily, MethodFamily};
