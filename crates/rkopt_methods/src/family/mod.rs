//! Coefficient codecs and guess heuristics, one record type per class group.
//!
//! # Architecture
//!
//! Uses enum dispatch (NOT trait objects): [`Family`] wraps every family
//! and is selected once from the descriptor, so no component compares
//! class names after parsing.
//!
//! - [`ButcherFamily`]: `erk`, `irk`, `dirk`, `sdirk`, single- and multistep
//! - [`LowStorageFamily`]: `2S`, `2S*`, `3S*`, `2Semb`, `3S*emb`
//!
//! # Examples
//!
//! ```
//! use rkopt_methods::{MethodClass, MethodDescriptor, MethodFamily, Objective};
//!
//! let desc = MethodDescriptor::new(MethodClass::Erk, 2, 1, 2, Objective::Acc).unwrap();
//! let family = desc.family();
//! let coeffs = family.decode(&[1.0, 0.5, 0.5]).unwrap();
//! assert_eq!(coeffs.a[1][0], 1.0);
//! assert_eq!(family.encode(&coeffs).unwrap(), vec![1.0, 0.5, 0.5]);
//! ```

mod butcher;
mod low_storage;

pub use butcher::ButcherFamily;
pub use low_storage::LowStorageFamily;

use rand::Rng;
use rkopt_core::types::LinearConstraints;

use crate::coefficients::MethodCoefficients;
use crate::descriptor::MethodDescriptor;
use crate::error::MethodError;

/// Capabilities every class provides.
pub trait MethodFamily {
    /// Descriptor the family was built for.
    fn descriptor(&self) -> &MethodDescriptor;

    /// Length of the parameter vector.
    fn parameter_count(&self) -> usize;

    /// Parameter vector to structured coefficients.
    fn decode(&self, x: &[f64]) -> Result<MethodCoefficients, MethodError>;

    /// Structured coefficients to parameter vector; inverse of [`decode`](Self::decode).
    fn encode(&self, coeffs: &MethodCoefficients) -> Result<Vec<f64>, MethodError>;

    /// Structural linear equalities and box bounds.
    fn linear_constraints(&self) -> Result<LinearConstraints, MethodError>;

    /// Randomised starting point.
    fn random_guess<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<f64>;

    /// Deterministic starting point.
    fn smart_guess(&self) -> Vec<f64>;
}

/// All families.
#[derive(Debug, Clone, PartialEq)]
pub enum Family {
    /// Butcher-form classes.
    Butcher(ButcherFamily),
    /// Low-storage classes.
    LowStorage(LowStorageFamily),
}

impl Family {
    /// Select the family for a validated descriptor.
    pub fn for_descriptor(descriptor: MethodDescriptor) -> Self {
        match descriptor.class().butcher_structure() {
            Some(structure) => Family::Butcher(ButcherFamily::new(descriptor, structure)),
            None => Family::LowStorage(LowStorageFamily::new(descriptor)),
        }
    }
}

impl MethodFamily for Family {
    fn descriptor(&self) -> &MethodDescriptor {
        match self {
            Family::Butcher(f) => f.descriptor(),
            Family::LowStorage(f) => f.descriptor(),
        }
    }

    fn parameter_count(&self) -> usize {
        match self {
            Family::Butcher(f) => f.parameter_count(),
            Family::LowStorage(f) => f.parameter_count(),
        }
    }

    fn decode(&self, x: &[f64]) -> Result<MethodCoefficients, MethodError> {
        match self {
            Family::Butcher(f) => f.decode(x),
            Family::LowStorage(f) => f.decode(x),
        }
    }

    fn encode(&self, coeffs: &MethodCoefficients) -> Result<Vec<f64>, MethodError> {
        match self {
            Family::Butcher(f) => f.encode(coeffs),
            Family::LowStorage(f) => f.encode(coeffs),
        }
    }

    fn linear_constraints(&self) -> Result<LinearConstraints, MethodError> {
        match self {
            Family::Butcher(f) => f.linear_constraints(),
            Family::LowStorage(f) => f.linear_constraints(),
        }
    }

    fn random_guess<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<f64> {
        match self {
            Family::Butcher(f) => f.random_guess(rng),
            Family::LowStorage(f) => f.random_guess(rng),
        }
    }

    fn smart_guess(&self) -> Vec<f64> {
        match self {
            Family::Butcher(f) => f.smart_guess(),
            Family::LowStorage(f) => f.smart_guess(),
        }
    }
}

/// Fail unless `x` has the expected length.
fn check_length(x: &[f64], expected: usize) -> Result<(), MethodError> {
    if x.len() == expected {
        Ok(())
    } else {
        Err(MethodError::LengthMismatch {
            expected,
            got: x.len(),
        })
    }
}

/// `n` random weights on the simplex.
fn random_convex_weights<R: Rng + ?Sized>(rng: &mut R, n: usize) -> Vec<f64> {
    let raw: Vec<f64> = (0..n).map(|_| rng.gen_range(0.05..1.0)).collect();
    let total: f64 = raw.iter().sum();
    raw.into_iter().map(|w| w / total).collect()
}
