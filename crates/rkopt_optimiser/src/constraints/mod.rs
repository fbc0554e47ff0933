//! Linear and nonlinear constraint formulation.
//!
//! - [`linear_constraints`]: structural equalities and bounds, a pure
//!   function of the descriptor
//! - [`NonlinearConstraints`]: a list of [`ConstraintContributor`]s, each
//!   adding zero or more residuals

mod nonlinear;

pub use nonlinear::{
    AbsoluteMonotonicity, ConstraintContributor, EmbeddedStabilityBound, NonlinearConstraints,
    OrderConditionResiduals, StabilityCoefficientPins,
};

use rkopt_core::types::LinearConstraints;
use rkopt_methods::{Family, MethodFamily};

use crate::error::OptimiserError;

/// Structural linear equalities and bounds of a family, validated.
///
/// # Examples
///
/// ```
/// use rkopt_methods::{MethodClass, MethodDescriptor, Objective};
/// use rkopt_optimiser::constraints::linear_constraints;
///
/// let desc = MethodDescriptor::new(MethodClass::Erk, 3, 1, 2, Objective::Ssp).unwrap();
/// let lc = linear_constraints(&desc.family()).unwrap();
/// // Σ b = 1
/// assert_eq!(lc.equalities().len(), 1);
/// // the anchor is non-positive
/// assert_eq!(lc.bounds()[6].max, 0.0);
/// ```
pub fn linear_constraints(family: &Family) -> Result<LinearConstraints, OptimiserError> {
    let lc = family.linear_constraints()?;
    lc.validate()?;
    Ok(lc)
}
