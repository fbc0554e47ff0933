//! Acceptance and property extraction for the winning point.
//!
//! [`finalize`] is a pure function of its inputs: it decodes the point,
//! verifies the attained order and attaches derived properties, or returns
//! an [`OptimisationFailure`] with no partial method.

use rkopt_methods::analysis::{
    am_radius, check_order_with, error_coefficient, optimal_shu_osher_form, ShuOsherForm,
};
use rkopt_methods::{MethodCoefficients, MethodDescriptor, MethodFamily, Objective};
use tracing::debug;

use crate::error::{OptimisationFailure, OptimiserError};
use crate::multistart::SearchStatus;
use crate::options::OptimiseOptions;

/// Summary of the search that produced a point.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SearchReport {
    /// Aggregated search status.
    pub status: SearchStatus,
    /// Successful runs tied with the best objective.
    pub ties: usize,
    /// Local runs performed.
    pub runs: usize,
    /// Runs with a positive local exit flag.
    pub successful_runs: usize,
    /// Session seed of the starting points.
    pub seed: u64,
}

/// An accepted method with its derived properties.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct EnrichedMethod {
    /// Descriptor searched.
    pub descriptor: MethodDescriptor,
    /// Winning parameter vector.
    pub parameters: Vec<f64>,
    /// Decoded coefficients.
    pub coefficients: MethodCoefficients,
    /// Objective at the winning point.
    pub objective_value: f64,
    /// Numerically verified order.
    pub attained_order: usize,
    /// Leading truncation-error coefficient (single-step methods).
    pub error_coefficient: Option<f64>,
    /// SSP coefficient: `-anchor` for `ssp`, the computed radius for `acc`.
    pub ssp_radius: f64,
    /// Optimal Shu-Osher form (single-step `ssp` methods with finite radius).
    pub shu_osher: Option<ShuOsherForm>,
    /// Search summary.
    pub report: SearchReport,
    /// Whether the method may be written to storage.
    pub persistable: bool,
}

impl EnrichedMethod {
    /// One-line human-readable summary.
    pub fn summary(&self) -> String {
        let mut line = format!(
            "{}: order {} (requested {}), SSP coefficient {:.12}",
            self.descriptor,
            self.attained_order,
            self.descriptor.order(),
            self.ssp_radius
        );
        if let Some(e) = self.error_coefficient {
            line.push_str(&format!(", error coefficient {:.6e}", e));
        }
        line
    }
}

/// Accept or reject the winning point `x` of a search.
///
/// # Errors
///
/// * [`OptimisationFailure::NoConvergence`] if no local run converged
/// * [`OptimisationFailure::OrderShortfall`] if the verified order is below
///   the requested one
/// * [`OptimisationFailure::RadiusBelowThreshold`] for `ssp` when the
///   radius does not exceed `options.min_ssp_radius`
/// * [`OptimiserError::Method`] if `x` cannot be decoded
pub fn finalize(
    x: &[f64],
    descriptor: &MethodDescriptor,
    report: SearchReport,
    options: &OptimiseOptions,
) -> Result<EnrichedMethod, OptimiserError> {
    if !report.status.is_success() {
        return Err(OptimisationFailure::NoConvergence {
            status: report.status,
        }
        .into());
    }

    let family = descriptor.family();
    let coefficients = family.decode(x)?;
    let requested = descriptor.order();
    let attained = check_order_with(
        &coefficients,
        options.problem_type,
        options.order_tolerance(),
    );
    debug!(
        requested,
        attained,
        mode = %options.problem_type,
        "verified order of winning point"
    );
    if attained < requested {
        return Err(OptimisationFailure::OrderShortfall {
            requested,
            attained,
        }
        .into());
    }

    let (objective_value, ssp_radius) = match descriptor.objective() {
        Objective::Ssp => {
            let anchor = coefficients.ssp_anchor.unwrap_or(0.0);
            (anchor, -anchor)
        }
        Objective::Acc => (
            error_coefficient(&coefficients, requested),
            am_radius(&coefficients),
        ),
    };

    if descriptor.objective() == Objective::Ssp && !(ssp_radius > options.min_ssp_radius) {
        return Err(OptimisationFailure::RadiusBelowThreshold {
            radius: ssp_radius,
            minimum: options.min_ssp_radius,
        }
        .into());
    }

    let single_step = coefficients.is_single_step();
    let error_coefficient = single_step.then(|| error_coefficient(&coefficients, requested));
    let shu_osher = if single_step
        && descriptor.objective() == Objective::Ssp
        && ssp_radius.is_finite()
    {
        optimal_shu_osher_form(&coefficients, ssp_radius).ok()
    } else {
        None
    };

    Ok(EnrichedMethod {
        descriptor: *descriptor,
        parameters: x.to_vec(),
        coefficients,
        objective_value,
        attained_order: attained,
        error_coefficient,
        ssp_radius,
        shu_osher,
        report,
        persistable: attained == requested,
    })
}
