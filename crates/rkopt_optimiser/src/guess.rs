//! Starting points.
//!
//! Start `i` uses the session stream [`SearchRng::derive`]`(i)`. The smart
//! and explicit modes fix start 0 only; further starts are random. Each
//! start may be projected onto the order conditions with a bounded
//! Levenberg-Marquardt solve; a projection that does not converge is
//! logged and its partial result kept.

use rkopt_core::math::solvers::{LMConfig, LevenbergMarquardtSolver, NlpProblem};
use rkopt_methods::{Family, MethodFamily};
use tracing::{debug, warn};

use crate::error::OptimiserError;
use crate::options::{OptimiseOptions, StartMode};
use crate::problem::MethodProblem;
use crate::rng::SearchRng;

/// Iteration budget of the projection solve.
const PROJECTION_ITERATIONS: usize = 200;

/// Starting point `index` for the given mode.
pub fn initial_guess(
    family: &Family,
    mode: &StartMode,
    index: usize,
    rng: &mut SearchRng,
) -> Result<Vec<f64>, OptimiserError> {
    match (mode, index) {
        (StartMode::Smart, 0) => Ok(family.smart_guess()),
        (StartMode::Explicit(x), 0) => {
            let expected = family.parameter_count();
            if x.len() != expected {
                return Err(OptimiserError::InvalidStartingPoint {
                    expected,
                    got: x.len(),
                });
            }
            Ok(x.clone())
        }
        _ => Ok(family.random_guess(rng)),
    }
}

/// Move `x` towards the order-condition manifold.
///
/// Best effort: the returned vector satisfies the bounds but may still
/// violate the conditions.
pub fn project_onto_order_conditions(problem: &MethodProblem, x: Vec<f64>) -> Vec<f64> {
    let linear = problem.linear_constraints();
    let solver = LevenbergMarquardtSolver::new(LMConfig::new(1e-13, PROJECTION_ITERATIONS));
    match solver.solve_projected(
        |p| problem.projection_residuals(p),
        x.clone(),
        |p| linear.project_bounds(p),
    ) {
        Ok(result) if result.converged => {
            debug!(
                iterations = result.iterations,
                residual = result.residual_norm(),
                "projected starting point"
            );
            result.params
        }
        Ok(result) => {
            warn!(
                iterations = result.iterations,
                residual = result.residual_norm(),
                "order-condition projection did not converge; using partial result"
            );
            result.params
        }
        Err(e) => {
            warn!(error = %e, "order-condition projection failed; using unprojected start");
            x
        }
    }
}

/// All starting points of a search, independent of worker count.
pub fn starting_points(
    problem: &MethodProblem,
    options: &OptimiseOptions,
    session: &SearchRng,
) -> Result<Vec<Vec<f64>>, OptimiserError> {
    (0..options.starting_point_count)
        .map(|i| {
            let mut rng = session.derive(i as u64);
            let x = initial_guess(problem.family(), &options.start_mode, i, &mut rng)?;
            Ok(if options.solve_order_conditions_first {
                project_onto_order_conditions(problem, x)
            } else {
                x
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rkopt_methods::{MethodClass, MethodDescriptor, Objective};

    fn problem(class: MethodClass, s: usize, p: usize, obj: Objective) -> MethodProblem {
        let desc = MethodDescriptor::new(class, s, 1, p, obj).unwrap();
        MethodProblem::new(desc, &OptimiseOptions::default()).unwrap()
    }

    #[test]
    fn test_smart_mode_fixes_first_start_only() {
        let p = problem(MethodClass::Erk, 3, 2, Objective::Ssp);
        let options = OptimiseOptions::default()
            .with_start_mode(StartMode::Smart)
            .with_starting_point_count(3);
        let starts = starting_points(&p, &options, &SearchRng::from_seed(1)).unwrap();
        assert_eq!(starts.len(), 3);
        assert_eq!(starts[0], p.family().smart_guess());
        assert_ne!(starts[1], starts[0]);
    }

    #[test]
    fn test_explicit_start_length_checked() {
        let p = problem(MethodClass::Erk, 3, 2, Objective::Acc);
        let options =
            OptimiseOptions::default().with_start_mode(StartMode::Explicit(vec![0.0; 2]));
        assert!(matches!(
            starting_points(&p, &options, &SearchRng::from_seed(1)),
            Err(OptimiserError::InvalidStartingPoint {
                expected: 6,
                got: 2
            })
        ));
    }

    #[test]
    fn test_explicit_start_passes_through() {
        let p = problem(MethodClass::Erk, 2, 2, Objective::Acc);
        let x = vec![0.5, 0.0, 1.0];
        let options = OptimiseOptions::default()
            .with_start_mode(StartMode::Explicit(x.clone()))
            .with_starting_point_count(1);
        let starts = starting_points(&p, &options, &SearchRng::from_seed(1)).unwrap();
        assert_eq!(starts, vec![x]);
    }

    #[test]
    fn test_starts_reproducible_from_seed() {
        let p = problem(MethodClass::Dirk, 3, 2, Objective::Acc);
        let options = OptimiseOptions::default().with_starting_point_count(4);
        let a = starting_points(&p, &options, &SearchRng::from_seed(99)).unwrap();
        let b = starting_points(&p, &options, &SearchRng::from_seed(99)).unwrap();
        assert_eq!(a, b);
        // a prefix of a larger set is identical
        let more = starting_points(
            &p,
            &options.clone().with_starting_point_count(6),
            &SearchRng::from_seed(99),
        )
        .unwrap();
        assert_eq!(&more[..4], &a[..]);
    }

    #[test]
    fn test_projection_reduces_residuals() {
        let p = problem(MethodClass::Erk, 3, 2, Objective::Acc);
        let mut rng = SearchRng::from_seed(5);
        let x = p.family().random_guess(&mut rng);
        let norm = |v: &[f64]| v.iter().map(|r| r * r).sum::<f64>().sqrt();
        let before = norm(&p.projection_residuals(&x));
        let projected = project_onto_order_conditions(&p, x);
        let after = norm(&p.projection_residuals(&projected));
        assert!(after <= before);
        assert!(after < 1e-8);
    }
}
