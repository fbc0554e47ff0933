//! The search entry point.

use rkopt_methods::MethodDescriptor;
use tracing::info;

use crate::error::OptimiserError;
use crate::finalize::{finalize, EnrichedMethod, SearchReport};
use crate::guess::starting_points;
use crate::multistart::{search, SearchSettings};
use crate::options::OptimiseOptions;
use crate::problem::MethodProblem;
use crate::rng::SearchRng;

/// Search for a method of class `class_name` with `stages` stages and
/// order `order`, optimising `objective_name` (`ssp` or `acc`).
///
/// Configuration errors are returned before any local run starts; an
/// unacceptable search result is [`OptimiserError::Failure`].
///
/// # Examples
///
/// ```no_run
/// use rkopt_optimiser::{optimise, OptimiseOptions, StartMode};
/// use rkopt_core::math::solvers::LocalSolverConfig;
///
/// let options = OptimiseOptions::default()
///     .with_starting_point_count(1)
///     .with_start_mode(StartMode::Smart)
///     .with_solver(LocalSolverConfig::fast())
///     .with_seed(1);
/// let method = optimise(2, 2, "erk", "ssp", &options)?;
/// println!("{}", method.summary());
/// # Ok::<(), rkopt_optimiser::OptimiserError>(())
/// ```
pub fn optimise(
    stages: usize,
    order: usize,
    class_name: &str,
    objective_name: &str,
    options: &OptimiseOptions,
) -> Result<EnrichedMethod, OptimiserError> {
    options.validate()?;
    let descriptor = MethodDescriptor::from_names(
        stages,
        order,
        class_name,
        objective_name,
        options.step_count,
    )?;
    let problem = MethodProblem::new(descriptor, options)?;

    let session = match options.seed {
        Some(seed) => SearchRng::from_seed(seed),
        None => SearchRng::from_entropy(),
    };
    info!(
        method = %descriptor,
        seed = session.seed(),
        starts = options.starting_point_count,
        workers = options.worker_count,
        "starting coefficient search"
    );

    let starts = starting_points(&problem, options, &session)?;
    let solver = options.solver_config().build();
    let settings = SearchSettings {
        worker_count: options.worker_count,
        feasibility_tolerance: options.order_tolerance(),
        verbosity: options.display_verbosity,
    };
    let outcome = search(&problem, &solver, &starts, &settings)?;

    let report = SearchReport {
        status: outcome.status,
        ties: outcome.ties,
        runs: outcome.runs.len(),
        successful_runs: outcome.successful_runs(),
        seed: session.seed(),
    };
    let method = finalize(&outcome.best_run().x, &descriptor, report, options)?;
    info!(summary = %method.summary(), persistable = method.persistable, "search accepted");
    Ok(method)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OptimisationFailure;

    #[test]
    fn test_configuration_errors_come_first() {
        let options = OptimiseOptions::default();
        assert!(matches!(
            optimise(3, 2, "rk9", "ssp", &options),
            Err(OptimiserError::Method(_))
        ));
        assert!(matches!(
            optimise(3, 2, "erk", "fast", &options),
            Err(OptimiserError::Method(_))
        ));
        assert!(matches!(
            optimise(3, 2, "2S", "ssp", &options.clone().with_step_count(2)),
            Err(OptimiserError::Method(_))
        ));
        assert!(matches!(
            optimise(3, 2, "erk", "ssp", &options.clone().with_worker_count(0)),
            Err(OptimiserError::InvalidOptions(_))
        ));
    }

    #[test]
    fn test_failure_is_not_a_configuration_error() {
        // one explicit stage cannot reach order 2
        let options = OptimiseOptions::default()
            .with_starting_point_count(2)
            .with_solver(rkopt_core::math::solvers::LocalSolverConfig::fast())
            .with_seed(3);
        let err = optimise(1, 2, "erk", "acc", &options).unwrap_err();
        assert!(err.is_failure(), "{}", err);
        assert!(!matches!(
            err,
            OptimiserError::Failure(OptimisationFailure::RadiusBelowThreshold { .. })
        ));
    }
}
