//! Multi-start search.
//!
//! Each starting point is minimised independently and the runs are
//! gathered in start order, so the selected method depends only on the
//! starting points and not on the worker count or scheduling.
//!
//! # Selection
//!
//! 1. Lowest objective among successful runs (positive local exit flag).
//! 2. Otherwise lowest objective among runs within the feasibility tolerance.
//! 3. Otherwise the least-violating run.
//!
//! Ties go to the lowest start index.

use std::fmt;

use rkopt_core::math::solvers::{LocalSolver, LocalStatus, NlpProblem};
use tracing::{debug, info, warn};

use crate::error::OptimiserError;
use crate::options::Verbosity;

/// Relative objective gap within which two successful runs count as tied.
const TIE_TOLERANCE: f64 = 1e-10;

/// Aggregated outcome of a multi-start search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum SearchStatus {
    /// At least one local run converged.
    Converged,
    /// Runs ended feasible but none converged.
    NoConvergence,
    /// No run reached the feasibility tolerance.
    Infeasible,
}

impl SearchStatus {
    /// Integer exit flag: positive on success.
    pub fn code(&self) -> i32 {
        match self {
            SearchStatus::Converged => 1,
            SearchStatus::NoConvergence => 0,
            SearchStatus::Infeasible => -2,
        }
    }

    /// Whether the search produced a usable method.
    pub fn is_success(&self) -> bool {
        self.code() > 0
    }
}

impl fmt::Display for SearchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SearchStatus::Converged => "converged",
            SearchStatus::NoConvergence => "no-convergence",
            SearchStatus::Infeasible => "infeasible",
        };
        write!(f, "{} ({})", name, self.code())
    }
}

/// One local run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunResult {
    /// Starting-point index.
    pub index: usize,
    /// Final point.
    pub x: Vec<f64>,
    /// Objective at `x`.
    pub objective: f64,
    /// Largest constraint violation at `x`.
    pub max_violation: f64,
    /// Local exit status.
    pub status: LocalStatus,
    /// Outer iterations.
    pub iterations: usize,
    /// Function evaluations.
    pub evaluations: usize,
}

impl RunResult {
    fn failed(index: usize, x0: &[f64]) -> Self {
        Self {
            index,
            x: x0.to_vec(),
            objective: f64::INFINITY,
            max_violation: f64::INFINITY,
            status: LocalStatus::Infeasible,
            iterations: 0,
            evaluations: 0,
        }
    }
}

/// Scheduling and reporting knobs of [`search`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchSettings {
    /// Worker threads; 1 runs on the calling thread.
    pub worker_count: usize,
    /// Violation below which a run counts as feasible.
    pub feasibility_tolerance: f64,
    /// Progress reporting level.
    pub verbosity: Verbosity,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            worker_count: 1,
            feasibility_tolerance: 1e-10,
            verbosity: Verbosity::Off,
        }
    }
}

/// Runs and the selected best point.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    /// All runs, in start order.
    pub runs: Vec<RunResult>,
    /// Index into `runs` of the selected run.
    pub best: usize,
    /// Aggregated status.
    pub status: SearchStatus,
    /// Successful runs whose objective ties with the best.
    pub ties: usize,
}

impl SearchOutcome {
    /// The selected run.
    pub fn best_run(&self) -> &RunResult {
        &self.runs[self.best]
    }

    /// Number of runs with a positive local exit flag.
    pub fn successful_runs(&self) -> usize {
        self.runs.iter().filter(|r| r.status.is_success()).count()
    }
}

fn run_one<P, S>(problem: &P, solver: &S, index: usize, x0: &[f64], verbosity: Verbosity) -> RunResult
where
    P: NlpProblem + Sync,
    S: LocalSolver + Sync,
{
    let run = match solver.minimise(problem, x0) {
        Ok(sol) => RunResult {
            index,
            x: sol.x,
            objective: sol.objective,
            max_violation: sol.max_violation,
            status: sol.status,
            iterations: sol.iterations,
            evaluations: sol.evaluations,
        },
        Err(e) => {
            warn!(start = index, error = %e, "local run rejected its input");
            RunResult::failed(index, x0)
        }
    };
    if verbosity == Verbosity::Iter {
        info!(
            start = index,
            status = %run.status,
            objective = run.objective,
            violation = run.max_violation,
            iterations = run.iterations,
            "local run finished"
        );
    } else {
        debug!(
            start = index,
            status = %run.status,
            objective = run.objective,
            violation = run.max_violation,
            "local run finished"
        );
    }
    run
}

#[cfg(feature = "parallel")]
fn run_all<P, S>(
    problem: &P,
    solver: &S,
    starts: &[Vec<f64>],
    settings: &SearchSettings,
) -> Result<Vec<RunResult>, OptimiserError>
where
    P: NlpProblem + Sync,
    S: LocalSolver + Sync,
{
    use rayon::prelude::*;

    if settings.worker_count <= 1 {
        return Ok(run_sequential(problem, solver, starts, settings));
    }
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(settings.worker_count)
        .build()
        .map_err(|e| OptimiserError::WorkerPool(e.to_string()))?;
    let verbosity = settings.verbosity;
    Ok(pool.install(|| {
        starts
            .par_iter()
            .enumerate()
            .map(|(i, x0)| run_one(problem, solver, i, x0, verbosity))
            .collect()
    }))
}

#[cfg(not(feature = "parallel"))]
fn run_all<P, S>(
    problem: &P,
    solver: &S,
    starts: &[Vec<f64>],
    settings: &SearchSettings,
) -> Result<Vec<RunResult>, OptimiserError>
where
    P: NlpProblem + Sync,
    S: LocalSolver + Sync,
{
    if settings.worker_count > 1 {
        debug!(
            workers = settings.worker_count,
            "built without the parallel feature; running sequentially"
        );
    }
    Ok(run_sequential(problem, solver, starts, settings))
}

fn run_sequential<P, S>(
    problem: &P,
    solver: &S,
    starts: &[Vec<f64>],
    settings: &SearchSettings,
) -> Vec<RunResult>
where
    P: NlpProblem + Sync,
    S: LocalSolver + Sync,
{
    starts
        .iter()
        .enumerate()
        .map(|(i, x0)| run_one(problem, solver, i, x0, settings.verbosity))
        .collect()
}

/// Lowest objective among `candidates`, first index on ties.
fn argmin_objective<'a>(candidates: impl Iterator<Item = &'a RunResult>) -> Option<usize> {
    candidates
        .fold(None, |best: Option<&RunResult>, r| match best {
            Some(b) if b.objective <= r.objective || r.objective.is_nan() => Some(b),
            _ => Some(r),
        })
        .map(|r| r.index)
}

/// Pick the best run and classify the search.
pub fn select_best(runs: &[RunResult], feasibility_tolerance: f64) -> Option<(usize, SearchStatus)> {
    if let Some(i) = argmin_objective(runs.iter().filter(|r| r.status.is_success())) {
        return Some((i, SearchStatus::Converged));
    }
    let feasible = runs
        .iter()
        .filter(|r| r.max_violation <= feasibility_tolerance);
    if let Some(i) = argmin_objective(feasible) {
        return Some((i, SearchStatus::NoConvergence));
    }
    runs.iter()
        .fold(None, |best: Option<&RunResult>, r| match best {
            Some(b) if b.max_violation <= r.max_violation || r.max_violation.is_nan() => Some(b),
            _ => Some(r),
        })
        .map(|r| (r.index, SearchStatus::Infeasible))
}

/// Minimise `problem` from every starting point and select the best run.
///
/// # Errors
///
/// * [`OptimiserError::InvalidOptions`] if `starts` is empty or
///   `worker_count` is zero
/// * [`OptimiserError::WorkerPool`] if the thread pool cannot be built
pub fn search<P, S>(
    problem: &P,
    solver: &S,
    starts: &[Vec<f64>],
    settings: &SearchSettings,
) -> Result<SearchOutcome, OptimiserError>
where
    P: NlpProblem + Sync,
    S: LocalSolver + Sync,
{
    if starts.is_empty() {
        return Err(OptimiserError::invalid_option("no starting points"));
    }
    if settings.worker_count == 0 {
        return Err(OptimiserError::invalid_option("worker_count must be at least 1"));
    }

    let runs = run_all(problem, solver, starts, settings)?;
    let (best, status) = select_best(&runs, settings.feasibility_tolerance)
        .ok_or_else(|| OptimiserError::invalid_option("no starting points"))?;

    let best_objective = runs[best].objective;
    let scale = best_objective.abs().max(1.0);
    let ties = if status.is_success() {
        runs.iter()
            .filter(|r| {
                r.status.is_success() && (r.objective - best_objective).abs() <= TIE_TOLERANCE * scale
            })
            .count()
    } else {
        0
    };

    let outcome = SearchOutcome {
        runs,
        best,
        status,
        ties,
    };
    let best_run = outcome.best_run();
    if settings.verbosity == Verbosity::Off {
        debug!(
            status = %status,
            best = best_run.index,
            objective = best_run.objective,
            successful = outcome.successful_runs(),
            ties,
            "multi-start search finished"
        );
    } else {
        info!(
            status = %status,
            best = best_run.index,
            objective = best_run.objective,
            successful = outcome.successful_runs(),
            ties,
            "multi-start search finished"
        );
    }
    Ok(outcome)
}
