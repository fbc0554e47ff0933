//! Search options.
//!
//! [`OptimiseOptions`] carries every recognised option with its default;
//! builder-style `with_*` setters adjust single fields and
//! [`OptimiseOptions::validate`] reports all violations at once.

use std::fmt;
use std::str::FromStr;

use num_complex::Complex64;
use rkopt_core::math::solvers::{LocalAlgorithm, LocalSolverConfig};
use rkopt_methods::analysis::{ConditionMode, DEFAULT_ORDER_TOLERANCE};

use crate::error::OptimiserError;

/// How starting points are produced.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum StartMode {
    /// Random draws from class heuristics.
    #[default]
    Random,
    /// Closed-form class heuristics for the first start, random after.
    Smart,
    /// Caller-supplied vector for the first start, random after.
    Explicit(Vec<f64>),
}

impl StartMode {
    /// Conventional name.
    pub fn name(&self) -> &'static str {
        match self {
            StartMode::Random => "random",
            StartMode::Smart => "smart",
            StartMode::Explicit(_) => "explicit",
        }
    }
}

impl FromStr for StartMode {
    type Err = OptimiserError;

    /// Parses `random`, `smart` or a comma-separated vector.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "random" => Ok(StartMode::Random),
            "smart" => Ok(StartMode::Smart),
            other => other
                .split(',')
                .map(|v| v.trim().parse::<f64>())
                .collect::<Result<Vec<_>, _>>()
                .map(StartMode::Explicit)
                .map_err(|_| {
                    OptimiserError::invalid_option(format!(
                        "start mode must be 'random', 'smart' or a comma-separated vector, got '{}'",
                        s.trim()
                    ))
                }),
        }
    }
}

/// Search progress reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Verbosity {
    /// Debug-level logging only.
    #[default]
    Off,
    /// Summary of the search at `info`.
    Final,
    /// Every local run at `info`.
    Iter,
}

impl Verbosity {
    /// Conventional name.
    pub fn name(&self) -> &'static str {
        match self {
            Verbosity::Off => "off",
            Verbosity::Final => "final",
            Verbosity::Iter => "iter",
        }
    }
}

impl FromStr for Verbosity {
    type Err = OptimiserError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" | "none" => Ok(Verbosity::Off),
            "final" | "notify" => Ok(Verbosity::Final),
            "iter" => Ok(Verbosity::Iter),
            other => Err(OptimiserError::invalid_option(format!(
                "display verbosity must be 'off', 'final' or 'iter', got '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for Verbosity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Options of one coefficient search.
///
/// # Examples
///
/// ```
/// use rkopt_optimiser::{OptimiseOptions, StartMode};
///
/// let options = OptimiseOptions::default()
///     .with_starting_point_count(4)
///     .with_start_mode(StartMode::Smart)
///     .with_seed(7);
/// assert!(options.validate().is_ok());
///
/// let bad = OptimiseOptions::default().with_worker_count(0).with_starting_point_count(0);
/// assert!(bad.validate().is_err());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct OptimiseOptions {
    /// Steps `k` of multistep classes.
    /// Default: 1
    pub step_count: usize,

    /// Number of local runs.
    /// Default: 10
    pub starting_point_count: usize,

    /// Parallel workers for the local runs.
    /// Default: 1
    pub worker_count: usize,

    /// Starting point generation.
    /// Default: random
    pub start_mode: StartMode,

    /// Project each starting point onto the order conditions first.
    /// Default: false
    pub solve_order_conditions_first: bool,

    /// Tall-tree orders whose stability-polynomial coefficients are pinned.
    pub poly_coeff_ind: Vec<usize>,

    /// Pinned coefficient values, parallel to `poly_coeff_ind`.
    pub poly_coeff_val: Vec<f64>,

    /// Embedded-method counterpart of `poly_coeff_ind`.
    pub emb_poly_coeff_ind: Vec<usize>,

    /// Embedded-method counterpart of `poly_coeff_val`.
    pub emb_poly_coeff_val: Vec<f64>,

    /// Points where the embedded stability function must have modulus `≤ 1`.
    pub constrain_emb_stability: Vec<Complex64>,

    /// Local solver algorithm.
    /// Default: augmented-lagrangian
    pub local_solver_algorithm: LocalAlgorithm,

    /// Radius an `ssp` result must exceed.
    /// Default: 0.0
    pub min_ssp_radius: f64,

    /// Progress reporting.
    /// Default: off
    pub display_verbosity: Verbosity,

    /// Full or linear order conditions.
    /// Default: nonlinear
    pub problem_type: ConditionMode,

    /// Session seed; drawn from entropy when absent.
    pub seed: Option<u64>,

    /// Local solver tolerances and budgets.
    pub solver: LocalSolverConfig,
}

impl Default for OptimiseOptions {
    fn default() -> Self {
        Self {
            step_count: 1,
            starting_point_count: 10,
            worker_count: 1,
            start_mode: StartMode::Random,
            solve_order_conditions_first: false,
            poly_coeff_ind: Vec::new(),
            poly_coeff_val: Vec::new(),
            emb_poly_coeff_ind: Vec::new(),
            emb_poly_coeff_val: Vec::new(),
            constrain_emb_stability: Vec::new(),
            local_solver_algorithm: LocalAlgorithm::AugmentedLagrangian,
            min_ssp_radius: 0.0,
            display_verbosity: Verbosity::Off,
            problem_type: ConditionMode::Nonlinear,
            seed: None,
            solver: LocalSolverConfig::default(),
        }
    }
}

impl OptimiseOptions {
    /// Set `step_count`.
    pub fn with_step_count(mut self, steps: usize) -> Self {
        self.step_count = steps;
        self
    }

    /// Set `starting_point_count`.
    pub fn with_starting_point_count(mut self, count: usize) -> Self {
        self.starting_point_count = count;
        self
    }

    /// Set `worker_count`.
    pub fn with_worker_count(mut self, workers: usize) -> Self {
        self.worker_count = workers;
        self
    }

    /// Set `start_mode`.
    pub fn with_start_mode(mut self, mode: StartMode) -> Self {
        self.start_mode = mode;
        self
    }

    /// Set `solve_order_conditions_first`.
    pub fn with_solve_order_conditions_first(mut self, enabled: bool) -> Self {
        self.solve_order_conditions_first = enabled;
        self
    }

    /// Pin stability-polynomial coefficients of the primary method.
    pub fn with_poly_coefficients(mut self, indices: Vec<usize>, values: Vec<f64>) -> Self {
        self.poly_coeff_ind = indices;
        self.poly_coeff_val = values;
        self
    }

    /// Pin stability-polynomial coefficients of the embedded method.
    pub fn with_emb_poly_coefficients(mut self, indices: Vec<usize>, values: Vec<f64>) -> Self {
        self.emb_poly_coeff_ind = indices;
        self.emb_poly_coeff_val = values;
        self
    }

    /// Set `constrain_emb_stability`.
    pub fn with_emb_stability_points(mut self, points: Vec<Complex64>) -> Self {
        self.constrain_emb_stability = points;
        self
    }

    /// Set `local_solver_algorithm`.
    pub fn with_local_solver_algorithm(mut self, algorithm: LocalAlgorithm) -> Self {
        self.local_solver_algorithm = algorithm;
        self
    }

    /// Set `min_ssp_radius`.
    pub fn with_min_ssp_radius(mut self, radius: f64) -> Self {
        self.min_ssp_radius = radius;
        self
    }

    /// Set `display_verbosity`.
    pub fn with_display_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.display_verbosity = verbosity;
        self
    }

    /// Set `problem_type`.
    pub fn with_problem_type(mut self, mode: ConditionMode) -> Self {
        self.problem_type = mode;
        self
    }

    /// Set `seed`.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set `solver`.
    pub fn with_solver(mut self, solver: LocalSolverConfig) -> Self {
        self.solver = solver;
        self
    }

    /// Solver configuration with `local_solver_algorithm` applied.
    pub fn solver_config(&self) -> LocalSolverConfig {
        self.solver.with_algorithm(self.local_solver_algorithm)
    }

    /// Tolerance for verifying the attained order of a solution.
    pub fn order_tolerance(&self) -> f64 {
        DEFAULT_ORDER_TOLERANCE.max(10.0 * self.solver.constraint_tolerance)
    }

    /// Check option consistency, collecting every violation.
    pub fn validate(&self) -> Result<(), OptimiserError> {
        let mut errors = Vec::new();
        if self.step_count == 0 {
            errors.push("step_count must be at least 1".to_string());
        }
        if self.starting_point_count == 0 {
            errors.push("starting_point_count must be at least 1".to_string());
        }
        if self.worker_count == 0 {
            errors.push("worker_count must be at least 1".to_string());
        }
        if self.poly_coeff_ind.len() != self.poly_coeff_val.len() {
            errors.push(format!(
                "poly_coeff_ind has {} entries but poly_coeff_val has {}",
                self.poly_coeff_ind.len(),
                self.poly_coeff_val.len()
            ));
        }
        if self.emb_poly_coeff_ind.len() != self.emb_poly_coeff_val.len() {
            errors.push(format!(
                "emb_poly_coeff_ind has {} entries but emb_poly_coeff_val has {}",
                self.emb_poly_coeff_ind.len(),
                self.emb_poly_coeff_val.len()
            ));
        }
        if !self.min_ssp_radius.is_finite() {
            errors.push("min_ssp_radius must be finite".to_string());
        }
        if self
            .constrain_emb_stability
            .iter()
            .any(|z| !(z.re.is_finite() && z.im.is_finite()))
        {
            errors.push("constrain_emb_stability points must be finite".to_string());
        }
        if let Err(e) = self.solver.validate() {
            errors.push(e.to_string());
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(OptimiserError::InvalidOptions(errors))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = OptimiseOptions::default();
        assert_eq!(options.step_count, 1);
        assert_eq!(options.starting_point_count, 10);
        assert_eq!(options.worker_count, 1);
        assert_eq!(options.start_mode, StartMode::Random);
        assert_eq!(options.problem_type, ConditionMode::Nonlinear);
        assert_eq!(options.display_verbosity, Verbosity::Off);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_validate_collects_all_errors() {
        let options = OptimiseOptions::default()
            .with_step_count(0)
            .with_worker_count(0)
            .with_poly_coefficients(vec![5], vec![]);
        match options.validate() {
            Err(OptimiserError::InvalidOptions(errors)) => assert_eq!(errors.len(), 3),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_solver_config_applies_algorithm() {
        let options = OptimiseOptions::default().with_local_solver_algorithm(LocalAlgorithm::Penalty);
        assert_eq!(options.solver_config().algorithm, LocalAlgorithm::Penalty);
    }

    #[test]
    fn test_start_mode_parse() {
        assert_eq!("smart".parse::<StartMode>().unwrap(), StartMode::Smart);
        assert_eq!(
            "0.5, 1, -2".parse::<StartMode>().unwrap(),
            StartMode::Explicit(vec![0.5, 1.0, -2.0])
        );
        assert!("clever".parse::<StartMode>().is_err());
    }

    #[test]
    fn test_order_tolerance_follows_solver() {
        let mut options = OptimiseOptions::default();
        assert_eq!(options.order_tolerance(), DEFAULT_ORDER_TOLERANCE);
        options.solver = LocalSolverConfig::fast();
        assert!((options.order_tolerance() - 1e-9).abs() < 1e-24);
    }

    #[test]
    fn test_verbosity_parse() {
        assert_eq!("ITER".parse::<Verbosity>().unwrap(), Verbosity::Iter);
        assert!("loud".parse::<Verbosity>().is_err());
    }
}
