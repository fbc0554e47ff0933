//! Constrained local minimisation.
//!
//! A problem is described by the [`NlpProblem`] trait:
//!
//! ```text
//! min f(x)  subject to  h(x) = 0,  g(x) ≤ 0,  Aeq x = beq,  lower ≤ x ≤ upper
//! ```
//!
//! and solved by any [`LocalSolver`]. The reference implementation is
//! [`AugmentedLagrangianSolver`], a projected quasi-Newton method on the
//! augmented Lagrangian followed by a Levenberg-Marquardt feasibility
//! polish.

mod augmented_lagrangian;

pub use augmented_lagrangian::AugmentedLagrangianSolver;

use std::fmt;
use std::str::FromStr;

use crate::types::{LinearConstraints, SolverError};

/// Values of the nonlinear constraints at a point.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConstraintValues {
    /// Residuals that must vanish.
    pub equalities: Vec<f64>,
    /// Values that must be non-positive.
    pub inequalities: Vec<f64>,
}

impl ConstraintValues {
    /// Create from equality and inequality vectors.
    pub fn new(equalities: Vec<f64>, inequalities: Vec<f64>) -> Self {
        Self {
            equalities,
            inequalities,
        }
    }

    /// Largest `|h_i|` or positive `g_j` (infinite if any value is NaN).
    pub fn max_violation(&self) -> f64 {
        let eq = self.equalities.iter().map(|h| h.abs());
        let ineq = self.inequalities.iter().map(|g| g.max(0.0));
        eq.chain(ineq).fold(0.0_f64, |m, v| {
            if v.is_nan() {
                f64::INFINITY
            } else {
                m.max(v)
            }
        })
    }
}

/// A smooth nonlinear program.
pub trait NlpProblem {
    /// Number of optimisation variables.
    fn dimension(&self) -> usize;

    /// Objective value.
    fn objective(&self, x: &[f64]) -> f64;

    /// Analytic objective gradient, if available.
    fn gradient(&self, _x: &[f64]) -> Option<Vec<f64>> {
        None
    }

    /// Nonlinear constraints at `x`.
    fn constraints(&self, x: &[f64]) -> ConstraintValues;

    /// Linear equalities and box bounds.
    fn linear_constraints(&self) -> &LinearConstraints;
}

/// Termination status of a local run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LocalStatus {
    /// Feasible with a stationary objective.
    Converged,
    /// Feasible, iterates stopped moving.
    StepTolerance,
    /// Iteration or evaluation budget exhausted.
    BudgetExhausted,
    /// Could not reach the constraint tolerance.
    Infeasible,
}

impl LocalStatus {
    /// Integer exit flag: positive on success, zero when out of budget,
    /// negative when infeasible.
    pub fn code(&self) -> i32 {
        match self {
            LocalStatus::Converged => 1,
            LocalStatus::StepTolerance => 2,
            LocalStatus::BudgetExhausted => 0,
            LocalStatus::Infeasible => -2,
        }
    }

    /// Whether the run counts as a successful local convergence.
    pub fn is_success(&self) -> bool {
        self.code() > 0
    }
}

impl fmt::Display for LocalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LocalStatus::Converged => "converged",
            LocalStatus::StepTolerance => "step-tolerance",
            LocalStatus::BudgetExhausted => "budget-exhausted",
            LocalStatus::Infeasible => "infeasible",
        };
        write!(f, "{} ({})", name, self.code())
    }
}

/// Result of a local run.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalSolution {
    /// Final point.
    pub x: Vec<f64>,
    /// Objective at `x`.
    pub objective: f64,
    /// Largest constraint violation at `x` (nonlinear, linear and bounds).
    pub max_violation: f64,
    /// Termination status.
    pub status: LocalStatus,
    /// Outer iterations performed.
    pub iterations: usize,
    /// Objective and constraint evaluations performed.
    pub evaluations: usize,
}

/// A constrained local minimiser.
pub trait LocalSolver {
    /// Minimise `problem` from `x0`.
    ///
    /// Errors are reserved for malformed input (wrong length, crossed
    /// bounds); numerical failure is reported through
    /// [`LocalSolution::status`].
    fn minimise(&self, problem: &dyn NlpProblem, x0: &[f64]) -> Result<LocalSolution, SolverError>;
}

/// Multiplier strategy of the reference solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum LocalAlgorithm {
    /// Multiplier and penalty updates.
    #[default]
    AugmentedLagrangian,
    /// Quadratic penalty only.
    Penalty,
}

impl LocalAlgorithm {
    /// Canonical name.
    pub fn name(&self) -> &'static str {
        match self {
            LocalAlgorithm::AugmentedLagrangian => "augmented-lagrangian",
            LocalAlgorithm::Penalty => "penalty",
        }
    }
}

impl FromStr for LocalAlgorithm {
    type Err = SolverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "augmented-lagrangian" | "auglag" | "al" => Ok(LocalAlgorithm::AugmentedLagrangian),
            "penalty" => Ok(LocalAlgorithm::Penalty),
            other => Err(SolverError::instability(format!(
                "unknown local solver algorithm '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for LocalAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Tolerances and budgets of the reference solver.
///
/// Order conditions are polynomial systems of high degree and the defaults
/// are tight.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LocalSolverConfig {
    /// Multiplier strategy.
    pub algorithm: LocalAlgorithm,
    /// Final feasibility requirement (max-norm).
    pub constraint_tolerance: f64,
    /// Feasibility at which the outer loop may stop and hand over to the polish.
    pub feasibility_target: f64,
    /// Relative objective change counted as stationary.
    pub function_tolerance: f64,
    /// Relative step counted as stalled.
    pub step_tolerance: f64,
    /// Projected-gradient norm ending an inner minimisation.
    pub gradient_tolerance: f64,
    /// Outer (multiplier) iterations.
    pub max_iterations: usize,
    /// Quasi-Newton iterations per outer iteration.
    pub max_inner_iterations: usize,
    /// Objective plus constraint evaluations per run.
    pub max_evaluations: usize,
    /// Starting penalty parameter.
    pub initial_penalty: f64,
    /// Penalty cap.
    pub max_penalty: f64,
    /// Levenberg-Marquardt iterations of the feasibility polish.
    pub polish_iterations: usize,
}

impl Default for LocalSolverConfig {
    fn default() -> Self {
        Self {
            algorithm: LocalAlgorithm::AugmentedLagrangian,
            constraint_tolerance: 1e-12,
            feasibility_target: 1e-8,
            function_tolerance: 1e-10,
            step_tolerance: 1e-13,
            gradient_tolerance: 1e-9,
            max_iterations: 200,
            max_inner_iterations: 500,
            max_evaluations: 1_000_000,
            initial_penalty: 10.0,
            max_penalty: 1e12,
            polish_iterations: 100,
        }
    }
}

impl LocalSolverConfig {
    /// Looser tolerances and smaller budgets, for quick searches and tests.
    pub fn fast() -> Self {
        Self {
            constraint_tolerance: 1e-10,
            feasibility_target: 1e-7,
            function_tolerance: 1e-9,
            step_tolerance: 1e-11,
            gradient_tolerance: 1e-8,
            max_iterations: 60,
            max_inner_iterations: 200,
            max_evaluations: 200_000,
            ..Default::default()
        }
    }

    /// Set the multiplier strategy.
    pub fn with_algorithm(mut self, algorithm: LocalAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Check tolerances are positive and budgets non-zero.
    pub fn validate(&self) -> Result<(), SolverError> {
        let positive = [
            ("constraint_tolerance", self.constraint_tolerance),
            ("feasibility_target", self.feasibility_target),
            ("function_tolerance", self.function_tolerance),
            ("step_tolerance", self.step_tolerance),
            ("gradient_tolerance", self.gradient_tolerance),
            ("initial_penalty", self.initial_penalty),
        ];
        for (name, value) in positive {
            if !(value > 0.0 && value.is_finite()) {
                return Err(SolverError::instability(format!(
                    "{} must be positive and finite, got {}",
                    name, value
                )));
            }
        }
        if self.max_penalty < self.initial_penalty {
            return Err(SolverError::instability(
                "max_penalty must not be below initial_penalty",
            ));
        }
        if self.max_iterations == 0 || self.max_inner_iterations == 0 || self.max_evaluations == 0
        {
            return Err(SolverError::instability("iteration budgets must be non-zero"));
        }
        Ok(())
    }

    /// Build the reference solver.
    pub fn build(self) -> AugmentedLagrangianSolver {
        AugmentedLagrangianSolver::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(LocalStatus::Converged.code(), 1);
        assert_eq!(LocalStatus::StepTolerance.code(), 2);
        assert_eq!(LocalStatus::BudgetExhausted.code(), 0);
        assert_eq!(LocalStatus::Infeasible.code(), -2);
        assert!(LocalStatus::StepTolerance.is_success());
        assert!(!LocalStatus::BudgetExhausted.is_success());
    }

    #[test]
    fn test_max_violation() {
        let cv = ConstraintValues::new(vec![1e-3, -2e-3], vec![-5.0, 1e-4]);
        assert!((cv.max_violation() - 2e-3).abs() < 1e-15);
        assert_eq!(ConstraintValues::default().max_violation(), 0.0);
        let nan = ConstraintValues::new(vec![f64::NAN], vec![]);
        assert_eq!(nan.max_violation(), f64::INFINITY);
    }

    #[test]
    fn test_algorithm_from_str() {
        assert_eq!(
            "augmented_lagrangian".parse::<LocalAlgorithm>().unwrap(),
            LocalAlgorithm::AugmentedLagrangian
        );
        assert_eq!("Penalty".parse::<LocalAlgorithm>().unwrap(), LocalAlgorithm::Penalty);
        assert!("sqp".parse::<LocalAlgorithm>().is_err());
    }

    #[test]
    fn test_config_validate() {
        assert!(LocalSolverConfig::default().validate().is_ok());
        assert!(LocalSolverConfig::fast().validate().is_ok());
        let bad = LocalSolverConfig {
            constraint_tolerance: 0.0,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
        let bad = LocalSolverConfig {
            max_penalty: 1.0,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }
}
