//! Augmented-Lagrangian reference solver.
//!
//! Outer loop: minimise
//!
//! ```text
//! L(x) = f(x) + λᵀh(x) + ρ/2 |h(x)|² + 1/(2ρ) Σ (max(0, μ_j + ρ g_j(x))² - μ_j²)
//! ```
//!
//! over the box with projected BFGS, then update `λ ← λ + ρh`,
//! `μ ← max(0, μ + ρg)` and raise `ρ` tenfold whenever the violation fails to
//! shrink by a factor of four. Linear equalities are carried as equalities
//! with exact Jacobian rows. Once the outer loop stops, a Levenberg-Marquardt
//! solve on `[h; Aeq x - beq; max(0, g)]` drives the violation down to
//! `constraint_tolerance`.

use std::cell::Cell;

use super::{LocalAlgorithm, LocalSolution, LocalSolver, LocalSolverConfig, LocalStatus, NlpProblem};
use crate::math::finite_diff::{self, DEFAULT_STEP};
use crate::math::linalg::{dot, identity, norm2, norm_inf};
use crate::math::solvers::{LMConfig, LevenbergMarquardtSolver};
use crate::types::{LinearConstraints, SolverError};

/// Armijo sufficient-decrease constant.
const ARMIJO: f64 = 1e-4;
/// Step halvings before a line search gives up.
const MAX_BACKTRACKS: usize = 40;
/// Outer iterations at the penalty cap without progress before giving up.
const STALL_LIMIT: usize = 5;

/// Projected-BFGS augmented-Lagrangian solver.
///
/// # Example
///
/// ```
/// use rkopt_core::math::solvers::{
///     AugmentedLagrangianSolver, ConstraintValues, LocalSolver, LocalSolverConfig, NlpProblem,
/// };
/// use rkopt_core::types::LinearConstraints;
///
/// // min x + y  s.t.  x² + y² = 1
/// struct Circle(LinearConstraints);
///
/// impl NlpProblem for Circle {
///     fn dimension(&self) -> usize { 2 }
///     fn objective(&self, x: &[f64]) -> f64 { x[0] + x[1] }
///     fn constraints(&self, x: &[f64]) -> ConstraintValues {
///         ConstraintValues::new(vec![x[0] * x[0] + x[1] * x[1] - 1.0], vec![])
///     }
///     fn linear_constraints(&self) -> &LinearConstraints { &self.0 }
/// }
///
/// let problem = Circle(LinearConstraints::unconstrained(2));
/// let solver = AugmentedLagrangianSolver::new(LocalSolverConfig::default());
/// let sol = solver.minimise(&problem, &[1.0, 0.0]).unwrap();
///
/// assert!(sol.status.is_success());
/// assert!((sol.objective + 2.0_f64.sqrt()).abs() < 1e-6);
/// ```
#[derive(Debug, Clone)]
pub struct AugmentedLagrangianSolver {
    config: LocalSolverConfig,
}

impl AugmentedLagrangianSolver {
    /// Create a solver with the given configuration.
    pub fn new(config: LocalSolverConfig) -> Self {
        Self { config }
    }

    /// Create a solver with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(LocalSolverConfig::default())
    }

    /// Get the solver configuration.
    pub fn config(&self) -> &LocalSolverConfig {
        &self.config
    }
}

/// Counts evaluations and assembles the constraint vector.
struct Evaluator<'a> {
    problem: &'a dyn NlpProblem,
    linear: &'a LinearConstraints,
    budget: usize,
    count: Cell<usize>,
}

/// Current multipliers and penalty.
struct Multipliers {
    eq: Vec<f64>,
    ineq: Vec<f64>,
    penalty: f64,
}

impl<'a> Evaluator<'a> {
    fn tick(&self, n: usize) {
        self.count.set(self.count.get().saturating_add(n));
    }

    fn exhausted(&self) -> bool {
        self.count.get() >= self.budget
    }

    fn objective(&self, x: &[f64]) -> f64 {
        self.tick(1);
        self.problem.objective(x)
    }

    fn objective_gradient(&self, x: &[f64]) -> Vec<f64> {
        match self.problem.gradient(x) {
            Some(g) => g,
            None => {
                self.tick(2 * x.len());
                finite_diff::gradient(|y| self.problem.objective(y), x, DEFAULT_STEP)
            }
        }
    }

    /// Equalities (nonlinear then linear) and inequalities.
    fn constraints(&self, x: &[f64]) -> (Vec<f64>, Vec<f64>) {
        self.tick(1);
        let values = self.problem.constraints(x);
        let mut eq = values.equalities;
        eq.extend(self.linear.equality_residuals(x));
        (eq, values.inequalities)
    }

    /// Jacobians of the nonlinear equalities and inequalities, with the
    /// linear equality rows appended to the former.
    fn constraint_jacobians(&self, x: &[f64], n_eq_nl: usize) -> (Vec<Vec<f64>>, Vec<Vec<f64>>) {
        self.tick(2 * x.len());
        let stacked = finite_diff::jacobian(
            |y| {
                let values = self.problem.constraints(y);
                let mut out = values.equalities;
                out.extend(values.inequalities);
                out
            },
            x,
            DEFAULT_STEP,
        );
        let mut jg = stacked;
        let split = n_eq_nl.min(jg.len());
        let mut jh: Vec<Vec<f64>> = jg.drain(..split).collect();
        jh.extend(self.linear.equalities().iter().map(|row| row.coefficients.clone()));
        (jh, jg)
    }

    fn merit_from(&self, f: f64, eq: &[f64], ineq: &[f64], m: &Multipliers) -> f64 {
        let rho = m.penalty;
        let eq_term: f64 = eq
            .iter()
            .zip(&m.eq)
            .map(|(h, l)| l * h + 0.5 * rho * h * h)
            .sum();
        let ineq_term: f64 = ineq
            .iter()
            .zip(&m.ineq)
            .map(|(g, mu)| {
                let shifted = (mu + rho * g).max(0.0);
                (shifted * shifted - mu * mu) / (2.0 * rho)
            })
            .sum();
        let value = f + eq_term + ineq_term;
        if value.is_finite() {
            value
        } else {
            f64::INFINITY
        }
    }

    fn merit(&self, x: &[f64], m: &Multipliers) -> f64 {
        let f = self.objective(x);
        let (eq, ineq) = self.constraints(x);
        self.merit_from(f, &eq, &ineq, m)
    }

    fn merit_gradient(&self, x: &[f64], m: &Multipliers) -> Vec<f64> {
        let (eq, ineq) = self.constraints(x);
        let n_eq_nl = eq.len() - self.linear.equalities().len();
        let (jh, jg) = self.constraint_jacobians(x, n_eq_nl);
        let mut grad = self.objective_gradient(x);
        let rho = m.penalty;
        for ((row, h), l) in jh.iter().zip(&eq).zip(&m.eq) {
            let w = l + rho * h;
            for (gi, &jij) in grad.iter_mut().zip(row) {
                *gi += w * jij;
            }
        }
        for ((row, g), mu) in jg.iter().zip(&ineq).zip(&m.ineq) {
            let w = (mu + rho * g).max(0.0);
            if w == 0.0 {
                continue;
            }
            for (gi, &jij) in grad.iter_mut().zip(row) {
                *gi += w * jij;
            }
        }
        grad
    }

    fn violation(&self, x: &[f64]) -> f64 {
        let (eq, ineq) = self.constraints(x);
        let nl = eq
            .iter()
            .map(|h| h.abs())
            .chain(ineq.iter().map(|g| g.max(0.0)))
            .fold(0.0_f64, |m, v| if v.is_nan() { f64::INFINITY } else { m.max(v) });
        nl.max(self.linear.max_violation(x))
    }

    /// Residual vector for the feasibility polish.
    fn feasibility_residuals(&self, x: &[f64]) -> Vec<f64> {
        let (mut eq, ineq) = self.constraints(x);
        eq.extend(ineq.iter().map(|g| g.max(0.0)));
        eq
    }
}

/// `P(x - g) - x`: zero exactly at a first-order point of the box problem.
fn projected_gradient(x: &[f64], grad: &[f64], linear: &LinearConstraints) -> Vec<f64> {
    x.iter()
        .zip(grad)
        .zip(linear.bounds())
        .map(|((&xi, &gi), b)| b.clamp(xi - gi) - xi)
        .collect()
}

/// Coordinates pinned at a bound with the gradient pushing outwards.
fn active_set(x: &[f64], grad: &[f64], linear: &LinearConstraints) -> Vec<bool> {
    x.iter()
        .zip(grad)
        .zip(linear.bounds())
        .map(|((&xi, &gi), b)| (xi <= b.min && gi > 0.0) || (xi >= b.max && gi < 0.0))
        .collect()
}

/// `-H g` restricted to the free coordinates.
fn search_direction(h_inv: &[Vec<f64>], grad: &[f64], active: &[bool]) -> Vec<f64> {
    h_inv
        .iter()
        .enumerate()
        .map(|(i, row)| {
            if active[i] {
                return 0.0;
            }
            let mut sum = 0.0;
            for j in 0..grad.len() {
                if !active[j] {
                    sum += row[j] * grad[j];
                }
            }
            -sum
        })
        .collect()
}

/// Inverse BFGS update; skipped when the curvature condition fails.
fn bfgs_update(h_inv: &mut [Vec<f64>], s: &[f64], y: &[f64]) -> bool {
    let sy = dot(s, y);
    if !(sy > 1e-12 * norm2(s) * norm2(y)) {
        return false;
    }
    let n = s.len();
    let hy: Vec<f64> = h_inv.iter().map(|row| dot(row, y)).collect();
    let yhy = dot(y, &hy);
    let rho = 1.0 / sy;
    let factor = (1.0 + rho * yhy) * rho;
    for i in 0..n {
        for j in 0..n {
            h_inv[i][j] += factor * s[i] * s[j] - rho * (hy[i] * s[j] + s[i] * hy[j]);
        }
    }
    true
}

impl AugmentedLagrangianSolver {
    /// Projected BFGS on the merit function. Returns the iteration count.
    fn inner_minimise(&self, eval: &Evaluator<'_>, x: &mut Vec<f64>, m: &Multipliers) -> usize {
        let n = x.len();
        let cfg = &self.config;
        let mut value = eval.merit(x, m);
        if !value.is_finite() {
            return 0;
        }
        let mut grad = eval.merit_gradient(x, m);
        let mut h_inv = identity(n);
        let mut fresh = true;
        let mut iterations = 0;

        while iterations < cfg.max_inner_iterations && !eval.exhausted() {
            iterations += 1;
            if norm_inf(&projected_gradient(x, &grad, eval.linear)) <= cfg.gradient_tolerance {
                break;
            }
            let active = active_set(x, &grad, eval.linear);
            let mut direction = search_direction(&h_inv, &grad, &active);
            if !(dot(&grad, &direction) < 0.0) {
                h_inv = identity(n);
                fresh = true;
                direction = search_direction(&h_inv, &grad, &active);
                if !(dot(&grad, &direction) < 0.0) {
                    break;
                }
            }

            let mut alpha = 1.0;
            let mut accepted = None;
            for _ in 0..MAX_BACKTRACKS {
                let mut trial: Vec<f64> = x
                    .iter()
                    .zip(&direction)
                    .map(|(xi, di)| xi + alpha * di)
                    .collect();
                eval.linear.project_bounds(&mut trial);
                let step: Vec<f64> = trial.iter().zip(x.iter()).map(|(t, xi)| t - xi).collect();
                let predicted = dot(&grad, &step);
                if predicted < 0.0 {
                    let trial_value = eval.merit(&trial, m);
                    if trial_value <= value + ARMIJO * predicted {
                        accepted = Some((trial, step, trial_value));
                        break;
                    }
                }
                alpha *= 0.5;
            }

            let Some((trial, step, trial_value)) = accepted else {
                if fresh {
                    break;
                }
                h_inv = identity(n);
                fresh = true;
                continue;
            };

            let new_grad = eval.merit_gradient(&trial, m);
            let y: Vec<f64> = new_grad.iter().zip(&grad).map(|(a, b)| a - b).collect();
            if bfgs_update(&mut h_inv, &step, &y) {
                fresh = false;
            }
            let decrease = value - trial_value;
            *x = trial;
            value = trial_value;
            grad = new_grad;

            if decrease <= cfg.function_tolerance * (1.0 + value.abs())
                || norm2(&step) <= cfg.step_tolerance * (1.0 + norm2(x))
            {
                break;
            }
        }
        iterations
    }

    /// Drive the violation below `constraint_tolerance` if the outer loop
    /// left it above. Keeps the polished point only if it is less violated.
    fn polish(&self, eval: &Evaluator<'_>, x: &mut Vec<f64>) {
        let before = eval.violation(x);
        if before <= self.config.constraint_tolerance {
            return;
        }
        let lm = LevenbergMarquardtSolver::new(LMConfig {
            tolerance: self.config.constraint_tolerance,
            max_iterations: self.config.polish_iterations,
            ..LMConfig::default()
        });
        let result = lm.solve_projected(
            |y| eval.feasibility_residuals(y),
            x.clone(),
            |y| eval.linear.project_bounds(y),
        );
        if let Ok(result) = result {
            if eval.violation(&result.params) < before {
                *x = result.params;
            }
        }
    }
}

impl LocalSolver for AugmentedLagrangianSolver {
    fn minimise(&self, problem: &dyn NlpProblem, x0: &[f64]) -> Result<LocalSolution, SolverError> {
        let n = problem.dimension();
        if x0.len() != n {
            return Err(SolverError::DimensionMismatch {
                expected: n,
                got: x0.len(),
            });
        }
        let linear = problem.linear_constraints();
        if linear.dimension() != n {
            return Err(SolverError::DimensionMismatch {
                expected: n,
                got: linear.dimension(),
            });
        }
        linear.validate()?;

        let cfg = &self.config;
        let eval = Evaluator {
            problem,
            linear,
            budget: cfg.max_evaluations,
            count: Cell::new(0),
        };

        let mut x = x0.to_vec();
        linear.project_bounds(&mut x);

        let (eq0, ineq0) = eval.constraints(&x);
        let mut mult = Multipliers {
            eq: vec![0.0; eq0.len()],
            ineq: vec![0.0; ineq0.len()],
            penalty: cfg.initial_penalty,
        };

        let mut status = LocalStatus::BudgetExhausted;
        let mut iterations = 0;
        let mut previous_violation = f64::INFINITY;
        let mut previous_objective = eval.objective(&x);
        let mut previous_x = x.clone();
        let mut stalled = 0;

        while iterations < cfg.max_iterations && !eval.exhausted() {
            iterations += 1;
            self.inner_minimise(&eval, &mut x, &mult);

            let (eq, ineq) = eval.constraints(&x);
            let f = eval.objective(&x);
            let violation = eval.violation(&x);
            if !f.is_finite() || !violation.is_finite() {
                status = LocalStatus::Infeasible;
                break;
            }

            let feasible = violation <= cfg.feasibility_target;
            let objective_change = (f - previous_objective).abs();
            let step: Vec<f64> = x.iter().zip(&previous_x).map(|(a, b)| a - b).collect();
            if feasible && objective_change <= cfg.function_tolerance * (1.0 + f.abs()) {
                status = LocalStatus::Converged;
                break;
            }
            if feasible && norm2(&step) <= cfg.step_tolerance * (1.0 + norm2(&x)) {
                status = LocalStatus::StepTolerance;
                break;
            }

            if cfg.algorithm == LocalAlgorithm::AugmentedLagrangian {
                let rho = mult.penalty;
                for (l, h) in mult.eq.iter_mut().zip(&eq) {
                    *l += rho * h;
                }
                for (mu, g) in mult.ineq.iter_mut().zip(&ineq) {
                    *mu = (*mu + rho * g).max(0.0);
                }
            }

            if !feasible && violation > 0.25 * previous_violation {
                if mult.penalty >= cfg.max_penalty {
                    stalled += 1;
                    if stalled >= STALL_LIMIT {
                        status = LocalStatus::Infeasible;
                        break;
                    }
                }
                mult.penalty = (mult.penalty * 10.0).min(cfg.max_penalty);
            } else {
                stalled = 0;
            }

            previous_violation = violation;
            previous_objective = f;
            previous_x.clone_from(&x);
        }

        self.polish(&eval, &mut x);
        let max_violation = eval.violation(&x);
        let objective = eval.objective(&x);

        let status = if max_violation <= cfg.constraint_tolerance {
            match status {
                LocalStatus::Infeasible => LocalStatus::BudgetExhausted,
                other => other,
            }
        } else {
            LocalStatus::Infeasible
        };

        Ok(LocalSolution {
            x,
            objective,
            max_violation,
            status,
            iterations,
            evaluations: eval.count.get(),
        })
    }
}
