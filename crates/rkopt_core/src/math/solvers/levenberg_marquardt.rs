//! Levenberg-Marquardt nonlinear least-squares solver.
//!
//! This module provides the [`LevenbergMarquardtSolver`], used to project
//! starting points onto the order-condition manifold and to polish the
//! feasibility of local solutions.
//!
//! # Algorithm
//!
//! The Levenberg-Marquardt algorithm combines Gauss-Newton and gradient descent:
//!
//! ```text
//! (J^T J + λI) δ = -J^T r
//! p_{n+1} = P(p_n + δ)
//! ```
//!
//! where:
//! - `J` is the central-difference Jacobian of the residuals
//! - `r` is the residual vector
//! - `λ` is the damping factor (adjusted during iteration)
//! - `P` is an optional projection (e.g. clamping to box bounds)
//!
//! # Example
//!
//! ```
//! use rkopt_core::math::solvers::{LevenbergMarquardtSolver, LMConfig};
//!
//! // Point on the unit circle closest to the starting point
//! let residuals = |p: &[f64]| vec![p[0] * p[0] + p[1] * p[1] - 1.0];
//!
//! let solver = LevenbergMarquardtSolver::new(LMConfig::default());
//! let result = solver.solve(residuals, vec![2.0, 0.5]).unwrap();
//!
//! assert!(result.converged);
//! assert!(result.residual_ss < 1e-20);
//! ```

use crate::math::finite_diff::{self, DEFAULT_STEP};
use crate::types::SolverError;

/// Configuration for Levenberg-Marquardt solver.
///
/// # Fields
///
/// * `tolerance` - Convergence tolerance for residual norm
/// * `max_iterations` - Maximum number of iterations
/// * `initial_lambda` - Initial damping factor
/// * `lambda_up` - Factor to increase lambda when step is rejected
/// * `lambda_down` - Factor to decrease lambda when step is accepted
/// * `min_lambda` - Minimum value for lambda
/// * `max_lambda` - Maximum value for lambda
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LMConfig {
    /// Convergence tolerance on the residual 2-norm.
    pub tolerance: f64,
    /// Maximum number of iterations.
    pub max_iterations: usize,
    /// Initial damping factor.
    pub initial_lambda: f64,
    /// Factor to increase lambda on rejected step.
    pub lambda_up: f64,
    /// Factor to decrease lambda on accepted step.
    pub lambda_down: f64,
    /// Minimum damping factor.
    pub min_lambda: f64,
    /// Maximum damping factor.
    pub max_lambda: f64,
    /// Tolerance for parameter change convergence.
    pub param_tolerance: f64,
}

impl Default for LMConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-12,
            max_iterations: 200,
            initial_lambda: 1e-3,
            lambda_up: 10.0,
            lambda_down: 0.1,
            min_lambda: 1e-12,
            max_lambda: 1e10,
            param_tolerance: 1e-15,
        }
    }
}

impl LMConfig {
    /// Create a new LM configuration.
    pub fn new(tolerance: f64, max_iterations: usize) -> Self {
        Self {
            tolerance,
            max_iterations,
            ..Default::default()
        }
    }

    /// Create a fast configuration with relaxed tolerances.
    pub fn fast() -> Self {
        Self {
            tolerance: 1e-8,
            max_iterations: 50,
            param_tolerance: 1e-12,
            ..Default::default()
        }
    }

    /// Create a high precision configuration.
    pub fn high_precision() -> Self {
        Self {
            tolerance: 1e-14,
            max_iterations: 500,
            param_tolerance: 1e-16,
            ..Default::default()
        }
    }
}

/// Result of Levenberg-Marquardt optimisation.
#[derive(Debug, Clone, PartialEq)]
pub struct LMResult {
    /// Final parameters.
    pub params: Vec<f64>,
    /// Final residual sum of squares.
    pub residual_ss: f64,
    /// Number of iterations performed.
    pub iterations: usize,
    /// Whether the residual tolerance was reached.
    pub converged: bool,
    /// Final lambda value.
    pub final_lambda: f64,
}

impl LMResult {
    /// Create a new LM result.
    pub fn new(
        params: Vec<f64>,
        residual_ss: f64,
        iterations: usize,
        converged: bool,
        final_lambda: f64,
    ) -> Self {
        Self {
            params,
            residual_ss,
            iterations,
            converged,
            final_lambda,
        }
    }

    /// Residual 2-norm.
    pub fn residual_norm(&self) -> f64 {
        self.residual_ss.sqrt()
    }
}

/// Levenberg-Marquardt nonlinear least-squares solver.
///
/// Solves problems of the form:
/// ```text
/// min_p ||f(p)||^2
/// ```
///
/// Underdetermined systems (fewer residuals than parameters) are handled by
/// the damping term, which selects a small step towards the solution set.
/// `converged` is only set when the residual norm drops below `tolerance`;
/// a stalled iteration is returned with `converged = false` so callers can
/// decide whether a partial improvement is still useful.
#[derive(Debug, Clone)]
pub struct LevenbergMarquardtSolver {
    config: LMConfig,
}

impl LevenbergMarquardtSolver {
    /// Create a new LM solver with the given configuration.
    pub fn new(config: LMConfig) -> Self {
        Self { config }
    }

    /// Create a solver with default configuration.
    pub fn with_defaults() -> Self {
        Self {
            config: LMConfig::default(),
        }
    }

    /// Get the solver configuration.
    pub fn config(&self) -> &LMConfig {
        &self.config
    }

    /// Solve the nonlinear least-squares problem.
    ///
    /// # Returns
    ///
    /// * `Ok(LMResult)` - Final parameters, converged or not
    /// * `Err(SolverError)` - Empty parameter or residual vector, or
    ///   non-finite residuals at the starting point
    pub fn solve<F>(&self, residuals: F, initial_params: Vec<f64>) -> Result<LMResult, SolverError>
    where
        F: Fn(&[f64]) -> Vec<f64>,
    {
        self.solve_projected(residuals, initial_params, |_| {})
    }

    /// Solve with every trial point passed through `project` before it is
    /// evaluated.
    pub fn solve_projected<F, P>(
        &self,
        residuals: F,
        initial_params: Vec<f64>,
        project: P,
    ) -> Result<LMResult, SolverError>
    where
        F: Fn(&[f64]) -> Vec<f64>,
        P: Fn(&mut [f64]),
    {
        let n_params = initial_params.len();
        if n_params == 0 {
            return Err(SolverError::instability("Empty parameter vector"));
        }

        let mut params = initial_params;
        project(&mut params);
        let mut lambda = self.config.initial_lambda;

        let mut r = residuals(&params);
        if r.is_empty() {
            return Err(SolverError::instability("Empty residual vector"));
        }
        let mut ss = sum_of_squares(&r);
        if !ss.is_finite() {
            return Err(SolverError::instability(
                "Non-finite residuals at starting point",
            ));
        }

        let mut iteration = 0;
        while iteration < self.config.max_iterations {
            if ss.sqrt() < self.config.tolerance {
                return Ok(LMResult::new(params, ss, iteration, true, lambda));
            }
            iteration += 1;

            let jacobian = finite_diff::jacobian(&residuals, &params, DEFAULT_STEP);

            let delta = match solve_normal_equations(&jacobian, &r, lambda, n_params) {
                Some(d) => d,
                None => {
                    if lambda >= self.config.max_lambda {
                        break;
                    }
                    lambda = (lambda * self.config.lambda_up).min(self.config.max_lambda);
                    continue;
                }
            };

            let param_change = delta.iter().map(|d| d * d).sum::<f64>().sqrt();
            let param_norm = params.iter().map(|p| p * p).sum::<f64>().sqrt().max(1.0);
            if param_change / param_norm < self.config.param_tolerance {
                break;
            }

            let mut trial: Vec<f64> = params.iter().zip(&delta).map(|(p, d)| p + d).collect();
            project(&mut trial);
            let trial_r = residuals(&trial);
            let trial_ss = sum_of_squares(&trial_r);

            if trial_ss.is_finite() && trial_ss < ss {
                params = trial;
                r = trial_r;
                ss = trial_ss;
                lambda = (lambda * self.config.lambda_down).max(self.config.min_lambda);
            } else {
                if lambda >= self.config.max_lambda {
                    break;
                }
                lambda = (lambda * self.config.lambda_up).min(self.config.max_lambda);
            }
        }

        let converged = ss.sqrt() < self.config.tolerance;
        Ok(LMResult::new(params, ss, iteration, converged, lambda))
    }
}

/// Solve the normal equations (J^T J + λ diag) δ = -J^T r.
fn solve_normal_equations(
    jacobian: &[Vec<f64>],
    residuals: &[f64],
    lambda: f64,
    n_params: usize,
) -> Option<Vec<f64>> {
    let mut jtj = vec![vec![0.0; n_params]; n_params];
    for row in jacobian {
        for i in 0..n_params {
            if row[i] == 0.0 {
                continue;
            }
            for j in 0..=i {
                jtj[i][j] += row[i] * row[j];
            }
        }
    }
    for i in 0..n_params {
        for j in 0..i {
            jtj[j][i] = jtj[i][j];
        }
    }

    // Marquardt scaling with a floor so that zero columns stay regular
    for (i, row) in jtj.iter_mut().enumerate() {
        row[i] += lambda * row[i].max(1.0);
    }

    let mut jtr = vec![0.0; n_params];
    for (row, &rk) in jacobian.iter().zip(residuals) {
        for (acc, &jki) in jtr.iter_mut().zip(row) {
            *acc -= jki * rk;
        }
    }

    solve_cholesky(&jtj, &jtr)
}

/// Compute sum of squares of a vector.
#[inline]
fn sum_of_squares(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum()
}

/// Solve Ax = b using Cholesky decomposition.
fn solve_cholesky(a: &[Vec<f64>], b: &[f64]) -> Option<Vec<f64>> {
    let n = b.len();
    if n == 0 || a.len() != n {
        return None;
    }

    // Cholesky decomposition: A = L L^T
    let mut l = vec![vec![0.0; n]; n];

    for i in 0..n {
        for j in 0..=i {
            let mut sum = a[i][j];
            for k in 0..j {
                sum -= l[i][k] * l[j][k];
            }

            if i == j {
                if sum <= 0.0 {
                    return None; // Not positive definite
                }
                l[i][j] = sum.sqrt();
            } else {
                if l[j][j].abs() < 1e-300 {
                    return None;
                }
                l[i][j] = sum / l[j][j];
            }
        }
    }

    // Solve L y = b (forward substitution)
    let mut y = vec![0.0; n];
    for i in 0..n {
        let mut sum = b[i];
        for j in 0..i {
            sum -= l[i][j] * y[j];
        }
        y[i] = sum / l[i][i];
    }

    // Solve L^T x = y (backward substitution)
    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let mut sum = y[i];
        for j in (i + 1)..n {
            sum -= l[j][i] * x[j];
        }
        x[i] = sum / l[i][i];
    }

    if x.iter().all(|v| v.is_finite()) {
        Some(x)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========================================
    // LMConfig Tests
    // ========================================

    #[test]
    fn test_config_default() {
        let config = LMConfig::default();
        assert!((config.tolerance - 1e-12).abs() < 1e-20);
        assert_eq!(config.max_iterations, 200);
        assert!(config.initial_lambda > 0.0);
    }

    #[test]
    fn test_config_presets() {
        assert!(LMConfig::fast().tolerance > LMConfig::default().tolerance);
        assert!(LMConfig::high_precision().tolerance < LMConfig::default().tolerance);
        assert_eq!(LMConfig::new(1e-8, 50).max_iterations, 50);
    }

    // ========================================
    // LevenbergMarquardtSolver Tests
    // ========================================

    #[test]
    fn test_solve_simple_linear() {
        let residuals = |p: &[f64]| -> Vec<f64> { vec![p[0] - 2.0, p[1] - 3.0] };

        let solver = LevenbergMarquardtSolver::with_defaults();
        let result = solver.solve(residuals, vec![0.0, 0.0]).unwrap();

        assert!(result.converged);
        assert!((result.params[0] - 2.0).abs() < 1e-10);
        assert!((result.params[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn test_solve_underdetermined_polynomial_system() {
        // Two conditions in three unknowns, like low-order conditions on weights
        let residuals = |p: &[f64]| -> Vec<f64> {
            vec![p[0] + p[1] + p[2] - 1.0, p[1] * 0.5 + p[2] - 0.5]
        };

        let solver = LevenbergMarquardtSolver::with_defaults();
        let result = solver.solve(residuals, vec![0.2, 0.2, 0.2]).unwrap();

        assert!(result.converged);
        assert!(result.residual_norm() < 1e-12);
    }

    #[test]
    fn test_solve_already_optimal() {
        let residuals = |p: &[f64]| -> Vec<f64> { vec![p[0] - 5.0] };

        let solver = LevenbergMarquardtSolver::with_defaults();
        let result = solver.solve(residuals, vec![5.0]).unwrap();

        assert!(result.converged);
        assert_eq!(result.iterations, 0);
    }

    #[test]
    fn test_solve_inconsistent_reports_not_converged() {
        // p = 1 and p = 2 cannot both hold
        let residuals = |p: &[f64]| -> Vec<f64> { vec![p[0] - 1.0, p[0] - 2.0] };

        let solver = LevenbergMarquardtSolver::new(LMConfig::fast());
        let result = solver.solve(residuals, vec![0.0]).unwrap();

        assert!(!result.converged);
        assert!((result.params[0] - 1.5).abs() < 1e-6);
    }

    #[test]
    fn test_solve_projected_respects_bounds() {
        // Root at p = -1 is outside p ≥ 0; projected solution sits on the bound
        let residuals = |p: &[f64]| -> Vec<f64> { vec![p[0] + 1.0] };

        let solver = LevenbergMarquardtSolver::new(LMConfig::fast());
        let result = solver
            .solve_projected(residuals, vec![3.0], |p| p[0] = p[0].max(0.0))
            .unwrap();

        assert!(!result.converged);
        assert!(result.params[0] >= 0.0);
        assert!(result.params[0] < 1e-6);
    }

    #[test]
    fn test_solve_empty_params() {
        let residuals = |_p: &[f64]| -> Vec<f64> { vec![1.0] };
        let solver = LevenbergMarquardtSolver::with_defaults();
        assert!(solver.solve(residuals, vec![]).is_err());
    }

    #[test]
    fn test_solve_empty_residuals() {
        let residuals = |_p: &[f64]| -> Vec<f64> { Vec::new() };
        let solver = LevenbergMarquardtSolver::with_defaults();
        assert!(solver.solve(residuals, vec![1.0]).is_err());
    }

    // ========================================
    // Cholesky Solver Tests
    // ========================================

    #[test]
    fn test_cholesky_simple() {
        let a = vec![vec![4.0, 2.0], vec![2.0, 2.0]];
        let b = vec![8.0, 5.0];

        let x = solve_cholesky(&a, &b).unwrap();
        assert!((x[0] - 1.5).abs() < 1e-10);
        assert!((x[1] - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_cholesky_non_positive_definite() {
        let a = vec![vec![-1.0, 0.0], vec![0.0, 1.0]];
        assert!(solve_cholesky(&a, &[1.0, 1.0]).is_none());
    }
}
