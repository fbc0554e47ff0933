//! Integration tests for module exports and the solver seam.

use rkopt_core::math::linalg;
use rkopt_core::math::solvers::{
    AugmentedLagrangianSolver, ConstraintValues, LMConfig, LevenbergMarquardtSolver,
    LocalAlgorithm, LocalSolver, LocalSolverConfig, LocalStatus, NlpProblem,
};
use rkopt_core::types::{LinearConstraints, ParameterBounds, SolverError};

/// Weights of a two-point quadrature rule exact for degree ≤ 2 on [0, 1],
/// with the first node pinned at 0 and the weights non-negative.
///
/// The unique solution is Radau IIA-like: nodes (0, 2/3), weights (1/4, 3/4).
struct Quadrature {
    linear: LinearConstraints,
}

impl Quadrature {
    fn new() -> Self {
        // x = [w0, w1, node1]
        let mut linear = LinearConstraints::unconstrained(3);
        linear.push_equality(vec![1.0, 1.0, 0.0], 1.0).unwrap();
        linear.set_bounds(0, ParameterBounds::non_negative());
        linear.set_bounds(1, ParameterBounds::non_negative());
        linear.set_bounds(2, ParameterBounds::new(0.0, 1.0));
        Self { linear }
    }
}

impl NlpProblem for Quadrature {
    fn dimension(&self) -> usize {
        3
    }

    fn objective(&self, x: &[f64]) -> f64 {
        // Degree-3 error of the rule
        let err = x[1] * x[2].powi(3) - 0.25;
        err * err
    }

    fn constraints(&self, x: &[f64]) -> ConstraintValues {
        ConstraintValues::new(
            vec![x[1] * x[2] - 0.5, x[1] * x[2] * x[2] - 1.0 / 3.0],
            vec![],
        )
    }

    fn linear_constraints(&self) -> &LinearConstraints {
        &self.linear
    }
}

#[test]
fn test_quadrature_problem_solves_through_trait_object() {
    let problem = Quadrature::new();
    let solver: Box<dyn LocalSolver> = Box::new(AugmentedLagrangianSolver::with_defaults());
    let sol = solver.minimise(&problem, &[0.5, 0.5, 0.5]).unwrap();

    assert!(sol.status.is_success(), "status {}", sol.status);
    assert!(sol.max_violation <= 1e-12);
    assert!((sol.x[0] - 0.25).abs() < 1e-8);
    assert!((sol.x[1] - 0.75).abs() < 1e-8);
    assert!((sol.x[2] - 2.0 / 3.0).abs() < 1e-8);
}

#[test]
fn test_penalty_variant_also_feasible() {
    let problem = Quadrature::new();
    let config = LocalSolverConfig::default().with_algorithm(LocalAlgorithm::Penalty);
    let sol = config.build().minimise(&problem, &[0.5, 0.5, 0.5]).unwrap();
    assert!(sol.max_violation <= 1e-12);
    assert_ne!(sol.status, LocalStatus::Infeasible);
}

#[test]
fn test_crossed_bounds_rejected() {
    let mut problem = Quadrature::new();
    problem.linear.set_bounds(2, ParameterBounds::new(1.0, 0.0));
    let err = AugmentedLagrangianSolver::with_defaults()
        .minimise(&problem, &[0.5, 0.5, 0.5])
        .unwrap_err();
    assert!(matches!(err, SolverError::InfeasibleBounds { index: 2, .. }));
}

#[test]
fn test_lm_projection_onto_manifold() {
    let problem = Quadrature::new();
    let residuals = |x: &[f64]| {
        let mut r = problem.constraints(x).equalities;
        r.extend(problem.linear_constraints().equality_residuals(x));
        r
    };
    let result = LevenbergMarquardtSolver::new(LMConfig::default())
        .solve(residuals, vec![0.3, 0.6, 0.7])
        .unwrap();
    assert!(result.converged);
    assert!(linalg::norm_inf(&residuals(&result.params)) < 1e-12);
}
