//! The constrained problem handed to the local solver.

use rkopt_core::math::solvers::{ConstraintValues, NlpProblem};
use rkopt_core::types::LinearConstraints;
use rkopt_methods::analysis::OrderConditions;
use rkopt_methods::{Family, MethodDescriptor, MethodFamily};

use crate::constraints::{linear_constraints, NonlinearConstraints};
use crate::error::OptimiserError;
use crate::objective::ObjectiveEvaluator;
use crate::options::OptimiseOptions;

/// Objective, linear and nonlinear constraints of one coefficient search.
///
/// Immutable after construction and shared read-only by all local runs.
#[derive(Debug)]
pub struct MethodProblem {
    descriptor: MethodDescriptor,
    family: Family,
    conditions: OrderConditions,
    linear: LinearConstraints,
    nonlinear: NonlinearConstraints,
    objective: ObjectiveEvaluator,
}

impl MethodProblem {
    /// Assemble the problem for a descriptor.
    pub fn new(
        descriptor: MethodDescriptor,
        options: &OptimiseOptions,
    ) -> Result<Self, OptimiserError> {
        let family = descriptor.family();
        let conditions = OrderConditions::new(descriptor.order(), options.problem_type);
        let linear = linear_constraints(&family)?;
        let nonlinear = NonlinearConstraints::for_search(&descriptor, conditions.clone(), options)?;
        Ok(Self {
            descriptor,
            family,
            conditions,
            linear,
            nonlinear,
            objective: ObjectiveEvaluator::for_descriptor(&descriptor),
        })
    }

    /// Descriptor of the search.
    pub fn descriptor(&self) -> &MethodDescriptor {
        &self.descriptor
    }

    /// Codec family.
    pub fn family(&self) -> &Family {
        &self.family
    }

    /// Nonlinear constraint evaluator.
    pub fn nonlinear(&self) -> &NonlinearConstraints {
        &self.nonlinear
    }

    /// Objective evaluator.
    pub fn objective_evaluator(&self) -> &ObjectiveEvaluator {
        &self.objective
    }

    /// Order-condition residuals followed by the linear equality residuals;
    /// the system a starting point is projected onto.
    pub fn projection_residuals(&self, x: &[f64]) -> Vec<f64> {
        let mut r = match self.family.decode(x) {
            Ok(coeffs) => self.conditions.residuals(&coeffs),
            Err(_) => vec![f64::NAN; self.conditions.count(self.descriptor.stages())],
        };
        r.extend(self.linear.equality_residuals(x));
        r
    }
}

impl NlpProblem for MethodProblem {
    fn dimension(&self) -> usize {
        self.family.parameter_count()
    }

    fn objective(&self, x: &[f64]) -> f64 {
        self.objective.value(&self.family, x)
    }

    fn gradient(&self, _x: &[f64]) -> Option<Vec<f64>> {
        self.objective.gradient()
    }

    fn constraints(&self, x: &[f64]) -> ConstraintValues {
        match self.family.decode(x) {
            Ok(coeffs) => self.nonlinear.evaluate(&coeffs),
            Err(_) => self.nonlinear.failed(),
        }
    }

    fn linear_constraints(&self) -> &LinearConstraints {
        &self.linear
    }
}
