//! Nonlinear constraint contributors.
//!
//! Inequalities follow the `g(x) ≤ 0` convention. Every contributor has a
//! fixed residual count per descriptor so the local solver sees vectors
//! of constant length.

use std::fmt;

use num_complex::Complex64;
use rkopt_core::math::solvers::ConstraintValues;
use rkopt_methods::analysis::{
    absolute_monotonicity_residuals, embedded_stability_modulus, tall_tree_coefficient,
    OrderConditions, Weights,
};
use rkopt_methods::{MethodCoefficients, MethodDescriptor, MethodError, Objective};

use crate::error::OptimiserError;
use crate::options::OptimiseOptions;

/// One independently enabled group of nonlinear residuals.
pub trait ConstraintContributor: fmt::Debug + Send + Sync {
    /// Short name for logging.
    fn name(&self) -> &'static str;

    /// Number of `(equalities, inequalities)` contributed.
    fn counts(&self) -> (usize, usize);

    /// Append residuals for the decoded method.
    fn contribute(
        &self,
        coeffs: &MethodCoefficients,
        values: &mut ConstraintValues,
    ) -> Result<(), MethodError>;
}

/// Order-condition residuals.
#[derive(Debug, Clone)]
pub struct OrderConditionResiduals {
    conditions: OrderConditions,
    stages: usize,
}

impl OrderConditionResiduals {
    /// Residuals of `conditions` for a method with `stages` stages.
    pub fn new(conditions: OrderConditions, stages: usize) -> Self {
        Self { conditions, stages }
    }
}

impl ConstraintContributor for OrderConditionResiduals {
    fn name(&self) -> &'static str {
        "order-conditions"
    }

    fn counts(&self) -> (usize, usize) {
        (self.conditions.count(self.stages), 0)
    }

    fn contribute(
        &self,
        coeffs: &MethodCoefficients,
        values: &mut ConstraintValues,
    ) -> Result<(), MethodError> {
        values.equalities.extend(self.conditions.residuals(coeffs));
        Ok(())
    }
}

/// Prescribed tall-tree (stability-polynomial) coefficients beyond the
/// order, emitted as equalities.
#[derive(Debug, Clone)]
pub struct StabilityCoefficientPins {
    weights: Weights,
    indices: Vec<usize>,
    targets: Vec<f64>,
}

impl StabilityCoefficientPins {
    /// Pins `Φ(tall_j) = target` for each `(j, target)`.
    pub fn new(weights: Weights, indices: Vec<usize>, targets: Vec<f64>) -> Self {
        Self {
            weights,
            indices,
            targets,
        }
    }
}

impl ConstraintContributor for StabilityCoefficientPins {
    fn name(&self) -> &'static str {
        match self.weights {
            Weights::Primary => "poly-coefficients",
            Weights::Embedded => "embedded-poly-coefficients",
        }
    }

    fn counts(&self) -> (usize, usize) {
        (self.indices.len(), 0)
    }

    fn contribute(
        &self,
        coeffs: &MethodCoefficients,
        values: &mut ConstraintValues,
    ) -> Result<(), MethodError> {
        for (&j, &target) in self.indices.iter().zip(&self.targets) {
            values
                .equalities
                .push(tall_tree_coefficient(coeffs, j, self.weights)? - target);
        }
        Ok(())
    }
}

/// `|R̂(z)| - 1 ≤ 0` at each point for the embedded method.
#[derive(Debug, Clone)]
pub struct EmbeddedStabilityBound {
    points: Vec<Complex64>,
}

impl EmbeddedStabilityBound {
    /// Bound at the given points.
    pub fn new(points: Vec<Complex64>) -> Self {
        Self { points }
    }
}

impl ConstraintContributor for EmbeddedStabilityBound {
    fn name(&self) -> &'static str {
        "embedded-stability"
    }

    fn counts(&self) -> (usize, usize) {
        (0, self.points.len())
    }

    fn contribute(
        &self,
        coeffs: &MethodCoefficients,
        values: &mut ConstraintValues,
    ) -> Result<(), MethodError> {
        for &z in &self.points {
            values
                .inequalities
                .push(embedded_stability_modulus(coeffs, z)? - 1.0);
        }
        Ok(())
    }
}

/// Absolute monotonicity at the radius carried by the SSP anchor.
#[derive(Debug, Clone)]
pub struct AbsoluteMonotonicity {
    stages: usize,
    steps: usize,
}

impl AbsoluteMonotonicity {
    /// Inequalities for a method with the given stage and step counts.
    pub fn new(stages: usize, steps: usize) -> Self {
        Self { stages, steps }
    }
}

impl ConstraintContributor for AbsoluteMonotonicity {
    fn name(&self) -> &'static str {
        "absolute-monotonicity"
    }

    fn counts(&self) -> (usize, usize) {
        let n = self.stages + 1;
        (0, n * (self.steps + n))
    }

    fn contribute(
        &self,
        coeffs: &MethodCoefficients,
        values: &mut ConstraintValues,
    ) -> Result<(), MethodError> {
        let r = coeffs
            .anchor_radius()
            .ok_or_else(|| MethodError::structure("ssp objective needs an anchor"))?;
        values
            .inequalities
            .extend(absolute_monotonicity_residuals(coeffs, r));
        Ok(())
    }
}

/// The nonlinear constraint evaluator: an ordered list of contributors.
#[derive(Debug, Default)]
pub struct NonlinearConstraints {
    contributors: Vec<Box<dyn ConstraintContributor>>,
}

impl NonlinearConstraints {
    /// No contributors.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a contributor.
    pub fn with(mut self, contributor: impl ConstraintContributor + 'static) -> Self {
        self.contributors.push(Box::new(contributor));
        self
    }

    /// Contributors for a search: order conditions, optional pins and
    /// embedded stability bounds, and absolute monotonicity for `ssp`.
    pub fn for_search(
        descriptor: &MethodDescriptor,
        conditions: OrderConditions,
        options: &OptimiseOptions,
    ) -> Result<Self, OptimiserError> {
        let p = descriptor.order();
        let embedded = descriptor.class().has_embedded();
        let mut errors = Vec::new();

        for (label, indices) in [
            ("poly_coeff_ind", &options.poly_coeff_ind),
            ("emb_poly_coeff_ind", &options.emb_poly_coeff_ind),
        ] {
            if let Some(j) = indices.iter().find(|&&j| j <= p) {
                errors.push(format!(
                    "{} entry {} must exceed the order {}",
                    label, j, p
                ));
            }
        }
        if !embedded && !options.emb_poly_coeff_ind.is_empty() {
            errors.push(format!(
                "emb_poly_coeff_ind given for class {} without an embedded method",
                descriptor.class()
            ));
        }
        if !embedded && !options.constrain_emb_stability.is_empty() {
            errors.push(format!(
                "constrain_emb_stability given for class {} without an embedded method",
                descriptor.class()
            ));
        }
        if !errors.is_empty() {
            return Err(OptimiserError::InvalidOptions(errors));
        }

        let mut constraints =
            Self::new().with(OrderConditionResiduals::new(conditions, descriptor.stages()));
        if !options.poly_coeff_ind.is_empty() {
            constraints = constraints.with(StabilityCoefficientPins::new(
                Weights::Primary,
                options.poly_coeff_ind.clone(),
                options.poly_coeff_val.clone(),
            ));
        }
        if !options.emb_poly_coeff_ind.is_empty() {
            constraints = constraints.with(StabilityCoefficientPins::new(
                Weights::Embedded,
                options.emb_poly_coeff_ind.clone(),
                options.emb_poly_coeff_val.clone(),
            ));
        }
        if !options.constrain_emb_stability.is_empty() {
            constraints =
                constraints.with(EmbeddedStabilityBound::new(options.constrain_emb_stability.clone()));
        }
        if descriptor.objective() == Objective::Ssp {
            constraints = constraints.with(AbsoluteMonotonicity::new(
                descriptor.stages(),
                descriptor.steps(),
            ));
        }
        Ok(constraints)
    }

    /// Contributor names, in evaluation order.
    pub fn names(&self) -> Vec<&'static str> {
        self.contributors.iter().map(|c| c.name()).collect()
    }

    /// Total `(equalities, inequalities)`.
    pub fn counts(&self) -> (usize, usize) {
        self.contributors
            .iter()
            .map(|c| c.counts())
            .fold((0, 0), |(e, i), (ce, ci)| (e + ce, i + ci))
    }

    /// Evaluate every contributor. A contributor that fails reports NaN
    /// residuals, which the solver treats as infinitely violated.
    pub fn evaluate(&self, coeffs: &MethodCoefficients) -> ConstraintValues {
        let (n_eq, n_ineq) = self.counts();
        let mut values = ConstraintValues::new(
            Vec::with_capacity(n_eq),
            Vec::with_capacity(n_ineq),
        );
        for contributor in &self.contributors {
            let (eq_before, ineq_before) = (values.equalities.len(), values.inequalities.len());
            if contributor.contribute(coeffs, &mut values).is_err() {
                let (ce, ci) = contributor.counts();
                values.equalities.truncate(eq_before);
                values.inequalities.truncate(ineq_before);
                values.equalities.resize(eq_before + ce, f64::NAN);
                values.inequalities.resize(ineq_before + ci, f64::NAN);
            }
        }
        values
    }

    /// Values reported when the parameter vector cannot be decoded.
    pub fn failed(&self) -> ConstraintValues {
        let (n_eq, n_ineq) = self.counts();
        ConstraintValues::new(vec![f64::NAN; n_eq], vec![f64::NAN; n_ineq])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rkopt_methods::analysis::ConditionMode;
    use rkopt_methods::{MethodClass, MethodFamily};

    fn descriptor(class: MethodClass, s: usize, p: usize, obj: Objective) -> MethodDescriptor {
        MethodDescriptor::new(class, s, 1, p, obj).unwrap()
    }

    fn build(desc: &MethodDescriptor, options: &OptimiseOptions) -> Result<NonlinearConstraints, OptimiserError> {
        let conditions = OrderConditions::new(desc.order(), ConditionMode::Nonlinear);
        NonlinearConstraints::for_search(desc, conditions, options)
    }

    #[test]
    fn test_contributors_for_ssp() {
        let desc = descriptor(MethodClass::Erk, 3, 2, Objective::Ssp);
        let nc = build(&desc, &OptimiseOptions::default()).unwrap();
        assert_eq!(nc.names(), vec!["order-conditions", "absolute-monotonicity"]);
        // 4 order-0 rows + 2 trees; 4 × (1 + 4)
        assert_eq!(nc.counts(), (6, 20));
    }

    #[test]
    fn test_counts_match_evaluation() {
        let desc = descriptor(MethodClass::TwoSEmbedded, 3, 2, Objective::Ssp);
        let options = OptimiseOptions::default()
            .with_poly_coefficients(vec![3], vec![1.0 / 6.0])
            .with_emb_poly_coefficients(vec![3], vec![0.1])
            .with_emb_stability_points(vec![Complex64::new(-1.0, 0.0)]);
        let nc = build(&desc, &options).unwrap();
        assert_eq!(nc.names().len(), 5);
        let family = desc.family();
        let coeffs = family.decode(&family.smart_guess()).unwrap();
        let values = nc.evaluate(&coeffs);
        assert_eq!(
            (values.equalities.len(), values.inequalities.len()),
            nc.counts()
        );
        assert!(values.equalities.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_smart_ssprk_is_feasible_at_its_anchor() {
        let desc = descriptor(MethodClass::TwoSStar, 4, 2, Objective::Ssp);
        let nc = build(&desc, &OptimiseOptions::default()).unwrap();
        let family = desc.family();
        let coeffs = family.decode(&family.smart_guess()).unwrap();
        let values = nc.evaluate(&coeffs);
        assert!(values.max_violation() < 1e-12);
    }

    #[test]
    fn test_pin_index_must_exceed_order() {
        let desc = descriptor(MethodClass::Erk, 3, 3, Objective::Acc);
        let options = OptimiseOptions::default().with_poly_coefficients(vec![3], vec![0.0]);
        assert!(matches!(
            build(&desc, &options),
            Err(OptimiserError::InvalidOptions(_))
        ));
    }

    #[test]
    fn test_embedded_inputs_need_embedded_class() {
        let desc = descriptor(MethodClass::Erk, 3, 2, Objective::Acc);
        let options =
            OptimiseOptions::default().with_emb_stability_points(vec![Complex64::new(-1.0, 0.0)]);
        match build(&desc, &options) {
            Err(OptimiserError::InvalidOptions(errors)) => {
                assert!(errors[0].contains("embedded"))
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_failing_contributor_reports_nan() {
        let desc = descriptor(MethodClass::Erk, 2, 2, Objective::Acc);
        let nc = NonlinearConstraints::new().with(EmbeddedStabilityBound::new(vec![
            Complex64::new(-1.0, 0.0),
            Complex64::new(-2.0, 0.0),
        ]));
        let family = desc.family();
        let coeffs = family.decode(&family.smart_guess()).unwrap();
        let values = nc.evaluate(&coeffs);
        assert_eq!(values.inequalities.len(), 2);
        assert_eq!(values.max_violation(), f64::INFINITY);
    }
}
