//! Objective evaluation.
//!
//! - `ssp`: the trailing anchor `-r` itself, with gradient `e_anchor`;
//!   minimising it maximises the SSP coefficient
//! - `acc`: Euclidean norm of the order `p + 1` error coefficients; no
//!   analytic gradient

use rkopt_methods::analysis::{ConditionMode, OrderConditions};
use rkopt_methods::{MethodDescriptor, MethodFamily, Objective};

/// Objective of one search.
#[derive(Debug, Clone)]
pub enum ObjectiveEvaluator {
    /// Anchor coordinate.
    Ssp {
        /// Index of the anchor in the parameter vector
        anchor: usize,
        /// Parameter count
        dimension: usize,
    },
    /// Truncation-error norm.
    Acc {
        /// Conditions of the requested order, for the error coefficients
        conditions: OrderConditions,
    },
}

impl ObjectiveEvaluator {
    /// Objective selected by the descriptor.
    pub fn for_descriptor(descriptor: &MethodDescriptor) -> Self {
        match descriptor.anchor_index() {
            Some(anchor) => ObjectiveEvaluator::Ssp {
                anchor,
                dimension: descriptor.parameter_count(),
            },
            None => ObjectiveEvaluator::Acc {
                conditions: OrderConditions::new(descriptor.order(), ConditionMode::Nonlinear),
            },
        }
    }

    /// Which objective this is.
    pub fn objective(&self) -> Objective {
        match self {
            ObjectiveEvaluator::Ssp { .. } => Objective::Ssp,
            ObjectiveEvaluator::Acc { .. } => Objective::Acc,
        }
    }

    /// Objective value; `+∞` when `x` cannot be decoded.
    pub fn value<F: MethodFamily>(&self, family: &F, x: &[f64]) -> f64 {
        match self {
            ObjectiveEvaluator::Ssp { anchor, .. } => {
                x.get(*anchor).copied().unwrap_or(f64::INFINITY)
            }
            ObjectiveEvaluator::Acc { conditions } => match family.decode(x) {
                Ok(coeffs) => conditions.error_norm(&coeffs),
                Err(_) => f64::INFINITY,
            },
        }
    }

    /// Analytic gradient, available for `ssp` only.
    pub fn gradient(&self) -> Option<Vec<f64>> {
        match self {
            ObjectiveEvaluator::Ssp { anchor, dimension } => {
                let mut g = vec![0.0; *dimension];
                g[*anchor] = 1.0;
                Some(g)
            }
            ObjectiveEvaluator::Acc { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rkopt_methods::MethodClass;

    #[test]
    fn test_ssp_objective_is_anchor() {
        let desc = MethodDescriptor::new(MethodClass::Erk, 2, 1, 2, Objective::Ssp).unwrap();
        let eval = ObjectiveEvaluator::for_descriptor(&desc);
        assert_eq!(eval.objective(), Objective::Ssp);
        let family = desc.family();
        assert_eq!(eval.value(&family, &[1.0, 0.5, 0.5, -1.0]), -1.0);
        assert_eq!(eval.gradient(), Some(vec![0.0, 0.0, 0.0, 1.0]));
    }

    #[test]
    fn test_acc_objective_is_error_norm() {
        let desc = MethodDescriptor::new(MethodClass::Erk, 2, 1, 2, Objective::Acc).unwrap();
        let eval = ObjectiveEvaluator::for_descriptor(&desc);
        assert!(eval.gradient().is_none());
        let family = desc.family();
        // midpoint rule: (b·c² - 1/3)/2 = -1/24 and b·Ac - 1/6 = -1/6
        let value = eval.value(&family, &[0.5, 0.0, 1.0]);
        let expected = ((1.0_f64 / 24.0).powi(2) + (1.0_f64 / 6.0).powi(2)).sqrt();
        assert_relative_eq!(value, expected, epsilon = 1e-15);
    }

    #[test]
    fn test_undecodable_vector_is_infinite() {
        let desc = MethodDescriptor::new(MethodClass::Erk, 2, 1, 2, Objective::Acc).unwrap();
        let eval = ObjectiveEvaluator::for_descriptor(&desc);
        assert_eq!(eval.value(&desc.family(), &[0.5]), f64::INFINITY);
    }
}
