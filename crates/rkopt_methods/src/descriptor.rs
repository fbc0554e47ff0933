//! Method descriptor: class, stage/step counts, order and objective.

use std::fmt;

use crate::class::{MethodClass, Objective};
use crate::error::MethodError;
use crate::family::{Family, MethodFamily};

/// Highest order the order-condition machinery handles.
pub const MAX_ORDER: usize = 10;

/// Immutable configuration of one search.
///
/// # Examples
///
/// ```
/// use rkopt_methods::{MethodClass, MethodDescriptor, Objective};
///
/// let desc = MethodDescriptor::new(MethodClass::Erk, 3, 1, 3, Objective::Ssp).unwrap();
/// // strictly lower A (3) + b (3) + anchor (1)
/// assert_eq!(desc.parameter_count(), 7);
///
/// let parsed = MethodDescriptor::from_names(4, 3, "erk", "acc", 1).unwrap();
/// assert_eq!(parsed.objective(), Objective::Acc);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MethodDescriptor {
    class: MethodClass,
    stages: usize,
    steps: usize,
    order: usize,
    objective: Objective,
}

impl MethodDescriptor {
    /// Validate and create a descriptor.
    pub fn new(
        class: MethodClass,
        stages: usize,
        steps: usize,
        order: usize,
        objective: Objective,
    ) -> Result<Self, MethodError> {
        if stages == 0 {
            return Err(MethodError::invalid_descriptor("stage count must be positive"));
        }
        if steps == 0 {
            return Err(MethodError::invalid_descriptor("step count must be positive"));
        }
        if order == 0 || order > MAX_ORDER {
            return Err(MethodError::invalid_descriptor(format!(
                "order must lie in 1..={}, got {}",
                MAX_ORDER, order
            )));
        }
        if class.low_storage_scheme().is_some() {
            if steps > 1 {
                return Err(MethodError::invalid_descriptor(format!(
                    "class {} is single-step, got {} steps",
                    class, steps
                )));
            }
            if stages < 2 {
                return Err(MethodError::invalid_descriptor(format!(
                    "class {} needs at least 2 stages",
                    class
                )));
            }
        }
        Ok(Self {
            class,
            stages,
            steps,
            order,
            objective,
        })
    }

    /// Parse class and objective names, then validate.
    pub fn from_names(
        stages: usize,
        order: usize,
        class_name: &str,
        objective_name: &str,
        steps: usize,
    ) -> Result<Self, MethodError> {
        let class = class_name.parse()?;
        let objective = objective_name.parse()?;
        Self::new(class, stages, steps, order, objective)
    }

    /// Method class.
    pub fn class(&self) -> MethodClass {
        self.class
    }

    /// Number of stages `s`.
    pub fn stages(&self) -> usize {
        self.stages
    }

    /// Number of steps `k`.
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Requested order `p`.
    pub fn order(&self) -> usize {
        self.order
    }

    /// Objective.
    pub fn objective(&self) -> Objective {
        self.objective
    }

    /// Whether the method uses more than one previous step.
    pub fn is_multistep(&self) -> bool {
        self.steps > 1
    }

    /// Codec and heuristics for this descriptor.
    pub fn family(&self) -> Family {
        Family::for_descriptor(*self)
    }

    /// Length of the parameter vector.
    pub fn parameter_count(&self) -> usize {
        self.family().parameter_count()
    }

    /// Index of the SSP anchor in the parameter vector, if any.
    pub fn anchor_index(&self) -> Option<usize> {
        if self.objective.has_anchor() {
            Some(self.parameter_count() - 1)
        } else {
            None
        }
    }

    /// History node offsets `x_l = l - (k - 1)`, oldest first.
    pub fn history_nodes(&self) -> Vec<f64> {
        history_nodes(self.steps)
    }
}

/// History node offsets for a `steps`-step method.
pub fn history_nodes(steps: usize) -> Vec<f64> {
    (0..steps).map(|l| l as f64 - (steps as f64 - 1.0)).collect()
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} s={} k={} p={} ({})",
            self.class, self.stages, self.steps, self.order, self.objective
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_zero_counts() {
        assert!(MethodDescriptor::new(MethodClass::Erk, 0, 1, 1, Objective::Acc).is_err());
        assert!(MethodDescriptor::new(MethodClass::Erk, 2, 0, 1, Objective::Acc).is_err());
        assert!(MethodDescriptor::new(MethodClass::Erk, 2, 1, 0, Objective::Acc).is_err());
        assert!(MethodDescriptor::new(MethodClass::Erk, 2, 1, 11, Objective::Acc).is_err());
    }

    #[test]
    fn test_low_storage_is_single_step() {
        let err = MethodDescriptor::new(MethodClass::TwoSStar, 3, 2, 2, Objective::Acc);
        assert!(matches!(err, Err(MethodError::InvalidDescriptor(_))));
        assert!(MethodDescriptor::new(MethodClass::TwoSStar, 1, 1, 1, Objective::Acc).is_err());
    }

    #[test]
    fn test_multistep_butcher_allowed() {
        let desc = MethodDescriptor::new(MethodClass::Erk, 2, 3, 3, Objective::Ssp).unwrap();
        assert!(desc.is_multistep());
        assert_eq!(desc.history_nodes(), vec![-2.0, -1.0, 0.0]);
    }

    #[test]
    fn test_from_names_errors() {
        assert!(matches!(
            MethodDescriptor::from_names(3, 2, "xrk", "acc", 1),
            Err(MethodError::UnknownClass(_))
        ));
        assert!(matches!(
            MethodDescriptor::from_names(3, 2, "erk", "fast", 1),
            Err(MethodError::UnknownObjective(_))
        ));
    }

    #[test]
    fn test_anchor_index() {
        let ssp = MethodDescriptor::new(MethodClass::Erk, 2, 1, 2, Objective::Ssp).unwrap();
        assert_eq!(ssp.anchor_index(), Some(3));
        let acc = MethodDescriptor::new(MethodClass::Erk, 2, 1, 2, Objective::Acc).unwrap();
        assert_eq!(acc.anchor_index(), None);
    }

    #[test]
    fn test_display() {
        let desc = MethodDescriptor::new(MethodClass::Sdirk, 3, 1, 3, Objective::Acc).unwrap();
        assert_eq!(desc.to_string(), "sdirk s=3 k=1 p=3 (acc)");
    }
}
