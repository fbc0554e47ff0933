//! Box bounds and linear equality constraints on a parameter vector.
//!
//! [`LinearConstraints`] collects everything about a feasible set that is
//! linear in the optimisation variables: rows of `Aeq x = beq` and one
//! [`ParameterBounds`] per coordinate.

use super::error::SolverError;

/// Bounds for a single parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParameterBounds {
    /// Minimum allowed value.
    pub min: f64,
    /// Maximum allowed value.
    pub max: f64,
}

impl Default for ParameterBounds {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl ParameterBounds {
    /// Create new bounds.
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Create bounds for a non-negative parameter.
    pub fn non_negative() -> Self {
        Self {
            min: 0.0,
            max: f64::INFINITY,
        }
    }

    /// Create bounds for a non-positive parameter.
    pub fn non_positive() -> Self {
        Self {
            min: f64::NEG_INFINITY,
            max: 0.0,
        }
    }

    /// Create unbounded.
    pub fn unbounded() -> Self {
        Self {
            min: f64::NEG_INFINITY,
            max: f64::INFINITY,
        }
    }

    /// Check if a value is within bounds.
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Clamp a value to bounds.
    pub fn clamp(&self, value: f64) -> f64 {
        value.max(self.min).min(self.max)
    }

    /// Distance from `value` to the interval (zero inside).
    pub fn violation(&self, value: f64) -> f64 {
        (self.min - value).max(value - self.max).max(0.0)
    }

    /// Whether both ends are infinite.
    pub fn is_unbounded(&self) -> bool {
        self.min == f64::NEG_INFINITY && self.max == f64::INFINITY
    }
}

/// One row of a linear equality `coefficients · x = rhs`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LinearEquality {
    /// Dense coefficient row.
    pub coefficients: Vec<f64>,
    /// Right-hand side.
    pub rhs: f64,
}

impl LinearEquality {
    /// Residual `coefficients · x - rhs`.
    pub fn residual(&self, x: &[f64]) -> f64 {
        self.coefficients
            .iter()
            .zip(x)
            .map(|(a, xi)| a * xi)
            .sum::<f64>()
            - self.rhs
    }
}

/// Linear part of a constrained problem: `Aeq x = beq`, `lower ≤ x ≤ upper`.
///
/// # Example
///
/// ```
/// use rkopt_core::types::{LinearConstraints, ParameterBounds};
///
/// let mut lc = LinearConstraints::unconstrained(2);
/// lc.push_equality(vec![1.0, 1.0], 1.0).unwrap();
/// lc.set_bounds(1, ParameterBounds::non_negative());
///
/// let mut x = vec![0.3, -0.2];
/// lc.project_bounds(&mut x);
/// assert_eq!(x, vec![0.3, 0.0]);
/// assert!((lc.max_violation(&x) - 0.7).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LinearConstraints {
    dimension: usize,
    equalities: Vec<LinearEquality>,
    bounds: Vec<ParameterBounds>,
}

impl LinearConstraints {
    /// No equalities and no bounds on a `dimension`-vector.
    pub fn unconstrained(dimension: usize) -> Self {
        Self {
            dimension,
            equalities: Vec::new(),
            bounds: vec![ParameterBounds::unbounded(); dimension],
        }
    }

    /// Number of optimisation variables.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Append an equality row.
    pub fn push_equality(&mut self, coefficients: Vec<f64>, rhs: f64) -> Result<(), SolverError> {
        if coefficients.len() != self.dimension {
            return Err(SolverError::DimensionMismatch {
                expected: self.dimension,
                got: coefficients.len(),
            });
        }
        self.equalities.push(LinearEquality { coefficients, rhs });
        Ok(())
    }

    /// Replace the bounds of one coordinate. Out-of-range indices are ignored.
    pub fn set_bounds(&mut self, index: usize, bounds: ParameterBounds) {
        if let Some(slot) = self.bounds.get_mut(index) {
            *slot = bounds;
        }
    }

    /// Equality rows.
    pub fn equalities(&self) -> &[LinearEquality] {
        &self.equalities
    }

    /// Per-coordinate bounds.
    pub fn bounds(&self) -> &[ParameterBounds] {
        &self.bounds
    }

    /// `Aeq` as dense rows.
    pub fn aeq(&self) -> Vec<Vec<f64>> {
        self.equalities
            .iter()
            .map(|row| row.coefficients.clone())
            .collect()
    }

    /// `beq`.
    pub fn beq(&self) -> Vec<f64> {
        self.equalities.iter().map(|row| row.rhs).collect()
    }

    /// Lower bounds.
    pub fn lower(&self) -> Vec<f64> {
        self.bounds.iter().map(|b| b.min).collect()
    }

    /// Upper bounds.
    pub fn upper(&self) -> Vec<f64> {
        self.bounds.iter().map(|b| b.max).collect()
    }

    /// Residuals `Aeq x - beq`.
    pub fn equality_residuals(&self, x: &[f64]) -> Vec<f64> {
        self.equalities.iter().map(|row| row.residual(x)).collect()
    }

    /// Clamp `x` into the box in place.
    pub fn project_bounds(&self, x: &mut [f64]) {
        for (xi, b) in x.iter_mut().zip(&self.bounds) {
            *xi = b.clamp(*xi);
        }
    }

    /// Largest equality residual or bound violation.
    pub fn max_violation(&self, x: &[f64]) -> f64 {
        let eq = self
            .equality_residuals(x)
            .iter()
            .fold(0.0_f64, |m, r| m.max(r.abs()));
        self.bounds
            .iter()
            .zip(x)
            .fold(eq, |m, (b, &xi)| m.max(b.violation(xi)))
    }

    /// Check every coordinate has `min ≤ max`.
    pub fn validate(&self) -> Result<(), SolverError> {
        for (index, b) in self.bounds.iter().enumerate() {
            if b.min > b.max || b.min.is_nan() || b.max.is_nan() {
                return Err(SolverError::InfeasibleBounds {
                    index,
                    lower: b.min,
                    upper: b.max,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_bounds_clamp_and_violation() {
        let b = ParameterBounds::new(-1.0, 2.0);
        assert_eq!(b.clamp(3.0), 2.0);
        assert_eq!(b.clamp(-5.0), -1.0);
        assert_relative_eq!(b.violation(3.5), 1.5);
        assert_eq!(b.violation(0.0), 0.0);
        assert!(b.contains(2.0));
        assert!(!b.contains(2.1));
    }

    #[test]
    fn test_non_positive_bounds() {
        let b = ParameterBounds::non_positive();
        assert!(b.contains(-10.0));
        assert!(!b.contains(1e-12));
        assert!(!b.is_unbounded());
        assert!(ParameterBounds::default().is_unbounded());
    }

    #[test]
    fn test_push_equality_rejects_wrong_length() {
        let mut lc = LinearConstraints::unconstrained(3);
        let err = lc.push_equality(vec![1.0, 1.0], 1.0).unwrap_err();
        assert_eq!(
            err,
            SolverError::DimensionMismatch {
                expected: 3,
                got: 2
            }
        );
    }

    #[test]
    fn test_equality_residuals() {
        let mut lc = LinearConstraints::unconstrained(3);
        lc.push_equality(vec![1.0, 1.0, 1.0], 1.0).unwrap();
        lc.push_equality(vec![0.0, 2.0, 0.0], 0.5).unwrap();
        let r = lc.equality_residuals(&[0.2, 0.3, 0.5]);
        assert_relative_eq!(r[0], 0.0, epsilon = 1e-15);
        assert_relative_eq!(r[1], 0.1, epsilon = 1e-15);
        assert_eq!(lc.aeq().len(), 2);
        assert_eq!(lc.beq(), vec![1.0, 0.5]);
    }

    #[test]
    fn test_validate_detects_crossed_bounds() {
        let mut lc = LinearConstraints::unconstrained(2);
        lc.set_bounds(1, ParameterBounds::new(1.0, 0.0));
        assert!(matches!(
            lc.validate(),
            Err(SolverError::InfeasibleBounds { index: 1, .. })
        ));
    }
}
