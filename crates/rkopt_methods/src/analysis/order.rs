//! B-series order conditions, order checking and truncation-error
//! coefficients for methods in general (multistep multistage) form.
//!
//! For a tree `t` the stage coefficients are
//!
//! ```text
//! η_i(t)  = Σ_l D_il x_l^{|t|} / γ(t) + Σ_j a_ij η'_j(t)
//! η'_j(t) = Π_{children u} η_j(u)
//! Φ(t)    = Σ_l θ_l x_l^{|t|} / γ(t) + Σ_j b_j η'_j(t)
//! ```
//!
//! and the method has order `p` when `Φ(t) = 1/γ(t)` for all `|t| ≤ p`.

use std::fmt;
use std::str::FromStr;

use crate::coefficients::MethodCoefficients;
use crate::descriptor::MAX_ORDER;
use crate::error::MethodError;
use crate::trees::TreeCatalogue;

/// Default tolerance of [`check_order`].
pub const DEFAULT_ORDER_TOLERANCE: f64 = 1e-10;

/// Which trees contribute order conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ConditionMode {
    /// Every rooted tree.
    #[default]
    Nonlinear,
    /// Tall trees only: the conditions for linear autonomous problems.
    Linear,
}

impl ConditionMode {
    /// Conventional name.
    pub fn name(&self) -> &'static str {
        match self {
            ConditionMode::Nonlinear => "nonlinear",
            ConditionMode::Linear => "linear",
        }
    }
}

impl FromStr for ConditionMode {
    type Err = MethodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nonlinear" => Ok(ConditionMode::Nonlinear),
            "linear" => Ok(ConditionMode::Linear),
            other => Err(MethodError::invalid_descriptor(format!(
                "unknown problem type '{}' (expected 'nonlinear' or 'linear')",
                other
            ))),
        }
    }
}

impl fmt::Display for ConditionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which output weights to evaluate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Weights {
    /// `b` and `θ`.
    Primary,
    /// The embedded pair `b̂` and `θ̂`.
    Embedded,
}

/// Output weights `(b, θ)` selected by `weights`.
pub(crate) fn output_weights(
    coeffs: &MethodCoefficients,
    weights: Weights,
) -> Result<(&[f64], &[f64]), MethodError> {
    match weights {
        Weights::Primary => Ok((&coeffs.b, &coeffs.theta)),
        Weights::Embedded => coeffs
            .embedded
            .as_ref()
            .map(|e| (e.bhat.as_slice(), e.theta_hat.as_slice()))
            .ok_or(MethodError::MissingEmbedded),
    }
}

/// Σ_l w_l x_l^q / γ.
fn history_term(w: &[f64], x: &[f64], q: usize, density: f64) -> f64 {
    w.iter()
        .zip(x)
        .map(|(w, x)| w * x.powi(q as i32))
        .sum::<f64>()
        / density
}

/// `Φ(t)` for every tree of the catalogue.
fn elementary_weights(
    coeffs: &MethodCoefficients,
    trees: &TreeCatalogue,
    b: &[f64],
    theta: &[f64],
) -> Vec<f64> {
    let s = coeffs.stages();
    let x = coeffs.history_nodes();
    let mut eta: Vec<Vec<f64>> = Vec::with_capacity(trees.len());
    let mut phi = Vec::with_capacity(trees.len());

    for tree in trees.trees() {
        let density = tree.density as f64;
        let mut eta_prime = vec![1.0; s];
        for &child in &tree.children {
            for (e, c) in eta_prime.iter_mut().zip(&eta[child]) {
                *e *= c;
            }
        }
        let stage: Vec<f64> = (0..s)
            .map(|i| {
                history_term(&coeffs.d[i], &x, tree.order, density)
                    + coeffs.a[i]
                        .iter()
                        .zip(&eta_prime)
                        .map(|(a, e)| a * e)
                        .sum::<f64>()
            })
            .collect();
        phi.push(
            history_term(theta, &x, tree.order, density)
                + b.iter().zip(&eta_prime).map(|(b, e)| b * e).sum::<f64>(),
        );
        eta.push(stage);
    }
    phi
}

/// Order-0 residuals: every stage and the output reproduce a constant.
fn consistency_residuals(coeffs: &MethodCoefficients) -> Vec<f64> {
    coeffs
        .d
        .iter()
        .map(|row| row.iter().sum::<f64>() - 1.0)
        .chain(std::iter::once(coeffs.theta.iter().sum::<f64>() - 1.0))
        .collect()
}

/// Order conditions for a fixed order and mode, with the tree catalogue
/// generated once.
///
/// # Examples
///
/// ```
/// use rkopt_methods::analysis::{ConditionMode, OrderConditions};
/// use rkopt_methods::MethodCoefficients;
///
/// let midpoint = MethodCoefficients::butcher(
///     vec![vec![0.0, 0.0], vec![0.5, 0.0]],
///     vec![0.0, 1.0],
/// );
/// let conditions = OrderConditions::new(2, ConditionMode::Nonlinear);
/// let r = conditions.residuals(&midpoint);
/// assert!(r.iter().all(|v| v.abs() < 1e-15));
/// ```
#[derive(Debug, Clone)]
pub struct OrderConditions {
    order: usize,
    mode: ConditionMode,
    trees: TreeCatalogue,
}

impl OrderConditions {
    /// Conditions up to `order`; trees of `order + 1` are kept for the
    /// error coefficients.
    pub fn new(order: usize, mode: ConditionMode) -> Self {
        Self {
            order,
            mode,
            trees: TreeCatalogue::new(order + 1),
        }
    }

    /// Target order.
    pub fn order(&self) -> usize {
        self.order
    }

    /// Tree selection.
    pub fn mode(&self) -> ConditionMode {
        self.mode
    }

    /// Number of residuals for a method with `stages` stages.
    pub fn count(&self, stages: usize) -> usize {
        let trees = match self.mode {
            ConditionMode::Nonlinear => self.trees.ids_of_order(self.order).end,
            ConditionMode::Linear => self.order,
        };
        stages + 1 + trees
    }

    /// Order-0 residuals followed by `Φ(t) - 1/γ(t)`.
    pub fn residuals(&self, coeffs: &MethodCoefficients) -> Vec<f64> {
        let phi = elementary_weights(coeffs, &self.trees, &coeffs.b, &coeffs.theta);
        let mut out = consistency_residuals(coeffs);
        match self.mode {
            ConditionMode::Nonlinear => {
                for id in 0..self.trees.ids_of_order(self.order).end {
                    out.push(phi[id] - 1.0 / self.trees.tree(id).density as f64);
                }
            }
            ConditionMode::Linear => {
                for q in 1..=self.order {
                    if let Some(id) = self.trees.tall(q) {
                        out.push(phi[id] - 1.0 / self.trees.tree(id).density as f64);
                    }
                }
            }
        }
        out
    }

    /// `(Φ(t) - 1/γ(t)) / σ(t)` over trees of order `p + 1`.
    pub fn error_coefficients(&self, coeffs: &MethodCoefficients) -> Vec<f64> {
        let phi = elementary_weights(coeffs, &self.trees, &coeffs.b, &coeffs.theta);
        self.trees
            .ids_of_order(self.order + 1)
            .map(|id| {
                let tree = self.trees.tree(id);
                (phi[id] - 1.0 / tree.density as f64) / tree.symmetry as f64
            })
            .collect()
    }

    /// Euclidean norm of [`error_coefficients`](Self::error_coefficients).
    pub fn error_norm(&self, coeffs: &MethodCoefficients) -> f64 {
        self.error_coefficients(coeffs)
            .iter()
            .map(|v| v * v)
            .sum::<f64>()
            .sqrt()
    }
}

/// Order-condition residuals of `coeffs` for order `p`.
pub fn order_conditions(coeffs: &MethodCoefficients, p: usize, mode: ConditionMode) -> Vec<f64> {
    OrderConditions::new(p, mode).residuals(coeffs)
}

/// Largest order `q ≤ 10` whose conditions all hold within `tol`.
///
/// Returns 0 for an inconsistent method.
pub fn check_order(coeffs: &MethodCoefficients, tol: f64) -> usize {
    check_order_with(coeffs, ConditionMode::Nonlinear, tol)
}

/// Largest order `q ≤ 10` whose `mode` conditions all hold within `tol`.
///
/// In [`ConditionMode::Linear`] only the tall tree of each order is
/// checked, so the result is the linear order of the method.
pub fn check_order_with(coeffs: &MethodCoefficients, mode: ConditionMode, tol: f64) -> usize {
    if consistency_residuals(coeffs).iter().any(|r| !(r.abs() <= tol)) {
        return 0;
    }
    let trees = TreeCatalogue::new(MAX_ORDER);
    let phi = elementary_weights(coeffs, &trees, &coeffs.b, &coeffs.theta);
    let holds = |id: usize| (phi[id] - 1.0 / trees.tree(id).density as f64).abs() <= tol;
    for q in 1..=MAX_ORDER {
        let satisfied = match mode {
            ConditionMode::Nonlinear => trees.ids_of_order(q).all(|id| holds(id)),
            ConditionMode::Linear => trees.tall(q).map_or(false, |id| holds(id)),
        };
        if !satisfied {
            return q - 1;
        }
    }
    MAX_ORDER
}

/// Error coefficients of order `p + 1`.
pub fn error_coefficients(coeffs: &MethodCoefficients, p: usize) -> Vec<f64> {
    OrderConditions::new(p, ConditionMode::Nonlinear).error_coefficients(coeffs)
}

/// Leading truncation-error coefficient: the norm of [`error_coefficients`].
pub fn error_coefficient(coeffs: &MethodCoefficients, p: usize) -> f64 {
    OrderConditions::new(p, ConditionMode::Nonlinear).error_norm(coeffs)
}

/// `Φ` of the tall tree of order `j` for the chosen weights; the
/// coefficient of `z^j` in the stability polynomial.
///
/// For single-step methods this is `bᵀ A^{j-1} 1`.
pub fn tall_tree_coefficient(
    coeffs: &MethodCoefficients,
    j: usize,
    weights: Weights,
) -> Result<f64, MethodError> {
    if j == 0 {
        return Err(MethodError::Unsupported(
            "tall-tree coefficients start at order 1".to_string(),
        ));
    }
    let (b, theta) = output_weights(coeffs, weights)?;
    let x = coeffs.history_nodes();
    let mut factorial = 1.0;
    // η'(tall_q) = η(tall_{q-1}); η'(τ) = 1
    let mut eta_prime = vec![1.0; coeffs.stages()];
    for q in 1..j {
        factorial *= q as f64;
        eta_prime = coeffs
            .d
            .iter()
            .zip(&coeffs.a)
            .map(|(d_row, a_row)| {
                history_term(d_row, &x, q, factorial)
                    + a_row.iter().zip(&eta_prime).map(|(a, e)| a * e).sum::<f64>()
            })
            .collect();
    }
    factorial *= j as f64;
    Ok(history_term(theta, &x, j, factorial)
        + b.iter().zip(&eta_prime).map(|(b, e)| b * e).sum::<f64>())
}
