//! Structured coefficient sets.
//!
//! Every class decodes into the same general form
//!
//! ```text
//! Y_i     = Σ_l d_il u_{n-k+1+l} + h Σ_j a_ij F(Y_j)
//! u_{n+1} = Σ_l θ_l  u_{n-k+1+l} + h Σ_j b_j  F(Y_j)
//! ```
//!
//! which is what the order-condition and SSP routines consume. For a
//! single-step Butcher method `d` is a column of ones and `θ = [1]`.

use crate::descriptor::history_nodes;

/// Raw recurrence coefficients of a low-storage method.
///
/// `gamma*` and `beta` are indexed by recurrence step `i = 2..=s+1`
/// (position `i - 2`); `delta` holds `δ_1..δ_s` followed by the embedded
/// weights, with `δ_1 = 1`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LowStorageCoefficients {
    /// Weight of register S1.
    pub gamma1: Vec<f64>,
    /// Weight of register S2.
    pub gamma2: Vec<f64>,
    /// Weight of register S3 (3S* only; empty otherwise).
    pub gamma3: Vec<f64>,
    /// Weight of the derivative of the previous stage.
    pub beta: Vec<f64>,
    /// Accumulation weights (2S and 3S*; empty for 2S*).
    pub delta: Vec<f64>,
}

/// Embedded output weights sharing the primary stages.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EmbeddedWeights {
    /// Derivative weights `b̂`.
    pub bhat: Vec<f64>,
    /// History weights `θ̂`.
    pub theta_hat: Vec<f64>,
}

/// A decoded method.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MethodCoefficients {
    /// Stage coupling `A` (s × s).
    pub a: Vec<Vec<f64>>,
    /// Output weights `b`.
    pub b: Vec<f64>,
    /// Abscissae `c_i = Σ_l d_il x_l + Σ_j a_ij`.
    pub c: Vec<f64>,
    /// Step coupling `D` (s × k).
    pub d: Vec<Vec<f64>>,
    /// History weights `θ` (k).
    pub theta: Vec<f64>,
    /// Embedded pair, for classes that have one.
    pub embedded: Option<EmbeddedWeights>,
    /// Recurrence coefficients, for low-storage classes.
    pub low_storage: Option<LowStorageCoefficients>,
    /// Trailing SSP anchor (`-r`), for the `ssp` objective.
    pub ssp_anchor: Option<f64>,
}

impl MethodCoefficients {
    /// Single-step Butcher method with `c = A·1`.
    pub fn butcher(a: Vec<Vec<f64>>, b: Vec<f64>) -> Self {
        let s = b.len();
        Self::multistep(a, b, vec![vec![1.0]; s], vec![1.0])
    }

    /// General multistep form; abscissae are derived.
    pub fn multistep(a: Vec<Vec<f64>>, b: Vec<f64>, d: Vec<Vec<f64>>, theta: Vec<f64>) -> Self {
        let mut coeffs = Self {
            a,
            b,
            c: Vec::new(),
            d,
            theta,
            embedded: None,
            low_storage: None,
            ssp_anchor: None,
        };
        coeffs.c = coeffs.abscissae();
        coeffs
    }

    /// Number of stages.
    pub fn stages(&self) -> usize {
        self.b.len()
    }

    /// Number of steps.
    pub fn steps(&self) -> usize {
        self.theta.len()
    }

    /// History node offsets.
    pub fn history_nodes(&self) -> Vec<f64> {
        history_nodes(self.steps())
    }

    /// `c_i = Σ_l d_il x_l + Σ_j a_ij`.
    pub fn abscissae(&self) -> Vec<f64> {
        let x = self.history_nodes();
        self.a
            .iter()
            .zip(&self.d)
            .map(|(a_row, d_row)| {
                let hist: f64 = d_row.iter().zip(&x).map(|(d, x)| d * x).sum();
                hist + a_row.iter().sum::<f64>()
            })
            .collect()
    }

    /// Whether the method uses a single previous step.
    pub fn is_single_step(&self) -> bool {
        self.steps() == 1
    }

    /// SSP radius carried by the anchor (`-anchor`), if any.
    pub fn anchor_radius(&self) -> Option<f64> {
        self.ssp_anchor.map(|a| -a)
    }

    /// Attach an SSP anchor.
    pub fn with_anchor(mut self, anchor: f64) -> Self {
        self.ssp_anchor = Some(anchor);
        self
    }
}
