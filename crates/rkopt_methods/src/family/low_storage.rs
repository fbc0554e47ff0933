//! Low-storage classes.
//!
//! The recurrence (stage 1 is `u_n`; `i = 2..=s+1`):
//!
//! ```text
//! 2S:   S2 := S2 + δ_{i-1} S1
//!       S1 := γ1_i S1 + γ2_i S2 + β_i h F(S1)
//! 2S*:  as 2S with S2 := u_n held fixed
//! 3S*:  as 2S with an extra term γ3_i S3, S3 := u_n
//! ```
//!
//! Embedded solutions are `(S2 + δ_{s+1} S1 [+ δ_{s+2} S3]) / Σ δ`.
//! Decoding runs the recurrence on symbolic registers holding one
//! coefficient for `u_n` and one per stage derivative.

use rand::Rng;
use rkopt_core::types::{LinearConstraints, ParameterBounds};

use super::{check_length, MethodFamily};
use crate::class::LowStorageScheme;
use crate::coefficients::{EmbeddedWeights, LowStorageCoefficients, MethodCoefficients};
use crate::descriptor::MethodDescriptor;
use crate::error::MethodError;

/// A register as a linear combination of `u_n` and `h F(Y_j)`.
#[derive(Debug, Clone, PartialEq)]
struct Register {
    u: f64,
    f: Vec<f64>,
}

impl Register {
    fn zero(stages: usize) -> Self {
        Self {
            u: 0.0,
            f: vec![0.0; stages],
        }
    }

    fn solution(stages: usize) -> Self {
        Self {
            u: 1.0,
            f: vec![0.0; stages],
        }
    }

    fn axpy(&mut self, alpha: f64, other: &Register) {
        self.u += alpha * other.u;
        for (a, b) in self.f.iter_mut().zip(&other.f) {
            *a += alpha * b;
        }
    }

    fn scaled(&self, alpha: f64) -> Register {
        Register {
            u: alpha * self.u,
            f: self.f.iter().map(|v| alpha * v).collect(),
        }
    }
}

/// Codec and heuristics for `2S`, `2S*`, `3S*` and their embedded variants.
#[derive(Debug, Clone, PartialEq)]
pub struct LowStorageFamily {
    descriptor: MethodDescriptor,
    scheme: LowStorageScheme,
    embedded: bool,
}

impl LowStorageFamily {
    /// Create the family for a descriptor of a low-storage class.
    ///
    /// Non-low-storage descriptors fall back to the 2S* layout; callers
    /// obtain families through [`MethodDescriptor::family`], which never
    /// does that.
    pub fn new(descriptor: MethodDescriptor) -> Self {
        let class = descriptor.class();
        Self {
            descriptor,
            scheme: class
                .low_storage_scheme()
                .unwrap_or(LowStorageScheme::TwoSStar),
            embedded: class.has_embedded(),
        }
    }

    /// Register layout.
    pub fn scheme(&self) -> LowStorageScheme {
        self.scheme
    }

    fn stages(&self) -> usize {
        self.descriptor.stages()
    }

    fn has_gamma3(&self) -> bool {
        self.scheme == LowStorageScheme::ThreeSStar
    }

    /// Number of embedded `δ` weights beyond `δ_s`.
    fn embedded_deltas(&self) -> usize {
        match (self.embedded, self.scheme) {
            (false, _) => 0,
            (true, LowStorageScheme::ThreeSStar) => 2,
            (true, _) => 1,
        }
    }

    /// Free `δ` entries (`δ_1 = 1` is fixed).
    fn free_deltas(&self) -> usize {
        match self.scheme {
            LowStorageScheme::TwoSStar => 0,
            _ => self.stages() - 1 + self.embedded_deltas(),
        }
    }

    fn gamma_blocks(&self) -> usize {
        if self.has_gamma3() {
            3
        } else {
            2
        }
    }

    fn anchor_len(&self) -> usize {
        usize::from(self.descriptor.objective().has_anchor())
    }

    /// Run the recurrence symbolically.
    fn expand(&self, ls: &LowStorageCoefficients) -> MethodCoefficients {
        let s = self.stages();
        let held = Register::solution(s);
        let mut s1 = Register::solution(s);
        let mut s2 = match self.scheme {
            LowStorageScheme::TwoSStar => Register::solution(s),
            _ => Register::zero(s),
        };

        let mut a = vec![vec![0.0; s]; s];
        let mut d = vec![vec![1.0]; s];

        for step in 0..s {
            if self.scheme != LowStorageScheme::TwoSStar {
                s2.axpy(ls.delta[step], &s1);
            }
            let mut next = s1.scaled(ls.gamma1[step]);
            next.axpy(ls.gamma2[step], &s2);
            if self.has_gamma3() {
                next.axpy(ls.gamma3[step], &held);
            }
            next.f[step] += ls.beta[step];
            s1 = next;
            if step + 1 < s {
                a[step + 1].clone_from(&s1.f);
                d[step + 1] = vec![s1.u];
            }
        }

        let mut coeffs = MethodCoefficients::multistep(a, s1.f.clone(), d, vec![s1.u]);

        if self.embedded {
            let mut hat = s2.clone();
            hat.axpy(ls.delta[s], &s1);
            if self.scheme == LowStorageScheme::ThreeSStar {
                hat.axpy(ls.delta[s + 1], &held);
            }
            let total: f64 = ls.delta.iter().sum();
            let hat = hat.scaled(1.0 / total);
            coeffs.embedded = Some(EmbeddedWeights {
                bhat: hat.f,
                theta_hat: vec![hat.u],
            });
        }
        coeffs
    }

    fn from_vector(&self, x: &[f64]) -> LowStorageCoefficients {
        let s = self.stages();
        let mut offset = 0;
        let mut take = |n: usize| {
            let out = x[offset..offset + n].to_vec();
            offset += n;
            out
        };
        let gamma1 = take(s);
        let gamma2 = take(s);
        let gamma3 = if self.has_gamma3() { take(s) } else { Vec::new() };
        let beta = take(s);
        let delta = match self.scheme {
            LowStorageScheme::TwoSStar => Vec::new(),
            _ => {
                let mut delta = vec![1.0];
                delta.extend(take(self.free_deltas()));
                delta
            }
        };
        LowStorageCoefficients {
            gamma1,
            gamma2,
            gamma3,
            beta,
            delta,
        }
    }
}

impl MethodFamily for LowStorageFamily {
    fn descriptor(&self) -> &MethodDescriptor {
        &self.descriptor
    }

    fn parameter_count(&self) -> usize {
        let s = self.stages();
        (self.gamma_blocks() + 1) * s + self.free_deltas() + self.anchor_len()
    }

    fn decode(&self, x: &[f64]) -> Result<MethodCoefficients, MethodError> {
        check_length(x, self.parameter_count())?;
        let ls = self.from_vector(x);
        let mut coeffs = self.expand(&ls);
        coeffs.low_storage = Some(ls);
        if self.anchor_len() == 1 {
            coeffs.ssp_anchor = x.last().copied();
        }
        Ok(coeffs)
    }

    fn encode(&self, coeffs: &MethodCoefficients) -> Result<Vec<f64>, MethodError> {
        let s = self.stages();
        let ls = coeffs
            .low_storage
            .as_ref()
            .ok_or_else(|| MethodError::structure("missing low-storage coefficients"))?;
        let gamma3_len = if self.has_gamma3() { s } else { 0 };
        let delta_len = match self.scheme {
            LowStorageScheme::TwoSStar => 0,
            _ => 1 + self.free_deltas(),
        };
        if ls.gamma1.len() != s
            || ls.gamma2.len() != s
            || ls.beta.len() != s
            || ls.gamma3.len() != gamma3_len
            || ls.delta.len() != delta_len
        {
            return Err(MethodError::structure(format!(
                "recurrence coefficients do not fit {} with {} stages",
                self.descriptor.class(),
                s
            )));
        }
        if delta_len > 0 && ls.delta[0] != 1.0 {
            return Err(MethodError::structure("delta_1 must equal 1"));
        }

        let mut x = Vec::with_capacity(self.parameter_count());
        x.extend_from_slice(&ls.gamma1);
        x.extend_from_slice(&ls.gamma2);
        x.extend_from_slice(&ls.gamma3);
        x.extend_from_slice(&ls.beta);
        if delta_len > 0 {
            x.extend_from_slice(&ls.delta[1..]);
        }
        if self.anchor_len() == 1 {
            let anchor = coeffs
                .ssp_anchor
                .ok_or_else(|| MethodError::structure("ssp objective needs an anchor"))?;
            x.push(anchor);
        }
        Ok(x)
    }

    fn linear_constraints(&self) -> Result<LinearConstraints, MethodError> {
        let s = self.stages();
        let n = self.parameter_count();
        let mut lc = LinearConstraints::unconstrained(n);
        if self.scheme == LowStorageScheme::TwoSStar {
            for i in 0..s {
                let mut row = vec![0.0; n];
                row[i] = 1.0;
                row[s + i] = 1.0;
                lc.push_equality(row, 1.0)?;
            }
        }
        if self.anchor_len() == 1 {
            lc.set_bounds(n - 1, ParameterBounds::non_positive());
        }
        Ok(lc)
    }

    fn random_guess<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<f64> {
        let s = self.stages();
        let mut x = Vec::with_capacity(self.parameter_count());
        let gamma1: Vec<f64> = (0..s).map(|_| 1.0 + rng.gen_range(-0.5..0.5)).collect();
        let gamma2: Vec<f64> = match self.scheme {
            LowStorageScheme::TwoSStar => gamma1.iter().map(|g| 1.0 - g).collect(),
            _ => (0..s).map(|_| rng.gen_range(-0.5..0.5)).collect(),
        };
        x.extend(gamma1);
        x.extend(gamma2);
        if self.has_gamma3() {
            x.extend((0..s).map(|_| rng.gen_range(-0.5..0.5)));
        }
        x.extend((0..s).map(|_| rng.gen_range(0.0..1.0) / s as f64));
        let regular = self.free_deltas() - self.embedded_deltas();
        x.extend((0..regular).map(|_| rng.gen_range(-0.5..0.5)));
        x.extend((0..self.embedded_deltas()).map(|_| rng.gen_range(0.0..1.0)));
        if self.anchor_len() == 1 {
            x.push(-0.01);
        }
        x
    }

    /// The `s`-stage second-order SSP method written in this recurrence.
    fn smart_guess(&self) -> Vec<f64> {
        let s = self.stages();
        let sf = s as f64;
        let last = s - 1;
        let mut x = Vec::with_capacity(self.parameter_count());
        x.extend((0..s).map(|i| if i == last { (sf - 1.0) / sf } else { 1.0 }));
        x.extend((0..s).map(|i| if i == last { 1.0 / sf } else { 0.0 }));
        if self.has_gamma3() {
            x.extend(std::iter::repeat(0.0).take(s));
        }
        x.extend((0..s).map(|i| if i == last { 1.0 / sf } else { 1.0 / (sf - 1.0) }));
        let regular = self.free_deltas() - self.embedded_deltas();
        x.extend(std::iter::repeat(0.0).take(regular));
        if self.embedded_deltas() > 0 {
            x.push(1.0);
            x.extend(std::iter::repeat(0.0).take(self.embedded_deltas() - 1));
        }
        if self.anchor_len() == 1 {
            x.push(-(sf - 1.0));
        }
        x
    }
}
