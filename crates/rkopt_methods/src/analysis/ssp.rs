//! Strong-stability-preserving analysis: Spijker form, absolute
//! monotonicity, the radius of absolute monotonicity and the optimal
//! Shu-Osher form.

use rkopt_core::math::linalg::{self, LuDecomposition};
use rkopt_core::types::LinalgError;

use crate::coefficients::MethodCoefficients;
use crate::error::MethodError;

/// Entries above `-AM_TOLERANCE · r` count as non-negative.
pub const AM_TOLERANCE: f64 = 1e-14;

/// Radii beyond this are reported as unbounded.
pub const RADIUS_CAP: f64 = 1e3;

/// Bisection width of [`am_radius`].
const BISECTION_TOLERANCE: f64 = 1e-13;

/// Method written as `w = S u_hist + h T F(w)` over `w = (Y_1..Y_s, u_{n+1})`.
#[derive(Debug, Clone, PartialEq)]
pub struct SpijkerForm {
    /// `[[A, 0], [bᵀ, 0]]`, size `(s+1)×(s+1)`.
    pub t: Vec<Vec<f64>>,
    /// `[[D], [θᵀ]]`, size `(s+1)×k`.
    pub s: Vec<Vec<f64>>,
}

/// Spijker form of a method.
pub fn spijker_form(coeffs: &MethodCoefficients) -> SpijkerForm {
    let n = coeffs.stages() + 1;
    let mut t = linalg::zeros(n, n);
    for (row, a_row) in t.iter_mut().zip(&coeffs.a) {
        row[..a_row.len()].copy_from_slice(a_row);
    }
    t[n - 1][..coeffs.b.len()].copy_from_slice(&coeffs.b);

    let mut s: Vec<Vec<f64>> = coeffs.d.clone();
    s.push(coeffs.theta.clone());
    SpijkerForm { t, s }
}

/// `(I + rT)^{-1} S` and `r (I + rT)^{-1} T`.
fn am_matrices(form: &SpijkerForm, r: f64) -> Result<(Vec<Vec<f64>>, Vec<Vec<f64>>), LinalgError> {
    let n = form.t.len();
    let mut m = linalg::identity(n);
    for (m_row, t_row) in m.iter_mut().zip(&form.t) {
        for (m, t) in m_row.iter_mut().zip(t_row) {
            *m += r * t;
        }
    }
    let lu = LuDecomposition::new(&m)?;
    let p = lu.solve_matrix(&form.s)?;
    let mut q = lu.solve_matrix(&form.t)?;
    for v in q.iter_mut().flatten() {
        *v *= r;
    }
    Ok((p, q))
}

/// Negated entries of `(I + rT)^{-1}S` and `r(I + rT)^{-1}T`: all `≤ 0`
/// exactly when the method is absolutely monotonic at `r`.
///
/// A singular `I + rT` yields a vector of ones (violated everywhere).
pub fn absolute_monotonicity_residuals(coeffs: &MethodCoefficients, r: f64) -> Vec<f64> {
    let form = spijker_form(coeffs);
    let n = form.t.len();
    let len = n * (coeffs.steps() + n);
    match am_matrices(&form, r) {
        Ok((p, q)) => p.iter().chain(&q).flatten().map(|v| -v).collect(),
        Err(_) => vec![1.0; len],
    }
}

fn is_absolutely_monotonic(form: &SpijkerForm, r: f64) -> bool {
    match am_matrices(form, r) {
        Ok((p, q)) => p
            .iter()
            .chain(&q)
            .flatten()
            .all(|&v| v >= -AM_TOLERANCE * r),
        Err(_) => false,
    }
}

/// Radius of absolute monotonicity (the SSP coefficient).
///
/// Returns 0 when `T` or `S` has a negative entry and `f64::INFINITY`
/// when the method stays absolutely monotonic beyond [`RADIUS_CAP`].
///
/// # Examples
///
/// ```
/// use rkopt_methods::analysis::am_radius;
/// use rkopt_methods::MethodCoefficients;
///
/// let euler = MethodCoefficients::butcher(vec![vec![0.0]], vec![1.0]);
/// assert!((am_radius(&euler) - 1.0).abs() < 1e-12);
/// ```
pub fn am_radius(coeffs: &MethodCoefficients) -> f64 {
    let form = spijker_form(coeffs);
    let negative = form
        .t
        .iter()
        .chain(&form.s)
        .flatten()
        .any(|&v| v < -AM_TOLERANCE);
    if negative {
        return 0.0;
    }

    let mut hi = 1.0;
    while is_absolutely_monotonic(&form, hi) {
        hi *= 2.0;
        if hi > RADIUS_CAP {
            return f64::INFINITY;
        }
    }
    let mut lo = if hi > 1.0 { hi / 2.0 } else { 0.0 };
    while hi - lo > BISECTION_TOLERANCE {
        let mid = 0.5 * (lo + hi);
        if is_absolutely_monotonic(&form, mid) {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    lo
}

/// Shu-Osher form `w = v u_n + Σ (α w + h β F(w))` with the largest
/// admissible step ratio.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ShuOsherForm {
    /// Convex-combination coefficients, `(s+1)×(s+1)`.
    pub alpha: Vec<Vec<f64>>,
    /// Step coefficients, `(s+1)×(s+1)`.
    pub beta: Vec<Vec<f64>>,
    /// Weights of `u_n`, length `s + 1`.
    pub v: Vec<f64>,
    /// Radius the form was built for.
    pub radius: f64,
}

/// Optimal Shu-Osher form of a single-step method at radius `r`:
/// `β = (I + rK)^{-1}K`, `α = rβ`, `v = (I + rK)^{-1}1` with `K = T`.
pub fn optimal_shu_osher_form(
    coeffs: &MethodCoefficients,
    r: f64,
) -> Result<ShuOsherForm, MethodError> {
    if !coeffs.is_single_step() {
        return Err(MethodError::Unsupported(
            "Shu-Osher form of a multistep method".to_string(),
        ));
    }
    if !r.is_finite() || r < 0.0 {
        return Err(MethodError::Unsupported(format!(
            "Shu-Osher form at radius {}",
            r
        )));
    }
    let form = spijker_form(coeffs);
    let n = form.t.len();
    let mut m = linalg::identity(n);
    for (m_row, k_row) in m.iter_mut().zip(&form.t) {
        for (m, k) in m_row.iter_mut().zip(k_row) {
            *m += r * k;
        }
    }
    let lu = LuDecomposition::new(&m)?;
    let beta = lu.solve_matrix(&form.t)?;
    let alpha = beta
        .iter()
        .map(|row| row.iter().map(|b| r * b).collect())
        .collect();
    let v = lu.solve(&vec![1.0; n])?;
    Ok(ShuOsherForm {
        alpha,
        beta,
        v,
        radius: r,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ssprk33() -> MethodCoefficients {
        MethodCoefficients::butcher(
            vec![
                vec![0.0, 0.0, 0.0],
                vec![1.0, 0.0, 0.0],
                vec![0.25, 0.25, 0.0],
            ],
            vec![1.0 / 6.0, 1.0 / 6.0, 2.0 / 3.0],
        )
    }

    #[test]
    fn test_spijker_form_layout() {
        let form = spijker_form(&ssprk33());
        assert_eq!(form.t.len(), 4);
        assert_eq!(form.t[3][2], 2.0 / 3.0);
        assert_eq!(form.t[3][3], 0.0);
        assert_eq!(form.s, vec![vec![1.0]; 4]);
    }

    #[test]
    fn test_ssprk33_radius() {
        assert_relative_eq!(am_radius(&ssprk33()), 1.0, epsilon = 1e-10);
    }

    #[test]
    fn test_negative_coefficient_gives_zero_radius() {
        let coeffs = MethodCoefficients::butcher(
            vec![vec![0.0, 0.0], vec![-0.5, 0.0]],
            vec![0.5, 0.5],
        );
        assert_eq!(am_radius(&coeffs), 0.0);
    }

    #[test]
    fn test_implicit_euler_radius_unbounded() {
        let coeffs = MethodCoefficients::butcher(vec![vec![1.0]], vec![1.0]);
        assert!(am_radius(&coeffs).is_infinite());
    }

    #[test]
    fn test_residuals_sign_at_radius() {
        let inside = absolute_monotonicity_residuals(&ssprk33(), 0.9);
        assert!(inside.iter().all(|&v| v <= 1e-15));
        let outside = absolute_monotonicity_residuals(&ssprk33(), 1.1);
        assert!(outside.iter().any(|&v| v > 1e-3));
        assert_eq!(inside.len(), 4 * (1 + 4));
    }

    #[test]
    fn test_shu_osher_identities() {
        let coeffs = ssprk33();
        let form = optimal_shu_osher_form(&coeffs, 1.0).unwrap();
        let t = spijker_form(&coeffs).t;
        let n = t.len();
        // (I - α) K = β and (I - α) 1 = v
        let mut i_minus_alpha = linalg::identity(n);
        for (row, a_row) in i_minus_alpha.iter_mut().zip(&form.alpha) {
            for (m, a) in row.iter_mut().zip(a_row) {
                *m -= a;
            }
        }
        let lhs = linalg::mat_mul(&i_minus_alpha, &t).unwrap();
        for (l_row, b_row) in lhs.iter().zip(&form.beta) {
            for (l, b) in l_row.iter().zip(b_row) {
                assert_relative_eq!(*l, *b, epsilon = 1e-14);
            }
        }
        let ones = linalg::mat_vec(&i_minus_alpha, &vec![1.0; n]);
        for (o, v) in ones.iter().zip(&form.v) {
            assert_relative_eq!(*o, *v, epsilon = 1e-14);
        }
        // SSPRK(3,3): final stage is 1/3 u_n + 2/3 (Y_3 + h F(Y_3))
        assert_relative_eq!(form.alpha[3][2], 2.0 / 3.0, epsilon = 1e-14);
        assert_relative_eq!(form.v[3], 1.0 / 3.0, epsilon = 1e-14);
    }

    #[test]
    fn test_shu_osher_rejects_multistep() {
        let leapfrog = MethodCoefficients::multistep(
            vec![vec![0.0]],
            vec![2.0],
            vec![vec![0.0, 1.0]],
            vec![1.0, 0.0],
        );
        assert!(matches!(
            optimal_shu_osher_form(&leapfrog, 1.0),
            Err(MethodError::Unsupported(_))
        ));
    }
}
