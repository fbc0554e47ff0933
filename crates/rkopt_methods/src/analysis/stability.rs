//! Linear stability functions.
//!
//! Applied to `y' = λy` with all history values equal, a method gives
//! `u_{n+1} = R(z) u_n` with
//! `R(z) = Σ θ + z wᵀ (I - zA)^{-1} D 1` for output weights `(w, θ)`.

use num_complex::Complex64;
use num_traits::Zero;
use rkopt_core::math::linalg;

use super::order::{output_weights, Weights};
use crate::coefficients::MethodCoefficients;
use crate::error::MethodError;

/// Stability function `R(z)` for the chosen output weights.
///
/// `(I - zA) y = D 1` is solved as the real block system
/// `[[I - xA, yA], [-yA, I - xA]]`.
///
/// # Examples
///
/// ```
/// use num_complex::Complex64;
/// use rkopt_methods::analysis::{stability_function, Weights};
/// use rkopt_methods::MethodCoefficients;
///
/// let euler = MethodCoefficients::butcher(vec![vec![0.0]], vec![1.0]);
/// let r = stability_function(&euler, Weights::Primary, Complex64::new(-1.0, 1.0)).unwrap();
/// assert!((r - Complex64::new(0.0, 1.0)).norm() < 1e-15);
/// ```
pub fn stability_function(
    coeffs: &MethodCoefficients,
    weights: Weights,
    z: Complex64,
) -> Result<Complex64, MethodError> {
    let (w, theta) = output_weights(coeffs, weights)?;
    let s = coeffs.stages();
    let rhs: Vec<f64> = coeffs.d.iter().map(|row| row.iter().sum()).collect();

    let mut block = linalg::zeros(2 * s, 2 * s);
    for i in 0..s {
        block[i][i] = 1.0;
        block[s + i][s + i] = 1.0;
        for j in 0..s {
            let a = coeffs.a[i][j];
            block[i][j] -= z.re * a;
            block[i][s + j] = z.im * a;
            block[s + i][j] = -z.im * a;
            block[s + i][s + j] -= z.re * a;
        }
    }
    let mut full_rhs = rhs;
    full_rhs.resize(2 * s, 0.0);
    let y = linalg::solve(&block, &full_rhs)?;

    let mut weighted = Complex64::zero();
    for (j, w) in w.iter().enumerate() {
        weighted += Complex64::new(w * y[j], w * y[s + j]);
    }
    Ok(Complex64::new(theta.iter().sum(), 0.0) + z * weighted)
}

/// `|R̂(z)|` of the embedded method.
pub fn embedded_stability_modulus(
    coeffs: &MethodCoefficients,
    z: Complex64,
) -> Result<f64, MethodError> {
    Ok(stability_function(coeffs, Weights::Embedded, z)?.norm())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coefficients::EmbeddedWeights;
    use approx::assert_relative_eq;

    #[test]
    fn test_rk4_stability_polynomial() {
        let rk4 = MethodCoefficients::butcher(
            vec![
                vec![0.0, 0.0, 0.0, 0.0],
                vec![0.5, 0.0, 0.0, 0.0],
                vec![0.0, 0.5, 0.0, 0.0],
                vec![0.0, 0.0, 1.0, 0.0],
            ],
            vec![1.0 / 6.0, 1.0 / 3.0, 1.0 / 3.0, 1.0 / 6.0],
        );
        let z = Complex64::new(-0.7, 0.4);
        let expected = Complex64::new(1.0, 0.0) + z + z * z / 2.0 + z * z * z / 6.0
            + z * z * z * z / 24.0;
        let r = stability_function(&rk4, Weights::Primary, z).unwrap();
        assert_relative_eq!(r.re, expected.re, epsilon = 1e-14);
        assert_relative_eq!(r.im, expected.im, epsilon = 1e-14);
    }

    #[test]
    fn test_implicit_euler() {
        let coeffs = MethodCoefficients::butcher(vec![vec![1.0]], vec![1.0]);
        let z = Complex64::new(-2.0, 3.0);
        let r = stability_function(&coeffs, Weights::Primary, z).unwrap();
        let expected = Complex64::new(1.0, 0.0) / (Complex64::new(1.0, 0.0) - z);
        assert_relative_eq!((r - expected).norm(), 0.0, epsilon = 1e-14);
    }

    #[test]
    fn test_embedded_modulus() {
        let mut coeffs =
            MethodCoefficients::butcher(vec![vec![0.0, 0.0], vec![1.0, 0.0]], vec![0.5, 0.5]);
        assert!(matches!(
            embedded_stability_modulus(&coeffs, Complex64::new(-1.0, 0.0)),
            Err(MethodError::MissingEmbedded)
        ));
        coeffs.embedded = Some(EmbeddedWeights {
            bhat: vec![1.0, 0.0],
            theta_hat: vec![1.0],
        });
        // forward Euler inside the pair: |1 + z|
        let m = embedded_stability_modulus(&coeffs, Complex64::new(-1.5, 0.0)).unwrap();
        assert_relative_eq!(m, 0.5, epsilon = 1e-15);
    }
}
