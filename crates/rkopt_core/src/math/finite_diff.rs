//! Central finite-difference derivatives.
//!
//! The step for coordinate `j` is `h_j = step · max(1, |x_j|)`, which keeps
//! the truncation and rounding errors balanced for parameters of order one.

/// Default relative step for central differences (≈ ε^(1/3)).
pub const DEFAULT_STEP: f64 = 6.055e-6;

#[inline]
fn step_for(x: f64, step: f64) -> f64 {
    step * x.abs().max(1.0)
}

/// Gradient of a scalar function by central differences.
pub fn gradient<F>(f: F, x: &[f64], step: f64) -> Vec<f64>
where
    F: Fn(&[f64]) -> f64,
{
    let mut probe = x.to_vec();
    (0..x.len())
        .map(|j| {
            let h = step_for(x[j], step);
            probe[j] = x[j] + h;
            let fp = f(&probe);
            probe[j] = x[j] - h;
            let fm = f(&probe);
            probe[j] = x[j];
            (fp - fm) / (2.0 * h)
        })
        .collect()
}

/// Jacobian (`m × n`, row per residual) of a vector function by central
/// differences. `m` is taken from `f(x)`.
pub fn jacobian<F>(f: F, x: &[f64], step: f64) -> Vec<Vec<f64>>
where
    F: Fn(&[f64]) -> Vec<f64>,
{
    let n = x.len();
    let mut probe = x.to_vec();
    let mut columns = Vec::with_capacity(n);
    for j in 0..n {
        let h = step_for(x[j], step);
        probe[j] = x[j] + h;
        let fp = f(&probe);
        probe[j] = x[j] - h;
        let fm = f(&probe);
        probe[j] = x[j];
        columns.push(
            fp.iter()
                .zip(&fm)
                .map(|(a, b)| (a - b) / (2.0 * h))
                .collect::<Vec<f64>>(),
        );
    }
    let m = columns.first().map_or_else(|| f(x).len(), Vec::len);
    (0..m)
        .map(|i| columns.iter().map(|col| col[i]).collect())
        .collect()
}
