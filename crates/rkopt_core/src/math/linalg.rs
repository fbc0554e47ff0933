//! Small dense linear algebra on row-major `Vec<Vec<f64>>` matrices.
//!
//! The matrices appearing in method analysis are at most a few dozen rows,
//! so everything here is a straightforward O(n³) routine with partial
//! pivoting. No external BLAS is involved.

use crate::types::LinalgError;

/// `n × n` identity.
pub fn identity(n: usize) -> Vec<Vec<f64>> {
    (0..n)
        .map(|i| (0..n).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
        .collect()
}

/// `rows × cols` zero matrix.
pub fn zeros(rows: usize, cols: usize) -> Vec<Vec<f64>> {
    vec![vec![0.0; cols]; rows]
}

/// Dot product over the common length.
#[inline]
pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Euclidean norm.
#[inline]
pub fn norm2(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

/// Maximum absolute entry (0 for an empty vector).
#[inline]
pub fn norm_inf(v: &[f64]) -> f64 {
    v.iter().fold(0.0_f64, |m, x| m.max(x.abs()))
}

/// `A x`.
pub fn mat_vec(a: &[Vec<f64>], x: &[f64]) -> Vec<f64> {
    a.iter().map(|row| dot(row, x)).collect()
}

/// `Aᵀ x`.
pub fn mat_t_vec(a: &[Vec<f64>], x: &[f64]) -> Vec<f64> {
    let cols = a.first().map_or(0, Vec::len);
    let mut out = vec![0.0; cols];
    for (row, &xi) in a.iter().zip(x) {
        if xi == 0.0 {
            continue;
        }
        for (o, &aij) in out.iter_mut().zip(row) {
            *o += aij * xi;
        }
    }
    out
}

/// `A B`.
pub fn mat_mul(a: &[Vec<f64>], b: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, LinalgError> {
    let inner = b.len();
    let cols = b.first().map_or(0, Vec::len);
    if a.iter().any(|row| row.len() != inner) {
        return Err(LinalgError::ShapeMismatch(format!(
            "left operand columns differ from right operand rows ({})",
            inner
        )));
    }
    Ok(a.iter()
        .map(|row| {
            let mut out = vec![0.0; cols];
            for (&aik, bk) in row.iter().zip(b) {
                if aik == 0.0 {
                    continue;
                }
                for (o, &bkj) in out.iter_mut().zip(bk) {
                    *o += aik * bkj;
                }
            }
            out
        })
        .collect())
}

/// `Aᵀ`.
pub fn transpose(a: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let cols = a.first().map_or(0, Vec::len);
    (0..cols)
        .map(|j| a.iter().map(|row| row[j]).collect())
        .collect()
}

/// LU factorisation `P A = L U` with partial pivoting.
///
/// # Example
///
/// ```
/// use rkopt_core::math::linalg::LuDecomposition;
///
/// let a = vec![vec![2.0, 1.0], vec![4.0, 3.0]];
/// let lu = LuDecomposition::new(&a).unwrap();
/// let x = lu.solve(&[3.0, 7.0]).unwrap();
/// assert!((x[0] - 1.0).abs() < 1e-12);
/// assert!((x[1] - 1.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone)]
pub struct LuDecomposition {
    lu: Vec<Vec<f64>>,
    perm: Vec<usize>,
}

impl LuDecomposition {
    /// Factorise a square matrix.
    pub fn new(a: &[Vec<f64>]) -> Result<Self, LinalgError> {
        let n = a.len();
        if a.iter().any(|row| row.len() != n) {
            return Err(LinalgError::ShapeMismatch(format!(
                "LU needs a square matrix, got {} rows",
                n
            )));
        }
        let scale = a
            .iter()
            .flat_map(|row| row.iter())
            .fold(0.0_f64, |m, x| m.max(x.abs()));
        let threshold = f64::EPSILON * scale.max(f64::MIN_POSITIVE);

        let mut lu = a.to_vec();
        let mut perm: Vec<usize> = (0..n).collect();

        for k in 0..n {
            let (pivot_row, pivot) = (k..n)
                .map(|i| (i, lu[i][k].abs()))
                .fold((k, -1.0), |best, cand| if cand.1 > best.1 { cand } else { best });
            if pivot <= threshold {
                return Err(LinalgError::SingularMatrix { column: k, pivot });
            }
            if pivot_row != k {
                lu.swap(pivot_row, k);
                perm.swap(pivot_row, k);
            }
            for i in (k + 1)..n {
                let factor = lu[i][k] / lu[k][k];
                lu[i][k] = factor;
                if factor == 0.0 {
                    continue;
                }
                for j in (k + 1)..n {
                    lu[i][j] -= factor * lu[k][j];
                }
            }
        }

        Ok(Self { lu, perm })
    }

    /// Dimension of the factorised matrix.
    pub fn dimension(&self) -> usize {
        self.lu.len()
    }

    /// Solve `A x = b`.
    pub fn solve(&self, b: &[f64]) -> Result<Vec<f64>, LinalgError> {
        let n = self.lu.len();
        if b.len() != n {
            return Err(LinalgError::ShapeMismatch(format!(
                "right-hand side has length {}, expected {}",
                b.len(),
                n
            )));
        }
        let mut y: Vec<f64> = self.perm.iter().map(|&p| b[p]).collect();
        for i in 0..n {
            let s: f64 = (0..i).map(|j| self.lu[i][j] * y[j]).sum();
            y[i] -= s;
        }
        for i in (0..n).rev() {
            let s: f64 = ((i + 1)..n).map(|j| self.lu[i][j] * y[j]).sum();
            y[i] = (y[i] - s) / self.lu[i][i];
        }
        Ok(y)
    }

    /// Solve `A X = B` column by column.
    pub fn solve_matrix(&self, b: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, LinalgError> {
        let columns: Vec<Vec<f64>> = transpose(b)
            .iter()
            .map(|col| self.solve(col))
            .collect::<Result<_, _>>()?;
        Ok(transpose(&columns))
    }
}

/// Solve `A x = b` for square `A`.
pub fn solve(a: &[Vec<f64>], b: &[f64]) -> Result<Vec<f64>, LinalgError> {
    LuDecomposition::new(a)?.solve(b)
}

/// Solve `A X = B` for square `A` and `n × m` right-hand side.
pub fn solve_matrix(a: &[Vec<f64>], b: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, LinalgError> {
    if b.len() != a.len() {
        return Err(LinalgError::ShapeMismatch(format!(
            "right-hand side has {} rows, expected {}",
            b.len(),
            a.len()
        )));
    }
    LuDecomposition::new(a)?.solve_matrix(b)
}

/// Minimum-norm correction `δ` with `C δ = r`, via `δ = Cᵀ (C Cᵀ)⁻¹ r`.
///
/// Rows of `C` must be linearly independent.
pub fn min_norm_correction(c: &[Vec<f64>], r: &[f64]) -> Result<Vec<f64>, LinalgError> {
    if c.is_empty() {
        return Ok(Vec::new());
    }
    let cct = mat_mul(c, &transpose(c))?;
    let y = solve(&cct, r)?;
    Ok(mat_t_vec(c, &y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_identity_and_mat_vec() {
        let i3 = identity(3);
        assert_eq!(mat_vec(&i3, &[1.0, 2.0, 3.0]), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_mat_mul_shapes() {
        let a = vec![vec![1.0, 2.0, 3.0]];
        let b = vec![vec![1.0], vec![0.0], vec![-1.0]];
        let c = mat_mul(&a, &b).unwrap();
        assert_eq!(c, vec![vec![-2.0]]);
        assert!(mat_mul(&b, &b).is_err());
    }

    #[test]
    fn test_transpose_and_mat_t_vec() {
        let a = vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]];
        let at = transpose(&a);
        assert_eq!(at, vec![vec![1.0, 3.0, 5.0], vec![2.0, 4.0, 6.0]]);
        assert_eq!(mat_t_vec(&a, &[1.0, 1.0, 1.0]), vec![9.0, 12.0]);
    }

    #[test]
    fn test_lu_requires_pivoting() {
        // Zero leading entry forces a row swap
        let a = vec![
            vec![0.0, 2.0, 1.0],
            vec![1.0, 1.0, 0.0],
            vec![3.0, 0.0, 1.0],
        ];
        let x_true = [1.0, -2.0, 0.5];
        let b = mat_vec(&a, &x_true);
        let x = solve(&a, &b).unwrap();
        for (xi, ti) in x.iter().zip(&x_true) {
            assert_relative_eq!(xi, ti, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_lu_singular() {
        let a = vec![vec![1.0, 2.0], vec![2.0, 4.0]];
        assert!(matches!(
            LuDecomposition::new(&a),
            Err(LinalgError::SingularMatrix { column: 1, .. })
        ));
    }

    #[test]
    fn test_solve_matrix_inverse() {
        let a = vec![vec![4.0, 1.0], vec![2.0, 3.0]];
        let inv = solve_matrix(&a, &identity(2)).unwrap();
        let prod = mat_mul(&a, &inv).unwrap();
        for i in 0..2 {
            for j in 0..2 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_relative_eq!(prod[i][j], expected, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_min_norm_correction() {
        // x + y = 2: minimum-norm solution is (1, 1)
        let c = vec![vec![1.0, 1.0]];
        let d = min_norm_correction(&c, &[2.0]).unwrap();
        assert_relative_eq!(d[0], 1.0, epsilon = 1e-14);
        assert_relative_eq!(d[1], 1.0, epsilon = 1e-14);
        assert!(min_norm_correction(&[], &[]).unwrap().is_empty());
    }

    #[test]
    fn test_norms() {
        assert_relative_eq!(norm2(&[3.0, 4.0]), 5.0);
        assert_eq!(norm_inf(&[-7.0, 2.0]), 7.0);
        assert_eq!(norm_inf(&[]), 0.0);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(200))]

            #[test]
            fn test_solve_diagonally_dominant(
                entries in prop::collection::vec(-1.0..1.0_f64, 16),
                rhs in prop::collection::vec(-10.0..10.0_f64, 4)
            ) {
                // Strict diagonal dominance guarantees a well-conditioned system
                let mut a: Vec<Vec<f64>> = entries.chunks(4).map(|c| c.to_vec()).collect();
                for (i, row) in a.iter_mut().enumerate() {
                    row[i] = 5.0 + row[i].abs();
                }
                let x = solve(&a, &rhs).unwrap();
                let back = mat_vec(&a, &x);
                for (bi, ri) in back.iter().zip(&rhs) {
                    prop_assert!((bi - ri).abs() < 1e-10);
                }
            }
        }
    }
}
