//! Butcher-form classes, optionally multistep.
//!
//! Layout: the free entries of `A` row-major, the shared diagonal (sdirk
//! only), `b`, then for `k > 1` the step coupling `D` row-major and `θ`,
//! then the SSP anchor.

use rand::Rng;
use rkopt_core::types::{LinearConstraints, ParameterBounds};

use super::{check_length, random_convex_weights, MethodFamily};
use crate::class::{ButcherStructure, Objective};
use crate::coefficients::MethodCoefficients;
use crate::descriptor::MethodDescriptor;
use crate::error::MethodError;

/// Offsets into the parameter vector.
#[derive(Debug, Clone, PartialEq)]
struct Layout {
    entries: Vec<(usize, usize)>,
    gamma: Option<usize>,
    b: usize,
    d: Option<usize>,
    theta: Option<usize>,
    anchor: Option<usize>,
    len: usize,
}

impl Layout {
    fn new(descriptor: &MethodDescriptor, structure: ButcherStructure) -> Self {
        let s = descriptor.stages();
        let k = descriptor.steps();
        let entries = structure.free_entries(s);
        let mut len = entries.len();
        let gamma = (structure == ButcherStructure::SinglyDiagonallyImplicit).then(|| {
            len += 1;
            len - 1
        });
        let b = len;
        len += s;
        let (d, theta) = if k > 1 {
            let d = len;
            len += s * k;
            let theta = len;
            len += k;
            (Some(d), Some(theta))
        } else {
            (None, None)
        };
        let anchor = descriptor.objective().has_anchor().then(|| {
            len += 1;
            len - 1
        });
        Self {
            entries,
            gamma,
            b,
            d,
            theta,
            anchor,
            len,
        }
    }
}

/// Codec and heuristics for `erk`, `irk`, `dirk` and `sdirk`.
#[derive(Debug, Clone, PartialEq)]
pub struct ButcherFamily {
    descriptor: MethodDescriptor,
    structure: ButcherStructure,
    layout: Layout,
}

impl ButcherFamily {
    /// Create the family for a descriptor of a Butcher-form class.
    pub fn new(descriptor: MethodDescriptor, structure: ButcherStructure) -> Self {
        let layout = Layout::new(&descriptor, structure);
        Self {
            descriptor,
            structure,
            layout,
        }
    }

    /// Zero pattern of `A`.
    pub fn structure(&self) -> ButcherStructure {
        self.structure
    }

    /// Guess radius `r`: a rough estimate of the attainable SSP coefficient.
    fn heuristic_radius(&self) -> f64 {
        let s = self.descriptor.stages() as f64;
        let p = self.descriptor.order() as f64;
        match self.structure {
            ButcherStructure::Explicit => (s - p + 1.0).max(1.0),
            _ => 2.0 * s,
        }
    }

    /// Write `b`, `D`, `θ` for a multistep guess with all history weight on `u_n`.
    fn write_history_on_current(&self, x: &mut [f64]) {
        let s = self.descriptor.stages();
        let k = self.descriptor.steps();
        if let (Some(d), Some(theta)) = (self.layout.d, self.layout.theta) {
            for i in 0..s {
                x[d + i * k + (k - 1)] = 1.0;
            }
            x[theta + (k - 1)] = 1.0;
        }
    }
}

impl MethodFamily for ButcherFamily {
    fn descriptor(&self) -> &MethodDescriptor {
        &self.descriptor
    }

    fn parameter_count(&self) -> usize {
        self.layout.len
    }

    fn decode(&self, x: &[f64]) -> Result<MethodCoefficients, MethodError> {
        check_length(x, self.layout.len)?;
        let s = self.descriptor.stages();
        let k = self.descriptor.steps();
        let layout = &self.layout;

        let mut a = vec![vec![0.0; s]; s];
        for (&(i, j), &v) in layout.entries.iter().zip(x) {
            a[i][j] = v;
        }
        if let Some(g) = layout.gamma {
            for (i, row) in a.iter_mut().enumerate() {
                row[i] = x[g];
            }
        }
        let b = x[layout.b..layout.b + s].to_vec();
        let (d, theta) = match (layout.d, layout.theta) {
            (Some(d), Some(theta)) => (
                x[d..d + s * k].chunks(k).map(<[f64]>::to_vec).collect(),
                x[theta..theta + k].to_vec(),
            ),
            _ => (vec![vec![1.0]; s], vec![1.0]),
        };

        let mut coeffs = MethodCoefficients::multistep(a, b, d, theta);
        coeffs.ssp_anchor = layout.anchor.map(|i| x[i]);
        Ok(coeffs)
    }

    fn encode(&self, coeffs: &MethodCoefficients) -> Result<Vec<f64>, MethodError> {
        let s = self.descriptor.stages();
        let k = self.descriptor.steps();
        let layout = &self.layout;

        if coeffs.a.len() != s || coeffs.a.iter().any(|row| row.len() != s) {
            return Err(MethodError::structure(format!("A must be {}x{}", s, s)));
        }
        if coeffs.b.len() != s {
            return Err(MethodError::structure(format!("b must have {} entries", s)));
        }
        if coeffs.theta.len() != k || coeffs.d.len() != s || coeffs.d.iter().any(|r| r.len() != k) {
            return Err(MethodError::structure(format!(
                "D must be {}x{} and theta must have {} entries",
                s, k, k
            )));
        }
        for i in 0..s {
            for j in 0..s {
                if !self.structure.allows(i, j) && coeffs.a[i][j] != 0.0 {
                    return Err(MethodError::structure(format!(
                        "A[{}][{}] = {} breaks the {:?} pattern",
                        i, j, coeffs.a[i][j], self.structure
                    )));
                }
            }
        }
        if layout.gamma.is_some() && (1..s).any(|i| coeffs.a[i][i] != coeffs.a[0][0]) {
            return Err(MethodError::structure("sdirk diagonal entries differ"));
        }
        if k == 1 && (coeffs.theta[0] != 1.0 || coeffs.d.iter().any(|r| r[0] != 1.0)) {
            return Err(MethodError::structure(
                "single-step methods have unit history weights",
            ));
        }

        let mut x = Vec::with_capacity(layout.len);
        x.extend(layout.entries.iter().map(|&(i, j)| coeffs.a[i][j]));
        if layout.gamma.is_some() {
            x.push(coeffs.a[0][0]);
        }
        x.extend_from_slice(&coeffs.b);
        if layout.d.is_some() {
            for row in &coeffs.d {
                x.extend_from_slice(row);
            }
            x.extend_from_slice(&coeffs.theta);
        }
        if layout.anchor.is_some() {
            let anchor = coeffs
                .ssp_anchor
                .ok_or_else(|| MethodError::structure("ssp objective needs an anchor"))?;
            x.push(anchor);
        }
        Ok(x)
    }

    fn linear_constraints(&self) -> Result<LinearConstraints, MethodError> {
        let s = self.descriptor.stages();
        let k = self.descriptor.steps();
        let layout = &self.layout;
        let n = layout.len;
        let mut lc = LinearConstraints::unconstrained(n);

        match (layout.d, layout.theta) {
            (Some(d), Some(theta)) => {
                let x = self.descriptor.history_nodes();
                let mut row = vec![0.0; n];
                row[theta..theta + k].iter_mut().for_each(|v| *v = 1.0);
                lc.push_equality(row, 1.0)?;
                for i in 0..s {
                    let mut row = vec![0.0; n];
                    row[d + i * k..d + (i + 1) * k]
                        .iter_mut()
                        .for_each(|v| *v = 1.0);
                    lc.push_equality(row, 1.0)?;
                }
                let mut row = vec![0.0; n];
                for (l, &xl) in x.iter().enumerate() {
                    row[theta + l] = xl;
                }
                row[layout.b..layout.b + s].iter_mut().for_each(|v| *v = 1.0);
                lc.push_equality(row, 1.0)?;
            }
            _ => {
                let mut row = vec![0.0; n];
                row[layout.b..layout.b + s].iter_mut().for_each(|v| *v = 1.0);
                lc.push_equality(row, 1.0)?;
            }
        }

        if self.descriptor.objective() == Objective::Ssp {
            let anchor = layout.anchor.unwrap_or(n);
            for i in (0..n).filter(|&i| i != anchor) {
                lc.set_bounds(i, ParameterBounds::non_negative());
            }
        } else {
            for (idx, &(i, j)) in layout.entries.iter().enumerate() {
                if i == j {
                    lc.set_bounds(idx, ParameterBounds::non_negative());
                }
            }
            if let Some(g) = layout.gamma {
                lc.set_bounds(g, ParameterBounds::non_negative());
            }
        }
        if let Some(anchor) = layout.anchor {
            lc.set_bounds(anchor, ParameterBounds::non_positive());
        }
        Ok(lc)
    }

    fn random_guess<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<f64> {
        let s = self.descriptor.stages();
        let k = self.descriptor.steps();
        let layout = &self.layout;
        let mut x = vec![0.0; layout.len];

        let mut c: Vec<f64> = (0..s).map(|_| rng.gen_range(0.0..1.0)).collect();
        c.sort_by(f64::total_cmp);
        if self.structure == ButcherStructure::Explicit {
            c[0] = 0.0;
        }

        let gamma = rng.gen_range(0.0..0.5);
        if let Some(g) = layout.gamma {
            x[g] = gamma;
        }
        for (i, &ci) in c.iter().enumerate() {
            let slots: Vec<usize> = layout
                .entries
                .iter()
                .enumerate()
                .filter(|(_, &(row, _))| row == i)
                .map(|(idx, _)| idx)
                .collect();
            if slots.is_empty() {
                continue;
            }
            let target = if layout.gamma.is_some() {
                ci - gamma
            } else {
                ci
            };
            let weights = random_convex_weights(rng, slots.len());
            for (slot, w) in slots.into_iter().zip(weights) {
                x[slot] = target * w;
            }
        }

        // history weights, then b completing the first-order condition
        let mut history_shift = 0.0;
        if let (Some(d), Some(theta)) = (layout.d, layout.theta) {
            let nodes = self.descriptor.history_nodes();
            for i in 0..s {
                let w = random_convex_weights(rng, k);
                x[d + i * k..d + (i + 1) * k].copy_from_slice(&w);
            }
            let w = random_convex_weights(rng, k);
            history_shift = w.iter().zip(&nodes).map(|(t, xl)| t * xl).sum();
            x[theta..theta + k].copy_from_slice(&w);
        }
        let mut partial = 0.0;
        for j in 0..s.saturating_sub(1) {
            let bj = rng.gen_range(0.0..1.0) / s as f64;
            x[layout.b + j] = bj;
            partial += bj;
        }
        x[layout.b + s - 1] = 1.0 - history_shift - partial;

        if let Some(anchor) = layout.anchor {
            x[anchor] = -0.01;
        }
        x
    }

    fn smart_guess(&self) -> Vec<f64> {
        let s = self.descriptor.stages();
        let layout = &self.layout;
        let r = self.heuristic_radius();
        let mut x = vec![0.0; layout.len];

        for (idx, &(i, j)) in layout.entries.iter().enumerate() {
            x[idx] = match self.structure {
                ButcherStructure::Explicit => 1.0 / r,
                _ if i == j => 1.0 / (2.0 * s as f64),
                _ if j < i => 1.0 / s as f64,
                _ => 0.0,
            };
        }
        if let Some(g) = layout.gamma {
            x[g] = 1.0 / (2.0 * s as f64);
        }
        for j in 0..s {
            x[layout.b + j] = 1.0 / s as f64;
        }
        self.write_history_on_current(&mut x);
        if let Some(anchor) = layout.anchor {
            x[anchor] = -r;
        }
        x
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::MethodClass;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn family(class: MethodClass, s: usize, k: usize, p: usize, obj: Objective) -> ButcherFamily {
        let d = MethodDescriptor::new(class, s, k, p, obj).unwrap();
        ButcherFamily::new(d, class.butcher_structure().unwrap())
    }

    #[test]
    fn test_parameter_counts() {
        assert_eq!(family(MethodClass::Erk, 3, 1, 2, Objective::Acc).parameter_count(), 6);
        assert_eq!(family(MethodClass::Irk, 3, 1, 2, Objective::Acc).parameter_count(), 12);
        assert_eq!(family(MethodClass::Dirk, 3, 1, 2, Objective::Ssp).parameter_count(), 10);
        assert_eq!(family(MethodClass::Sdirk, 3, 1, 2, Objective::Acc).parameter_count(), 7);
        // erk s=2 k=2: 1 + 2 + 4 + 2
        assert_eq!(family(MethodClass::Erk, 2, 2, 2, Objective::Acc).parameter_count(), 9);
    }

    #[test]
    fn test_sdirk_decode_shares_diagonal() {
        let f = family(MethodClass::Sdirk, 2, 1, 2, Objective::Acc);
        // a21, gamma, b1, b2
        let coeffs = f.decode(&[0.4, 0.25, 0.5, 0.5]).unwrap();
        assert_eq!(coeffs.a, vec![vec![0.25, 0.0], vec![0.4, 0.25]]);
        assert_relative_eq!(coeffs.c[1], 0.65);
    }

    #[test]
    fn test_encode_rejects_pattern_violation() {
        let f = family(MethodClass::Erk, 2, 1, 2, Objective::Acc);
        let bad = MethodCoefficients::butcher(vec![vec![0.1, 0.0], vec![1.0, 0.0]], vec![0.5, 0.5]);
        assert!(matches!(f.encode(&bad), Err(MethodError::StructureViolation(_))));
    }

    #[test]
    fn test_encode_requires_anchor_for_ssp() {
        let f = family(MethodClass::Erk, 2, 1, 2, Objective::Ssp);
        let rk = MethodCoefficients::butcher(vec![vec![0.0, 0.0], vec![1.0, 0.0]], vec![0.5, 0.5]);
        assert!(f.encode(&rk).is_err());
        assert_eq!(
            f.encode(&rk.with_anchor(-1.0)).unwrap(),
            vec![1.0, 0.5, 0.5, -1.0]
        );
    }

    #[test]
    fn test_smart_explicit_is_ssprk22_for_two_stages() {
        let f = family(MethodClass::Erk, 2, 1, 2, Objective::Ssp);
        assert_eq!(f.smart_guess(), vec![1.0, 0.5, 0.5, -1.0]);
    }

    #[test]
    fn test_linear_constraints_multistep() {
        let f = family(MethodClass::Erk, 2, 2, 2, Objective::Acc);
        let lc = f.linear_constraints().unwrap();
        // sum theta, two D rows, first-order condition
        assert_eq!(lc.equalities().len(), 4);
        let x = f.smart_guess();
        assert!(lc.max_violation(&x) < 1e-15);
    }

    #[test]
    fn test_ssp_bounds_are_non_negative_except_anchor() {
        let f = family(MethodClass::Erk, 3, 1, 2, Objective::Ssp);
        let lc = f.linear_constraints().unwrap();
        let n = f.parameter_count();
        for b in &lc.bounds()[..n - 1] {
            assert_eq!(b.min, 0.0);
        }
        assert_eq!(lc.bounds()[n - 1], ParameterBounds::non_positive());
    }

    #[test]
    fn test_random_guess_row_sums_match_sorted_abscissae() {
        let f = family(MethodClass::Dirk, 4, 1, 3, Objective::Acc);
        let mut rng = StdRng::seed_from_u64(11);
        let x = f.random_guess(&mut rng);
        let coeffs = f.decode(&x).unwrap();
        for w in coeffs.c.windows(2) {
            assert!(w[0] <= w[1] + 1e-15);
        }
        assert_relative_eq!(coeffs.b.iter().sum::<f64>(), 1.0, epsilon = 1e-14);
    }

    #[test]
    fn test_random_multistep_guess_satisfies_first_order_condition() {
        let f = family(MethodClass::Erk, 3, 2, 2, Objective::Acc);
        let mut rng = StdRng::seed_from_u64(3);
        let x = f.random_guess(&mut rng);
        let lc = f.linear_constraints().unwrap();
        assert!(lc.max_violation(&x) < 1e-14);
    }
}
