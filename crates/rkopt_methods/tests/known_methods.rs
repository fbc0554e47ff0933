//! Analysis of classical methods with known order and SSP coefficient.
//!
//! # Test Categories
//!
//! 1. **Order**: attained order of single-step and multistep methods
//! 2. **SSP**: radius of absolute monotonicity
//! 3. **Codec**: classical methods through the class codecs

use approx::assert_relative_eq;
use rkopt_methods::analysis::{
    am_radius, check_order, error_coefficient, optimal_shu_osher_form, DEFAULT_ORDER_TOLERANCE,
};
use rkopt_methods::trees::TreeCatalogue;
use rkopt_methods::{MethodClass, MethodCoefficients, MethodDescriptor, MethodFamily, Objective};

fn forward_euler() -> MethodCoefficients {
    MethodCoefficients::butcher(vec![vec![0.0]], vec![1.0])
}

fn ssprk22() -> MethodCoefficients {
    MethodCoefficients::butcher(vec![vec![0.0, 0.0], vec![1.0, 0.0]], vec![0.5, 0.5])
}

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

fn rk4() -> MethodCoefficients {
    MethodCoefficients::butcher(
        vec![
            vec![0.0, 0.0, 0.0, 0.0],
            vec![0.5, 0.0, 0.0, 0.0],
            vec![0.0, 0.5, 0.0, 0.0],
            vec![0.0, 0.0, 1.0, 0.0],
        ],
        vec![1.0 / 6.0, 1.0 / 3.0, 1.0 / 3.0, 1.0 / 6.0],
    )
}

/// `u_{n+1} = u_{n-1} + 2h F(u_n)`.
fn leapfrog() -> MethodCoefficients {
    MethodCoefficients::multistep(
        vec![vec![0.0]],
        vec![2.0],
        vec![vec![0.0, 1.0]],
        vec![1.0, 0.0],
    )
}

// ============================================================================
// Order
// ============================================================================

#[test]
fn test_tree_counts_per_order() {
    let trees = TreeCatalogue::new(8);
    let counts: Vec<usize> = (1..=8).map(|q| trees.of_order(q).len()).collect();
    assert_eq!(counts, vec![1, 1, 2, 4, 9, 20, 48, 115]);
}

#[test]
fn test_classical_orders() {
    assert_eq!(check_order(&forward_euler(), DEFAULT_ORDER_TOLERANCE), 1);
    assert_eq!(check_order(&ssprk22(), DEFAULT_ORDER_TOLERANCE), 2);
    assert_eq!(check_order(&ssprk33(), DEFAULT_ORDER_TOLERANCE), 3);
    assert_eq!(check_order(&rk4(), DEFAULT_ORDER_TOLERANCE), 4);
}

#[test]
fn test_leapfrog_order() {
    let lf = leapfrog();
    assert_eq!(lf.c, vec![0.0]);
    assert_eq!(check_order(&lf, DEFAULT_ORDER_TOLERANCE), 2);
}

#[test]
fn test_rk4_error_coefficient() {
    // nine order-5 trees, each with a nonzero residual
    let e = error_coefficient(&rk4(), 4);
    assert!(e.is_finite());
    assert!(e > 0.0);
}

// ============================================================================
// SSP
// ============================================================================

#[test]
fn test_classical_radii() {
    assert_relative_eq!(am_radius(&forward_euler()), 1.0, epsilon = 1e-10);
    assert_relative_eq!(am_radius(&ssprk22()), 1.0, epsilon = 1e-10);
    assert_relative_eq!(am_radius(&ssprk33()), 1.0, epsilon = 1e-10);
    assert!(am_radius(&rk4()) < 1e-12);
}

#[test]
fn test_leapfrog_is_not_ssp() {
    assert_eq!(am_radius(&leapfrog()), 0.0);
}

#[test]
fn test_ssprk22_shu_osher_form() {
    let form = optimal_shu_osher_form(&ssprk22(), 1.0).unwrap();
    // u_{n+1} = 1/2 u_n + 1/2 (Y_2 + h F(Y_2))
    assert_relative_eq!(form.v[2], 0.5, epsilon = 1e-15);
    assert_relative_eq!(form.alpha[2][1], 0.5, epsilon = 1e-15);
    assert_relative_eq!(form.beta[2][1], 0.5, epsilon = 1e-15);
    assert_relative_eq!(form.alpha[2][0], 0.0, epsilon = 1e-15);
}

// ============================================================================
// Codec
// ============================================================================

#[test]
fn test_ssprk33_through_erk_codec() {
    let desc = MethodDescriptor::new(MethodClass::Erk, 3, 1, 3, Objective::Ssp).unwrap();
    let family = desc.family();
    let x = family.encode(&ssprk33().with_anchor(-1.0)).unwrap();
    assert_eq!(x.len(), 7);
    assert_eq!(*x.last().unwrap(), -1.0);
    let decoded = family.decode(&x).unwrap();
    assert_eq!(check_order(&decoded, DEFAULT_ORDER_TOLERANCE), 3);
    assert_eq!(decoded.anchor_radius(), Some(1.0));
    assert!(family.linear_constraints().unwrap().max_violation(&x) < 1e-15);
}

#[test]
fn test_leapfrog_through_multistep_codec() {
    let desc = MethodDescriptor::new(MethodClass::Erk, 1, 2, 2, Objective::Acc).unwrap();
    let family = desc.family();
    // b, D, theta
    let x = family.encode(&leapfrog()).unwrap();
    assert_eq!(x, vec![2.0, 0.0, 1.0, 1.0, 0.0]);
    assert!(family.linear_constraints().unwrap().max_violation(&x) < 1e-15);
    let decoded = family.decode(&x).unwrap();
    assert_eq!(check_order(&decoded, DEFAULT_ORDER_TOLERANCE), 2);
}

#[test]
fn test_low_storage_smart_guesses_are_ssprk_s2() {
    for class in [MethodClass::TwoS, MethodClass::TwoSStar, MethodClass::ThreeSStar] {
        for s in 2..=5 {
            let desc = MethodDescriptor::new(class, s, 1, 2, Objective::Ssp).unwrap();
            let family = desc.family();
            let coeffs = family.decode(&family.smart_guess()).unwrap();
            assert_eq!(check_order(&coeffs, DEFAULT_ORDER_TOLERANCE), 2, "{}", desc);
            assert_relative_eq!(am_radius(&coeffs), (s - 1) as f64, epsilon = 1e-9);
            assert_eq!(coeffs.anchor_radius(), Some((s - 1) as f64));
        }
    }
}
