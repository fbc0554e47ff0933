//! Criterion benchmarks for rkopt_methods analysis routines.
//!
//! Measures order-condition evaluation across target orders and the
//! radius of absolute monotonicity across stage counts.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rkopt_methods::analysis::{am_radius, ConditionMode, OrderConditions};
use rkopt_methods::{MethodClass, MethodDescriptor, MethodFamily, Objective};

/// Benchmark order-condition residuals of a smart-guess ERK.
fn bench_order_conditions(c: &mut Criterion) {
    let mut group = c.benchmark_group("order_conditions");

    for order in [3, 5, 7] {
        let desc = MethodDescriptor::new(MethodClass::Erk, 10, 1, order, Objective::Acc).unwrap();
        let family = desc.family();
        let coeffs = family.decode(&family.smart_guess()).unwrap();

        group.bench_with_input(BenchmarkId::new("construction", order), &order, |b, &p| {
            b.iter(|| OrderConditions::new(black_box(p), ConditionMode::Nonlinear));
        });

        let conditions = OrderConditions::new(order, ConditionMode::Nonlinear);
        group.bench_with_input(BenchmarkId::new("residuals", order), &coeffs, |b, coeffs| {
            b.iter(|| conditions.residuals(black_box(coeffs)));
        });
    }

    group.finish();
}

/// Benchmark the radius of absolute monotonicity of SSPRK(s,2).
fn bench_am_radius(c: &mut Criterion) {
    let mut group = c.benchmark_group("am_radius");

    for stages in [2, 5, 10] {
        let desc =
            MethodDescriptor::new(MethodClass::TwoSStar, stages, 1, 2, Objective::Ssp).unwrap();
        let family = desc.family();
        let coeffs = family.decode(&family.smart_guess()).unwrap();
        group.bench_with_input(BenchmarkId::new("ssprk_s2", stages), &coeffs, |b, coeffs| {
            b.iter(|| am_radius(black_box(coeffs)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_order_conditions, bench_am_radius);
criterion_main!(benches);
