//! Method analysis: order conditions, SSP properties and stability.
//!
//! - [`order`]: B-series order conditions, attained order, error coefficients
//! - [`ssp`]: Spijker form, absolute monotonicity and Shu-Osher form
//! - [`stability`]: linear stability functions

pub mod order;
pub mod ssp;
pub mod stability;

pub use order::{
    check_order, check_order_with, error_coefficient, error_coefficients, order_conditions, tall_tree_coefficient,
    ConditionMode, OrderConditions, Weights, DEFAULT_ORDER_TOLERANCE,
};
pub use ssp::{
    absolute_monotonicity_residuals, am_radius, optimal_shu_osher_form, spijker_form,
    ShuOsherForm, SpijkerForm,
};
pub use stability::{embedded_stability_modulus, stability_function};
