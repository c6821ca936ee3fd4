// SPDX-License-Identifier: LGPL-3.0-or-later

//! Filter coefficient calculation and biquad filter wrappers.
//!
//! Coefficient calculators follow the RBJ Audio EQ Cookbook, adapted for
//! the `gott-dsp-lib` pre-negated a1/a2 convention.

pub mod coeffs;
pub mod dynamic_filters;
pub mod envelope_boost;
pub mod filter;
