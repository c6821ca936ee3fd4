// SPDX-License-Identifier: LGPL-3.0-or-later

//! Dynamics curve evaluation.
//!
//! A [`DynamicsCurve`] maps an input level to an output level in the
//! log-log domain. These kernels only evaluate it; envelope detection
//! and timing (attack/release) live in `gott-dsp-units`.

use crate::types::{AMPLIFICATION_THRESH, DynamicsCurve};
use multiversion::multiversion;

/// Natural logarithm of the output level for input level `x` (linear,
/// non-negative). Levels below [`AMPLIFICATION_THRESH`] are evaluated at
/// the threshold.
#[inline]
pub fn dynamics_log_level(x: f32, c: &DynamicsCurve) -> f32 {
    let x = x.max(AMPLIFICATION_THRESH);
    let lx = x.ln();

    for k in c.knees[..c.count].iter().rev() {
        if x >= k.end {
            return k.tilt[0] * lx + k.tilt[1];
        }
        if x > k.start {
            return (k.herm[0] * lx + k.herm[1]) * lx + k.herm[2];
        }
    }

    c.base[0] * lx + c.base[1]
}

/// Gain multiplier for a single level: `curve(x) / x`.
#[inline]
pub fn dynamics_gain_single(x: f32, c: &DynamicsCurve) -> f32 {
    let x = x.abs().max(AMPLIFICATION_THRESH);
    (dynamics_log_level(x, c) - x.ln()).exp()
}

/// Output level for a single input level.
#[inline]
pub fn dynamics_curve_single(x: f32, c: &DynamicsCurve) -> f32 {
    let x = x.abs();
    dynamics_gain_single(x, c) * x
}

/// Compute the gain multiplier for each `|src[i]|`.
#[multiversion(targets("x86_64+avx2+fma", "x86_64+avx", "x86_64+sse4.1", "aarch64+neon",))]
pub fn dynamics_gain(dst: &mut [f32], src: &[f32], c: &DynamicsCurve) {
    for (d, s) in dst.iter_mut().zip(src.iter()) {
        *d = dynamics_gain_single(*s, c);
    }
}

/// Compute the output level for each `|src[i]|`.
#[multiversion(targets("x86_64+avx2+fma", "x86_64+avx", "x86_64+sse4.1", "aarch64+neon",))]
pub fn dynamics_curve(dst: &mut [f32], src: &[f32], c: &DynamicsCurve) {
    for (d, s) in dst.iter_mut().zip(src.iter()) {
        *d = dynamics_curve_single(*s, c);
    }
}

/// Replace each level in `buf` by its gain multiplier.
#[multiversion(targets("x86_64+avx2+fma", "x86_64+avx", "x86_64+sse4.1", "aarch64+neon",))]
pub fn dynamics_gain_inplace(buf: &mut [f32], c: &DynamicsCurve) {
    for s in buf.iter_mut() {
        *s = dynamics_gain_single(*s, c);
    }
}
