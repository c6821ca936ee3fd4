// SPDX-License-Identifier: LGPL-3.0-or-later

//! Floating-point sanitization.
//!
//! Buffers that come from outside the engine (external or linked
//! sidechain) may carry NaN, infinity or denormals; these helpers make
//! them safe for recursive filters.

/// Flush denormals, NaN and infinity to zero.
#[inline]
pub fn sanitize(x: f32) -> f32 {
    if x.is_finite() && x.abs() >= f32::MIN_POSITIVE {
        x
    } else {
        0.0
    }
}

/// Copy `src` into `dst` while sanitizing each sample.
pub fn copy_saturated(dst: &mut [f32], src: &[f32]) {
    for (d, s) in dst.iter_mut().zip(src.iter()) {
        *d = sanitize(*s);
    }
}
