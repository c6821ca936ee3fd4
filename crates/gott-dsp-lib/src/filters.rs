// SPDX-License-Identifier: LGPL-3.0-or-later

//! Biquad cascade processing (static coefficients).
//!
//! `a1` and `a2` are stored **pre-negated** compared to the audio EQ
//! cookbook, so the transposed direct form II recurrence only adds:
//! ```text
//!   s2   = b0 * x + d[0]
//!   p1   = b1 * x + a1 * s2
//!   p2   = b2 * x + a2 * s2
//!   d[0] = d[1] + p1
//!   d[1] = p2
//!   y    = s2
//! ```
//! Therefore `a1 = +2*cos(w0)/a0` and `a2 = -(1-alpha)/a0` for a
//! cookbook lowpass.

use crate::types::{Biquad, BiquadX1};
use multiversion::multiversion;

/// Run one sample through one section, updating its two delay elements.
#[inline(always)]
pub fn biquad_tick(c: &BiquadX1, d: &mut [f32], x: f32) -> f32 {
    let s2 = c.b0 * x + d[0];
    let p1 = c.b1 * x + c.a1 * s2;
    let p2 = c.b2 * x + c.a2 * s2;
    d[0] = d[1] + p1;
    d[1] = p2;
    s2
}

/// Process a buffer in place through a single section.
#[multiversion(targets("x86_64+avx2+fma", "x86_64+avx", "x86_64+sse4.1", "aarch64+neon",))]
pub fn biquad_process_x1(buf: &mut [f32], c: &BiquadX1, d: &mut [f32; 2]) {
    let (b0, b1, b2) = (c.b0, c.b1, c.b2);
    let (a1, a2) = (c.a1, c.a2);
    let (mut d0, mut d1) = (d[0], d[1]);

    for s in buf.iter_mut() {
        let x = *s;
        let s2 = b0 * x + d0;
        let p1 = b1 * x + a1 * s2;
        let p2 = b2 * x + a2 * s2;
        d0 = d1 + p1;
        d1 = p2;
        *s = s2;
    }

    d[0] = d0;
    d[1] = d1;
}

/// Process a buffer in place through two cascaded sections.
///
/// Both sections run per sample so the data stays in registers.
#[multiversion(targets("x86_64+avx2+fma", "x86_64+avx", "x86_64+sse4.1", "aarch64+neon",))]
pub fn biquad_process_x2(buf: &mut [f32], c: &[BiquadX1; 2], d: &mut [f32; 4]) {
    let [c0, c1] = c;
    for s in buf.iter_mut() {
        let x = *s;
        let s2 = c0.b0 * x + d[0];
        let p1 = c0.b1 * x + c0.a1 * s2;
        let p2 = c0.b2 * x + c0.a2 * s2;
        d[0] = d[1] + p1;
        d[1] = p2;

        let r2 = c1.b0 * s2 + d[2];
        let q1 = c1.b1 * s2 + c1.a1 * r2;
        let q2 = c1.b2 * s2 + c1.a2 * r2;
        d[2] = d[3] + q1;
        d[3] = q2;

        *s = r2;
    }
}

/// Process a buffer in place through every active section of `f`.
///
/// Sections are consumed in pairs with [`biquad_process_x2`]; an odd
/// trailing section goes through [`biquad_process_x1`].
pub fn biquad_process_inplace(buf: &mut [f32], f: &mut Biquad) {
    let count = f.count;
    let mut j = 0;
    while j + 1 < count {
        let c = [f.sections[j], f.sections[j + 1]];
        let mut d = [f.d[2 * j], f.d[2 * j + 1], f.d[2 * j + 2], f.d[2 * j + 3]];
        biquad_process_x2(buf, &c, &mut d);
        f.d[2 * j..2 * j + 4].copy_from_slice(&d);
        j += 2;
    }
    if j < count {
        let mut d = [f.d[2 * j], f.d[2 * j + 1]];
        biquad_process_x1(buf, &f.sections[j], &mut d);
        f.d[2 * j..2 * j + 2].copy_from_slice(&d);
    }
}

/// Process `src` through the cascade into `dst`.
///
/// # Panics
/// Panics if `dst.len() < src.len()`.
pub fn biquad_process(dst: &mut [f32], src: &[f32], f: &mut Biquad) {
    let n = src.len();
    dst[..n].copy_from_slice(src);
    biquad_process_inplace(&mut dst[..n], f);
}
