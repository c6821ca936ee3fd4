// SPDX-License-Identifier: LGPL-3.0-or-later

//! Two-source weighted mixing.

use multiversion::multiversion;

/// `dst[i] = dst[i]*k1 + src[i]*k2`
#[multiversion(targets("x86_64+avx2+fma", "x86_64+avx", "x86_64+sse4.1", "aarch64+neon",))]
pub fn mix2(dst: &mut [f32], src: &[f32], k1: f32, k2: f32) {
    for (d, s) in dst.iter_mut().zip(src.iter()) {
        *d = *d * k1 + *s * k2;
    }
}
