// SPDX-License-Identifier: LGPL-3.0-or-later

//! Packed (element-wise) buffer arithmetic.
//!
//! All functions process `min(len)` elements of their arguments.

use multiversion::multiversion;

/// Copy `src` into the head of `dst`.
///
/// # Panics
/// Panics if `dst.len() < src.len()`.
pub fn copy(dst: &mut [f32], src: &[f32]) {
    assert!(dst.len() >= src.len(), "dst too small");
    dst[..src.len()].copy_from_slice(src);
}

/// `dst[i] *= k`
#[multiversion(targets("x86_64+avx2+fma", "x86_64+avx", "x86_64+sse4.1", "aarch64+neon",))]
pub fn mul_k1(dst: &mut [f32], k: f32) {
    for d in dst.iter_mut() {
        *d *= k;
    }
}

/// `dst[i] = src[i] * k`
#[multiversion(targets("x86_64+avx2+fma", "x86_64+avx", "x86_64+sse4.1", "aarch64+neon",))]
pub fn mul_k2(dst: &mut [f32], src: &[f32], k: f32) {
    for (d, s) in dst.iter_mut().zip(src.iter()) {
        *d = *s * k;
    }
}

/// `dst[i] *= src[i]`
#[multiversion(targets("x86_64+avx2+fma", "x86_64+avx", "x86_64+sse4.1", "aarch64+neon",))]
pub fn mul2(dst: &mut [f32], src: &[f32]) {
    for (d, s) in dst.iter_mut().zip(src.iter()) {
        *d *= *s;
    }
}

/// `dst[i] += src[i]`
#[multiversion(targets("x86_64+avx2+fma", "x86_64+avx", "x86_64+sse4.1", "aarch64+neon",))]
pub fn add2(dst: &mut [f32], src: &[f32]) {
    for (d, s) in dst.iter_mut().zip(src.iter()) {
        *d += *s;
    }
}

/// `dst[i] += a[i] * b[i]`
#[multiversion(targets("x86_64+avx2+fma", "x86_64+avx", "x86_64+sse4.1", "aarch64+neon",))]
pub fn fmadd3(dst: &mut [f32], a: &[f32], b: &[f32]) {
    for ((d, x), y) in dst.iter_mut().zip(a.iter()).zip(b.iter()) {
        *d += *x * *y;
    }
}

/// `dst[i] = min(|a[i]|, |b[i]|)`
#[multiversion(targets("x86_64+avx2+fma", "x86_64+avx", "x86_64+sse4.1", "aarch64+neon",))]
pub fn pamin3(dst: &mut [f32], a: &[f32], b: &[f32]) {
    for ((d, x), y) in dst.iter_mut().zip(a.iter()).zip(b.iter()) {
        *d = x.abs().min(y.abs());
    }
}

/// `dst[i] = max(|a[i]|, |b[i]|)`
#[multiversion(targets("x86_64+avx2+fma", "x86_64+avx", "x86_64+sse4.1", "aarch64+neon",))]
pub fn pamax3(dst: &mut [f32], a: &[f32], b: &[f32]) {
    for ((d, x), y) in dst.iter_mut().zip(a.iter()).zip(b.iter()) {
        *d = x.abs().max(y.abs());
    }
}

/// Largest absolute value in `src`, `0.0` for an empty slice.
pub fn abs_max(src: &[f32]) -> f32 {
    src.iter().fold(0.0f32, |m, s| m.max(s.abs()))
}

/// Clamp every element of `buf` into `[lo, hi]`.
pub fn limit(buf: &mut [f32], lo: f32, hi: f32) {
    for s in buf.iter_mut() {
        *s = s.clamp(lo, hi);
    }
}
