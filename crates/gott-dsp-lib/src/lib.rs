// SPDX-License-Identifier: LGPL-3.0-or-later

//! # gott-dsp-lib
//!
//! Low-level buffer kernels for the GOTT multiband compressor.
//!
//! This crate provides the foundational operations used by
//! `gott-dsp-units` to build complete processors. It includes:
//!
//! - **Packed math**: scaling, products, sums, absolute min/max
//! - **Filters**: biquad cascades with in-place processing
//! - **Dynamics**: log-log dynamics curve evaluation
//! - **FFT**: in-place forward/inverse FFT via `rustfft`
//! - **Mixing**: two-source weighted mixing
//! - **Mid/Side**: stereo ↔ mid/side matrix encoding
//! - **Float utilities**: NaN/denormal sanitization
//!
//! ## Design
//!
//! Buffer-processing functions use runtime SIMD dispatch via the
//! `multiversion` crate. Each annotated function is compiled for
//! AVX2+FMA, AVX, SSE4.1, and NEON targets; the best variant is
//! selected automatically at startup. The FFT delegates to `rustfft`
//! which already provides SIMD-optimized implementations.

pub mod dynamics;
pub mod fft;
pub mod filters;
pub mod float;
pub mod mix;
pub mod msmatrix;
pub mod pmath;
pub mod types;
