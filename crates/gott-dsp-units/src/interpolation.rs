// SPDX-License-Identifier: LGPL-3.0-or-later

//! Polynomial interpolation used to build dynamics curves.
//!
//! The processors evaluate these polynomials in the log domain, so
//! segment joints stay continuous in both value and slope.

/// Compute linear interpolation coefficients.
///
/// Finds `[a, b]` such that `y = a*x + b` passes through `(x0, y0)` and
/// `(x1, y1)`.
///
/// # Examples
/// ```
/// # use gott_dsp_units::interpolation::linear;
/// let [a, b] = linear(0.0, 1.0, 2.0, 5.0);
/// assert!((a - 2.0).abs() < 1e-5);
/// assert!((b - 1.0).abs() < 1e-5);
/// ```
#[inline]
pub fn linear(x0: f32, y0: f32, x1: f32, y1: f32) -> [f32; 2] {
    let a = (y1 - y0) / (x1 - x0);
    let b = y0 - a * x0;
    [a, b]
}

/// Line with slope `k` through `(x0, y0)`: `[k, y0 - k*x0]`.
#[inline]
pub fn line_through(x0: f32, y0: f32, k: f32) -> [f32; 2] {
    [k, y0 - k * x0]
}

/// Compute Hermite quadratic interpolation coefficients.
///
/// Finds `[a, b, c]` such that `y = a*x² + b*x + c` passes through
/// `(x0, y0)` with slope `k0`, and has slope `k1` at `x1`.
///
/// # Arguments
/// * `x0` - x coordinate of the point
/// * `y0` - y coordinate of the point
/// * `k0` - Slope at x0
/// * `x1` - x coordinate where the second slope is specified
/// * `k1` - Slope at x1
///
/// # Examples
/// ```
/// # use gott_dsp_units::interpolation::hermite_quadratic;
/// // Parabola through (0, 0) with slope 0 at x=0 and slope 2 at x=1
/// let [a, b, c] = hermite_quadratic(0.0, 0.0, 0.0, 1.0, 2.0);
/// assert!(c.abs() < 1e-5);
/// assert!(b.abs() < 1e-5);
/// assert!((a - 1.0).abs() < 1e-5);
/// ```
#[inline]
pub fn hermite_quadratic(x0: f32, y0: f32, k0: f32, x1: f32, k1: f32) -> [f32; 3] {
    let a = (k0 - k1) * 0.5 / (x0 - x1);
    let b = k0 - 2.0 * a * x0;
    let c = y0 - (a * x0 + b) * x0;
    [a, b, c]
}
