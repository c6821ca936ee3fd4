// SPDX-License-Identifier: LGPL-3.0-or-later

//! Biquad coefficient calculation using the RBJ Audio EQ Cookbook.
//!
//! All coefficients are returned with `a1` and `a2` **pre-negated**
//! relative to the cookbook formulas. The processing loop adds
//! (`d0 = b1*x + a1*y + d1`), so the sign flip is baked in here.
//! Intermediate values are computed in `f64` so low crossover
//! frequencies keep their precision at high sample rates.

use std::f64::consts::PI;

use gott_dsp_lib::types::BiquadX1;
use num_complex::Complex;

/// Supported biquad filter types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterType {
    /// Bypass (identity): passes signal unchanged.
    Off,
    /// Second-order low-pass filter.
    Lowpass,
    /// Second-order high-pass filter.
    Highpass,
    /// All-pass filter (phase shift only).
    Allpass,
    /// Peaking (bell) equalizer.
    Peaking,
    /// Low-shelf equalizer.
    LowShelf,
    /// High-shelf equalizer.
    HighShelf,
}

/// Frequency-dependent terms of a cookbook section, computed once and
/// reused when only the gain changes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShelfPrototype {
    cos_w0: f32,
    alpha: f32,
}

impl ShelfPrototype {
    /// Prepare a shelf at `freq` with quality `q`.
    pub fn new(sample_rate: f32, freq: f32, q: f32) -> Self {
        let w0 = 2.0 * PI * f64::from(freq) / f64::from(sample_rate);
        Self {
            cos_w0: w0.cos() as f32,
            alpha: (w0.sin() / (2.0 * f64::from(q))) as f32,
        }
    }

    /// Low shelf with linear amplitude gain `gain` at DC.
    #[inline]
    pub fn low_shelf(&self, gain: f32) -> BiquadX1 {
        let a = gain.sqrt();
        let (cos_w0, alpha) = (self.cos_w0, self.alpha);
        let two_sqrt_a_alpha = 2.0 * a.sqrt() * alpha;
        let ap1 = a + 1.0;
        let am1 = a - 1.0;

        let inv_a0 = 1.0 / (ap1 + am1 * cos_w0 + two_sqrt_a_alpha);
        BiquadX1 {
            b0: a * (ap1 - am1 * cos_w0 + two_sqrt_a_alpha) * inv_a0,
            b1: 2.0 * a * (am1 - ap1 * cos_w0) * inv_a0,
            b2: a * (ap1 - am1 * cos_w0 - two_sqrt_a_alpha) * inv_a0,
            a1: 2.0 * (am1 + ap1 * cos_w0) * inv_a0,
            a2: -(ap1 + am1 * cos_w0 - two_sqrt_a_alpha) * inv_a0,
        }
    }

    /// High shelf with linear amplitude gain `gain` at Nyquist.
    #[inline]
    pub fn high_shelf(&self, gain: f32) -> BiquadX1 {
        let a = gain.sqrt();
        let (cos_w0, alpha) = (self.cos_w0, self.alpha);
        let two_sqrt_a_alpha = 2.0 * a.sqrt() * alpha;
        let ap1 = a + 1.0;
        let am1 = a - 1.0;

        let inv_a0 = 1.0 / (ap1 - am1 * cos_w0 + two_sqrt_a_alpha);
        BiquadX1 {
            b0: a * (ap1 + am1 * cos_w0 + two_sqrt_a_alpha) * inv_a0,
            b1: -2.0 * a * (am1 + ap1 * cos_w0) * inv_a0,
            b2: a * (ap1 + am1 * cos_w0 - two_sqrt_a_alpha) * inv_a0,
            a1: -2.0 * (am1 - ap1 * cos_w0) * inv_a0,
            a2: -(ap1 - am1 * cos_w0 - two_sqrt_a_alpha) * inv_a0,
        }
    }
}

/// Calculate biquad coefficients for the given filter type.
///
/// # Parameters
///
/// - `filter_type` -- type of filter to compute
/// - `sample_rate` -- sample rate in Hz (must be > 0)
/// - `freq` -- center or cutoff frequency in Hz
/// - `q` -- quality factor (must be > 0)
/// - `gain_db` -- gain in dB (only used for peaking and shelving types)
pub fn calc_biquad_coeffs(
    filter_type: FilterType,
    sample_rate: f32,
    freq: f32,
    q: f32,
    gain_db: f32,
) -> BiquadX1 {
    let gain = 10.0_f32.powf(gain_db / 20.0);
    match filter_type {
        FilterType::Off => return BiquadX1::IDENTITY,
        FilterType::LowShelf => return ShelfPrototype::new(sample_rate, freq, q).low_shelf(gain),
        FilterType::HighShelf => return ShelfPrototype::new(sample_rate, freq, q).high_shelf(gain),
        _ => {}
    }

    let w0 = 2.0 * PI * f64::from(freq) / f64::from(sample_rate);
    let cos_w0 = w0.cos();
    let alpha = w0.sin() / (2.0 * f64::from(q));
    let a_lin = f64::from(gain).sqrt();

    let (b0, b1, b2, a0, a1_std, a2_std) = match filter_type {
        FilterType::Lowpass => {
            let b1 = 1.0 - cos_w0;
            (b1 / 2.0, b1, b1 / 2.0, 1.0 + alpha, -2.0 * cos_w0, 1.0 - alpha)
        }
        FilterType::Highpass => {
            let b0 = (1.0 + cos_w0) / 2.0;
            (b0, -(1.0 + cos_w0), b0, 1.0 + alpha, -2.0 * cos_w0, 1.0 - alpha)
        }
        FilterType::Allpass => (
            1.0 - alpha,
            -2.0 * cos_w0,
            1.0 + alpha,
            1.0 + alpha,
            -2.0 * cos_w0,
            1.0 - alpha,
        ),
        FilterType::Peaking => (
            1.0 + alpha * a_lin,
            -2.0 * cos_w0,
            1.0 - alpha * a_lin,
            1.0 + alpha / a_lin,
            -2.0 * cos_w0,
            1.0 - alpha / a_lin,
        ),
        FilterType::Off | FilterType::LowShelf | FilterType::HighShelf => {
            return BiquadX1::IDENTITY;
        }
    };

    let inv_a0 = 1.0 / a0;
    BiquadX1 {
        b0: (b0 * inv_a0) as f32,
        b1: (b1 * inv_a0) as f32,
        b2: (b2 * inv_a0) as f32,
        a1: (-a1_std * inv_a0) as f32,
        a2: (-a2_std * inv_a0) as f32,
    }
}

/// Complex transfer function of one section at normalized angular
/// frequency `w` (radians per sample).
///
/// With pre-negated feedback terms:
/// `H(z) = (b0 + b1 z^-1 + b2 z^-2) / (1 - a1 z^-1 - a2 z^-2)`.
#[inline]
pub fn biquad_response(c: &BiquadX1, w: f32) -> Complex<f32> {
    let z1 = Complex::from_polar(1.0, -w);
    let z2 = z1 * z1;
    let num = Complex::new(c.b0, 0.0) + z1 * c.b1 + z2 * c.b2;
    let den = Complex::new(1.0, 0.0) - z1 * c.a1 - z2 * c.a2;
    num / den
}
