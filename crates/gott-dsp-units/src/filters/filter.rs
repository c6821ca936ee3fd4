// SPDX-License-Identifier: LGPL-3.0-or-later

//! High-level IIR filter with parameter management.
//!
//! Wraps a [`Biquad`] cascade from `gott-dsp-lib` with coefficient
//! calculation, dirty-flag recalculation and complex frequency response.
//! The slope is the number of cascaded second-order sections: a slope-2
//! Butterworth lowpass is a 24 dB/oct Linkwitz-Riley section.

use std::f32::consts::{FRAC_1_SQRT_2, PI};

use gott_dsp_lib::filters::{biquad_process, biquad_process_inplace};
use gott_dsp_lib::types::{BIQUAD_SECTIONS_MAX, Biquad, BiquadX1};
use num_complex::Complex;

use super::coeffs::{FilterType, biquad_response, calc_biquad_coeffs};

/// Filter configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterParams {
    /// Filter type.
    pub filter_type: FilterType,
    /// Cutoff or center frequency in Hz.
    pub frequency: f32,
    /// Number of cascaded sections, `1..=BIQUAD_SECTIONS_MAX`.
    pub slope: usize,
    /// Quality factor of each section.
    pub q: f32,
    /// Total gain in dB for shelving and peaking types, split evenly
    /// between the sections.
    pub gain: f32,
}

impl Default for FilterParams {
    fn default() -> Self {
        Self {
            filter_type: FilterType::Off,
            frequency: 1000.0,
            slope: 1,
            q: FRAC_1_SQRT_2,
            gain: 0.0,
        }
    }
}

/// High-level IIR filter with automatic coefficient management.
///
/// Uses the builder pattern for parameter configuration. Call
/// [`update_settings`](Filter::update_settings) after changing parameters
/// to recalculate coefficients; processing does it implicitly.
///
/// # Examples
///
/// ```
/// use gott_dsp_units::filters::filter::Filter;
/// use gott_dsp_units::filters::coeffs::FilterType;
///
/// let mut filt = Filter::new();
/// filt.set_sample_rate(48000.0)
///     .set_filter_type(FilterType::Lowpass)
///     .set_frequency(1000.0)
///     .set_slope(2)
///     .update_settings();
///
/// let input = [1.0, 0.0, 0.0, 0.0];
/// let mut output = [0.0; 4];
/// filt.process(&mut output, &input);
/// ```
#[derive(Debug, Clone)]
pub struct Filter {
    params: FilterParams,
    sample_rate: f32,
    dirty: bool,
    biquad: Biquad,
}

impl Default for Filter {
    fn default() -> Self {
        Self::new()
    }
}

impl Filter {
    /// Create a new filter: Off, 48 kHz, 1000 Hz, one Butterworth section.
    pub fn new() -> Self {
        Self {
            params: FilterParams::default(),
            sample_rate: 48000.0,
            dirty: true,
            biquad: Biquad::default(),
        }
    }

    /// Set the sample rate in Hz and clear the state.
    pub fn set_sample_rate(&mut self, sr: f32) -> &mut Self {
        if self.sample_rate != sr {
            self.sample_rate = sr;
            self.dirty = true;
            self.biquad.reset();
        }
        self
    }

    /// Replace all parameters at once.
    pub fn set_params(&mut self, params: FilterParams) -> &mut Self {
        if self.params != params {
            self.params = params;
            self.dirty = true;
        }
        self
    }

    /// Set the filter type.
    pub fn set_filter_type(&mut self, ft: FilterType) -> &mut Self {
        self.set_params(FilterParams {
            filter_type: ft,
            ..self.params
        })
    }

    /// Set the cutoff/center frequency in Hz.
    pub fn set_frequency(&mut self, freq: f32) -> &mut Self {
        self.set_params(FilterParams {
            frequency: freq,
            ..self.params
        })
    }

    /// Set the number of cascaded sections.
    pub fn set_slope(&mut self, slope: usize) -> &mut Self {
        self.set_params(FilterParams {
            slope,
            ..self.params
        })
    }

    /// Set the quality factor of each section.
    pub fn set_q(&mut self, q: f32) -> &mut Self {
        self.set_params(FilterParams { q, ..self.params })
    }

    /// Set the gain in dB (shelving and peaking types).
    pub fn set_gain(&mut self, gain_db: f32) -> &mut Self {
        self.set_params(FilterParams {
            gain: gain_db,
            ..self.params
        })
    }

    /// Current parameters.
    pub fn params(&self) -> &FilterParams {
        &self.params
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Parameters changed since the last coefficient update.
    pub fn modified(&self) -> bool {
        self.dirty
    }

    /// Recalculate the coefficients if any parameter has changed.
    ///
    /// # Returns
    /// `true` if the coefficients were rebuilt
    pub fn update_settings(&mut self) -> bool {
        if !self.dirty {
            return false;
        }
        self.dirty = false;

        let p = &self.params;
        if p.filter_type == FilterType::Off {
            self.biquad.set_sections(&[]);
            return true;
        }

        let slope = p.slope.clamp(1, BIQUAD_SECTIONS_MAX);
        let nyquist = self.sample_rate * 0.5;
        let freq = p.frequency.clamp(1.0, nyquist * 0.999);
        let section = calc_biquad_coeffs(
            p.filter_type,
            self.sample_rate,
            freq,
            p.q,
            p.gain / slope as f32,
        );

        let sections = [section; BIQUAD_SECTIONS_MAX];
        self.biquad.set_sections(&sections[..slope]);
        true
    }

    /// Active sections.
    pub fn sections(&self) -> &[BiquadX1] {
        self.biquad.active()
    }

    /// Reset the filter state (clear delay memory).
    pub fn clear(&mut self) {
        self.biquad.reset();
    }

    /// Process audio from `src` into `dst`.
    pub fn process(&mut self, dst: &mut [f32], src: &[f32]) {
        self.update_settings();
        let n = dst.len().min(src.len());
        biquad_process(&mut dst[..n], &src[..n], &mut self.biquad);
    }

    /// Process audio in place.
    pub fn process_inplace(&mut self, buf: &mut [f32]) {
        self.update_settings();
        biquad_process_inplace(buf, &mut self.biquad);
    }

    /// Complex frequency response at `freq` Hz.
    ///
    /// Uses the current coefficients; call
    /// [`update_settings`](Filter::update_settings) first if parameters
    /// were changed.
    pub fn freq_response(&self, freq: f32) -> Complex<f32> {
        let w = 2.0 * PI * freq / self.sample_rate;
        self.biquad
            .active()
            .iter()
            .fold(Complex::new(1.0, 0.0), |acc, c| acc * biquad_response(c, w))
    }

    /// Fill `dst` with the complex response at each frequency of `freqs`.
    pub fn freq_chart(&self, dst: &mut [Complex<f32>], freqs: &[f32]) {
        for (d, &f) in dst.iter_mut().zip(freqs.iter()) {
            *d = self.freq_response(f);
        }
    }
}
