// SPDX-License-Identifier: LGPL-3.0-or-later

//! Envelope boost: a rising spectral tilt for the sidechain path.
//!
//! Music carries most of its energy in the low end, so an untreated
//! detector reacts mostly to bass. The boost tilts the sidechain by
//! +3 dB/oct (pink to white) or +6 dB/oct (brown to white) before
//! detection.
//!
//! The tilt is a cascade of first-order shelves spread logarithmically
//! between 20 Hz and 20 kHz (or Nyquist), each contributing an equal
//! share of the total rise. Shelves are discretized either with the
//! bilinear transform or with the matched-z transform. The cascade is
//! normalized to 0 dB at [`SPEC_FREQ_DFL`].

use std::f32::consts::PI;

use gott_dsp_lib::filters::biquad_process_inplace;
use gott_dsp_lib::types::{BIQUAD_SECTIONS_MAX, Biquad, BiquadX1};
use num_complex::Complex;

use super::coeffs::biquad_response;
use crate::consts::SPEC_FREQ_DFL;

const NUM_STAGES: usize = BIQUAD_SECTIONS_MAX;
const TILT_FREQ_LOW: f32 = 20.0;
const TILT_FREQ_HIGH: f32 = 20000.0;

/// Sidechain envelope boost mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnvelopeBoost {
    /// No boost.
    Off,
    /// +3 dB/oct, bilinear transform.
    #[default]
    BtPink,
    /// +3 dB/oct, matched-z transform.
    MtPink,
    /// +6 dB/oct, bilinear transform.
    BtBrown,
    /// +6 dB/oct, matched-z transform.
    MtBrown,
}

impl EnvelopeBoost {
    /// Tilt in dB per octave.
    pub fn slope_db(self) -> f32 {
        match self {
            Self::Off => 0.0,
            Self::BtPink | Self::MtPink => 3.0,
            Self::BtBrown | Self::MtBrown => 6.0,
        }
    }

    fn matched(self) -> bool {
        matches!(self, Self::MtPink | Self::MtBrown)
    }
}

/// Envelope boost filter for one sidechain channel.
///
/// # Examples
///
/// ```
/// use gott_dsp_units::filters::envelope_boost::{EnvelopeBoost, EnvelopeBoostFilter};
///
/// let mut boost = EnvelopeBoostFilter::new();
/// boost.set_sample_rate(48000.0).set_mode(EnvelopeBoost::BtPink);
///
/// let mut buf = vec![0.0f32; 256];
/// boost.process_inplace(&mut buf);
/// ```
#[derive(Debug, Clone)]
pub struct EnvelopeBoostFilter {
    sample_rate: f32,
    mode: EnvelopeBoost,
    dirty: bool,
    cascade: Biquad,
}

impl Default for EnvelopeBoostFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl EnvelopeBoostFilter {
    /// Create a filter at 48 kHz in the default mode.
    pub fn new() -> Self {
        Self {
            sample_rate: 48000.0,
            mode: EnvelopeBoost::default(),
            dirty: true,
            cascade: Biquad::default(),
        }
    }

    /// Set the sample rate in Hz.
    pub fn set_sample_rate(&mut self, sr: f32) -> &mut Self {
        if self.sample_rate != sr {
            self.sample_rate = sr;
            self.dirty = true;
            self.cascade.reset();
        }
        self
    }

    /// Set the boost mode.
    pub fn set_mode(&mut self, mode: EnvelopeBoost) -> &mut Self {
        if self.mode != mode {
            self.mode = mode;
            self.dirty = true;
        }
        self
    }

    /// Current mode.
    pub fn mode(&self) -> EnvelopeBoost {
        self.mode
    }

    /// Recalculate coefficients if parameters have changed.
    pub fn update_settings(&mut self) {
        if !self.dirty {
            return;
        }
        self.dirty = false;

        if self.mode == EnvelopeBoost::Off {
            self.cascade.set_sections(&[]);
            return;
        }

        let f_low = TILT_FREQ_LOW;
        let f_high = (self.sample_rate * 0.45).min(TILT_FREQ_HIGH);
        let octaves_span = (f_high / f_low).log2();
        let gain_per_stage = self.mode.slope_db() * octaves_span / NUM_STAGES as f32;
        let gain = 10.0_f32.powf(gain_per_stage / 20.0);

        let mut sections = [BiquadX1::IDENTITY; NUM_STAGES];
        for (i, s) in sections.iter_mut().enumerate() {
            let t = (i as f32 + 0.5) / NUM_STAGES as f32;
            let freq = f_low * (f_high / f_low).powf(t);
            *s = if self.mode.matched() {
                matched_first_order_shelf(self.sample_rate, freq, gain)
            } else {
                bilinear_first_order_shelf(self.sample_rate, freq, gain)
            };
        }

        // Unity gain at the reference frequency
        let w = 2.0 * PI * SPEC_FREQ_DFL / self.sample_rate;
        let h = sections
            .iter()
            .fold(Complex::new(1.0f32, 0.0), |acc, c| acc * biquad_response(c, w));
        let k = 1.0 / h.norm().max(f32::MIN_POSITIVE);
        sections[0].b0 *= k;
        sections[0].b1 *= k;

        self.cascade.set_sections(&sections);
    }

    /// Reset filter state.
    pub fn clear(&mut self) {
        self.cascade.reset();
    }

    /// Apply the boost in place.
    pub fn process_inplace(&mut self, buf: &mut [f32]) {
        self.update_settings();
        biquad_process_inplace(buf, &mut self.cascade);
    }

    /// Complex response at `freq` Hz.
    pub fn freq_response(&self, freq: f32) -> Complex<f32> {
        let w = 2.0 * PI * freq / self.sample_rate;
        self.cascade
            .active()
            .iter()
            .fold(Complex::new(1.0, 0.0), |acc, c| acc * biquad_response(c, w))
    }
}

/// First-order high shelf via the bilinear transform.
///
/// Analog prototype `H(s) = (A*s + wc) / (s + wc)`: unity at DC, `A` at
/// high frequencies.
fn bilinear_first_order_shelf(sample_rate: f32, freq: f32, gain: f32) -> BiquadX1 {
    let wc = (PI * freq / sample_rate).tan();
    let k = 1.0 / (1.0 + wc);
    BiquadX1 {
        b0: (gain + wc) * k,
        b1: (wc - gain) * k,
        b2: 0.0,
        a1: -(wc - 1.0) * k,
        a2: 0.0,
    }
}

/// First-order high shelf via the matched-z transform.
///
/// Pole at `-wc`, zero at `-wc/A`, normalized to unity at DC.
fn matched_first_order_shelf(sample_rate: f32, freq: f32, gain: f32) -> BiquadX1 {
    let wc = 2.0 * PI * freq / sample_rate;
    let zp = (-wc).exp();
    let zz = (-wc / gain).exp();
    let k = (1.0 - zp) / (1.0 - zz);
    BiquadX1 {
        b0: k,
        b1: -k * zz,
        b2: 0.0,
        a1: zp,
        a2: 0.0,
    }
}
