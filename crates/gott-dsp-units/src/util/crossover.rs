// SPDX-License-Identifier: LGPL-3.0-or-later

//! Linkwitz-Riley crossover with per-band gain control.
//!
//! Each split uses an LR4 pair (two cascaded Butterworth sections per
//! path, 24 dB/oct) and a second-order all-pass at the same frequency.
//! The low-pass and high-pass halves of an LR4 split sum to exactly that
//! all-pass, so the bands are reconstructed without a notch:
//!
//! - band `j` is the low-pass at split `j` of the running residual;
//! - the residual then continues through the high-pass at split `j`;
//! - before band `j` is added, the sum of the lower bands goes through
//!   the all-pass at split `j`, matching the phase the residual picked
//!   up;
//! - the last band is the remaining residual.
//!
//! With unity gains the output equals the input passed through the
//! all-pass of every split, which is what [`Crossover::process_dry`]
//! computes for the dry path.

use std::f32::consts::FRAC_1_SQRT_2;

use gott_dsp_lib::pmath::{add2, mul2};
use num_complex::Complex;

use crate::filters::coeffs::FilterType;
use crate::filters::filter::Filter;

/// Maximum number of bands.
pub const CROSSOVER_BANDS_MAX: usize = 4;

/// Maximum number of split points.
pub const CROSSOVER_SPLITS_MAX: usize = CROSSOVER_BANDS_MAX - 1;

/// Size of the internal work buffers.
const CROSSOVER_CHUNK: usize = 0x400;

/// Sections per low-pass/high-pass path (LR4).
const LR4_SLOPE: usize = 2;

/// Gain-controlled Linkwitz-Riley crossover.
///
/// # Examples
///
/// ```
/// use gott_dsp_units::util::crossover::Crossover;
///
/// let mut xover = Crossover::new();
/// xover.set_sample_rate(48000.0);
/// xover.set_bands(3);
/// xover.set_split(0, 200.0);
/// xover.set_split(1, 2000.0);
/// xover.update_settings();
///
/// let input = vec![0.5f32; 256];
/// let unity = vec![1.0f32; 256];
/// let mut out = vec![0.0f32; 256];
/// xover.process(&mut out, &input, &[&unity, &unity, &unity]);
/// ```
#[derive(Debug, Clone)]
pub struct Crossover {
    sample_rate: f32,
    bands: usize,
    splits: [f32; CROSSOVER_SPLITS_MAX],
    pass: [Filter; CROSSOVER_SPLITS_MAX],
    reject: [Filter; CROSSOVER_SPLITS_MAX],
    allpass: [Filter; CROSSOVER_SPLITS_MAX],
    dry: [Filter; CROSSOVER_SPLITS_MAX],
    residual: Vec<f32>,
    band: Vec<f32>,
    dirty: bool,
}

impl Default for Crossover {
    fn default() -> Self {
        Self::new()
    }
}

impl Crossover {
    /// Create a 2-band crossover at 48 kHz with splits at 1, 4 and 10 kHz.
    pub fn new() -> Self {
        Self {
            sample_rate: 48000.0,
            bands: 2,
            splits: [1000.0, 4000.0, 10000.0],
            pass: std::array::from_fn(|_| Filter::new()),
            reject: std::array::from_fn(|_| Filter::new()),
            allpass: std::array::from_fn(|_| Filter::new()),
            dry: std::array::from_fn(|_| Filter::new()),
            residual: vec![0.0; CROSSOVER_CHUNK],
            band: vec![0.0; CROSSOVER_CHUNK],
            dirty: true,
        }
    }

    /// Set the sample rate in Hz.
    pub fn set_sample_rate(&mut self, sr: f32) {
        if self.sample_rate != sr {
            self.sample_rate = sr;
            self.dirty = true;
        }
    }

    /// Set the number of active bands, `1..=CROSSOVER_BANDS_MAX`.
    pub fn set_bands(&mut self, bands: usize) {
        let bands = bands.clamp(1, CROSSOVER_BANDS_MAX);
        if self.bands != bands {
            self.bands = bands;
            self.dirty = true;
        }
    }

    /// Set split point `id` in Hz. Out-of-range ids are ignored.
    pub fn set_split(&mut self, id: usize, freq: f32) {
        match self.splits.get_mut(id) {
            Some(f) if *f != freq => {
                *f = freq;
                self.dirty = true;
            }
            _ => {}
        }
    }

    /// Number of active bands.
    pub fn bands(&self) -> usize {
        self.bands
    }

    /// Split point `id` in Hz.
    pub fn split(&self, id: usize) -> Option<f32> {
        self.splits.get(id).copied()
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Settings changed since the last rebuild.
    pub fn modified(&self) -> bool {
        self.dirty
    }

    /// Rebuild the split filters if anything changed.
    ///
    /// # Returns
    /// `true` if the filters were rebuilt
    pub fn update_settings(&mut self) -> bool {
        if !self.dirty {
            return false;
        }
        self.dirty = false;

        let sr = self.sample_rate;
        for (i, &freq) in self.splits.iter().enumerate() {
            let active = i + 1 < self.bands;
            let (lp, hp, ap) = if active {
                (FilterType::Lowpass, FilterType::Highpass, FilterType::Allpass)
            } else {
                (FilterType::Off, FilterType::Off, FilterType::Off)
            };
            configure(&mut self.pass[i], sr, lp, freq, LR4_SLOPE);
            configure(&mut self.reject[i], sr, hp, freq, LR4_SLOPE);
            configure(&mut self.allpass[i], sr, ap, freq, 1);
            configure(&mut self.dry[i], sr, ap, freq, 1);
        }
        true
    }

    /// Reset the state of every filter.
    pub fn clear(&mut self) {
        for f in self
            .pass
            .iter_mut()
            .chain(self.reject.iter_mut())
            .chain(self.allpass.iter_mut())
            .chain(self.dry.iter_mut())
        {
            f.clear();
        }
    }

    /// Split `src`, scale band `j` by `vca[j]` sample by sample and sum
    /// the bands into `dst`.
    ///
    /// A band with no gain buffer in `vca` passes at unity.
    pub fn process(&mut self, dst: &mut [f32], src: &[f32], vca: &[&[f32]]) {
        self.update_settings();

        let n = dst.len().min(src.len());
        let mut offset = 0;
        while offset < n {
            let count = (n - offset).min(CROSSOVER_CHUNK);
            let out = &mut dst[offset..offset + count];
            let residual = &mut self.residual[..count];
            let band = &mut self.band[..count];

            residual.copy_from_slice(&src[offset..offset + count]);
            out.fill(0.0);

            for j in 0..self.bands {
                let gain = vca.get(j).and_then(|g| g.get(offset..offset + count));
                if j + 1 < self.bands {
                    if j > 0 {
                        self.allpass[j].process_inplace(out);
                    }
                    self.pass[j].process(band, residual);
                    self.reject[j].process_inplace(residual);
                } else {
                    band.copy_from_slice(residual);
                }
                if let Some(g) = gain {
                    mul2(band, g);
                }
                add2(out, band);
            }

            offset += count;
        }
    }

    /// Pass `buf` through the all-pass of every active split.
    pub fn process_dry(&mut self, buf: &mut [f32]) {
        self.update_settings();
        for f in self.dry.iter_mut().take(self.bands.saturating_sub(1)) {
            f.process_inplace(buf);
        }
    }

    /// Complex response at `freq` Hz with static band gains.
    ///
    /// A band with no entry in `gains` is taken at unity.
    pub fn freq_response(&self, freq: f32, gains: &[f32]) -> Complex<f32> {
        let mut h = Complex::new(0.0, 0.0);
        let mut r = Complex::new(1.0, 0.0);
        for j in 0..self.bands {
            let g = gains.get(j).copied().unwrap_or(1.0);
            if j + 1 < self.bands {
                if j > 0 {
                    h *= self.allpass[j].freq_response(freq);
                }
                h += self.pass[j].freq_response(freq) * r * g;
                r *= self.reject[j].freq_response(freq);
            } else {
                h += r * g;
            }
        }
        h
    }

    /// Fill `dst` with the response at each of `freqs`.
    pub fn freq_chart(&self, dst: &mut [Complex<f32>], freqs: &[f32], gains: &[f32]) {
        for (d, &f) in dst.iter_mut().zip(freqs.iter()) {
            *d = self.freq_response(f, gains);
        }
    }
}

fn configure(f: &mut Filter, sr: f32, ft: FilterType, freq: f32, slope: usize) {
    f.set_sample_rate(sr)
        .set_filter_type(ft)
        .set_frequency(freq)
        .set_slope(slope)
        .set_q(FRAC_1_SQRT_2)
        .update_settings();
}
