// SPDX-License-Identifier: LGPL-3.0-or-later

//! Bank of shelving filters whose gain is modulated per sample.
//!
//! Each filter slot holds a shelf (or a ladder of two shelves) at fixed
//! frequencies. The gain comes from a control buffer, one value per
//! sample, and the coefficients are recomputed for every sample from a
//! cached [`ShelfPrototype`]. Applying the slots of all bands one after
//! another reshapes the spectrum directly, with no band extraction and
//! no added latency.

use std::f32::consts::{FRAC_1_SQRT_2, PI};

use gott_dsp_lib::filters::biquad_tick;
use gott_dsp_lib::types::BiquadX1;
use num_complex::Complex;

use super::coeffs::{ShelfPrototype, biquad_response};
use crate::consts::{GAIN_AMP_M_72_DB, GAIN_AMP_P_72_DB};

/// Maximum number of cascaded sections per shelf.
pub const DYN_FILTER_SLOPE_MAX: usize = 4;

/// Shape of a dynamic filter slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DynamicFilterType {
    /// Pass-through.
    #[default]
    Off,
    /// Low shelf at `frequency`: gain below, unity above.
    LowShelf,
    /// High shelf at `frequency`: unity below, gain above.
    HighShelf,
    /// High shelf with gain at `frequency` followed by a high shelf with
    /// the reciprocal gain at `frequency2`: gain between the two, unity
    /// outside.
    Ladder,
}

/// Parameters of one slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DynamicFilterParams {
    /// Shape.
    pub filter_type: DynamicFilterType,
    /// Shelf frequency in Hz (lower edge for [`DynamicFilterType::Ladder`]).
    pub frequency: f32,
    /// Upper edge in Hz, used by [`DynamicFilterType::Ladder`].
    pub frequency2: f32,
    /// Cascaded sections per shelf, `1..=DYN_FILTER_SLOPE_MAX`.
    pub slope: usize,
    /// Quality factor of each section.
    pub q: f32,
}

impl Default for DynamicFilterParams {
    fn default() -> Self {
        Self {
            filter_type: DynamicFilterType::Off,
            frequency: 1000.0,
            frequency2: 1000.0,
            slope: 1,
            q: FRAC_1_SQRT_2,
        }
    }
}

/// Gain range a slot can realize. A ladder divides by the gain, so zero
/// and non-finite control values are pulled into this range.
#[inline]
fn limit_gain(gain: f32) -> f32 {
    gain.max(GAIN_AMP_M_72_DB).min(GAIN_AMP_P_72_DB)
}

#[derive(Debug, Clone)]
struct Slot {
    params: DynamicFilterParams,
    lo: ShelfPrototype,
    hi: ShelfPrototype,
    d: [[f32; 2]; DYN_FILTER_SLOPE_MAX * 2],
}

impl Slot {
    fn new(sample_rate: f32) -> Self {
        let p = DynamicFilterParams::default();
        Self {
            params: p,
            lo: ShelfPrototype::new(sample_rate, p.frequency, p.q),
            hi: ShelfPrototype::new(sample_rate, p.frequency2, p.q),
            d: [[0.0; 2]; DYN_FILTER_SLOPE_MAX * 2],
        }
    }

    fn rebuild(&mut self, sample_rate: f32) {
        let nyquist = sample_rate * 0.5 * 0.999;
        let f1 = self.params.frequency.clamp(1.0, nyquist);
        let f2 = self.params.frequency2.clamp(1.0, nyquist);
        self.lo = ShelfPrototype::new(sample_rate, f1, self.params.q);
        self.hi = ShelfPrototype::new(sample_rate, f2, self.params.q);
    }

    /// Sections for gain `g`: first stage at `lo`, optional second at `hi`.
    #[inline]
    fn sections(&self, g: f32) -> (BiquadX1, Option<BiquadX1>) {
        match self.params.filter_type {
            DynamicFilterType::Off => (BiquadX1::IDENTITY, None),
            DynamicFilterType::LowShelf => (self.lo.low_shelf(g), None),
            DynamicFilterType::HighShelf => (self.lo.high_shelf(g), None),
            DynamicFilterType::Ladder => (self.lo.high_shelf(g), Some(self.hi.high_shelf(1.0 / g))),
        }
    }

    #[inline]
    fn slope(&self) -> usize {
        self.params.slope.clamp(1, DYN_FILTER_SLOPE_MAX)
    }

    #[inline]
    fn tick(&mut self, x: f32, gain: f32) -> f32 {
        let slope = self.slope();
        let gain = limit_gain(gain);
        let g = if slope > 1 {
            gain.powf(1.0 / slope as f32)
        } else {
            gain
        };
        let (first, second) = self.sections(g);

        let mut y = x;
        for j in 0..slope {
            y = biquad_tick(&first, &mut self.d[j], y);
        }
        if let Some(second) = second {
            for j in 0..slope {
                y = biquad_tick(&second, &mut self.d[DYN_FILTER_SLOPE_MAX + j], y);
            }
        }
        y
    }
}

/// Bank of gain-modulated shelving filters.
///
/// # Examples
///
/// ```
/// use gott_dsp_units::filters::dynamic_filters::{
///     DynamicFilterParams, DynamicFilterType, DynamicFilters,
/// };
///
/// let mut bank = DynamicFilters::new(2);
/// bank.set_sample_rate(48000.0);
/// bank.set_params(0, DynamicFilterParams {
///     filter_type: DynamicFilterType::LowShelf,
///     frequency: 200.0,
///     ..Default::default()
/// });
///
/// let mut buf = vec![0.5f32; 64];
/// let gain = vec![0.5f32; 64];
/// bank.process_inplace(0, &mut buf, &gain);
/// ```
#[derive(Debug, Clone)]
pub struct DynamicFilters {
    sample_rate: f32,
    slots: Vec<Slot>,
}

impl DynamicFilters {
    /// Create a bank of `count` pass-through slots at 48 kHz.
    pub fn new(count: usize) -> Self {
        Self {
            sample_rate: 48000.0,
            slots: (0..count).map(|_| Slot::new(48000.0)).collect(),
        }
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Bank has no slots.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Set the sample rate and clear all filter states.
    pub fn set_sample_rate(&mut self, sr: f32) {
        if self.sample_rate == sr {
            return;
        }
        self.sample_rate = sr;
        for slot in &mut self.slots {
            slot.rebuild(sr);
            slot.d = [[0.0; 2]; DYN_FILTER_SLOPE_MAX * 2];
        }
    }

    /// Configure slot `id`. Out-of-range ids are ignored.
    ///
    /// # Returns
    /// `true` if the parameters changed
    pub fn set_params(&mut self, id: usize, params: DynamicFilterParams) -> bool {
        let sr = self.sample_rate;
        let Some(slot) = self.slots.get_mut(id) else {
            return false;
        };
        if slot.params == params {
            return false;
        }
        let shape_changed = slot.params.filter_type != params.filter_type;
        slot.params = params;
        slot.rebuild(sr);
        if shape_changed {
            slot.d = [[0.0; 2]; DYN_FILTER_SLOPE_MAX * 2];
        }
        true
    }

    /// Parameters of slot `id`.
    pub fn params(&self, id: usize) -> Option<&DynamicFilterParams> {
        self.slots.get(id).map(|s| &s.params)
    }

    /// Clear the delay memory of every slot.
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            slot.d = [[0.0; 2]; DYN_FILTER_SLOPE_MAX * 2];
        }
    }

    /// Filter `src` into `dst` through slot `id` with per-sample `gain`.
    pub fn process(&mut self, id: usize, dst: &mut [f32], src: &[f32], gain: &[f32]) {
        let Some(slot) = self.slots.get_mut(id) else {
            let n = dst.len().min(src.len());
            dst[..n].copy_from_slice(&src[..n]);
            return;
        };
        for ((d, &x), &g) in dst.iter_mut().zip(src.iter()).zip(gain.iter()) {
            *d = slot.tick(x, g);
        }
    }

    /// Filter `buf` in place through slot `id` with per-sample `gain`.
    pub fn process_inplace(&mut self, id: usize, buf: &mut [f32], gain: &[f32]) {
        let Some(slot) = self.slots.get_mut(id) else {
            return;
        };
        for (s, &g) in buf.iter_mut().zip(gain.iter()) {
            *s = slot.tick(*s, g);
        }
    }

    /// Complex response of slot `id` at `freq` Hz for a static `gain`.
    pub fn freq_response(&self, id: usize, freq: f32, gain: f32) -> Complex<f32> {
        let Some(slot) = self.slots.get(id) else {
            return Complex::new(1.0, 0.0);
        };
        let slope = slot.slope();
        let g = limit_gain(gain).powf(1.0 / slope as f32);
        let w = 2.0 * PI * freq / self.sample_rate;
        let (first, second) = slot.sections(g);

        let mut h = biquad_response(&first, w).powu(slope as u32);
        if let Some(second) = second {
            h *= biquad_response(&second, w).powu(slope as u32);
        }
        h
    }

    /// Fill `dst` with the response of slot `id` at each of `freqs`.
    pub fn freq_chart(&self, id: usize, dst: &mut [Complex<f32>], freqs: &[f32], gain: f32) {
        for (d, &f) in dst.iter_mut().zip(freqs.iter()) {
            *d = self.freq_response(id, f, gain);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;

    const SR: f32 = 48000.0;

    fn bank_with(params: DynamicFilterParams) -> DynamicFilters {
        let mut bank = DynamicFilters::new(1);
        bank.set_sample_rate(SR);
        bank.set_params(0, params);
        bank
    }

    fn ladder(f1: f32, f2: f32) -> DynamicFilterParams {
        DynamicFilterParams {
            filter_type: DynamicFilterType::Ladder,
            frequency: f1,
            frequency2: f2,
            ..Default::default()
        }
    }

    #[test]
    fn unity_gain_is_transparent() {
        let mut bank = bank_with(ladder(200.0, 2000.0));
        let input: Vec<f32> = (0..512).map(|i| (i as f32 * 0.13).sin()).collect();
        let mut buf = input.clone();
        bank.process_inplace(0, &mut buf, &vec![1.0; 512]);
        for (a, b) in buf.iter().zip(input.iter()) {
            assert_approx_eq!(f32, *a, *b, epsilon = 1e-5);
        }
    }

    #[test]
    fn low_shelf_applies_gain_at_dc() {
        let mut bank = bank_with(DynamicFilterParams {
            filter_type: DynamicFilterType::LowShelf,
            frequency: 500.0,
            ..Default::default()
        });
        let mut buf = vec![1.0f32; 48000];
        bank.process_inplace(0, &mut buf, &vec![0.25; 48000]);
        assert_approx_eq!(f32, buf[47999], 0.25, epsilon = 1e-3);
    }

    #[test]
    fn ladder_response_has_gain_inside_only() {
        let bank = bank_with(ladder(200.0, 4000.0));
        let g = 0.1;
        assert_approx_eq!(f32, bank.freq_response(0, 10.0, g).norm(), 1.0, epsilon = 2e-2);
        assert_approx_eq!(f32, bank.freq_response(0, 20000.0, g).norm(), 1.0, epsilon = 5e-2);
        let mid = bank.freq_response(0, 900.0, g).norm();
        assert!(mid < 0.2, "band centre should be attenuated, got {mid}");
    }

    #[test]
    fn high_shelf_response() {
        let bank = bank_with(DynamicFilterParams {
            filter_type: DynamicFilterType::HighShelf,
            frequency: 1000.0,
            ..Default::default()
        });
        assert_approx_eq!(f32, bank.freq_response(0, 5.0, 4.0).norm(), 1.0, epsilon = 1e-3);
        assert!(bank.freq_response(0, 15000.0, 4.0).norm() > 3.5);
    }

    #[test]
    fn slope_splits_gain_between_sections() {
        let bank = bank_with(DynamicFilterParams {
            filter_type: DynamicFilterType::LowShelf,
            frequency: 1000.0,
            slope: 3,
            ..Default::default()
        });
        assert_approx_eq!(f32, bank.freq_response(0, 1.0, 8.0).norm(), 8.0, epsilon = 5e-2);
    }

    #[test]
    fn zero_gain_keeps_ladder_finite() {
        let mut bank = bank_with(ladder(200.0, 2000.0));
        let input: Vec<f32> = (0..4096).map(|i| (i as f32 * 0.05).sin()).collect();
        let mut gain = vec![0.0f32; 4096];
        gain[1000..].fill(1.0);
        gain[100] = f32::NAN;

        let mut buf = input.clone();
        bank.process_inplace(0, &mut buf, &gain);
        assert!(buf.iter().all(|v| v.is_finite()));
        assert!(bank.freq_response(0, 900.0, 0.0).norm().is_finite());

        // Transparent again once the gain returns to unity
        let tail = &buf[3000..];
        assert!(tail.iter().zip(&input[3000..]).all(|(a, b)| (a - b).abs() < 1e-2));
    }

    #[test]
    fn set_params_reports_change() {
        let mut bank = DynamicFilters::new(2);
        assert!(bank.set_params(1, ladder(100.0, 1000.0)));
        assert!(!bank.set_params(1, ladder(100.0, 1000.0)));
        assert!(!bank.set_params(7, ladder(100.0, 1000.0)));
        assert_eq!(bank.params(1).map(|p| p.frequency), Some(100.0));
    }

    #[test]
    fn process_matches_inplace() {
        let mut a = bank_with(ladder(300.0, 3000.0));
        let mut b = a.clone();
        let src: Vec<f32> = (0..256).map(|i| ((i * 13) % 7) as f32 - 3.0).collect();
        let gain: Vec<f32> = (0..256).map(|i| 0.5 + (i as f32 / 512.0)).collect();

        let mut dst = vec![0.0; 256];
        a.process(0, &mut dst, &src, &gain);
        let mut buf = src;
        b.process_inplace(0, &mut buf, &gain);
        assert_eq!(dst, buf);
    }
}
