// SPDX-License-Identifier: LGPL-3.0-or-later

//! Linear-phase crossover using FFT overlap-add.
//!
//! # Algorithm
//!
//! 1. Collect `N/2` new samples (50% overlap) and window the last `N`
//!    samples with a periodic Hann window
//! 2. Forward FFT
//! 3. For each enabled band, multiply the spectrum by the band's real
//!    (zero-phase) mask and inverse-FFT it
//! 4. Overlap-add into the band's accumulator and emit the completed
//!    half frame
//!
//! The masks are built from a low-pass prototype
//! `LP(f) = 1 / (1 + (f/fc)^k)` and its complement `HP = 1 - LP`, where
//! `k = slope / 6` gives the asymptotic slope in dB/oct. Band `j` is
//! `LP_j(f) * HP_0(f) * ... * HP_{j-1}(f)` and the last band has no
//! low-pass, so the masks of all bands sum to one at every bin and the
//! band sum is the input delayed by [`FftCrossover::latency`].
//!
//! Bands are returned synchronously in caller-provided buffers.

use std::f32::consts::PI;

use gott_dsp_lib::fft::FftState;
use num_complex::Complex;

/// Maximum number of bands.
pub const FFT_XOVER_BANDS_MAX: usize = 4;

/// Maximum number of split points.
pub const FFT_XOVER_SPLITS_MAX: usize = FFT_XOVER_BANDS_MAX - 1;

/// Default edge slope in dB/oct.
pub const FFT_XOVER_SLOPE_DFL: f32 = 48.0;

/// Linear-phase FFT crossover.
///
/// # Examples
///
/// ```
/// use gott_dsp_units::util::fft_crossover::FftCrossover;
///
/// let mut xover = FftCrossover::new(10);
/// xover.set_sample_rate(48000.0);
/// xover.set_bands(2);
/// xover.set_split(0, 1000.0);
///
/// let input = vec![0.0f32; 256];
/// let mut low = vec![0.0f32; 256];
/// let mut high = vec![0.0f32; 256];
/// xover.process(&input, &mut [&mut low, &mut high]);
/// assert_eq!(xover.latency(), 1024);
/// ```
#[derive(Debug, Clone)]
pub struct FftCrossover {
    sample_rate: f32,
    fft: FftState,
    bands: usize,
    splits: [f32; FFT_XOVER_SPLITS_MAX],
    slope: f32,
    enabled: [bool; FFT_XOVER_BANDS_MAX],
    window: Vec<f32>,
    /// Last `N` input samples; the newest half is being filled.
    input: Vec<f32>,
    acc: [Vec<f32>; FFT_XOVER_BANDS_MAX],
    out: [Vec<f32>; FFT_XOVER_BANDS_MAX],
    /// Per-band masks over bins `0..=N/2`, pre-scaled by `1/N`.
    masks: [Vec<f32>; FFT_XOVER_BANDS_MAX],
    spectrum: Vec<Complex<f32>>,
    work: Vec<Complex<f32>>,
    pos: usize,
    dirty: bool,
}

impl FftCrossover {
    /// Create a 2-band crossover with an FFT of `2^rank` points.
    pub fn new(rank: usize) -> Self {
        let mut x = Self {
            sample_rate: 48000.0,
            fft: FftState::new(rank),
            bands: 2,
            splits: [1000.0, 4000.0, 10000.0],
            slope: FFT_XOVER_SLOPE_DFL,
            enabled: [true; FFT_XOVER_BANDS_MAX],
            window: Vec::new(),
            input: Vec::new(),
            acc: Default::default(),
            out: Default::default(),
            masks: Default::default(),
            spectrum: Vec::new(),
            work: Vec::new(),
            pos: 0,
            dirty: true,
        };
        x.allocate();
        x
    }

    fn allocate(&mut self) {
        let n = self.fft.size();
        let h = n / 2;
        self.window = (0..n)
            .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / n as f32).cos()))
            .collect();
        self.input = vec![0.0; n];
        for b in 0..FFT_XOVER_BANDS_MAX {
            self.acc[b] = vec![0.0; n];
            self.out[b] = vec![0.0; h];
            self.masks[b] = vec![0.0; h + 1];
        }
        self.spectrum = vec![Complex::new(0.0, 0.0); n];
        self.work = vec![Complex::new(0.0, 0.0); n];
        self.pos = 0;
        self.dirty = true;
    }

    /// Change the FFT rank. Reallocates and clears the state when the
    /// rank differs from the current one.
    pub fn set_rank(&mut self, rank: usize) {
        if self.fft.rank() == rank {
            return;
        }
        self.fft = FftState::new(rank);
        self.allocate();
    }

    /// FFT rank.
    pub fn rank(&self) -> usize {
        self.fft.rank()
    }

    /// Set the sample rate in Hz.
    pub fn set_sample_rate(&mut self, sr: f32) {
        if self.sample_rate != sr {
            self.sample_rate = sr;
            self.dirty = true;
        }
    }

    /// Set the number of active bands, `1..=FFT_XOVER_BANDS_MAX`.
    pub fn set_bands(&mut self, bands: usize) {
        let bands = bands.clamp(1, FFT_XOVER_BANDS_MAX);
        if self.bands != bands {
            self.bands = bands;
            self.dirty = true;
        }
    }

    /// Number of active bands.
    pub fn bands(&self) -> usize {
        self.bands
    }

    /// Set split point `id` in Hz.
    pub fn set_split(&mut self, id: usize, freq: f32) {
        match self.splits.get_mut(id) {
            Some(f) if *f != freq => {
                *f = freq;
                self.dirty = true;
            }
            _ => {}
        }
    }

    /// Set the edge slope in dB/oct.
    pub fn set_slope(&mut self, slope: f32) {
        let slope = slope.max(6.0);
        if self.slope != slope {
            self.slope = slope;
            self.dirty = true;
        }
    }

    /// Enable or disable the output of band `id`. A disabled band
    /// produces silence and costs no inverse transform.
    pub fn enable_band(&mut self, id: usize, enable: bool) {
        if let Some(e) = self.enabled.get_mut(id) {
            *e = enable;
        }
    }

    /// Band `id` is enabled.
    pub fn band_enabled(&self, id: usize) -> bool {
        self.enabled.get(id).copied().unwrap_or(false)
    }

    /// Latency in samples.
    pub fn latency(&self) -> usize {
        self.fft.size()
    }

    /// Settings changed since the masks were last built.
    pub fn modified(&self) -> bool {
        self.dirty
    }

    /// Rebuild the band masks if anything changed.
    ///
    /// # Returns
    /// `true` if the masks were rebuilt
    pub fn update_settings(&mut self) -> bool {
        if !self.dirty {
            return false;
        }
        self.dirty = false;

        let n = self.fft.size();
        let norm = 1.0 / n as f32;
        let bin_hz = self.sample_rate / n as f32;
        for k in 0..=n / 2 {
            let f = k as f32 * bin_hz;
            for b in 0..FFT_XOVER_BANDS_MAX {
                self.masks[b][k] = self.band_gain(b, f) * norm;
            }
        }
        true
    }

    /// Mask value of band `id` at `freq` Hz; zero for inactive bands.
    pub fn band_gain(&self, id: usize, freq: f32) -> f32 {
        if id >= self.bands {
            return 0.0;
        }
        let order = self.slope / 6.0;
        let lowpass = |fc: f32| 1.0 / (1.0 + (freq / fc.max(1.0)).powf(order));

        let mut gain: f32 = self.splits[..id].iter().map(|&fc| 1.0 - lowpass(fc)).product();
        if id + 1 < self.bands {
            gain *= lowpass(self.splits[id]);
        }
        gain
    }

    /// Summed response at `freq` Hz with static band gains. The crossover
    /// is zero-phase apart from its pure delay, so the result is real.
    pub fn freq_response(&self, freq: f32, gains: &[f32]) -> f32 {
        (0..self.bands)
            .map(|b| self.band_gain(b, freq) * gains.get(b).copied().unwrap_or(1.0))
            .sum()
    }

    /// Fill `dst` with the response at each of `freqs`.
    pub fn freq_chart(&self, dst: &mut [Complex<f32>], freqs: &[f32], gains: &[f32]) {
        for (d, &f) in dst.iter_mut().zip(freqs.iter()) {
            *d = Complex::new(self.freq_response(f, gains), 0.0);
        }
    }

    /// Reset the overlap-add state.
    pub fn clear(&mut self) {
        self.input.fill(0.0);
        for b in 0..FFT_XOVER_BANDS_MAX {
            self.acc[b].fill(0.0);
            self.out[b].fill(0.0);
        }
        self.pos = 0;
    }

    /// Split `src` into `bands`, one output per active band.
    ///
    /// Outputs beyond the active band count are left untouched.
    pub fn process(&mut self, src: &[f32], bands: &mut [&mut [f32]]) {
        self.update_settings();

        let n = self.fft.size();
        let h = n / 2;
        let count = bands.len().min(self.bands);

        let mut offset = 0;
        while offset < src.len() {
            let chunk = (h - self.pos).min(src.len() - offset);

            self.input[h + self.pos..h + self.pos + chunk]
                .copy_from_slice(&src[offset..offset + chunk]);
            for (b, dst) in bands.iter_mut().enumerate().take(count) {
                if let Some(d) = dst.get_mut(offset..offset + chunk) {
                    d.copy_from_slice(&self.out[b][self.pos..self.pos + chunk]);
                }
            }

            self.pos += chunk;
            offset += chunk;
            if self.pos >= h {
                self.process_frame();
                self.pos = 0;
            }
        }
    }

    fn process_frame(&mut self) {
        let n = self.fft.size();
        let h = n / 2;

        for ((c, x), w) in self
            .spectrum
            .iter_mut()
            .zip(self.input.iter())
            .zip(self.window.iter())
        {
            *c = Complex::new(x * w, 0.0);
        }
        self.fft.direct(&mut self.spectrum);

        for b in 0..self.bands {
            let acc = &mut self.acc[b];
            if self.enabled[b] {
                let mask = &self.masks[b];
                for k in 0..n {
                    let m = if k <= h { mask[k] } else { mask[n - k] };
                    self.work[k] = self.spectrum[k] * m;
                }
                self.fft.inverse(&mut self.work);
                for (a, y) in acc.iter_mut().zip(self.work.iter()) {
                    *a += y.re;
                }
            }

            self.out[b].copy_from_slice(&acc[..h]);
            acc.copy_within(h.., 0);
            acc[h..].fill(0.0);
        }

        self.input.copy_within(h.., 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    const SR: f32 = 48000.0;

    fn xover(rank: usize, splits: &[f32]) -> FftCrossover {
        let mut x = FftCrossover::new(rank);
        x.set_sample_rate(SR);
        x.set_bands(splits.len() + 1);
        for (i, &f) in splits.iter().enumerate() {
            x.set_split(i, f);
        }
        x
    }

    fn noise(n: usize) -> Vec<f32> {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        (0..n).map(|_| rng.gen_range(-1.0..1.0)).collect()
    }

    fn split(x: &mut FftCrossover, input: &[f32], block: usize) -> Vec<Vec<f32>> {
        let mut outs = vec![vec![0.0; input.len()]; x.bands()];
        let mut offset = 0;
        while offset < input.len() {
            let end = (offset + block).min(input.len());
            let mut refs: Vec<&mut [f32]> =
                outs.iter_mut().map(|o| &mut o[offset..end]).collect();
            x.process(&input[offset..end], &mut refs);
            offset = end;
        }
        outs
    }

    #[test]
    fn latency_is_fft_size() {
        let mut x = FftCrossover::new(10);
        assert_eq!(x.latency(), 1024);
        x.set_rank(12);
        assert_eq!(x.rank(), 12);
        assert_eq!(x.latency(), 4096);
    }

    #[test]
    fn masks_are_complementary() {
        let mut x = xover(10, &[120.0, 2000.0, 7000.0]);
        x.update_settings();
        for f in [0.0, 30.0, 120.0, 500.0, 2000.0, 6999.0, 12000.0, 24000.0] {
            let sum: f32 = (0..4).map(|b| x.band_gain(b, f)).sum();
            assert_approx_eq!(f32, sum, 1.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn edges_have_requested_slope() {
        let x = xover(10, &[1000.0]);
        assert_approx_eq!(f32, x.band_gain(0, 1000.0), 0.5, epsilon = 1e-6);
        assert_approx_eq!(f32, x.band_gain(1, 1000.0), 0.5, epsilon = 1e-6);
        let g2 = 20.0 * x.band_gain(0, 4000.0).log10();
        let g1 = 20.0 * x.band_gain(0, 2000.0).log10();
        assert!((g1 - g2 - 48.0).abs() < 1.0, "slope {}", g1 - g2);
    }

    #[test]
    fn band_sum_is_delayed_input() {
        for block in [1000, 64, 4096] {
            let mut x = xover(10, &[200.0, 2000.0, 9000.0]);
            let latency = x.latency();
            let input = noise(6 * latency);
            let outs = split(&mut x, &input, block);

            for t in 0..input.len() {
                let sum: f32 = outs.iter().map(|o| o[t]).sum();
                let expected = if t >= latency { input[t - latency] } else { 0.0 };
                assert_approx_eq!(f32, sum, expected, epsilon = 1e-4);
            }
        }
    }

    #[test]
    fn low_tone_lands_in_low_band() {
        let mut x = xover(11, &[1000.0]);
        let n = 8 * x.latency();
        let input: Vec<f32> = (0..n).map(|i| (2.0 * PI * 100.0 * i as f32 / SR).sin()).collect();
        let outs = split(&mut x, &input, 512);
        let rms = |b: &[f32]| (b.iter().map(|v| v * v).sum::<f32>() / b.len() as f32).sqrt();
        let tail = n / 2;
        assert!(rms(&outs[0][tail..]) > 0.6);
        assert!(rms(&outs[1][tail..]) < 1e-3);
    }

    #[test]
    fn disabled_band_is_silent() {
        let mut x = xover(9, &[1000.0]);
        x.enable_band(1, false);
        assert!(!x.band_enabled(1));
        let input = noise(4096);
        let outs = split(&mut x, &input, 300);
        assert!(outs[1].iter().all(|&v| v == 0.0));
        assert!(outs[0].iter().any(|&v| v != 0.0));
    }

    #[test]
    fn response_matches_band_gains() {
        let x = xover(10, &[200.0, 2000.0]);
        assert_approx_eq!(f32, x.freq_response(20.0, &[0.5, 1.0, 1.0]), 0.5, epsilon = 1e-3);
        assert_approx_eq!(f32, x.freq_response(20000.0, &[1.0, 1.0, 0.1]), 0.1, epsilon = 1e-3);
        assert_approx_eq!(f32, x.freq_response(700.0, &[1.0; 3]), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn rebuild_only_on_change() {
        let mut x = xover(10, &[500.0]);
        assert!(x.update_settings());
        assert!(!x.update_settings());
        x.set_split(0, 500.0);
        assert!(!x.modified());
        x.set_slope(24.0);
        assert!(x.update_settings());
    }
}
