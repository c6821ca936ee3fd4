// SPDX-License-Identifier: LGPL-3.0-or-later

//! Sidechain level detector for dynamics processors.
//!
//! Combines a mono or stereo sidechain signal into one detection signal
//! according to the configured [`SidechainSource`], then estimates its
//! level with one of the [`SidechainMode`] detectors. The averaging
//! detectors use a window (or time constant) given by the reactivity
//! time. A preamp gain scales the detector output.
//!
//! All buffers are allocated by [`Sidechain::init`] and
//! [`Sidechain::set_sample_rate`]; processing never allocates.

use gott_dsp_lib::msmatrix::{lr_to_mid, lr_to_side, ms_to_left, ms_to_right};
use gott_dsp_lib::pmath::{copy, pamax3, pamin3};

use crate::units::{calculate_tau, millis_to_samples};

/// Size of the internal combination buffer.
const SIDECHAIN_CHUNK: usize = 0x200;

/// Level detection mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SidechainMode {
    /// Instantaneous absolute value.
    Peak,
    /// Root mean square over the reactivity window.
    #[default]
    Rms,
    /// One-pole low-pass of the squared signal, then square root.
    Lpf,
    /// Simple moving average of the absolute value.
    Sma,
}

/// Stereo component fed to the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SidechainSource {
    /// `(L + R) / 2`.
    #[default]
    Middle,
    /// `(L - R) / 2`.
    Side,
    /// Left channel.
    Left,
    /// Right channel.
    Right,
    /// Smaller absolute value of left and right.
    Min,
    /// Larger absolute value of left and right.
    Max,
}

/// Sidechain level detector.
///
/// # Examples
/// ```
/// use gott_dsp_units::util::sidechain::{Sidechain, SidechainMode, SidechainSource};
///
/// let mut sc = Sidechain::new();
/// sc.init(2, 1000.0);
/// sc.set_sample_rate(48000.0);
/// sc.set_mode(SidechainMode::Rms);
/// sc.set_source(SidechainSource::Max);
/// sc.set_reactivity(10.0);
///
/// let left = vec![0.5; 256];
/// let right = vec![0.25; 256];
/// let mut level = vec![0.0; 256];
/// sc.process(&mut level, &[&left, &right]);
/// ```
#[derive(Debug, Clone)]
pub struct Sidechain {
    sample_rate: f32,
    channels: usize,
    mode: SidechainMode,
    source: SidechainSource,
    mid_side: bool,
    reactivity: f32,
    max_reactivity: f32,
    preamp: f32,
    /// Ring of squared or absolute samples for the windowed detectors.
    window: Vec<f32>,
    win_len: usize,
    win_pos: usize,
    acc: f64,
    tau: f32,
    level: f32,
    scratch: Vec<f32>,
    dirty: bool,
}

impl Default for Sidechain {
    fn default() -> Self {
        Self::new()
    }
}

impl Sidechain {
    /// Create a mono RMS detector at 48 kHz with a 10 ms reactivity.
    pub fn new() -> Self {
        let mut sc = Self {
            sample_rate: 48000.0,
            channels: 1,
            mode: SidechainMode::default(),
            source: SidechainSource::default(),
            mid_side: false,
            reactivity: 10.0,
            max_reactivity: 10.0,
            preamp: 1.0,
            window: Vec::new(),
            win_len: 1,
            win_pos: 0,
            acc: 0.0,
            tau: 1.0,
            level: 0.0,
            scratch: vec![0.0; SIDECHAIN_CHUNK],
            dirty: true,
        };
        sc.reallocate();
        sc
    }

    /// Set the channel count (1 or 2) and the largest reactivity in
    /// milliseconds that will ever be requested.
    pub fn init(&mut self, channels: usize, max_reactivity: f32) {
        self.channels = channels.clamp(1, 2);
        self.max_reactivity = max_reactivity.max(0.0);
        self.reactivity = self.reactivity.min(self.max_reactivity);
        self.reallocate();
    }

    /// Set the sample rate in Hz; resizes the detection window.
    pub fn set_sample_rate(&mut self, sr: f32) {
        if self.sample_rate == sr && !self.window.is_empty() {
            return;
        }
        self.sample_rate = sr;
        self.reallocate();
    }

    fn reallocate(&mut self) {
        let cap = millis_to_samples(self.sample_rate, self.max_reactivity).round() as usize + 1;
        if self.window.len() != cap {
            self.window = vec![0.0; cap];
        }
        self.dirty = true;
        self.reset();
    }

    /// Set the detection mode.
    pub fn set_mode(&mut self, mode: SidechainMode) {
        if self.mode != mode {
            self.mode = mode;
            self.dirty = true;
        }
    }

    /// Set the stereo component used for detection.
    pub fn set_source(&mut self, source: SidechainSource) {
        self.source = source;
    }

    /// Inputs are mid/side instead of left/right.
    pub fn set_mid_side(&mut self, mid_side: bool) {
        self.mid_side = mid_side;
    }

    /// Set the reactivity (window length or time constant) in
    /// milliseconds, limited to the maximum given to [`init`](Self::init).
    pub fn set_reactivity(&mut self, ms: f32) {
        let ms = ms.clamp(0.0, self.max_reactivity);
        if self.reactivity != ms {
            self.reactivity = ms;
            self.dirty = true;
        }
    }

    /// Set the linear gain applied to the detected level.
    pub fn set_preamp(&mut self, gain: f32) {
        self.preamp = gain;
    }

    /// Detection mode.
    pub fn mode(&self) -> SidechainMode {
        self.mode
    }

    /// Stereo source.
    pub fn source(&self) -> SidechainSource {
        self.source
    }

    /// Reactivity in milliseconds.
    pub fn reactivity(&self) -> f32 {
        self.reactivity
    }

    /// Preamp gain.
    pub fn preamp(&self) -> f32 {
        self.preamp
    }

    /// Channel count.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Recompute the window length and time constant if needed.
    pub fn update_settings(&mut self) {
        if !self.dirty {
            return;
        }
        self.dirty = false;

        let samples = millis_to_samples(self.sample_rate, self.reactivity);
        let len = (samples.round() as usize).clamp(1, self.window.len().max(1));
        if len != self.win_len {
            self.win_len = len;
            self.clear_window();
        }
        self.tau = calculate_tau(samples);
        if matches!(self.mode, SidechainMode::Rms | SidechainMode::Sma) {
            self.clear_window();
        }
    }

    fn clear_window(&mut self) {
        self.window.fill(0.0);
        self.win_pos = 0;
        self.acc = 0.0;
    }

    /// Reset the detector state.
    pub fn reset(&mut self) {
        self.clear_window();
        self.level = 0.0;
    }

    /// Detect the level of `inputs` (one or two channels) into `dst`.
    ///
    /// An empty `inputs` slice produces silence.
    pub fn process(&mut self, dst: &mut [f32], inputs: &[&[f32]]) {
        self.update_settings();

        let Some(first) = inputs.first() else {
            dst.fill(0.0);
            return;
        };
        let second = if self.channels > 1 { inputs.get(1) } else { None };

        let n = match second {
            Some(r) => dst.len().min(first.len()).min(r.len()),
            None => dst.len().min(first.len()),
        };
        dst[n..].fill(0.0);

        let mut offset = 0;
        while offset < n {
            let count = (n - offset).min(SIDECHAIN_CHUNK);
            let a = &first[offset..offset + count];
            let mut scratch = std::mem::take(&mut self.scratch);
            let buf = &mut scratch[..count];
            match second {
                Some(b) => self.combine(buf, a, &b[offset..offset + count]),
                None => copy(buf, a),
            }
            self.detect(&mut dst[offset..offset + count], buf);
            self.scratch = scratch;
            offset += count;
        }
    }

    fn combine(&self, dst: &mut [f32], a: &[f32], b: &[f32]) {
        if self.mid_side {
            match self.source {
                SidechainSource::Middle => copy(dst, a),
                SidechainSource::Side => copy(dst, b),
                SidechainSource::Left => ms_to_left(dst, a, b),
                SidechainSource::Right => ms_to_right(dst, a, b),
                SidechainSource::Min => {
                    for ((d, m), s) in dst.iter_mut().zip(a.iter()).zip(b.iter()) {
                        *d = (m + s).abs().min((m - s).abs());
                    }
                }
                SidechainSource::Max => {
                    for ((d, m), s) in dst.iter_mut().zip(a.iter()).zip(b.iter()) {
                        *d = (m + s).abs().max((m - s).abs());
                    }
                }
            }
        } else {
            match self.source {
                SidechainSource::Middle => lr_to_mid(dst, a, b),
                SidechainSource::Side => lr_to_side(dst, a, b),
                SidechainSource::Left => copy(dst, a),
                SidechainSource::Right => copy(dst, b),
                SidechainSource::Min => pamin3(dst, a, b),
                SidechainSource::Max => pamax3(dst, a, b),
            }
        }
    }

    fn detect(&mut self, dst: &mut [f32], src: &[f32]) {
        let k = self.preamp;
        match self.mode {
            SidechainMode::Peak => {
                for (d, x) in dst.iter_mut().zip(src.iter()) {
                    *d = x.abs() * k;
                }
            }
            SidechainMode::Rms => {
                let norm = 1.0 / self.win_len as f64;
                for (d, x) in dst.iter_mut().zip(src.iter()) {
                    let v = x * x;
                    self.push(v);
                    *d = ((self.acc * norm).max(0.0) as f32).sqrt() * k;
                }
            }
            SidechainMode::Lpf => {
                for (d, x) in dst.iter_mut().zip(src.iter()) {
                    self.level += self.tau * (x * x - self.level);
                    *d = self.level.max(0.0).sqrt() * k;
                }
            }
            SidechainMode::Sma => {
                let norm = 1.0 / self.win_len as f64;
                for (d, x) in dst.iter_mut().zip(src.iter()) {
                    self.push(x.abs());
                    *d = (self.acc * norm).max(0.0) as f32 * k;
                }
            }
        }
    }

    #[inline]
    fn push(&mut self, v: f32) {
        let old = self.window[self.win_pos];
        self.window[self.win_pos] = v;
        self.acc += f64::from(v) - f64::from(old);
        self.win_pos += 1;
        if self.win_pos >= self.win_len {
            self.win_pos = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;
    use std::f32::consts::{FRAC_1_SQRT_2, PI};

    const SR: f32 = 48000.0;

    fn detector(channels: usize, mode: SidechainMode, reactivity: f32) -> Sidechain {
        let mut sc = Sidechain::new();
        sc.init(channels, 100.0);
        sc.set_sample_rate(SR);
        sc.set_mode(mode);
        sc.set_reactivity(reactivity);
        sc
    }

    fn sine(amp: f32, freq: f32, n: usize) -> Vec<f32> {
        (0..n)
            .map(|i| amp * (2.0 * PI * freq * i as f32 / SR).sin())
            .collect()
    }

    #[test]
    fn peak_is_absolute_value() {
        let mut sc = detector(1, SidechainMode::Peak, 10.0);
        let input = [0.5, -0.75, 0.0, -0.1];
        let mut out = [0.0; 4];
        sc.process(&mut out, &[&input]);
        assert_eq!(out, [0.5, 0.75, 0.0, 0.1]);
    }

    #[test]
    fn rms_of_sine() {
        let mut sc = detector(1, SidechainMode::Rms, 10.0);
        let input = sine(0.5, 1000.0, 4800);
        let mut out = vec![0.0; 4800];
        sc.process(&mut out, &[&input]);
        assert_approx_eq!(f32, out[4000], 0.5 * FRAC_1_SQRT_2, epsilon = 1e-3);
    }

    #[test]
    fn sma_of_sine() {
        let mut sc = detector(1, SidechainMode::Sma, 10.0);
        let input = sine(1.0, 1000.0, 4800);
        let mut out = vec![0.0; 4800];
        sc.process(&mut out, &[&input]);
        assert_approx_eq!(f32, out[4000], 2.0 / PI, epsilon = 2e-3);
    }

    #[test]
    fn lpf_converges_to_dc_level() {
        let mut sc = detector(1, SidechainMode::Lpf, 5.0);
        let input = vec![0.8; 48000];
        let mut out = vec![0.0; 48000];
        sc.process(&mut out, &[&input]);
        assert_approx_eq!(f32, out[47999], 0.8, epsilon = 1e-4);
        assert!(out[10] < out[1000], "envelope should rise gradually");
    }

    #[test]
    fn stereo_sources_in_left_right_mode() {
        let left = [0.8f32; 4];
        let right = [-0.2f32; 4];
        for (source, expected) in [
            (SidechainSource::Middle, 0.3),
            (SidechainSource::Side, 0.5),
            (SidechainSource::Left, 0.8),
            (SidechainSource::Right, 0.2),
            (SidechainSource::Min, 0.2),
            (SidechainSource::Max, 0.8),
        ] {
            let mut sc = detector(2, SidechainMode::Peak, 0.0);
            sc.set_source(source);
            let mut out = [0.0; 4];
            sc.process(&mut out, &[&left, &right]);
            assert_approx_eq!(f32, out[3], expected, epsilon = 1e-6);
        }
    }

    #[test]
    fn stereo_sources_in_mid_side_mode() {
        let mid = [0.5f32; 4];
        let side = [0.25f32; 4];
        for (source, expected) in [
            (SidechainSource::Middle, 0.5),
            (SidechainSource::Side, 0.25),
            (SidechainSource::Left, 0.75),
            (SidechainSource::Right, 0.25),
            (SidechainSource::Min, 0.25),
            (SidechainSource::Max, 0.75),
        ] {
            let mut sc = detector(2, SidechainMode::Peak, 0.0);
            sc.set_mid_side(true);
            sc.set_source(source);
            let mut out = [0.0; 4];
            sc.process(&mut out, &[&mid, &side]);
            assert_approx_eq!(f32, out[0], expected, epsilon = 1e-6);
        }
    }

    #[test]
    fn mono_ignores_second_input() {
        let mut sc = detector(1, SidechainMode::Peak, 0.0);
        sc.set_source(SidechainSource::Right);
        let a = [0.4f32; 8];
        let b = [0.9f32; 8];
        let mut out = [0.0; 8];
        sc.process(&mut out, &[&a, &b]);
        assert!(out.iter().all(|&x| x == 0.4));
    }

    #[test]
    fn preamp_scales_output() {
        let mut sc = detector(1, SidechainMode::Peak, 0.0);
        sc.set_preamp(2.0);
        let mut out = [0.0; 2];
        sc.process(&mut out, &[&[0.25, -0.5]]);
        assert_eq!(out, [0.5, 1.0]);
    }

    #[test]
    fn reactivity_is_limited_to_maximum() {
        let mut sc = detector(1, SidechainMode::Rms, 500.0);
        assert_eq!(sc.reactivity(), 100.0);
        sc.set_reactivity(-3.0);
        assert_eq!(sc.reactivity(), 0.0);
    }

    #[test]
    fn long_blocks_are_chunked() {
        let mut whole = detector(1, SidechainMode::Rms, 2.0);
        let mut split = whole.clone();
        let input = sine(0.7, 440.0, 3 * SIDECHAIN_CHUNK + 17);

        let mut a = vec![0.0; input.len()];
        whole.process(&mut a, &[&input]);

        let mut b = vec![0.0; input.len()];
        let (head, tail) = b.split_at_mut(100);
        split.process(head, &[&input[..100]]);
        split.process(tail, &[&input[100..]]);
        for (x, y) in a.iter().zip(b.iter()) {
            assert_approx_eq!(f32, *x, *y, epsilon = 1e-6);
        }
    }

    #[test]
    fn empty_inputs_give_silence() {
        let mut sc = detector(2, SidechainMode::Lpf, 10.0);
        let mut out = [1.0; 16];
        sc.process(&mut out, &[]);
        assert!(out.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn reset_clears_history() {
        let mut sc = detector(1, SidechainMode::Sma, 10.0);
        let loud = vec![1.0; 1000];
        let mut out = vec![0.0; 1000];
        sc.process(&mut out, &[&loud]);
        sc.reset();
        let silence = vec![0.0; 32];
        let mut out = vec![1.0; 32];
        sc.process(&mut out, &[&silence]);
        assert!(out.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn output_is_finite_and_non_negative() {
        for mode in [
            SidechainMode::Peak,
            SidechainMode::Rms,
            SidechainMode::Lpf,
            SidechainMode::Sma,
        ] {
            let mut sc = detector(1, mode, 3.0);
            let input: Vec<f32> = (0..4096).map(|i| ((i * 7919) % 211) as f32 / 105.0 - 1.0).collect();
            let mut out = vec![0.0; 4096];
            sc.process(&mut out, &[&input]);
            assert!(out.iter().all(|x| x.is_finite() && *x >= 0.0), "{mode:?}");
        }
    }
}
