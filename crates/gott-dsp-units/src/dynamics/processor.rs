// SPDX-License-Identifier: LGPL-3.0-or-later

//! Dot-based dynamics processor.
//!
//! The transfer curve is defined by up to [`DYNAMICS_DOTS_MAX`] dots, each
//! mapping an input level to an output level, plus two ratios: the input
//! ratio sets the log-log slope below the lowest dot (`1 / in_ratio`) and
//! the output ratio sets the slope above the highest one
//! (`1 / out_ratio`). Between two dots the curve is the straight log-log
//! line joining them. Every dot gets a symmetric soft knee whose
//! half-width is `ln(knee)`, limited to half the distance to each
//! neighbouring dot; inside the knee a Hermite quadratic joins the
//! incoming and outgoing slopes.
//!
//! Levels go through an attack/release envelope follower before the
//! curve is applied.

use gott_dsp_lib::dynamics::{
    dynamics_curve, dynamics_curve_single, dynamics_gain_inplace, dynamics_gain_single,
};
use gott_dsp_lib::types::{AMPLIFICATION_THRESH, DYNAMICS_DOTS_MAX, DynamicsCurve, DynamicsKnee};

use crate::interpolation::{hermite_quadratic, line_through};
use crate::units::{calculate_tau, millis_to_samples};

/// Smallest knee half-width in nepers treated as a soft knee.
const KNEE_MIN_WIDTH: f32 = 1e-6;

/// Factor keeping band thresholds strictly ordered.
const THRESH_GAP: f32 = 0.999;

/// One control point of the transfer curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DynamicDot {
    /// Input level (linear).
    pub input: f32,
    /// Output level (linear).
    pub output: f32,
    /// Knee as a linear gain `>= 1` (`1` is a hard knee).
    pub knee: f32,
}

impl DynamicDot {
    /// Dot at `(input, output)` with `knee`.
    pub fn new(input: f32, output: f32, knee: f32) -> Self {
        Self {
            input,
            output,
            knee,
        }
    }
}

/// Dots of a two-section band curve, highest first.
///
/// Above `down` the curve compresses at the output ratio, between `up` and
/// `down` it is unity, and below `up` it lifts `min` towards `up` by
/// `up_ratio`. Levels are linear; the thresholds are forced into
/// `min < up < down` whatever order they arrive in.
pub fn band_dots(min: f32, up: f32, down: f32, up_ratio: f32, knee: f32) -> [DynamicDot; 3] {
    let up = up.min(down * THRESH_GAP);
    let min = min.min(up * THRESH_GAP);
    [
        DynamicDot::new(down, down, knee),
        DynamicDot::new(up, up, knee),
        DynamicDot::new(min, up - (up - min) / up_ratio, knee),
    ]
}

/// Dynamics processor with a dot-defined curve.
///
/// # Examples
/// ```
/// use gott_dsp_units::dynamics::processor::{DynamicDot, DynamicProcessor};
///
/// let mut proc = DynamicProcessor::new();
/// proc.set_sample_rate(48000.0)
///     .set_dot(0, Some(DynamicDot::new(0.25, 0.25, 1.0)))
///     .set_out_ratio(4.0)
///     .set_attack_time(10.0)
///     .set_release_time(100.0)
///     .update_settings();
///
/// let input = vec![0.5f32; 64];
/// let mut vca = vec![0.0f32; 64];
/// proc.process(&mut vca, None, &input);
/// ```
#[derive(Debug, Clone)]
pub struct DynamicProcessor {
    sample_rate: f32,
    dots: [Option<DynamicDot>; DYNAMICS_DOTS_MAX],
    in_ratio: f32,
    out_ratio: f32,
    attack: f32,
    release: f32,
    tau_attack: f32,
    tau_release: f32,
    envelope: f32,
    curve: DynamicsCurve,
    dirty: bool,
}

impl Default for DynamicProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl DynamicProcessor {
    /// Create a processor with no dots (unity curve), 48 kHz, 20 ms
    /// attack and 100 ms release.
    pub fn new() -> Self {
        Self {
            sample_rate: 48000.0,
            dots: [None; DYNAMICS_DOTS_MAX],
            in_ratio: 1.0,
            out_ratio: 1.0,
            attack: 20.0,
            release: 100.0,
            tau_attack: 1.0,
            tau_release: 1.0,
            envelope: 0.0,
            curve: DynamicsCurve::default(),
            dirty: true,
        }
    }

    /// Set the sample rate in Hz.
    pub fn set_sample_rate(&mut self, sr: f32) -> &mut Self {
        if self.sample_rate != sr {
            self.sample_rate = sr;
            self.dirty = true;
        }
        self
    }

    /// Set or remove dot `id`. Out-of-range ids are ignored.
    pub fn set_dot(&mut self, id: usize, dot: Option<DynamicDot>) -> &mut Self {
        match self.dots.get_mut(id) {
            Some(d) if *d != dot => {
                *d = dot;
                self.dirty = true;
            }
            _ => {}
        }
        self
    }

    /// Dot `id`.
    pub fn dot(&self, id: usize) -> Option<DynamicDot> {
        self.dots.get(id).copied().flatten()
    }

    /// Set the ratio below the lowest dot.
    pub fn set_in_ratio(&mut self, ratio: f32) -> &mut Self {
        if self.in_ratio != ratio {
            self.in_ratio = ratio;
            self.dirty = true;
        }
        self
    }

    /// Set the ratio above the highest dot.
    pub fn set_out_ratio(&mut self, ratio: f32) -> &mut Self {
        if self.out_ratio != ratio {
            self.out_ratio = ratio;
            self.dirty = true;
        }
        self
    }

    /// Set the attack time in milliseconds.
    pub fn set_attack_time(&mut self, ms: f32) -> &mut Self {
        if self.attack != ms {
            self.attack = ms;
            self.dirty = true;
        }
        self
    }

    /// Set the release time in milliseconds.
    pub fn set_release_time(&mut self, ms: f32) -> &mut Self {
        if self.release != ms {
            self.release = ms;
            self.dirty = true;
        }
        self
    }

    /// Attack time in milliseconds.
    pub fn attack_time(&self) -> f32 {
        self.attack
    }

    /// Release time in milliseconds.
    pub fn release_time(&self) -> f32 {
        self.release
    }

    /// Settings changed since the last [`update_settings`](Self::update_settings).
    pub fn modified(&self) -> bool {
        self.dirty
    }

    /// Current envelope level.
    pub fn envelope(&self) -> f32 {
        self.envelope
    }

    /// The transfer curve in use.
    pub fn curve_data(&self) -> &DynamicsCurve {
        &self.curve
    }

    /// Reset the envelope follower.
    pub fn clear(&mut self) {
        self.envelope = 0.0;
    }

    /// Rebuild the time constants and the curve if anything changed.
    ///
    /// # Returns
    /// `true` if the settings were rebuilt
    pub fn update_settings(&mut self) -> bool {
        if !self.dirty {
            return false;
        }
        self.dirty = false;

        self.tau_attack = calculate_tau(millis_to_samples(self.sample_rate, self.attack));
        self.tau_release = calculate_tau(millis_to_samples(self.sample_rate, self.release));
        self.curve = self.build_curve();
        true
    }

    fn build_curve(&self) -> DynamicsCurve {
        // (ln input, ln output, knee half-width)
        let mut pts = [(0.0f32, 0.0f32, 0.0f32); DYNAMICS_DOTS_MAX];
        let mut n = 0;
        for d in self.dots.iter().flatten() {
            pts[n] = (
                d.input.max(AMPLIFICATION_THRESH).ln(),
                d.output.max(AMPLIFICATION_THRESH).ln(),
                d.knee.max(1.0).ln(),
            );
            n += 1;
        }
        let pts = &mut pts[..n];
        pts.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));

        let mut curve = DynamicsCurve::default();
        if n == 0 {
            return curve;
        }

        // slopes[i] is the slope entering dot i, slopes[n] the one after the last
        let mut slopes = [0.0f32; DYNAMICS_DOTS_MAX + 1];
        slopes[0] = 1.0 / self.in_ratio.max(f32::EPSILON);
        for i in 1..n {
            let dx = pts[i].0 - pts[i - 1].0;
            slopes[i] = if dx > KNEE_MIN_WIDTH {
                (pts[i].1 - pts[i - 1].1) / dx
            } else {
                slopes[i - 1]
            };
        }
        slopes[n] = 1.0 / self.out_ratio.max(f32::EPSILON);

        curve.base = line_through(pts[0].0, pts[0].1, slopes[0]);
        for i in 0..n {
            let (x, y, mut h) = pts[i];
            if i > 0 {
                h = h.min((x - pts[i - 1].0) * 0.5);
            }
            if i + 1 < n {
                h = h.min((pts[i + 1].0 - x) * 0.5);
            }

            let (kl, kr) = (slopes[i], slopes[i + 1]);
            let tilt = line_through(x, y, kr);
            let herm = if h > KNEE_MIN_WIDTH {
                hermite_quadratic(x - h, y - kl * h, kl, x + h, kr)
            } else {
                h = 0.0;
                [0.0, tilt[0], tilt[1]]
            };

            curve.knees[i] = DynamicsKnee {
                start: (x - h).exp(),
                end: (x + h).exp(),
                herm,
                tilt,
            };
        }
        curve.count = n;
        curve
    }

    /// Follow the envelope of `input` and write the gain for each sample
    /// into `vca`. The envelope itself goes to `env` when given.
    pub fn process(&mut self, vca: &mut [f32], env: Option<&mut [f32]>, input: &[f32]) {
        self.update_settings();

        let n = vca.len().min(input.len());
        for (v, x) in vca[..n].iter_mut().zip(input.iter()) {
            let s = x.abs();
            let tau = if s > self.envelope {
                self.tau_attack
            } else {
                self.tau_release
            };
            self.envelope += tau * (s - self.envelope);
            *v = self.envelope;
        }

        if let Some(env) = env {
            let m = env.len().min(n);
            env[..m].copy_from_slice(&vca[..m]);
        }

        dynamics_gain_inplace(&mut vca[..n], &self.curve);
    }

    /// Output level for each input level of `input` (no envelope).
    pub fn curve(&self, out: &mut [f32], input: &[f32]) {
        let n = out.len().min(input.len());
        dynamics_curve(&mut out[..n], &input[..n], &self.curve);
    }

    /// Output level for a single input level.
    pub fn curve_single(&self, x: f32) -> f32 {
        dynamics_curve_single(x, &self.curve)
    }

    /// Gain for a single input level.
    pub fn gain_single(&self, x: f32) -> f32 {
        dynamics_gain_single(x, &self.curve)
    }
}
