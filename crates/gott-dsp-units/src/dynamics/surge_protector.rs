// SPDX-License-Identifier: LGPL-3.0-or-later

//! Surge protector for runaway gain.
//!
//! The protector watches an input envelope and produces a gain mask in
//! `(0, 1]`. An excursion above the on threshold forces the mask down to a
//! near-silent level over the transition time. The mask is held there for
//! the shutdown time after the last excursion, then fades back to unity once
//! the envelope has dropped below the off threshold.

use crate::consts::{GAIN_AMP_0_DB, GAIN_AMP_M_72_DB, GAIN_AMP_P_12_DB};
use crate::units::millis_to_samples;

/// Mask level while triggered. Never zero so downstream gain stages that
/// divide by the mask stay finite.
const SAFE_GAIN: f32 = GAIN_AMP_M_72_DB;

/// Protector state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SurgeState {
    /// Unity gain, envelope is watched for excursions.
    #[default]
    Normal,
    /// Gain forced towards the safe level and held for the shutdown time.
    Triggered,
    /// Gain ramping towards 1.
    Recovering,
}

/// Gain mask generator driven by an envelope.
///
/// # Examples
/// ```
/// use gott_dsp_units::dynamics::surge_protector::{SurgeProtector, SurgeState};
///
/// let mut sp = SurgeProtector::new();
/// sp.set_sample_rate(48000.0);
/// sp.set_shutdown_time(10.0);
/// sp.set_transition_time(5.0);
///
/// let surge = vec![10.0f32; 960];
/// let mut gain = vec![0.0f32; 960];
/// sp.process(&mut gain, &surge);
/// assert_eq!(sp.state(), SurgeState::Triggered);
/// assert!(gain[959] < 1e-3);
///
/// let quiet = vec![0.1f32; 960];
/// sp.process(&mut gain, &quiet);
/// assert_eq!(sp.state(), SurgeState::Normal);
/// assert_eq!(gain[959], 1.0);
/// ```
#[derive(Debug, Clone)]
pub struct SurgeProtector {
    sample_rate: f32,
    on_threshold: f32,
    off_threshold: f32,
    transition: f32,
    shutdown: f32,
    step: f32,
    shutdown_len: usize,
    hold: usize,
    gain: f32,
    state: SurgeState,
    enabled: bool,
}

impl Default for SurgeProtector {
    fn default() -> Self {
        Self::new()
    }
}

impl SurgeProtector {
    /// Create an enabled protector: on at +12 dB, off at 0 dB,
    /// 10 ms transition and 100 ms shutdown.
    pub fn new() -> Self {
        let mut sp = Self {
            sample_rate: 48000.0,
            on_threshold: GAIN_AMP_P_12_DB,
            off_threshold: GAIN_AMP_0_DB,
            transition: 10.0,
            shutdown: 100.0,
            step: 1.0,
            shutdown_len: 0,
            hold: 0,
            gain: 1.0,
            state: SurgeState::Normal,
            enabled: true,
        };
        sp.recalc();
        sp
    }

    /// Set the sample rate in Hz.
    pub fn set_sample_rate(&mut self, sr: f32) {
        self.sample_rate = sr;
        self.recalc();
    }

    /// Envelope level above which the protector triggers.
    pub fn set_on_threshold(&mut self, level: f32) {
        self.on_threshold = level.max(0.0);
    }

    /// Envelope level the input must fall under before recovery.
    pub fn set_off_threshold(&mut self, level: f32) {
        self.off_threshold = level.max(0.0);
    }

    /// Fade time in milliseconds.
    pub fn set_transition_time(&mut self, ms: f32) {
        self.transition = ms.max(0.0);
        self.recalc();
    }

    /// Time the safe gain is held after the last excursion, in milliseconds.
    pub fn set_shutdown_time(&mut self, ms: f32) {
        self.shutdown = ms.max(0.0);
        self.recalc();
    }

    /// Enable or disable protection.
    ///
    /// Enabling a disabled protector re-arms it to [`SurgeState::Normal`]
    /// with unity gain.
    pub fn set_enabled(&mut self, enabled: bool) {
        if enabled && !self.enabled {
            self.reset();
        }
        self.enabled = enabled;
    }

    /// On threshold.
    pub fn on_threshold(&self) -> f32 {
        self.on_threshold
    }

    /// Off threshold.
    pub fn off_threshold(&self) -> f32 {
        self.off_threshold
    }

    /// Transition time in milliseconds.
    pub fn transition_time(&self) -> f32 {
        self.transition
    }

    /// Shutdown time in milliseconds.
    pub fn shutdown_time(&self) -> f32 {
        self.shutdown
    }

    /// Protection is enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Current state.
    pub fn state(&self) -> SurgeState {
        self.state
    }

    /// Current gain.
    pub fn gain(&self) -> f32 {
        if self.enabled { self.gain } else { 1.0 }
    }

    /// Return to [`SurgeState::Normal`] with unity gain.
    pub fn reset(&mut self) {
        self.state = SurgeState::Normal;
        self.gain = 1.0;
        self.hold = 0;
    }

    fn recalc(&mut self) {
        let transition = millis_to_samples(self.sample_rate, self.transition);
        self.step = if transition >= 1.0 { 1.0 / transition } else { 1.0 };
        self.shutdown_len = millis_to_samples(self.sample_rate, self.shutdown).max(0.0) as usize;
    }

    /// Write the gain mask for envelope `env` into `dst`.
    pub fn process(&mut self, dst: &mut [f32], env: &[f32]) {
        let n = dst.len().min(env.len());
        if !self.enabled {
            dst[..n].fill(1.0);
            return;
        }
        for (d, e) in dst[..n].iter_mut().zip(env.iter()) {
            *d = self.tick(*e);
        }
    }

    #[inline]
    fn tick(&mut self, e: f32) -> f32 {
        if e > self.on_threshold {
            self.state = SurgeState::Triggered;
            self.hold = self.shutdown_len;
        }
        match self.state {
            SurgeState::Normal => {}
            SurgeState::Triggered => {
                self.gain = (self.gain - self.step).max(SAFE_GAIN);
                if e > self.on_threshold {
                    // Hold restarts on every excursion
                } else if self.hold > 0 {
                    self.hold -= 1;
                } else if e < self.off_threshold {
                    self.state = SurgeState::Recovering;
                }
            }
            SurgeState::Recovering => {
                self.gain += self.step;
                if self.gain >= 1.0 {
                    self.gain = 1.0;
                    self.state = SurgeState::Normal;
                }
            }
        }
        self.gain
    }
}
