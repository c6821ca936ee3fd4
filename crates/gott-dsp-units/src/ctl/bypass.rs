// SPDX-License-Identifier: LGPL-3.0-or-later

//! Bypass control with smooth crossfading.
//!
//! Switches between the dry (bypassed) and wet (processed) signal with a
//! linear crossfade so toggling the bypass never clicks.

/// Bypass state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Fully bypassed, dry signal only.
    On,
    /// Crossfading between dry and wet.
    Active,
    /// Fully processed, wet signal only.
    Off,
}

/// Bypass control with smooth crossfading.
///
/// # Examples
/// ```
/// use gott_dsp_units::ctl::bypass::Bypass;
///
/// let mut bypass = Bypass::new();
/// bypass.init(48000, 0.005); // 5 ms crossfade
///
/// let dry = [1.0, 2.0, 3.0, 4.0];
/// let mut buf = [0.5, 1.0, 1.5, 2.0];
/// bypass.process_inplace(&mut buf, &dry);
/// assert_eq!(buf, [0.5, 1.0, 1.5, 2.0]);
/// ```
#[derive(Debug, Clone)]
pub struct Bypass {
    state: State,
    delta: f32,
    gain: f32,
}

impl Default for Bypass {
    fn default() -> Self {
        Self::new()
    }
}

impl Bypass {
    /// Create a new bypass controller in the processed state.
    pub fn new() -> Self {
        Self {
            state: State::Off,
            delta: 1.0,
            gain: 1.0,
        }
    }

    /// Initialize with sample rate and crossfade time in seconds.
    pub fn init(&mut self, sample_rate: usize, time: f32) {
        let length = (sample_rate as f32 * time).max(1.0);
        self.state = State::Off;
        self.delta = 1.0 / length;
        self.gain = 1.0;
    }

    /// Request bypass on or off.
    ///
    /// # Returns
    /// `true` if the request changed the target state
    pub fn set_bypass(&mut self, bypass: bool) -> bool {
        let towards_dry = self.delta < 0.0;
        if bypass == towards_dry {
            return false;
        }
        self.delta = -self.delta;
        self.state = State::Active;
        true
    }

    /// Target state is bypassed.
    pub fn bypassing(&self) -> bool {
        self.delta < 0.0
    }

    /// Fully bypassed (crossfade finished).
    pub fn bypassed(&self) -> bool {
        self.state == State::On
    }

    /// Fully processed (crossfade finished).
    pub fn active(&self) -> bool {
        self.state == State::Off
    }

    /// Crossfade from `dry` to `wet` into `dst`.
    pub fn process(&mut self, dst: &mut [f32], dry: &[f32], wet: &[f32]) {
        let count = dst.len().min(dry.len()).min(wet.len());
        for i in 0..count {
            dst[i] = wet[i];
        }
        self.process_inplace(&mut dst[..count], &dry[..count]);
    }

    /// Crossfade in place: `buf` holds the wet signal on entry and the
    /// mixed result on exit.
    pub fn process_inplace(&mut self, buf: &mut [f32], dry: &[f32]) {
        let count = buf.len().min(dry.len());
        let mut i = 0;

        match self.state {
            State::Off => return,
            State::On => {
                buf[..count].copy_from_slice(&dry[..count]);
                return;
            }
            State::Active => {}
        }

        while i < count {
            buf[i] = dry[i] + (buf[i] - dry[i]) * self.gain;
            self.gain += self.delta;
            i += 1;

            if self.gain >= 1.0 {
                self.gain = 1.0;
                self.state = State::Off;
                break;
            }
            if self.gain <= 0.0 {
                self.gain = 0.0;
                self.state = State::On;
                break;
            }
        }

        if self.state == State::On && i < count {
            buf[i..count].copy_from_slice(&dry[i..count]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;

    fn bypass_4_samples() -> Bypass {
        let mut b = Bypass::new();
        b.init(1000, 0.004);
        b
    }

    #[test]
    fn test_default_passes_wet() {
        let mut b = bypass_4_samples();
        let dry = [1.0; 8];
        let mut buf = [0.25; 8];
        b.process_inplace(&mut buf, &dry);
        assert_eq!(buf, [0.25; 8]);
        assert!(b.active());
        assert!(!b.bypassing());
    }

    #[test]
    fn test_crossfade_to_dry() {
        let mut b = bypass_4_samples();
        assert!(b.set_bypass(true));
        assert!(!b.set_bypass(true), "repeated request is not a change");
        assert!(b.bypassing());

        let dry = [1.0; 8];
        let mut buf = [0.0; 8];
        b.process_inplace(&mut buf, &dry);

        // gain goes 1.0 -> 0.75 -> 0.5 -> 0.25 -> 0.0
        assert_approx_eq!(f32, buf[0], 0.0, epsilon = 1e-6);
        assert_approx_eq!(f32, buf[1], 0.25, epsilon = 1e-6);
        assert_approx_eq!(f32, buf[2], 0.5, epsilon = 1e-6);
        assert_approx_eq!(f32, buf[3], 0.75, epsilon = 1e-6);
        assert_eq!(&buf[4..], &[1.0; 4]);
        assert!(b.bypassed());
    }

    #[test]
    fn test_crossfade_back_to_wet_spans_blocks() {
        let mut b = bypass_4_samples();
        b.set_bypass(true);
        let dry = [0.0; 8];
        let mut buf = [1.0; 8];
        b.process_inplace(&mut buf, &dry);
        assert!(b.bypassed());

        assert!(b.set_bypass(false));
        let mut first = [1.0; 2];
        b.process_inplace(&mut first, &dry[..2]);
        assert_approx_eq!(f32, first[1], 0.25, epsilon = 1e-6);
        assert!(!b.active());

        let mut second = [1.0; 6];
        b.process_inplace(&mut second, &dry[..6]);
        assert!(b.active());
        assert_eq!(&second[2..], &[1.0; 4]);
    }

    #[test]
    fn test_process_copies_wet() {
        let mut b = bypass_4_samples();
        let mut dst = [0.0; 3];
        b.process(&mut dst, &[9.0; 3], &[1.0, 2.0, 3.0]);
        assert_eq!(dst, [1.0, 2.0, 3.0]);
    }
}
