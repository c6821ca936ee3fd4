// SPDX-License-Identifier: LGPL-3.0-or-later

//! Sample-based refresh counter.
//!
//! Fires at a fixed rate measured in processed samples, independent of
//! the host block size. The engine uses it to throttle visualization
//! updates.

bitflags::bitflags! {
    /// Counter flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct Flags: u8 {
        /// Counter has fired and nobody committed it yet.
        const FIRED = 1 << 0;
        /// Countdown must restart on the next sample rate change.
        const RESTART = 1 << 1;
    }
}

/// Sample-based countdown counter firing `frequency` times per second.
///
/// # Examples
/// ```
/// use gott_dsp_units::ctl::counter::Counter;
///
/// let mut counter = Counter::new();
/// counter.set_sample_rate(48000, true);
/// counter.set_frequency(20.0, true); // fire every 2400 samples
///
/// assert!(!counter.submit(1024));
/// assert!(counter.submit(2048));
/// assert!(counter.commit());
/// assert!(!counter.fired());
/// ```
#[derive(Debug, Clone)]
pub struct Counter {
    current: usize,
    period: usize,
    sample_rate: usize,
    frequency: f32,
    flags: Flags,
}

impl Default for Counter {
    fn default() -> Self {
        Self::new()
    }
}

impl Counter {
    /// Create a counter firing once per second at 48 kHz.
    pub fn new() -> Self {
        Self {
            current: 48000,
            period: 48000,
            sample_rate: 48000,
            frequency: 1.0,
            flags: Flags::empty(),
        }
    }

    /// Current sample rate.
    pub fn sample_rate(&self) -> usize {
        self.sample_rate
    }

    /// Set the sample rate, keeping the firing frequency.
    ///
    /// # Arguments
    /// * `sr` - Sample rate in Hz
    /// * `reset` - If true, restart the countdown
    pub fn set_sample_rate(&mut self, sr: usize, reset: bool) {
        self.sample_rate = sr;
        self.update_period(reset);
    }

    /// Firing frequency in Hz.
    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    /// Set the firing frequency.
    ///
    /// # Arguments
    /// * `freq` - Firing frequency in Hz, clamped to at least one firing
    ///   per sample
    /// * `reset` - If true, restart the countdown
    pub fn set_frequency(&mut self, freq: f32, reset: bool) {
        self.frequency = freq.max(f32::MIN_POSITIVE);
        self.update_period(reset);
    }

    /// Samples between two firings.
    pub fn period(&self) -> usize {
        self.period
    }

    /// Samples left before the next firing.
    pub fn pending(&self) -> usize {
        self.current
    }

    /// Check if the counter has fired since the last commit.
    pub fn fired(&self) -> bool {
        self.flags.contains(Flags::FIRED)
    }

    /// Clear the fired flag and return its previous state.
    pub fn commit(&mut self) -> bool {
        let result = self.fired();
        self.flags.remove(Flags::FIRED);
        result
    }

    /// Force the next [`submit`](Self::submit) to fire.
    pub fn request(&mut self) {
        self.flags.insert(Flags::RESTART);
    }

    /// Account for `samples` processed samples.
    ///
    /// # Returns
    /// `true` if the counter has fired and was not committed yet
    pub fn submit(&mut self, samples: usize) -> bool {
        if self.flags.contains(Flags::RESTART) {
            self.flags.remove(Flags::RESTART);
            self.flags.insert(Flags::FIRED);
            self.current = self.period;
            return true;
        }

        if samples >= self.current {
            let over = (samples - self.current) % self.period;
            self.current = self.period - over;
            self.flags.insert(Flags::FIRED);
        } else {
            self.current -= samples;
        }

        self.fired()
    }

    fn update_period(&mut self, reset: bool) {
        self.period = ((self.sample_rate as f32 / self.frequency) as usize).max(1);
        if reset || self.current > self.period {
            self.current = self.period;
        }
    }
}
