// SPDX-License-Identifier: LGPL-3.0-or-later

//! Unit conversion functions: time, gain and decibels.

use std::f32::consts::{FRAC_1_SQRT_2, LN_10};

/// Convert seconds to sample count.
///
/// # Arguments
/// * `sr` - Sample rate in Hz
/// * `time` - Time in seconds
///
/// # Returns
/// Number of samples
#[inline]
pub fn seconds_to_samples(sr: f32, time: f32) -> f32 {
    time * sr
}

/// Convert sample count to milliseconds.
///
/// # Arguments
/// * `sr` - Sample rate in Hz
/// * `samples` - Number of samples
///
/// # Returns
/// Time in milliseconds
#[inline]
pub fn samples_to_millis(sr: f32, samples: f32) -> f32 {
    samples * 1000.0 / sr
}

/// Convert milliseconds to sample count.
///
/// # Arguments
/// * `sr` - Sample rate in Hz
/// * `time` - Time in milliseconds
///
/// # Returns
/// Number of samples
#[inline]
pub fn millis_to_samples(sr: f32, time: f32) -> f32 {
    time * sr / 1000.0
}

/// Convert decibels to linear gain (amplitude ratio).
#[inline]
pub fn db_to_gain(db: f32) -> f32 {
    (db * (LN_10 / 20.0)).exp()
}

/// Convert linear gain (amplitude ratio) to decibels.
#[inline]
pub fn gain_to_db(gain: f32) -> f32 {
    20.0 * gain.log10()
}

/// One-pole smoothing coefficient reaching `1 - 1/√2` of a step after
/// `samples` samples.
///
/// Used by envelope followers: `env += tau * (x - env)`. A zero or
/// negative duration gives an instant response (`tau = 1`).
///
/// # Arguments
/// * `samples` - Response time in samples
///
/// # Returns
/// Coefficient in `(0, 1]`
#[inline]
pub fn calculate_tau(samples: f32) -> f32 {
    if samples < 1.0 {
        return 1.0;
    }
    1.0 - ((1.0 - FRAC_1_SQRT_2).ln() / samples).exp()
}

/// Smallest `r` with `2^r >= x`; zero for `x <= 1`.
#[inline]
pub fn ceil_log2(x: usize) -> usize {
    if x <= 1 {
        return 0;
    }
    (usize::BITS - (x - 1).leading_zeros()) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;

    #[test]
    fn test_samples_millis_conversion() {
        assert_eq!(millis_to_samples(48000.0, 10.0), 480.0);
        assert_eq!(samples_to_millis(48000.0, 480.0), 10.0);
        assert_eq!(seconds_to_samples(44100.0, 0.5), 22050.0);
    }

    #[test]
    fn test_millis_to_samples_roundtrip() {
        for &sr in &[22050.0f32, 44100.0, 48000.0, 96000.0] {
            let ms = 17.3;
            let back = samples_to_millis(sr, millis_to_samples(sr, ms));
            assert_approx_eq!(f32, back, ms, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_db_gain_conversion() {
        assert_approx_eq!(f32, db_to_gain(0.0), 1.0, ulps = 2);
        assert_approx_eq!(f32, db_to_gain(-20.0), 0.1, epsilon = 1e-6);
        assert_approx_eq!(f32, db_to_gain(6.0), 1.995_262, epsilon = 1e-5);
        assert_approx_eq!(f32, gain_to_db(10.0), 20.0, epsilon = 1e-5);
        assert_eq!(gain_to_db(0.0), f32::NEG_INFINITY);
    }

    #[test]
    fn test_calculate_tau_reaches_target() {
        let samples = 480.0;
        let tau = calculate_tau(samples);
        let mut env = 0.0f32;
        for _ in 0..480 {
            env += tau * (1.0 - env);
        }
        assert_approx_eq!(f32, env, 1.0 - FRAC_1_SQRT_2, epsilon = 1e-3);
    }

    #[test]
    fn test_calculate_tau_instant() {
        assert_eq!(calculate_tau(0.0), 1.0);
        assert_eq!(calculate_tau(-5.0), 1.0);
        assert!(calculate_tau(1.0) <= 1.0);
    }

    #[test]
    fn test_ceil_log2() {
        assert_eq!(ceil_log2(0), 0);
        assert_eq!(ceil_log2(1), 0);
        assert_eq!(ceil_log2(2), 1);
        assert_eq!(ceil_log2(3), 2);
        assert_eq!(ceil_log2(4), 2);
        assert_eq!(ceil_log2(5), 3);
        assert_eq!(ceil_log2(1024), 10);
    }
}
