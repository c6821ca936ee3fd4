// SPDX-License-Identifier: LGPL-3.0-or-later

//! Parameter ranges, defaults and fixed sizes of the compressor.
//!
//! Thresholds, knee and makeup are in dB, times in milliseconds, split
//! frequencies in Hz. Global gains (input, output, dry, wet, sidechain
//! preamp) are linear amplitudes.

use gott_dsp_units::consts::{GAIN_AMP_0_DB, GAIN_AMP_P_24_DB, GAIN_AMP_P_48_DB};

/// Range, default and step of a numeric parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamRange {
    /// Smallest accepted value.
    pub min: f32,
    /// Largest accepted value.
    pub max: f32,
    /// Default value.
    pub default: f32,
    /// Control step.
    pub step: f32,
}

impl ParamRange {
    /// Create a range.
    pub const fn new(min: f32, max: f32, default: f32, step: f32) -> Self {
        Self {
            min,
            max,
            default,
            step,
        }
    }

    /// Limit `value` to the range; NaN gives the default.
    pub fn clamp(&self, value: f32) -> f32 {
        if value.is_nan() {
            self.default
        } else {
            value.clamp(self.min, self.max)
        }
    }

    /// `value` lies inside the range.
    pub fn contains(&self, value: f32) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

/// Number of band slots per channel.
pub const BANDS_MAX: usize = 4;
/// Bands active without the extra band.
pub const BANDS_DFL: usize = 3;
/// Number of split frequencies.
pub const SPLITS_MAX: usize = BANDS_MAX - 1;

/// Internal processing block in samples.
pub const BUFFER_SIZE: usize = 0x1000;
/// Visualization refresh rate in Hz.
pub const REFRESH_RATE: f32 = 20.0;
/// Bypass crossfade time in seconds.
pub const BYPASS_TIME: f32 = 0.005;

/// Points of the per-band compression curve.
pub const CURVE_MESH_SIZE: usize = 256;
/// Lowest input level of the compression curve.
pub const CURVE_DB_MIN: f32 = -72.0;
/// Highest input level of the compression curve.
pub const CURVE_DB_MAX: f32 = 24.0;

/// Frequency points of the amplitude response.
pub const FFT_MESH_POINTS: usize = 640;
/// Frequency points of the sidechain filter charts (two guard points).
pub const FILTER_MESH_POINTS: usize = FFT_MESH_POINTS + 2;

/// FFT rank of the linear-phase crossover at 44.1 kHz.
pub const FFT_XOVER_RANK_MIN: usize = 12;
/// Sample rate served by [`FFT_XOVER_RANK_MIN`].
pub const FFT_XOVER_FREQ_MIN: f32 = 44100.0;
/// Edge slope of the linear-phase crossover in dB/oct.
pub const FFT_XOVER_SLOPE: f32 = 48.0;

/// Smallest distance between two neighbouring splits in Hz.
pub const SPLIT_GUARD: f32 = 50.0;

/// Split frequency ranges.
pub const SPLITS: [ParamRange; SPLITS_MAX] = [
    ParamRange::new(20.0, 200.0, 120.0, 0.002),
    ParamRange::new(250.0, 5000.0, 2000.0, 0.002),
    ParamRange::new(5500.0, 20000.0, 7000.0, 0.002),
];

/// Lowest threshold of the upward section, in dB.
pub const THRESH_MIN: ParamRange = ParamRange::new(-72.0, 0.0, -60.0, 0.01);
/// Upward compression threshold in dB.
pub const THRESH_UP: ParamRange = ParamRange::new(-72.0, 0.0, -36.0, 0.01);
/// Downward compression threshold in dB.
pub const THRESH_DOWN: ParamRange = ParamRange::new(-72.0, 0.0, -12.0, 0.01);
/// Upward compression ratio.
pub const UP_RATIO: ParamRange = ParamRange::new(1.0, 100.0, 50.0, 0.0025);
/// Downward compression ratio.
pub const DOWN_RATIO: ParamRange = ParamRange::new(1.0, 100.0, 4.0, 0.0025);
/// Knee width in dB.
pub const KNEE: ParamRange = ParamRange::new(0.0, 24.0, 0.0, 0.01);
/// Attack time in milliseconds.
pub const ATTACK_TIME: ParamRange = ParamRange::new(0.0, 2000.0, 20.0, 0.0025);
/// Release time in milliseconds.
pub const RELEASE_TIME: ParamRange = ParamRange::new(0.0, 5000.0, 100.0, 0.0025);
/// Band makeup gain in dB.
pub const MAKEUP: ParamRange = ParamRange::new(-60.0, 60.0, 0.0, 0.01);

/// Lookahead in milliseconds.
pub const LOOKAHEAD: ParamRange = ParamRange::new(0.0, 20.0, 0.0, 0.01);
/// Sidechain reactivity in milliseconds, shared by every band detector.
pub const REACTIVITY: ParamRange = ParamRange::new(0.0, 1000.0, 200.0, 0.001);

/// Input gain.
pub const IN_GAIN: ParamRange = ParamRange::new(0.0, GAIN_AMP_P_24_DB, GAIN_AMP_0_DB, 0.01);
/// Output gain.
pub const OUT_GAIN: ParamRange = ParamRange::new(0.0, GAIN_AMP_P_24_DB, GAIN_AMP_0_DB, 0.01);
/// Dry signal gain.
pub const DRY_GAIN: ParamRange = ParamRange::new(0.0, GAIN_AMP_P_24_DB, 0.0, 0.01);
/// Processed signal gain.
pub const WET_GAIN: ParamRange = ParamRange::new(0.0, GAIN_AMP_P_24_DB, GAIN_AMP_0_DB, 0.01);
/// Sidechain preamp gain.
pub const SC_PREAMP: ParamRange = ParamRange::new(0.0, GAIN_AMP_P_48_DB, GAIN_AMP_0_DB, 0.01);

/// Surge protector: input envelope that triggers protection, in dB.
pub const SURGE_ON_THRESH_DB: f32 = 12.0;
/// Surge protector: input envelope under which recovery starts, in dB.
pub const SURGE_OFF_THRESH_DB: f32 = 0.0;
/// Surge protector: safe gain hold after the last excursion, in milliseconds.
pub const SURGE_SHUTDOWN_TIME: f32 = 100.0;
