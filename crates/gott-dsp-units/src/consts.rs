// SPDX-License-Identifier: LGPL-3.0-or-later

//! Gain and frequency constants.

// Gain constants (linear amplitude ratios for common dB values)

/// +72 dB amplitude gain (~3981)
pub const GAIN_AMP_P_72_DB: f32 = 3_981.071_7;

/// +48 dB amplitude gain (~251.2)
pub const GAIN_AMP_P_48_DB: f32 = 251.188_64;

/// +24 dB amplitude gain (~15.8)
pub const GAIN_AMP_P_24_DB: f32 = 15.848_932;

/// +12 dB amplitude gain (~4.0)
pub const GAIN_AMP_P_12_DB: f32 = 3.981_071_7;

/// 0 dB amplitude gain (1.0)
pub const GAIN_AMP_0_DB: f32 = 1.0;

/// -12 dB amplitude gain (~0.25)
pub const GAIN_AMP_M_12_DB: f32 = 0.251_188_64;

/// -36 dB amplitude gain (~0.016)
pub const GAIN_AMP_M_36_DB: f32 = 1.584_893_3e-2;

/// -48 dB amplitude gain (~0.004)
pub const GAIN_AMP_M_48_DB: f32 = 3.981_071_5e-3;

/// -60 dB amplitude gain (0.001)
pub const GAIN_AMP_M_60_DB: f32 = 1e-3;

/// -72 dB amplitude gain (~0.00025)
pub const GAIN_AMP_M_72_DB: f32 = 2.511_886_4e-4;

/// -96 dB amplitude gain (~0.000016)
pub const GAIN_AMP_M_96_DB: f32 = 1.584_893_2e-5;

/// Negative infinity dB amplitude gain (0.0)
pub const GAIN_AMP_M_INF_DB: f32 = 0.0;

// Frequency range of charts and analysis

/// Minimum frequency (Hz)
pub const SPEC_FREQ_MIN: f32 = 10.0;

/// Maximum frequency (Hz)
pub const SPEC_FREQ_MAX: f32 = 24000.0;

/// Default frequency (Hz), also the reference point of the envelope boost
pub const SPEC_FREQ_DFL: f32 = 1000.0;
