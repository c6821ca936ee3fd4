// SPDX-License-Identifier: LGPL-3.0-or-later

//! Compressor settings.
//!
//! [`Settings`] is a plain value the host fills and hands to
//! [`Compressor::apply`](crate::Compressor::apply). It reads and writes
//! TOML and JSON; every field has a default so partial documents load.
//!
//! ```toml
//! input_gain = 1.0
//! lookahead = 5.0
//!
//! [crossover]
//! mode = "classic"
//! splits = [120.0, 2000.0, 7000.0]
//! extra_band = false
//!
//! [sidechain]
//! kind = "internal"
//! mode = "rms"
//! source = "middle"
//!
//! [[bands]]
//! down_threshold = -12.0
//! down_ratio = 4.0
//! ```

use gott_dsp_units::filters::envelope_boost::EnvelopeBoost;
use gott_dsp_units::util::sidechain as sc;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::meta::{self, BANDS_DFL, BANDS_MAX, ParamRange, SPLIT_GUARD, SPLITS_MAX};

/// Channel layout, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatingMode {
    /// One channel.
    #[default]
    Mono,
    /// Two channels sharing one set of band settings.
    Stereo,
    /// Left and right with independent band settings.
    LeftRight,
    /// Mid and side with independent band settings.
    MidSide,
}

impl OperatingMode {
    /// Number of audio channels.
    pub fn channels(self) -> usize {
        match self {
            Self::Mono => 1,
            _ => 2,
        }
    }

    /// The second channel has its own band settings.
    pub fn split_bands(self) -> bool {
        matches!(self, Self::LeftRight | Self::MidSide)
    }
}

/// Crossover topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrossoverMode {
    /// Linkwitz-Riley filter bank with all-pass compensation.
    Classic,
    /// VCA-driven dynamic shelving filters.
    #[default]
    Modern,
    /// FFT masks with fixed latency.
    LinearPhase,
}

/// Where the detector signal comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SidechainType {
    /// The input itself.
    #[default]
    Internal,
    /// The external sidechain input.
    External,
    /// A shared buffer supplied by another instance.
    Link,
}

/// Level detection mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SidechainMode {
    /// Absolute value.
    Peak,
    /// Root mean square.
    #[default]
    Rms,
    /// Low-pass filtered power.
    Lpf,
    /// Simple moving average.
    Sma,
}

impl From<SidechainMode> for sc::SidechainMode {
    fn from(m: SidechainMode) -> Self {
        match m {
            SidechainMode::Peak => Self::Peak,
            SidechainMode::Rms => Self::Rms,
            SidechainMode::Lpf => Self::Lpf,
            SidechainMode::Sma => Self::Sma,
        }
    }
}

/// Stereo component fed to the detectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SidechainSource {
    /// Mid.
    #[default]
    Middle,
    /// Side.
    Side,
    /// Left.
    Left,
    /// Right.
    Right,
    /// Smaller of left and right.
    Min,
    /// Larger of left and right.
    Max,
}

impl From<SidechainSource> for sc::SidechainSource {
    fn from(s: SidechainSource) -> Self {
        match s {
            SidechainSource::Middle => Self::Middle,
            SidechainSource::Side => Self::Side,
            SidechainSource::Left => Self::Left,
            SidechainSource::Right => Self::Right,
            SidechainSource::Min => Self::Min,
            SidechainSource::Max => Self::Max,
        }
    }
}

/// Sidechain emphasis filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoostMode {
    /// No emphasis.
    Off,
    /// +3 dB/oct, bilinear.
    #[default]
    BtPink,
    /// +3 dB/oct, matched-z.
    MtPink,
    /// +6 dB/oct, bilinear.
    BtBrown,
    /// +6 dB/oct, matched-z.
    MtBrown,
}

impl From<BoostMode> for EnvelopeBoost {
    fn from(b: BoostMode) -> Self {
        match b {
            BoostMode::Off => Self::Off,
            BoostMode::BtPink => Self::BtPink,
            BoostMode::MtPink => Self::MtPink,
            BoostMode::BtBrown => Self::BtBrown,
            BoostMode::MtBrown => Self::MtBrown,
        }
    }
}

/// Parameters of one band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BandSettings {
    /// Lowest threshold of the upward section, dB.
    pub min_threshold: f32,
    /// Upward compression threshold, dB.
    pub up_threshold: f32,
    /// Downward compression threshold, dB.
    pub down_threshold: f32,
    /// Upward ratio.
    pub up_ratio: f32,
    /// Downward ratio.
    pub down_ratio: f32,
    /// Knee, dB.
    pub knee: f32,
    /// Attack, ms.
    pub attack: f32,
    /// Release, ms.
    pub release: f32,
    /// Makeup gain, dB.
    pub makeup: f32,
    /// Band processing on.
    pub enabled: bool,
    /// Solo.
    pub solo: bool,
    /// Mute.
    pub mute: bool,
}

impl Default for BandSettings {
    fn default() -> Self {
        Self {
            min_threshold: meta::THRESH_MIN.default,
            up_threshold: meta::THRESH_UP.default,
            down_threshold: meta::THRESH_DOWN.default,
            up_ratio: meta::UP_RATIO.default,
            down_ratio: meta::DOWN_RATIO.default,
            knee: meta::KNEE.default,
            attack: meta::ATTACK_TIME.default,
            release: meta::RELEASE_TIME.default,
            makeup: meta::MAKEUP.default,
            enabled: true,
            solo: false,
            mute: false,
        }
    }
}

impl BandSettings {
    fn ranged(&self) -> [(&'static str, f32, ParamRange); 9] {
        [
            ("min_threshold", self.min_threshold, meta::THRESH_MIN),
            ("up_threshold", self.up_threshold, meta::THRESH_UP),
            ("down_threshold", self.down_threshold, meta::THRESH_DOWN),
            ("up_ratio", self.up_ratio, meta::UP_RATIO),
            ("down_ratio", self.down_ratio, meta::DOWN_RATIO),
            ("knee", self.knee, meta::KNEE),
            ("attack", self.attack, meta::ATTACK_TIME),
            ("release", self.release, meta::RELEASE_TIME),
            ("makeup", self.makeup, meta::MAKEUP),
        ]
    }

    /// Copy with every value limited to its range.
    ///
    /// Threshold order is not touched here; the band enforces it when it
    /// builds its curve.
    pub fn clamped(&self) -> Self {
        Self {
            min_threshold: meta::THRESH_MIN.clamp(self.min_threshold),
            up_threshold: meta::THRESH_UP.clamp(self.up_threshold),
            down_threshold: meta::THRESH_DOWN.clamp(self.down_threshold),
            up_ratio: meta::UP_RATIO.clamp(self.up_ratio),
            down_ratio: meta::DOWN_RATIO.clamp(self.down_ratio),
            knee: meta::KNEE.clamp(self.knee),
            attack: meta::ATTACK_TIME.clamp(self.attack),
            release: meta::RELEASE_TIME.clamp(self.release),
            makeup: meta::MAKEUP.clamp(self.makeup),
            ..*self
        }
    }
}

/// Crossover parameters shared by all channels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrossoverSettings {
    /// Topology.
    pub mode: CrossoverMode,
    /// Split frequencies in Hz.
    pub splits: [f32; SPLITS_MAX],
    /// Use four bands instead of three.
    pub extra_band: bool,
}

impl Default for CrossoverSettings {
    fn default() -> Self {
        Self {
            mode: CrossoverMode::default(),
            splits: meta::SPLITS.map(|r| r.default),
            extra_band: false,
        }
    }
}

impl CrossoverSettings {
    /// Number of active bands.
    pub fn bands(&self) -> usize {
        if self.extra_band { BANDS_MAX } else { BANDS_DFL }
    }

    /// Copy with splits inside their ranges and at least
    /// [`SPLIT_GUARD`] Hz apart.
    pub fn clamped(&self) -> Self {
        let mut splits = self.splits;
        for (i, f) in splits.iter_mut().enumerate() {
            *f = meta::SPLITS[i].clamp(*f);
        }
        for i in 1..SPLITS_MAX {
            splits[i] = splits[i].max(splits[i - 1] + SPLIT_GUARD);
        }
        Self { splits, ..*self }
    }
}

/// Sidechain routing and detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SidechainSettings {
    /// Signal source.
    pub kind: SidechainType,
    /// Detection mode.
    pub mode: SidechainMode,
    /// Stereo component.
    pub source: SidechainSource,
    /// Detector output gain (linear).
    pub preamp: f32,
    /// Detector window / time constant in ms.
    pub reactivity: f32,
    /// Emphasis filter applied to the detector input.
    pub boost: BoostMode,
}

impl Default for SidechainSettings {
    fn default() -> Self {
        Self {
            kind: SidechainType::default(),
            mode: SidechainMode::default(),
            source: SidechainSource::default(),
            preamp: meta::SC_PREAMP.default,
            reactivity: meta::REACTIVITY.default,
            boost: BoostMode::default(),
        }
    }
}

/// Complete compressor settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Bypass with crossfade.
    pub bypass: bool,
    /// Input gain (linear).
    pub input_gain: f32,
    /// Output gain (linear).
    pub output_gain: f32,
    /// Dry signal gain (linear).
    pub dry_gain: f32,
    /// Processed signal gain (linear).
    pub wet_gain: f32,
    /// Lookahead in ms.
    pub lookahead: f32,
    /// Surge protection on internal sidechain.
    pub surge_protection: bool,
    /// Sidechain parameters.
    pub sidechain: SidechainSettings,
    /// Crossover parameters.
    pub crossover: CrossoverSettings,
    /// Band parameters (first channel, or both in stereo mode).
    pub bands: [BandSettings; BANDS_MAX],
    /// Second channel band parameters in left/right and mid/side modes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_bands: Option<[BandSettings; BANDS_MAX]>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bypass: false,
            input_gain: meta::IN_GAIN.default,
            output_gain: meta::OUT_GAIN.default,
            dry_gain: meta::DRY_GAIN.default,
            wet_gain: meta::WET_GAIN.default,
            lookahead: meta::LOOKAHEAD.default,
            surge_protection: true,
            sidechain: SidechainSettings::default(),
            crossover: CrossoverSettings::default(),
            bands: [BandSettings::default(); BANDS_MAX],
            channel_bands: None,
        }
    }
}

impl Settings {
    /// Load settings from a TOML string.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Serialize to TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Load settings from a JSON string.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Serialize to JSON.
    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Band settings read by `channel` in `mode`.
    ///
    /// In mono and stereo mode every channel reads [`bands`](Self::bands);
    /// in left/right and mid/side mode the second channel reads
    /// [`channel_bands`](Self::channel_bands), falling back to `bands`.
    pub fn bands_for(&self, channel: usize, mode: OperatingMode) -> &[BandSettings; BANDS_MAX] {
        match (&self.channel_bands, channel) {
            (Some(second), 1) if mode.split_bands() => second,
            _ => &self.bands,
        }
    }

    /// Copy with every value limited to its declared range.
    pub fn clamped(&self) -> Self {
        Self {
            input_gain: meta::IN_GAIN.clamp(self.input_gain),
            output_gain: meta::OUT_GAIN.clamp(self.output_gain),
            dry_gain: meta::DRY_GAIN.clamp(self.dry_gain),
            wet_gain: meta::WET_GAIN.clamp(self.wet_gain),
            lookahead: meta::LOOKAHEAD.clamp(self.lookahead),
            sidechain: SidechainSettings {
                preamp: meta::SC_PREAMP.clamp(self.sidechain.preamp),
                reactivity: meta::REACTIVITY.clamp(self.sidechain.reactivity),
                ..self.sidechain
            },
            crossover: self.crossover.clamped(),
            bands: self.bands.map(|b| b.clamped()),
            channel_bands: self.channel_bands.map(|bands| bands.map(|b| b.clamped())),
            ..*self
        }
    }

    /// Report the first value outside its range.
    ///
    /// The engine clamps regardless; this is meant for preset tooling.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut checks: Vec<(String, f32, ParamRange)> = vec![
            ("input_gain".into(), self.input_gain, meta::IN_GAIN),
            ("output_gain".into(), self.output_gain, meta::OUT_GAIN),
            ("dry_gain".into(), self.dry_gain, meta::DRY_GAIN),
            ("wet_gain".into(), self.wet_gain, meta::WET_GAIN),
            ("lookahead".into(), self.lookahead, meta::LOOKAHEAD),
            ("sidechain.preamp".into(), self.sidechain.preamp, meta::SC_PREAMP),
            ("sidechain.reactivity".into(), self.sidechain.reactivity, meta::REACTIVITY),
        ];
        for (i, f) in self.crossover.splits.iter().enumerate() {
            checks.push((format!("crossover.splits[{i}]"), *f, meta::SPLITS[i]));
        }

        let sets = [Some(("bands", &self.bands)), self.channel_bands.as_ref().map(|b| ("channel_bands", b))];
        for (name, bands) in sets.into_iter().flatten() {
            for (i, band) in bands.iter().enumerate() {
                for (param, value, range) in band.ranged() {
                    checks.push((format!("{name}[{i}].{param}"), value, range));
                }
            }
        }

        match checks.into_iter().find(|(_, v, r)| !r.contains(*v)) {
            Some((param, value, range)) => Err(ConfigError::OutOfRange {
                param,
                value,
                min: range.min,
                max: range.max,
            }),
            None => Ok(()),
        }
    }
}
