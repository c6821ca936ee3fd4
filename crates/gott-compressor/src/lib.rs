// SPDX-License-Identifier: LGPL-3.0-or-later

//! # gott-compressor
//!
//! GOTT multiband compressor engine built on [`gott_dsp_units`]:
//!
//! - three or four bands, each with an upward and a downward section
//!   around its own sidechain detector
//! - classic (Linkwitz-Riley), modern (dynamic shelves) and linear-phase
//!   (FFT) crossovers
//! - internal, external or linked sidechain with envelope boost
//! - surge protection that mutes runaway input levels
//! - mono, stereo, left/right and mid/side operation
//!
//! [`Settings`] loads from TOML or JSON; [`Compressor`] applies it and
//! processes blocks of any length. With the `tracing` feature (on by
//! default) initialization, sample rate, crossover and latency changes
//! are logged at debug level.

pub mod config;
pub mod error;
pub mod mesh;
pub mod meta;

mod band;
mod channel;
mod engine;

pub use band::BandMeters;
pub use config::{
    BandSettings, BoostMode, CrossoverMode, CrossoverSettings, OperatingMode, Settings,
    SidechainMode, SidechainSettings, SidechainSource, SidechainType,
};
pub use engine::{Compressor, ProcessBuffers};
pub use error::{ConfigError, EngineError};
pub use gott_dsp_units::dynamics::surge_protector::SurgeState;
pub use mesh::Mesh;
