// SPDX-License-Identifier: LGPL-3.0-or-later

//! # gott-dsp-units
//!
//! Processing units for the GOTT multiband compressor, built on top of
//! [`gott_dsp_lib`]:
//!
//! - **Dynamics**: dot-curve dynamics processor, surge protector
//! - **Filters**: biquad filter, dynamic filter bank, envelope boost
//! - **Utilities**: classic and FFT crossovers, sidechain detector, delay
//! - **Control**: bypass crossfade, refresh counter

pub mod consts;
pub mod interpolation;
pub mod units;

pub mod ctl;
pub mod dynamics;
pub mod filters;
pub mod util;
