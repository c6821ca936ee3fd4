// SPDX-License-Identifier: LGPL-3.0-or-later

//! Control utilities for audio processing.
//!
//! - `Bypass`: Smooth bypass with crossfading
//! - `Counter`: Sample-based refresh counter

pub mod bypass;
pub mod counter;

pub use bypass::Bypass;
pub use counter::Counter;
