// SPDX-License-Identifier: LGPL-3.0-or-later

//! Utility processing modules: crossovers, sidechain detection and delay
//! lines.

pub mod crossover;
pub mod delay;
pub mod fft_crossover;
pub mod sidechain;
