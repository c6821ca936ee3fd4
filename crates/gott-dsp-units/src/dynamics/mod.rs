// SPDX-License-Identifier: LGPL-3.0-or-later

//! Dynamics: the dot-curve processor and the surge protector.

pub mod processor;
pub mod surge_protector;

pub use processor::{DynamicDot, DynamicProcessor};
pub use surge_protector::{SurgeProtector, SurgeState};
