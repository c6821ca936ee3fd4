// SPDX-License-Identifier: LGPL-3.0-or-later

//! Error types of the compressor engine and its settings.

use thiserror::Error;

/// Errors returned by [`Compressor::process`](crate::Compressor::process).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The engine was not initialized.
    #[error("engine is not initialized")]
    NotReady,

    /// Fewer buffers than channels.
    #[error("expected {expected} {what} channel(s), got {got}")]
    ChannelMismatch {
        /// Which buffer set.
        what: &'static str,
        /// Channels required by the operating mode.
        expected: usize,
        /// Channels supplied.
        got: usize,
    },

    /// A buffer is shorter than the input block.
    #[error("{what} buffer holds {got} samples, block has {expected}")]
    BlockMismatch {
        /// Which buffer set.
        what: &'static str,
        /// Samples in the input block.
        expected: usize,
        /// Samples in the short buffer.
        got: usize,
    },
}

/// Errors raised while reading, writing or validating settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to parse TOML
    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Failed to serialize TOML
    #[error("failed to serialize TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// Failed to parse or serialize JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Parameter value out of range
    #[error("parameter '{param}' value {value} out of range [{min}, {max}]")]
    OutOfRange {
        /// Parameter path, e.g. `bands[1].knee`.
        param: String,
        /// The rejected value.
        value: f32,
        /// Minimum allowed value.
        min: f32,
        /// Maximum allowed value.
        max: f32,
    },
}
