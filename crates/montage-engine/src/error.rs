//! Error types for the Montage engine binary.
//!
//! [`EngineError`] wraps every failure that can stop startup, so `main`
//! can propagate with `?`. Failures after startup are logged where they
//! happen and never reach this type.

use montage_core::clock::ClockError;
use montage_core::config::ConfigError;
use montage_types::RegionError;

/// Top-level error for the engine binary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A configuration value could not be used.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: ConfigError,
    },

    /// The configured region letters are not a usable pool.
    #[error("region error: {source}")]
    Region {
        /// The underlying region error.
        #[from]
        source: RegionError,
    },

    /// The configured tempo is unusable.
    #[error("clock error: {source}")]
    Clock {
        /// The underlying clock error.
        #[from]
        source: ClockError,
    },

    /// NATS connection or subscription failed.
    #[error("NATS error: {message}")]
    Nats {
        /// Description of the NATS failure.
        message: String,
    },

    /// An OSC socket could not be opened.
    #[error("OSC error: {message}")]
    Osc {
        /// Description of the OSC failure.
        message: String,
    },

    /// A MIDI input device could not be opened.
    #[cfg_attr(not(feature = "midi-device"), allow(dead_code))]
    #[error("MIDI device error: {message}")]
    Midi {
        /// Description of the MIDI failure.
        message: String,
    },
}
