//! Error types for the router.
//!
//! [`RouterError`] is what every event and API entry point returns. Its
//! `Display` text is the message carried in the `{"error": ...}` response
//! sent back to bus callers.

use crate::clock::ClockError;
use crate::recording::RecordingError;
use montage_types::MidiBytesError;

/// Errors produced while routing events and executing APIs.
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    /// Arguments were not a JSON object of flat values.
    #[error("unable to interpret value - {message}")]
    BadJson {
        /// What was wrong with the input.
        message: String,
    },

    /// A required argument was absent.
    #[error("api/event={api} missing value for {name}")]
    MissingArg {
        /// The API or event being handled.
        api: String,
        /// The missing argument name.
        name: String,
    },

    /// An argument was present but could not be parsed.
    #[error("api/event={api} bad value for {name} ({value})")]
    BadArg {
        /// The API or event being handled.
        api: String,
        /// The argument name.
        name: String,
        /// The offending value.
        value: String,
    },

    /// A bus request lacked one of `api`, `nuid` or `params`.
    #[error("Missing {0} parameter")]
    MissingParameter(&'static str),

    /// An API name without a dot.
    #[error("api={0} is badly formatted, needs a dot")]
    ApiFormat(String),

    /// An API prefix other than `region` or `global`.
    #[error("api={api} unknown apiprefix={prefix}")]
    UnknownPrefix {
        /// The full API name.
        api: String,
        /// The unrecognized prefix.
        prefix: String,
    },

    /// A `global.*` API that does not exist.
    #[error("unrecognized api={0}")]
    UnrecognizedApi(String),

    /// No Reactor owns the requested region.
    #[error("there is no region named '{0}'")]
    NoRegion(String),

    /// An event whose main kind is not `cursor`, `sprite` or `midi`.
    #[error("unrecognized event kind={0}")]
    UnknownEvent(String),

    /// A `debug` API naming a flag that does not exist.
    #[error("unrecognized debug flag={0}")]
    UnknownDebugFlag(String),

    /// A cursor event with an unknown phase.
    #[error(transparent)]
    UnknownGesture(#[from] montage_types::UnknownGestureKind),

    /// A MIDI `bytes` argument that did not decode.
    #[error(transparent)]
    MidiBytes(#[from] MidiBytesError),

    /// A tempo change was rejected.
    #[error("clock error: {source}")]
    Clock {
        /// The underlying clock error.
        #[from]
        source: ClockError,
    },

    /// Recording or playback file handling failed.
    #[error("recording error: {source}")]
    Recording {
        /// The underlying recording error.
        #[from]
        source: RecordingError,
    },

    /// The phrase loader could not produce a phrase.
    #[error("midi file error: {message}")]
    MidiFile {
        /// Description of the failure.
        message: String,
    },

    /// A Reactor rejected an API call.
    #[error("{message}")]
    Reactor {
        /// The Reactor's error message.
        message: String,
    },
}

impl RouterError {
    /// Shorthand for [`RouterError::MissingArg`].
    pub fn missing(api: &str, name: &str) -> Self {
        Self::MissingArg {
            api: api.to_owned(),
            name: name.to_owned(),
        }
    }

    /// Shorthand for [`RouterError::BadArg`].
    pub fn bad(api: &str, name: &str, value: &str) -> Self {
        Self::BadArg {
            api: api.to_owned(),
            name: name.to_owned(),
            value: value.to_owned(),
        }
    }
}
