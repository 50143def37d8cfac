//! API name parsing.
//!
//! API names have the form `<prefix>.<suffix>`. The `region` prefix
//! forwards the suffix to a Reactor untouched; the `global` prefix selects
//! one of the closed set of [`GlobalApi`] operations handled by the router.

use std::str::FromStr;

use crate::error::RouterError;

/// Router-level operations reachable as `global.<name>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlobalApi {
    /// Load a MIDI file and play channels 1-4 on the first four regions.
    MidiFile,
    /// Return the `value` argument, or `ECHO!`.
    Echo,
    /// Toggle a debug flag.
    Debug,
    /// Scale the tempo.
    SetTempoFactor,
    /// Pulse the audio engine transport off and on.
    AudioReset,
    /// Begin a new recording.
    RecordingStart,
    /// End the current recording.
    RecordingStop,
    /// Copy the last recording under a new name.
    RecordingSave,
    /// Replay a saved recording.
    RecordingPlay,
    /// Abort the playback in progress.
    RecordingPlaybackStop,
}

impl GlobalApi {
    /// The suffix that names this operation.
    pub const fn name(self) -> &'static str {
        match self {
            Self::MidiFile => "midi_midifile",
            Self::Echo => "echo",
            Self::Debug => "debug",
            Self::SetTempoFactor => "set_tempo_factor",
            Self::AudioReset => "audio_reset",
            Self::RecordingStart => "recordingStart",
            Self::RecordingStop => "recordingStop",
            Self::RecordingSave => "recordingSave",
            Self::RecordingPlay => "recordingPlay",
            Self::RecordingPlaybackStop => "recordingPlaybackStop",
        }
    }
}

impl FromStr for GlobalApi {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "midi_midifile" => Ok(Self::MidiFile),
            "echo" => Ok(Self::Echo),
            "debug" => Ok(Self::Debug),
            "set_tempo_factor" => Ok(Self::SetTempoFactor),
            "audio_reset" => Ok(Self::AudioReset),
            "recordingStart" => Ok(Self::RecordingStart),
            "recordingStop" => Ok(Self::RecordingStop),
            "recordingSave" => Ok(Self::RecordingSave),
            "recordingPlay" => Ok(Self::RecordingPlay),
            "recordingPlaybackStop" => Ok(Self::RecordingPlaybackStop),
            _ => Err(()),
        }
    }
}

/// A parsed API name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall<'a> {
    /// `region.<suffix>`, forwarded to a Reactor.
    Region {
        /// The Reactor API name.
        suffix: &'a str,
    },
    /// `global.<name>`.
    Global(GlobalApi),
}

impl<'a> ApiCall<'a> {
    /// Parse a full API name.
    ///
    /// # Errors
    ///
    /// - [`RouterError::ApiFormat`] if there is no dot
    /// - [`RouterError::UnknownPrefix`] for a prefix other than `region`
    ///   or `global`
    /// - [`RouterError::UnrecognizedApi`] for an unknown `global` suffix
    pub fn parse(api: &'a str) -> Result<Self, RouterError> {
        let (prefix, suffix) = api
            .split_once('.')
            .ok_or_else(|| RouterError::ApiFormat(api.to_owned()))?;
        match prefix {
            "region" => Ok(Self::Region { suffix }),
            "global" => suffix
                .parse()
                .map(Self::Global)
                .map_err(|()| RouterError::UnrecognizedApi(api.to_owned())),
            other => Err(RouterError::UnknownPrefix {
                api: api.to_owned(),
                prefix: other.to_owned(),
            }),
        }
    }
}
