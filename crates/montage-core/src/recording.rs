//! Recording live events to a time-tagged log and loading logs back.
//!
//! A log is UTF-8 text with one event per line:
//!
//! ```text
//! <seconds %.6f> <event_type> <region-or-*> <method> <json-args>
//! ```
//!
//! Recording always writes `LastRecording.json` in the recordings
//! directory; `recordingSave` copies it under a chosen name.

use std::fs::File;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::time::Instant;

use montage_types::{ApiEvent, GestureDeviceEvent};
use serde_json::json;
use tracing::{info, warn};

use crate::args::{ArgMap, string_map};

/// Base name of the file every recording is written to.
pub const LAST_RECORDING: &str = "LastRecording";

/// Errors raised while recording, saving or loading logs.
#[derive(Debug, thiserror::Error)]
pub enum RecordingError {
    /// Reading or writing a recording failed.
    #[error("recording I/O failed: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// A recording name that could escape the recordings directory.
    #[error("invalid recording name {0:?}")]
    BadName(String),
}

/// Event types a log line may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaybackKind {
    /// A gesture step.
    Cursor,
    /// A region API call.
    Pad,
    /// Sound parameter API.
    Sound,
    /// Visual parameter API.
    Visual,
    /// Effect parameter API.
    Effect,
    /// Performance API.
    Perform,
    /// Recording markers (`start`, `stop`).
    Global,
}

impl PlaybackKind {
    /// Parse the event-type field of a log line.
    pub fn parse(word: &str) -> Option<Self> {
        match word {
            "cursor" => Some(Self::Cursor),
            "pad" => Some(Self::Pad),
            "sound" => Some(Self::Sound),
            "visual" => Some(Self::Visual),
            "effect" => Some(Self::Effect),
            "perform" => Some(Self::Perform),
            "global" => Some(Self::Global),
            _ => None,
        }
    }

    /// The event-type field as written.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cursor => "cursor",
            Self::Pad => "pad",
            Self::Sound => "sound",
            Self::Visual => "visual",
            Self::Effect => "effect",
            Self::Perform => "perform",
            Self::Global => "global",
        }
    }

    /// Whether replay re-executes this event as a Reactor API call.
    pub const fn is_api(self) -> bool {
        matches!(
            self,
            Self::Pad | Self::Sound | Self::Visual | Self::Effect | Self::Perform
        )
    }
}

/// One line of a loaded recording.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackEvent {
    /// Seconds since the recording started.
    pub time: f64,
    /// Event type.
    pub kind: PlaybackKind,
    /// Region letter, or `*`.
    pub pad: String,
    /// Gesture phase or API method.
    pub method: String,
    /// Parsed arguments.
    pub args: ArgMap,
    /// Arguments as written.
    pub raw_args: String,
}

/// The live recording state.
#[derive(Debug)]
pub struct Recorder {
    dir: PathBuf,
    file: Option<File>,
    began: Instant,
    on: bool,
}

impl Recorder {
    /// A recorder writing into `dir`, initially off.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            file: None,
            began: Instant::now(),
            on: false,
        }
    }

    /// Whether recording is on.
    pub const fn is_on(&self) -> bool {
        self.on
    }

    /// The file a recording called `name` lives in.
    pub fn path_for(&self, name: &str) -> Result<PathBuf, RecordingError> {
        check_name(name)?;
        Ok(self.dir.join(format!("{name}.json")))
    }

    /// Start a fresh recording, truncating `LastRecording.json`.
    ///
    /// # Errors
    ///
    /// Returns [`RecordingError::Io`] if the file cannot be created.
    pub fn start(&mut self) -> Result<(), RecordingError> {
        if self.file.take().is_some() {
            warn!("Recording file was still open, closing it");
        }
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(LAST_RECORDING)?;
        self.file = Some(File::create(&path)?);
        self.began = Instant::now();
        self.on = true;
        info!(path = %path.display(), "Recording started");
        self.record("global", "*", "start", "{}")
    }

    /// Write the stop marker and close the file.
    ///
    /// # Errors
    ///
    /// Returns [`RecordingError::Io`] if the marker cannot be written.
    pub fn stop(&mut self) -> Result<(), RecordingError> {
        let result = if self.on {
            self.record("global", "*", "stop", "{}")
        } else {
            Ok(())
        };
        self.file = None;
        self.on = false;
        result
    }

    /// Close the file if open and copy `LastRecording.json` to `<name>.json`.
    ///
    /// # Errors
    ///
    /// Returns [`RecordingError::BadName`] for names containing path
    /// separators or `..`, and [`RecordingError::Io`] if the copy fails.
    pub fn save(&mut self, name: &str) -> Result<PathBuf, RecordingError> {
        let destination = self.path_for(name)?;
        self.file = None;
        let source = self.path_for(LAST_RECORDING)?;
        let bytes = std::fs::copy(&source, &destination)?;
        info!(path = %destination.display(), bytes, "Recording saved");
        Ok(destination)
    }

    /// Append one line if recording is on.
    ///
    /// Arguments that do not start with `{` or that span lines are logged
    /// and skipped.
    ///
    /// # Errors
    ///
    /// Returns [`RecordingError::Io`] if the write or sync fails.
    pub fn record(
        &mut self,
        event_type: &str,
        pad: &str,
        method: &str,
        args: &str,
    ) -> Result<(), RecordingError> {
        if !self.on {
            return Ok(());
        }
        if !args.starts_with('{') || args.contains('\n') {
            warn!(event_type, method, args, "Recorded args must be a one-line JSON object");
            return Ok(());
        }
        let Some(file) = self.file.as_mut() else {
            warn!("Recording is on but no file is open");
            return Ok(());
        };
        let secs = self.began.elapsed().as_secs_f64();
        let line = format!("{secs:.6} {event_type} {pad} {method} {args}\n");
        file.write_all(line.as_bytes())?;
        file.sync_data()?;
        Ok(())
    }

    /// Record a successful API call.
    ///
    /// # Errors
    ///
    /// Returns [`RecordingError::Io`] if the write fails.
    pub fn record_api(&mut self, event: &ApiEvent) -> Result<(), RecordingError> {
        self.record(&event.api_type, &event.pad, &event.method, &event.raw_args)
    }

    /// Record a live gesture as a `cursor` line.
    ///
    /// # Errors
    ///
    /// Returns [`RecordingError::Io`] if the write fails.
    pub fn record_gesture(&mut self, event: &GestureDeviceEvent) -> Result<(), RecordingError> {
        let args = json!({
            "id": event.id,
            "x": event.x,
            "y": event.y,
            "z": event.z,
        })
        .to_string();
        self.record(
            "cursor",
            &event.region.to_string(),
            event.down_drag_up.as_str(),
            &args,
        )
    }
}

fn check_name(name: &str) -> Result<(), RecordingError> {
    if name.is_empty() || name.contains(['/', '\\']) || name.contains("..") {
        return Err(RecordingError::BadName(name.to_owned()));
    }
    Ok(())
}

/// Read and parse a recording file.
///
/// Lines that are not valid UTF-8 are skipped like any other malformed line.
///
/// # Errors
///
/// Returns [`RecordingError::Io`] if the file cannot be read.
pub fn load_recording(path: &Path) -> Result<Vec<PlaybackEvent>, RecordingError> {
    let bytes = std::fs::read(path)?;
    let lines = bytes
        .split(|byte| *byte == b'\n')
        .enumerate()
        .filter_map(|(index, line)| match std::str::from_utf8(line) {
            Ok(line) => Some(line),
            Err(e) => {
                warn!(line = index.saturating_add(1), error = %e, "Recording line is not UTF-8");
                None
            }
        });
    let events = parse_lines(lines);
    info!(path = %path.display(), events = events.len(), "Recording loaded");
    Ok(events)
}

/// Parse recording text, skipping malformed lines with a warning.
pub fn parse_recording(text: &str) -> Vec<PlaybackEvent> {
    parse_lines(text.lines())
}

fn parse_lines<'a>(lines: impl Iterator<Item = &'a str>) -> Vec<PlaybackEvent> {
    lines
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(parse_line)
        .collect()
}

fn parse_line(line: &str) -> Option<PlaybackEvent> {
    let words: Vec<&str> = line.splitn(5, ' ').collect();
    let (time, kind, pad, method, raw_args) = match words.as_slice() {
        [time, kind, pad, method] => (*time, *kind, *pad, *method, "{}"),
        [time, kind, pad, method, raw_args] => (*time, *kind, *pad, *method, *raw_args),
        _ => {
            warn!(line, "Recording line has fewer than 4 fields");
            return None;
        }
    };
    let Ok(time) = time.parse::<f64>() else {
        warn!(line, "Unable to parse time in recording");
        return None;
    };
    let Some(kind) = PlaybackKind::parse(kind) else {
        warn!(kind, "Unknown event type in recording");
        return None;
    };
    let args = match string_map(raw_args) {
        Ok(args) => args,
        Err(e) => {
            warn!(error = %e, "Unable to parse recorded args");
            return None;
        }
    };
    Some(PlaybackEvent {
        time,
        kind,
        pad: pad.to_owned(),
        method: method.to_owned(),
        args,
        raw_args: raw_args.to_owned(),
    })
}
