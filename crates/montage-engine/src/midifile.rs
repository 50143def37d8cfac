//! Standard MIDI file loading for `global.midi_midifile`.
//!
//! Files are parsed with `midly` and flattened into a [`Phrase`] whose
//! note times are expressed in router clicks. Note-on/note-off pairs
//! (including note-on with velocity 0) become one note with a duration;
//! notes still sounding at the end of a track last until the track's end.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use midly::{MidiMessage, Smf, Timing, Track, TrackEventKind};
use montage_core::outputs::{OutputError, PhraseLoader};
use montage_types::{Clicks, Note, Phrase};
use tracing::{debug, info};

/// Errors converting a MIDI file into a phrase.
#[derive(Debug, thiserror::Error)]
pub enum MidiFileError {
    /// The bytes are not a valid standard MIDI file.
    #[error("invalid MIDI file: {message}")]
    Parse {
        /// Parser description of the problem.
        message: String,
    },

    /// SMPTE timecode files are not supported.
    #[error("timecode-based MIDI files are not supported")]
    UnsupportedTiming,

    /// The file declares zero ticks per beat.
    #[error("MIDI file declares zero ticks per beat")]
    ZeroResolution,

    /// A file name that is absolute or leaves the MIDI file directory.
    #[error("invalid MIDI file name {0:?}")]
    BadName(String),
}

/// Loads MIDI files from a directory.
#[derive(Debug, Clone)]
pub struct MidiFileLoader {
    dir: PathBuf,
    clicks_per_beat: u64,
}

impl MidiFileLoader {
    /// Resolve file names against `dir`, converting beats at `clicks_per_beat`.
    pub fn new(dir: impl Into<PathBuf>, clicks_per_beat: u64) -> Self {
        Self {
            dir: dir.into(),
            clicks_per_beat,
        }
    }

    /// Where `name` is looked up, always inside the loader's directory.
    ///
    /// # Errors
    ///
    /// Returns [`MidiFileError::BadName`] for empty or absolute names and
    /// names with `..` components.
    pub fn path_for(&self, name: &str) -> Result<PathBuf, MidiFileError> {
        let path = Path::new(name);
        let inside = !name.is_empty()
            && path
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        if !inside {
            return Err(MidiFileError::BadName(name.to_owned()));
        }
        Ok(self.dir.join(path))
    }
}

impl PhraseLoader for MidiFileLoader {
    fn load(&self, name: &str) -> Result<Phrase, OutputError> {
        let path = self.path_for(name).map_err(|e| OutputError {
            target: "midifile",
            message: e.to_string(),
        })?;
        let data = std::fs::read(&path).map_err(|e| OutputError {
            target: "midifile",
            message: format!("failed to read {}: {e}", path.display()),
        })?;
        let phrase = phrase_from_smf(&data, self.clicks_per_beat).map_err(|e| OutputError {
            target: "midifile",
            message: format!("{}: {e}", path.display()),
        })?;
        info!(path = %path.display(), notes = phrase.num_notes(), "MIDI file loaded");
        Ok(phrase)
    }
}

/// Parse a standard MIDI file into a phrase timed in clicks.
///
/// # Errors
///
/// Returns [`MidiFileError`] for unparsable files and unsupported timing.
pub fn phrase_from_smf(data: &[u8], clicks_per_beat: u64) -> Result<Phrase, MidiFileError> {
    let smf = Smf::parse(data).map_err(|e| MidiFileError::Parse {
        message: e.to_string(),
    })?;
    let ticks_per_beat = match smf.header.timing {
        Timing::Metrical(tpb) => u64::from(tpb.as_int()),
        Timing::Timecode(_, _) => return Err(MidiFileError::UnsupportedTiming),
    };
    if ticks_per_beat == 0 {
        return Err(MidiFileError::ZeroResolution);
    }
    debug!(
        tracks = smf.tracks.len(),
        ticks_per_beat, "Parsing MIDI file"
    );

    let scale = TickScale {
        ticks_per_beat,
        clicks_per_beat,
    };
    let mut phrase = Phrase::new();
    for track in &smf.tracks {
        for note in track_notes(track, scale) {
            phrase.push(note);
        }
    }
    Ok(phrase)
}

#[derive(Debug, Clone, Copy)]
struct TickScale {
    ticks_per_beat: u64,
    clicks_per_beat: u64,
}

impl TickScale {
    fn clicks(self, ticks: u64) -> Clicks {
        let scaled = ticks
            .saturating_mul(self.clicks_per_beat)
            .checked_div(self.ticks_per_beat)
            .unwrap_or(0);
        Clicks(scaled)
    }
}

fn track_notes(track: &Track<'_>, scale: TickScale) -> Vec<Note> {
    let mut notes = Vec::new();
    let mut sounding: BTreeMap<(u8, u8), (u64, u8)> = BTreeMap::new();
    let mut tick = 0_u64;

    for event in track {
        tick = tick.saturating_add(u64::from(event.delta.as_int()));
        let TrackEventKind::Midi { channel, message } = event.kind else {
            continue;
        };
        let channel = channel.as_int().saturating_add(1);
        match message {
            MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
                let key = key.as_int();
                if let Some((start, velocity)) = sounding.insert((channel, key), (tick, vel.as_int()))
                {
                    notes.push(make_note(scale, channel, key, velocity, start, tick));
                }
            }
            MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. } => {
                let key = key.as_int();
                if let Some((start, velocity)) = sounding.remove(&(channel, key)) {
                    notes.push(make_note(scale, channel, key, velocity, start, tick));
                }
            }
            _ => {}
        }
    }

    for ((channel, key), (start, velocity)) in sounding {
        notes.push(make_note(scale, channel, key, velocity, start, tick));
    }
    notes
}

fn make_note(scale: TickScale, channel: u8, pitch: u8, velocity: u8, start: u64, end: u64) -> Note {
    let click = scale.clicks(start);
    let duration = Clicks(scale.clicks(end).get().saturating_sub(click.get()));
    Note {
        click,
        channel,
        pitch,
        velocity,
        duration,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// Format 0, 96 ticks per beat, one track:
    /// channel 1 C4 for one beat, then channel 3 E4 for half a beat
    /// (released with a zero-velocity note-on), then end of track.
    const TWO_NOTES: [u8; 42] = [
        0x4D, 0x54, 0x68, 0x64, 0x00, 0x00, 0x00, 0x06, // MThd, length 6
        0x00, 0x00, 0x00, 0x01, 0x00, 0x60, // format 0, 1 track, 96 tpb
        0x4D, 0x54, 0x72, 0x6B, 0x00, 0x00, 0x00, 0x14, // MTrk, length 20
        0x00, 0x90, 0x3C, 0x64, // note on ch1 60 vel 100
        0x60, 0x80, 0x3C, 0x00, // +96 note off ch1 60
        0x00, 0x92, 0x40, 0x50, // note on ch3 64 vel 80
        0x30, 0x92, 0x40, 0x00, // +48 note on vel 0 (off)
        0x00, 0xFF, 0x2F, 0x00, // end of track
    ];

    #[test]
    fn notes_are_paired_and_scaled() {
        let phrase = phrase_from_smf(&TWO_NOTES, 96).unwrap();
        assert_eq!(
            phrase.notes(),
            &[
                Note {
                    click: Clicks(0),
                    channel: 1,
                    pitch: 60,
                    velocity: 100,
                    duration: Clicks(96),
                },
                Note {
                    click: Clicks(96),
                    channel: 3,
                    pitch: 64,
                    velocity: 80,
                    duration: Clicks(48),
                },
            ]
        );
    }

    #[test]
    fn resolution_is_converted_to_clicks() {
        let phrase = phrase_from_smf(&TWO_NOTES, 192).unwrap();
        let second = phrase.cut_channel(3);
        let note = second.notes().first().unwrap();
        assert_eq!(note.click, Clicks(192));
        assert_eq!(note.duration, Clicks(96));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(matches!(
            phrase_from_smf(b"not a midi file", 96),
            Err(MidiFileError::Parse { .. })
        ));
    }

    #[test]
    fn loader_reads_from_its_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("song.mid"), TWO_NOTES).unwrap();
        let loader = MidiFileLoader::new(dir.path(), 96);
        assert_eq!(loader.load("song.mid").unwrap().num_notes(), 2);
        assert!(loader.load("missing.mid").is_err());
    }

    #[test]
    fn names_stay_inside_the_directory() {
        let dir = tempfile::tempdir().unwrap();
        let loader = MidiFileLoader::new(dir.path().join("midi"), 96);
        std::fs::write(dir.path().join("secret.mid"), TWO_NOTES).unwrap();
        let outside = dir.path().join("secret.mid");

        assert!(matches!(
            loader.path_for("../secret.mid"),
            Err(MidiFileError::BadName(_))
        ));
        assert!(matches!(
            loader.path_for(outside.to_str().unwrap()),
            Err(MidiFileError::BadName(_))
        ));
        assert!(matches!(loader.path_for(""), Err(MidiFileError::BadName(_))));
        assert!(loader.load("../secret.mid").is_err());
        assert_eq!(
            loader.path_for("sets/song.mid").unwrap(),
            dir.path().join("midi").join("sets").join("song.mid")
        );
    }
}
