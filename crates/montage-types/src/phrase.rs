//! Timed note sequences.
//!
//! A [`Phrase`] is what a MIDI file (or any other phrase source) is reduced
//! to before a Reactor schedules it against its own click counter.

use serde::{Deserialize, Serialize};

use crate::clicks::Clicks;

/// One note within a phrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Offset from the start of the phrase.
    pub click: Clicks,
    /// MIDI channel, 1-based.
    pub channel: u8,
    /// Note number.
    pub pitch: u8,
    /// Note-on velocity.
    pub velocity: u8,
    /// Length of the note.
    pub duration: Clicks,
}

/// An ordered sequence of notes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phrase {
    notes: Vec<Note>,
}

impl Phrase {
    /// An empty phrase.
    pub const fn new() -> Self {
        Self { notes: Vec::new() }
    }

    /// Append a note, keeping the sequence ordered by start click.
    pub fn push(&mut self, note: Note) {
        let at = self.notes.partition_point(|n| n.click <= note.click);
        self.notes.insert(at, note);
    }

    /// A new phrase holding only the notes on `channel`.
    pub fn cut_channel(&self, channel: u8) -> Self {
        Self {
            notes: self
                .notes
                .iter()
                .filter(|n| n.channel == channel)
                .copied()
                .collect(),
        }
    }

    /// Number of notes in the phrase.
    pub fn num_notes(&self) -> usize {
        self.notes.len()
    }

    /// The notes, ordered by start click.
    pub fn notes(&self) -> &[Note] {
        &self.notes
    }
}

impl FromIterator<Note> for Phrase {
    fn from_iter<I: IntoIterator<Item = Note>>(iter: I) -> Self {
        let mut phrase = Self::new();
        for note in iter {
            phrase.push(note);
        }
        phrase
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(click: u64, channel: u8, pitch: u8) -> Note {
        Note {
            click: Clicks(click),
            channel,
            pitch,
            velocity: 100,
            duration: Clicks(48),
        }
    }

    #[test]
    fn push_orders_by_click() {
        let phrase: Phrase = [note(96, 1, 60), note(0, 1, 62), note(96, 2, 64)]
            .into_iter()
            .collect();
        let pitches: Vec<u8> = phrase.notes().iter().map(|n| n.pitch).collect();
        assert_eq!(pitches, vec![62, 60, 64]);
    }

    #[test]
    fn cut_channel_filters() {
        let phrase: Phrase = [note(0, 1, 60), note(10, 2, 62), note(20, 1, 64)]
            .into_iter()
            .collect();
        let one = phrase.cut_channel(1);
        assert_eq!(one.num_notes(), 2);
        assert_eq!(phrase.cut_channel(3).num_notes(), 0);
    }
}
