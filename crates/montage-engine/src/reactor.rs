//! A Reactor that tracks gestures and phrases and logs what it would play.
//!
//! Synthesis and visuals live outside the router, so the engine ships this
//! stand-in. It keeps enough state to exercise the router contract end to
//! end: live gestures time out into synthesized ups, phrases are played
//! note by note as clicks advance, and a small parameter store answers
//! `region.set` / `region.get`.

use std::collections::BTreeMap;

use montage_core::RouterError;
use montage_core::args::{ArgMap, need_string};
use montage_core::reactor::Reactor;
use montage_types::{
    Clicks, DownDragUp, GestureDeviceEvent, GestureStepEvent, MidiDeviceEvent, Note, Phrase,
    Region,
};
use serde_json::{Value, json};
use tracing::{debug, info};

/// Milliseconds without movement after which a gesture is considered lifted.
pub const GESTURE_TIMEOUT_MS: u64 = 2000;

/// A scheduled note: absolute click it sounds at, and the note itself.
type Scheduled = (Clicks, Note);

/// Per-region stand-in Reactor.
#[derive(Debug)]
pub struct LoggingReactor {
    region: Region,
    /// Live gesture ids and the time of their last movement.
    active: BTreeMap<String, u64>,
    /// Notes waiting to sound, ordered by click.
    pending: Vec<Scheduled>,
    current_click: Clicks,
    /// Clock time of the latest gesture-up check.
    now_ms: u64,
    params: BTreeMap<String, String>,
    notes_played: u64,
}

impl LoggingReactor {
    /// A Reactor for `region` with no state.
    pub const fn new(region: Region) -> Self {
        Self {
            region,
            active: BTreeMap::new(),
            pending: Vec::new(),
            current_click: Clicks::ZERO,
            now_ms: 0,
            params: BTreeMap::new(),
            notes_played: 0,
        }
    }

    /// Number of gestures currently down.
    pub fn active_gestures(&self) -> usize {
        self.active.len()
    }

    /// Number of notes still scheduled.
    pub fn pending_notes(&self) -> usize {
        self.pending.len()
    }

    /// Notes played since startup.
    pub const fn notes_played(&self) -> u64 {
        self.notes_played
    }

    fn track(&mut self, id: &str, phase: DownDragUp, now_ms: u64) {
        match phase {
            DownDragUp::Down | DownDragUp::Drag => {
                self.active.insert(id.to_owned(), now_ms);
            }
            DownDragUp::Up => {
                self.active.remove(id);
            }
        }
    }

    fn status(&self) -> Value {
        json!({
            "region": self.region.to_string(),
            "gestures": self.active_gestures(),
            "pending": self.pending_notes(),
            "played": self.notes_played(),
            "click": self.current_click.get(),
        })
    }
}

impl Reactor for LoggingReactor {
    fn handle_gesture(&mut self, event: &GestureDeviceEvent) {
        debug!(
            region = %self.region,
            id = %event.id,
            phase = %event.down_drag_up,
            x = event.x,
            y = event.y,
            z = event.z,
            "Gesture"
        );
        self.track(&event.id, event.down_drag_up, event.timestamp_ms);
    }

    fn handle_midi_input(&mut self, event: &MidiDeviceEvent) {
        debug!(region = %self.region, bytes = %event.to_hex_bytes(), "MIDI input");
    }

    fn send_all_notes_off(&mut self) {
        if !self.pending.is_empty() {
            info!(region = %self.region, dropped = self.pending.len(), "All notes off");
        }
        self.pending.clear();
    }

    fn handle_midi_time_reset(&mut self) {
        debug!(region = %self.region, "MIDI time reset");
    }

    fn check_gesture_up(&mut self, now_ms: u64) {
        self.now_ms = now_ms;
        let region = self.region;
        self.active.retain(|id, last| {
            let stale = now_ms.saturating_sub(*last) > GESTURE_TIMEOUT_MS;
            if stale {
                info!(%region, id = %id, "Gesture timed out, synthesizing up");
            }
            !stale
        });
    }

    fn advance_by_one_click(&mut self, click: Clicks) {
        self.current_click = click;
        let due = self.pending.partition_point(|(at, _)| *at <= click);
        for (at, note) in self.pending.drain(..due) {
            debug!(
                region = %self.region,
                click = %at,
                channel = note.channel,
                pitch = note.pitch,
                velocity = note.velocity,
                "Note"
            );
            self.notes_played = self.notes_played.saturating_add(1);
        }
    }

    fn start_phrase(&mut self, phrase: Phrase, source: &str) {
        let origin = self.current_click.next();
        info!(
            region = %self.region,
            source,
            notes = phrase.num_notes(),
            start = %origin,
            "Starting phrase"
        );
        for note in phrase.notes() {
            let at = Clicks(origin.get().saturating_add(note.click.get()));
            let index = self.pending.partition_point(|(t, _)| *t <= at);
            self.pending.insert(index, (at, *note));
        }
    }

    fn execute_api(
        &mut self,
        api: &str,
        args: &ArgMap,
        _raw_args: &str,
    ) -> Result<Value, RouterError> {
        match api {
            "set" => {
                let name = need_string(args, "name", api)?;
                let value = need_string(args, "value", api)?;
                self.params.insert(name.to_owned(), value.to_owned());
                Ok(json!("0"))
            }
            "get" => {
                let name = need_string(args, "name", api)?;
                Ok(json!(self.params.get(name).cloned().unwrap_or_default()))
            }
            "status" => Ok(self.status()),
            other => Err(RouterError::UnrecognizedApi(format!("region.{other}"))),
        }
    }

    fn generate_sprite(&mut self, id: &str, x: f32, y: f32, z: f32) {
        debug!(region = %self.region, id, x, y, z, "Sprite");
    }

    fn replay_gesture_step(&mut self, step: &GestureStepEvent) {
        debug!(region = %self.region, id = %step.id, phase = %step.down_drag_up, "Replayed gesture");
        self.track(&step.id, step.down_drag_up, self.now_ms);
    }
}
