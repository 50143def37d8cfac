//! The Reactor contract and the region directory.
//!
//! A [`Reactor`] is the stateful receiver behind one region. The router
//! never looks inside it: it only delivers events, advances it one click at
//! a time, and forwards `region.*` API calls. The [`RegionDirectory`] is
//! built once at startup and never reassigned.

use std::collections::BTreeMap;

use montage_types::{
    Clicks, GestureDeviceEvent, GestureStepEvent, MidiDeviceEvent, Phrase, Region, RegionLetters,
};
use serde_json::Value;

use crate::args::ArgMap;
use crate::error::RouterError;

/// Operations the router requires of a region's Reactor.
///
/// Every call is made while the router's event lock is held, so
/// implementations never see two calls at once.
pub trait Reactor: Send {
    /// A live gesture routed to this region.
    fn handle_gesture(&mut self, event: &GestureDeviceEvent);

    /// A raw MIDI message from a device or the bus.
    fn handle_midi_input(&mut self, event: &MidiDeviceEvent);

    /// Silence every sounding note.
    fn send_all_notes_off(&mut self);

    /// Reset the Reactor's notion of MIDI time.
    fn handle_midi_time_reset(&mut self);

    /// Emit an `up` for gestures not seen recently. Called on beat boundaries.
    fn check_gesture_up(&mut self, now_ms: u64);

    /// Advance by exactly one click.
    fn advance_by_one_click(&mut self, click: Clicks);

    /// Begin playing `phrase`, labelled with its source.
    fn start_phrase(&mut self, phrase: Phrase, source: &str);

    /// Execute a `region.*` API suffix.
    ///
    /// # Errors
    ///
    /// Implementations return [`RouterError`] for unknown APIs or bad args.
    fn execute_api(
        &mut self,
        api: &str,
        args: &ArgMap,
        raw_args: &str,
    ) -> Result<Value, RouterError>;

    /// Generate a sprite at the given position.
    fn generate_sprite(&mut self, id: &str, x: f32, y: f32, z: f32);

    /// Apply a recorded gesture step.
    fn replay_gesture_step(&mut self, step: &GestureStepEvent);
}

/// An owned Reactor.
pub type BoxedReactor = Box<dyn Reactor>;

/// The fixed mapping from region to Reactor.
pub struct RegionDirectory {
    reactors: BTreeMap<Region, BoxedReactor>,
}

impl RegionDirectory {
    /// Create one Reactor per region letter.
    pub fn build(letters: &RegionLetters, mut factory: impl FnMut(Region) -> BoxedReactor) -> Self {
        Self {
            reactors: letters.iter().map(|region| (region, factory(region))).collect(),
        }
    }

    /// The Reactor for `region`, if one exists.
    pub fn get_mut(&mut self, region: Region) -> Option<&mut BoxedReactor> {
        self.reactors.get_mut(&region)
    }

    /// The Reactor for `region`, or [`RouterError::NoRegion`].
    ///
    /// `None` stands for the empty region handed out once the pool is
    /// exhausted.
    pub fn lookup(&mut self, region: Option<Region>) -> Result<&mut BoxedReactor, RouterError> {
        let name = region.map(|r| r.to_string()).unwrap_or_default();
        region
            .and_then(|r| self.reactors.get_mut(&r))
            .ok_or(RouterError::NoRegion(name))
    }

    /// Look up a Reactor by its region name.
    pub fn lookup_name(&mut self, name: &str) -> Result<&mut BoxedReactor, RouterError> {
        match Region::parse(name) {
            Some(region) => self
                .reactors
                .get_mut(&region)
                .ok_or_else(|| RouterError::NoRegion(name.to_owned())),
            None => Err(RouterError::NoRegion(name.to_owned())),
        }
    }

    /// Iterate over every region and its Reactor.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Region, &mut BoxedReactor)> {
        self.reactors.iter_mut().map(|(r, reactor)| (*r, reactor))
    }

    /// Broadcast all-notes-off.
    pub fn send_all_notes_off(&mut self) {
        for reactor in self.reactors.values_mut() {
            reactor.send_all_notes_off();
        }
    }

    /// Broadcast a raw MIDI message.
    pub fn broadcast_midi(&mut self, event: &MidiDeviceEvent) {
        for reactor in self.reactors.values_mut() {
            reactor.handle_midi_input(event);
        }
    }

    /// Number of regions.
    pub fn len(&self) -> usize {
        self.reactors.len()
    }

    /// Whether there are no regions.
    pub fn is_empty(&self) -> bool {
        self.reactors.is_empty()
    }
}

impl std::fmt::Debug for RegionDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegionDirectory")
            .field("regions", &self.reactors.keys().collect::<Vec<_>>())
            .finish()
    }
}
