//! Shared type definitions for the Montage event router.
//!
//! Every crate in the workspace speaks in these types: the click counter
//! that measures musical time, the region letters that partition the
//! installation, participant identities, and the canonical event forms
//! that all input sources are normalized into.
//!
//! # Modules
//!
//! - [`clicks`] -- The [`Clicks`] tick counter.
//! - [`ids`] -- Participant identity ([`Nuid`]).
//! - [`region`] -- [`Region`] letters and the ordered [`RegionLetters`] pool.
//! - [`events`] -- Canonical gesture, MIDI, API and control events.
//! - [`phrase`] -- Timed note sequences handed to Reactors.

pub mod clicks;
pub mod events;
pub mod ids;
pub mod phrase;
pub mod region;

pub use clicks::Clicks;
pub use events::{
    ApiEvent, Command, DownDragUp, GestureDeviceEvent, GestureStepEvent, MidiBytesError,
    MidiDeviceEvent, UnknownGestureKind,
};
pub use ids::Nuid;
pub use phrase::{Note, Phrase};
pub use region::{Region, RegionError, RegionLetters};
