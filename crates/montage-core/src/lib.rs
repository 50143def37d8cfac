//! The Montage event router.
//!
//! Live input from gesture surfaces, MIDI controllers, MIDI files and
//! remote participants on the bus is normalized into canonical events,
//! attributed to a region, and dispatched to that region's Reactor in
//! lockstep with a monotonic click clock. Event streams can be recorded
//! and replayed with their original timing.
//!
//! # Modules
//!
//! - [`api`] -- `<prefix>.<suffix>` API name parsing and [`GlobalApi`].
//! - [`args`] -- Flat argument maps and typed accessors.
//! - [`clock`] -- Wall-clock to click conversion with tempo changes.
//! - [`config`] -- Configuration loading into [`MontageConfig`].
//! - [`debug`] -- Runtime diagnostic switches.
//! - [`error`] -- [`RouterError`].
//! - [`outputs`] -- Bus publisher, audio engine, GUI and phrase loader seams.
//! - [`playback`] -- Replaying recordings.
//! - [`reactor`] -- The [`Reactor`] contract and region directory.
//! - [`recording`] -- The recording log format.
//! - [`regions`] -- NUID to region assignment.
//! - [`response`] -- JSON response envelopes.
//! - [`router`] -- The [`Router`] itself.
//!
//! [`GlobalApi`]: api::GlobalApi
//! [`MontageConfig`]: config::MontageConfig
//! [`RouterError`]: error::RouterError
//! [`Reactor`]: reactor::Reactor
//! [`Router`]: router::Router

pub mod api;
pub mod args;
pub mod clock;
pub mod config;
pub mod debug;
pub mod error;
pub mod outputs;
pub mod playback;
pub mod reactor;
pub mod recording;
pub mod regions;
pub mod response;
pub mod router;

pub use error::RouterError;
pub use reactor::{Reactor, RegionDirectory};
pub use router::{Router, RouterSettings};
