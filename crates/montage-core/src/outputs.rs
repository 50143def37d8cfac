//! Collaborators the router talks to but does not own.
//!
//! The bus publisher, the audio engine, the GUI and the MIDI-file loader
//! sit behind small traits so the router can be driven in tests with
//! [`NullOutputs`] or a recording stub.

use std::sync::Arc;

use montage_types::{GestureDeviceEvent, MidiDeviceEvent, Phrase};

/// A failed outbound send.
#[derive(Debug, thiserror::Error)]
#[error("{target} send failed: {message}")]
pub struct OutputError {
    /// Which output failed.
    pub target: &'static str,
    /// Description of the failure.
    pub message: String,
}

/// Publishes canonical events onto the distributed bus.
pub trait EventPublisher: Send + Sync {
    /// Publish a gesture as `cursor_<phase>`.
    ///
    /// # Errors
    ///
    /// Returns [`OutputError`] if the event cannot be queued.
    fn publish_gesture(&self, event: &GestureDeviceEvent) -> Result<(), OutputError>;

    /// Publish a raw MIDI message as `midi`.
    ///
    /// # Errors
    ///
    /// Returns [`OutputError`] if the event cannot be queued.
    fn publish_midi(&self, event: &MidiDeviceEvent) -> Result<(), OutputError>;
}

/// The audio engine's transport control.
pub trait AudioEngine: Send + Sync {
    /// Turn playback on or off.
    ///
    /// # Errors
    ///
    /// Returns [`OutputError`] if the message cannot be sent.
    fn set_transport(&self, playing: bool) -> Result<(), OutputError>;
}

/// Notifications to the operator GUI.
pub trait GuiNotifier: Send + Sync {
    /// Announce a named event (`start`, `stop`, `restart`).
    ///
    /// # Errors
    ///
    /// Returns [`OutputError`] if the message cannot be sent.
    fn notify(&self, name: &str) -> Result<(), OutputError>;
}

/// Turns a named MIDI file into a [`Phrase`].
pub trait PhraseLoader: Send + Sync {
    /// Load the file called `name`.
    ///
    /// # Errors
    ///
    /// Returns [`OutputError`] if the file cannot be read or parsed.
    fn load(&self, name: &str) -> Result<Phrase, OutputError>;
}

/// The full set of collaborators handed to the router.
#[derive(Clone)]
pub struct Collaborators {
    /// Bus publisher.
    pub publisher: Arc<dyn EventPublisher>,
    /// Audio engine transport.
    pub audio: Arc<dyn AudioEngine>,
    /// GUI notifications.
    pub gui: Arc<dyn GuiNotifier>,
    /// MIDI-file loader.
    pub phrases: Arc<dyn PhraseLoader>,
}

impl Collaborators {
    /// Every collaborator replaced by [`NullOutputs`].
    pub fn null() -> Self {
        let null = Arc::new(NullOutputs);
        Self {
            publisher: null.clone(),
            audio: null.clone(),
            gui: null.clone(),
            phrases: null,
        }
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

/// Collaborators that accept everything and do nothing.
///
/// The phrase loader always fails, since there are no files to read.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullOutputs;

impl EventPublisher for NullOutputs {
    fn publish_gesture(&self, _event: &GestureDeviceEvent) -> Result<(), OutputError> {
        Ok(())
    }

    fn publish_midi(&self, _event: &MidiDeviceEvent) -> Result<(), OutputError> {
        Ok(())
    }
}

impl AudioEngine for NullOutputs {
    fn set_transport(&self, _playing: bool) -> Result<(), OutputError> {
        Ok(())
    }
}

impl GuiNotifier for NullOutputs {
    fn notify(&self, _name: &str) -> Result<(), OutputError> {
        Ok(())
    }
}

impl PhraseLoader for NullOutputs {
    fn load(&self, name: &str) -> Result<Phrase, OutputError> {
        Err(OutputError {
            target: "midifile",
            message: format!("no phrase source for {name}"),
        })
    }
}
