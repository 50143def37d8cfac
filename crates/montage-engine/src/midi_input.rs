//! Local MIDI controller input.
//!
//! Each configured port gets its own connection whose callback forwards raw
//! messages into the dispatch queue. Device support is behind the
//! `midi-device` feature; without it configured ports are reported and
//! ignored.

use montage_types::MidiDeviceEvent;
use tokio::sync::mpsc;
#[cfg(not(feature = "midi-device"))]
use tracing::warn;

#[cfg(feature = "midi-device")]
use crate::error::EngineError;

/// Open MIDI input connections. Dropping this closes them.
pub struct MidiInputs {
    #[cfg(feature = "midi-device")]
    connections: Vec<midir::MidiInputConnection<()>>,
}

impl std::fmt::Debug for MidiInputs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MidiInputs")
            .field("open", &self.open_count())
            .finish()
    }
}

impl MidiInputs {
    /// Number of open connections.
    pub fn open_count(&self) -> usize {
        #[cfg(feature = "midi-device")]
        {
            self.connections.len()
        }
        #[cfg(not(feature = "midi-device"))]
        {
            0
        }
    }
}

/// Convert a device callback into a queued event.
///
/// Returns `false` once the queue is closed.
#[cfg_attr(not(feature = "midi-device"), allow(dead_code))]
pub fn forward(queue: &mpsc::Sender<MidiDeviceEvent>, stamp_us: u64, bytes: &[u8]) -> bool {
    let timestamp_ms = i64::try_from(stamp_us / 1000).unwrap_or(i64::MAX);
    let Some(event) = MidiDeviceEvent::from_raw(timestamp_ms, bytes) else {
        return true;
    };
    match queue.try_send(event) {
        Ok(()) => true,
        Err(mpsc::error::TrySendError::Full(_)) => {
            tracing::warn!(?event, "MIDI queue full, dropping message");
            true
        }
        Err(mpsc::error::TrySendError::Closed(_)) => false,
    }
}

/// Connect to every named input port.
///
/// Ports that cannot be found or opened are logged and skipped.
#[cfg(feature = "midi-device")]
pub fn open_inputs(names: &[String], queue: &mpsc::Sender<MidiDeviceEvent>) -> MidiInputs {
    let mut connections = Vec::new();
    for name in names {
        match connect(name, queue.clone()) {
            Ok(connection) => {
                tracing::info!(port = %name, "MIDI input opened");
                connections.push(connection);
            }
            Err(e) => tracing::warn!(port = %name, error = %e, "MIDI input unavailable"),
        }
    }
    MidiInputs { connections }
}

#[cfg(feature = "midi-device")]
fn connect(
    name: &str,
    queue: mpsc::Sender<MidiDeviceEvent>,
) -> Result<midir::MidiInputConnection<()>, EngineError> {
    let midi_in = midir::MidiInput::new("montage").map_err(|e| EngineError::Midi {
        message: format!("failed to initialize MIDI input: {e}"),
    })?;
    let port = midi_in
        .ports()
        .into_iter()
        .find(|p| midi_in.port_name(p).is_ok_and(|n| n == name))
        .ok_or_else(|| EngineError::Midi {
            message: format!("no input port named {name}"),
        })?;
    midi_in
        .connect(
            &port,
            name,
            move |stamp_us, bytes, _| {
                forward(&queue, stamp_us, bytes);
            },
            (),
        )
        .map_err(|e| EngineError::Midi {
            message: format!("failed to connect to {name}: {e}"),
        })
}

/// Without device support, report configured ports and open nothing.
#[cfg(not(feature = "midi-device"))]
pub fn open_inputs(names: &[String], _queue: &mpsc::Sender<MidiDeviceEvent>) -> MidiInputs {
    if !names.is_empty() {
        warn!(
            ports = %names.join(","),
            "Built without the midi-device feature, ignoring midiinput"
        );
    }
    MidiInputs {}
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn forwards_device_bytes() {
        let (tx, mut rx) = mpsc::channel(4);
        assert!(forward(&tx, 2_500_000, &[0x90, 0x3c, 0x64]));
        let event = rx.try_recv().unwrap();
        assert_eq!(event.timestamp_ms, 2500);
        assert_eq!((event.status, event.data1, event.data2), (0x90, 0x3c, 0x64));
    }

    #[test]
    fn empty_messages_are_skipped() {
        let (tx, mut rx) = mpsc::channel(4);
        assert!(forward(&tx, 0, &[]));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn closed_queue_stops_forwarding() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        assert!(!forward(&tx, 0, &[0xb0, 1, 2]));
    }
}
