//! Canonical event types.
//!
//! Every input source (OSC, local MIDI devices, the distributed bus, and
//! recorded logs) is reduced to one of these forms before it reaches a
//! Reactor.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ids::Nuid;
use crate::region::Region;

// ---------------------------------------------------------------------------
// Gestures
// ---------------------------------------------------------------------------

/// Phase of a touch-like gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownDragUp {
    /// Contact begins.
    Down,
    /// Contact moves.
    Drag,
    /// Contact ends.
    Up,
}

impl DownDragUp {
    /// The wire name of this phase (`down`, `drag` or `up`).
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Down => "down",
            Self::Drag => "drag",
            Self::Up => "up",
        }
    }
}

impl core::fmt::Display for DownDragUp {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A gesture phase name that is not `down`, `drag` or `up`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unexpected cursor event type: {0:?}")]
pub struct UnknownGestureKind(pub String);

impl FromStr for DownDragUp {
    type Err = UnknownGestureKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "down" => Ok(Self::Down),
            "drag" => Ok(Self::Drag),
            "up" => Ok(Self::Up),
            other => Err(UnknownGestureKind(other.to_owned())),
        }
    }
}

/// A fully attributed gesture: who made it, where it lands, and when.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GestureDeviceEvent {
    /// Participant that produced the gesture.
    pub nuid: Nuid,
    /// Region the gesture is routed to.
    pub region: Region,
    /// Gesture identifier, stable across one down/drag/up sequence.
    pub id: String,
    /// Router time in milliseconds when the gesture was handled.
    pub timestamp_ms: u64,
    /// Phase of the gesture.
    pub down_drag_up: DownDragUp,
    /// Horizontal position, normalized.
    pub x: f32,
    /// Vertical position, normalized.
    pub y: f32,
    /// Depth or pressure, normalized.
    pub z: f32,
    /// Contact area, zero when the source does not report it.
    pub area: f32,
}

/// The reduced gesture form replayed from a recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GestureStepEvent {
    /// Gesture identifier.
    pub id: String,
    /// Horizontal position.
    pub x: f32,
    /// Vertical position.
    pub y: f32,
    /// Depth or pressure.
    pub z: f32,
    /// Phase of the gesture.
    pub down_drag_up: DownDragUp,
}

// ---------------------------------------------------------------------------
// MIDI
// ---------------------------------------------------------------------------

/// Errors decoding a `"0x..."` MIDI byte string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MidiBytesError {
    /// The value does not start with `0x`.
    #[error("invalid bytes value - {0}")]
    InvalidFormat(String),

    /// The digits after `0x` are not valid hexadecimal.
    #[error("unable to decode hex bytes = {0}")]
    Decode(String),

    /// The value decoded to something other than a 3-byte message.
    #[error("unable to handle midi bytes len={0}")]
    Length(usize),
}

/// One raw three-byte MIDI message from a device or the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MidiDeviceEvent {
    /// Timestamp in milliseconds (device time or sender-supplied time).
    pub timestamp_ms: i64,
    /// Status byte (message type and channel).
    pub status: u8,
    /// First data byte.
    pub data1: u8,
    /// Second data byte.
    pub data2: u8,
}

impl MidiDeviceEvent {
    /// Build an event from raw device bytes.
    ///
    /// Returns `None` for an empty message. Missing data bytes read as zero.
    pub fn from_raw(timestamp_ms: i64, bytes: &[u8]) -> Option<Self> {
        let (&status, rest) = bytes.split_first()?;
        Some(Self {
            timestamp_ms,
            status,
            data1: rest.first().copied().unwrap_or(0),
            data2: rest.get(1).copied().unwrap_or(0),
        })
    }

    /// Decode a bus-encoded message such as `"0x904000"`.
    ///
    /// # Errors
    ///
    /// - [`MidiBytesError::InvalidFormat`] without the `0x` prefix
    /// - [`MidiBytesError::Decode`] for non-hex digits or an odd digit count
    /// - [`MidiBytesError::Length`] unless exactly three bytes decode
    pub fn decode_hex(bytes: &str, timestamp_ms: i64) -> Result<Self, MidiBytesError> {
        let digits = bytes
            .strip_prefix("0x")
            .ok_or_else(|| MidiBytesError::InvalidFormat(bytes.to_owned()))?;

        if digits.len() % 2 != 0 {
            return Err(MidiBytesError::Decode(bytes.to_owned()));
        }

        let decoded = digits
            .as_bytes()
            .chunks(2)
            .map(|pair| {
                std::str::from_utf8(pair)
                    .ok()
                    .and_then(|pair| u8::from_str_radix(pair, 16).ok())
            })
            .collect::<Option<Vec<u8>>>()
            .ok_or_else(|| MidiBytesError::Decode(bytes.to_owned()))?;

        match decoded.as_slice() {
            &[status, data1, data2] => Ok(Self {
                timestamp_ms,
                status,
                data1,
                data2,
            }),
            other => Err(MidiBytesError::Length(other.len())),
        }
    }

    /// Encode the message the way the bus carries it, e.g. `"0x904000"`.
    pub fn to_hex_bytes(&self) -> String {
        format!("0x{:02x}{:02x}{:02x}", self.status, self.data1, self.data2)
    }
}

// ---------------------------------------------------------------------------
// API and control
// ---------------------------------------------------------------------------

/// An API invocation as it is written to a recording.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiEvent {
    /// Log event type, e.g. `pad`.
    pub api_type: String,
    /// Region letter, or `*` when the call is not region-specific.
    pub pad: String,
    /// API method (the suffix after the dot).
    pub method: String,
    /// Arguments as a flat JSON object.
    pub raw_args: String,
}

/// An out-of-band instruction on the router's control channel.
///
/// Commands are currently logged and otherwise ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    /// The requested action, e.g. `addmidi`.
    pub action: String,
    /// Free-form argument.
    #[serde(default)]
    pub arg: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_three_bytes() {
        let event = MidiDeviceEvent::decode_hex("0x904000", 12);
        assert_eq!(
            event,
            Ok(MidiDeviceEvent {
                timestamp_ms: 12,
                status: 0x90,
                data1: 0x40,
                data2: 0x00,
            })
        );
    }

    #[test]
    fn two_bytes_is_a_length_error() {
        assert_eq!(
            MidiDeviceEvent::decode_hex("0x9040", 0),
            Err(MidiBytesError::Length(2))
        );
        assert_eq!(
            MidiDeviceEvent::decode_hex("0x", 0),
            Err(MidiBytesError::Length(0))
        );
        assert_eq!(
            MidiDeviceEvent::decode_hex("0x90400000", 0),
            Err(MidiBytesError::Length(4))
        );
    }

    #[test]
    fn missing_prefix_is_invalid_format() {
        assert!(matches!(
            MidiDeviceEvent::decode_hex("904000", 0),
            Err(MidiBytesError::InvalidFormat(_))
        ));
        assert!(matches!(
            MidiDeviceEvent::decode_hex("0", 0),
            Err(MidiBytesError::InvalidFormat(_))
        ));
    }

    #[test]
    fn bad_digits_fail_to_decode() {
        assert!(matches!(
            MidiDeviceEvent::decode_hex("0x90zz00", 0),
            Err(MidiBytesError::Decode(_))
        ));
        assert!(matches!(
            MidiDeviceEvent::decode_hex("0x90400", 0),
            Err(MidiBytesError::Decode(_))
        ));
    }

    #[test]
    fn hex_encoding_matches_decoding() {
        let event = MidiDeviceEvent::from_raw(5, &[0xb0, 0x07, 0x7f]);
        let encoded = event.map(|e| e.to_hex_bytes()).unwrap_or_default();
        assert_eq!(encoded, "0xb0077f");
        assert_eq!(MidiDeviceEvent::decode_hex(&encoded, 5).ok(), event);
    }

    #[test]
    fn short_raw_messages_pad_with_zero() {
        let event = MidiDeviceEvent::from_raw(0, &[0xc0, 0x05]);
        assert_eq!(event.map(|e| (e.data1, e.data2)), Some((0x05, 0)));
        assert_eq!(MidiDeviceEvent::from_raw(0, &[]), None);
    }

    #[test]
    fn gesture_phase_names() {
        assert_eq!("drag".parse::<DownDragUp>(), Ok(DownDragUp::Drag));
        assert!("hover".parse::<DownDragUp>().is_err());
        assert_eq!(DownDragUp::Up.to_string(), "up");
    }
}
