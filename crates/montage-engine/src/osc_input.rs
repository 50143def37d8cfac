//! The OSC listener thread.
//!
//! Receives on a UDP port and forwards every message, tagged with its
//! sender, into the dispatch queue. Bundles are unpacked into their
//! messages.

use std::net::SocketAddr;
use std::thread;

use montage_core::router::{OscArg, OscEvent};
use nannou_osc as osc;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::error::EngineError;

/// Bind the listener and start its thread.
///
/// The thread exits once the dispatch queue is closed.
///
/// # Errors
///
/// Returns [`EngineError::Osc`] if the port cannot be bound or the thread
/// cannot be started.
pub fn spawn_osc_listener(
    addr: SocketAddr,
    queue: mpsc::Sender<OscEvent>,
) -> Result<thread::JoinHandle<()>, EngineError> {
    let port = addr.port();
    let receiver = osc::Receiver::bind(port).map_err(|e| EngineError::Osc {
        message: format!("failed to bind OSC listener on port {port}: {e}"),
    })?;
    info!(port, "OSC listener bound");

    thread::Builder::new()
        .name("osc-listener".to_owned())
        .spawn(move || {
            loop {
                let (packet, source) = match receiver.recv() {
                    Ok(received) => received,
                    Err(e) => {
                        warn!(error = %e, "OSC receive failed");
                        continue;
                    }
                };
                let mut messages = Vec::new();
                unpack(packet, &mut messages);
                for message in messages {
                    if queue.blocking_send(to_event(message, source)).is_err() {
                        info!(port, "Dispatch queue closed, OSC listener exiting");
                        return;
                    }
                }
            }
        })
        .map_err(|e| EngineError::Osc {
            message: format!("failed to start OSC listener thread: {e}"),
        })
}

fn unpack(packet: osc::Packet, out: &mut Vec<osc::Message>) {
    match packet {
        osc::Packet::Message(message) => out.push(message),
        osc::Packet::Bundle(bundle) => {
            for inner in bundle.content {
                unpack(inner.into(), out);
            }
        }
    }
}

/// Convert a decoded OSC message into the router's form.
pub fn to_event(message: osc::Message, source: SocketAddr) -> OscEvent {
    OscEvent {
        source: source.to_string(),
        address: message.addr,
        args: message.args.into_iter().map(to_arg).collect(),
    }
}

fn to_arg(arg: osc::Type) -> OscArg {
    match arg {
        osc::Type::String(text) => OscArg::Str(text),
        osc::Type::Int(value) => OscArg::Int(value),
        osc::Type::Float(value) => OscArg::Float(value),
        other => OscArg::Other(format!("{other:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_messages_with_sender() {
        let message = osc::Message {
            addr: "/event".to_owned(),
            args: vec![
                osc::Type::String("{\"event\":\"cursor_down\"}".to_owned()),
                osc::Type::Int(4),
                osc::Type::Float(0.5),
                osc::Type::Bool(true),
            ],
        };
        let source: SocketAddr = ([127, 0, 0, 1], 9000).into();
        let event = to_event(message, source);
        assert_eq!(event.source, "127.0.0.1:9000");
        assert_eq!(event.address, "/event");
        assert_eq!(event.args.len(), 4);
        assert_eq!(
            event.args.first(),
            Some(&OscArg::Str("{\"event\":\"cursor_down\"}".to_owned()))
        );
        assert_eq!(event.args.get(1), Some(&OscArg::Int(4)));
        assert!(matches!(event.args.get(3), Some(OscArg::Other(_))));
    }
}
