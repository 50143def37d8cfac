//! OSC outputs: the audio engine transport and GUI notifications.

use std::net::SocketAddr;

use montage_core::outputs::{AudioEngine, GuiNotifier, OutputError};
use nannou_osc as osc;
use tracing::debug;

use crate::error::EngineError;

/// Sends `/play <0|1>` to the audio engine and `/notify <name>` to the GUI.
pub struct OscOutputs {
    sender: osc::Sender,
    audio_addr: SocketAddr,
    gui_addr: SocketAddr,
}

impl std::fmt::Debug for OscOutputs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OscOutputs")
            .field("audio_addr", &self.audio_addr)
            .field("gui_addr", &self.gui_addr)
            .finish_non_exhaustive()
    }
}

impl OscOutputs {
    /// Open an unconnected UDP sender for both targets.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Osc`] if the socket cannot be opened.
    pub fn new(audio_addr: SocketAddr, gui_addr: SocketAddr) -> Result<Self, EngineError> {
        let sender = osc::sender().map_err(|e| EngineError::Osc {
            message: format!("failed to open OSC sender: {e}"),
        })?;
        Ok(Self {
            sender,
            audio_addr,
            gui_addr,
        })
    }

    fn send(
        &self,
        target: &'static str,
        addr: SocketAddr,
        address: &str,
        args: Vec<osc::Type>,
    ) -> Result<(), OutputError> {
        debug!(output = target, %addr, address, "Sending OSC");
        let packet = osc::Packet::Message(osc::Message {
            addr: address.to_owned(),
            args,
        });
        self.sender
            .send(packet, addr)
            .map(|_| ())
            .map_err(|e| OutputError {
                target,
                message: format!("{addr}: {e}"),
            })
    }
}

impl AudioEngine for OscOutputs {
    fn set_transport(&self, playing: bool) -> Result<(), OutputError> {
        let args = vec![osc::Type::Int(i32::from(playing))];
        self.send("audio", self.audio_addr, "/play", args)
    }
}

impl GuiNotifier for OscOutputs {
    fn notify(&self, name: &str) -> Result<(), OutputError> {
        let args = vec![osc::Type::String(name.to_owned())];
        self.send("gui", self.gui_addr, "/notify", args)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn transport_and_notify_reach_their_targets() {
        let audio = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
        let gui = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
        for socket in [&audio, &gui] {
            socket
                .set_read_timeout(Some(Duration::from_secs(2)))
                .unwrap();
        }
        let outputs =
            OscOutputs::new(audio.local_addr().unwrap(), gui.local_addr().unwrap()).unwrap();

        outputs.set_transport(false).unwrap();
        outputs.notify("restart").unwrap();

        let mut buf = [0_u8; 256];
        let n = audio.recv(&mut buf).unwrap();
        let received = buf.get(..n).unwrap();
        assert!(received.starts_with(b"/play"));

        let n = gui.recv(&mut buf).unwrap();
        let received = buf.get(..n).unwrap();
        assert!(received.starts_with(b"/notify"));
        assert!(received.windows(7).any(|w| w == b"restart"));
    }
}
