//! The single-consumer dispatch loop.
//!
//! OSC messages and local MIDI device input arrive on two queues fed by
//! their listener threads. One task drains both and hands each item to the
//! router, so local input is handled in arrival order per source.

use std::sync::Arc;

use montage_core::Router;
use montage_core::router::OscEvent;
use montage_types::MidiDeviceEvent;
use tokio::sync::mpsc;
use tracing::info;

/// Drain both queues until every sender has gone away.
pub async fn run_dispatch(
    router: Arc<Router>,
    mut osc: mpsc::Receiver<OscEvent>,
    mut midi: mpsc::Receiver<MidiDeviceEvent>,
) {
    loop {
        tokio::select! {
            Some(message) = osc.recv() => router.handle_osc_input(message).await,
            Some(event) = midi.recv() => router.handle_midi_device_input(event).await,
            else => break,
        }
    }
    info!("Dispatch loop exiting");
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use montage_core::RouterSettings;
    use montage_core::outputs::Collaborators;
    use montage_core::router::OscArg;
    use montage_types::Nuid;

    use super::*;
    use crate::reactor::LoggingReactor;

    #[tokio::test]
    async fn drains_both_queues_then_exits() {
        let router = Arc::new(
            Router::with_reactors(
                RouterSettings::new(Nuid::new("engine")),
                |region| Box::new(LoggingReactor::new(region)),
                Collaborators::null(),
            )
            .unwrap(),
        );
        let (osc_tx, osc_rx) = mpsc::channel(8);
        let (midi_tx, midi_rx) = mpsc::channel(8);
        let task = tokio::spawn(run_dispatch(Arc::clone(&router), osc_rx, midi_rx));

        osc_tx
            .send(OscEvent {
                source: "127.0.0.1:1".to_owned(),
                address: "/event".to_owned(),
                args: vec![OscArg::Str(
                    r#"{"event":"cursor_down","x":0,"y":0,"z":0}"#.to_owned(),
                )],
            })
            .await
            .unwrap();
        midi_tx
            .send(MidiDeviceEvent::from_raw(0, &[0x90, 60, 100]).unwrap())
            .await
            .unwrap();
        drop(osc_tx);
        drop(midi_tx);

        task.await.unwrap();
        assert_eq!(
            router.region_for_nuid(&Nuid::new("engine")).await,
            Some(montage_types::Region::new('A'))
        );
    }
}
