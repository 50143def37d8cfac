//! The distributed bus: publishing local events and serving remote ones.
//!
//! [`NatsBus`] implements [`EventPublisher`] so the router can republish
//! locally originated gestures and MIDI. The two subscription tasks feed
//! remote traffic back into the router.
//!
//! # Subject Convention
//!
//! - **API requests:** `montage.api`, request/reply. The request is
//!   `{"api", "nuid", "params"}`; the reply is the JSON envelope produced by
//!   [`Router::handle_api_input`].
//! - **Events:** `montage.event`, fire-and-forget flat JSON objects with
//!   `nuid` and `event`.
//!
//! # Sync/Async Bridge
//!
//! [`EventPublisher`] is synchronous because the router calls it while
//! holding its event lock. Publishing is therefore handed to a spawned task
//! on the current tokio runtime.

use std::sync::Arc;

use futures::StreamExt as _;
use montage_core::outputs::{EventPublisher, OutputError};
use montage_core::router::event_args_from_json;
use montage_core::Router;
use montage_types::{GestureDeviceEvent, MidiDeviceEvent, Nuid};
use serde_json::{Value, json};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::EngineError;

/// Publishes canonical events on the bus event subject.
pub struct NatsBus {
    /// The NATS client connection.
    client: async_nats::Client,
    /// Subject events are published on.
    event_subject: String,
    /// This process's identity, stamped on published MIDI.
    nuid: Nuid,
}

impl std::fmt::Debug for NatsBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NatsBus")
            .field("event_subject", &self.event_subject)
            .field("nuid", &self.nuid)
            .finish_non_exhaustive()
    }
}

impl NatsBus {
    /// Connect to a NATS server.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Nats`] if the connection fails.
    pub async fn connect(url: &str, event_subject: &str, nuid: Nuid) -> Result<Self, EngineError> {
        let client = async_nats::connect(url)
            .await
            .map_err(|e| EngineError::Nats {
                message: format!("failed to connect to NATS at {url}: {e}"),
            })?;
        Ok(Self {
            client,
            event_subject: event_subject.to_owned(),
            nuid,
        })
    }

    /// The underlying client, for subscriptions.
    pub const fn client(&self) -> &async_nats::Client {
        &self.client
    }

    fn publish_json(&self, payload: &Value) -> Result<(), OutputError> {
        let handle = tokio::runtime::Handle::try_current().map_err(|e| OutputError {
            target: "nats",
            message: format!("no runtime to publish on: {e}"),
        })?;
        let bytes = serde_json::to_vec(payload).map_err(|e| OutputError {
            target: "nats",
            message: format!("failed to serialize event: {e}"),
        })?;
        let client = self.client.clone();
        let subject = self.event_subject.clone();
        handle.spawn(async move {
            if let Err(e) = client.publish(subject.clone(), bytes.into()).await {
                warn!(subject, error = %e, "Failed to publish event");
            }
        });
        Ok(())
    }
}

impl EventPublisher for NatsBus {
    fn publish_gesture(&self, event: &GestureDeviceEvent) -> Result<(), OutputError> {
        self.publish_json(&gesture_payload(event))
    }

    fn publish_midi(&self, event: &MidiDeviceEvent) -> Result<(), OutputError> {
        self.publish_json(&midi_payload(event, &self.nuid))
    }
}

/// The bus form of a gesture: `cursor_<phase>` with region, id and position.
pub fn gesture_payload(event: &GestureDeviceEvent) -> Value {
    json!({
        "nuid": event.nuid,
        "event": format!("cursor_{}", event.down_drag_up),
        "region": event.region.to_string(),
        "id": event.id,
        "x": event.x,
        "y": event.y,
        "z": event.z,
    })
}

/// The bus form of a MIDI message: hex bytes and time in seconds.
#[allow(clippy::cast_precision_loss)]
pub fn midi_payload(event: &MidiDeviceEvent, nuid: &Nuid) -> Value {
    json!({
        "nuid": nuid,
        "event": "midi",
        "bytes": event.to_hex_bytes(),
        "time": event.timestamp_ms as f64 / 1000.0,
    })
}

// ---------------------------------------------------------------------------
// Subscriptions
// ---------------------------------------------------------------------------

/// Serve API requests on `subject`, replying with the router's response.
///
/// # Errors
///
/// Returns [`EngineError::Nats`] if the subscription cannot be created.
pub async fn spawn_api_listener(
    client: async_nats::Client,
    subject: &str,
    router: Arc<Router>,
) -> Result<JoinHandle<()>, EngineError> {
    let mut sub = client
        .subscribe(subject.to_owned())
        .await
        .map_err(|e| EngineError::Nats {
            message: format!("failed to subscribe to {subject}: {e}"),
        })?;
    info!(subject, "Serving API requests");

    Ok(tokio::spawn(async move {
        while let Some(msg) = sub.next().await {
            let data = String::from_utf8_lossy(&msg.payload);
            let response = router.handle_api_input(&data).await;
            match msg.reply {
                Some(reply) => {
                    if let Err(e) = client.publish(reply, response.into()).await {
                        warn!(error = %e, "Failed to send API reply");
                    }
                }
                None => debug!(request = %data, "API request without reply subject"),
            }
        }
        info!("API subscription closed");
    }))
}

/// Feed event notifications on `subject` into the router.
///
/// # Errors
///
/// Returns [`EngineError::Nats`] if the subscription cannot be created.
pub async fn spawn_event_listener(
    client: &async_nats::Client,
    subject: &str,
    router: Arc<Router>,
) -> Result<JoinHandle<()>, EngineError> {
    let mut sub = client
        .subscribe(subject.to_owned())
        .await
        .map_err(|e| EngineError::Nats {
            message: format!("failed to subscribe to {subject}: {e}"),
        })?;
    info!(subject, "Receiving bus events");

    Ok(tokio::spawn(async move {
        while let Some(msg) = sub.next().await {
            let result = match event_args_from_json(&msg.payload) {
                Ok(args) => router.handle_event_args(args).await,
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                warn!(
                    error = %e,
                    payload = %String::from_utf8_lossy(&msg.payload),
                    "Bus event rejected"
                );
            }
        }
        info!("Event subscription closed");
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use montage_core::args::string_map;
    use montage_types::{DownDragUp, Region};

    use super::*;

    #[test]
    fn gesture_payload_reads_back_as_event_args() {
        let event = GestureDeviceEvent {
            nuid: Nuid::new("host-7"),
            region: Region::new('C'),
            id: "finger".to_owned(),
            timestamp_ms: 120,
            down_drag_up: DownDragUp::Drag,
            x: 0.5,
            y: 0.25,
            z: 0.0,
            area: 0.0,
        };
        let args = string_map(&gesture_payload(&event).to_string()).unwrap();
        assert_eq!(args["event"], "cursor_drag");
        assert_eq!(args["region"], "C");
        assert_eq!(args["nuid"], "host-7");
        assert_eq!(args["x"], "0.5");
    }

    #[test]
    fn midi_payload_carries_hex_and_seconds() {
        let midi = MidiDeviceEvent::from_raw(1500, &[0x90, 0x40, 0x7f]).unwrap();
        let payload = midi_payload(&midi, &Nuid::new("me"));
        assert_eq!(payload["event"], "midi");
        assert_eq!(payload["bytes"], "0x90407f");
        assert_eq!(payload["time"], 1.5);
        assert_eq!(payload["nuid"], "me");
    }

    /// Requires a NATS server on localhost:4222.
    #[tokio::test]
    #[ignore = "requires a running NATS server"]
    async fn api_requests_get_replies() {
        use montage_core::outputs::Collaborators;
        use montage_core::RouterSettings;

        let router = Arc::new(
            Router::with_reactors(
                RouterSettings::new(Nuid::new("engine")),
                |region| Box::new(crate::reactor::LoggingReactor::new(region)),
                Collaborators::null(),
            )
            .unwrap(),
        );
        let client = async_nats::connect("nats://localhost:4222").await.unwrap();
        let _task = spawn_api_listener(client.clone(), "montage.test.api", router)
            .await
            .unwrap();
        let reply = client
            .request(
                "montage.test.api",
                r#"{"api":"global.echo","nuid":"t","params":"{}"}"#.into(),
            )
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&reply.payload).unwrap();
        assert_eq!(body, json!({ "result": "ECHO!" }));
    }
}
