//! Montage engine binary.
//!
//! This is the main entry point that wires the event router to its
//! inputs and outputs: the NATS bus, the OSC listener, local MIDI
//! controllers, the audio engine and GUI, and the realtime clock. It runs
//! until interrupted.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration from `montage-config.yaml` and `montage-local.yaml`
//! 3. Resolve this process's NUID
//! 4. Open the OSC outputs and the MIDI file loader
//! 5. Connect to NATS (continues without the bus if unavailable)
//! 6. Build the router with one Reactor per region
//! 7. Subscribe to the API and event subjects
//! 8. Start the OSC listener and MIDI device inputs
//! 9. Start the dispatch and realtime loops
//! 10. Wait for Ctrl-C, then shut down

mod bus;
mod dispatch;
mod error;
mod midi_input;
mod midifile;
mod osc_input;
mod osc_output;
mod reactor;
mod realtime;

use std::path::Path;
use std::sync::Arc;

use montage_core::config::MontageConfig;
use montage_core::outputs::{Collaborators, EventPublisher, NullOutputs};
use montage_core::{Router, RouterSettings};
use montage_types::{Command, Nuid};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::bus::NatsBus;
use crate::error::EngineError;
use crate::midifile::MidiFileLoader;
use crate::osc_output::OscOutputs;
use crate::reactor::LoggingReactor;

/// Base configuration file, relative to the working directory.
const CONFIG_FILE: &str = "montage-config.yaml";

/// Optional per-host overrides merged over [`CONFIG_FILE`].
const LOCAL_CONFIG_FILE: &str = "montage-local.yaml";

/// Capacity of the OSC and MIDI dispatch queues.
const QUEUE_DEPTH: usize = 1024;

/// Application entry point for the Montage engine.
///
/// # Errors
///
/// Returns an error if an output socket cannot be opened, the region pool
/// or tempo is unusable, or the interrupt handler cannot be installed.
#[tokio::main]
#[allow(clippy::too_many_lines)]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("montage-engine starting");

    // 2. Load configuration.
    let config =
        MontageConfig::load_or_default(Path::new(CONFIG_FILE), Path::new(LOCAL_CONFIG_FILE));
    info!(
        hostname = %config.hostname,
        regions = %config.region_letters,
        nats_url = %config.nats_url,
        publishcursor = config.publishcursor,
        publishmidi = config.publishmidi,
        generatesound = config.generatesound,
        generatevisuals = config.generatevisuals,
        "Configuration loaded"
    );

    // 3. Resolve our identity on the bus.
    let nuid = config.nuid.clone().map_or_else(Nuid::generate, Nuid::new);
    info!(%nuid, "Router identity resolved");

    // 4. Open outputs.
    let audio_addr = config
        .audio_engine_socket_addr()
        .map_err(EngineError::from)?;
    let gui_addr = config.gui_socket_addr().map_err(EngineError::from)?;
    let osc_outputs = Arc::new(OscOutputs::new(audio_addr, gui_addr)?);
    let phrases = Arc::new(MidiFileLoader::new(
        config.midifiles_dir.clone(),
        config.clicks_per_beat,
    ));
    info!(
        audio = %config.audio_engine_addr,
        gui = %config.gui_addr,
        midifiles = %config.midifiles_dir.display(),
        "Outputs ready"
    );

    // 5. Connect to NATS.
    info!(nats_url = %config.nats_url, "Connecting to NATS");
    let connected = NatsBus::connect(&config.nats_url, &config.event_subject, nuid.clone()).await;
    let bus = match connected {
        Ok(bus) => {
            info!("NATS connected");
            Some(Arc::new(bus))
        }
        Err(e) => {
            warn!(error = %e, "NATS unavailable, running without the bus");
            None
        }
    };
    let publisher: Arc<dyn EventPublisher> = match &bus {
        Some(bus) => Arc::clone(bus) as Arc<dyn EventPublisher>,
        None => Arc::new(NullOutputs),
    };

    // 6. Build the router.
    let settings = RouterSettings::from_config(&config, nuid).map_err(EngineError::from)?;
    let collaborators = Collaborators {
        publisher,
        audio: Arc::clone(&osc_outputs) as _,
        gui: osc_outputs,
        phrases,
    };
    let router = Arc::new(
        Router::with_reactors(
            settings,
            |region| Box::new(LoggingReactor::new(region)),
            collaborators,
        )
        .map_err(EngineError::from)?,
    );
    router.init();

    // 7. Subscribe to the bus.
    let mut tasks = Vec::new();
    if let Some(bus) = &bus {
        match bus::spawn_api_listener(bus.client().clone(), &config.api_subject, Arc::clone(&router))
            .await
        {
            Ok(task) => tasks.push(task),
            Err(e) => warn!(error = %e, "API requests disabled"),
        }
        match bus::spawn_event_listener(bus.client(), &config.event_subject, Arc::clone(&router))
            .await
        {
            Ok(task) => tasks.push(task),
            Err(e) => warn!(error = %e, "Bus events disabled"),
        }
    }

    // 8. Start local inputs.
    let (osc_tx, osc_rx) = mpsc::channel(QUEUE_DEPTH);
    let (midi_tx, midi_rx) = mpsc::channel(QUEUE_DEPTH);
    match config.osc_listen_addr() {
        Ok(addr) => {
            if let Err(e) = osc_input::spawn_osc_listener(addr, osc_tx) {
                warn!(error = %e, "OSC input disabled");
            }
        }
        Err(e) => warn!(error = %e, "OSC input disabled"),
    }
    let midi_inputs = midi_input::open_inputs(&config.midi_inputs(), &midi_tx);
    drop(midi_tx);
    info!(open = midi_inputs.open_count(), "MIDI inputs ready");

    // 9. Start the dispatch and realtime loops.
    tasks.push(tokio::spawn(dispatch::run_dispatch(
        Arc::clone(&router),
        osc_rx,
        midi_rx,
    )));
    let (command_tx, command_rx) = mpsc::channel::<Command>(64);
    let realtime = tokio::spawn(realtime::run_realtime(Arc::clone(&router), command_rx));
    info!("montage-engine running");

    // 10. Wait for an interrupt, then shut down.
    tokio::signal::ctrl_c().await?;
    info!("Interrupt received, shutting down");

    let stop = Command {
        action: "shutdown".to_owned(),
        arg: serde_json::Value::Null,
    };
    if command_tx.send(stop).await.is_err() {
        warn!("Realtime loop already stopped");
    }
    drop(command_tx);
    if let Err(e) = realtime.await {
        warn!(error = %e, "Realtime loop failed");
    }

    router.shutdown().await;
    for task in tasks {
        task.abort();
    }
    drop(midi_inputs);

    info!(last_click = %router.last_click(), "montage-engine shutdown complete");
    Ok(())
}
