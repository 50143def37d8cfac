//! The router: event canonicalization, API dispatch and click advancement.
//!
//! All input funnels into two entry points, the per-event handlers
//! ([`Router::handle_event_args`] and friends) and the API executor
//! ([`Router::handle_api_input`] / [`Router::execute_api`]). Both, and the
//! realtime clock's [`Router::advance_click_to`], serialize through one
//! event lock before touching a Reactor. The NUID assignment table has its
//! own lock, always taken after the event lock.
//!
//! # Loop prevention
//!
//! Events arriving from the bus may be our own publications coming back.
//! When this process publishes gestures (resp. MIDI), inbound `cursor`
//! (resp. `midi`) events carrying our NUID are dropped. Only locally
//! originated events are ever published, so nothing received from the bus
//! is re-published.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use montage_types::{
    ApiEvent, Clicks, DownDragUp, GestureDeviceEvent, MidiDeviceEvent, Nuid, Region, RegionError,
    RegionLetters,
};
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use crate::api::{ApiCall, GlobalApi};
use crate::args::{
    ArgMap, flatten, get_xyz, need_bool, need_float, need_string, optional_string, string_map,
    to_raw_json,
};
use crate::clock::{Clock, ClockError};
use crate::config::MontageConfig;
use crate::debug::{DebugFlag, DebugFlags};
use crate::diag;
use crate::error::RouterError;
use crate::outputs::{AudioEngine, Collaborators};
use crate::playback::PlaybackControl;
use crate::reactor::{BoxedReactor, RegionDirectory};
use crate::recording::{Recorder, load_recording};
use crate::regions::RegionAssignments;
use crate::response::{error_response, result_response};

/// Gesture id used when an event does not name one.
pub const UNSPECIFIED_ID: &str = "UnspecifiedID";

/// Sprite identity used for `sprite` events.
const SPRITE_ID: &str = "dummy";

/// Number of MIDI channels `global.midi_midifile` distributes over regions.
const MIDIFILE_CHANNELS: u8 = 4;

/// An observer of locally originated gestures.
pub type GestureCallback = Box<dyn FnMut(&GestureDeviceEvent) + Send>;

/// Where an event entered the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    /// Received from the bus; subject to echo suppression, never republished.
    Remote,
    /// Produced on this host (OSC, local devices); republished when enabled.
    Local,
}

/// An argument of an inbound OSC message.
#[derive(Debug, Clone, PartialEq)]
pub enum OscArg {
    /// A string argument.
    Str(String),
    /// A 32-bit integer.
    Int(i32),
    /// A 32-bit float.
    Float(f32),
    /// Any other OSC type, by its debug rendering.
    Other(String),
}

/// An inbound OSC message tagged with its sender.
#[derive(Debug, Clone, PartialEq)]
pub struct OscEvent {
    /// Sender address.
    pub source: String,
    /// OSC address, e.g. `/event`.
    pub address: String,
    /// Message arguments.
    pub args: Vec<OscArg>,
}

/// Fixed settings the router reads on every event.
#[derive(Debug, Clone)]
pub struct RouterSettings {
    /// This process's identity on the bus.
    pub nuid: Nuid,
    /// Host name, for logs.
    pub hostname: String,
    /// Region letter pool.
    pub letters: RegionLetters,
    /// Republish local gestures.
    pub publish_cursor: bool,
    /// Republish local MIDI device input.
    pub publish_midi: bool,
    /// Send GUI notifications.
    pub notify_gui: bool,
    /// Clicks per second at tempo factor 1.
    pub clicks_per_second: f64,
    /// Clicks per beat.
    pub clicks_per_beat: u64,
    /// Recordings directory.
    pub recordings_dir: PathBuf,
    /// Comma-separated debug flags on at startup.
    pub debug: String,
    /// Pause inside an audio reset.
    pub audio_reset_settle: Duration,
}

impl RouterSettings {
    /// Default settings for `nuid`.
    pub fn new(nuid: Nuid) -> Self {
        Self::build(&MontageConfig::default(), nuid, RegionLetters::default())
    }

    /// Settings derived from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RegionError`] if `region_letters` is not a usable pool.
    pub fn from_config(config: &MontageConfig, nuid: Nuid) -> Result<Self, RegionError> {
        let letters = RegionLetters::parse(&config.region_letters)?;
        Ok(Self::build(config, nuid, letters))
    }

    fn build(config: &MontageConfig, nuid: Nuid, letters: RegionLetters) -> Self {
        Self {
            nuid,
            hostname: config.hostname.clone(),
            letters,
            publish_cursor: config.publishcursor,
            publish_midi: config.publishmidi,
            notify_gui: config.notifygui,
            clicks_per_second: config.clicks_per_second,
            clicks_per_beat: config.clicks_per_beat,
            recordings_dir: config.recordings_dir.clone(),
            debug: config.debug.clone(),
            audio_reset_settle: Duration::from_millis(config.audio_reset_settle_ms),
        }
    }
}

/// State serialized by the event lock.
pub(crate) struct EventState {
    pub(crate) directory: RegionDirectory,
    pub(crate) recorder: Recorder,
    last_click: Clicks,
    gesture_callbacks: Vec<GestureCallback>,
}

/// The event router. Shared as `Arc<Router>` by every input task.
pub struct Router {
    settings: RouterSettings,
    clock: Clock,
    debug: DebugFlags,
    assignments: RwLock<RegionAssignments>,
    pub(crate) events: Mutex<EventState>,
    last_click: AtomicU64,
    pub(crate) playback: PlaybackControl,
    outputs: Collaborators,
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("nuid", &self.settings.nuid)
            .field("letters", &self.settings.letters.to_string())
            .field("last_click", &self.last_click())
            .finish_non_exhaustive()
    }
}

impl Router {
    /// Create a router over a prebuilt region directory.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError`] if the configured tempo is unusable.
    pub fn new(
        settings: RouterSettings,
        directory: RegionDirectory,
        outputs: Collaborators,
    ) -> Result<Self, ClockError> {
        let clock = Clock::new(settings.clicks_per_second, settings.clicks_per_beat)?;
        let debug = DebugFlags::from_list(&settings.debug);
        let assignments = RwLock::new(RegionAssignments::new(settings.letters.clone()));
        let recorder = Recorder::new(settings.recordings_dir.clone());
        Ok(Self {
            settings,
            clock,
            debug,
            assignments,
            events: Mutex::new(EventState {
                directory,
                recorder,
                last_click: Clicks::ZERO,
                gesture_callbacks: Vec::new(),
            }),
            last_click: AtomicU64::new(0),
            playback: PlaybackControl::new(),
            outputs,
        })
    }

    /// Create a router, building one Reactor per region with `factory`.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError`] if the configured tempo is unusable.
    pub fn with_reactors(
        settings: RouterSettings,
        factory: impl FnMut(Region) -> BoxedReactor,
        outputs: Collaborators,
    ) -> Result<Self, ClockError> {
        let directory = RegionDirectory::build(&settings.letters, factory);
        Self::new(settings, directory, outputs)
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Announce the (re)start to the GUI.
    pub fn init(&self) {
        info!(
            nuid = %self.settings.nuid,
            hostname = %self.settings.hostname,
            regions = %self.settings.letters,
            "Router started"
        );
        self.notify_gui("restart");
    }

    /// Stop playback, close any recording and silence every region.
    pub async fn shutdown(&self) {
        self.playback.stop();
        let mut state = self.events.lock().await;
        if let Err(e) = state.recorder.stop() {
            warn!(error = %e, "Failed to close recording during shutdown");
        }
        state.directory.send_all_notes_off();
        info!("Router shut down");
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// This process's NUID.
    pub const fn nuid(&self) -> &Nuid {
        &self.settings.nuid
    }

    /// The router's clock.
    pub const fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Runtime debug flags.
    pub const fn debug_flags(&self) -> &DebugFlags {
        &self.debug
    }

    /// The last click every Reactor has been advanced through.
    pub fn last_click(&self) -> Clicks {
        Clicks(self.last_click.load(Ordering::Acquire))
    }

    /// Register an observer of locally originated gestures.
    pub async fn add_gesture_callback(&self, callback: GestureCallback) {
        self.events.lock().await.gesture_callbacks.push(callback);
    }

    // -----------------------------------------------------------------------
    // Region assignment
    // -----------------------------------------------------------------------

    /// The region assigned to `nuid`, assigning one on first contact.
    pub async fn region_for_nuid(&self, nuid: &Nuid) -> Option<Region> {
        self.assignments.write().await.region_for_nuid(nuid)
    }

    /// Pin a physical device serial number to a region.
    pub async fn set_region_for_morph(&self, serial: &str, region: Region) {
        diag!(self.debug, DebugFlag::Morph, serial, %region, "Pinning device to region");
        self.assignments
            .write()
            .await
            .set_region_for_morph(serial, region);
    }

    /// The region pinned to a device serial number.
    pub async fn region_for_morph(&self, serial: &str) -> Option<Region> {
        self.assignments.read().await.region_for_morph(serial)
    }

    // -----------------------------------------------------------------------
    // Clock
    // -----------------------------------------------------------------------

    /// One realtime wake: start the clock if needed, then catch up to `now`.
    ///
    /// Returns the number of clicks advanced.
    pub async fn realtime_tick(&self, now: Instant) -> u64 {
        self.clock.mark_start(now);
        let target = self.clock.target_click(now);
        if target > self.last_click() {
            self.advance_click_to(target).await
        } else {
            0
        }
    }

    /// Advance every Reactor through each click in `[last_click, to)`.
    ///
    /// On beat boundaries each Reactor is first asked to time out stale
    /// gestures. Returns the number of clicks advanced.
    pub async fn advance_click_to(&self, to: Clicks) -> u64 {
        let mut state = self.events.lock().await;
        let from = state.last_click;
        if to <= from {
            return 0;
        }
        let beat = self.clock.clicks_per_beat();
        let now_ms = self.clock.current_milli();
        for click in from.until(to) {
            let on_beat = click.is_multiple_of(beat);
            for (_, reactor) in state.directory.iter_mut() {
                if on_beat {
                    reactor.check_gesture_up(now_ms);
                }
                reactor.advance_by_one_click(click);
            }
        }
        state.last_click = to;
        self.last_click.store(to.get(), Ordering::Release);
        let advanced = to.get().saturating_sub(from.get());
        diag!(self.debug, DebugFlag::Advance, from = %from, to = %to, "Advanced clicks");
        advanced
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    /// Handle an event notification received from the bus.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError`] for missing or malformed arguments, unknown
    /// event kinds and unknown regions.
    pub async fn handle_event_args(&self, args: ArgMap) -> Result<(), RouterError> {
        let mut state = self.events.lock().await;
        self.route_event(&mut state, args, Origin::Remote).await
    }

    /// Handle an event produced on this host (e.g. from OSC).
    ///
    /// # Errors
    ///
    /// As for [`handle_event_args`](Self::handle_event_args).
    pub async fn handle_local_event_args(&self, args: ArgMap) -> Result<(), RouterError> {
        let mut state = self.events.lock().await;
        self.route_event(&mut state, args, Origin::Local).await
    }

    async fn route_event(
        &self,
        state: &mut EventState,
        mut args: ArgMap,
        origin: Origin,
    ) -> Result<(), RouterError> {
        let nuid = Nuid::new(need_string(&args, "nuid", "event")?);
        let event = need_string(&args, "event", "event")?.to_owned();
        let (kind, sub) = event.split_once('_').unwrap_or((event.as_str(), ""));

        if origin == Origin::Remote && nuid == self.settings.nuid {
            let echo = match kind {
                "cursor" => self.settings.publish_cursor,
                "midi" => self.settings.publish_midi,
                _ => false,
            };
            if echo {
                diag!(self.debug, DebugFlag::Remote, event = %event, "Dropping our own echo");
                return Ok(());
            }
        }

        let region = match args.remove("region").filter(|r| !r.is_empty()) {
            Some(name) => Region::parse(&name).ok_or(RouterError::NoRegion(name))?,
            None => self
                .region_for_nuid(&nuid)
                .await
                .ok_or_else(|| RouterError::NoRegion(String::new()))?,
        };
        if state.directory.get_mut(region).is_none() {
            return Err(RouterError::NoRegion(region.to_string()));
        }

        match kind {
            "cursor" => {
                let down_drag_up: DownDragUp = sub.parse()?;
                let id = optional_string(&args, "id", UNSPECIFIED_ID).to_owned();
                let (x, y, z) = get_xyz(&args, &event)?;
                let gesture = GestureDeviceEvent {
                    nuid,
                    region,
                    id,
                    timestamp_ms: self.clock.current_milli(),
                    down_drag_up,
                    x,
                    y,
                    z,
                    area: 0.0,
                };
                diag!(self.debug, DebugFlag::Cursor, ?gesture, "Routing gesture");
                if origin == Origin::Local && self.settings.publish_cursor {
                    if let Err(e) = self.outputs.publisher.publish_gesture(&gesture) {
                        warn!(error = %e, "Gesture publish failed");
                    }
                }
                if let Err(e) = state.recorder.record_gesture(&gesture) {
                    warn!(error = %e, "Failed to record gesture");
                }
                let reactor = state.directory.lookup(Some(region))?;
                reactor.handle_gesture(&gesture);
            }
            "sprite" => match get_xyz(&args, "event.sprite") {
                Ok((x, y, z)) => {
                    state
                        .directory
                        .lookup(Some(region))?
                        .generate_sprite(SPRITE_ID, x, y, z);
                }
                Err(e) => {
                    tracing::debug!(error = %e, "Ignoring sprite without coordinates");
                }
            },
            "midi" => match sub {
                "time_reset" => {
                    info!(%region, "MIDI time reset, sending all-notes-off");
                    let reactor = state.directory.lookup(Some(region))?;
                    reactor.handle_midi_time_reset();
                    reactor.send_all_notes_off();
                }
                "audio_reset" => {
                    info!("Audio reset requested");
                    self.spawn_audio_reset();
                }
                _ => {
                    let timestamp_ms = event_time_ms(&args, &event)?;
                    let bytes = need_string(&args, "bytes", &event)?;
                    let midi = MidiDeviceEvent::decode_hex(bytes, timestamp_ms)?;
                    diag!(self.debug, DebugFlag::Midi, ?midi, %region, "Routing MIDI");
                    state.directory.lookup(Some(region))?.handle_midi_input(&midi);
                }
            },
            other => return Err(RouterError::UnknownEvent(other.to_owned())),
        }
        Ok(())
    }

    /// Handle a gesture from a device attached to this host.
    pub async fn handle_gesture_input(&self, gesture: GestureDeviceEvent) {
        let mut state = self.events.lock().await;
        for callback in &mut state.gesture_callbacks {
            callback(&gesture);
        }
        if self.settings.publish_cursor {
            if let Err(e) = self.outputs.publisher.publish_gesture(&gesture) {
                warn!(error = %e, "Gesture publish failed");
            }
        }
        if let Err(e) = state.recorder.record_gesture(&gesture) {
            warn!(error = %e, "Failed to record gesture");
        }
        match state.directory.get_mut(gesture.region) {
            Some(reactor) => reactor.handle_gesture(&gesture),
            None => warn!(region = %gesture.region, "No region for local gesture"),
        }
    }

    /// Handle a raw message from a local MIDI device: publish if enabled,
    /// then broadcast to every region.
    pub async fn handle_midi_device_input(&self, midi: MidiDeviceEvent) {
        let mut state = self.events.lock().await;
        diag!(self.debug, DebugFlag::Midi, ?midi, "Device MIDI input");
        if self.settings.publish_midi {
            if let Err(e) = self.outputs.publisher.publish_midi(&midi) {
                warn!(error = %e, "MIDI publish failed");
            }
        }
        state.directory.broadcast_midi(&midi);
    }

    /// Handle an inbound OSC message. Failures are logged.
    pub async fn handle_osc_input(&self, message: OscEvent) {
        diag!(
            self.debug,
            DebugFlag::Osc,
            source = %message.source,
            address = %message.address,
            "OSC input"
        );
        match message.address.as_str() {
            "/event" => {
                if let Err(e) = self.handle_osc_event(&message).await {
                    warn!(error = %e, source = %message.source, "OSC /event failed");
                }
            }
            "/api" => info!("OSC /api is not implemented"),
            other => warn!(
                address = other,
                source = %message.source,
                "Unrecognized OSC message"
            ),
        }
    }

    async fn handle_osc_event(&self, message: &OscEvent) -> Result<(), RouterError> {
        let raw = match message.args.first() {
            Some(OscArg::Str(raw)) => raw,
            Some(_) => return Err(RouterError::bad("/event", "args", "non-string argument")),
            None => return Err(RouterError::missing("/event", "args")),
        };
        if !raw.starts_with('{') {
            return Err(RouterError::bad("/event", "args", raw));
        }
        let mut args = string_map(raw)?;
        args.insert("nuid".to_owned(), self.settings.nuid.to_string());
        self.handle_local_event_args(args).await
    }

    // -----------------------------------------------------------------------
    // APIs
    // -----------------------------------------------------------------------

    /// Execute a bus API request and render the JSON response.
    ///
    /// The request is `{"api": ..., "nuid": ..., "params": ...}` where
    /// `params` is a JSON object or a string holding one.
    pub async fn handle_api_input(self: &Arc<Self>, data: &str) -> String {
        let response = match self.api_request(data).await {
            Ok(result) => result_response(&result),
            Err(e) => error_response(&e),
        };
        diag!(self.debug, DebugFlag::Api, response = %response, "API response");
        response
    }

    async fn api_request(self: &Arc<Self>, data: &str) -> Result<Value, RouterError> {
        let request: Value = serde_json::from_str(data).map_err(|e| RouterError::BadJson {
            message: format!("{data} ({e})"),
        })?;
        let api = request
            .get("api")
            .and_then(Value::as_str)
            .ok_or(RouterError::MissingParameter("api"))?;
        let nuid = request
            .get("nuid")
            .and_then(Value::as_str)
            .ok_or(RouterError::MissingParameter("nuid"))?;
        let params = match request.get("params") {
            Some(Value::String(raw)) => raw.clone(),
            Some(object @ Value::Object(_)) => object.to_string(),
            _ => return Err(RouterError::MissingParameter("params")),
        };
        diag!(self.debug, DebugFlag::Api, api, params = %params, "API request");
        self.execute_api(api, &Nuid::new(nuid), &params).await
    }

    /// Execute `api` on behalf of `nuid` with JSON-object arguments.
    ///
    /// Most global APIs return `"0"`.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError`] for malformed names or arguments, unknown
    /// APIs and regions, and failures of the operation itself.
    pub async fn execute_api(
        self: &Arc<Self>,
        api: &str,
        nuid: &Nuid,
        raw_args: &str,
    ) -> Result<Value, RouterError> {
        let args = string_map(raw_args)?;
        match ApiCall::parse(api)? {
            ApiCall::Region { suffix } => self.execute_region_api(suffix, nuid, args, raw_args).await,
            ApiCall::Global(global) => self.execute_global_api(global, api, &args).await,
        }
    }

    async fn execute_region_api(
        &self,
        suffix: &str,
        nuid: &Nuid,
        mut args: ArgMap,
        raw_args: &str,
    ) -> Result<Value, RouterError> {
        let mut state = self.events.lock().await;
        let explicit = args.remove("region").filter(|r| !r.is_empty());
        let (reactor, region_name, recorded_args) = match explicit {
            Some(name) => {
                let recorded = to_raw_json(&args);
                (state.directory.lookup_name(&name)?, name, recorded)
            }
            None => {
                let region = self.region_for_nuid(nuid).await;
                let name = region.map(|r| r.to_string()).unwrap_or_default();
                (state.directory.lookup(region)?, name, raw_args.to_owned())
            }
        };
        let result = reactor.execute_api(suffix, &args, &recorded_args)?;
        let recorded = ApiEvent {
            api_type: "pad".to_owned(),
            pad: region_name,
            method: suffix.to_owned(),
            raw_args: recorded_args,
        };
        if let Err(e) = state.recorder.record_api(&recorded) {
            warn!(error = %e, "Failed to record API call");
        }
        Ok(result)
    }

    async fn execute_global_api(
        self: &Arc<Self>,
        global: GlobalApi,
        api: &str,
        args: &ArgMap,
    ) -> Result<Value, RouterError> {
        let ok = Value::String("0".to_owned());
        match global {
            GlobalApi::MidiFile => {
                let file = need_string(args, "file", api)?;
                let phrase = self
                    .outputs
                    .phrases
                    .load(file)
                    .map_err(|e| RouterError::MidiFile {
                        message: e.to_string(),
                    })?;
                let mut state = self.events.lock().await;
                let regions: Vec<Region> = self.settings.letters.iter().collect();
                for (channel, region) in (1..=MIDIFILE_CHANNELS).zip(regions) {
                    let part = phrase.cut_channel(channel);
                    if part.num_notes() == 0 {
                        continue;
                    }
                    if let Some(reactor) = state.directory.get_mut(region) {
                        reactor.start_phrase(part, &format!("midiplaych{channel}"));
                    }
                }
                Ok(ok)
            }
            GlobalApi::Echo => Ok(Value::String(
                args.get("value").cloned().unwrap_or_else(|| "ECHO!".to_owned()),
            )),
            GlobalApi::Debug => {
                let name = need_string(args, "debug", api)?;
                let on = need_bool(args, "onoff", api)?;
                self.debug
                    .set(name, on)
                    .map_err(|e| RouterError::UnknownDebugFlag(e.0))?;
                info!(flag = name, on, "Debug flag changed");
                Ok(ok)
            }
            GlobalApi::SetTempoFactor => {
                let factor = need_float(args, "value", api)?;
                self.clock.set_tempo_factor(f64::from(factor))?;
                info!(
                    factor,
                    clicks_per_second = self.clock.clicks_per_second(),
                    "Tempo changed"
                );
                Ok(ok)
            }
            GlobalApi::AudioReset => {
                self.audio_reset().await;
                Ok(ok)
            }
            GlobalApi::RecordingStart => {
                self.events.lock().await.recorder.start()?;
                Ok(ok)
            }
            GlobalApi::RecordingStop => {
                self.events.lock().await.recorder.stop()?;
                Ok(ok)
            }
            GlobalApi::RecordingSave => {
                let name = need_string(args, "name", api)?;
                self.events.lock().await.recorder.save(name)?;
                Ok(ok)
            }
            GlobalApi::RecordingPlay => {
                let name = need_string(args, "name", api)?;
                let path = self.events.lock().await.recorder.path_for(name)?;
                let events = load_recording(&path)?;
                self.events.lock().await.directory.send_all_notes_off();
                self.start_playback(events);
                Ok(ok)
            }
            GlobalApi::RecordingPlaybackStop => {
                self.playback.stop();
                self.events.lock().await.directory.send_all_notes_off();
                Ok(ok)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Outputs
    // -----------------------------------------------------------------------

    /// Pulse the audio engine transport off, wait, and turn it back on.
    pub async fn audio_reset(&self) {
        pulse_transport(self.outputs.audio.as_ref(), self.settings.audio_reset_settle).await;
    }

    fn spawn_audio_reset(&self) {
        let audio = Arc::clone(&self.outputs.audio);
        let settle = self.settings.audio_reset_settle;
        tokio::spawn(async move {
            pulse_transport(audio.as_ref(), settle).await;
        });
    }

    /// Send `/notify <name>` to the GUI when notifications are on.
    pub fn notify_gui(&self, name: &str) {
        if !self.settings.notify_gui {
            return;
        }
        diag!(self.debug, DebugFlag::Notify, name, "Notifying GUI");
        if let Err(e) = self.outputs.gui.notify(name) {
            warn!(error = %e, name, "GUI notification failed");
        }
    }
}

async fn pulse_transport(audio: &dyn AudioEngine, settle: Duration) {
    if let Err(e) = audio.set_transport(false) {
        warn!(error = %e, "Audio transport off failed");
    }
    tokio::time::sleep(settle).await;
    if let Err(e) = audio.set_transport(true) {
        warn!(error = %e, "Audio transport on failed");
    }
}

/// The optional `time` argument (seconds) as milliseconds.
#[allow(clippy::cast_possible_truncation)]
fn event_time_ms(args: &ArgMap, api: &str) -> Result<i64, RouterError> {
    match args.get("time").filter(|t| !t.is_empty()) {
        None => Ok(0),
        Some(text) => text
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|secs| secs.is_finite())
            .map(|secs| (secs * 1000.0) as i64)
            .ok_or_else(|| RouterError::bad(api, "time", text)),
    }
}

/// Flatten an inline JSON object argument, used by the bus event subscriber.
///
/// # Errors
///
/// Returns [`RouterError::BadJson`] if `payload` is not a flat JSON object.
pub fn event_args_from_json(payload: &[u8]) -> Result<ArgMap, RouterError> {
    let value: Value = serde_json::from_slice(payload).map_err(|e| RouterError::BadJson {
        message: e.to_string(),
    })?;
    match value {
        Value::Object(object) => flatten(&object),
        _ => Err(RouterError::BadJson {
            message: "event payload is not a JSON object".to_owned(),
        }),
    }
}
