//! Replaying loaded recordings with their original timing.
//!
//! Each playback runs as its own task holding a stop flag. Starting a new
//! playback raises the flag of the one in progress, so the most recent
//! `recordingPlay` wins.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use montage_types::{DownDragUp, GestureStepEvent};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::recording::{PlaybackEvent, PlaybackKind};
use crate::router::{EventState, Router, UNSPECIFIED_ID};

/// Granularity of the wait between replayed events.
const PLAYBACK_STEP: Duration = Duration::from_millis(1);

/// Tracks the stop flag of the playback in progress.
#[derive(Debug, Default)]
pub struct PlaybackControl {
    current: Mutex<Option<Arc<AtomicBool>>>,
}

impl PlaybackControl {
    /// No playback in progress.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel any playback in progress and hand out a fresh stop flag.
    pub fn begin(&self) -> Arc<AtomicBool> {
        let flag = Arc::new(AtomicBool::new(false));
        let previous = self
            .current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(Arc::clone(&flag));
        if let Some(previous) = previous {
            previous.store(true, Ordering::Release);
            info!("Cancelled previous playback");
        }
        flag
    }

    /// Ask the playback in progress, if any, to stop.
    pub fn stop(&self) {
        if let Some(flag) = self
            .current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            flag.store(true, Ordering::Release);
        }
    }

    /// Whether a playback is registered.
    pub fn is_active(&self) -> bool {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Forget `flag` if it still belongs to the current playback.
    fn finish(&self, flag: &Arc<AtomicBool>) {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if current.as_ref().is_some_and(|c| Arc::ptr_eq(c, flag)) {
            *current = None;
        }
    }
}

impl Router {
    /// Spawn a playback task for `events`, cancelling any in progress.
    pub fn start_playback(self: &Arc<Self>, events: Vec<PlaybackEvent>) -> JoinHandle<()> {
        let stop = self.playback.begin();
        let router = Arc::clone(self);
        tokio::spawn(async move {
            router.play_recording(events, stop).await;
        })
    }

    /// Replay `events` in order, sleeping until each one's recorded time.
    ///
    /// When `stop` is raised the remaining events are skipped and every
    /// region receives all-notes-off.
    pub async fn play_recording(&self, events: Vec<PlaybackEvent>, stop: Arc<AtomicBool>) {
        info!(events = events.len(), "Playback started");
        self.notify_gui("start");
        let begun = tokio::time::Instant::now();

        for event in &events {
            let due = Duration::try_from_secs_f64(event.time).unwrap_or(Duration::ZERO);
            while begun.elapsed() < due && !stop.load(Ordering::Acquire) {
                tokio::time::sleep(PLAYBACK_STEP).await;
            }
            if stop.load(Ordering::Acquire) {
                info!("Playback stopped");
                self.events.lock().await.directory.send_all_notes_off();
                break;
            }
            let mut state = self.events.lock().await;
            replay_event(&mut state, event);
        }

        info!("Playback finished");
        self.notify_gui("stop");
        self.playback.finish(&stop);
    }
}

fn replay_event(state: &mut EventState, event: &PlaybackEvent) {
    if event.kind == PlaybackKind::Global {
        debug!(method = %event.method, "Skipping global event in playback");
        return;
    }
    let reactor = match state.directory.lookup_name(&event.pad) {
        Ok(reactor) => reactor,
        Err(e) => {
            warn!(error = %e, kind = event.kind.as_str(), "Playback event has no region");
            return;
        }
    };
    if event.kind == PlaybackKind::Cursor {
        let Ok(down_drag_up) = event.method.parse::<DownDragUp>() else {
            warn!(method = %event.method, "Playback cursor event has unknown phase");
            return;
        };
        let step = GestureStepEvent {
            id: event
                .args
                .get("id")
                .cloned()
                .unwrap_or_else(|| UNSPECIFIED_ID.to_owned()),
            x: coordinate(event, "x"),
            y: coordinate(event, "y"),
            z: coordinate(event, "z"),
            down_drag_up,
        };
        reactor.replay_gesture_step(&step);
    } else if event.kind.is_api() {
        if let Err(e) = reactor.execute_api(&event.method, &event.args, &event.raw_args) {
            warn!(error = %e, method = %event.method, "Playback API call failed");
        }
    }
}

fn coordinate(event: &PlaybackEvent, name: &str) -> f32 {
    let value = event.args.get(name).map_or("", String::as_str);
    value.trim().parse().unwrap_or_else(|_| {
        warn!(name, value, "Unparsable playback coordinate, using 0");
        0.0
    })
}
