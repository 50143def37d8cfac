//! The realtime clock loop.
//!
//! Wakes every 2 ms, converts elapsed wall-clock time into a target click
//! and lets the router catch every region up to it. Each wake also drains
//! the control channel; commands are logged and otherwise ignored. With the
//! `realtime` debug flag on, the current click is reported every four
//! beats.

use std::sync::Arc;
use std::time::Duration;

use montage_core::Router;
use montage_core::debug::DebugFlag;
use montage_types::{Clicks, Command};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::time::MissedTickBehavior;
use tracing::info;

/// Interval between realtime wakes.
pub const REALTIME_WAKE: Duration = Duration::from_millis(2);

/// Beats between realtime progress reports.
const REPORT_BEATS: u64 = 4;

/// Run until the control channel is closed.
pub async fn run_realtime(router: Arc<Router>, mut commands: mpsc::Receiver<Command>) {
    let mut interval = tokio::time::interval(REALTIME_WAKE);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let report_every = router.clock().clicks_per_beat().saturating_mul(REPORT_BEATS);
    let mut next_report = Clicks::ZERO;
    info!(report_every = %Clicks(report_every), "Realtime loop started");

    loop {
        interval.tick().await;
        router.realtime_tick(std::time::Instant::now()).await;

        loop {
            match commands.try_recv() {
                Ok(command) => {
                    info!(action = %command.action, arg = %command.arg, "Control command");
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    info!(last_click = %router.last_click(), "Realtime loop stopping");
                    return;
                }
            }
        }

        let click = router.last_click();
        if click >= next_report {
            montage_core::diag!(
                router.debug_flags(),
                DebugFlag::Realtime,
                click = %click,
                "Realtime"
            );
            next_report = Clicks(click.get().saturating_add(report_every));
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use montage_core::RouterSettings;
    use montage_core::outputs::Collaborators;
    use montage_types::Nuid;

    use super::*;
    use crate::reactor::LoggingReactor;

    #[tokio::test]
    async fn advances_clicks_and_stops_when_channel_closes() {
        let router = Arc::new(
            Router::with_reactors(
                RouterSettings::new(Nuid::new("engine")),
                |region| Box::new(LoggingReactor::new(region)),
                Collaborators::null(),
            )
            .unwrap(),
        );
        let (tx, rx) = mpsc::channel(4);
        let task = tokio::spawn(run_realtime(Arc::clone(&router), rx));

        tx.send(Command {
            action: "addmidi".to_owned(),
            arg: serde_json::Value::Null,
        })
        .await
        .unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        drop(tx);
        tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .unwrap()
            .unwrap();

        assert!(router.clock().is_started());
        assert!(router.last_click() > Clicks::ZERO);
    }
}
