//! Wall-clock to click conversion.
//!
//! The realtime loop records a reference instant (`time0`) on its first
//! wake and from then on asks the [`Clock`] which click corresponds to the
//! current instant. The mapping is piecewise linear: every tempo change
//! rebases the origin at the current position, so the click count never
//! jumps backward.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock, PoisonError};
use std::time::Instant;

use montage_types::Clicks;

/// Largest accepted tempo factor. Each advance delivers every click in
/// range under the event lock, so the rate must stay bounded.
pub const MAX_TEMPO_FACTOR: f64 = 16.0;

/// Errors raised by clock configuration and tempo changes.
#[derive(Debug, thiserror::Error)]
pub enum ClockError {
    /// Clicks per second or a tempo factor was zero, negative or not finite.
    #[error("invalid tempo: {reason}")]
    InvalidTempo {
        /// Explanation of what is wrong.
        reason: String,
    },

    /// Clicks per beat was zero.
    #[error("clicks_per_beat must be at least 1")]
    ZeroBeat,
}

/// Linear mapping from elapsed seconds to clicks, with a movable origin.
#[derive(Debug, Clone, PartialEq)]
pub struct TempoMap {
    default_clicks_per_second: f64,
    clicks_per_second: f64,
    origin_secs: f64,
    origin_click: u64,
}

impl TempoMap {
    /// A mapping starting at click 0, second 0.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::InvalidTempo`] unless `clicks_per_second` is
    /// finite and strictly positive.
    pub fn new(clicks_per_second: f64) -> Result<Self, ClockError> {
        check_positive("clicks_per_second", clicks_per_second)?;
        Ok(Self {
            default_clicks_per_second: clicks_per_second,
            clicks_per_second,
            origin_secs: 0.0,
            origin_click: 0,
        })
    }

    /// The current rate.
    pub const fn clicks_per_second(&self) -> f64 {
        self.clicks_per_second
    }

    /// The click at `secs` seconds after `time0`.
    ///
    /// Times before the current origin map to the origin click.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn click_at(&self, secs: f64) -> Clicks {
        let delta = ((secs - self.origin_secs) * self.clicks_per_second).round();
        let delta = if delta.is_finite() && delta > 0.0 {
            delta as u64
        } else {
            0
        };
        Clicks(self.origin_click.saturating_add(delta))
    }

    /// Scale the default rate by `factor`, rebasing the origin at `secs`.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::InvalidTempo`] unless `factor` is finite,
    /// strictly positive and at most [`MAX_TEMPO_FACTOR`].
    pub fn set_factor(&mut self, secs: f64, factor: f64) -> Result<(), ClockError> {
        check_positive("tempo factor", factor)?;
        if factor > MAX_TEMPO_FACTOR {
            return Err(ClockError::InvalidTempo {
                reason: format!("tempo factor must be at most {MAX_TEMPO_FACTOR}, got {factor}"),
            });
        }
        let here = self.click_at(secs);
        self.origin_click = here.get();
        self.origin_secs = secs.max(self.origin_secs);
        self.clicks_per_second = self.default_clicks_per_second * factor;
        Ok(())
    }
}

fn check_positive(what: &str, value: f64) -> Result<(), ClockError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ClockError::InvalidTempo {
            reason: format!("{what} must be positive and finite, got {value}"),
        })
    }
}

/// The router's clock: reference instant, tempo and current millisecond.
#[derive(Debug)]
pub struct Clock {
    time0: OnceLock<Instant>,
    tempo: Mutex<TempoMap>,
    current_milli: AtomicU64,
    clicks_per_beat: u64,
}

impl Clock {
    /// Create a clock that has not started yet.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError`] for a non-positive rate or a zero beat.
    pub fn new(clicks_per_second: f64, clicks_per_beat: u64) -> Result<Self, ClockError> {
        if clicks_per_beat == 0 {
            return Err(ClockError::ZeroBeat);
        }
        Ok(Self {
            time0: OnceLock::new(),
            tempo: Mutex::new(TempoMap::new(clicks_per_second)?),
            current_milli: AtomicU64::new(0),
            clicks_per_beat,
        })
    }

    /// Record `now` as click 0. Later calls keep the first instant.
    pub fn mark_start(&self, now: Instant) -> Instant {
        *self.time0.get_or_init(|| now)
    }

    /// Whether [`mark_start`](Self::mark_start) has run.
    pub fn is_started(&self) -> bool {
        self.time0.get().is_some()
    }

    /// Seconds elapsed between `time0` and `now` (zero before start).
    pub fn seconds_at(&self, now: Instant) -> f64 {
        self.time0
            .get()
            .map_or(0.0, |t0| now.saturating_duration_since(*t0).as_secs_f64())
    }

    /// Compute the target click for `now` and update the current millisecond.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn target_click(&self, now: Instant) -> Clicks {
        let secs = self.seconds_at(now);
        self.current_milli
            .store((secs * 1000.0) as u64, Ordering::Relaxed);
        self.tempo
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .click_at(secs)
    }

    /// Milliseconds since `time0` as of the last realtime wake.
    pub fn current_milli(&self) -> u64 {
        self.current_milli.load(Ordering::Relaxed)
    }

    /// Change the tempo to `factor` times the configured rate, effective now.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::InvalidTempo`] for a non-positive factor or one
    /// above [`MAX_TEMPO_FACTOR`].
    pub fn set_tempo_factor(&self, factor: f64) -> Result<(), ClockError> {
        let secs = self.seconds_at(Instant::now());
        self.tempo
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .set_factor(secs, factor)
    }

    /// The current clicks-per-second rate.
    pub fn clicks_per_second(&self) -> f64 {
        self.tempo
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clicks_per_second()
    }

    /// Clicks in one beat.
    pub const fn clicks_per_beat(&self) -> u64 {
        self.clicks_per_beat
    }
}
