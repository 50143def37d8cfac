//! The click counter, the router's only unit of musical time.
//!
//! Clicks are derived from wall-clock time through a tempo mapping and
//! only ever move forward. Reactors receive them one at a time.

use serde::{Deserialize, Serialize};

/// A count of clock ticks since the realtime loop started.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Clicks(pub u64);

impl Clicks {
    /// Click zero, the reference instant of the realtime loop.
    pub const ZERO: Self = Self(0);

    /// Wrap a raw tick count.
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Return the raw tick count.
    pub const fn get(self) -> u64 {
        self.0
    }

    /// The click immediately after this one (saturating at `u64::MAX`).
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Whether this click lands on a boundary of `period` clicks.
    ///
    /// A zero period never matches.
    pub const fn is_multiple_of(self, period: u64) -> bool {
        match self.0.checked_rem(period) {
            Some(rem) => rem == 0,
            None => false,
        }
    }

    /// Iterate over every click in the half-open range `[self, end)`.
    pub fn until(self, end: Self) -> impl Iterator<Item = Self> {
        (self.0..end.0).map(Self)
    }
}

impl core::fmt::Display for Clicks {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Clicks {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn until_is_half_open() {
        let clicks: Vec<u64> = Clicks(3).until(Clicks(6)).map(Clicks::get).collect();
        assert_eq!(clicks, vec![3, 4, 5]);
        assert_eq!(Clicks(6).until(Clicks(6)).count(), 0);
        assert_eq!(Clicks(7).until(Clicks(6)).count(), 0);
    }

    #[test]
    fn beat_boundaries() {
        assert!(Clicks(0).is_multiple_of(96));
        assert!(Clicks(192).is_multiple_of(96));
        assert!(!Clicks(95).is_multiple_of(96));
        assert!(!Clicks(10).is_multiple_of(0));
    }
}
