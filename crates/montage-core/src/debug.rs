//! Runtime diagnostic switches.
//!
//! Each [`DebugFlag`] promotes one family of diagnostic logs to `info`
//! level. Flags are toggled at runtime through the `global.debug` API and
//! seeded from the comma-separated `debug` configuration value. They are
//! read on hot paths, so each is a lone atomic.

use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::info;

/// A named diagnostic switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DebugFlag {
    /// Click advancement.
    Advance,
    /// API requests and responses.
    Api,
    /// Gesture events.
    Cursor,
    /// GUI notifications.
    Notify,
    /// Sound generation.
    GenSound,
    /// Visual generation.
    GenVisual,
    /// Visual shader parameters.
    Isf,
    /// Phrase looping.
    Loop,
    /// Configuration loading.
    Config,
    /// MIDI input.
    Midi,
    /// Morph device input.
    Morph,
    /// Bus traffic.
    Nats,
    /// OSC traffic.
    Osc,
    /// Visual engine traffic.
    Resolume,
    /// The realtime loop.
    Realtime,
    /// Remote participants.
    Remote,
}

impl DebugFlag {
    /// Every flag, in declaration order.
    pub const ALL: [Self; 16] = [
        Self::Advance,
        Self::Api,
        Self::Cursor,
        Self::Notify,
        Self::GenSound,
        Self::GenVisual,
        Self::Isf,
        Self::Loop,
        Self::Config,
        Self::Midi,
        Self::Morph,
        Self::Nats,
        Self::Osc,
        Self::Resolume,
        Self::Realtime,
        Self::Remote,
    ];

    /// The name used in configuration and the `debug` API.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Advance => "advance",
            Self::Api => "api",
            Self::Cursor => "cursor",
            Self::Notify => "notify",
            Self::GenSound => "gensound",
            Self::GenVisual => "genvisual",
            Self::Isf => "isf",
            Self::Loop => "loop",
            Self::Config => "config",
            Self::Midi => "midi",
            Self::Morph => "morph",
            Self::Nats => "nats",
            Self::Osc => "osc",
            Self::Resolume => "resolume",
            Self::Realtime => "realtime",
            Self::Remote => "remote",
        }
    }

    const fn index(self) -> usize {
        self as usize
    }
}

/// Log at `info` when `$flag` is on in `$flags`, at `debug` otherwise.
#[macro_export]
macro_rules! diag {
    ($flags:expr, $flag:expr, $($arg:tt)+) => {
        if $flags.is_on($flag) {
            ::tracing::info!($($arg)+);
        } else {
            ::tracing::debug!($($arg)+);
        }
    };
}

/// A debug flag name that does not exist.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized debug type={0}")]
pub struct UnknownDebugFlag(pub String);

/// The flags a name toggles. `gen` covers both generation flags.
fn flags_named(name: &str) -> Result<Vec<DebugFlag>, UnknownDebugFlag> {
    if name.eq_ignore_ascii_case("gen") {
        return Ok(vec![DebugFlag::GenSound, DebugFlag::GenVisual]);
    }
    name.parse().map(|flag| vec![flag])
}

impl FromStr for DebugFlag {
    type Err = UnknownDebugFlag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        DebugFlag::ALL
            .into_iter()
            .find(|f| f.name() == lower)
            .ok_or_else(|| UnknownDebugFlag(s.to_owned()))
    }
}

/// The live state of every [`DebugFlag`].
#[derive(Debug, Default)]
pub struct DebugFlags {
    flags: [AtomicBool; 16],
}

impl DebugFlags {
    /// All flags off.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a comma-separated list such as `"api,cursor"`.
    ///
    /// Unknown names are logged and skipped.
    pub fn from_list(list: &str) -> Self {
        let flags = Self::new();
        for name in list.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            match flags.set(name, true) {
                Ok(()) => info!(flag = name, "Turning debug on"),
                Err(e) => tracing::warn!(error = %e, "Ignoring debug flag from config"),
            }
        }
        flags
    }

    /// Whether `flag` is on.
    pub fn is_on(&self, flag: DebugFlag) -> bool {
        self.flags
            .get(flag.index())
            .is_some_and(|f| f.load(Ordering::Relaxed))
    }

    /// Toggle the flag(s) called `name`.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownDebugFlag`] if no flag has that name.
    pub fn set(&self, name: &str, on: bool) -> Result<(), UnknownDebugFlag> {
        for flag in flags_named(name)? {
            if let Some(f) = self.flags.get(flag.index()) {
                f.store(on, Ordering::Relaxed);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for flag in DebugFlag::ALL {
            assert_eq!(flag.name().parse::<DebugFlag>().unwrap(), flag);
        }
    }

    #[test]
    fn gen_sets_both_generation_flags() {
        let flags = DebugFlags::new();
        flags.set("gen", true).unwrap();
        assert!(flags.is_on(DebugFlag::GenSound));
        assert!(flags.is_on(DebugFlag::GenVisual));
        flags.set("GenSound", false).unwrap();
        assert!(!flags.is_on(DebugFlag::GenSound));
    }

    #[test]
    fn unknown_flag_is_rejected() {
        assert!(DebugFlags::new().set("verbose", true).is_err());
    }

    #[test]
    fn list_skips_unknown_names() {
        let flags = DebugFlags::from_list("api, cursor,,bogus");
        assert!(flags.is_on(DebugFlag::Api));
        assert!(flags.is_on(DebugFlag::Cursor));
        assert!(!flags.is_on(DebugFlag::Midi));
    }
}
