//! Participant identity.
//!
//! A [`Nuid`] names one participant on the distributed bus: a remote
//! controller, a GUI, or this router process itself. It is opaque to the
//! router apart from equality, which drives both region stickiness and
//! self-echo suppression.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Network-unique identifier of a distributed participant.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Nuid(String);

impl Nuid {
    /// Wrap an identifier received from the bus or from configuration.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Generate a fresh identifier for this process.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Nuid {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Nuid {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for Nuid {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_differ() {
        assert_ne!(Nuid::generate(), Nuid::generate());
    }

    #[test]
    fn serializes_as_plain_string() {
        let json = serde_json::to_string(&Nuid::new("host-1")).unwrap_or_default();
        assert_eq!(json, "\"host-1\"");
    }
}
