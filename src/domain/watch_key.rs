//! Watch key: what a channel observes.
//!
//! A channel subscribes either to a specific report or to the sentinel
//! `ALL`, meaning every report. The wire representation is a plain
//! string; `"ALL"` (and an absent or empty value) maps to the wildcard.

use std::fmt;

use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

/// Sentinel string for the wildcard subscription.
const ALL: &str = "ALL";

/// The entity a channel observes: one report or every report.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WatchKey {
    /// Observe every report.
    All,
    /// Observe the report with this identifier.
    Reporte(String),
}

impl WatchKey {
    /// Derives a watch key from an optional request parameter.
    ///
    /// `None`, the empty string, and the literal `"ALL"` all map to the
    /// wildcard, matching the connect-time default.
    #[must_use]
    pub fn from_param(param: Option<&str>) -> Self {
        match param {
            None | Some("") | Some(ALL) => Self::All,
            Some(id) => Self::Reporte(id.to_string()),
        }
    }

    /// Returns the wire representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::All => ALL,
            Self::Reporte(id) => id,
        }
    }

    /// Returns `true` for the wildcard key.
    #[must_use]
    pub const fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }
}

impl fmt::Display for WatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for WatchKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for WatchKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::from_param(Some(&raw)))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn missing_param_defaults_to_all() {
        assert_eq!(WatchKey::from_param(None), WatchKey::All);
        assert_eq!(WatchKey::from_param(Some("")), WatchKey::All);
        assert_eq!(WatchKey::from_param(Some("ALL")), WatchKey::All);
    }

    #[test]
    fn specific_report_is_preserved() {
        let key = WatchKey::from_param(Some("R1"));
        assert_eq!(key, WatchKey::Reporte("R1".to_string()));
        assert_eq!(key.as_str(), "R1");
        assert!(!key.is_all());
    }

    #[test]
    fn serde_uses_wire_string() {
        let Ok(json) = serde_json::to_string(&WatchKey::All) else {
            panic!("serialize failed");
        };
        assert_eq!(json, "\"ALL\"");

        let Ok(key) = serde_json::from_str::<WatchKey>("\"R7\"") else {
            panic!("deserialize failed");
        };
        assert_eq!(key, WatchKey::Reporte("R7".to_string()));
    }
}
