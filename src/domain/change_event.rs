//! Change events sourced from the storage layer's change stream.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of mutation that produced a change event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    /// A state record was inserted.
    Created,
    /// An existing state record was modified.
    Updated,
}

/// One detected state change for a tracked report.
///
/// Produced by the storage layer, consumed by the fan-out engine. An
/// event without a report identifier is unroutable and gets discarded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Identifier of the report whose state changed, if present.
    pub reporte_id: Option<String>,
    /// New state label, if present.
    pub estado: Option<String>,
    /// Timestamp of the state change at the store.
    pub timestamp: DateTime<Utc>,
    /// Whether the record was created or updated.
    pub kind: MutationKind,
}

impl ChangeEvent {
    /// Returns the report identifier when the event can be routed.
    ///
    /// Empty identifiers count as absent.
    #[must_use]
    pub fn routable(&self) -> Option<&str> {
        self.reporte_id.as_deref().filter(|id| !id.is_empty())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn event_with_report_id_is_routable() {
        let event = ChangeEvent {
            reporte_id: Some("R1".to_string()),
            estado: Some("resuelto".to_string()),
            timestamp: Utc::now(),
            kind: MutationKind::Updated,
        };
        assert_eq!(event.routable(), Some("R1"));
    }

    #[test]
    fn missing_or_empty_report_id_is_unroutable() {
        let mut event = ChangeEvent {
            reporte_id: None,
            estado: None,
            timestamp: Utc::now(),
            kind: MutationKind::Created,
        };
        assert_eq!(event.routable(), None);

        event.reporte_id = Some(String::new());
        assert_eq!(event.routable(), None);
    }
}
