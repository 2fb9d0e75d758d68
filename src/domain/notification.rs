//! Outbound notification messages.
//!
//! One [`Notificacion`] is built per delivery and pushed fire-and-forget;
//! nothing is persisted. Wire field names match the public contract
//! (`tipo`, `reporte_id`, `estado`, `timestamp`, `timestamp_notificacion`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::change_event::ChangeEvent;

/// Message type tag for report state updates.
const TIPO_ACTUALIZACION_ESTADO: &str = "actualizacion_estado";

/// JSON message pushed to a subscribed channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notificacion {
    /// Message type tag.
    pub tipo: String,
    /// Report whose state changed.
    pub reporte_id: String,
    /// New state label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estado: Option<String>,
    /// When the state changed at the store.
    pub timestamp: DateTime<Utc>,
    /// When this notification was built for delivery.
    pub timestamp_notificacion: DateTime<Utc>,
    /// Optional human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descripcion: Option<String>,
}

impl Notificacion {
    /// Builds the notification for one routable change event.
    #[must_use]
    pub fn from_event(reporte_id: &str, event: &ChangeEvent) -> Self {
        Self {
            tipo: TIPO_ACTUALIZACION_ESTADO.to_string(),
            reporte_id: reporte_id.to_string(),
            estado: event.estado.clone(),
            timestamp: event.timestamp,
            timestamp_notificacion: Utc::now(),
            descripcion: None,
        }
    }
}
