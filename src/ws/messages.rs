//! Typed inbound action messages and direct response shapes.
//!
//! Inbound messages carry `{"action": ..., "token": ..., ...}`; parsing
//! into [`ActionRequest`] is the validation step. A body that does not
//! match any schema is rejected as a validation error, never handled by
//! duck-typing.

use serde::{Deserialize, Serialize};

use crate::store::EstadoReporte;

/// One inbound client action, discriminated by the `action` field.
///
/// Every action re-carries a token; tokens are never cached across
/// messages.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ActionRequest {
    /// Fetch the recorded states of a report; the result is pushed back
    /// to the requesting channel only.
    ObtenerEstados {
        /// Bearer token for this action.
        token: String,
        /// Report to query.
        reporte_id: String,
    },

    /// Worker reports arrival on site.
    TrabajadorLlego {
        /// Bearer token for this action.
        token: String,
        /// Report being worked on.
        reporte_id: String,
        /// Acting worker; must equal the token subject.
        trabajador_id: String,
        /// Optional comments.
        #[serde(default)]
        comentarios: Option<String>,
    },

    /// Worker reports the work as finished.
    TrabajoTerminado {
        /// Bearer token for this action.
        token: String,
        /// Report being worked on.
        reporte_id: String,
        /// Acting worker; must equal the token subject.
        trabajador_id: String,
        /// Optional comments.
        #[serde(default)]
        comentarios: Option<String>,
    },
}

impl ActionRequest {
    /// Returns the token carried by this action.
    #[must_use]
    pub fn token(&self) -> &str {
        match self {
            Self::ObtenerEstados { token, .. }
            | Self::TrabajadorLlego { token, .. }
            | Self::TrabajoTerminado { token, .. } => token,
        }
    }

    /// Returns the action name, for logging.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::ObtenerEstados { .. } => "obtener_estados",
            Self::TrabajadorLlego { .. } => "trabajador_llego",
            Self::TrabajoTerminado { .. } => "trabajo_terminado",
        }
    }
}

/// Direct response to `obtener_estados`, pushed to the requester.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RespuestaEstados {
    /// Report queried.
    pub reporte_id: String,
    /// Full state history, newest first.
    pub estados: Vec<EstadoReporte>,
    /// The most recent state, when any exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estado_actual: Option<EstadoReporte>,
}

/// Error payload pushed over an active channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorMensaje {
    /// Human-readable message, already sanitized for the caller.
    pub error: String,
    /// Numeric code, mirrors the HTTP status.
    pub codigo: u16,
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn obtener_estados_parses() {
        let json = r#"{"action":"obtener_estados","token":"t","reporte_id":"R1"}"#;
        let Ok(action) = serde_json::from_str::<ActionRequest>(json) else {
            panic!("parse failed");
        };
        assert_eq!(action.name(), "obtener_estados");
        assert_eq!(action.token(), "t");
    }

    #[test]
    fn worker_action_parses_with_optional_comments() {
        let json = r#"{
            "action": "trabajador_llego",
            "token": "t",
            "reporte_id": "R1",
            "trabajador_id": "w1"
        }"#;
        let Ok(action) = serde_json::from_str::<ActionRequest>(json) else {
            panic!("parse failed");
        };
        let ActionRequest::TrabajadorLlego { comentarios, .. } = action else {
            panic!("wrong variant");
        };
        assert!(comentarios.is_none());
    }

    #[test]
    fn unknown_action_is_rejected() {
        let json = r#"{"action":"drop_tables","token":"t"}"#;
        assert!(serde_json::from_str::<ActionRequest>(json).is_err());
    }

    #[test]
    fn missing_token_is_rejected() {
        let json = r#"{"action":"obtener_estados","reporte_id":"R1"}"#;
        assert!(serde_json::from_str::<ActionRequest>(json).is_err());
    }
}
