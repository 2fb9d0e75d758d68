//! External entity-store interfaces.
//!
//! Report states, work-state transitions, and user credentials live in
//! external tables; the gateway only calls through these seams. The
//! in-memory implementations in [`memory`] back the local server and
//! the tests.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::Role;
use crate::error::GatewayError;

pub use memory::{MemoryStateStore, MemoryUserDirectory, MemoryWorkStore};

/// One state record of a tracked report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EstadoReporte {
    /// Report identifier.
    pub reporte_id: String,
    /// State label (e.g. `"asignado"`, `"resuelto"`).
    pub estado: String,
    /// When the state was recorded.
    pub timestamp: DateTime<Utc>,
    /// Optional human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descripcion: Option<String>,
}

/// One work-state transition reported by a field worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransicionTrabajo {
    /// Report being worked on.
    pub reporte_id: String,
    /// Worker reporting the transition; must equal the verified subject.
    pub trabajador_id: String,
    /// Work-state label (e.g. `"llego"`, `"terminado"`).
    pub estado_trabajo: String,
    /// When the transition was reported.
    pub timestamp: DateTime<Utc>,
    /// Optional worker comments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comentarios: Option<String>,
}

/// A registered user profile, as stored in the user directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerfilUsuario {
    /// Subject identifier issued into tokens.
    pub usuario_id: String,
    /// Account email.
    pub email: String,
    /// Account role.
    pub rol: Role,
}

/// Read access to report state history.
#[async_trait]
pub trait StateStore: std::fmt::Debug + Send + Sync {
    /// Returns all recorded states for a report, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Dependency`] if the backing table is
    /// unavailable.
    async fn estados(&self, reporte_id: &str) -> Result<Vec<EstadoReporte>, GatewayError>;

    /// Records a new state for a report.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Dependency`] if the backing table is
    /// unavailable.
    async fn registrar_estado(&self, estado: EstadoReporte) -> Result<(), GatewayError>;
}

/// Write access for worker-reported work-state transitions.
#[async_trait]
pub trait WorkStateStore: std::fmt::Debug + Send + Sync {
    /// Records one work-state transition.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Dependency`] if the backing table is
    /// unavailable.
    async fn registrar_transicion(&self, transicion: TransicionTrabajo)
    -> Result<(), GatewayError>;
}

/// Credential verification against the user directory.
#[async_trait]
pub trait UserDirectory: std::fmt::Debug + Send + Sync {
    /// Checks an email/password pair, returning the profile on a match
    /// and `None` when the credentials do not verify.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Dependency`] if the directory is
    /// unavailable.
    async fn verificar_credenciales(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<PerfilUsuario>, GatewayError>;
}
