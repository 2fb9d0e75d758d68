//! In-memory entity-store implementations.
//!
//! [`MemoryStateStore`] doubles as the change-stream source: every
//! recorded state publishes a [`ChangeEvent`], standing in for the
//! storage layer's change feed.

use std::collections::HashMap;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;

use super::{EstadoReporte, PerfilUsuario, StateStore, TransicionTrabajo, UserDirectory,
            WorkStateStore};
use crate::domain::{ChangeEvent, ChangeStream, MutationKind};
use crate::error::GatewayError;

/// In-memory [`StateStore`] that publishes a change event per mutation.
#[derive(Debug)]
pub struct MemoryStateStore {
    /// Table label, carried in logs to match the configured deployment.
    table: String,
    estados: RwLock<HashMap<String, Vec<EstadoReporte>>>,
    stream: ChangeStream,
}

impl MemoryStateStore {
    /// Creates an empty store publishing into `stream`.
    #[must_use]
    pub fn new(table: impl Into<String>, stream: ChangeStream) -> Self {
        Self {
            table: table.into(),
            estados: RwLock::new(HashMap::new()),
            stream,
        }
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn estados(&self, reporte_id: &str) -> Result<Vec<EstadoReporte>, GatewayError> {
        let estados = self.estados.read().await;
        let mut result = estados.get(reporte_id).cloned().unwrap_or_default();
        result.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(result)
    }

    async fn registrar_estado(&self, estado: EstadoReporte) -> Result<(), GatewayError> {
        let event = {
            let mut estados = self.estados.write().await;
            let history = estados.entry(estado.reporte_id.clone()).or_default();
            let kind = if history.is_empty() {
                MutationKind::Created
            } else {
                MutationKind::Updated
            };
            let event = ChangeEvent {
                reporte_id: Some(estado.reporte_id.clone()),
                estado: Some(estado.estado.clone()),
                timestamp: estado.timestamp,
                kind,
            };
            history.push(estado);
            event
        };
        tracing::debug!(
            table = %self.table,
            reporte_id = event.reporte_id.as_deref().unwrap_or(""),
            "state recorded"
        );
        self.stream.publish(event);
        Ok(())
    }
}

/// In-memory [`WorkStateStore`] keeping transitions in arrival order.
#[derive(Debug, Default)]
pub struct MemoryWorkStore {
    transiciones: RwLock<Vec<TransicionTrabajo>>,
}

impl MemoryWorkStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all recorded transitions.
    pub async fn transiciones(&self) -> Vec<TransicionTrabajo> {
        self.transiciones.read().await.clone()
    }
}

#[async_trait]
impl WorkStateStore for MemoryWorkStore {
    async fn registrar_transicion(
        &self,
        transicion: TransicionTrabajo,
    ) -> Result<(), GatewayError> {
        tracing::info!(
            reporte_id = %transicion.reporte_id,
            trabajador_id = %transicion.trabajador_id,
            estado_trabajo = %transicion.estado_trabajo,
            "work-state transition recorded"
        );
        self.transiciones.write().await.push(transicion);
        Ok(())
    }
}

/// In-memory [`UserDirectory`] with SHA-256 password digests.
#[derive(Debug, Default)]
pub struct MemoryUserDirectory {
    usuarios: RwLock<HashMap<String, (PerfilUsuario, String)>>,
}

impl MemoryUserDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a user, keyed by email.
    pub async fn registrar(&self, perfil: PerfilUsuario, password: &str) {
        let digest = hash_password(password);
        self.usuarios
            .write()
            .await
            .insert(perfil.email.clone(), (perfil, digest));
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn verificar_credenciales(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<PerfilUsuario>, GatewayError> {
        let usuarios = self.usuarios.read().await;
        let Some((perfil, stored_digest)) = usuarios.get(email) else {
            return Ok(None);
        };
        if hash_password(password) != *stored_digest {
            return Ok(None);
        }
        Ok(Some(perfil.clone()))
    }
}

/// Hex-encoded SHA-256 digest of a password.
fn hash_password(password: &str) -> String {
    let digest = Sha256::digest(password.as_bytes());
    digest.iter().map(|byte| format!("{byte:02x}")).collect()
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use chrono::Utc;

    fn estado(reporte_id: &str, estado: &str) -> EstadoReporte {
        EstadoReporte {
            reporte_id: reporte_id.to_string(),
            estado: estado.to_string(),
            timestamp: Utc::now(),
            descripcion: None,
        }
    }

    #[tokio::test]
    async fn registrar_estado_publishes_change_event() {
        let stream = ChangeStream::new(16);
        let mut rx = stream.subscribe();
        let store = MemoryStateStore::new("TablaEstados", stream);

        let Ok(()) = store.registrar_estado(estado("R1", "pendiente")).await else {
            panic!("registrar failed");
        };

        let Ok(event) = rx.recv().await else {
            panic!("expected change event");
        };
        assert_eq!(event.routable(), Some("R1"));
        assert_eq!(event.kind, MutationKind::Created);
        assert_eq!(event.estado.as_deref(), Some("pendiente"));

        // Second state for the same report is an update.
        let _ = store.registrar_estado(estado("R1", "asignado")).await;
        let Ok(event) = rx.recv().await else {
            panic!("expected change event");
        };
        assert_eq!(event.kind, MutationKind::Updated);
    }

    #[tokio::test]
    async fn estados_returns_newest_first() {
        let store = MemoryStateStore::new("TablaEstados", ChangeStream::new(16));
        let mut primero = estado("R1", "pendiente");
        primero.timestamp = Utc::now() - chrono::Duration::seconds(60);
        let _ = store.registrar_estado(primero).await;
        let _ = store.registrar_estado(estado("R1", "resuelto")).await;

        let Ok(historia) = store.estados("R1").await else {
            panic!("estados failed");
        };
        assert_eq!(historia.len(), 2);
        assert_eq!(historia.first().map(|e| e.estado.as_str()), Some("resuelto"));
    }

    #[tokio::test]
    async fn directory_verifies_credentials() {
        let dir = MemoryUserDirectory::new();
        dir.registrar(
            PerfilUsuario {
                usuario_id: "u1".to_string(),
                email: "u1@utec.edu.pe".to_string(),
                rol: Role::Student,
            },
            "hunter2",
        )
        .await;

        let Ok(Some(perfil)) = dir.verificar_credenciales("u1@utec.edu.pe", "hunter2").await
        else {
            panic!("expected a profile");
        };
        assert_eq!(perfil.usuario_id, "u1");

        let Ok(none) = dir.verificar_credenciales("u1@utec.edu.pe", "wrong").await else {
            panic!("verify failed");
        };
        assert!(none.is_none());

        let Ok(none) = dir.verificar_credenciales("nobody@utec.edu.pe", "hunter2").await
        else {
            panic!("verify failed");
        };
        assert!(none.is_none());
    }
}
