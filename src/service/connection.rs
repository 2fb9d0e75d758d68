//! Connection lifecycle: authenticate, register, serve actions, tear down.
//!
//! Each connect, disconnect, and inbound action is an independent,
//! stateless unit of work; all shared state lives in the registry and
//! entity stores. The per-channel state machine is
//! `Connecting → Authenticated → Registered → Active → Closed`, with
//! authentication always short-circuiting before any state mutation.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::auth::{Claims, Role, TokenService};
use crate::domain::{ChannelId, Subscription, WatchKey};
use crate::error::GatewayError;
use crate::gateway::ChannelGateway;
use crate::registry::SubscriptionRegistry;
use crate::store::{StateStore, TransicionTrabajo, WorkStateStore};
use crate::ws::messages::{ActionRequest, RespuestaEstados};

/// Orchestrates the lifecycle of realtime channels.
///
/// All collaborators are injected at construction; tests substitute
/// in-memory fakes.
#[derive(Debug, Clone)]
pub struct ConnectionService {
    tokens: TokenService,
    registry: SubscriptionRegistry,
    gateway: Arc<dyn ChannelGateway>,
    estados: Arc<dyn StateStore>,
    trabajos: Arc<dyn WorkStateStore>,
    channel_ttl: Duration,
}

impl ConnectionService {
    /// Creates the service with its injected collaborators.
    #[must_use]
    pub fn new(
        tokens: TokenService,
        registry: SubscriptionRegistry,
        gateway: Arc<dyn ChannelGateway>,
        estados: Arc<dyn StateStore>,
        trabajos: Arc<dyn WorkStateStore>,
        channel_ttl: Duration,
    ) -> Self {
        Self {
            tokens,
            registry,
            gateway,
            estados,
            trabajos,
            channel_ttl,
        }
    }

    /// Verifies the token carried by a connect request.
    ///
    /// Runs before the protocol upgrade so a rejected connection never
    /// produces a registry entry.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Authentication`] when the token is
    /// missing, malformed, tampered, or expired.
    pub fn authenticate(&self, token: Option<&str>) -> Result<Claims, GatewayError> {
        let token = token
            .filter(|t| !t.is_empty())
            .ok_or(GatewayError::Authentication)?;
        self.tokens.verify(token)
    }

    /// Registers an authenticated channel.
    ///
    /// Identity comes from the verified claims; the watch key comes from
    /// the optional `reporte_id` parameter, defaulting to the wildcard.
    /// The fixed time-to-live bounds the lifetime of orphaned entries if
    /// an explicit disconnect is ever missed.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Dependency`] if the registry write fails.
    pub async fn register_channel(
        &self,
        channel_id: ChannelId,
        claims: &Claims,
        reporte_id: Option<&str>,
    ) -> Result<Subscription, GatewayError> {
        let watch_key = WatchKey::from_param(reporte_id);
        let record = self
            .registry
            .register(channel_id, watch_key, &claims.sub, claims.rol, self.channel_ttl)
            .await?;
        tracing::info!(
            channel_id = %record.channel_id,
            watch_key = %record.watch_key,
            usuario_id = %record.usuario_id,
            "channel connected"
        );
        Ok(record)
    }

    /// Authenticates and registers a connect request in one step.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Authentication`] before touching the
    /// registry when the token does not verify, or
    /// [`GatewayError::Dependency`] if registration fails.
    pub async fn connect(
        &self,
        channel_id: ChannelId,
        token: Option<&str>,
        reporte_id: Option<&str>,
    ) -> Result<Subscription, GatewayError> {
        let claims = self.authenticate(token)?;
        self.register_channel(channel_id, &claims, reporte_id).await
    }

    /// Tears down a channel on disconnect. Best-effort: an entry that
    /// already expired or was pruned is treated as removed.
    pub async fn disconnect(&self, channel_id: &ChannelId) {
        if let Err(err) = self.registry.deregister(channel_id).await {
            tracing::warn!(channel_id = %channel_id, error = %err, "deregister on disconnect failed");
        }
        tracing::info!(channel_id = %channel_id, "channel disconnected");
    }

    /// Handles one inbound action from an active channel.
    ///
    /// The token carried in the action payload is re-verified on every
    /// message; nothing is cached from the connect handshake. Responses
    /// go back through the gateway to the requesting channel only.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Validation`] for malformed payloads,
    /// [`GatewayError::Authentication`] for a bad token,
    /// [`GatewayError::Authorization`] for role or identity mismatches,
    /// and [`GatewayError::Dependency`] for store or delivery faults.
    pub async fn handle_action(
        &self,
        channel_id: &ChannelId,
        body: &str,
    ) -> Result<(), GatewayError> {
        let action: ActionRequest = serde_json::from_str(body)
            .map_err(|err| GatewayError::Validation(format!("malformed action: {err}")))?;
        let claims = self.tokens.verify(action.token())?;
        tracing::debug!(channel_id = %channel_id, action = action.name(), sub = %claims.sub, "action received");

        match action {
            ActionRequest::ObtenerEstados { reporte_id, .. } => {
                self.obtener_estados(channel_id, &reporte_id).await
            }
            ActionRequest::TrabajadorLlego {
                reporte_id,
                trabajador_id,
                comentarios,
                ..
            } => {
                self.registrar_trabajo(&claims, &reporte_id, &trabajador_id, "llego", comentarios)
                    .await
            }
            ActionRequest::TrabajoTerminado {
                reporte_id,
                trabajador_id,
                comentarios,
                ..
            } => {
                self.registrar_trabajo(
                    &claims,
                    &reporte_id,
                    &trabajador_id,
                    "terminado",
                    comentarios,
                )
                .await
            }
        }
    }

    /// Reads a report's state history and pushes it to the requester.
    async fn obtener_estados(
        &self,
        channel_id: &ChannelId,
        reporte_id: &str,
    ) -> Result<(), GatewayError> {
        if reporte_id.trim().is_empty() {
            return Err(GatewayError::Validation("reporte_id is required".to_string()));
        }
        let estados = self.estados.estados(reporte_id).await?;
        let respuesta = RespuestaEstados {
            reporte_id: reporte_id.to_string(),
            estado_actual: estados.first().cloned(),
            estados,
        };
        let payload = serde_json::to_value(&respuesta)
            .map_err(|err| GatewayError::Internal(format!("response encode: {err}")))?;
        self.gateway
            .send(channel_id, payload)
            .await
            .map_err(|err| GatewayError::Dependency(format!("response delivery: {err}")))
    }

    /// Records a work-state transition after role and identity checks.
    async fn registrar_trabajo(
        &self,
        claims: &Claims,
        reporte_id: &str,
        trabajador_id: &str,
        estado_trabajo: &str,
        comentarios: Option<String>,
    ) -> Result<(), GatewayError> {
        if reporte_id.trim().is_empty() || trabajador_id.trim().is_empty() {
            return Err(GatewayError::Validation(
                "reporte_id and trabajador_id are required".to_string(),
            ));
        }
        if claims.rol != Role::Worker {
            return Err(GatewayError::Authorization(
                "only the worker role may report work-state transitions".to_string(),
            ));
        }
        if claims.sub != trabajador_id {
            return Err(GatewayError::Authorization(
                "trabajador_id does not match the authenticated subject".to_string(),
            ));
        }

        self.trabajos
            .registrar_transicion(TransicionTrabajo {
                reporte_id: reporte_id.to_string(),
                trabajador_id: trabajador_id.to_string(),
                estado_trabajo: estado_trabajo.to_string(),
                timestamp: Utc::now(),
                comentarios,
            })
            .await
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::auth::token::DEFAULT_TOKEN_TTL;
    use crate::domain::ChangeStream;
    use crate::gateway::ChannelHub;
    use crate::registry::MemorySubscriptionStore;
    use crate::store::{EstadoReporte, MemoryStateStore, MemoryWorkStore};

    struct Fixture {
        service: ConnectionService,
        tokens: TokenService,
        registry: SubscriptionRegistry,
        hub: Arc<ChannelHub>,
        trabajos: Arc<MemoryWorkStore>,
        estados: Arc<MemoryStateStore>,
    }

    fn fixture() -> Fixture {
        let tokens = TokenService::new("test-secret");
        let registry = SubscriptionRegistry::new(Arc::new(MemorySubscriptionStore::new()));
        let hub = Arc::new(ChannelHub::new("https://local.test/dev", Duration::from_millis(100)));
        let estados = Arc::new(MemoryStateStore::new("TablaEstados", ChangeStream::new(16)));
        let trabajos = Arc::new(MemoryWorkStore::new());
        let service = ConnectionService::new(
            tokens.clone(),
            registry.clone(),
            Arc::clone(&hub) as Arc<dyn ChannelGateway>,
            Arc::clone(&estados) as Arc<dyn StateStore>,
            Arc::clone(&trabajos) as Arc<dyn WorkStateStore>,
            Duration::from_secs(3600),
        );
        Fixture {
            service,
            tokens,
            registry,
            hub,
            trabajos,
            estados,
        }
    }

    fn issue(tokens: &TokenService, sub: &str, rol: Role) -> String {
        let Ok(token) = tokens.issue(sub, None, rol, DEFAULT_TOKEN_TTL) else {
            panic!("issue failed");
        };
        token
    }

    #[tokio::test]
    async fn connect_registers_with_claims_identity() {
        let fx = fixture();
        let token = issue(&fx.tokens, "u1", Role::Student);

        let Ok(record) = fx
            .service
            .connect(ChannelId::from("c1"), Some(&token), Some("R1"))
            .await
        else {
            panic!("connect failed");
        };
        assert_eq!(record.usuario_id, "u1");
        assert_eq!(record.watch_key, WatchKey::Reporte("R1".to_string()));
    }

    #[tokio::test]
    async fn connect_without_token_creates_no_registry_entry() {
        let fx = fixture();

        let result = fx.service.connect(ChannelId::from("c1"), None, None).await;
        assert!(matches!(result, Err(GatewayError::Authentication)));

        let Ok(entry) = fx.registry.lookup(&ChannelId::from("c1")).await else {
            panic!("lookup failed");
        };
        assert!(entry.is_none());
    }

    #[tokio::test]
    async fn connect_with_invalid_token_is_rejected() {
        let fx = fixture();
        let result = fx
            .service
            .connect(ChannelId::from("c1"), Some("not.a.token"), None)
            .await;
        assert!(matches!(result, Err(GatewayError::Authentication)));
    }

    #[tokio::test]
    async fn connect_defaults_to_wildcard_watch_key() {
        let fx = fixture();
        let token = issue(&fx.tokens, "u1", Role::Student);
        let Ok(record) = fx
            .service
            .connect(ChannelId::from("c1"), Some(&token), None)
            .await
        else {
            panic!("connect failed");
        };
        assert!(record.watch_key.is_all());
    }

    #[tokio::test]
    async fn disconnect_tolerates_absent_entry() {
        let fx = fixture();
        // Never registered; must not panic or error.
        fx.service.disconnect(&ChannelId::from("ghost")).await;
    }

    #[tokio::test]
    async fn obtener_estados_pushes_to_requester_only() {
        let fx = fixture();
        let token = issue(&fx.tokens, "u1", Role::Student);

        let Ok(()) = fx
            .estados
            .registrar_estado(EstadoReporte {
                reporte_id: "R1".to_string(),
                estado: "pendiente".to_string(),
                timestamp: Utc::now(),
                descripcion: None,
            })
            .await
        else {
            panic!("seed failed");
        };

        let channel = ChannelId::from("c1");
        let mut rx = fx.hub.attach(channel.clone()).await;
        let mut other_rx = fx.hub.attach(ChannelId::from("c2")).await;

        let body = format!(
            r#"{{"action":"obtener_estados","token":"{token}","reporte_id":"R1"}}"#
        );
        let Ok(()) = fx.service.handle_action(&channel, &body).await else {
            panic!("action failed");
        };

        let Some(text) = rx.recv().await else {
            panic!("expected a response");
        };
        assert!(text.contains("estado_actual"));
        assert!(text.contains("pendiente"));
        assert!(other_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn action_with_stale_token_is_rejected() {
        let fx = fixture();
        let body = r#"{"action":"obtener_estados","token":"expired.or.bad","reporte_id":"R1"}"#;
        let result = fx.service.handle_action(&ChannelId::from("c1"), body).await;
        assert!(matches!(result, Err(GatewayError::Authentication)));
    }

    #[tokio::test]
    async fn malformed_action_is_a_validation_error() {
        let fx = fixture();
        let result = fx
            .service
            .handle_action(&ChannelId::from("c1"), "{not json")
            .await;
        assert!(matches!(result, Err(GatewayError::Validation(_))));
    }

    #[tokio::test]
    async fn worker_transition_records_for_own_subject() {
        let fx = fixture();
        let token = issue(&fx.tokens, "w1", Role::Worker);
        let body = format!(
            r#"{{"action":"trabajador_llego","token":"{token}","reporte_id":"R1","trabajador_id":"w1"}}"#
        );
        let Ok(()) = fx.service.handle_action(&ChannelId::from("c1"), &body).await else {
            panic!("action failed");
        };

        let transiciones = fx.trabajos.transiciones().await;
        assert_eq!(transiciones.len(), 1);
        assert_eq!(
            transiciones.first().map(|t| t.estado_trabajo.as_str()),
            Some("llego")
        );
    }

    #[tokio::test]
    async fn worker_identity_mismatch_is_rejected_without_mutation() {
        let fx = fixture();
        let token = issue(&fx.tokens, "w1", Role::Worker);
        let body = format!(
            r#"{{"action":"trabajo_terminado","token":"{token}","reporte_id":"R1","trabajador_id":"w2"}}"#
        );
        let result = fx.service.handle_action(&ChannelId::from("c1"), &body).await;
        assert!(matches!(result, Err(GatewayError::Authorization(_))));
        assert!(fx.trabajos.transiciones().await.is_empty());
    }

    #[tokio::test]
    async fn non_worker_role_cannot_report_work_state() {
        let fx = fixture();
        let token = issue(&fx.tokens, "u1", Role::Student);
        let body = format!(
            r#"{{"action":"trabajador_llego","token":"{token}","reporte_id":"R1","trabajador_id":"u1"}}"#
        );
        let result = fx.service.handle_action(&ChannelId::from("c1"), &body).await;
        assert!(matches!(result, Err(GatewayError::Authorization(_))));
        assert!(fx.trabajos.transiciones().await.is_empty());
    }
}
