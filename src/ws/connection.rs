//! Per-connection WebSocket loop.
//!
//! Runs after a successful authenticated upgrade. The connection task
//! attaches its channel to the hub, registers the subscription, then
//! forwards hub-pushed messages to the socket while dispatching inbound
//! client actions. Teardown detaches the hub entry and deregisters the
//! subscription; both tolerate already-absent state.

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};

use crate::app_state::AppState;
use crate::auth::Claims;
use crate::domain::ChannelId;
use crate::error::GatewayError;
use crate::ws::messages::ErrorMensaje;

/// Runs the read/write loop for one authenticated WebSocket connection.
pub async fn run_connection(
    mut socket: WebSocket,
    state: AppState,
    claims: Claims,
    reporte_id: Option<String>,
) {
    let channel_id = ChannelId::new();
    let mut outbound = state.hub.attach(channel_id.clone()).await;

    // A registration failure must reach the client as a sanitized error
    // frame before the close; a silent drop would be indistinguishable
    // from a network fault.
    if let Err(reply) = register_or_reject(&state, &channel_id, &claims, reporte_id.as_deref()).await
    {
        let _ = socket.send(Message::text(reply)).await;
        let _ = socket.close().await;
        return;
    }

    let (mut ws_tx, mut ws_rx) = socket.split();

    loop {
        tokio::select! {
            // Incoming message from the client.
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if let Err(err) = state.connections.handle_action(&channel_id, &text).await {
                            let reply = error_payload(&err);
                            if ws_tx.send(Message::text(reply)).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    _ => {}
                }
            }
            // Message pushed through the hub (notification or direct response).
            pushed = outbound.recv() => {
                match pushed {
                    Some(text) => {
                        if ws_tx.send(Message::text(text)).await.is_err() {
                            break;
                        }
                    }
                    // Hub entry replaced or detached elsewhere.
                    None => break,
                }
            }
        }
    }

    state.hub.detach(&channel_id).await;
    state.connections.disconnect(&channel_id).await;
    tracing::debug!(channel_id = %channel_id, "ws connection closed");
}

/// Registers the channel, or detaches it and returns the error frame to
/// send before closing.
async fn register_or_reject(
    state: &AppState,
    channel_id: &ChannelId,
    claims: &Claims,
    reporte_id: Option<&str>,
) -> Result<(), String> {
    match state
        .connections
        .register_channel(channel_id.clone(), claims, reporte_id)
        .await
    {
        Ok(_) => Ok(()),
        Err(err) => {
            tracing::error!(channel_id = %channel_id, error = %err, "registration failed");
            state.hub.detach(channel_id).await;
            Err(error_payload(&err))
        }
    }
}

/// Serializes a sanitized error for delivery over the channel.
fn error_payload(err: &GatewayError) -> String {
    let mensaje = ErrorMensaje {
        error: err.public_message(),
        codigo: err.status_code().as_u16(),
    };
    serde_json::to_string(&mensaje)
        .unwrap_or_else(|_| r#"{"error":"internal server error","codigo":500}"#.to_string())
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::auth::{Role, TokenService};
    use crate::domain::{ChangeStream, Subscription, WatchKey};
    use crate::error::GatewayError;
    use crate::gateway::{ChannelGateway, ChannelHub};
    use crate::registry::{SubscriptionRegistry, SubscriptionStore};
    use crate::service::ConnectionService;
    use crate::store::{MemoryStateStore, MemoryUserDirectory, MemoryWorkStore, StateStore,
                       UserDirectory, WorkStateStore};
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::time::Duration;

    /// Registry store whose writes always fail.
    #[derive(Debug)]
    struct DownStore;

    #[async_trait]
    impl SubscriptionStore for DownStore {
        async fn put(&self, _: Subscription) -> Result<(), GatewayError> {
            Err(GatewayError::Dependency("table unavailable".to_string()))
        }
        async fn get(&self, _: &ChannelId) -> Result<Option<Subscription>, GatewayError> {
            Err(GatewayError::Dependency("table unavailable".to_string()))
        }
        async fn delete(&self, _: &ChannelId) -> Result<(), GatewayError> {
            Err(GatewayError::Dependency("table unavailable".to_string()))
        }
        async fn by_watch_key(&self, _: &WatchKey) -> Result<Vec<Subscription>, GatewayError> {
            Err(GatewayError::Dependency("table unavailable".to_string()))
        }
    }

    fn state_with_broken_registry() -> AppState {
        let tokens = TokenService::new("test-secret");
        let registry = SubscriptionRegistry::new(Arc::new(DownStore));
        let hub = Arc::new(ChannelHub::new(
            "https://local.test/dev",
            Duration::from_millis(100),
        ));
        let estados = Arc::new(MemoryStateStore::new("TablaEstados", ChangeStream::new(16)));
        let trabajos = Arc::new(MemoryWorkStore::new());
        let connections = Arc::new(ConnectionService::new(
            tokens.clone(),
            registry,
            Arc::clone(&hub) as Arc<dyn ChannelGateway>,
            Arc::clone(&estados) as Arc<dyn StateStore>,
            Arc::clone(&trabajos) as Arc<dyn WorkStateStore>,
            Duration::from_secs(3600),
        ));
        AppState {
            connections,
            hub,
            tokens,
            usuarios: Arc::new(MemoryUserDirectory::new()) as Arc<dyn UserDirectory>,
        }
    }

    #[tokio::test]
    async fn registration_failure_yields_error_frame_and_detaches() {
        let state = state_with_broken_registry();
        let claims = Claims {
            sub: "u1".to_string(),
            email: None,
            rol: Role::Student,
        };

        let channel_id = ChannelId::from("c1");
        let _rx = state.hub.attach(channel_id.clone()).await;

        let Err(reply) = register_or_reject(&state, &channel_id, &claims, Some("R1")).await
        else {
            panic!("expected registration to fail");
        };
        // The client gets the sanitized frame, not the store detail.
        assert!(reply.contains("internal server error"));
        assert!(reply.contains("500"));
        assert!(!reply.contains("table unavailable"));
        // The hub entry is gone; nothing can be pushed to the dead channel.
        assert!(state.hub.is_empty().await);
    }

    #[test]
    fn error_payload_is_sanitized_json() {
        let err = GatewayError::Dependency("secret table name leaked".to_string());
        let payload = error_payload(&err);
        assert!(payload.contains("internal server error"));
        assert!(!payload.contains("secret table name"));
        assert!(payload.contains("500"));
    }

    #[test]
    fn authorization_error_payload_keeps_detail() {
        let err = GatewayError::Authorization("role mismatch".to_string());
        let payload = error_payload(&err);
        assert!(payload.contains("role mismatch"));
        assert!(payload.contains("403"));
    }
}
