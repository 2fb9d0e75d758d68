//! Axum WebSocket upgrade handler.
//!
//! The connect request carries `token` (required) and `reporte_id`
//! (optional watch key) as query parameters. Authentication runs before
//! the protocol upgrade: a missing or invalid token yields a 401 and no
//! registry entry is ever created.

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use super::connection::run_connection;
use crate::app_state::AppState;

/// Query parameters of the connect request.
#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    /// Compact bearer token; required.
    pub token: Option<String>,
    /// Watch key; defaults to the wildcard `ALL`.
    pub reporte_id: Option<String>,
}

/// `GET /ws` — authenticate, then upgrade to WebSocket.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<ConnectQuery>,
    State(state): State<AppState>,
) -> Response {
    let claims = match state.connections.authenticate(query.token.as_deref()) {
        Ok(claims) => claims,
        Err(err) => {
            tracing::info!("ws connect rejected: authentication failed");
            return err.into_response();
        }
    };

    let reporte_id = query.reporte_id;
    ws.on_upgrade(move |socket| run_connection(socket, state, claims, reporte_id))
        .into_response()
}
