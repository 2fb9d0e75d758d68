//! Token issuance endpoint.
//!
//! `POST /auth/login` checks credentials against the user directory and
//! issues a four-hour token on success. A failed check returns the same
//! opaque 401 as every other authentication failure.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::app_state::AppState;
use crate::auth::token::DEFAULT_TOKEN_TTL;
use crate::error::GatewayError;
use crate::store::PerfilUsuario;

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Account email.
    pub email: String,
    /// Account password.
    pub password: String,
}

/// Login response with the issued token.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    /// Compact signed token.
    pub token: String,
    /// Token lifetime in seconds.
    pub expira_en_segundos: u64,
    /// Profile of the authenticated user.
    pub usuario: PerfilUsuario,
}

/// `POST /auth/login` — verify credentials and issue a token.
///
/// # Errors
///
/// Returns [`GatewayError::Validation`] for an empty email or password,
/// the opaque [`GatewayError::Authentication`] when the credentials do
/// not verify, and [`GatewayError::Dependency`] if the directory is
/// unavailable.
pub async fn login_handler(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, GatewayError> {
    let email = request.email.trim().to_lowercase();
    if email.is_empty() || request.password.is_empty() {
        return Err(GatewayError::Validation(
            "email and password are required".to_string(),
        ));
    }

    let perfil = state
        .usuarios
        .verificar_credenciales(&email, &request.password)
        .await?
        .ok_or(GatewayError::Authentication)?;

    let token = state.tokens.issue(
        &perfil.usuario_id,
        Some(&perfil.email),
        perfil.rol,
        DEFAULT_TOKEN_TTL,
    )?;

    tracing::info!(usuario_id = %perfil.usuario_id, "token issued");
    Ok(Json(LoginResponse {
        token,
        expira_en_segundos: DEFAULT_TOKEN_TTL.as_secs(),
        usuario: perfil,
    }))
}

/// Auth routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/auth/login", post(login_handler))
}
