//! REST surface: health check and token issuance.
//!
//! The realtime core is the product; the REST layer is deliberately
//! small. Report CRUD lives in external services and is not exposed
//! here.

pub mod auth;
pub mod system;

use axum::Router;

use crate::app_state::AppState;

/// Builds the REST router.
pub fn build_router() -> Router<AppState> {
    Router::new().merge(system::routes()).merge(auth::routes())
}
