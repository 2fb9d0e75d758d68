//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::auth::TokenService;
use crate::gateway::ChannelHub;
use crate::service::ConnectionService;
use crate::store::UserDirectory;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Channel lifecycle orchestration.
    pub connections: Arc<ConnectionService>,
    /// In-process push transport.
    pub hub: Arc<ChannelHub>,
    /// Token issuance for the login endpoint.
    pub tokens: TokenService,
    /// Credential verification for the login endpoint.
    pub usuarios: Arc<dyn UserDirectory>,
}
