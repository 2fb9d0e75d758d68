//! Gateway configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`). Push-endpoint coordinates are
//! validated at startup; an unresolved template such as
//! `${WebSocketApi.Ref}` is a fatal configuration error, never silently
//! replaced by a hard-coded identifier.

use std::net::SocketAddr;
use std::time::Duration;

use crate::error::GatewayError;

/// Top-level gateway configuration.
///
/// Loaded once at startup via [`GatewayConfig::from_env`].
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Socket address to bind the HTTP server to (e.g. `0.0.0.0:3000`).
    pub listen_addr: SocketAddr,

    /// Shared token-signing secret. `None` means the insecure built-in
    /// development secret will be used; deploying without `TOKEN_SECRET`
    /// is a hazard and is logged as such.
    pub token_secret: Option<String>,

    /// Entity-store table holding channel subscriptions.
    pub tabla_conexiones: String,

    /// Entity-store table holding report state history.
    pub tabla_estados: String,

    /// Push-transport API identifier.
    pub websocket_api_id: String,

    /// Push-transport region.
    pub region: String,

    /// Push-transport deployment stage.
    pub stage: String,

    /// Time-to-live for channel subscriptions, in seconds. Bounds the
    /// lifetime of orphaned entries when an explicit disconnect is missed.
    pub channel_ttl_secs: u64,

    /// Capacity of the change-stream broadcast channel.
    pub change_stream_capacity: usize,

    /// Deadline for a single push delivery, in milliseconds.
    pub send_deadline_ms: u64,
}

impl GatewayConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to sensible defaults when a variable is not set.
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] if `LISTEN_ADDR` cannot be parsed
    /// as a [`SocketAddr`] or if `WEBSOCKET_API_ID` holds an unresolved
    /// template value.
    pub fn from_env() -> Result<Self, GatewayError> {
        dotenvy::dotenv().ok();

        let listen_addr: SocketAddr = std::env::var("LISTEN_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:3000".to_string())
            .parse()
            .map_err(|err| GatewayError::Config(format!("invalid LISTEN_ADDR: {err}")))?;

        let token_secret = std::env::var("TOKEN_SECRET").ok().filter(|s| !s.is_empty());

        let tabla_conexiones =
            std::env::var("TABLA_CONEXIONES").unwrap_or_else(|_| "TablaConexiones".to_string());
        let tabla_estados =
            std::env::var("TABLA_ESTADOS").unwrap_or_else(|_| "TablaEstados".to_string());

        let websocket_api_id =
            std::env::var("WEBSOCKET_API_ID").unwrap_or_else(|_| "local".to_string());
        validate_api_id(&websocket_api_id)?;

        let region = std::env::var("REGION").unwrap_or_else(|_| "us-east-1".to_string());
        let stage = std::env::var("STAGE").unwrap_or_else(|_| "dev".to_string());

        let channel_ttl_secs = parse_env("CHANNEL_TTL_SECS", 3600);
        let change_stream_capacity = parse_env("CHANGE_STREAM_CAPACITY", 10_000);
        let send_deadline_ms = parse_env("SEND_DEADLINE_MS", 5_000);

        Ok(Self {
            listen_addr,
            token_secret,
            tabla_conexiones,
            tabla_estados,
            websocket_api_id,
            region,
            stage,
            channel_ttl_secs,
            change_stream_capacity,
            send_deadline_ms,
        })
    }

    /// Returns the push-transport endpoint for the configured coordinates.
    #[must_use]
    pub fn push_endpoint(&self) -> String {
        format!(
            "https://{}.execute-api.{}.amazonaws.com/{}",
            self.websocket_api_id, self.region, self.stage
        )
    }

    /// Returns the channel subscription time-to-live.
    #[must_use]
    pub const fn channel_ttl(&self) -> Duration {
        Duration::from_secs(self.channel_ttl_secs)
    }

    /// Returns the per-delivery send deadline.
    #[must_use]
    pub const fn send_deadline(&self) -> Duration {
        Duration::from_millis(self.send_deadline_ms)
    }
}

/// Rejects push-endpoint identifiers that are unresolved deployment
/// templates (e.g. `${WebSocketApi}` or a raw CloudFormation `Ref`).
fn validate_api_id(value: &str) -> Result<(), GatewayError> {
    if value.is_empty() || value.contains("${") || value.contains("Ref") {
        return Err(GatewayError::Config(format!(
            "WEBSOCKET_API_ID is unresolved: {value:?}"
        )));
    }
    Ok(())
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn templated_api_id_is_fatal() {
        assert!(validate_api_id("${WebSocketApi}").is_err());
        assert!(validate_api_id("Ref: WebSocketApi").is_err());
        assert!(validate_api_id("").is_err());
    }

    #[test]
    fn resolved_api_id_is_accepted() {
        assert!(validate_api_id("vwomh5is13").is_ok());
        assert!(validate_api_id("local").is_ok());
    }
}
