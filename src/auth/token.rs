//! HS256 compact token issuance and verification.
//!
//! Tokens are three base64url (no padding) segments joined by `.`:
//! `header.payload.signature`. The header is always
//! `{"alg":"HS256","typ":"JWT"}`; the payload carries `sub`, optional
//! `email`, `rol`, and `exp` (Unix seconds); the signature is
//! HMAC-SHA256 over `header.payload` under the shared secret.
//!
//! Verification compares the encoded signatures in constant time and
//! collapses every failure mode into [`GatewayError::Authentication`] so
//! the caller cannot distinguish a bad signature from an expired token.

use std::fmt;
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::GatewayError;

type HmacSha256 = Hmac<Sha256>;

/// Built-in development secret, used only when no secret is configured.
/// Unsuitable for production; a warning is logged when it is selected.
const DEFAULT_SECRET: &str = "alerta-utec-123";

/// Default token lifetime: four hours.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(4 * 3600);

/// Caller role carried in token claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Regular report-submitting user.
    Student,
    /// Support staff triaging reports.
    Staff,
    /// Administrator.
    Admin,
    /// Field worker; the only role allowed to report work-state
    /// transitions, and only for its own subject.
    Worker,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Student => "student",
            Self::Staff => "staff",
            Self::Admin => "admin",
            Self::Worker => "worker",
        };
        write!(f, "{s}")
    }
}

/// Verified identity claims extracted from a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject identifier (opaque).
    pub sub: String,
    /// Optional email.
    pub email: Option<String>,
    /// Caller role.
    pub rol: Role,
}

/// Fixed token header.
#[derive(Serialize)]
struct Header {
    alg: &'static str,
    typ: &'static str,
}

/// Wire-format claims payload.
#[derive(Serialize, Deserialize)]
struct Payload {
    sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    rol: Role,
    exp: i64,
}

/// Issues and verifies compact signed tokens.
///
/// Stateless and cheap to clone; holds only the shared secret.
#[derive(Clone)]
pub struct TokenService {
    secret: String,
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenService")
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl TokenService {
    /// Creates a token service with the given secret.
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Creates a token service from an optional configured secret.
    ///
    /// When no secret is configured the built-in development secret is
    /// used and a warning is logged: that fallback is a deployment
    /// hazard, not a supported production mode.
    #[must_use]
    pub fn from_secret(configured: Option<String>) -> Self {
        match configured {
            Some(secret) => Self::new(secret),
            None => {
                tracing::warn!(
                    "TOKEN_SECRET not set; using built-in development secret (unsuitable for production)"
                );
                Self::new(DEFAULT_SECRET)
            }
        }
    }

    /// Issues a signed token for the given subject and role.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Internal`] if serialization or signing
    /// fails; both are unexpected.
    pub fn issue(
        &self,
        sub: &str,
        email: Option<&str>,
        rol: Role,
        ttl: Duration,
    ) -> Result<String, GatewayError> {
        let header = Header {
            alg: "HS256",
            typ: "JWT",
        };
        let payload = Payload {
            sub: sub.to_string(),
            email: email.map(str::to_string),
            rol,
            exp: Utc::now().timestamp().saturating_add(ttl.as_secs() as i64),
        };

        let header_b64 = URL_SAFE_NO_PAD.encode(
            serde_json::to_vec(&header)
                .map_err(|err| GatewayError::Internal(format!("header encode: {err}")))?,
        );
        let payload_b64 = URL_SAFE_NO_PAD.encode(
            serde_json::to_vec(&payload)
                .map_err(|err| GatewayError::Internal(format!("payload encode: {err}")))?,
        );

        let signing_input = format!("{header_b64}.{payload_b64}");
        let signature_b64 = self.sign(&signing_input)?;
        Ok(format!("{signing_input}.{signature_b64}"))
    }

    /// Verifies a token and returns its claims.
    ///
    /// # Errors
    ///
    /// Every failure mode (malformed shape, signature mismatch, expired,
    /// missing required claim) returns [`GatewayError::Authentication`]
    /// with no further detail.
    pub fn verify(&self, token: &str) -> Result<Claims, GatewayError> {
        let mut parts = token.split('.');
        let (Some(header_b64), Some(payload_b64), Some(signature_b64), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(GatewayError::Authentication);
        };

        let signing_input = format!("{header_b64}.{payload_b64}");
        let expected_b64 = self.sign(&signing_input)?;
        if !bool::from(expected_b64.as_bytes().ct_eq(signature_b64.as_bytes())) {
            return Err(GatewayError::Authentication);
        }

        let payload_json = URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|_| GatewayError::Authentication)?;
        let payload: Payload =
            serde_json::from_slice(&payload_json).map_err(|_| GatewayError::Authentication)?;

        if payload.exp <= 0 || Utc::now().timestamp() > payload.exp {
            return Err(GatewayError::Authentication);
        }
        if payload.sub.is_empty() {
            return Err(GatewayError::Authentication);
        }

        Ok(Claims {
            sub: payload.sub,
            email: payload.email,
            rol: payload.rol,
        })
    }

    /// Computes the base64url-encoded HMAC-SHA256 signature over `input`.
    fn sign(&self, input: &str) -> Result<String, GatewayError> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|err| GatewayError::Internal(format!("hmac init: {err}")))?;
        mac.update(input.as_bytes());
        Ok(URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes()))
    }
}
