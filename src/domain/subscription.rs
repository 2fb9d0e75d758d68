//! Subscription record: the persisted representation of a live channel.
//!
//! The channel itself is ephemeral and owned by the transport; the
//! registry persists one [`Subscription`] per channel. Identity fields
//! come from verified token claims, never from client-supplied values.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::channel_id::ChannelId;
use super::watch_key::WatchKey;
use crate::auth::Role;

/// One registered channel subscription.
///
/// Lifecycle: created on authenticated connect, deleted on clean
/// disconnect, lazily purged after `expires_at`, and deleted out-of-band
/// when a delivery attempt discovers the channel is gone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    /// Channel this record represents; registry primary key.
    pub channel_id: ChannelId,
    /// What the channel observes.
    pub watch_key: WatchKey,
    /// Subject identifier from the verified token.
    pub usuario_id: String,
    /// Role from the verified token.
    pub rol: Role,
    /// When the subscription was established.
    pub created_at: DateTime<Utc>,
    /// Absolute expiry; the store may purge the record any time after.
    pub expires_at: DateTime<Utc>,
}

impl Subscription {
    /// Creates a subscription expiring `ttl` from now.
    #[must_use]
    pub fn new(
        channel_id: ChannelId,
        watch_key: WatchKey,
        usuario_id: &str,
        rol: Role,
        ttl: Duration,
    ) -> Self {
        let now = Utc::now();
        let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::hours(1));
        Self {
            channel_id,
            watch_key,
            usuario_id: usuario_id.to_string(),
            rol,
            created_at: now,
            expires_at: now + ttl,
        }
    }

    /// Returns `true` once the time-to-live window has elapsed.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}
