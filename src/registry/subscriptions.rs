//! Registry operations over the subscription store.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::Role;
use crate::domain::{ChannelId, Subscription, WatchKey};
use crate::error::GatewayError;

use super::SubscriptionStore;

/// Domain-level registry API over a [`SubscriptionStore`].
///
/// Cheap to clone; all state lives behind the store handle.
#[derive(Debug, Clone)]
pub struct SubscriptionRegistry {
    store: Arc<dyn SubscriptionStore>,
}

impl SubscriptionRegistry {
    /// Creates a registry over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn SubscriptionStore>) -> Self {
        Self { store }
    }

    /// Registers a channel, overwriting any prior registration for the
    /// same channel id.
    ///
    /// Identity fields must come from verified token claims; the
    /// registry never sees raw client input.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Dependency`] if the store write fails.
    pub async fn register(
        &self,
        channel_id: ChannelId,
        watch_key: WatchKey,
        usuario_id: &str,
        rol: Role,
        ttl: Duration,
    ) -> Result<Subscription, GatewayError> {
        let record = Subscription::new(channel_id, watch_key, usuario_id, rol, ttl);
        self.store.put(record.clone()).await?;
        tracing::debug!(
            channel_id = %record.channel_id,
            watch_key = %record.watch_key,
            usuario_id = %record.usuario_id,
            "channel registered"
        );
        Ok(record)
    }

    /// Returns all live subscriptions for one watch key.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Dependency`] if the store query fails.
    pub async fn resolve(&self, key: &WatchKey) -> Result<Vec<Subscription>, GatewayError> {
        self.store.by_watch_key(key).await
    }

    /// Computes the effective fan-out set for a report change.
    ///
    /// Union of the report's specific subscribers and the wildcard
    /// subscribers, deduplicated by channel id, excluding `origin` (the
    /// channel whose own action produced the change, which already got a
    /// direct response).
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Dependency`] if either store query fails.
    pub async fn resolve_all(
        &self,
        reporte_id: &str,
        origin: Option<&ChannelId>,
    ) -> Result<Vec<Subscription>, GatewayError> {
        let specific = self
            .resolve(&WatchKey::Reporte(reporte_id.to_string()))
            .await?;
        let wildcard = self.resolve(&WatchKey::All).await?;

        let mut seen: HashSet<ChannelId> = HashSet::new();
        let mut targets = Vec::with_capacity(specific.len() + wildcard.len());
        for record in specific.into_iter().chain(wildcard) {
            if origin == Some(&record.channel_id) {
                continue;
            }
            if seen.insert(record.channel_id.clone()) {
                targets.push(record);
            }
        }
        Ok(targets)
    }

    /// Removes a channel's registration. Best-effort: a record that is
    /// already absent (expired or deleted elsewhere) is treated as
    /// removed.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Dependency`] if the store delete fails.
    pub async fn deregister(&self, channel_id: &ChannelId) -> Result<(), GatewayError> {
        self.store.delete(channel_id).await?;
        tracing::debug!(channel_id = %channel_id, "channel deregistered");
        Ok(())
    }

    /// Fetches one channel's registration, if live.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Dependency`] if the store read fails.
    pub async fn lookup(
        &self,
        channel_id: &ChannelId,
    ) -> Result<Option<Subscription>, GatewayError> {
        self.store.get(channel_id).await
    }
}
