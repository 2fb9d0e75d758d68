//! Subscription registry: durable channel → watch-key mapping with expiry.
//!
//! [`SubscriptionStore`] is the key-value store seam; the production
//! deployment backs it with an external table, tests and the local
//! server use [`MemorySubscriptionStore`]. [`SubscriptionRegistry`]
//! layers the domain operations (register, resolve, fan-out set,
//! deregister) on top of the store.

pub mod memory;
pub mod subscriptions;

use async_trait::async_trait;

use crate::domain::{ChannelId, Subscription, WatchKey};
use crate::error::GatewayError;

pub use memory::MemorySubscriptionStore;
pub use subscriptions::SubscriptionRegistry;

/// Key-value store interface for subscription records.
///
/// Implementations must provide atomic per-key writes: a reader sees
/// either the old full record or the new full record, never a mix. The
/// store purges expired records independently of explicit deletes, so a
/// lookup may legitimately miss a record an instant before its expiry
/// fires.
#[async_trait]
pub trait SubscriptionStore: std::fmt::Debug + Send + Sync {
    /// Upserts a record keyed by its channel id.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Dependency`] if the backing store is
    /// unavailable.
    async fn put(&self, record: Subscription) -> Result<(), GatewayError>;

    /// Fetches the record for a channel, if present and not expired.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Dependency`] if the backing store is
    /// unavailable.
    async fn get(&self, channel_id: &ChannelId) -> Result<Option<Subscription>, GatewayError>;

    /// Deletes the record for a channel. Absence is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Dependency`] if the backing store is
    /// unavailable.
    async fn delete(&self, channel_id: &ChannelId) -> Result<(), GatewayError>;

    /// Returns all live records whose watch key equals `key`, via an
    /// index on the watch key rather than a full scan.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Dependency`] if the backing store is
    /// unavailable.
    async fn by_watch_key(&self, key: &WatchKey) -> Result<Vec<Subscription>, GatewayError>;
}
