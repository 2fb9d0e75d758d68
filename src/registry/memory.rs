//! In-memory subscription store with a watch-key index.
//!
//! Mirrors the semantics of the external table: atomic per-key upserts,
//! a secondary index on the watch key, and TTL-based purging that runs
//! out-of-band rather than at delete time. Expired records are filtered
//! from every read and physically removed opportunistically on writes.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::SubscriptionStore;
use crate::domain::{ChannelId, Subscription, WatchKey};
use crate::error::GatewayError;

#[derive(Debug, Default)]
struct Inner {
    records: HashMap<ChannelId, Subscription>,
    index: HashMap<WatchKey, HashSet<ChannelId>>,
}

impl Inner {
    fn unindex(&mut self, channel_id: &ChannelId, key: &WatchKey) {
        if let Some(bucket) = self.index.get_mut(key) {
            bucket.remove(channel_id);
            if bucket.is_empty() {
                self.index.remove(key);
            }
        }
    }

    fn remove(&mut self, channel_id: &ChannelId) -> Option<Subscription> {
        let record = self.records.remove(channel_id)?;
        let key = record.watch_key.clone();
        self.unindex(channel_id, &key);
        Some(record)
    }

    fn purge_expired(&mut self) -> usize {
        let now = Utc::now();
        let dead: Vec<ChannelId> = self
            .records
            .values()
            .filter(|r| r.is_expired(now))
            .map(|r| r.channel_id.clone())
            .collect();
        let count = dead.len();
        for channel_id in dead {
            self.remove(&channel_id);
        }
        count
    }
}

/// In-memory [`SubscriptionStore`] backed by a `RwLock<HashMap>` with a
/// `watch_key → channel_id` secondary index.
#[derive(Debug, Default)]
pub struct MemorySubscriptionStore {
    inner: RwLock<Inner>,
}

impl MemorySubscriptionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Physically removes expired records, returning how many were purged.
    ///
    /// Reads already filter expired records; this only reclaims memory.
    pub async fn purge_expired(&self) -> usize {
        self.inner.write().await.purge_expired()
    }

    /// Returns the number of stored records, expired ones included.
    pub async fn len(&self) -> usize {
        self.inner.read().await.records.len()
    }

    /// Returns `true` if the store holds no records.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.records.is_empty()
    }
}

#[async_trait]
impl SubscriptionStore for MemorySubscriptionStore {
    async fn put(&self, record: Subscription) -> Result<(), GatewayError> {
        let mut inner = self.inner.write().await;
        let channel_id = record.channel_id.clone();
        // Re-registration may change the watch key; drop the old index entry.
        if let Some(previous) = inner.records.get(&channel_id) {
            let old_key = previous.watch_key.clone();
            if old_key != record.watch_key {
                inner.unindex(&channel_id, &old_key);
            }
        }
        inner
            .index
            .entry(record.watch_key.clone())
            .or_default()
            .insert(channel_id.clone());
        inner.records.insert(channel_id, record);
        Ok(())
    }

    async fn get(&self, channel_id: &ChannelId) -> Result<Option<Subscription>, GatewayError> {
        let inner = self.inner.read().await;
        let now = Utc::now();
        Ok(inner
            .records
            .get(channel_id)
            .filter(|r| !r.is_expired(now))
            .cloned())
    }

    async fn delete(&self, channel_id: &ChannelId) -> Result<(), GatewayError> {
        let mut inner = self.inner.write().await;
        inner.remove(channel_id);
        Ok(())
    }

    async fn by_watch_key(&self, key: &WatchKey) -> Result<Vec<Subscription>, GatewayError> {
        let inner = self.inner.read().await;
        let now = Utc::now();
        let Some(bucket) = inner.index.get(key) else {
            return Ok(Vec::new());
        };
        Ok(bucket
            .iter()
            .filter_map(|channel_id| inner.records.get(channel_id))
            .filter(|r| !r.is_expired(now))
            .cloned()
            .collect())
    }
}
