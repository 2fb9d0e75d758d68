//! In-process push transport.
//!
//! [`ChannelHub`] keeps one bounded [`mpsc`] sender per attached
//! channel; the WebSocket connection task holds the receiving half and
//! forwards every message to its socket. A channel whose receiver has
//! been dropped, or that was never attached, reports [`SendError::Gone`]
//! exactly like a remote transport answering 410.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{RwLock, mpsc};

use super::{ChannelGateway, SendError};
use crate::domain::ChannelId;

/// Buffer size for each per-channel outbound queue.
const CHANNEL_BUFFER: usize = 64;

/// In-process [`ChannelGateway`] backed by per-channel mpsc queues.
#[derive(Debug)]
pub struct ChannelHub {
    /// Endpoint label for the configured transport coordinates; carried
    /// in delivery logs.
    endpoint: String,
    send_deadline: Duration,
    channels: RwLock<HashMap<ChannelId, mpsc::Sender<String>>>,
}

impl ChannelHub {
    /// Creates a hub for the given endpoint label and per-send deadline.
    #[must_use]
    pub fn new(endpoint: impl Into<String>, send_deadline: Duration) -> Self {
        Self {
            endpoint: endpoint.into(),
            send_deadline,
            channels: RwLock::new(HashMap::new()),
        }
    }

    /// Attaches a channel, returning the receiving half of its outbound
    /// queue. Re-attaching the same id replaces the previous queue.
    pub async fn attach(&self, channel_id: ChannelId) -> mpsc::Receiver<String> {
        let (tx, rx) = mpsc::channel(CHANNEL_BUFFER);
        self.channels.write().await.insert(channel_id, tx);
        rx
    }

    /// Detaches a channel. Subsequent sends to it report gone.
    pub async fn detach(&self, channel_id: &ChannelId) {
        self.channels.write().await.remove(channel_id);
    }

    /// Returns the number of attached channels.
    pub async fn len(&self) -> usize {
        self.channels.read().await.len()
    }

    /// Returns `true` if no channel is attached.
    pub async fn is_empty(&self) -> bool {
        self.channels.read().await.is_empty()
    }

    /// Returns the endpoint label.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ChannelGateway for ChannelHub {
    async fn send(
        &self,
        channel_id: &ChannelId,
        payload: serde_json::Value,
    ) -> Result<(), SendError> {
        let sender = self.channels.read().await.get(channel_id).cloned();
        let Some(sender) = sender else {
            return Err(SendError::Gone);
        };

        match tokio::time::timeout(self.send_deadline, sender.send(payload.to_string())).await {
            Ok(Ok(())) => Ok(()),
            // Receiver dropped: the connection task is gone.
            Ok(Err(_)) => Err(SendError::Gone),
            Err(_) => Err(SendError::Transient(format!(
                "send deadline elapsed for {channel_id} via {}",
                self.endpoint
            ))),
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use serde_json::json;

    fn hub() -> ChannelHub {
        ChannelHub::new("https://local.test/dev", Duration::from_millis(100))
    }

    #[tokio::test]
    async fn send_reaches_attached_channel() {
        let hub = hub();
        let id = ChannelId::from("c1");
        let mut rx = hub.attach(id.clone()).await;

        let result = hub.send(&id, json!({"tipo": "actualizacion_estado"})).await;
        assert!(result.is_ok());

        let Some(text) = rx.recv().await else {
            panic!("expected a message");
        };
        assert!(text.contains("actualizacion_estado"));
    }

    #[tokio::test]
    async fn send_to_unknown_channel_is_gone() {
        let hub = hub();
        let result = hub.send(&ChannelId::from("nobody"), json!({})).await;
        assert_eq!(result, Err(SendError::Gone));
    }

    #[tokio::test]
    async fn send_after_receiver_dropped_is_gone() {
        let hub = hub();
        let id = ChannelId::from("c1");
        let rx = hub.attach(id.clone()).await;
        drop(rx);

        let result = hub.send(&id, json!({})).await;
        assert_eq!(result, Err(SendError::Gone));
    }

    #[tokio::test]
    async fn full_queue_times_out_as_transient() {
        let hub = hub();
        let id = ChannelId::from("c1");
        // Receiver kept alive but never drained.
        let _rx = hub.attach(id.clone()).await;

        for _ in 0..CHANNEL_BUFFER {
            let Ok(()) = hub.send(&id, json!({})).await else {
                panic!("buffered send failed");
            };
        }
        let result = hub.send(&id, json!({})).await;
        assert!(matches!(result, Err(SendError::Transient(_))));
    }

    #[tokio::test]
    async fn detach_makes_channel_gone() {
        let hub = hub();
        let id = ChannelId::from("c1");
        let _rx = hub.attach(id.clone()).await;
        assert_eq!(hub.len().await, 1);

        hub.detach(&id).await;
        assert!(hub.is_empty().await);
        assert_eq!(hub.send(&id, json!({})).await, Err(SendError::Gone));
    }
}
