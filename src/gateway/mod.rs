//! Channel gateway: push delivery to live channels.
//!
//! [`ChannelGateway`] is the transport seam. Delivery failures split
//! into exactly two cases: the channel is gone (the transport reports
//! the endpoint no longer exists) or the failure is transient. The
//! gateway itself has no side effects; deregistering a gone channel is
//! the caller's responsibility.

pub mod hub;

use async_trait::async_trait;

use crate::domain::ChannelId;

pub use hub::ChannelHub;

/// Why a push delivery failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    /// The transport endpoint for the channel no longer exists
    /// (HTTP 410 equivalent). Expected and routine; the caller should
    /// deregister the channel.
    #[error("channel is gone")]
    Gone,

    /// Any other delivery fault. Logged, never retried in-line.
    #[error("transient delivery failure: {0}")]
    Transient(String),
}

/// Pushes JSON messages to a specific live channel.
#[async_trait]
pub trait ChannelGateway: std::fmt::Debug + Send + Sync {
    /// Serializes `payload` and pushes it to `channel_id` within a
    /// bounded deadline.
    ///
    /// # Errors
    ///
    /// Returns [`SendError::Gone`] when the channel endpoint no longer
    /// exists and [`SendError::Transient`] for any other delivery fault.
    async fn send(
        &self,
        channel_id: &ChannelId,
        payload: serde_json::Value,
    ) -> Result<(), SendError>;
}
