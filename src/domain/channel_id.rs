//! Type-safe channel identifier.
//!
//! [`ChannelId`] wraps the opaque string the transport layer assigns to
//! one live push connection. Generated ids use a UUID v4; transports
//! with their own identifier scheme construct the wrapper from a string.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Unique identifier for one live push channel.
///
/// Opaque and unique per connection. Used as the primary key in the
/// subscription registry and as the delivery address for the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(String);

impl ChannelId {
    /// Creates a new random `ChannelId` (UUID v4).
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ChannelId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ChannelId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for ChannelId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}
