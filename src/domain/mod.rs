//! Domain layer: core types and the change-event stream.
//!
//! This module contains the gateway-side domain model: channel identity,
//! watch keys, subscription records, change events sourced from the
//! storage layer, outbound notification messages, and the broadcast
//! stream carrying change events to the fan-out engine.

pub mod change_event;
pub mod change_stream;
pub mod channel_id;
pub mod notification;
pub mod subscription;
pub mod watch_key;

pub use change_event::{ChangeEvent, MutationKind};
pub use change_stream::ChangeStream;
pub use channel_id::ChannelId;
pub use notification::Notificacion;
pub use subscription::Subscription;
pub use watch_key::WatchKey;
