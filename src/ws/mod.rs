//! WebSocket layer: connect handshake, per-connection loop, and typed
//! action messages.
//!
//! The endpoint at `/ws` authenticates the connect request before the
//! protocol upgrade, registers the channel, then runs a loop that
//! forwards hub-pushed notifications out and dispatches inbound client
//! actions.

pub mod connection;
pub mod handler;
pub mod messages;
