//! Service layer: connection lifecycle and change-event fan-out.
//!
//! [`ConnectionService`] owns the per-channel lifecycle (authenticate,
//! register, serve actions, tear down); [`FanoutEngine`] consumes change
//! events and delivers notifications to every matching channel.

pub mod connection;
pub mod fanout;

pub use connection::ConnectionService;
pub use fanout::{FanoutEngine, FanoutReport};
