//! # alerta-gateway
//!
//! Realtime WebSocket notification gateway for incident report status
//! changes. Clients open an authenticated channel watching one report
//! (or all of them); every detected state change fans out to the
//! matching channels, with dead channels pruned from the registry as
//! delivery discovers them.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP, WebSocket)
//!     │
//!     ├── REST Handlers (api/): health, login
//!     ├── WS Handler (ws/): authenticated connect + action loop
//!     │
//!     ├── ConnectionService / FanoutEngine (service/)
//!     ├── TokenService (auth/)
//!     │
//!     ├── SubscriptionRegistry (registry/)
//!     ├── ChannelGateway / ChannelHub (gateway/)
//!     ├── ChangeStream (domain/)
//!     │
//!     └── External entity stores (store/, interfaces only)
//! ```
//!
//! Delivery is at-least-once per fan-out attempt with no cross-event
//! ordering guarantees; the registry is eventually consistent under TTL
//! expiry racing best-effort cleanup.

pub mod api;
pub mod app_state;
pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod gateway;
pub mod registry;
pub mod service;
pub mod store;
pub mod ws;
