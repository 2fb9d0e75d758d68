//! Authentication layer: compact signed tokens and role claims.
//!
//! Every realtime connection and every inbound channel action must carry
//! a token issued by [`TokenService`]. Verification is self-contained:
//! no calls leave the process.

pub mod token;

pub use token::{Claims, Role, TokenService};
