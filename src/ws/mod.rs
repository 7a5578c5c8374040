//! WebSocket layer: credential-checked upgrade, frame codec and the
//! per-connection loop.
//!
//! The endpoint at `/ws` binds one authenticated identity to one socket
//! session for its whole lifetime; every event that session sends is
//! handled by [`crate::coordinator::Coordinator`] under that identity.

pub mod connection;
pub mod handler;
pub mod messages;
