//! Service layer: request–response room operations.
//!
//! [`RoomService`] creates, lists, joins and deletes rooms through the room
//! store, and reaches into the [`crate::coordinator::Coordinator`] whenever a
//! change must be reflected in live sessions.

pub mod room_service;

pub use room_service::RoomService;
