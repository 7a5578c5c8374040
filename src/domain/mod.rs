//! Domain layer: identifiers, room records, history and socket events.
//!
//! Everything here is plain data. The coordination logic that mutates
//! membership and history lives in [`crate::coordinator`]; durable storage
//! of rooms and histories lives behind the traits in
//! [`crate::persistence`].

pub mod events;
pub mod history;
pub mod identity;
pub mod ids;
pub mod room;

pub use events::{ClientEvent, JoinDecision, MemberPresence, ServerEvent};
pub use history::{Action, HistoryLog};
pub use identity::Identity;
pub use ids::{AccountId, ConnectionId, RoomId};
pub use room::{Room, RoomSummary};
