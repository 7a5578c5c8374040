//! Durable room record and its lightweight summary.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{AccountId, Identity, RoomId};

/// A collaboration room as held by the room store.
///
/// The host is always part of `participants`; [`Room::new`] seeds the list
/// with the host and [`Room::add_participant`] never removes anyone.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Room {
    /// Unique room identifier (immutable after creation).
    pub room_id: RoomId,
    /// Display name.
    pub name: String,
    /// Account that created the room.
    pub host_id: AccountId,
    /// Display name of the host at creation time.
    pub host_name: String,
    /// Accounts holding a durable join grant, host included.
    pub participants: Vec<AccountId>,
    /// Whether the room shows up in the public listing.
    pub is_public: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Timestamp of the last participant change.
    pub updated_at: DateTime<Utc>,
}

impl Room {
    /// Builds a fresh room hosted by `host`.
    ///
    /// A blank or missing name falls back to `Room-` followed by the first
    /// six characters of the generated id.
    #[must_use]
    pub fn new(name: Option<String>, host: &Identity, is_public: bool) -> Self {
        let room_id = RoomId::new();
        let name = match name.map(|n| n.trim().to_string()) {
            Some(n) if !n.is_empty() => n,
            _ => default_room_name(room_id),
        };
        let now = Utc::now();
        Self {
            room_id,
            name,
            host_id: host.account_id.clone(),
            host_name: host.display_name.clone(),
            participants: vec![host.account_id.clone()],
            is_public,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns `true` if `account` is the room host.
    #[must_use]
    pub fn is_host(&self, account: &AccountId) -> bool {
        &self.host_id == account
    }

    /// Returns `true` if `account` holds a durable grant (host included).
    #[must_use]
    pub fn is_participant(&self, account: &AccountId) -> bool {
        self.is_host(account) || self.participants.contains(account)
    }

    /// Adds `account` to the participant list. Returns `false` if it was
    /// already present.
    pub fn add_participant(&mut self, account: AccountId) -> bool {
        if self.participants.contains(&account) {
            return false;
        }
        self.participants.push(account);
        self.updated_at = Utc::now();
        true
    }
}

/// Name given to rooms created without one.
#[must_use]
pub fn default_room_name(room_id: RoomId) -> String {
    format!("Room-{}", room_id.short())
}

/// Lightweight summary of a room for list endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct RoomSummary {
    /// Room identifier.
    pub room_id: RoomId,
    /// Display name.
    pub name: String,
    /// Host account.
    pub host_id: AccountId,
    /// Host display name.
    pub host_name: String,
    /// Number of durable participants.
    pub participant_count: usize,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<&Room> for RoomSummary {
    fn from(room: &Room) -> Self {
        Self {
            room_id: room.room_id,
            name: room.name.clone(),
            host_id: room.host_id.clone(),
            host_name: room.host_name.clone(),
            participant_count: room.participants.len(),
            created_at: room.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host() -> Identity {
        Identity::new("host-1", "Hana")
    }

    #[test]
    fn host_is_always_a_participant() {
        let room = Room::new(Some("Design review".to_string()), &host(), true);
        assert!(room.is_host(&AccountId::from("host-1")));
        assert!(room.is_participant(&AccountId::from("host-1")));
        assert_eq!(room.participants.len(), 1);
    }

    #[test]
    fn blank_name_gets_generated_default() {
        let room = Room::new(Some("   ".to_string()), &host(), false);
        assert!(room.name.starts_with("Room-"));
        assert_eq!(room.name.len(), "Room-".len() + 6);
    }

    #[test]
    fn add_participant_is_idempotent() {
        let mut room = Room::new(None, &host(), true);
        assert!(room.add_participant(AccountId::from("u-2")));
        assert!(!room.add_participant(AccountId::from("u-2")));
        assert_eq!(room.participants.len(), 2);
    }

    #[test]
    fn summary_counts_participants() {
        let mut room = Room::new(None, &host(), true);
        room.add_participant(AccountId::from("u-2"));
        let summary = RoomSummary::from(&room);
        assert_eq!(summary.participant_count, 2);
        assert_eq!(summary.host_name, "Hana");
    }
}
