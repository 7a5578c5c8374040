//! Database row models for rooms and whiteboard histories.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::StoreError;
use crate::domain::{AccountId, Action, HistoryLog, Room, RoomId};

/// Column tuple selected from the `rooms` table.
pub(crate) type RoomColumns = (
    Uuid,
    String,
    String,
    String,
    Vec<String>,
    bool,
    DateTime<Utc>,
    DateTime<Utc>,
);

/// A stored row from the `rooms` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomRow {
    /// Primary key.
    pub room_id: Uuid,
    /// Display name.
    pub name: String,
    /// Host account id.
    pub host_id: String,
    /// Host display name.
    pub host_name: String,
    /// Participant account ids, host included.
    pub participants: Vec<String>,
    /// Public listing flag.
    pub is_public: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl From<RoomColumns> for RoomRow {
    fn from(
        (room_id, name, host_id, host_name, participants, is_public, created_at, updated_at): RoomColumns,
    ) -> Self {
        Self {
            room_id,
            name,
            host_id,
            host_name,
            participants,
            is_public,
            created_at,
            updated_at,
        }
    }
}

impl From<RoomRow> for Room {
    fn from(row: RoomRow) -> Self {
        Self {
            room_id: RoomId::from_uuid(row.room_id),
            name: row.name,
            host_id: AccountId::new(row.host_id),
            host_name: row.host_name,
            participants: row.participants.into_iter().map(AccountId::new).collect(),
            is_public: row.is_public,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// A stored row from the `whiteboard_data` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRow {
    /// Owning room.
    pub room_id: Uuid,
    /// JSONB array of actions.
    pub history: serde_json::Value,
    /// Optional snapshot blob.
    pub snapshot: Option<String>,
    /// Last write timestamp.
    pub updated_at: DateTime<Utc>,
}

impl HistoryRow {
    /// Converts the row into a [`HistoryLog`].
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] if the `history` column does not
    /// hold a JSON array.
    pub fn into_log(self) -> Result<HistoryLog, StoreError> {
        let serde_json::Value::Array(items) = self.history else {
            return Err(StoreError::Backend(format!(
                "history for room {} is not an array",
                self.room_id
            )));
        };
        Ok(HistoryLog {
            actions: items.into_iter().map(Action::new).collect(),
            snapshot: self.snapshot,
        })
    }
}

/// Encodes actions as the JSONB array stored in `whiteboard_data.history`.
pub(crate) fn actions_to_json(actions: Vec<Action>) -> serde_json::Value {
    serde_json::Value::Array(actions.into_iter().map(Action::into_payload).collect())
}
