//! Room DTOs for create, get, list, join and history operations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::{HistoryLog, Room, RoomSummary};

/// Request body for `POST /rooms`.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CreateRoomRequest {
    /// Optional display name; blank or missing yields `Room-xxxxxx`.
    #[serde(default)]
    pub name: Option<String>,
    /// Whether the room is listed publicly. Defaults to `true`.
    #[serde(default = "default_public", alias = "isPublic")]
    pub is_public: bool,
}

fn default_public() -> bool {
    true
}

/// Full room record returned by create, get and join.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RoomResponse {
    /// Room identifier.
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
    /// Last participant change.
    pub updated_at: DateTime<Utc>,
}

impl From<Room> for RoomResponse {
    fn from(room: Room) -> Self {
        Self {
            room_id: *room.room_id.as_uuid(),
            name: room.name,
            host_id: room.host_id.to_string(),
            host_name: room.host_name,
            participants: room
                .participants
                .into_iter()
                .map(|a| a.to_string())
                .collect(),
            is_public: room.is_public,
            created_at: room.created_at,
            updated_at: room.updated_at,
        }
    }
}

/// One entry of the public room listing.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RoomSummaryDto {
    /// Room identifier.
    pub room_id: Uuid,
    /// Display name.
    pub name: String,
    /// Host account id.
    pub host_id: String,
    /// Host display name.
    pub host_name: String,
    /// Number of participants.
    pub participant_count: usize,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<RoomSummary> for RoomSummaryDto {
    fn from(summary: RoomSummary) -> Self {
        Self {
            room_id: *summary.room_id.as_uuid(),
            name: summary.name,
            host_id: summary.host_id.to_string(),
            host_name: summary.host_name,
            participant_count: summary.participant_count,
            created_at: summary.created_at,
        }
    }
}

/// Response body for `GET /rooms`.
#[derive(Debug, Serialize, ToSchema)]
pub struct RoomListResponse {
    /// Public rooms, newest first.
    pub data: Vec<RoomSummaryDto>,
}

/// Response body for `GET /rooms/{room_id}/history`.
#[derive(Debug, Serialize, ToSchema)]
pub struct HistoryResponse {
    /// Recorded drawing actions, oldest first.
    #[schema(value_type = Vec<Object>)]
    pub history: Vec<serde_json::Value>,
    /// Optional pre-rendered snapshot.
    pub snapshot: Option<String>,
}

impl From<HistoryLog> for HistoryResponse {
    fn from(log: HistoryLog) -> Self {
        Self {
            history: log
                .actions
                .into_iter()
                .map(crate::domain::Action::into_payload)
                .collect(),
            snapshot: log.snapshot,
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::Identity;

    #[test]
    fn create_request_defaults_to_public() {
        let Ok(req) = serde_json::from_str::<CreateRoomRequest>("{}") else {
            panic!("parse failed");
        };
        assert!(req.is_public);
        assert!(req.name.is_none());

        let Ok(req) = serde_json::from_str::<CreateRoomRequest>(r#"{"isPublic": false}"#) else {
            panic!("parse failed");
        };
        assert!(!req.is_public);
    }

    #[test]
    fn room_response_flattens_ids() {
        let room = Room::new(Some("Retro".into()), &Identity::new("h", "Hana"), true);
        let id = *room.room_id.as_uuid();
        let dto = RoomResponse::from(room);
        assert_eq!(dto.room_id, id);
        assert_eq!(dto.participants, vec!["h".to_string()]);
    }
}
