//! Room service: request–response room operations.
//!
//! Handlers in [`crate::api`] stay thin and call into this layer. Durable
//! changes go through the room store; anything that touches live sessions
//! (ending a deleted room, reading history) goes through the
//! [`Coordinator`].

use std::sync::Arc;

use crate::coordinator::Coordinator;
use crate::domain::{AccountId, HistoryLog, Identity, Room, RoomId};
use crate::error::GatewayError;

/// Orchestration layer for room lifecycle operations.
#[derive(Debug, Clone)]
pub struct RoomService {
    coordinator: Arc<Coordinator>,
    public_list_limit: usize,
}

impl RoomService {
    /// Creates a new `RoomService`.
    #[must_use]
    pub fn new(coordinator: Arc<Coordinator>, public_list_limit: usize) -> Self {
        Self {
            coordinator,
            public_list_limit,
        }
    }

    /// Returns a reference to the inner [`Coordinator`].
    #[must_use]
    pub fn coordinator(&self) -> &Arc<Coordinator> {
        &self.coordinator
    }

    /// Creates a room hosted by `host` and initialises its empty history.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] if the room record cannot
    /// be stored.
    pub async fn create_room(
        &self,
        host: Identity,
        name: Option<String>,
        is_public: bool,
    ) -> Result<Room, GatewayError> {
        let room = self
            .coordinator
            .room_store()
            .create(name, host, is_public)
            .await?;

        // history rows are upserted on first write, so a failed init is not fatal
        if let Err(err) = self.coordinator.history().store().init(room.room_id).await {
            tracing::warn!(room_id = %room.room_id, error = %err, "history init failed");
        }

        tracing::info!(
            room_id = %room.room_id,
            account_id = %room.host_id,
            is_public = room.is_public,
            "room created"
        );
        Ok(room)
    }

    /// Fetches a room.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::RoomNotFound`] if the room does not exist.
    pub async fn get_room(&self, room_id: RoomId) -> Result<Room, GatewayError> {
        self.coordinator
            .room_store()
            .find(room_id)
            .await?
            .ok_or(GatewayError::RoomNotFound(room_id))
    }

    /// Adds `account` to a public room's participants (idempotent) and
    /// returns the updated room. Invite-only rooms are entered through
    /// `request-to-join` and host approval instead.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::RoomNotFound`] if the room does not exist.
    /// - [`GatewayError::NotAuthorized`] if the room is invite-only and
    ///   `account` is not already a participant.
    pub async fn join_room(&self, room_id: RoomId, account: &AccountId) -> Result<Room, GatewayError> {
        let room = self.get_room(room_id).await?;
        if room.is_participant(account) {
            return Ok(room);
        }
        if !room.is_public {
            return Err(GatewayError::NotAuthorized(format!(
                "room {room_id} is invite-only; ask the host to join"
            )));
        }

        self.coordinator
            .room_store()
            .add_participant(room_id, account.clone())
            .await?;
        tracing::info!(room_id = %room_id, account_id = %account, "participant added");
        self.get_room(room_id).await
    }

    /// Lists public rooms, newest first, up to the configured page size.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] if the store fails.
    pub async fn list_public(&self) -> Result<Vec<Room>, GatewayError> {
        Ok(self
            .coordinator
            .room_store()
            .list_public(self.public_list_limit, true)
            .await?)
    }

    /// Returns the stored history of a room to one of its participants.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::RoomNotFound`] if the room does not exist.
    /// - [`GatewayError::NotAuthorized`] if `account` is not a participant.
    /// - [`GatewayError::PersistenceError`] if the history cannot be read.
    pub async fn room_history(
        &self,
        room_id: RoomId,
        account: &AccountId,
    ) -> Result<HistoryLog, GatewayError> {
        let room = self.get_room(room_id).await?;
        if !room.is_participant(account) {
            return Err(GatewayError::NotAuthorized(format!(
                "{account} is not a participant of room {room_id}"
            )));
        }
        Ok(self.coordinator.history().snapshot(room_id).await?)
    }

    /// Deletes a room on behalf of its host: removes the record, ends the
    /// live session and deletes the stored history.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::RoomNotFound`] if the room does not exist.
    /// - [`GatewayError::NotAuthorized`] if `account` is not the host.
    /// - [`GatewayError::PersistenceError`] if the record cannot be deleted.
    pub async fn delete_room(&self, room_id: RoomId, account: &AccountId) -> Result<(), GatewayError> {
        let room = self.get_room(room_id).await?;
        if !room.is_host(account) {
            return Err(GatewayError::NotAuthorized(format!(
                "only the host can delete room {room_id}"
            )));
        }

        if !self.coordinator.room_store().delete(room_id).await? {
            return Err(GatewayError::RoomNotFound(room_id));
        }
        let evicted = self.coordinator.close_room(room_id).await;
        self.coordinator.history().delete(room_id).await;

        tracing::info!(room_id = %room_id, evicted, "room deleted");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::coordinator::ApprovalPolicy;
    use crate::persistence::{MemoryHistoryStore, MemoryRoomStore, PersistenceStats};

    fn service() -> RoomService {
        let coordinator = Coordinator::new(
            Arc::new(MemoryRoomStore::new()),
            Arc::new(MemoryHistoryStore::new()),
            ApprovalPolicy::HostOnly,
            Arc::new(PersistenceStats::new()),
        );
        RoomService::new(Arc::new(coordinator), 20)
    }

    fn host() -> Identity {
        Identity::new("h-1", "Hana")
    }

    #[tokio::test]
    async fn create_uses_default_name() {
        let svc = service();
        let Ok(room) = svc.create_room(host(), None, true).await else {
            panic!("create failed");
        };
        assert!(room.name.starts_with("Room-"));
        assert_eq!(room.participants, vec![AccountId::from("h-1")]);
    }

    #[tokio::test]
    async fn join_is_idempotent() {
        let svc = service();
        let Ok(room) = svc.create_room(host(), Some("Board".into()), true).await else {
            panic!("create failed");
        };
        let guest = AccountId::from("u-2");
        let _ = svc.join_room(room.room_id, &guest).await;
        let Ok(joined) = svc.join_room(room.room_id, &guest).await else {
            panic!("join failed");
        };
        assert_eq!(joined.participants.len(), 2);
    }

    #[tokio::test]
    async fn invite_only_room_rejects_open_join() {
        let svc = service();
        let Ok(room) = svc.create_room(host(), None, false).await else {
            panic!("create failed");
        };
        let stranger = AccountId::from("stranger");
        let denied = svc.join_room(room.room_id, &stranger).await;
        assert!(matches!(denied, Err(GatewayError::NotAuthorized(_))));

        let Ok(unchanged) = svc.get_room(room.room_id).await else {
            panic!("get failed");
        };
        assert!(!unchanged.is_participant(&stranger));

        let Ok(rejoined) = svc.join_room(room.room_id, &room.host_id).await else {
            panic!("host rejoin failed");
        };
        assert_eq!(rejoined.participants, vec![room.host_id.clone()]);
    }

    #[tokio::test]
    async fn history_is_participant_only() {
        let svc = service();
        let Ok(room) = svc.create_room(host(), None, true).await else {
            panic!("create failed");
        };
        let stranger = AccountId::from("x");
        let result = svc.room_history(room.room_id, &stranger).await;
        assert!(matches!(result, Err(GatewayError::NotAuthorized(_))));

        let Ok(log) = svc.room_history(room.room_id, &room.host_id).await else {
            panic!("history failed");
        };
        assert!(log.is_empty());
    }

    #[tokio::test]
    async fn delete_is_host_only() {
        let svc = service();
        let Ok(room) = svc.create_room(host(), None, true).await else {
            panic!("create failed");
        };
        let other = AccountId::from("u-2");
        let denied = svc.delete_room(room.room_id, &other).await;
        assert!(matches!(denied, Err(GatewayError::NotAuthorized(_))));

        assert!(svc.delete_room(room.room_id, &room.host_id).await.is_ok());
        let gone = svc.get_room(room.room_id).await;
        assert!(matches!(gone, Err(GatewayError::RoomNotFound(_))));
    }

    #[tokio::test]
    async fn list_public_hides_private_rooms() {
        let svc = service();
        let _ = svc.create_room(host(), Some("open".into()), true).await;
        let _ = svc.create_room(host(), Some("closed".into()), false).await;
        let Ok(listed) = svc.list_public().await else {
            panic!("list failed");
        };
        assert_eq!(listed.len(), 1);
        assert_eq!(listed.first().map(|r| r.name.as_str()), Some("open"));
    }
}
