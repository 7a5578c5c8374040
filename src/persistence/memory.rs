//! In-process stores backed by `RwLock<HashMap<..>>`.
//!
//! Used when persistence is disabled and throughout the test suite. State
//! lives as long as the store value; nothing survives a restart.

use std::collections::HashMap;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use tokio::sync::RwLock;

use super::{HistoryStore, RoomStore, StoreError};
use crate::domain::{AccountId, Action, HistoryLog, Identity, Room, RoomId};

/// Room store kept in memory.
#[derive(Debug, Default)]
pub struct MemoryRoomStore {
    rooms: RwLock<HashMap<RoomId, Room>>,
}

impl MemoryRoomStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a prepared room record, replacing any room with the same id.
    pub async fn insert(&self, room: Room) {
        self.rooms.write().await.insert(room.room_id, room);
    }

    /// Returns the number of stored rooms.
    pub async fn len(&self) -> usize {
        self.rooms.read().await.len()
    }

    /// Returns `true` if no rooms are stored.
    pub async fn is_empty(&self) -> bool {
        self.rooms.read().await.is_empty()
    }
}

impl RoomStore for MemoryRoomStore {
    fn create(
        &self,
        name: Option<String>,
        host: Identity,
        is_public: bool,
    ) -> BoxFuture<'_, Result<Room, StoreError>> {
        async move {
            let room = Room::new(name, &host, is_public);
            self.rooms.write().await.insert(room.room_id, room.clone());
            Ok(room)
        }
        .boxed()
    }

    fn find(&self, room_id: RoomId) -> BoxFuture<'_, Result<Option<Room>, StoreError>> {
        async move { Ok(self.rooms.read().await.get(&room_id).cloned()) }.boxed()
    }

    fn add_participant(
        &self,
        room_id: RoomId,
        account: AccountId,
    ) -> BoxFuture<'_, Result<(), StoreError>> {
        async move {
            let mut rooms = self.rooms.write().await;
            let room = rooms
                .get_mut(&room_id)
                .ok_or(StoreError::RoomNotFound(room_id))?;
            room.add_participant(account);
            Ok(())
        }
        .boxed()
    }

    fn delete(&self, room_id: RoomId) -> BoxFuture<'_, Result<bool, StoreError>> {
        async move { Ok(self.rooms.write().await.remove(&room_id).is_some()) }.boxed()
    }

    fn list_public(
        &self,
        limit: usize,
        newest_first: bool,
    ) -> BoxFuture<'_, Result<Vec<Room>, StoreError>> {
        async move {
            let rooms = self.rooms.read().await;
            let mut public: Vec<Room> = rooms.values().filter(|r| r.is_public).cloned().collect();
            public.sort_by_key(|r| r.created_at);
            if newest_first {
                public.reverse();
            }
            public.truncate(limit);
            Ok(public)
        }
        .boxed()
    }
}

/// History store kept in memory.
#[derive(Debug, Default)]
pub struct MemoryHistoryStore {
    logs: RwLock<HashMap<RoomId, HistoryLog>>,
}

impl MemoryHistoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if a log exists for the room.
    pub async fn contains(&self, room_id: RoomId) -> bool {
        self.logs.read().await.contains_key(&room_id)
    }
}

impl HistoryStore for MemoryHistoryStore {
    fn init(&self, room_id: RoomId) -> BoxFuture<'_, Result<(), StoreError>> {
        async move {
            self.logs.write().await.entry(room_id).or_default();
            Ok(())
        }
        .boxed()
    }

    fn append(&self, room_id: RoomId, action: Action) -> BoxFuture<'_, Result<(), StoreError>> {
        async move {
            self.logs
                .write()
                .await
                .entry(room_id)
                .or_default()
                .actions
                .push(action);
            Ok(())
        }
        .boxed()
    }

    fn replace_all(
        &self,
        room_id: RoomId,
        actions: Vec<Action>,
    ) -> BoxFuture<'_, Result<(), StoreError>> {
        async move {
            self.logs.write().await.entry(room_id).or_default().actions = actions;
            Ok(())
        }
        .boxed()
    }

    fn clear(&self, room_id: RoomId) -> BoxFuture<'_, Result<(), StoreError>> {
        async move {
            self.logs.write().await.insert(room_id, HistoryLog::default());
            Ok(())
        }
        .boxed()
    }

    fn save_snapshot(
        &self,
        room_id: RoomId,
        snapshot: String,
    ) -> BoxFuture<'_, Result<(), StoreError>> {
        async move {
            self.logs.write().await.entry(room_id).or_default().snapshot = Some(snapshot);
            Ok(())
        }
        .boxed()
    }

    fn read(&self, room_id: RoomId) -> BoxFuture<'_, Result<HistoryLog, StoreError>> {
        async move {
            Ok(self
                .logs
                .read()
                .await
                .get(&room_id)
                .cloned()
                .unwrap_or_default())
        }
        .boxed()
    }

    fn delete(&self, room_id: RoomId) -> BoxFuture<'_, Result<(), StoreError>> {
        async move {
            self.logs.write().await.remove(&room_id);
            Ok(())
        }
        .boxed()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn host() -> Identity {
        Identity::new("h-1", "Hana")
    }

    #[tokio::test]
    async fn create_then_find() {
        let store = MemoryRoomStore::new();
        let Ok(room) = store.create(Some("Sketch".to_string()), host(), true).await else {
            panic!("create failed");
        };
        let Ok(Some(found)) = store.find(room.room_id).await else {
            panic!("room missing");
        };
        assert_eq!(found, room);
    }

    #[tokio::test]
    async fn add_participant_to_missing_room_fails() {
        let store = MemoryRoomStore::new();
        let result = store
            .add_participant(RoomId::new(), AccountId::from("u-1"))
            .await;
        assert!(matches!(result, Err(StoreError::RoomNotFound(_))));
    }

    #[tokio::test]
    async fn list_public_skips_private_and_limits() {
        let store = MemoryRoomStore::new();
        for i in 0..3 {
            let _ = store.create(Some(format!("open-{i}")), host(), true).await;
        }
        let _ = store.create(Some("secret".to_string()), host(), false).await;

        let Ok(listed) = store.list_public(2, true).await else {
            panic!("list failed");
        };
        assert_eq!(listed.len(), 2);
        assert!(listed.iter().all(|r| r.is_public));
    }

    #[tokio::test]
    async fn append_replace_and_clear() {
        let store = MemoryHistoryStore::new();
        let room = RoomId::new();
        let a1 = Action::new(serde_json::json!({"n": 1}));
        let a2 = Action::new(serde_json::json!({"n": 2}));

        let _ = store.append(room, a1.clone()).await;
        let _ = store.append(room, a2).await;
        let _ = store.save_snapshot(room, "data:image/png;base64,AAA".to_string()).await;
        let _ = store.replace_all(room, vec![a1.clone()]).await;

        let Ok(log) = store.read(room).await else {
            panic!("read failed");
        };
        assert_eq!(log.actions, vec![a1]);
        assert!(log.snapshot.is_some());

        let _ = store.clear(room).await;
        let Ok(log) = store.read(room).await else {
            panic!("read failed");
        };
        assert!(log.is_empty());
    }

    #[tokio::test]
    async fn read_of_unknown_room_is_empty() {
        let store = MemoryHistoryStore::new();
        let Ok(log) = store.read(RoomId::new()).await else {
            panic!("read failed");
        };
        assert!(log.is_empty());
    }
}
