//! Persistence layer: room and history stores.
//!
//! The coordinator only sees the object-safe [`RoomStore`] and
//! [`HistoryStore`] traits. Two implementations are provided: PostgreSQL
//! via `sqlx` ([`postgres`]) and an in-process map ([`memory`]) used when
//! persistence is disabled and in tests.

pub mod memory;
pub mod models;
pub mod postgres;
pub mod stats;

use std::fmt;

use futures_util::future::BoxFuture;

use crate::domain::{AccountId, Action, HistoryLog, Identity, Room, RoomId};

pub use memory::{MemoryHistoryStore, MemoryRoomStore};
pub use postgres::{PostgresHistoryStore, PostgresRoomStore};
pub use stats::{PersistenceStats, PersistenceStatsSnapshot};

/// Failure reported by a store.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// The room has no record in the store.
    #[error("room not found: {0}")]
    RoomNotFound(RoomId),

    /// The backend failed (connection, query, encoding).
    #[error("store backend failure: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        Self::Backend(err.to_string())
    }
}

/// Durable room records with participant lists and host identity.
pub trait RoomStore: Send + Sync + fmt::Debug {
    /// Creates and stores a new room hosted by `host`.
    fn create(
        &self,
        name: Option<String>,
        host: Identity,
        is_public: bool,
    ) -> BoxFuture<'_, Result<Room, StoreError>>;

    /// Looks a room up by id; `Ok(None)` when it does not exist.
    fn find(&self, room_id: RoomId) -> BoxFuture<'_, Result<Option<Room>, StoreError>>;

    /// Adds `account` to the participant list. Idempotent; fails with
    /// [`StoreError::RoomNotFound`] when the room does not exist.
    fn add_participant(
        &self,
        room_id: RoomId,
        account: AccountId,
    ) -> BoxFuture<'_, Result<(), StoreError>>;

    /// Deletes a room. Returns `false` when there was nothing to delete.
    fn delete(&self, room_id: RoomId) -> BoxFuture<'_, Result<bool, StoreError>>;

    /// Lists public rooms by creation time.
    fn list_public(
        &self,
        limit: usize,
        newest_first: bool,
    ) -> BoxFuture<'_, Result<Vec<Room>, StoreError>>;
}

/// Durable per-room action log plus optional snapshot.
///
/// Writers must be serialized per room by the caller; implementations do
/// not order concurrent writes for the same room.
pub trait HistoryStore: Send + Sync + fmt::Debug {
    /// Creates an empty log for a new room (no-op if one exists).
    fn init(&self, room_id: RoomId) -> BoxFuture<'_, Result<(), StoreError>>;

    /// Appends one action, creating the log if needed.
    fn append(&self, room_id: RoomId, action: Action) -> BoxFuture<'_, Result<(), StoreError>>;

    /// Overwrites the action list, keeping the snapshot.
    fn replace_all(
        &self,
        room_id: RoomId,
        actions: Vec<Action>,
    ) -> BoxFuture<'_, Result<(), StoreError>>;

    /// Empties the log and drops the snapshot.
    fn clear(&self, room_id: RoomId) -> BoxFuture<'_, Result<(), StoreError>>;

    /// Stores a pre-rendered snapshot, keeping the action list.
    fn save_snapshot(
        &self,
        room_id: RoomId,
        snapshot: String,
    ) -> BoxFuture<'_, Result<(), StoreError>>;

    /// Reads the log; a room without a log reads as empty.
    fn read(&self, room_id: RoomId) -> BoxFuture<'_, Result<HistoryLog, StoreError>>;

    /// Deletes the log.
    fn delete(&self, room_id: RoomId) -> BoxFuture<'_, Result<(), StoreError>>;
}
