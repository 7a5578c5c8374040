//! PostgreSQL implementation of the room and history stores.

use chrono::{DateTime, Utc};
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use sqlx::PgPool;
use uuid::Uuid;

use super::models::{HistoryRow, RoomColumns, RoomRow, actions_to_json};
use super::{HistoryStore, RoomStore, StoreError};
use crate::domain::{AccountId, Action, HistoryLog, Identity, Room, RoomId};

const ROOM_COLUMNS: &str =
    "room_id, name, host_id, host_name, participants, is_public, created_at, updated_at";

/// Runs the embedded schema migrations.
///
/// # Errors
///
/// Returns [`StoreError::Backend`] if a migration fails.
pub async fn migrate(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))
}

/// PostgreSQL-backed room store using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresRoomStore {
    pool: PgPool,
}

impl PostgresRoomStore {
    /// Creates a room store over the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert(&self, room: Room) -> Result<Room, StoreError> {
        let participants: Vec<String> = room
            .participants
            .iter()
            .map(|a| a.as_str().to_string())
            .collect();
        sqlx::query(
            "INSERT INTO rooms (room_id, name, host_id, host_name, participants, is_public, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(Uuid::from(room.room_id))
        .bind(&room.name)
        .bind(room.host_id.as_str())
        .bind(&room.host_name)
        .bind(&participants)
        .bind(room.is_public)
        .bind(room.created_at)
        .bind(room.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(room)
    }

    async fn select_one(&self, room_id: RoomId) -> Result<Option<Room>, StoreError> {
        let sql = format!("SELECT {ROOM_COLUMNS} FROM rooms WHERE room_id = $1");
        let row = sqlx::query_as::<_, RoomColumns>(&sql)
            .bind(Uuid::from(room_id))
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|columns| Room::from(RoomRow::from(columns))))
    }

    async fn append_participant(
        &self,
        room_id: RoomId,
        account: AccountId,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE rooms SET participants = CASE WHEN $2 = ANY(participants) THEN participants \
             ELSE array_append(participants, $2) END, updated_at = now() WHERE room_id = $1",
        )
        .bind(Uuid::from(room_id))
        .bind(account.as_str())
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::RoomNotFound(room_id));
        }
        Ok(())
    }

    async fn remove(&self, room_id: RoomId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM rooms WHERE room_id = $1")
            .bind(Uuid::from(room_id))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn select_public(&self, limit: usize, newest_first: bool) -> Result<Vec<Room>, StoreError> {
        let order = if newest_first { "DESC" } else { "ASC" };
        let sql = format!(
            "SELECT {ROOM_COLUMNS} FROM rooms WHERE is_public ORDER BY created_at {order} LIMIT $1"
        );
        let rows = sqlx::query_as::<_, RoomColumns>(&sql)
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|columns| Room::from(RoomRow::from(columns)))
            .collect())
    }
}

impl RoomStore for PostgresRoomStore {
    fn create(
        &self,
        name: Option<String>,
        host: Identity,
        is_public: bool,
    ) -> BoxFuture<'_, Result<Room, StoreError>> {
        let room = Room::new(name, &host, is_public);
        self.insert(room).boxed()
    }

    fn find(&self, room_id: RoomId) -> BoxFuture<'_, Result<Option<Room>, StoreError>> {
        self.select_one(room_id).boxed()
    }

    fn add_participant(
        &self,
        room_id: RoomId,
        account: AccountId,
    ) -> BoxFuture<'_, Result<(), StoreError>> {
        self.append_participant(room_id, account).boxed()
    }

    fn delete(&self, room_id: RoomId) -> BoxFuture<'_, Result<bool, StoreError>> {
        self.remove(room_id).boxed()
    }

    fn list_public(
        &self,
        limit: usize,
        newest_first: bool,
    ) -> BoxFuture<'_, Result<Vec<Room>, StoreError>> {
        self.select_public(limit, newest_first).boxed()
    }
}

/// PostgreSQL-backed history store over the `whiteboard_data` table.
#[derive(Debug, Clone)]
pub struct PostgresHistoryStore {
    pool: PgPool,
}

impl PostgresHistoryStore {
    /// Creates a history store over the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn execute(&self, sql: &'static str, room_id: RoomId) -> Result<(), StoreError> {
        sqlx::query(sql)
            .bind(Uuid::from(room_id))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn execute_with(
        &self,
        sql: &'static str,
        room_id: RoomId,
        value: serde_json::Value,
    ) -> Result<(), StoreError> {
        sqlx::query(sql)
            .bind(Uuid::from(room_id))
            .bind(value)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn upsert_snapshot(&self, room_id: RoomId, snapshot: String) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO whiteboard_data (room_id, history, snapshot) VALUES ($1, '[]'::jsonb, $2) \
             ON CONFLICT (room_id) DO UPDATE SET snapshot = EXCLUDED.snapshot, updated_at = now()",
        )
        .bind(Uuid::from(room_id))
        .bind(snapshot)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn select(&self, room_id: RoomId) -> Result<HistoryLog, StoreError> {
        let row = sqlx::query_as::<_, (Uuid, serde_json::Value, Option<String>, DateTime<Utc>)>(
            "SELECT room_id, history, snapshot, updated_at FROM whiteboard_data WHERE room_id = $1",
        )
        .bind(Uuid::from(room_id))
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some((room_id, history, snapshot, updated_at)) => HistoryRow {
                room_id,
                history,
                snapshot,
                updated_at,
            }
            .into_log(),
            None => Ok(HistoryLog::default()),
        }
    }
}

impl HistoryStore for PostgresHistoryStore {
    fn init(&self, room_id: RoomId) -> BoxFuture<'_, Result<(), StoreError>> {
        self.execute(
            "INSERT INTO whiteboard_data (room_id, history, snapshot) VALUES ($1, '[]'::jsonb, NULL) \
             ON CONFLICT (room_id) DO NOTHING",
            room_id,
        )
        .boxed()
    }

    fn append(&self, room_id: RoomId, action: Action) -> BoxFuture<'_, Result<(), StoreError>> {
        self.execute_with(
            "INSERT INTO whiteboard_data (room_id, history) VALUES ($1, jsonb_build_array($2::jsonb)) \
             ON CONFLICT (room_id) DO UPDATE \
             SET history = whiteboard_data.history || jsonb_build_array($2::jsonb), updated_at = now()",
            room_id,
            action.into_payload(),
        )
        .boxed()
    }

    fn replace_all(
        &self,
        room_id: RoomId,
        actions: Vec<Action>,
    ) -> BoxFuture<'_, Result<(), StoreError>> {
        self.execute_with(
            "INSERT INTO whiteboard_data (room_id, history) VALUES ($1, $2) \
             ON CONFLICT (room_id) DO UPDATE SET history = EXCLUDED.history, updated_at = now()",
            room_id,
            actions_to_json(actions),
        )
        .boxed()
    }

    fn clear(&self, room_id: RoomId) -> BoxFuture<'_, Result<(), StoreError>> {
        self.execute(
            "INSERT INTO whiteboard_data (room_id, history, snapshot) VALUES ($1, '[]'::jsonb, NULL) \
             ON CONFLICT (room_id) DO UPDATE SET history = '[]'::jsonb, snapshot = NULL, updated_at = now()",
            room_id,
        )
        .boxed()
    }

    fn save_snapshot(
        &self,
        room_id: RoomId,
        snapshot: String,
    ) -> BoxFuture<'_, Result<(), StoreError>> {
        self.upsert_snapshot(room_id, snapshot).boxed()
    }

    fn read(&self, room_id: RoomId) -> BoxFuture<'_, Result<HistoryLog, StoreError>> {
        self.select(room_id).boxed()
    }

    fn delete(&self, room_id: RoomId) -> BoxFuture<'_, Result<(), StoreError>> {
        self.execute("DELETE FROM whiteboard_data WHERE room_id = $1", room_id)
            .boxed()
    }
}
