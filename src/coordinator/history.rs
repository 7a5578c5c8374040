//! History synchronizer: live fan-out plus best-effort durable writes.
//!
//! Every mutation is broadcast while the room lock is held and, under the
//! same lock, enqueued on the room's writer queue. One writer task per room
//! drains that queue in order, so the durable log sees writes in exactly the
//! order members saw them. A failed write is logged and counted; it never
//! reaches a client and never blocks the live session.
//!
//! A room's writer is retired once its live channel is gone. A retired
//! writer drains what it already holds; a successor spawned for the same
//! room waits for it before applying anything.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError};

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use super::channel::RoomChannel;
use super::registry::ConnectionHandle;
use crate::domain::{Action, ConnectionId, HistoryLog, RoomId, ServerEvent};
use crate::persistence::{HistoryStore, PersistenceStats, StoreError};

#[derive(Debug)]
enum HistoryWrite {
    Append(Action),
    ReplaceAll(Vec<Action>),
    Clear,
    SaveSnapshot(String),
    Delete,
    Flush(oneshot::Sender<()>),
}

impl HistoryWrite {
    const fn name(&self) -> &'static str {
        match self {
            Self::Append(_) => "append",
            Self::ReplaceAll(_) => "replace_all",
            Self::Clear => "clear",
            Self::SaveSnapshot(_) => "save_snapshot",
            Self::Delete => "delete",
            Self::Flush(_) => "flush",
        }
    }
}

#[derive(Debug)]
struct Writer {
    queue: mpsc::UnboundedSender<HistoryWrite>,
    task: JoinHandle<()>,
}

#[derive(Debug, Default)]
struct Writers {
    live: HashMap<RoomId, Writer>,
    draining: HashMap<RoomId, JoinHandle<()>>,
}

/// Keeps room histories in step with what members see.
#[derive(Debug)]
pub struct HistorySynchronizer {
    store: Arc<dyn HistoryStore>,
    stats: Arc<PersistenceStats>,
    writers: std::sync::Mutex<Writers>,
}

impl HistorySynchronizer {
    /// Creates a synchronizer writing to `store` and counting into `stats`.
    #[must_use]
    pub fn new(store: Arc<dyn HistoryStore>, stats: Arc<PersistenceStats>) -> Self {
        Self {
            store,
            stats,
            writers: std::sync::Mutex::new(Writers::default()),
        }
    }

    /// Returns the underlying history store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn HistoryStore> {
        &self.store
    }

    /// Broadcasts a drawing action to every member but `origin` and
    /// appends it to the room history.
    pub async fn append(
        &self,
        channel: &RoomChannel,
        room_id: RoomId,
        origin: ConnectionId,
        action: Action,
    ) -> usize {
        let event = ServerEvent::DrawAction(action.clone());
        channel
            .with_members(room_id, |members| {
                let delivered = members.broadcast(&event, Some(origin));
                self.enqueue(room_id, HistoryWrite::Append(action));
                delivered
            })
            .await
            .unwrap_or(0)
    }

    /// Broadcasts a post-undo history to every member but `origin` and
    /// replaces the stored log with it.
    pub async fn replace_all(
        &self,
        channel: &RoomChannel,
        room_id: RoomId,
        origin: ConnectionId,
        actions: Vec<Action>,
    ) -> usize {
        let event = ServerEvent::UndoAction {
            history: actions.clone(),
        };
        channel
            .with_members(room_id, |members| {
                let delivered = members.broadcast(&event, Some(origin));
                self.enqueue(room_id, HistoryWrite::ReplaceAll(actions));
                delivered
            })
            .await
            .unwrap_or(0)
    }

    /// Broadcasts `clear-board` to every member, the originator included,
    /// and empties the stored log and snapshot.
    pub async fn clear(&self, channel: &RoomChannel, room_id: RoomId) -> usize {
        channel
            .with_members(room_id, |members| {
                let delivered = members.broadcast(&ServerEvent::ClearBoard {}, None);
                self.enqueue(room_id, HistoryWrite::Clear);
                delivered
            })
            .await
            .unwrap_or(0)
    }

    /// Stores a rendered snapshot. Nothing is broadcast. Returns `false`
    /// and stores nothing if the room has no live channel.
    pub async fn save_snapshot(
        &self,
        channel: &RoomChannel,
        room_id: RoomId,
        snapshot: String,
    ) -> bool {
        channel
            .with_members(room_id, |_| {
                self.enqueue(room_id, HistoryWrite::SaveSnapshot(snapshot));
            })
            .await
            .is_some()
    }

    /// Reads the stored history of a room. A room with no stored log yields
    /// an empty one.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be read.
    pub async fn snapshot(&self, room_id: RoomId) -> Result<HistoryLog, StoreError> {
        self.store.read(room_id).await.inspect_err(|_| {
            self.stats.record_read_failure();
        })
    }

    /// Sends the stored history to a fresh joiner as `room-history`.
    ///
    /// A read failure is logged and the joiner simply gets no replay.
    pub async fn replay_to(&self, room_id: RoomId, handle: &ConnectionHandle) -> bool {
        match self.snapshot(room_id).await {
            Ok(log) => handle.send(ServerEvent::RoomHistory(log)),
            Err(err) => {
                tracing::warn!(
                    room_id = %room_id,
                    connection_id = %handle.connection_id(),
                    error = %err,
                    "history replay skipped"
                );
                false
            }
        }
    }

    /// Deletes the stored history, waits for the room's queue to drain and
    /// retires its writer.
    pub async fn delete(&self, room_id: RoomId) {
        let (tx, rx) = oneshot::channel();
        self.enqueue(room_id, HistoryWrite::Delete);
        self.enqueue(room_id, HistoryWrite::Flush(tx));
        self.retire(room_id);
        let _ = rx.await;
    }

    /// Waits until every write queued for `room_id` so far has been applied.
    pub async fn flush(&self, room_id: RoomId) {
        let (tx, rx) = oneshot::channel();
        if self.enqueue(room_id, HistoryWrite::Flush(tx)) {
            // no writer was open; do not keep the one spawned just to flush
            self.retire(room_id);
        }
        let _ = rx.await;
    }

    /// Closes the room's writer queue. Writes already queued are still
    /// applied, and a later write for the room starts a writer that runs
    /// after them. Returns `false` if the room had no open writer.
    pub fn retire(&self, room_id: RoomId) -> bool {
        let mut writers = self.lock_writers();
        writers.draining.retain(|_, task| !task.is_finished());
        let Some(writer) = writers.live.remove(&room_id) else {
            return false;
        };
        drop(writer.queue);
        writers.draining.insert(room_id, writer.task);
        tracing::debug!(room_id = %room_id, "history writer retired");
        true
    }

    /// Number of rooms with an open writer queue.
    #[must_use]
    pub fn writer_count(&self) -> usize {
        self.lock_writers().live.len()
    }

    fn lock_writers(&self) -> std::sync::MutexGuard<'_, Writers> {
        self.writers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queues `write` on the room's writer, starting one if needed.
    /// Returns `true` if a writer had to be started.
    fn enqueue(&self, room_id: RoomId, write: HistoryWrite) -> bool {
        let mut writers = self.lock_writers();
        let write = match writers.live.get(&room_id) {
            Some(writer) => match writer.queue.send(write) {
                Ok(()) => return false,
                // writer task is gone; start a fresh one for this room
                Err(mpsc::error::SendError(write)) => write,
            },
            None => write,
        };
        let predecessor = writers.draining.remove(&room_id);
        let writer = self.spawn_writer(room_id, predecessor);
        let _ = writer.queue.send(write);
        writers.live.insert(room_id, writer);
        true
    }

    fn spawn_writer(&self, room_id: RoomId, predecessor: Option<JoinHandle<()>>) -> Writer {
        let (queue, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_writer(
            room_id,
            Arc::clone(&self.store),
            Arc::clone(&self.stats),
            predecessor,
            rx,
        ));
        Writer { queue, task }
    }
}

async fn run_writer(
    room_id: RoomId,
    store: Arc<dyn HistoryStore>,
    stats: Arc<PersistenceStats>,
    predecessor: Option<JoinHandle<()>>,
    mut rx: mpsc::UnboundedReceiver<HistoryWrite>,
) {
    if let Some(previous) = predecessor {
        // a retired writer for this room may still hold queued writes
        let _ = previous.await;
    }
    tracing::debug!(room_id = %room_id, "history writer started");
    while let Some(write) = rx.recv().await {
        let op = write.name();
        let result = match write {
            HistoryWrite::Flush(done) => {
                let _ = done.send(());
                continue;
            }
            HistoryWrite::Append(action) => {
                stats.record_write();
                store.append(room_id, action).await
            }
            HistoryWrite::ReplaceAll(actions) => {
                stats.record_write();
                store.replace_all(room_id, actions).await
            }
            HistoryWrite::Clear => {
                stats.record_write();
                store.clear(room_id).await
            }
            HistoryWrite::SaveSnapshot(snapshot) => {
                stats.record_write();
                store.save_snapshot(room_id, snapshot).await
            }
            HistoryWrite::Delete => {
                stats.record_write();
                store.delete(room_id).await
            }
        };
        if let Err(err) = result {
            stats.record_write_failure();
            tracing::warn!(
                room_id = %room_id,
                op,
                error = %err,
                "history write failed"
            );
        }
    }
    tracing::debug!(room_id = %room_id, "history writer stopped");
}
