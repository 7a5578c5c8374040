//! Room channel: live membership and fan-out for each room.
//!
//! Each room with at least one live connection owns a
//! `tokio::sync::Mutex<RoomMembers>`. Holding that lock serializes every
//! mutation and broadcast for the room, which is what gives all members the
//! same event order. Operations on different rooms never contend beyond the
//! brief outer map lookup.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use super::registry::ConnectionHandle;
use crate::domain::{AccountId, ConnectionId, Identity, MemberPresence, RoomId, ServerEvent};

/// Live connections of one room.
#[derive(Debug, Default)]
pub struct RoomMembers {
    connections: Vec<ConnectionHandle>,
    closed: bool,
}

impl RoomMembers {
    /// Number of member connections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Returns `true` if no connection is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Returns `true` if the connection is a member.
    #[must_use]
    pub fn contains(&self, connection_id: ConnectionId) -> bool {
        self.connections
            .iter()
            .any(|h| h.connection_id() == connection_id)
    }

    /// Returns `true` if any connection of `account` is a member.
    #[must_use]
    pub fn has_account(&self, account: &AccountId) -> bool {
        self.connections.iter().any(|h| h.account_id() == account)
    }

    /// Iterates over member connections in join order.
    pub fn handles(&self) -> impl Iterator<Item = &ConnectionHandle> {
        self.connections.iter()
    }

    /// One presence entry per identity, using its earliest connection.
    #[must_use]
    pub fn presence_list(&self) -> Vec<MemberPresence> {
        let mut seen = HashSet::new();
        self.connections
            .iter()
            .filter(|h| seen.insert(h.account_id().clone()))
            .map(ConnectionHandle::presence)
            .collect()
    }

    /// Distinct identities present, in join order.
    #[must_use]
    pub fn identities(&self) -> Vec<Identity> {
        let mut seen = HashSet::new();
        self.connections
            .iter()
            .filter(|h| seen.insert(h.account_id().clone()))
            .map(|h| h.identity().clone())
            .collect()
    }

    /// Queues `event` for every member except `exclude`. Returns how many
    /// connections accepted it.
    pub fn broadcast(&self, event: &ServerEvent, exclude: Option<ConnectionId>) -> usize {
        self.connections
            .iter()
            .filter(|h| Some(h.connection_id()) != exclude)
            .filter(|h| h.send(event.clone()))
            .count()
    }

    fn remove(&mut self, connection_id: ConnectionId) -> Option<ConnectionHandle> {
        let index = self
            .connections
            .iter()
            .position(|h| h.connection_id() == connection_id)?;
        Some(self.connections.remove(index))
    }
}

/// Result of [`RoomChannel::join`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// The connection was added to the room.
    Joined,
    /// The connection was already a member; only the member list was resent.
    AlreadyMember,
}

type RoomSlot = Arc<Mutex<RoomMembers>>;

/// Set of live rooms and their members.
#[derive(Debug, Default)]
pub struct RoomChannel {
    rooms: RwLock<HashMap<RoomId, RoomSlot>>,
}

impl RoomChannel {
    /// Creates an empty channel set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    async fn slot(&self, room_id: RoomId) -> RoomSlot {
        if let Some(slot) = self.rooms.read().await.get(&room_id) {
            return Arc::clone(slot);
        }
        let mut rooms = self.rooms.write().await;
        Arc::clone(rooms.entry(room_id).or_default())
    }

    async fn existing(&self, room_id: RoomId) -> Option<RoomSlot> {
        self.rooms.read().await.get(&room_id).map(Arc::clone)
    }

    async fn drop_slot(&self, room_id: RoomId, slot: &RoomSlot) {
        let mut rooms = self.rooms.write().await;
        if let Some(current) = rooms.get(&room_id)
            && Arc::ptr_eq(current, slot)
        {
            rooms.remove(&room_id);
        }
    }

    /// Adds a connection to the room.
    ///
    /// The joiner always receives `room-participants`. Other members receive
    /// `member-joined` only when the joiner's identity was not already
    /// present through another connection. Joining twice is a no-op apart
    /// from resending the member list.
    pub async fn join(&self, room_id: RoomId, handle: &ConnectionHandle) -> JoinOutcome {
        loop {
            let slot = self.slot(room_id).await;
            let mut members = slot.lock().await;
            if members.closed {
                // the slot is being torn down; a fresh one replaces it shortly
                drop(members);
                tokio::task::yield_now().await;
                continue;
            }

            if members.contains(handle.connection_id()) {
                handle.send(ServerEvent::RoomParticipants(members.presence_list()));
                return JoinOutcome::AlreadyMember;
            }

            let identity_present = members.has_account(handle.account_id());
            members.connections.push(handle.clone());
            if !identity_present {
                members.broadcast(
                    &ServerEvent::MemberJoined(handle.presence()),
                    Some(handle.connection_id()),
                );
            }
            handle.send(ServerEvent::RoomParticipants(members.presence_list()));
            tracing::debug!(
                room_id = %room_id,
                connection_id = %handle.connection_id(),
                members = members.len(),
                "connection joined room channel"
            );
            return JoinOutcome::Joined;
        }
    }

    /// Removes a connection from the room.
    ///
    /// `member-left` is broadcast only when the identity's last connection
    /// leaves. A room whose last member leaves is dropped from the table.
    /// Returns `false` if the connection was not a member.
    pub async fn leave(&self, room_id: RoomId, connection_id: ConnectionId) -> bool {
        let Some(slot) = self.existing(room_id).await else {
            return false;
        };
        let mut members = slot.lock().await;
        let Some(handle) = members.remove(connection_id) else {
            return false;
        };

        if !members.has_account(handle.account_id()) {
            members.broadcast(
                &ServerEvent::MemberLeft {
                    user_id: handle.account_id().clone(),
                    socket_id: connection_id,
                },
                None,
            );
        }
        tracing::debug!(
            room_id = %room_id,
            connection_id = %connection_id,
            members = members.len(),
            "connection left room channel"
        );

        if members.is_empty() {
            members.closed = true;
            drop(members);
            self.drop_slot(room_id, &slot).await;
        }
        true
    }

    /// Queues `event` for every member except `exclude`.
    pub async fn broadcast(
        &self,
        room_id: RoomId,
        event: ServerEvent,
        exclude: Option<ConnectionId>,
    ) -> usize {
        self.with_members(room_id, |members| members.broadcast(&event, exclude))
            .await
            .unwrap_or(0)
    }

    /// Runs `f` while holding the room lock. Returns `None` if the room has
    /// no live channel.
    pub async fn with_members<R>(
        &self,
        room_id: RoomId,
        f: impl FnOnce(&RoomMembers) -> R,
    ) -> Option<R> {
        let slot = self.existing(room_id).await?;
        let members = slot.lock().await;
        if members.closed {
            return None;
        }
        Some(f(&members))
    }

    /// Distinct identities currently present in the room.
    pub async fn members(&self, room_id: RoomId) -> Vec<Identity> {
        self.with_members(room_id, RoomMembers::identities)
            .await
            .unwrap_or_default()
    }

    /// Returns `true` if the connection is a member of the room.
    pub async fn is_member(&self, room_id: RoomId, connection_id: ConnectionId) -> bool {
        self.with_members(room_id, |members| members.contains(connection_id))
            .await
            .unwrap_or(false)
    }

    /// Sends `farewell` to every member, then tears the room down. Returns
    /// the connections that were present.
    pub async fn close(&self, room_id: RoomId, farewell: &ServerEvent) -> Vec<ConnectionHandle> {
        let Some(slot) = self.existing(room_id).await else {
            return Vec::new();
        };
        let mut members = slot.lock().await;
        if members.closed {
            return Vec::new();
        }
        members.broadcast(farewell, None);
        members.closed = true;
        let evicted = std::mem::take(&mut members.connections);
        drop(members);
        self.drop_slot(room_id, &slot).await;
        evicted
    }

    /// Number of rooms with at least one live connection.
    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }
}
