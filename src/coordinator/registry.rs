//! Connection registry: live connections, their identity and current room.
//!
//! Every socket session registers once and receives a [`ConnectionHandle`]
//! plus the receiving half of its outbound queue. The handle is cheap to
//! clone and is what the room channel stores for fan-out.

use std::collections::HashMap;

use tokio::sync::{RwLock, mpsc};

use super::channel::RoomChannel;
use crate::domain::{AccountId, ConnectionId, Identity, MemberPresence, RoomId, ServerEvent};

/// Receiving half of a connection's outbound queue.
pub type OutboundReceiver = mpsc::UnboundedReceiver<ServerEvent>;

/// Addressable handle to one live connection.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    connection_id: ConnectionId,
    identity: Identity,
    outbound: mpsc::UnboundedSender<ServerEvent>,
}

impl ConnectionHandle {
    /// Returns the connection id.
    #[must_use]
    pub const fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    /// Returns the authenticated identity bound to the connection.
    #[must_use]
    pub const fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Returns the account id of the bound identity.
    #[must_use]
    pub const fn account_id(&self) -> &AccountId {
        &self.identity.account_id
    }

    /// Presence entry for this connection.
    #[must_use]
    pub fn presence(&self) -> MemberPresence {
        MemberPresence::new(&self.identity, self.connection_id)
    }

    /// Queues an event for the connection. Returns `false` if the socket
    /// task has already gone away.
    pub fn send(&self, event: ServerEvent) -> bool {
        self.outbound.send(event).is_ok()
    }
}

/// Registry entry: the handle plus the room the connection is in.
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    /// Handle to the connection.
    pub handle: ConnectionHandle,
    /// Room the connection currently belongs to, if any.
    pub room: Option<RoomId>,
}

/// In-memory table of live connections, one entry per socket session.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<ConnectionId, ConnectionInfo>>,
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new connection for `identity`.
    pub async fn register(&self, identity: Identity) -> (ConnectionHandle, OutboundReceiver) {
        let (outbound, rx) = mpsc::unbounded_channel();
        let handle = ConnectionHandle {
            connection_id: ConnectionId::new(),
            identity,
            outbound,
        };
        self.connections.write().await.insert(
            handle.connection_id,
            ConnectionInfo {
                handle: handle.clone(),
                room: None,
            },
        );
        (handle, rx)
    }

    /// Returns the entry for a connection, if it is still live.
    pub async fn lookup(&self, connection_id: ConnectionId) -> Option<ConnectionInfo> {
        self.connections.read().await.get(&connection_id).cloned()
    }

    /// Returns the room the connection is currently in.
    pub async fn current_room(&self, connection_id: ConnectionId) -> Option<RoomId> {
        self.connections
            .read()
            .await
            .get(&connection_id)
            .and_then(|info| info.room)
    }

    /// Points the connection at `room`, returning the entry as it was
    /// before the change. `None` means the connection is gone.
    pub async fn move_to(
        &self,
        connection_id: ConnectionId,
        room: Option<RoomId>,
    ) -> Option<ConnectionInfo> {
        let mut connections = self.connections.write().await;
        let info = connections.get_mut(&connection_id)?;
        let previous = info.clone();
        info.room = room;
        Some(previous)
    }

    /// Clears the connection's room only if it is `room`. Returns `true`
    /// when the connection was in that room.
    pub async fn clear_room_if(&self, connection_id: ConnectionId, room: RoomId) -> bool {
        let mut connections = self.connections.write().await;
        match connections.get_mut(&connection_id) {
            Some(info) if info.room == Some(room) => {
                info.room = None;
                true
            }
            _ => false,
        }
    }

    /// Queues an event for a single connection. Unknown connections are a
    /// silent no-op and return `false`.
    pub async fn send_to(&self, connection_id: ConnectionId, event: ServerEvent) -> bool {
        match self.connections.read().await.get(&connection_id) {
            Some(info) => info.handle.send(event),
            None => false,
        }
    }

    /// Removes a connection and runs the channel leave path for its room.
    ///
    /// The entry is withdrawn first so that no concurrent admission can
    /// target the connection any more; the leave then broadcasts the
    /// departure before this call returns.
    pub async fn unregister(
        &self,
        connection_id: ConnectionId,
        channel: &RoomChannel,
    ) -> Option<ConnectionInfo> {
        let info = self.connections.write().await.remove(&connection_id)?;
        if let Some(room) = info.room {
            channel.leave(room, connection_id).await;
        }
        Some(info)
    }

    /// Returns the number of live connections.
    pub async fn len(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Returns `true` if no connection is registered.
    pub async fn is_empty(&self) -> bool {
        self.connections.read().await.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn alice() -> Identity {
        Identity::new("u-alice", "Alice")
    }

    #[tokio::test]
    async fn register_and_lookup() {
        let registry = ConnectionRegistry::new();
        let (handle, _rx) = registry.register(alice()).await;

        let Some(info) = registry.lookup(handle.connection_id()).await else {
            panic!("connection missing");
        };
        assert_eq!(info.handle.identity(), &alice());
        assert!(info.room.is_none());
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn send_to_unknown_connection_is_noop() {
        let registry = ConnectionRegistry::new();
        assert!(
            !registry
                .send_to(ConnectionId::new(), ServerEvent::ClearBoard {})
                .await
        );
    }

    #[tokio::test]
    async fn send_to_reaches_outbound_queue() {
        let registry = ConnectionRegistry::new();
        let (handle, mut rx) = registry.register(alice()).await;
        assert!(
            registry
                .send_to(handle.connection_id(), ServerEvent::ClearBoard {})
                .await
        );
        assert_eq!(rx.recv().await, Some(ServerEvent::ClearBoard {}));
    }

    #[tokio::test]
    async fn clear_room_if_only_matches_current_room() {
        let registry = ConnectionRegistry::new();
        let (handle, _rx) = registry.register(alice()).await;
        let room = RoomId::new();
        let _ = registry.move_to(handle.connection_id(), Some(room)).await;

        assert!(!registry.clear_room_if(handle.connection_id(), RoomId::new()).await);
        assert_eq!(registry.current_room(handle.connection_id()).await, Some(room));
        assert!(registry.clear_room_if(handle.connection_id(), room).await);
        assert_eq!(registry.current_room(handle.connection_id()).await, None);
    }

    #[tokio::test]
    async fn unregister_leaves_room_channel() {
        let registry = ConnectionRegistry::new();
        let channel = RoomChannel::new();
        let room = RoomId::new();

        let (handle, _rx) = registry.register(alice()).await;
        let (bob, mut bob_rx) = registry.register(Identity::new("u-bob", "Bob")).await;
        for h in [&handle, &bob] {
            let _ = registry.move_to(h.connection_id(), Some(room)).await;
            let _ = channel.join(room, h).await;
        }
        while bob_rx.try_recv().is_ok() {}

        let removed = registry.unregister(handle.connection_id(), &channel).await;
        assert!(removed.is_some());
        assert!(registry.lookup(handle.connection_id()).await.is_none());

        let members = channel.members(room).await;
        assert_eq!(members, vec![Identity::new("u-bob", "Bob")]);
        let Ok(ServerEvent::MemberLeft { user_id, .. }) = bob_rx.try_recv() else {
            panic!("expected member-left");
        };
        assert_eq!(user_id, AccountId::from("u-alice"));
    }
}
