//! Real-time room coordination.
//!
//! The [`Coordinator`] owns the six collaborating components and is the
//! single entry point for socket sessions:
//!
//! - [`ConnectionRegistry`]: live connections, identity and current room.
//! - [`RoomChannel`]: per-room membership and ordered fan-out.
//! - [`AdmissionController`]: pending join requests and approvals.
//! - [`HistorySynchronizer`]: drawing history broadcast plus durable writes.
//! - [`SignalingRelay`]: WebRTC negotiation forwarding.
//! - [`ChatRelay`]: ephemeral room chat.
//!
//! Every inbound [`ClientEvent`] is handled with the identity bound to the
//! connection at [`Coordinator::connect`]; identity claims inside payloads
//! are never consulted.

pub mod admission;
pub mod channel;
pub mod chat;
pub mod history;
pub mod registry;
pub mod signaling;

use std::sync::Arc;

pub use admission::{AdmissionController, ApprovalPolicy, JoinRequest, RequestOutcome};
pub use channel::{JoinOutcome, RoomChannel, RoomMembers};
pub use chat::ChatRelay;
pub use history::HistorySynchronizer;
pub use registry::{ConnectionHandle, ConnectionInfo, ConnectionRegistry, OutboundReceiver};
pub use signaling::{SignalKind, SignalRoute, SignalingRelay};

use crate::domain::{
    AccountId, ClientEvent, ConnectionId, Identity, JoinDecision, Room, RoomId, ServerEvent,
};
use crate::error::GatewayError;
use crate::persistence::{HistoryStore, PersistenceStats, RoomStore};

/// Coordinates live rooms: membership, admission, history and relays.
#[derive(Debug)]
pub struct Coordinator {
    registry: ConnectionRegistry,
    channel: RoomChannel,
    admission: AdmissionController,
    history: HistorySynchronizer,
    signaling: SignalingRelay,
    chat: ChatRelay,
    rooms: Arc<dyn RoomStore>,
}

impl Coordinator {
    /// Creates a coordinator over the given stores.
    #[must_use]
    pub fn new(
        rooms: Arc<dyn RoomStore>,
        histories: Arc<dyn HistoryStore>,
        policy: ApprovalPolicy,
        stats: Arc<PersistenceStats>,
    ) -> Self {
        Self {
            registry: ConnectionRegistry::new(),
            channel: RoomChannel::new(),
            admission: AdmissionController::new(policy),
            history: HistorySynchronizer::new(histories, stats),
            signaling: SignalingRelay,
            chat: ChatRelay,
            rooms,
        }
    }

    /// Returns the connection registry.
    #[must_use]
    pub const fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Returns the room channel.
    #[must_use]
    pub const fn channel(&self) -> &RoomChannel {
        &self.channel
    }

    /// Returns the admission controller.
    #[must_use]
    pub const fn admission(&self) -> &AdmissionController {
        &self.admission
    }

    /// Returns the history synchronizer.
    #[must_use]
    pub const fn history(&self) -> &HistorySynchronizer {
        &self.history
    }

    /// Returns the room store.
    #[must_use]
    pub fn room_store(&self) -> &Arc<dyn RoomStore> {
        &self.rooms
    }

    /// Registers a new connection for an authenticated identity.
    pub async fn connect(&self, identity: Identity) -> (ConnectionHandle, OutboundReceiver) {
        let (handle, rx) = self.registry.register(identity).await;
        tracing::info!(
            connection_id = %handle.connection_id(),
            account_id = %handle.account_id(),
            "connection registered"
        );
        (handle, rx)
    }

    /// Tears down a connection: leaves its room (broadcasting the
    /// departure) and drops any join requests it made.
    pub async fn disconnect(&self, connection_id: ConnectionId) {
        let info = self.registry.unregister(connection_id, &self.channel).await;
        if let Some(room_id) = info.as_ref().and_then(|info| info.room) {
            self.retire_if_vacant(room_id).await;
        }
        let dropped = self.admission.discard_connection(connection_id).await;
        match info {
            Some(info) => tracing::info!(
                connection_id = %connection_id,
                account_id = %info.handle.account_id(),
                room_id = ?info.room,
                dropped_requests = dropped,
                "connection closed"
            ),
            None => tracing::debug!(connection_id = %connection_id, "unknown connection closed"),
        }
    }

    /// Handles one inbound event from `connection_id`.
    ///
    /// # Errors
    ///
    /// Returns the [`GatewayError`] to report back to the originating
    /// connection. Nothing is sent to other members when an error is
    /// returned.
    pub async fn handle_event(
        &self,
        connection_id: ConnectionId,
        event: ClientEvent,
    ) -> Result<(), GatewayError> {
        let Some(info) = self.registry.lookup(connection_id).await else {
            return Err(GatewayError::Internal(format!(
                "connection {connection_id} is not registered"
            )));
        };
        tracing::trace!(
            connection_id = %connection_id,
            event = event.name(),
            "inbound event"
        );
        let handle = info.handle;
        let current = info.room;

        match event {
            ClientEvent::RequestToJoin { room_id } => self.request_to_join(&handle, room_id).await,
            ClientEvent::RespondJoinRequest {
                room_id,
                user_id,
                status,
                target_socket_id,
            } => {
                self.respond_join_request(&handle, room_id, &user_id, status, target_socket_id)
                    .await
            }
            ClientEvent::JoinRoom { room_id } => self.join_room(&handle, room_id).await,
            ClientEvent::LeaveRoom { room_id } => {
                self.leave_room(&handle, room_id).await;
                Ok(())
            }
            ClientEvent::DrawAction { room_id, action } => {
                require_member(current, room_id)?;
                self.history
                    .append(&self.channel, room_id, connection_id, action)
                    .await;
                Ok(())
            }
            ClientEvent::ClearBoard { room_id } => {
                require_member(current, room_id)?;
                self.history.clear(&self.channel, room_id).await;
                Ok(())
            }
            ClientEvent::UndoAction { room_id, history } => {
                require_member(current, room_id)?;
                self.history
                    .replace_all(&self.channel, room_id, connection_id, history)
                    .await;
                Ok(())
            }
            ClientEvent::SaveSnapshot { room_id, snapshot } => {
                require_member(current, room_id)?;
                self.history
                    .save_snapshot(&self.channel, room_id, snapshot)
                    .await;
                Ok(())
            }
            ClientEvent::EndRoom { room_id } => self.end_room(&handle, room_id).await,
            ClientEvent::SendMessage { room_id, message } => {
                require_member(current, room_id)?;
                self.chat.send(&self.channel, room_id, message).await;
                Ok(())
            }
            ClientEvent::WebrtcOffer {
                room_id,
                target_socket_id,
                offer,
            } => {
                self.signal(&handle, current, SignalKind::Offer, offer, room_id, target_socket_id)
                    .await
            }
            ClientEvent::WebrtcAnswer {
                room_id,
                target_socket_id,
                answer,
            } => {
                self.signal(&handle, current, SignalKind::Answer, answer, room_id, target_socket_id)
                    .await
            }
            ClientEvent::WebrtcIceCandidate {
                room_id,
                target_socket_id,
                candidate,
            } => {
                self.signal(
                    &handle,
                    current,
                    SignalKind::IceCandidate,
                    candidate,
                    room_id,
                    target_socket_id,
                )
                .await
            }
        }
    }

    async fn find_room(&self, room_id: RoomId) -> Result<Room, GatewayError> {
        self.rooms
            .find(room_id)
            .await?
            .ok_or(GatewayError::RoomNotFound(room_id))
    }

    async fn request_to_join(
        &self,
        handle: &ConnectionHandle,
        room_id: RoomId,
    ) -> Result<(), GatewayError> {
        let room = self.find_room(room_id).await?;
        match self.admission.request(&room, handle, &self.channel).await {
            RequestOutcome::AlreadyParticipant => {
                handle.send(ServerEvent::JoinRequestResponse {
                    room_id,
                    status: JoinDecision::Approved,
                });
                self.admit(handle, room_id).await;
            }
            RequestOutcome::Opened { notified } => tracing::info!(
                room_id = %room_id,
                connection_id = %handle.connection_id(),
                account_id = %handle.account_id(),
                notified,
                "join request opened"
            ),
            RequestOutcome::Repeated { notified } => tracing::debug!(
                room_id = %room_id,
                account_id = %handle.account_id(),
                notified,
                "join request repeated"
            ),
        }
        Ok(())
    }

    async fn respond_join_request(
        &self,
        responder: &ConnectionHandle,
        room_id: RoomId,
        account: &AccountId,
        decision: JoinDecision,
        target: Option<ConnectionId>,
    ) -> Result<(), GatewayError> {
        let room = self.find_room(room_id).await?;
        if !self.admission.may_decide(&room, responder.account_id()) {
            return Err(GatewayError::NotAuthorized(format!(
                "{} may not decide join requests for room {room_id}",
                responder.account_id()
            )));
        }
        let Some(request) = self.admission.take(room_id, account).await else {
            return Err(GatewayError::NoPendingRequest(account.to_string()));
        };
        if let Some(target) = target
            && target != request.requester.connection_id()
        {
            tracing::debug!(
                room_id = %room_id,
                account_id = %account,
                "response names an older requester connection; answering the latest"
            );
        }

        match decision {
            JoinDecision::Approved => {
                if let Err(err) = self.rooms.add_participant(room_id, account.clone()).await {
                    tracing::warn!(
                        room_id = %room_id,
                        account_id = %account,
                        error = %err,
                        "approval not recorded; request stays pending"
                    );
                    self.admission.restore(request).await;
                    return Err(err.into());
                }
                request.requester.send(ServerEvent::JoinRequestResponse {
                    room_id,
                    status: JoinDecision::Approved,
                });
                self.admit(&request.requester, room_id).await;
            }
            JoinDecision::Denied => {
                request.requester.send(ServerEvent::JoinRequestResponse {
                    room_id,
                    status: JoinDecision::Denied,
                });
            }
        }
        tracing::info!(
            room_id = %room_id,
            account_id = %account,
            decided_by = %responder.account_id(),
            status = ?decision,
            "join request resolved"
        );

        let resolved = ServerEvent::JoinRequestResolved {
            room_id,
            user_id: account.clone(),
            status: decision,
        };
        for notified in request
            .notified
            .iter()
            .filter(|c| **c != responder.connection_id())
        {
            self.registry.send_to(*notified, resolved.clone()).await;
        }
        Ok(())
    }

    async fn join_room(&self, handle: &ConnectionHandle, room_id: RoomId) -> Result<(), GatewayError> {
        let room = self.find_room(room_id).await?;
        if !room.is_participant(handle.account_id()) {
            return Err(GatewayError::NotAuthorized(format!(
                "{} is not a participant of room {room_id}",
                handle.account_id()
            )));
        }
        self.admit(handle, room_id).await;
        Ok(())
    }

    /// Places a connection into a room's live channel, leaving any previous
    /// room first, and replays history on a fresh join. Returns `false` if
    /// the connection went away before admission completed.
    async fn admit(&self, handle: &ConnectionHandle, room_id: RoomId) -> bool {
        let connection_id = handle.connection_id();
        let Some(previous) = self.registry.move_to(connection_id, Some(room_id)).await else {
            tracing::debug!(
                room_id = %room_id,
                connection_id = %connection_id,
                "connection gone before admission"
            );
            return false;
        };
        if let Some(old_room) = previous.room
            && old_room != room_id
        {
            self.channel.leave(old_room, connection_id).await;
            self.retire_if_vacant(old_room).await;
        }

        let outcome = self.channel.join(room_id, handle).await;
        if self.registry.current_room(connection_id).await != Some(room_id) {
            // disconnected or moved while joining
            self.channel.leave(room_id, connection_id).await;
            self.retire_if_vacant(room_id).await;
            return false;
        }

        if outcome == JoinOutcome::Joined {
            self.history.replay_to(room_id, handle).await;
            tracing::info!(
                room_id = %room_id,
                connection_id = %connection_id,
                account_id = %handle.account_id(),
                "connection joined room"
            );
        }
        true
    }

    /// Retires the room's history writer once no live channel is left.
    async fn retire_if_vacant(&self, room_id: RoomId) {
        if self.channel.with_members(room_id, |_| ()).await.is_none() {
            self.history.retire(room_id);
        }
    }

    async fn leave_room(&self, handle: &ConnectionHandle, room_id: RoomId) {
        let connection_id = handle.connection_id();
        if self.registry.clear_room_if(connection_id, room_id).await {
            self.channel.leave(room_id, connection_id).await;
            self.retire_if_vacant(room_id).await;
            tracing::info!(
                room_id = %room_id,
                connection_id = %connection_id,
                account_id = %handle.account_id(),
                "connection left room"
            );
        }
        if self.admission.withdraw(room_id, connection_id).await {
            tracing::debug!(
                room_id = %room_id,
                connection_id = %connection_id,
                "join request withdrawn"
            );
        }
    }

    async fn end_room(&self, handle: &ConnectionHandle, room_id: RoomId) -> Result<(), GatewayError> {
        let room = self.find_room(room_id).await?;
        if !room.is_host(handle.account_id()) {
            return Err(GatewayError::NotAuthorized(format!(
                "only the host can end room {room_id}"
            )));
        }
        self.close_room(room_id).await;
        Ok(())
    }

    /// Ends a room's live session: every member and every pending requester
    /// receives `room-ended`, and the room's channel state is dropped.
    /// Returns the number of member connections that were evicted.
    pub async fn close_room(&self, room_id: RoomId) -> usize {
        let ended = ServerEvent::RoomEnded { room_id };
        let evicted = self.channel.close(room_id, &ended).await;
        for handle in &evicted {
            self.registry
                .clear_room_if(handle.connection_id(), room_id)
                .await;
        }
        self.history.retire(room_id);
        let requests = self.admission.discard_room(room_id).await;
        for request in &requests {
            request.requester.send(ended.clone());
        }
        tracing::info!(
            room_id = %room_id,
            evicted = evicted.len(),
            dropped_requests = requests.len(),
            "room ended"
        );
        evicted.len()
    }

    async fn signal(
        &self,
        sender: &ConnectionHandle,
        current: Option<RoomId>,
        kind: SignalKind,
        payload: serde_json::Value,
        room_id: Option<RoomId>,
        target: Option<ConnectionId>,
    ) -> Result<(), GatewayError> {
        let route = match (target, room_id) {
            (Some(target), _) => SignalRoute::Direct(target),
            (None, Some(room_id)) => {
                require_member(current, room_id)?;
                SignalRoute::Room(room_id)
            }
            (None, None) => {
                return Err(GatewayError::InvalidRequest(
                    "signaling needs targetSocketId or roomId".to_string(),
                ));
            }
        };
        self.signaling
            .relay(&self.registry, &self.channel, sender, kind, payload, route)
            .await;
        Ok(())
    }
}

fn require_member(current: Option<RoomId>, room_id: RoomId) -> Result<(), GatewayError> {
    if current == Some(room_id) {
        Ok(())
    } else {
        Err(GatewayError::NotAuthorized(format!(
            "connection is not a member of room {room_id}"
        )))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::persistence::{MemoryHistoryStore, MemoryRoomStore};

    fn coordinator(policy: ApprovalPolicy) -> (Coordinator, Arc<MemoryRoomStore>) {
        let rooms = Arc::new(MemoryRoomStore::new());
        let coordinator = Coordinator::new(
            Arc::clone(&rooms) as Arc<dyn RoomStore>,
            Arc::new(MemoryHistoryStore::new()),
            policy,
            Arc::new(PersistenceStats::new()),
        );
        (coordinator, rooms)
    }

    #[tokio::test]
    async fn unknown_connection_is_internal_error() {
        let (coordinator, _) = coordinator(ApprovalPolicy::HostOnly);
        let result = coordinator
            .handle_event(
                ConnectionId::new(),
                ClientEvent::LeaveRoom {
                    room_id: RoomId::new(),
                },
            )
            .await;
        assert!(matches!(result, Err(GatewayError::Internal(_))));
    }

    #[tokio::test]
    async fn join_room_requires_participant() {
        let (coordinator, rooms) = coordinator(ApprovalPolicy::HostOnly);
        let host = Identity::new("h", "Host");
        let Ok(room) = rooms.create(None, host, true).await else {
            panic!("create failed");
        };
        let (guest, _rx) = coordinator.connect(Identity::new("g", "Guest")).await;

        let result = coordinator
            .handle_event(
                guest.connection_id(),
                ClientEvent::JoinRoom {
                    room_id: room.room_id,
                },
            )
            .await;
        assert!(matches!(result, Err(GatewayError::NotAuthorized(_))));

        let missing = coordinator
            .handle_event(
                guest.connection_id(),
                ClientEvent::JoinRoom {
                    room_id: RoomId::new(),
                },
            )
            .await;
        assert!(matches!(missing, Err(GatewayError::RoomNotFound(_))));
    }

    #[tokio::test]
    async fn draw_outside_room_is_rejected() {
        let (coordinator, _) = coordinator(ApprovalPolicy::HostOnly);
        let (a, _rx) = coordinator.connect(Identity::new("a", "A")).await;
        let result = coordinator
            .handle_event(
                a.connection_id(),
                ClientEvent::DrawAction {
                    room_id: RoomId::new(),
                    action: serde_json::json!({"tool": "pen"}).into(),
                },
            )
            .await;
        assert!(matches!(result, Err(GatewayError::NotAuthorized(_))));
    }

    #[tokio::test]
    async fn signaling_without_route_is_invalid() {
        let (coordinator, _) = coordinator(ApprovalPolicy::HostOnly);
        let (a, _rx) = coordinator.connect(Identity::new("a", "A")).await;
        let result = coordinator
            .handle_event(
                a.connection_id(),
                ClientEvent::WebrtcAnswer {
                    room_id: None,
                    target_socket_id: None,
                    answer: serde_json::json!({}),
                },
            )
            .await;
        assert!(matches!(result, Err(GatewayError::InvalidRequest(_))));
    }
}
