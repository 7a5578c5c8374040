//! Socket events exchanged with clients.
//!
//! [`ClientEvent`] is everything a connection may send; [`ServerEvent`] is
//! everything the coordinator emits. Both use the adjacently tagged shape
//! `{"event": "<kebab-name>", "data": {...}}` with camelCase payload fields,
//! matching the names existing whiteboard clients already speak.

use serde::{Deserialize, Serialize};

use super::{AccountId, Action, ConnectionId, HistoryLog, Identity, RoomId};

/// Host (or member) verdict on a pending join request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinDecision {
    /// Requester may enter and is durably added to the room.
    Approved,
    /// Requester is turned away; nothing is persisted.
    #[serde(alias = "rejected")]
    Denied,
}

/// One entry in a member list or presence notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberPresence {
    /// Account of the member.
    pub user_id: AccountId,
    /// Display name of the member.
    pub username: String,
    /// Connection through which the member is present.
    pub socket_id: ConnectionId,
}

impl MemberPresence {
    /// Builds a presence entry for `identity` on `connection`.
    #[must_use]
    pub fn new(identity: &Identity, connection: ConnectionId) -> Self {
        Self {
            user_id: identity.account_id.clone(),
            username: identity.display_name.clone(),
            socket_id: connection,
        }
    }
}

/// Event emitted by the coordinator to a connection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// Another identity entered the room.
    MemberJoined(MemberPresence),

    /// An identity's last connection left the room.
    #[serde(rename_all = "camelCase")]
    MemberLeft {
        /// Departed account.
        user_id: AccountId,
        /// Connection that left.
        socket_id: ConnectionId,
    },

    /// Full member list, sent to a connection right after it joins.
    RoomParticipants(Vec<MemberPresence>),

    /// Durable history replayed to a fresh joiner.
    RoomHistory(HistoryLog),

    /// A non-member asks to enter the room.
    #[serde(rename_all = "camelCase")]
    JoinRequest {
        /// Requested room.
        room_id: RoomId,
        /// Who is asking.
        user: Identity,
        /// Requesting connection.
        socket_id: ConnectionId,
    },

    /// Verdict delivered to the requester.
    #[serde(rename_all = "camelCase")]
    JoinRequestResponse {
        /// Requested room.
        room_id: RoomId,
        /// Outcome.
        status: JoinDecision,
    },

    /// Tells other approvers that a request they were shown is settled.
    #[serde(rename_all = "camelCase")]
    JoinRequestResolved {
        /// Requested room.
        room_id: RoomId,
        /// Requesting account.
        user_id: AccountId,
        /// Outcome.
        status: JoinDecision,
    },

    /// A drawing action from another member.
    DrawAction(Action),

    /// The board was cleared.
    ClearBoard {},

    /// Full replacement history after an undo.
    UndoAction {
        /// Remaining actions.
        history: Vec<Action>,
    },

    /// The host ended the room.
    #[serde(rename_all = "camelCase")]
    RoomEnded {
        /// Ended room.
        room_id: RoomId,
    },

    /// Chat or file message, echoed to every member.
    ReceiveMessage(serde_json::Value),

    /// WebRTC offer relayed from `sender_id`.
    #[serde(rename_all = "camelCase")]
    WebrtcOffer {
        /// Opaque session description.
        offer: serde_json::Value,
        /// Originating connection.
        sender_id: ConnectionId,
    },

    /// WebRTC answer relayed from `sender_id`.
    #[serde(rename_all = "camelCase")]
    WebrtcAnswer {
        /// Opaque session description.
        answer: serde_json::Value,
        /// Originating connection.
        sender_id: ConnectionId,
    },

    /// ICE candidate relayed from `sender_id`.
    #[serde(rename_all = "camelCase")]
    WebrtcIceCandidate {
        /// Opaque candidate.
        candidate: serde_json::Value,
        /// Originating connection.
        sender_id: ConnectionId,
    },

    /// A request from this connection failed.
    Error {
        /// Numeric error code (see [`crate::error::GatewayError::error_code`]).
        code: u32,
        /// Human-readable message.
        message: String,
    },
}

impl ServerEvent {
    /// Returns the wire name of the event.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::MemberJoined(_) => "member-joined",
            Self::MemberLeft { .. } => "member-left",
            Self::RoomParticipants(_) => "room-participants",
            Self::RoomHistory(_) => "room-history",
            Self::JoinRequest { .. } => "join-request",
            Self::JoinRequestResponse { .. } => "join-request-response",
            Self::JoinRequestResolved { .. } => "join-request-resolved",
            Self::DrawAction(_) => "draw-action",
            Self::ClearBoard {} => "clear-board",
            Self::UndoAction { .. } => "undo-action",
            Self::RoomEnded { .. } => "room-ended",
            Self::ReceiveMessage(_) => "receive-message",
            Self::WebrtcOffer { .. } => "webrtc-offer",
            Self::WebrtcAnswer { .. } => "webrtc-answer",
            Self::WebrtcIceCandidate { .. } => "webrtc-ice-candidate",
            Self::Error { .. } => "error",
        }
    }
}

/// Event sent by a client.
///
/// Identity claims inside payloads (`user`, `userId` next to a room id)
/// are accepted for wire compatibility and ignored; the coordinator acts on
/// the identity bound to the connection.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    /// Ask to enter a room, repeated by the client until answered.
    #[serde(rename_all = "camelCase")]
    RequestToJoin {
        /// Target room.
        room_id: RoomId,
    },

    /// Approve or deny a pending request.
    #[serde(rename_all = "camelCase")]
    RespondJoinRequest {
        /// Room the request belongs to.
        room_id: RoomId,
        /// Account whose request is being answered.
        user_id: AccountId,
        /// Verdict.
        status: JoinDecision,
        /// Requesting connection as shown in the `join-request` event.
        #[serde(default)]
        target_socket_id: Option<ConnectionId>,
    },

    /// Enter a room the identity already belongs to.
    #[serde(rename_all = "camelCase")]
    JoinRoom {
        /// Target room.
        room_id: RoomId,
    },

    /// Leave a room explicitly.
    #[serde(rename_all = "camelCase")]
    LeaveRoom {
        /// Room to leave.
        room_id: RoomId,
    },

    /// Append a drawing action.
    #[serde(rename_all = "camelCase")]
    DrawAction {
        /// Target room.
        room_id: RoomId,
        /// Opaque action.
        action: Action,
    },

    /// Clear the whole board.
    #[serde(rename_all = "camelCase")]
    ClearBoard {
        /// Target room.
        room_id: RoomId,
    },

    /// Replace the history after an undo.
    #[serde(rename_all = "camelCase")]
    UndoAction {
        /// Target room.
        room_id: RoomId,
        /// Full remaining history.
        history: Vec<Action>,
    },

    /// Store a pre-rendered snapshot for faster joins.
    #[serde(rename_all = "camelCase")]
    SaveSnapshot {
        /// Target room.
        room_id: RoomId,
        /// Opaque snapshot blob.
        snapshot: String,
    },

    /// Host ends the room for everybody.
    #[serde(rename_all = "camelCase")]
    EndRoom {
        /// Room to end.
        room_id: RoomId,
    },

    /// Chat or file-attachment message.
    #[serde(rename_all = "camelCase")]
    SendMessage {
        /// Target room.
        room_id: RoomId,
        /// Opaque message payload.
        message: serde_json::Value,
    },

    /// WebRTC offer, addressed or room-wide.
    #[serde(rename_all = "camelCase")]
    WebrtcOffer {
        /// Room for a room-wide offer.
        #[serde(default)]
        room_id: Option<RoomId>,
        /// Single recipient.
        #[serde(default)]
        target_socket_id: Option<ConnectionId>,
        /// Opaque session description.
        offer: serde_json::Value,
    },

    /// WebRTC answer.
    #[serde(rename_all = "camelCase")]
    WebrtcAnswer {
        /// Room for a room-wide answer.
        #[serde(default)]
        room_id: Option<RoomId>,
        /// Single recipient.
        #[serde(default)]
        target_socket_id: Option<ConnectionId>,
        /// Opaque session description.
        answer: serde_json::Value,
    },

    /// ICE candidate.
    #[serde(rename_all = "camelCase")]
    WebrtcIceCandidate {
        /// Room for a room-wide candidate.
        #[serde(default)]
        room_id: Option<RoomId>,
        /// Single recipient.
        #[serde(default)]
        target_socket_id: Option<ConnectionId>,
        /// Opaque candidate.
        candidate: serde_json::Value,
    },
}

impl ClientEvent {
    /// Returns the wire name of the event.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::RequestToJoin { .. } => "request-to-join",
            Self::RespondJoinRequest { .. } => "respond-join-request",
            Self::JoinRoom { .. } => "join-room",
            Self::LeaveRoom { .. } => "leave-room",
            Self::DrawAction { .. } => "draw-action",
            Self::ClearBoard { .. } => "clear-board",
            Self::UndoAction { .. } => "undo-action",
            Self::SaveSnapshot { .. } => "save-snapshot",
            Self::EndRoom { .. } => "end-room",
            Self::SendMessage { .. } => "send-message",
            Self::WebrtcOffer { .. } => "webrtc-offer",
            Self::WebrtcAnswer { .. } => "webrtc-answer",
            Self::WebrtcIceCandidate { .. } => "webrtc-ice-candidate",
        }
    }
}
