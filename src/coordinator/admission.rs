//! Admission controller: pending join requests and who may decide them.
//!
//! Requests are keyed by `(room, account)`, so the client's periodic
//! `request-to-join` retries collapse into one pending entry. Each entry
//! remembers which approver connections have already been shown the
//! request; a retry only reaches approvers who joined since.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use super::channel::RoomChannel;
use super::registry::ConnectionHandle;
use crate::domain::{AccountId, ConnectionId, Room, RoomId, ServerEvent};

/// Who may see and decide join requests for a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApprovalPolicy {
    /// Only the room host.
    #[default]
    HostOnly,
    /// Any participant currently in the room.
    AnyMember,
}

impl ApprovalPolicy {
    /// Returns `true` if `account` may decide requests for `room`.
    #[must_use]
    pub fn may_decide(self, room: &Room, account: &AccountId) -> bool {
        match self {
            Self::HostOnly => room.is_host(account),
            Self::AnyMember => room.is_participant(account),
        }
    }
}

impl FromStr for ApprovalPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "host_only" | "host-only" | "host" => Ok(Self::HostOnly),
            "any_member" | "any-member" | "member" => Ok(Self::AnyMember),
            other => Err(format!("unknown approval policy: {other}")),
        }
    }
}

impl fmt::Display for ApprovalPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HostOnly => write!(f, "host_only"),
            Self::AnyMember => write!(f, "any_member"),
        }
    }
}

/// A request from a non-participant to enter a room.
#[derive(Debug, Clone)]
pub struct JoinRequest {
    /// Requested room.
    pub room_id: RoomId,
    /// Most recent connection the request came from.
    pub requester: ConnectionHandle,
    /// When the request was first made.
    pub requested_at: DateTime<Utc>,
    /// Approver connections that have been shown the request.
    pub notified: HashSet<ConnectionId>,
}

impl JoinRequest {
    fn new(room_id: RoomId, requester: ConnectionHandle) -> Self {
        Self {
            room_id,
            requester,
            requested_at: Utc::now(),
            notified: HashSet::new(),
        }
    }
}

/// Result of [`AdmissionController::request`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// The requester already holds a grant and can be admitted directly.
    AlreadyParticipant,
    /// A new pending request was opened.
    Opened {
        /// Approver connections notified.
        notified: usize,
    },
    /// A retry of a request that is still pending.
    Repeated {
        /// Approver connections newly notified by this retry.
        notified: usize,
    },
}

type RequestKey = (RoomId, AccountId);

/// Tracks pending join requests across all rooms.
#[derive(Debug, Default)]
pub struct AdmissionController {
    policy: ApprovalPolicy,
    pending: Mutex<HashMap<RequestKey, JoinRequest>>,
}

impl AdmissionController {
    /// Creates a controller applying `policy`.
    #[must_use]
    pub fn new(policy: ApprovalPolicy) -> Self {
        Self {
            policy,
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the active approval policy.
    #[must_use]
    pub const fn policy(&self) -> ApprovalPolicy {
        self.policy
    }

    /// Returns `true` if `account` may decide requests for `room`.
    #[must_use]
    pub fn may_decide(&self, room: &Room, account: &AccountId) -> bool {
        self.policy.may_decide(room, account)
    }

    /// Records a join request and notifies approvers present in the room.
    ///
    /// Approvers who were already shown this request are skipped, so a
    /// client retrying every few seconds does not flood the host.
    pub async fn request(
        &self,
        room: &Room,
        requester: &ConnectionHandle,
        channel: &RoomChannel,
    ) -> RequestOutcome {
        let account = requester.account_id();
        if room.is_participant(account) {
            return RequestOutcome::AlreadyParticipant;
        }

        let mut pending = self.pending.lock().await;
        let key = (room.room_id, account.clone());
        let repeated = pending.contains_key(&key);
        let request = pending
            .entry(key)
            .or_insert_with(|| JoinRequest::new(room.room_id, requester.clone()));
        if request.requester.connection_id() != requester.connection_id() {
            // retry from a new session; the verdict goes to the latest one
            request.requester = requester.clone();
        }

        let notice = ServerEvent::JoinRequest {
            room_id: room.room_id,
            user: requester.identity().clone(),
            socket_id: requester.connection_id(),
        };
        let policy = self.policy;
        let notified = channel
            .with_members(room.room_id, |members| {
                let mut sent = 0;
                for approver in members.handles() {
                    if approver.account_id() == account
                        || !policy.may_decide(room, approver.account_id())
                        || request.notified.contains(&approver.connection_id())
                    {
                        continue;
                    }
                    if approver.send(notice.clone()) {
                        request.notified.insert(approver.connection_id());
                        sent += 1;
                    }
                }
                sent
            })
            .await
            .unwrap_or(0);

        if repeated {
            RequestOutcome::Repeated { notified }
        } else {
            RequestOutcome::Opened { notified }
        }
    }

    /// Removes and returns the pending request of `account` for `room_id`.
    pub async fn take(&self, room_id: RoomId, account: &AccountId) -> Option<JoinRequest> {
        self.pending
            .lock()
            .await
            .remove(&(room_id, account.clone()))
    }

    /// Puts back a request taken by [`take`](Self::take) whose decision
    /// could not be applied. A newer request for the same key wins.
    pub async fn restore(&self, request: JoinRequest) {
        let key = (request.room_id, request.requester.account_id().clone());
        self.pending.lock().await.entry(key).or_insert(request);
    }

    /// Returns `true` if `account` has a pending request for `room_id`.
    pub async fn is_pending(&self, room_id: RoomId, account: &AccountId) -> bool {
        self.pending
            .lock()
            .await
            .contains_key(&(room_id, account.clone()))
    }

    /// Number of pending requests across all rooms.
    pub async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }

    /// Drops requests made from `connection_id` and forgets it as a
    /// notified approver. Returns how many requests were dropped.
    pub async fn discard_connection(&self, connection_id: ConnectionId) -> usize {
        let mut pending = self.pending.lock().await;
        let before = pending.len();
        pending.retain(|_, request| request.requester.connection_id() != connection_id);
        for request in pending.values_mut() {
            request.notified.remove(&connection_id);
        }
        before - pending.len()
    }

    /// Drops the request made from `connection_id` for `room_id`, if any.
    pub async fn withdraw(&self, room_id: RoomId, connection_id: ConnectionId) -> bool {
        let mut pending = self.pending.lock().await;
        let before = pending.len();
        pending.retain(|(room, _), request| {
            *room != room_id || request.requester.connection_id() != connection_id
        });
        before != pending.len()
    }

    /// Drops and returns every request for `room_id`.
    pub async fn discard_room(&self, room_id: RoomId) -> Vec<JoinRequest> {
        let mut pending = self.pending.lock().await;
        let keys: Vec<RequestKey> = pending
            .keys()
            .filter(|(room, _)| *room == room_id)
            .cloned()
            .collect();
        keys.iter().filter_map(|key| pending.remove(key)).collect()
    }
}
