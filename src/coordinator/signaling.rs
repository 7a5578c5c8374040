//! WebRTC signaling relay.
//!
//! Offers, answers and ICE candidates are opaque to the gateway. They are
//! forwarded either to one addressed connection or to the rest of a room,
//! always tagged with the sender's connection id.

use super::channel::RoomChannel;
use super::registry::{ConnectionHandle, ConnectionRegistry};
use crate::domain::{ConnectionId, RoomId, ServerEvent};

/// Kind of signaling payload being relayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    /// Session offer.
    Offer,
    /// Session answer.
    Answer,
    /// ICE candidate.
    IceCandidate,
}

impl SignalKind {
    /// Wraps `payload` in the outbound event for this kind.
    #[must_use]
    pub fn into_event(self, payload: serde_json::Value, sender_id: ConnectionId) -> ServerEvent {
        match self {
            Self::Offer => ServerEvent::WebrtcOffer {
                offer: payload,
                sender_id,
            },
            Self::Answer => ServerEvent::WebrtcAnswer {
                answer: payload,
                sender_id,
            },
            Self::IceCandidate => ServerEvent::WebrtcIceCandidate {
                candidate: payload,
                sender_id,
            },
        }
    }
}

/// Where a signaling payload goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalRoute {
    /// Exactly one connection.
    Direct(ConnectionId),
    /// Every member of the room except the sender.
    Room(RoomId),
}

/// Stateless forwarder for signaling payloads.
#[derive(Debug, Default, Clone, Copy)]
pub struct SignalingRelay;

impl SignalingRelay {
    /// Forwards a payload along `route`. Returns the number of connections
    /// that received it; an addressed connection that has gone away is a
    /// silent no-op.
    pub async fn relay(
        &self,
        registry: &ConnectionRegistry,
        channel: &RoomChannel,
        sender: &ConnectionHandle,
        kind: SignalKind,
        payload: serde_json::Value,
        route: SignalRoute,
    ) -> usize {
        let event = kind.into_event(payload, sender.connection_id());
        match route {
            SignalRoute::Direct(target) => usize::from(registry.send_to(target, event).await),
            SignalRoute::Room(room_id) => {
                channel
                    .broadcast(room_id, event, Some(sender.connection_id()))
                    .await
            }
        }
    }
}
