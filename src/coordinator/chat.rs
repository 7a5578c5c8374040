//! Chat relay.
//!
//! Messages (text or file attachments) are opaque and ephemeral: they are
//! echoed to every member of the room, the sender included, and never
//! stored.

use super::channel::RoomChannel;
use crate::domain::{RoomId, ServerEvent};

/// Stateless forwarder for chat messages.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChatRelay;

impl ChatRelay {
    /// Delivers `message` as `receive-message` to every room member.
    pub async fn send(
        &self,
        channel: &RoomChannel,
        room_id: RoomId,
        message: serde_json::Value,
    ) -> usize {
        channel
            .broadcast(room_id, ServerEvent::ReceiveMessage(message), None)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::registry::ConnectionRegistry;
    use crate::domain::Identity;

    #[tokio::test]
    async fn message_is_echoed_to_sender() {
        let registry = ConnectionRegistry::new();
        let channel = RoomChannel::new();
        let room = RoomId::new();
        let (a, mut a_rx) = registry.register(Identity::new("a", "A")).await;
        let _ = channel.join(room, &a).await;
        while a_rx.try_recv().is_ok() {}

        let message = serde_json::json!({"text": "hi", "sender": "A"});
        assert_eq!(ChatRelay.send(&channel, room, message.clone()).await, 1);
        assert_eq!(a_rx.try_recv().ok(), Some(ServerEvent::ReceiveMessage(message)));
    }
}
