//! WebSocket frame encoding.
//!
//! Inbound frames are `{"event": "<name>", "data": {...}, "id"?: "..."}`
//! and decode straight into [`ClientEvent`]. Outbound frames wrap a
//! [`ServerEvent`] with a server-generated id and timestamp:
//! `{"id", "timestamp", "event", "data"}`.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{ClientEvent, ServerEvent};
use crate::error::GatewayError;

/// Outbound WebSocket frame.
#[derive(Debug, Clone, Serialize)]
pub struct OutboundFrame<'a> {
    /// Server-generated frame id.
    pub id: String,
    /// Time the frame was encoded.
    pub timestamp: DateTime<Utc>,
    /// Event name and payload, flattened into the frame.
    #[serde(flatten)]
    pub event: &'a ServerEvent,
}

impl<'a> OutboundFrame<'a> {
    /// Wraps `event` in a fresh frame.
    #[must_use]
    pub fn new(event: &'a ServerEvent) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event,
        }
    }
}

/// Serializes an event into an outbound text frame.
///
/// # Errors
///
/// Returns [`GatewayError::Internal`] if the event cannot be serialized.
pub fn encode_event(event: &ServerEvent) -> Result<String, GatewayError> {
    serde_json::to_string(&OutboundFrame::new(event))
        .map_err(|e| GatewayError::Internal(format!("encode {}: {e}", event.name())))
}

/// Parses an inbound text frame.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidRequest`] for malformed JSON, unknown
/// event names or payloads missing required fields.
pub fn decode_frame(text: &str) -> Result<ClientEvent, GatewayError> {
    serde_json::from_str(text).map_err(|e| GatewayError::InvalidRequest(format!("malformed frame: {e}")))
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::RoomId;

    #[test]
    fn outbound_frame_has_envelope_fields() {
        let room_id = RoomId::new();
        let Ok(text) = encode_event(&ServerEvent::RoomEnded { room_id }) else {
            panic!("encode failed");
        };
        let Ok(json) = serde_json::from_str::<serde_json::Value>(&text) else {
            panic!("not json");
        };
        assert_eq!(json["event"], "room-ended");
        assert_eq!(json["data"]["roomId"], room_id.to_string());
        assert!(json["id"].is_string());
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn participants_list_encodes_as_array() {
        let Ok(text) = encode_event(&ServerEvent::RoomParticipants(Vec::new())) else {
            panic!("encode failed");
        };
        let Ok(json) = serde_json::from_str::<serde_json::Value>(&text) else {
            panic!("not json");
        };
        assert_eq!(json["data"], serde_json::json!([]));
    }

    #[test]
    fn inbound_frame_decodes() {
        let text = format!(
            r#"{{"event":"join-room","data":{{"roomId":"{}"}},"id":"c-1"}}"#,
            RoomId::new()
        );
        assert!(matches!(decode_frame(&text), Ok(ClientEvent::JoinRoom { .. })));
    }

    #[test]
    fn malformed_frames_are_invalid_requests() {
        for text in ["not json", r#"{"event":"no-such-event","data":{}}"#, r#"{"event":"join-room","data":{}}"#] {
            let Err(err) = decode_frame(text) else {
                panic!("{text} should not decode");
            };
            assert_eq!(err.error_code(), 1001);
        }
    }
}
