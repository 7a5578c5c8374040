//! Drawing actions and the per-room history log.

use serde::{Deserialize, Serialize};

/// One user-originated drawing edit.
///
/// The payload is opaque to the gateway; it is stored and replayed as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Action(serde_json::Value);

impl Action {
    /// Wraps a raw JSON payload.
    #[must_use]
    pub const fn new(payload: serde_json::Value) -> Self {
        Self(payload)
    }

    /// Returns the raw payload.
    #[must_use]
    pub const fn payload(&self) -> &serde_json::Value {
        &self.0
    }

    /// Consumes the action, returning the raw payload.
    #[must_use]
    pub fn into_payload(self) -> serde_json::Value {
        self.0
    }
}

impl From<serde_json::Value> for Action {
    fn from(payload: serde_json::Value) -> Self {
        Self(payload)
    }
}

/// Ordered action log of a room plus an optional rendered snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryLog {
    /// Actions in the order they were recorded.
    #[serde(rename = "history")]
    pub actions: Vec<Action>,
    /// Opaque pre-rendered canvas state (e.g. a data URL).
    pub snapshot: Option<String>,
}

impl HistoryLog {
    /// Returns `true` when there are no actions and no snapshot.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty() && self.snapshot.is_none()
    }
}
