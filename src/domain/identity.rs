//! Authenticated identity bound to a connection.

use serde::{Deserialize, Serialize};

use super::AccountId;

/// Account identity established from a verified credential.
///
/// Serialized with the wire names clients already use (`userId`,
/// `username`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    /// Account identifier.
    #[serde(rename = "userId")]
    pub account_id: AccountId,
    /// Human-readable display name.
    #[serde(rename = "username")]
    pub display_name: String,
}

impl Identity {
    /// Creates an identity from an account id and display name.
    #[must_use]
    pub fn new(account_id: impl Into<AccountId>, display_name: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            display_name: display_name.into(),
        }
    }
}
