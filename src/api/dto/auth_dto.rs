//! Development credential DTOs.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Request body for `POST /auth/dev-token`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct DevTokenRequest {
    /// Account id to embed as the credential subject.
    #[serde(alias = "userId")]
    pub account_id: String,
    /// Display name to embed.
    #[serde(alias = "username")]
    pub display_name: String,
}

/// Response body for `POST /auth/dev-token`.
#[derive(Debug, Serialize, ToSchema)]
pub struct DevTokenResponse {
    /// Signed credential for `Authorization: Bearer` and `/ws?token=`.
    pub token: String,
    /// Lifetime in seconds.
    pub expires_in: i64,
}
