//! Gateway error types with HTTP status and socket error mapping.
//!
//! [`GatewayError`] is the central error type for the gateway. Each variant
//! maps to a numeric code, an HTTP status for the REST API and an `error`
//! event for socket connections.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{RoomId, ServerEvent};
use crate::persistence::StoreError;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 2001,
///     "message": "room not found: 6f1c...",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code (see code ranges on [`GatewayError`]).
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category        | HTTP Status                |
/// |-----------|-----------------|----------------------------|
/// | 1000–1999 | Validation      | 400 Bad Request            |
/// | 2000–2999 | Not Found       | 404 Not Found              |
/// | 3000–3999 | Server          | 500 Internal Server Error  |
/// | 4000–4999 | Access          | 401 / 403                  |
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Room with the given ID was not found.
    #[error("room not found: {0}")]
    RoomNotFound(RoomId),

    /// No join request is pending for the given account.
    #[error("no pending join request from {0}")]
    NoPendingRequest(String),

    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Missing, malformed or expired credential.
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    /// Caller is authenticated but may not perform the action.
    #[error("not authorized: {0}")]
    NotAuthorized(String),

    /// Persistence layer failure.
    #[error("persistence error: {0}")]
    PersistenceError(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::RoomNotFound(_) => 2001,
            Self::NoPendingRequest(_) => 2002,
            Self::Internal(_) => 3000,
            Self::PersistenceError(_) => 3001,
            Self::Unauthenticated(_) => 4001,
            Self::NotAuthorized(_) => 4003,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::RoomNotFound(_) | Self::NoPendingRequest(_) => StatusCode::NOT_FOUND,
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::NotAuthorized(_) => StatusCode::FORBIDDEN,
            Self::PersistenceError(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Renders the error as an `error` event for a socket connection.
    #[must_use]
    pub fn to_event(&self) -> ServerEvent {
        ServerEvent::Error {
            code: self.error_code(),
            message: self.to_string(),
        }
    }
}

impl From<StoreError> for GatewayError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::RoomNotFound(room_id) => Self::RoomNotFound(room_id),
            StoreError::Backend(msg) => Self::PersistenceError(msg),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_status_ranges() {
        let not_found = GatewayError::RoomNotFound(RoomId::new());
        assert_eq!(not_found.error_code(), 2001);
        assert_eq!(not_found.status_code(), StatusCode::NOT_FOUND);

        let forbidden = GatewayError::NotAuthorized("host only".to_string());
        assert_eq!(forbidden.error_code(), 4003);
        assert_eq!(forbidden.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn store_not_found_maps_to_room_not_found() {
        let room_id = RoomId::new();
        let err = GatewayError::from(StoreError::RoomNotFound(room_id));
        assert!(matches!(err, GatewayError::RoomNotFound(id) if id == room_id));
    }

    #[test]
    fn socket_event_carries_code_and_message() {
        let err = GatewayError::InvalidRequest("bad frame".to_string());
        let ServerEvent::Error { code, message } = err.to_event() else {
            unreachable!("to_event always yields an error event");
        };
        assert_eq!(code, 1001);
        assert!(message.contains("bad frame"));
    }
}
