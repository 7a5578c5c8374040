//! Development credential endpoint.
//!
//! Account registration and login live in an external service. For local
//! use the gateway can mint its own credentials; the route is only mounted
//! when `AUTH_DEV_TOKENS=true`.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};

use crate::api::dto::{DevTokenRequest, DevTokenResponse};
use crate::app_state::AppState;
use crate::domain::Identity;
use crate::error::{ErrorResponse, GatewayError};

/// `POST /auth/dev-token` — Issue a credential for any identity.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidRequest`] if the account id is blank.
#[utoipa::path(
    post,
    path = "/auth/dev-token",
    tag = "Auth",
    summary = "Issue a development credential",
    request_body = DevTokenRequest,
    responses(
        (status = 201, description = "Credential issued", body = DevTokenResponse),
        (status = 400, description = "Blank account id", body = ErrorResponse),
    )
)]
pub async fn issue_dev_token(
    State(state): State<AppState>,
    Json(req): Json<DevTokenRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let account_id = req.account_id.trim();
    if account_id.is_empty() {
        return Err(GatewayError::InvalidRequest(
            "account_id must not be blank".to_string(),
        ));
    }
    let display_name = match req.display_name.trim() {
        "" => account_id.to_string(),
        name => name.to_string(),
    };
    let identity = Identity::new(account_id, display_name);
    let token = state.verifier.issue(&identity)?;
    tracing::info!(account_id = %identity.account_id, "development credential issued");
    Ok((
        StatusCode::CREATED,
        Json(DevTokenResponse {
            token,
            expires_in: state.config.credential_ttl_secs,
        }),
    ))
}

/// Development auth routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/auth/dev-token", post(issue_dev_token))
}
