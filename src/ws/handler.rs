//! Axum WebSocket upgrade handler.

use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::response::IntoResponse;
use serde::Deserialize;

use super::connection::run_connection;
use crate::app_state::AppState;
use crate::error::GatewayError;

/// Query string accepted on `/ws`.
#[derive(Debug, Default, Deserialize)]
pub struct WsAuthQuery {
    /// Session credential. Browsers cannot set headers on a WebSocket
    /// handshake, so the query string is the primary carrier.
    #[serde(default)]
    pub token: Option<String>,
}

/// `GET /ws` — Verify the caller's credential and upgrade to WebSocket.
///
/// # Errors
///
/// Returns [`GatewayError::Unauthenticated`] (401) when no valid credential
/// is presented; the upgrade does not happen.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<WsAuthQuery>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, GatewayError> {
    let token = query
        .token
        .or_else(|| {
            headers
                .get(AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "))
                .map(str::to_string)
        })
        .ok_or_else(|| GatewayError::Unauthenticated("missing credential".to_string()))?;

    let identity = state.verifier.verify(&token).inspect_err(|err| {
        tracing::debug!(error = %err, "ws upgrade refused");
    })?;

    let coordinator = Arc::clone(&state.coordinator);
    Ok(ws.on_upgrade(move |socket| run_connection(socket, coordinator, identity)))
}
