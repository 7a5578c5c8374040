//! WebSocket connection loop.
//!
//! One task per socket. It registers the authenticated identity with the
//! coordinator, then multiplexes two streams with `tokio::select!`: frames
//! read from the client, and events queued on the connection's outbound
//! channel by any room activity. When either side ends, the connection is
//! torn down through [`Coordinator::disconnect`].

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};

use super::messages::{decode_frame, encode_event};
use crate::coordinator::{ConnectionHandle, Coordinator};
use crate::domain::Identity;

/// Runs the read/write loop for a single WebSocket connection.
pub async fn run_connection(socket: WebSocket, coordinator: Arc<Coordinator>, identity: Identity) {
    let (handle, mut outbound) = coordinator.connect(identity).await;
    let connection_id = handle.connection_id();
    let (mut ws_tx, mut ws_rx) = socket.split();

    loop {
        tokio::select! {
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        handle_text_message(&coordinator, &handle, &text).await;
                    }
                    Some(Ok(Message::Binary(_))) => {
                        handle.send(
                            crate::error::GatewayError::InvalidRequest(
                                "binary frames are not supported".to_string(),
                            )
                            .to_event(),
                        );
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(err)) => {
                        tracing::debug!(connection_id = %connection_id, error = %err, "ws read failed");
                        break;
                    }
                    _ => {}
                }
            }
            event = outbound.recv() => {
                let Some(event) = event else { break };
                match encode_event(&event) {
                    Ok(text) => {
                        if ws_tx.send(Message::text(text)).await.is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        tracing::warn!(connection_id = %connection_id, error = %err, "dropping unencodable event");
                    }
                }
            }
        }
    }

    coordinator.disconnect(connection_id).await;
    tracing::debug!(connection_id = %connection_id, "ws connection closed");
}

/// Decodes one text frame and hands it to the coordinator. Failures are
/// reported to this connection only, as an `error` event.
async fn handle_text_message(coordinator: &Coordinator, handle: &ConnectionHandle, text: &str) {
    let result = match decode_frame(text) {
        Ok(event) => coordinator.handle_event(handle.connection_id(), event).await,
        Err(err) => Err(err),
    };
    if let Err(err) = result {
        tracing::debug!(
            connection_id = %handle.connection_id(),
            code = err.error_code(),
            error = %err,
            "event rejected"
        );
        handle.send(err.to_event());
    }
}
