//! Room handlers: create, list, get, join, history, delete.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use uuid::Uuid;

use crate::api::dto::{
    CreateRoomRequest, HistoryResponse, RoomListResponse, RoomResponse, RoomSummaryDto,
};
use crate::api::extract::AuthenticatedUser;
use crate::app_state::AppState;
use crate::domain::{RoomId, RoomSummary};
use crate::error::{ErrorResponse, GatewayError};

/// `POST /rooms` — Create a room hosted by the caller.
///
/// # Errors
///
/// Returns [`GatewayError`] if the caller is unauthenticated or the room
/// cannot be stored.
#[utoipa::path(
    post,
    path = "/api/v1/rooms",
    tag = "Rooms",
    summary = "Create a room",
    description = "Creates a room with the caller as host and sole participant, and initialises an empty drawing history.",
    request_body = CreateRoomRequest,
    responses(
        (status = 201, description = "Room created", body = RoomResponse),
        (status = 401, description = "Missing or invalid credential", body = ErrorResponse),
    ),
    security(("bearer" = []))
)]
pub async fn create_room(
    State(state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    Json(req): Json<CreateRoomRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let room = state
        .room_service
        .create_room(caller, req.name, req.is_public)
        .await?;
    Ok((StatusCode::CREATED, Json(RoomResponse::from(room))))
}

/// `GET /rooms` — List public rooms, newest first.
///
/// # Errors
///
/// Returns [`GatewayError`] if the caller is unauthenticated or the store
/// fails.
#[utoipa::path(
    get,
    path = "/api/v1/rooms",
    tag = "Rooms",
    summary = "List public rooms",
    description = "Returns public rooms sorted newest first, limited to the configured page size.",
    responses(
        (status = 200, description = "Public rooms", body = RoomListResponse),
        (status = 401, description = "Missing or invalid credential", body = ErrorResponse),
    ),
    security(("bearer" = []))
)]
pub async fn list_rooms(
    State(state): State<AppState>,
    AuthenticatedUser(_caller): AuthenticatedUser,
) -> Result<impl IntoResponse, GatewayError> {
    let rooms = state.room_service.list_public().await?;
    let data = rooms
        .iter()
        .map(|room| RoomSummaryDto::from(RoomSummary::from(room)))
        .collect();
    Ok(Json(RoomListResponse { data }))
}

/// `GET /rooms/{room_id}` — Get a room.
///
/// # Errors
///
/// Returns [`GatewayError::RoomNotFound`] if the room does not exist.
#[utoipa::path(
    get,
    path = "/api/v1/rooms/{room_id}",
    tag = "Rooms",
    summary = "Get room details",
    params(("room_id" = Uuid, Path, description = "Room identifier")),
    responses(
        (status = 200, description = "Room record", body = RoomResponse),
        (status = 404, description = "Room not found", body = ErrorResponse),
    ),
    security(("bearer" = []))
)]
pub async fn get_room(
    State(state): State<AppState>,
    AuthenticatedUser(_caller): AuthenticatedUser,
    Path(room_id): Path<Uuid>,
) -> Result<impl IntoResponse, GatewayError> {
    let room = state.room_service.get_room(RoomId::from(room_id)).await?;
    Ok(Json(RoomResponse::from(room)))
}

/// `POST /rooms/{room_id}/join` — Add the caller to a public room's participants.
///
/// # Errors
///
/// - [`GatewayError::RoomNotFound`] if the room does not exist.
/// - [`GatewayError::NotAuthorized`] if the room is invite-only.
#[utoipa::path(
    post,
    path = "/api/v1/rooms/{room_id}/join",
    tag = "Rooms",
    summary = "Join a room",
    description = "Adds the caller to a public room's participants. Joining twice is a no-op. \
                   Invite-only rooms require `request-to-join` over the socket.",
    params(("room_id" = Uuid, Path, description = "Room identifier")),
    responses(
        (status = 200, description = "Updated room", body = RoomResponse),
        (status = 403, description = "Room is invite-only", body = ErrorResponse),
        (status = 404, description = "Room not found", body = ErrorResponse),
    ),
    security(("bearer" = []))
)]
pub async fn join_room(
    State(state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    Path(room_id): Path<Uuid>,
) -> Result<impl IntoResponse, GatewayError> {
    let room = state
        .room_service
        .join_room(RoomId::from(room_id), &caller.account_id)
        .await?;
    Ok(Json(RoomResponse::from(room)))
}

/// `GET /rooms/{room_id}/history` — Stored drawing history.
///
/// # Errors
///
/// Returns [`GatewayError::NotAuthorized`] unless the caller is a
/// participant, [`GatewayError::RoomNotFound`] if the room does not exist.
#[utoipa::path(
    get,
    path = "/api/v1/rooms/{room_id}/history",
    tag = "Rooms",
    summary = "Get room history",
    params(("room_id" = Uuid, Path, description = "Room identifier")),
    responses(
        (status = 200, description = "Stored history and snapshot", body = HistoryResponse),
        (status = 403, description = "Caller is not a participant", body = ErrorResponse),
        (status = 404, description = "Room not found", body = ErrorResponse),
    ),
    security(("bearer" = []))
)]
pub async fn room_history(
    State(state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    Path(room_id): Path<Uuid>,
) -> Result<impl IntoResponse, GatewayError> {
    let log = state
        .room_service
        .room_history(RoomId::from(room_id), &caller.account_id)
        .await?;
    Ok(Json(HistoryResponse::from(log)))
}

/// `DELETE /rooms/{room_id}` — Delete a room (host only).
///
/// # Errors
///
/// Returns [`GatewayError::NotAuthorized`] unless the caller is the host,
/// [`GatewayError::RoomNotFound`] if the room does not exist.
#[utoipa::path(
    delete,
    path = "/api/v1/rooms/{room_id}",
    tag = "Rooms",
    summary = "Delete a room",
    description = "Deletes the room and its history, and ends the live session for everyone in it.",
    params(("room_id" = Uuid, Path, description = "Room identifier")),
    responses(
        (status = 204, description = "Room deleted"),
        (status = 403, description = "Caller is not the host", body = ErrorResponse),
        (status = 404, description = "Room not found", body = ErrorResponse),
    ),
    security(("bearer" = []))
)]
pub async fn delete_room(
    State(state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    Path(room_id): Path<Uuid>,
) -> Result<impl IntoResponse, GatewayError> {
    state
        .room_service
        .delete_room(RoomId::from(room_id), &caller.account_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Room routes (mounted under `/api/v1`).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/rooms", post(create_room).get(list_rooms))
        .route("/rooms/{room_id}", get(get_room).delete(delete_room))
        .route("/rooms/{room_id}/join", post(join_room))
        .route("/rooms/{room_id}/history", get(room_history))
}
