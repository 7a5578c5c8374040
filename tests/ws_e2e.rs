//! End-to-end tests over real sockets.
//!
//! Each test boots the full router on an ephemeral port with in-memory
//! stores, talks REST with `reqwest` and WebSocket with
//! `tokio-tungstenite`.

#![allow(clippy::panic)]

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::time::{Duration, timeout};
use tokio_tungstenite::tungstenite::Message;

use whiteboard_gateway::api::build_app;
use whiteboard_gateway::app_state::AppState;
use whiteboard_gateway::config::GatewayConfig;
use whiteboard_gateway::persistence::{MemoryHistoryStore, MemoryRoomStore};

type Socket =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

async fn start_server() -> SocketAddr {
    let config = GatewayConfig {
        persistence_enabled: false,
        auth_dev_tokens: true,
        ..GatewayConfig::default()
    };
    let state = AppState::new(
        config,
        Arc::new(MemoryRoomStore::new()),
        Arc::new(MemoryHistoryStore::new()),
    );
    let Ok(listener) = tokio::net::TcpListener::bind("127.0.0.1:0").await else {
        panic!("bind failed");
    };
    let Ok(addr) = listener.local_addr() else {
        panic!("no local addr");
    };
    tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, build_app(state)).await {
            panic!("server failed: {err}");
        }
    });
    addr
}

async fn dev_token(addr: SocketAddr, account: &str) -> String {
    let Ok(resp) = reqwest::Client::new()
        .post(format!("http://{addr}/auth/dev-token"))
        .json(&json!({ "userId": account, "username": account.to_uppercase() }))
        .send()
        .await
    else {
        panic!("dev-token request failed");
    };
    assert_eq!(resp.status(), 201);
    let Ok(body) = resp.json::<Value>().await else {
        panic!("dev-token body");
    };
    let Some(token) = body["token"].as_str() else {
        panic!("no token in {body}");
    };
    token.to_string()
}

async fn create_room(addr: SocketAddr, token: &str) -> String {
    let Ok(resp) = reqwest::Client::new()
        .post(format!("http://{addr}/api/v1/rooms"))
        .bearer_auth(token)
        .json(&json!({ "name": "Standup" }))
        .send()
        .await
    else {
        panic!("create room request failed");
    };
    assert_eq!(resp.status(), 201);
    let Ok(body) = resp.json::<Value>().await else {
        panic!("create room body");
    };
    let Some(room_id) = body["room_id"].as_str() else {
        panic!("no room_id in {body}");
    };
    room_id.to_string()
}

async fn connect(addr: SocketAddr, token: &str) -> Socket {
    let Ok((socket, _)) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws?token={token}")).await
    else {
        panic!("ws connect failed");
    };
    socket
}

async fn send(socket: &mut Socket, event: &str, data: Value) {
    let frame = json!({ "event": event, "data": data }).to_string();
    if let Err(err) = socket.send(Message::text(frame)).await {
        panic!("send {event} failed: {err}");
    }
}

/// Reads frames until one named `event` arrives.
async fn next_event(socket: &mut Socket, event: &str) -> Value {
    let read = async {
        while let Some(msg) = socket.next().await {
            let Ok(Message::Text(text)) = msg else {
                continue;
            };
            let Ok(frame) = serde_json::from_str::<Value>(text.as_str()) else {
                panic!("non-JSON frame: {}", text.as_str());
            };
            if frame["event"] == event {
                return frame;
            }
        }
        panic!("socket closed before {event}");
    };
    let Ok(frame) = timeout(Duration::from_secs(5), read).await else {
        panic!("timed out waiting for {event}");
    };
    frame
}

#[tokio::test]
async fn health_reports_live_counts() {
    let addr = start_server().await;
    let Ok(resp) = reqwest::get(format!("http://{addr}/health")).await else {
        panic!("health request failed");
    };
    assert_eq!(resp.status(), 200);
    let Ok(body) = resp.json::<Value>().await else {
        panic!("health body");
    };
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["connections"], 0);
    assert_eq!(body["max_attachment_bytes"], 5_242_880);
}

#[tokio::test]
async fn upgrade_without_valid_credential_is_refused() {
    let addr = start_server().await;
    assert!(
        tokio_tungstenite::connect_async(format!("ws://{addr}/ws"))
            .await
            .is_err()
    );
    assert!(
        tokio_tungstenite::connect_async(format!("ws://{addr}/ws?token=forged.token"))
            .await
            .is_err()
    );
}

#[tokio::test]
async fn rest_requires_bearer_credential() {
    let addr = start_server().await;
    let Ok(resp) = reqwest::Client::new()
        .post(format!("http://{addr}/api/v1/rooms"))
        .json(&json!({ "name": "nope" }))
        .send()
        .await
    else {
        panic!("request failed");
    };
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn admission_and_drawing_over_websocket() {
    let addr = start_server().await;
    let host_token = dev_token(addr, "host").await;
    let guest_token = dev_token(addr, "guest").await;
    let room_id = create_room(addr, &host_token).await;

    let mut host = connect(addr, &host_token).await;
    send(&mut host, "join-room", json!({ "roomId": room_id })).await;
    let participants = next_event(&mut host, "room-participants").await;
    assert_eq!(participants["data"][0]["userId"], "host");

    let mut guest = connect(addr, &guest_token).await;
    send(&mut guest, "request-to-join", json!({ "roomId": room_id })).await;
    let request = next_event(&mut host, "join-request").await;
    assert_eq!(request["data"]["user"]["userId"], "guest");
    let guest_socket = request["data"]["socketId"].clone();

    send(
        &mut host,
        "respond-join-request",
        json!({
            "roomId": room_id,
            "userId": "guest",
            "status": "approved",
            "targetSocketId": guest_socket,
        }),
    )
    .await;
    let response = next_event(&mut guest, "join-request-response").await;
    assert_eq!(response["data"]["status"], "approved");
    next_event(&mut guest, "room-history").await;
    let joined = next_event(&mut host, "member-joined").await;
    assert_eq!(joined["data"]["userId"], "guest");

    let stroke = json!({ "tool": "pen", "color": "#000", "points": [[0, 0], [4, 4]] });
    send(
        &mut guest,
        "draw-action",
        json!({ "roomId": room_id, "action": stroke }),
    )
    .await;
    let drawn = next_event(&mut host, "draw-action").await;
    assert_eq!(drawn["data"], stroke);
    assert!(drawn["id"].is_string());
    assert!(drawn["timestamp"].is_string());

    if let Err(err) = guest.close(None).await {
        panic!("close failed: {err}");
    }
    let left = next_event(&mut host, "member-left").await;
    assert_eq!(left["data"]["userId"], "guest");
}

#[tokio::test]
async fn malformed_frame_gets_error_and_connection_survives() {
    let addr = start_server().await;
    let token = dev_token(addr, "solo").await;
    let room_id = create_room(addr, &token).await;
    let mut socket = connect(addr, &token).await;

    if let Err(err) = socket.send(Message::text("{not json")).await {
        panic!("send failed: {err}");
    }
    let error = next_event(&mut socket, "error").await;
    assert_eq!(error["data"]["code"], 1001);

    send(&mut socket, "join-room", json!({ "roomId": room_id })).await;
    next_event(&mut socket, "room-participants").await;
}
