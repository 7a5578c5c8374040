//! # whiteboard-gateway
//!
//! Real-time room coordinator for a collaborative whiteboard.
//!
//! Clients connect over WebSocket with a signed credential, ask to enter a
//! room (the host approves), then exchange drawing actions, chat messages
//! and WebRTC signaling with everyone in it. Drawing history is persisted
//! best-effort and replayed to late joiners. A small REST API creates,
//! lists and deletes rooms.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP, WebSocket)
//!     │
//!     ├── REST Handlers (api/)          ├── WS upgrade + loop (ws/)
//!     │                                 │
//!     ├── RoomService (service/)        │
//!     │                                 │
//!     └──────────── Coordinator (coordinator/) ───────────┐
//!            ├── ConnectionRegistry   ├── RoomChannel     │
//!            ├── AdmissionController  ├── HistorySynchronizer
//!            ├── SignalingRelay       └── ChatRelay       │
//!                                                         │
//!     RoomStore / HistoryStore (persistence/) ◄───────────┘
//!            ├── PostgreSQL (sqlx)
//!            └── in-memory
//! ```

pub mod api;
pub mod app_state;
pub mod auth;
pub mod config;
pub mod coordinator;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod service;
pub mod ws;
