//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::auth::CredentialVerifier;
use crate::config::GatewayConfig;
use crate::coordinator::Coordinator;
use crate::persistence::{HistoryStore, PersistenceStats, RoomStore};
use crate::service::RoomService;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Live room coordination for WebSocket sessions.
    pub coordinator: Arc<Coordinator>,
    /// Room service for the REST API.
    pub room_service: Arc<RoomService>,
    /// Credential verifier shared by REST and WebSocket authentication.
    pub verifier: Arc<CredentialVerifier>,
    /// Persistence counters reported on `/health`.
    pub stats: Arc<PersistenceStats>,
    /// Loaded configuration.
    pub config: Arc<GatewayConfig>,
}

impl AppState {
    /// Wires the coordinator, service and verifier over the given stores.
    #[must_use]
    pub fn new(
        config: GatewayConfig,
        rooms: Arc<dyn RoomStore>,
        histories: Arc<dyn HistoryStore>,
    ) -> Self {
        let stats = Arc::new(PersistenceStats::new());
        let coordinator = Arc::new(Coordinator::new(
            rooms,
            histories,
            config.join_approval_policy,
            Arc::clone(&stats),
        ));
        let room_service = Arc::new(RoomService::new(
            Arc::clone(&coordinator),
            config.public_room_list_limit,
        ));
        let verifier = Arc::new(CredentialVerifier::new(
            config.auth_secret.as_bytes(),
            chrono::Duration::try_seconds(config.credential_ttl_secs)
                .unwrap_or_else(chrono::Duration::zero),
        ));
        Self {
            coordinator,
            room_service,
            verifier,
            stats,
            config: Arc::new(config),
        }
    }
}
