//! REST API layer: route handlers, DTOs, and router composition.
//!
//! Room endpoints are mounted under `/api/v1`; `/health`, `/ws` and the
//! optional `/auth/dev-token` sit at the root.

pub mod dto;
pub mod extract;
pub mod handlers;

use std::time::Duration;

use axum::Router;
use axum::http::HeaderValue;
use axum::routing::get;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::app_state::AppState;
use crate::ws::handler::ws_handler;

/// OpenAPI document for the REST surface.
#[derive(Debug, OpenApi)]
#[openapi(
    info(title = "whiteboard-gateway", description = "Room coordination API for the collaborative whiteboard"),
    paths(
        handlers::rooms::create_room,
        handlers::rooms::list_rooms,
        handlers::rooms::get_room,
        handlers::rooms::join_room,
        handlers::rooms::room_history,
        handlers::rooms::delete_room,
        handlers::system::health_handler,
        handlers::auth::issue_dev_token,
    ),
    components(schemas(
        dto::CreateRoomRequest,
        dto::RoomResponse,
        dto::RoomSummaryDto,
        dto::RoomListResponse,
        dto::HistoryResponse,
        dto::DevTokenRequest,
        dto::DevTokenResponse,
        handlers::system::HealthResponse,
        crate::error::ErrorResponse,
        crate::error::ErrorBody,
        crate::persistence::PersistenceStatsSnapshot,
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "Rooms", description = "Room lifecycle"),
        (name = "System", description = "Health"),
        (name = "Auth", description = "Development credentials"),
    )
)]
pub struct ApiDoc;

#[derive(Debug)]
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
        );
    }
}

/// Builds the REST router: `/api/v1` room routes plus system routes.
pub fn build_router(dev_tokens: bool) -> Router<AppState> {
    let router = Router::new()
        .nest("/api/v1", handlers::routes())
        .merge(handlers::system::routes());
    if dev_tokens {
        router.merge(handlers::auth::routes())
    } else {
        router
    }
}

/// Builds the complete application: REST, WebSocket, tracing and CORS.
pub fn build_app(state: AppState) -> Router {
    let config = &state.config;
    let cors = match config
        .frontend_origin
        .as_deref()
        .and_then(|origin| HeaderValue::from_str(origin).ok())
    {
        Some(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods(Any)
            .allow_headers(Any),
        None => CorsLayer::permissive(),
    };

    let rest = build_router(config.auth_dev_tokens).layer(TimeoutLayer::new(Duration::from_secs(
        config.request_timeout_secs,
    )));

    let router = Router::new()
        .merge(rest)
        .route("/ws", get(ws_handler));

    #[cfg(feature = "swagger-ui")]
    let router = router.merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
            .url("/api-docs/openapi.json", ApiDoc::openapi()),
    );

    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
