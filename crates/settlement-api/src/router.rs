//! Axum router construction for the settlement engine's server.
//!
//! Assembles the player-facing event channel and the admin REST surface
//! into a single [`Router`] with CORS restricted to the configured
//! origins.

use axum::middleware;
use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::AdminSession;
use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router for the settlement engine server.
///
/// - `GET /ws` -- the player event channel (authenticate, join-world,
///   construction and structure commands, server-pushed state)
/// - `/admin/*`, `/servers*`, `/worlds*`, `/structures*` -- the admin REST
///   surface, gated behind [`AdminSession`] except the metadata read
/// - `PUT /test/elevate-admin/{email}` -- only mounted when
///   `config.server.node_env == "test"`
///
/// CORS allows exactly the origins listed in `config.server.cors_origins`.
#[must_use]
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(allowed_origins(&state.config.server.cors_origins))
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any);

    let admin_session_layer = middleware::from_extractor_with_state::<AdminSession, AppState>(state.clone());

    let admin_routes = Router::new()
        .route("/admin/dashboard", get(handlers::dashboard))
        .route("/servers", get(handlers::list_servers).post(handlers::create_server))
        .route(
            "/servers/{id}",
            get(handlers::get_server).patch(handlers::update_server).delete(handlers::delete_server),
        )
        .route("/worlds", get(handlers::list_worlds).post(handlers::create_world))
        .route("/worlds/{id}", get(handlers::get_world).delete(handlers::delete_world))
        .route("/structures/create", post(handlers::create_structure))
        .route("/structures/{id}/upgrade", post(handlers::upgrade_structure))
        .route("/structures/{id}", delete(handlers::demolish_structure))
        .route("/structures/by-settlement/{id}", get(handlers::structures_by_settlement))
        .route("/admin/disasters/trigger", post(handlers::trigger_disaster))
        .route("/admin/disasters/clear", post(handlers::clear_disasters))
        .route_layer(admin_session_layer);

    let mut router = Router::new()
        .route("/ws", get(ws::connect))
        .route("/structures/metadata", get(handlers::structure_metadata))
        .merge(admin_routes);

    if state.config.server.node_env == "test" {
        router = router.route("/test/elevate-admin/{email}", put(handlers::elevate_admin));
    }

    router.layer(cors).layer(TraceLayer::new_for_http()).with_state(state)
}

/// Build a `CorsLayer` origin matcher from the configured allow-list.
/// `["*"]` (or an empty list) is treated as "allow any origin", the
/// development-mode default.
fn allowed_origins(configured: &[String]) -> AllowOrigin {
    if configured.is_empty() || configured.iter().any(|origin| origin == "*") {
        return AllowOrigin::any();
    }
    let origins: Vec<_> = configured.iter().filter_map(|origin| origin.parse().ok()).collect();
    AllowOrigin::list(origins)
}
