//! Route table.

use crate::handlers::{self, devices, gateway, storage};
use crate::middleware::require_access;
use crate::state::AppState;
use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

/// Administrative routes, each behind the access middleware.
fn admin_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/devices", get(devices::list))
        .route("/devices/approve-all", post(devices::approve_all))
        .route("/devices/:request_id/approve", post(devices::approve))
        .route("/storage", get(storage::status))
        .route("/storage/test", get(storage::test))
        .route("/storage/sync", post(storage::sync))
        .route("/gateway/restart", post(gateway::restart))
        .route("/openclaw/version", get(gateway::version))
        .route("/openclaw/update", post(gateway::update))
        .route_layer(from_fn_with_state(state, require_access))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/api/admin", admin_routes(state.clone()))
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
