//! Route configuration.

use crate::handlers;
use crate::state::AppState;
use axum::Router;
use axum::routing::{get, put};
use tower_http::trace::TraceLayer;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check (intentionally unauthenticated for load balancers)
        .route("/v1/health", get(handlers::health_check))
        // File plane
        .route(
            "/v1/files/{name}",
            put(handlers::put_file).get(handlers::get_file),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
