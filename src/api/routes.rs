//! API Routes
//!
//! Configures the Axum router with all transient server endpoints.

use axum::{
    middleware,
    routing::{delete, get, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    delete_handler, get_handler, health_handler, set_handler, stats_handler, AppState,
};
use super::middleware::lifecycle_layer;

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `PUT /set` - Store a transient
/// - `GET /get/:key` - Read a transient, regenerating it if stale
/// - `DELETE /del/:key` - Delete a transient
/// - `GET /stats` - Read and regeneration counters
/// - `GET /health` - Health check endpoint
///
/// # Middleware
/// - Lifecycle: one regeneration lifecycle per request
/// - CORS: Allows any origin (configurable for production)
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    // Configure CORS middleware
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build router with all endpoints
    Router::new()
        .route("/set", put(set_handler))
        .route("/get/:key", get(get_handler))
        .route("/del/:key", delete(delete_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(middleware::from_fn_with_state(state.clone(), lifecycle_layer))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
