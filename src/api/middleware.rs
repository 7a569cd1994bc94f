//! Lifecycle Middleware
//!
//! Gives every request its own regeneration lifecycle and ends it once the
//! response has been produced. Queued regeneration is drained on a blocking
//! task so the response goes out without waiting for it.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use super::handlers::AppState;
use crate::regen::ExecutionMode;

/// Begins a lifecycle, exposes it to handlers as `Extension<Arc<Lifecycle>>`,
/// and ends it after the handler returns.
pub async fn lifecycle_layer(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let lifecycle = Arc::new(state.begin_lifecycle());
    request.extensions_mut().insert(lifecycle.clone());

    let response = next.run(request).await;

    if lifecycle.mode() == ExecutionMode::Deferred && lifecycle.pending() > 0 {
        debug!(pending = lifecycle.pending(), "Deferring regeneration past the response");
        tokio::task::spawn_blocking(move || {
            lifecycle.end();
        });
    } else {
        lifecycle.end();
    }

    response
}
