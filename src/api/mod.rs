//! API Module
//!
//! HTTP handlers, lifecycle middleware and routing for the transient server.
//!
//! # Endpoints
//! - `PUT /set` - Store a transient
//! - `GET /get/:key` - Read a transient, regenerating it if stale
//! - `DELETE /del/:key` - Delete a transient
//! - `GET /stats` - Read and regeneration counters
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod middleware;
pub mod routes;

pub use handlers::*;
pub use middleware::lifecycle_layer;
pub use routes::create_router;
