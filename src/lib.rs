//! Async Transients - stale-while-revalidate caching with deferred regeneration
//!
//! Expired or missing transients are served as they are and regenerated after
//! the response has been delivered, at most once per request for the same
//! regeneration and arguments.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod regen;
pub mod store;

pub use api::AppState;
pub use cache::{AsyncTransients, BoundTransient};
pub use config::Config;
pub use regen::{Lifecycle, Regeneration};
