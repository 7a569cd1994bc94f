//! Error types for the transient cache
//!
//! Provides unified error handling using thiserror. Store writes report
//! failure as `false` rather than through these types.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the HTTP surface.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key not found in the store
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// No regenerator registered under the given name
    #[error("Unknown regenerator: {0}")]
    UnknownRegenerator(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::UnknownRegenerator(_) => StatusCode::BAD_REQUEST,
            CacheError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Regeneration Failure ==
/// A regeneration function returned an error.
#[derive(Error, Debug)]
#[error("regeneration `{id}` failed: {error}")]
pub struct RegenerationFailure {
    /// Identity token of the failed regeneration
    pub id: String,
    /// Error returned by the regeneration function
    pub error: anyhow::Error,
}

// == Result Type Alias ==
/// Convenience Result type for the HTTP surface.
pub type Result<T> = std::result::Result<T, CacheError>;
