//! API Handlers
//!
//! HTTP request handlers for each transient server endpoint.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde_json::Value;

use crate::cache::{AsyncTransients, BoundTransient, SystemClock};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{
    validate_key, DeleteResponse, GetQuery, GetResponse, HealthResponse, SetRequest, SetResponse,
    StatsResponse,
};
use crate::regen::{
    DrainPolicy, ExecutionMode, Host, InlineHost, Lifecycle, RegeneratorRegistry, ServerHost,
};
use crate::store::MemoryOptionStore;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Transient façade over the shared option store
    pub transients: AsyncTransients,
    /// Regenerators addressable by name
    pub registry: Arc<RegeneratorRegistry>,
    /// Detach capabilities of this server
    pub host: Arc<dyn Host>,
    /// Failure handling for deferred drains
    pub drain_policy: DrainPolicy,
    /// TTL used when a request names none
    pub default_ttl: u64,
}

impl AppState {
    /// Creates a new AppState.
    pub fn new(
        transients: AsyncTransients,
        registry: RegeneratorRegistry,
        host: Arc<dyn Host>,
        drain_policy: DrainPolicy,
        default_ttl: u64,
    ) -> Self {
        Self {
            transients,
            registry: Arc::new(registry),
            host,
            drain_policy,
            default_ttl,
        }
    }

    /// Creates a new AppState from configuration.
    ///
    /// Backs the transients with an in-memory option store and picks the
    /// host from `defer_regeneration`.
    pub fn from_config(config: &Config, registry: RegeneratorRegistry) -> Self {
        let transients = AsyncTransients::with_clock(
            Arc::new(MemoryOptionStore::new()),
            config.key_prefix.clone(),
            Arc::new(SystemClock),
        );
        let host: Arc<dyn Host> = if config.defer_regeneration {
            Arc::new(ServerHost)
        } else {
            Arc::new(InlineHost)
        };
        Self::new(
            transients,
            registry,
            host,
            config.drain_policy,
            config.default_ttl,
        )
    }

    /// Begins the regeneration lifecycle of one request.
    pub fn begin_lifecycle(&self) -> Lifecycle {
        Lifecycle::begin(
            self.host.clone(),
            self.drain_policy,
            self.transients.stats().clone(),
        )
    }
}

/// Handler for PUT /set
///
/// Stores a JSON value under a key with optional TTL.
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    // Validate request
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let ttl = req.ttl.unwrap_or(state.default_ttl);
    if !state.transients.set(&req.key, &req.value, ttl) {
        return Err(CacheError::Internal(format!(
            "Store rejected write for '{}'",
            req.key
        )));
    }

    Ok(Json(SetResponse::new(req.key)))
}

/// Handler for GET /get/:key
///
/// Serves the stored value. When a regenerator applies, a stale or missing
/// value is regenerated through the request's lifecycle and `null` stands in
/// for a value that does not exist yet. An inline lifecycle runs the
/// regenerator on the blocking pool.
pub async fn get_handler(
    State(state): State<AppState>,
    Extension(lifecycle): Extension<Arc<Lifecycle>>,
    Path(key): Path<String>,
    Query(query): Query<GetQuery>,
) -> Result<Json<GetResponse>> {
    if let Some(error_msg) = validate_key(&key) {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let regenerator = match query.regenerator.as_deref() {
        Some(name) => Some(
            state
                .registry
                .get(name)
                .ok_or_else(|| CacheError::UnknownRegenerator(name.to_string()))?,
        ),
        None => state.registry.get(&key),
    };

    let value = match regenerator {
        Some(regenerator) => {
            let entry = BoundTransient::from_callback(
                state.transients.clone(),
                key.clone(),
                Value::Null,
                query.ttl.unwrap_or(state.default_ttl),
                regenerator,
                query.parsed_args(),
            );
            match lifecycle.mode() {
                ExecutionMode::Deferred => entry.get(&lifecycle),
                ExecutionMode::Immediate => {
                    tokio::task::spawn_blocking(move || entry.get(&lifecycle))
                        .await
                        .map_err(|err| {
                            CacheError::Internal(format!("Regeneration task failed: {}", err))
                        })?
                }
            }
        }
        None => state
            .transients
            .peek::<Value>(&key)
            .ok_or_else(|| CacheError::NotFound(key.clone()))?,
    };

    Ok(Json(GetResponse::new(key, value)))
}

/// Handler for DELETE /del/:key
///
/// Deletes a key and its expiry.
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>> {
    if !state.transients.delete(&key) {
        return Err(CacheError::NotFound(key));
    }

    Ok(Json(DeleteResponse::new(key)))
}

/// Handler for GET /stats
///
/// Returns read and regeneration counters.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::from(state.transients.stats().snapshot()))
}

/// Handler for GET /health
///
/// Returns health status of the server.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;
    use std::thread::{self, ThreadId};

    fn create_state(config: &Config) -> AppState {
        let mut registry = RegeneratorRegistry::new();
        registry.register("answer", |_| Ok(json!(42)));
        AppState::from_config(config, registry)
    }

    #[tokio::test]
    async fn test_set_and_get_handler() {
        let state = create_state(&Config::default());
        let lifecycle = Arc::new(state.begin_lifecycle());

        // Set a value
        let req = SetRequest {
            key: "test_key".to_string(),
            value: json!("test_value"),
            ttl: None,
        };
        let result = set_handler(State(state.clone()), Json(req)).await;
        assert!(result.is_ok());

        // Get the value
        let result = get_handler(
            State(state.clone()),
            Extension(lifecycle),
            Path("test_key".to_string()),
            Query(GetQuery::default()),
        )
        .await;
        let response = result.unwrap();
        assert_eq!(response.value, json!("test_value"));
    }

    #[tokio::test]
    async fn test_get_nonexistent_key() {
        let state = create_state(&Config::default());
        let lifecycle = Arc::new(state.begin_lifecycle());

        let result = get_handler(
            State(state),
            Extension(lifecycle),
            Path("nonexistent".to_string()),
            Query(GetQuery::default()),
        )
        .await;
        assert!(matches!(result, Err(CacheError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_get_registered_key_defers() {
        let state = create_state(&Config::default());
        let lifecycle = Arc::new(state.begin_lifecycle());
        assert_eq!(lifecycle.mode(), ExecutionMode::Deferred);

        let response = get_handler(
            State(state.clone()),
            Extension(lifecycle.clone()),
            Path("answer".to_string()),
            Query(GetQuery::default()),
        )
        .await
        .unwrap();
        assert!(response.value.is_null());
        assert_eq!(lifecycle.pending(), 1);

        lifecycle.end();
        assert_eq!(state.transients.peek::<Value>("answer"), Some(json!(42)));
    }

    #[tokio::test]
    async fn test_get_registered_key_inline() {
        let config = Config {
            defer_regeneration: false,
            ..Config::default()
        };
        let state = create_state(&config);
        let lifecycle = Arc::new(state.begin_lifecycle());

        let response = get_handler(
            State(state),
            Extension(lifecycle),
            Path("answer".to_string()),
            Query(GetQuery::default()),
        )
        .await
        .unwrap();
        assert_eq!(response.value, json!(42));
    }

    #[tokio::test]
    async fn test_inline_regeneration_runs_off_the_runtime_thread() {
        let config = Config {
            defer_regeneration: false,
            ..Config::default()
        };
        let ran_on: Arc<Mutex<Option<ThreadId>>> = Arc::new(Mutex::new(None));
        let recorded = ran_on.clone();
        let mut registry = RegeneratorRegistry::new();
        registry.register("where", move |_| {
            *recorded.lock().unwrap() = Some(thread::current().id());
            Ok(json!("here"))
        });
        let state = AppState::from_config(&config, registry);
        let lifecycle = Arc::new(state.begin_lifecycle());

        let response = get_handler(
            State(state),
            Extension(lifecycle),
            Path("where".to_string()),
            Query(GetQuery::default()),
        )
        .await
        .unwrap();

        assert_eq!(response.value, json!("here"));
        let regenerator_thread = (*ran_on.lock().unwrap()).expect("regenerator ran");
        assert_ne!(regenerator_thread, thread::current().id());
    }

    #[tokio::test]
    async fn test_get_unknown_regenerator() {
        let state = create_state(&Config::default());
        let lifecycle = Arc::new(state.begin_lifecycle());

        let result = get_handler(
            State(state),
            Extension(lifecycle),
            Path("anything".to_string()),
            Query(GetQuery {
                regenerator: Some("missing".to_string()),
                ..Default::default()
            }),
        )
        .await;
        assert!(matches!(result, Err(CacheError::UnknownRegenerator(_))));
    }

    #[tokio::test]
    async fn test_delete_handler() {
        let state = create_state(&Config::default());
        state.transients.set("to_delete", "value", 60);

        let result = delete_handler(State(state.clone()), Path("to_delete".to_string())).await;
        assert!(result.is_ok());

        let result = delete_handler(State(state), Path("to_delete".to_string())).await;
        assert!(matches!(result, Err(CacheError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_stats_handler() {
        let state = create_state(&Config::default());

        let response = stats_handler(State(state)).await;
        assert_eq!(response.counters.fresh_reads, 0);
        assert_eq!(response.counters.stale_reads, 0);
    }

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler().await;
        assert_eq!(response.status, "healthy");
    }

    #[tokio::test]
    async fn test_set_invalid_request() {
        let state = create_state(&Config::default());

        let req = SetRequest {
            key: "".to_string(), // Empty key is invalid
            value: json!("value"),
            ttl: None,
        };
        let result = set_handler(State(state), Json(req)).await;
        assert!(result.is_err());
    }
}
