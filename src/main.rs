//! Async Transients - stale-while-revalidate transient server
//!
//! Serves JSON transients over HTTP and regenerates stale ones after each
//! response has been sent.

use std::net::SocketAddr;
use std::time::Instant;

use anyhow::Context;
use serde_json::{json, Value};
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use async_transients::api::{create_router, AppState};
use async_transients::regen::RegeneratorRegistry;
use async_transients::Config;

/// Main entry point for the transient server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Register the built-in regenerators
/// 4. Create Axum router with all endpoints
/// 5. Start HTTP server on configured port
/// 6. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber with env filter
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "async_transients=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting async transient server");

    // Load configuration from environment variables
    let config = Config::from_env();
    info!(
        "Configuration loaded: prefix={}, default_ttl={}s, port={}, defer={}, drain_policy={:?}",
        config.key_prefix,
        config.default_ttl,
        config.server_port,
        config.defer_regeneration,
        config.drain_policy
    );

    let registry = builtin_regenerators();
    info!(regenerators = ?registry.names(), "Regenerators registered");

    let state = AppState::from_config(&config, registry);
    let app = create_router(state);

    // Bind to configured port
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    // Start server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Regenerators available to `GET /get/:key`.
fn builtin_regenerators() -> RegeneratorRegistry {
    let started = Instant::now();
    let mut registry = RegeneratorRegistry::new();

    registry
        .register("server_time", |_| {
            Ok(json!({ "now": chrono::Utc::now().to_rfc3339() }))
        })
        .register("uptime", move |_| {
            Ok(json!({ "seconds": started.elapsed().as_secs() }))
        })
        .register("greeting", |args: &[Value]| {
            let name = args.first().and_then(Value::as_str).unwrap_or("world");
            Ok(Value::String(format!("Hello, {}!", name)))
        });

    registry
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
