//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;

use crate::cache::DEFAULT_PREFIX;
use crate::regen::DrainPolicy;

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Prefix applied to every option key
    pub key_prefix: String,
    /// TTL in seconds used when a request does not name one
    pub default_ttl: u64,
    /// HTTP server port
    pub server_port: u16,
    /// Whether stale reads defer regeneration until after the response
    pub defer_regeneration: bool,
    /// Behaviour of a drain after a regeneration fails
    pub drain_policy: DrainPolicy,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `KEY_PREFIX` - Option key prefix (default: `_async_transient_`)
    /// - `DEFAULT_TTL` - Default TTL in seconds (default: 300)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `DEFER_REGENERATION` - `true`/`false` (default: true)
    /// - `DRAIN_POLICY` - `continue` or `fail-fast` (default: continue)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            key_prefix: env::var("KEY_PREFIX")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.key_prefix),
            default_ttl: env::var("DEFAULT_TTL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.default_ttl),
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.server_port),
            defer_regeneration: env::var("DEFER_REGENERATION")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.defer_regeneration),
            drain_policy: env::var("DRAIN_POLICY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.drain_policy),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            key_prefix: DEFAULT_PREFIX.to_string(),
            default_ttl: 300,
            server_port: 3000,
            defer_regeneration: true,
            drain_policy: DrainPolicy::ContinueOnError,
        }
    }
}
