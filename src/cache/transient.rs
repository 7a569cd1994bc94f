//! Transient Store Module
//!
//! Lays a cached value and its expiry out as two options:
//! `<prefix><name>` holds the JSON value and `<prefix>timeout_<name>` holds
//! the Unix second at which it goes stale. Entries without an expiry are
//! preloaded, so their freshness never costs a point read.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::cache::Clock;
use crate::store::{OptionStore, Preload};

// == Lookup ==
/// A raw value together with its freshness verdict.
#[derive(Debug, Clone, PartialEq)]
pub struct Lookup<T> {
    /// The stored value, `None` when missing or undecodable
    pub value: Option<T>,
    /// Whether the entry should be regenerated
    pub stale: bool,
}

// == Transient Store ==
/// Two-key transient persistence on top of an `OptionStore`.
#[derive(Clone)]
pub struct TransientStore {
    options: Arc<dyn OptionStore>,
    prefix: String,
    clock: Arc<dyn Clock>,
}

impl TransientStore {
    // == Constructor ==
    /// Creates a store namespacing every option under `prefix`.
    pub fn new(
        options: Arc<dyn OptionStore>,
        prefix: impl Into<String>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            options,
            prefix: prefix.into(),
            clock,
        }
    }

    /// Option key holding the value of `name`.
    pub fn value_key(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }

    /// Option key holding the expiry of `name`.
    pub fn timeout_key(&self, name: &str) -> String {
        format!("{}timeout_{}", self.prefix, name)
    }

    /// Current time according to the store's clock.
    pub fn now(&self) -> i64 {
        self.clock.now()
    }

    // == Get ==
    /// Returns the stored value without any freshness logic.
    pub fn get<T: DeserializeOwned>(&self, name: &str) -> Option<T> {
        let key = self.value_key(name);
        let bytes = self.options.read(&key)?;
        match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(key = %key, error = %err, "Stored transient could not be decoded");
                None
            }
        }
    }

    // == Expires At ==
    /// Returns the expiry timestamp of `name`, if it has a readable one.
    pub fn expires_at(&self, name: &str) -> Option<i64> {
        let key = self.timeout_key(name);
        let bytes = self.options.read(&key)?;
        decode_expiry(&key, &bytes)
    }

    // == Lookup ==
    /// Reads `name` and decides whether it is stale.
    ///
    /// An entry is stale when its value is missing, or when its value is not
    /// preloaded and its expiry lies strictly in the past. An expiry that
    /// cannot be decoded counts as past.
    pub fn lookup<T: DeserializeOwned>(&self, name: &str) -> Lookup<T> {
        let mut stale = false;

        if !self.options.is_preloaded(&self.value_key(name)) {
            let key = self.timeout_key(name);
            if let Some(bytes) = self.options.read(&key) {
                stale = match decode_expiry(&key, &bytes) {
                    Some(expires_at) => expires_at < self.now(),
                    None => true,
                };
            }
        }

        let value = self.get(name);
        if value.is_none() {
            stale = true;
        }

        Lookup { value, stale }
    }

    // == Set ==
    /// Stores `value` under `name`, expiring after `ttl` seconds (0 = never).
    ///
    /// An entry changing between permanent and expiring is removed and added
    /// again so its preload hint follows. Returns whether every write
    /// succeeded; a value is never left expiring without its expiry key.
    pub fn set<T: Serialize + ?Sized>(&self, name: &str, value: &T, ttl: u64) -> bool {
        let bytes = match serde_json::to_vec(value) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(name = %name, error = %err, "Transient value could not be encoded");
                return false;
            }
        };

        let value_key = self.value_key(name);
        let timeout_key = self.timeout_key(name);
        let expires_at = self
            .now()
            .saturating_add(i64::try_from(ttl).unwrap_or(i64::MAX));

        if self.options.read(&value_key).is_none() {
            if ttl > 0 {
                if !self.write_timeout(&timeout_key, expires_at) {
                    return false;
                }
                return self.options.add(&value_key, bytes, Preload::OnDemand);
            }
            // An orphaned expiry must not outlive a value re-added as permanent
            self.options.remove(&timeout_key);
            return self.options.add(&value_key, bytes, Preload::Always);
        }

        let has_timeout = self.options.read(&timeout_key).is_some();
        match (ttl > 0, has_timeout) {
            (true, false) => {
                // A preloaded value left in place would never consult its expiry
                if !self.options.remove(&value_key) {
                    return false;
                }
                if !self.write_timeout(&timeout_key, expires_at) {
                    return false;
                }
                self.options.add(&value_key, bytes, Preload::OnDemand)
            }
            (true, true) => {
                self.write_timeout(&timeout_key, expires_at)
                    && self.options.update(&value_key, bytes)
            }
            (false, true) => {
                if !self.options.remove(&value_key) {
                    return false;
                }
                self.options.remove(&timeout_key);
                self.options.add(&value_key, bytes, Preload::Always)
            }
            (false, false) => self.options.update(&value_key, bytes),
        }
    }

    // == Delete ==
    /// Removes `name`. The expiry is only removed once the value is gone.
    pub fn delete(&self, name: &str) -> bool {
        let removed = self.options.remove(&self.value_key(name));
        if removed {
            self.options.remove(&self.timeout_key(name));
        }
        removed
    }

    fn write_timeout(&self, key: &str, expires_at: i64) -> bool {
        let bytes = expires_at.to_string().into_bytes();
        if self.options.read(key).is_some() {
            self.options.update(key, bytes)
        } else {
            self.options.add(key, bytes, Preload::OnDemand)
        }
    }
}

fn decode_expiry(key: &str, bytes: &[u8]) -> Option<i64> {
    match serde_json::from_slice(bytes) {
        Ok(expires_at) => Some(expires_at),
        Err(err) => {
            warn!(key = %key, error = %err, "Stored expiry could not be decoded");
            None
        }
    }
}

impl std::fmt::Debug for TransientStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransientStore")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}
