//! Async Transients Façade
//!
//! Stale-while-revalidate reads and writes. A read always returns what is
//! stored right now; a stale read also hands a regeneration to the caller's
//! lifecycle.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::cache::{Clock, SystemClock, TransientStore, DEFAULT_PREFIX};
use crate::regen::{Lifecycle, Regeneration, RegenerationStats};
use crate::store::OptionStore;

// == Async Transients ==
/// Cheaply cloneable handle to a transient namespace.
#[derive(Debug, Clone)]
pub struct AsyncTransients {
    store: TransientStore,
    stats: Arc<RegenerationStats>,
}

impl AsyncTransients {
    // == Constructor ==
    /// Creates a façade over `options` with the default prefix and wall clock.
    pub fn new(options: Arc<dyn OptionStore>) -> Self {
        Self::with_clock(options, DEFAULT_PREFIX, Arc::new(SystemClock))
    }

    /// Creates a façade with an explicit prefix and clock.
    pub fn with_clock(
        options: Arc<dyn OptionStore>,
        prefix: impl Into<String>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store: TransientStore::new(options, prefix, clock),
            stats: Arc::new(RegenerationStats::new()),
        }
    }

    /// Underlying two-key store.
    pub fn store(&self) -> &TransientStore {
        &self.store
    }

    /// Counters shared with every lifecycle begun for this façade.
    pub fn stats(&self) -> &Arc<RegenerationStats> {
        &self.stats
    }

    // == Get ==
    /// Returns the stored value of `name`, scheduling `regeneration` if it is
    /// stale or missing.
    ///
    /// When the lifecycle ran the regeneration inline, the value is read
    /// again so the caller sees the refreshed result.
    pub fn get<T: DeserializeOwned>(
        &self,
        lifecycle: &Lifecycle,
        name: &str,
        regeneration: Regeneration,
    ) -> Option<T> {
        let lookup = self.store.lookup(name);
        if !lookup.stale {
            self.stats.record_fresh_read();
            return lookup.value;
        }

        self.stats.record_stale_read();
        debug!(name = %name, id = %regeneration.id(), "Stale transient read");

        if lifecycle.submit(regeneration).ran_inline() {
            return self.store.get(name);
        }
        lookup.value
    }

    // == Peek ==
    /// Returns the stored value of `name` without any freshness logic.
    pub fn peek<T: DeserializeOwned>(&self, name: &str) -> Option<T> {
        self.store.get(name)
    }

    // == Set ==
    /// Stores `value`, expiring after `ttl` seconds (0 = never).
    pub fn set<T: Serialize + ?Sized>(&self, name: &str, value: &T, ttl: u64) -> bool {
        self.store.set(name, value, ttl)
    }

    // == Delete ==
    /// Deletes `name`. Returns false if the value could not be removed.
    pub fn delete(&self, name: &str) -> bool {
        self.store.delete(name)
    }
}
