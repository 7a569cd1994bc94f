//! Bound Transient Module
//!
//! Binds a key, fallback value, TTL, regeneration callback and its arguments
//! into one reusable handle. The callback only computes; persisting the
//! result is done by the handle.
//!
//! Each handle regenerates under its own identity, `bound:<key>#<handle>`, so
//! two handles on the same key with different callbacks never dedup into one
//! another. Clones of a handle share its identity.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::cache::AsyncTransients;
use crate::regen::{Lifecycle, RegenerateFn, Regeneration};

/// Computes a fresh value from the bound arguments.
pub type Callback<T> = Arc<dyn Fn(&[Value]) -> anyhow::Result<T> + Send + Sync>;

static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);

fn next_handle() -> u64 {
    NEXT_HANDLE.fetch_add(1, Ordering::Relaxed)
}

// == Bound Transient ==
#[derive(Clone)]
pub struct BoundTransient<T> {
    transients: AsyncTransients,
    key: String,
    handle: u64,
    default_value: T,
    ttl: u64,
    callback: Callback<T>,
    args: Vec<Value>,
    adapter: RegenerateFn,
}

impl<T> BoundTransient<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    // == Constructor ==
    /// Creates a handle.
    ///
    /// # Arguments
    /// * `transients` - Façade the value is read from and written to
    /// * `key` - Transient name
    /// * `default_value` - Returned while no value is stored
    /// * `ttl` - Seconds a regenerated value stays fresh (0 = never expires)
    /// * `callback` - Produces the value from `args`
    /// * `args` - Ordered arguments for `callback`
    pub fn new<F>(
        transients: AsyncTransients,
        key: impl Into<String>,
        default_value: T,
        ttl: u64,
        callback: F,
        args: Vec<Value>,
    ) -> Self
    where
        F: Fn(&[Value]) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        Self::from_callback(transients, key, default_value, ttl, Arc::new(callback), args)
    }

    /// Creates a handle from an already shared callback.
    pub fn from_callback(
        transients: AsyncTransients,
        key: impl Into<String>,
        default_value: T,
        ttl: u64,
        callback: Callback<T>,
        args: Vec<Value>,
    ) -> Self {
        let key = key.into();
        let adapter = build_adapter(&transients, &key, ttl, &callback);
        Self {
            transients,
            key,
            handle: next_handle(),
            default_value,
            ttl,
            callback,
            args,
            adapter,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn ttl(&self) -> u64 {
        self.ttl
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    // == Get ==
    /// Returns the stored value, or the default while none is stored.
    ///
    /// A stale or missing value schedules the bound callback on `lifecycle`.
    pub fn get(&self, lifecycle: &Lifecycle) -> T {
        self.transients
            .get(lifecycle, &self.key, self.regeneration())
            .unwrap_or_else(|| self.default_value.clone())
    }

    /// Identity token the regeneration job is deduplicated under.
    pub fn identity(&self) -> String {
        format!("bound:{}#{}", self.key, self.handle)
    }

    /// Regeneration job for the current bindings.
    pub fn regeneration(&self) -> Regeneration {
        Regeneration::from_fn(self.identity(), self.args.clone(), self.adapter.clone())
    }

    // == Setters ==
    pub fn set_default_value(&mut self, default_value: T) {
        self.default_value = default_value;
    }

    pub fn set_ttl(&mut self, ttl: u64) {
        self.ttl = ttl;
        self.rebuild();
    }

    pub fn set_callback<F>(&mut self, callback: F)
    where
        F: Fn(&[Value]) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        self.callback = Arc::new(callback);
        // A different callback is a different job
        self.handle = next_handle();
        self.rebuild();
    }

    pub fn set_arguments(&mut self, args: Vec<Value>) {
        self.args = args;
    }

    fn rebuild(&mut self) {
        self.adapter = build_adapter(&self.transients, &self.key, self.ttl, &self.callback);
    }
}

/// Wraps `callback` so its result is written back under `key`.
fn build_adapter<T>(
    transients: &AsyncTransients,
    key: &str,
    ttl: u64,
    callback: &Callback<T>,
) -> RegenerateFn
where
    T: Serialize + Send + Sync + 'static,
{
    let transients = transients.clone();
    let key = key.to_string();
    let callback = callback.clone();

    Arc::new(move |args: &[Value]| {
        let value = callback(args)?;
        if !transients.set(&key, &value, ttl) {
            warn!(key = %key, "Regenerated transient could not be stored");
            anyhow::bail!("store rejected regenerated value for `{}`", key);
        }
        Ok(())
    })
}

impl<T: std::fmt::Debug> std::fmt::Debug for BoundTransient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundTransient")
            .field("key", &self.key)
            .field("default_value", &self.default_value)
            .field("ttl", &self.ttl)
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{ManualClock, DEFAULT_PREFIX};
    use crate::regen::{DrainPolicy, InlineHost, ServerHost};
    use crate::store::MemoryOptionStore;
    use serde_json::json;

    const T0: i64 = 1_700_000_000;

    fn create_transients() -> (AsyncTransients, ManualClock) {
        let clock = ManualClock::new(T0);
        let transients = AsyncTransients::with_clock(
            Arc::new(MemoryOptionStore::new()),
            DEFAULT_PREFIX,
            Arc::new(clock.clone()),
        );
        (transients, clock)
    }

    fn deferred(transients: &AsyncTransients) -> Lifecycle {
        Lifecycle::begin(Arc::new(ServerHost), DrainPolicy::default(), transients.stats().clone())
    }

    fn greeting(transients: &AsyncTransients) -> BoundTransient<String> {
        BoundTransient::new(
            transients.clone(),
            "greeting",
            "fallback".to_string(),
            60,
            |args| {
                let name = args.first().and_then(Value::as_str).unwrap_or("world");
                Ok(format!("hello {}", name))
            },
            vec![json!("ada")],
        )
    }

    #[test]
    fn test_default_until_regenerated() {
        let (transients, _) = create_transients();
        let entry = greeting(&transients);

        let lifecycle = deferred(&transients);
        assert_eq!(entry.get(&lifecycle), "fallback");
        lifecycle.finish();

        let next = deferred(&transients);
        assert_eq!(entry.get(&next), "hello ada");
        assert_eq!(next.pending(), 0);
    }

    #[test]
    fn test_regenerated_value_uses_bound_ttl() {
        let (transients, _) = create_transients();
        let entry = greeting(&transients);

        let lifecycle = deferred(&transients);
        entry.get(&lifecycle);
        lifecycle.finish();

        assert_eq!(transients.store().expires_at("greeting"), Some(T0 + 60));
    }

    #[test]
    fn test_inline_get_returns_value_immediately() {
        let (transients, _) = create_transients();
        let entry = greeting(&transients);
        let lifecycle = Lifecycle::begin(Arc::new(InlineHost), DrainPolicy::default(), transients.stats().clone());

        assert_eq!(entry.get(&lifecycle), "hello ada");
    }

    #[test]
    fn test_set_ttl_rebuilds_adapter() {
        let (transients, _) = create_transients();
        let mut entry = greeting(&transients);
        entry.set_ttl(0);

        let lifecycle = deferred(&transients);
        entry.get(&lifecycle);
        lifecycle.finish();

        assert!(transients.store().expires_at("greeting").is_none());
    }

    #[test]
    fn test_set_callback_and_arguments() {
        let (transients, _) = create_transients();
        let mut entry = greeting(&transients);
        entry.set_callback(|args| Ok(format!("bye {}", args.len())));
        entry.set_arguments(vec![json!(1), json!(2)]);
        entry.set_default_value("waiting".to_string());

        let lifecycle = deferred(&transients);
        assert_eq!(entry.get(&lifecycle), "waiting");
        lifecycle.finish();

        assert_eq!(transients.peek::<String>("greeting").as_deref(), Some("bye 2"));
    }

    #[test]
    fn test_repeated_gets_queue_once() {
        let (transients, _) = create_transients();
        let entry = greeting(&transients);
        let lifecycle = deferred(&transients);

        entry.get(&lifecycle);
        entry.get(&lifecycle);

        assert_eq!(lifecycle.pending(), 1);
    }

    #[test]
    fn test_stale_value_served_over_default() {
        let (transients, clock) = create_transients();
        let entry = greeting(&transients);
        transients.set("greeting", "old", 1);
        clock.advance(5);

        let lifecycle = deferred(&transients);
        assert_eq!(entry.get(&lifecycle), "old");
        assert_eq!(lifecycle.pending(), 1);
    }

    #[test]
    fn test_callback_error_leaves_store_untouched() {
        let (transients, _) = create_transients();
        let entry: BoundTransient<String> = BoundTransient::new(
            transients.clone(),
            "broken",
            String::new(),
            60,
            |_| anyhow::bail!("no upstream"),
            vec![],
        );

        let lifecycle = deferred(&transients);
        entry.get(&lifecycle);
        let report = lifecycle.finish();

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].id, entry.identity());
        assert!(report.failures[0].id.starts_with("bound:broken#"));
        assert!(transients.peek::<String>("broken").is_none());
    }

    #[test]
    fn test_handles_on_same_key_do_not_dedup() {
        let (transients, _) = create_transients();
        let first = greeting(&transients);
        let mut second = greeting(&transients);
        second.set_callback(|_| Ok("from second".to_string()));
        let lifecycle = deferred(&transients);

        first.get(&lifecycle);
        second.get(&lifecycle);
        first.clone().get(&lifecycle);

        assert_ne!(first.identity(), second.identity());
        assert_eq!(lifecycle.pending(), 2);
    }
}
