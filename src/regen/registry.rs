//! Regenerator Registry Module
//!
//! Named value producers, looked up when a transient is read by name alone.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

/// Produces a fresh value from ordered arguments.
pub type RegeneratorFn = Arc<dyn Fn(&[Value]) -> anyhow::Result<Value> + Send + Sync>;

// == Regenerator Registry ==
#[derive(Clone, Default)]
pub struct RegeneratorRegistry {
    regenerators: HashMap<String, RegeneratorFn>,
}

impl RegeneratorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `regenerator` under `name`, replacing any previous one.
    pub fn register<F>(&mut self, name: impl Into<String>, regenerator: F) -> &mut Self
    where
        F: Fn(&[Value]) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.regenerators.insert(name.into(), Arc::new(regenerator));
        self
    }

    pub fn get(&self, name: &str) -> Option<RegeneratorFn> {
        self.regenerators.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.regenerators.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.regenerators.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for RegeneratorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegeneratorRegistry")
            .field("names", &self.names())
            .finish()
    }
}
