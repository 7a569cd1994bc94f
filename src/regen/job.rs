//! Regeneration Job Module
//!
//! A unit of regeneration work: a stable identity token, the ordered
//! arguments it runs with, and the function itself.

use std::sync::Arc;

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::RegenerationFailure;

/// Function invoked to regenerate one or more transients.
pub type RegenerateFn = Arc<dyn Fn(&[Value]) -> anyhow::Result<()> + Send + Sync>;

// == Regeneration ==
/// Regeneration work keyed by identity token and serialized arguments.
#[derive(Clone)]
pub struct Regeneration {
    id: String,
    args: Vec<Value>,
    run: RegenerateFn,
}

impl Regeneration {
    // == Constructor ==
    /// Creates a job.
    ///
    /// # Arguments
    /// * `id` - Stable name identifying the regeneration function
    /// * `args` - Ordered arguments passed to the function
    /// * `run` - The regeneration function
    pub fn new<F>(id: impl Into<String>, args: Vec<Value>, run: F) -> Self
    where
        F: Fn(&[Value]) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self::from_fn(id, args, Arc::new(run))
    }

    /// Creates a job from an already shared function.
    pub fn from_fn(id: impl Into<String>, args: Vec<Value>, run: RegenerateFn) -> Self {
        Self {
            id: id.into(),
            args,
            run,
        }
    }

    /// Identity token.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Arguments the function runs with.
    pub fn args(&self) -> &[Value] {
        &self.args
    }

    // == Dedup Hash ==
    /// SHA-256 over the identity token and the JSON-encoded arguments.
    ///
    /// Two jobs with the same hash collapse to one execution per lifecycle.
    pub fn dedup_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.id.as_bytes());
        hasher.update([0u8]);
        hasher.update(Value::Array(self.args.clone()).to_string().as_bytes());
        hex::encode(hasher.finalize())
    }

    // == Run ==
    /// Invokes the function with the bound arguments.
    pub fn run(&self) -> Result<(), RegenerationFailure> {
        (self.run)(&self.args).map_err(|error| RegenerationFailure {
            id: self.id.clone(),
            error,
        })
    }
}

impl std::fmt::Debug for Regeneration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Regeneration")
            .field("id", &self.id)
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}
