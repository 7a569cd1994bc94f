//! Regeneration Module
//!
//! Deferred, deduplicated regeneration of stale transients: jobs, the
//! per-lifecycle queue, execution strategies, and the lifecycle finisher.

mod executor;
mod host;
mod job;
mod lifecycle;
mod queue;
mod registry;
mod stats;

// Re-export public types
pub use executor::{
    DeferredExecutor, ExecutionMode, ImmediateExecutor, RegenerationExecutor, Submission,
};
pub use host::{Host, InlineHost, ServerHost};
pub use job::{RegenerateFn, Regeneration};
pub use lifecycle::{Lifecycle, LifecycleState, DEFAULT_HOOK_PRIORITY, FINISH_PRIORITY};
pub use queue::{DrainPolicy, DrainReport, RegenerationQueue};
pub use registry::{RegeneratorFn, RegeneratorRegistry};
pub use stats::{RegenerationStats, StatsSnapshot};
