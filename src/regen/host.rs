//! Host Module
//!
//! The environment a lifecycle runs in: whether the client can be released
//! before teardown finishes, and how to do it.

use tracing::debug;

// == Host ==
/// Detach primitives offered by the serving environment.
pub trait Host: Send + Sync {
    /// Capability probe. Queried once when a lifecycle begins.
    fn supports_detach(&self) -> bool;

    /// Releases the client so it stops waiting on this lifecycle.
    ///
    /// Returns false if the client could not be released.
    fn detach_client(&self) -> bool;

    /// Lifts any execution deadline for the rest of the lifecycle.
    fn clear_execution_time_limit(&self);
}

// == Server Host ==
/// Host for the HTTP server.
///
/// The lifecycle middleware hands the response back before ending the
/// lifecycle on a blocking task, so the client is already released when the
/// finisher runs and background work is not bound by request timeouts.
#[derive(Debug, Clone, Copy, Default)]
pub struct ServerHost;

impl Host for ServerHost {
    fn supports_detach(&self) -> bool {
        true
    }

    fn detach_client(&self) -> bool {
        debug!("Response handed back; continuing detached");
        true
    }

    fn clear_execution_time_limit(&self) {}
}

// == Inline Host ==
/// Host without a detach primitive. Regeneration runs during the read.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineHost;

impl Host for InlineHost {
    fn supports_detach(&self) -> bool {
        false
    }

    fn detach_client(&self) -> bool {
        false
    }

    fn clear_execution_time_limit(&self) {}
}
