//! Lifecycle Module
//!
//! One `Lifecycle` spans one request/response cycle. It owns the executor
//! chosen for the cycle, the end-of-lifecycle hooks, and the finisher that
//! releases the client and drains deferred regeneration.
//!
//! ```text
//! Active --finish()--> Draining --> Terminated
//! ```

use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info, warn};

use crate::regen::{
    DeferredExecutor, DrainPolicy, DrainReport, ExecutionMode, Host, ImmediateExecutor,
    Regeneration, RegenerationExecutor, RegenerationStats, Submission,
};

/// Priority the finisher runs at. Hooks with a lower value run first.
pub const FINISH_PRIORITY: i32 = 100;

/// Priority for ordinary teardown hooks.
pub const DEFAULT_HOOK_PRIORITY: i32 = 10;

// == Lifecycle State ==
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Accepting regeneration work
    Active,
    /// The finisher is running queued work
    Draining,
    /// Finished; further work is refused
    Terminated,
}

enum EndHook {
    Finish,
    Custom(Box<dyn FnOnce() + Send>),
}

// == Lifecycle ==
/// Per-request regeneration context.
pub struct Lifecycle {
    host: Arc<dyn Host>,
    executor: Box<dyn RegenerationExecutor>,
    policy: DrainPolicy,
    stats: Arc<RegenerationStats>,
    state: Mutex<LifecycleState>,
    hooks: Mutex<Vec<(i32, EndHook)>>,
}

impl Lifecycle {
    // == Begin ==
    /// Starts a lifecycle on `host`.
    ///
    /// Deferred execution is picked when the host can detach the client,
    /// immediate execution otherwise. The finisher is registered here, once.
    pub fn begin(host: Arc<dyn Host>, policy: DrainPolicy, stats: Arc<RegenerationStats>) -> Self {
        let executor: Box<dyn RegenerationExecutor> = if host.supports_detach() {
            Box::new(DeferredExecutor::new())
        } else {
            Box::new(ImmediateExecutor)
        };

        Self {
            host,
            executor,
            policy,
            stats,
            state: Mutex::new(LifecycleState::Active),
            hooks: Mutex::new(vec![(FINISH_PRIORITY, EndHook::Finish)]),
        }
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn mode(&self) -> ExecutionMode {
        self.executor.mode()
    }

    pub fn policy(&self) -> DrainPolicy {
        self.policy
    }

    pub fn stats(&self) -> &Arc<RegenerationStats> {
        &self.stats
    }

    /// Number of regenerations waiting for the finisher.
    pub fn pending(&self) -> usize {
        self.executor.pending()
    }

    // == Submit ==
    /// Hands a regeneration to this lifecycle's executor.
    pub fn submit(&self, job: Regeneration) -> Submission {
        if self.state() != LifecycleState::Active {
            warn!(id = %job.id(), state = ?self.state(), "Regeneration refused by finishing lifecycle");
            self.stats.record_rejected();
            return Submission::Rejected;
        }

        let submission = self.executor.submit(job);
        match submission {
            Submission::Queued => self.stats.record_enqueued(),
            Submission::Deduplicated => self.stats.record_deduplicated(),
            Submission::Ran => self.stats.record_inline(true),
            Submission::Failed => self.stats.record_inline(false),
            Submission::Rejected => self.stats.record_rejected(),
        }
        submission
    }

    // == On End ==
    /// Registers `hook` to run when the lifecycle ends.
    ///
    /// Hooks run in ascending priority, ties in registration order. Hooks
    /// above `FINISH_PRIORITY` run after the drain and cannot submit work.
    pub fn on_end<F>(&self, priority: i32, hook: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.hooks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((priority, EndHook::Custom(Box::new(hook))));
    }

    // == End ==
    /// Runs every end-of-lifecycle hook, the finisher included.
    ///
    /// Only the first call does anything.
    pub fn end(&self) -> DrainReport {
        let mut hooks =
            std::mem::take(&mut *self.hooks.lock().unwrap_or_else(PoisonError::into_inner));
        hooks.sort_by_key(|(priority, _)| *priority);

        let mut report = DrainReport::default();
        for (_, hook) in hooks {
            match hook {
                EndHook::Finish => report = self.finish(),
                EndHook::Custom(hook) => hook(),
            }
        }
        report
    }

    // == Finish ==
    /// Releases the client and drains deferred regeneration.
    ///
    /// Without a detach primitive this is a no-op: every regeneration already
    /// ran during its read.
    pub fn finish(&self) -> DrainReport {
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if *state != LifecycleState::Active {
                return DrainReport::default();
            }
            *state = LifecycleState::Draining;
        }

        let queue = self.executor.take_pending();
        let report = match self.mode() {
            ExecutionMode::Immediate => {
                debug!("No detach primitive; nothing was deferred");
                DrainReport::default()
            }
            ExecutionMode::Deferred if queue.is_empty() => DrainReport::default(),
            ExecutionMode::Deferred => {
                if !self.host.detach_client() {
                    warn!("Client could not be detached; draining while attached");
                }
                self.host.clear_execution_time_limit();

                let queued = queue.len();
                let report = queue.drain(self.policy);
                self.stats.record_drain(&report);
                info!(
                    queued,
                    succeeded = report.succeeded(),
                    failed = report.failures.len(),
                    skipped = report.skipped,
                    "Deferred regeneration drained"
                );
                report
            }
        };

        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = LifecycleState::Terminated;
        report
    }
}

impl Drop for Lifecycle {
    fn drop(&mut self) {
        let pending = self.executor.pending();
        if pending > 0 {
            warn!(pending, "Lifecycle dropped without draining queued regeneration");
        }
    }
}

impl std::fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lifecycle")
            .field("mode", &self.mode())
            .field("state", &self.state())
            .field("pending", &self.pending())
            .field("policy", &self.policy)
            .finish()
    }
}
