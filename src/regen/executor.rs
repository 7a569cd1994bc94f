//! Executor Module
//!
//! Strategies deciding when submitted regeneration work runs. One is chosen
//! per lifecycle from the host's capability probe.

use std::sync::{Mutex, PoisonError};

use tracing::warn;

use crate::regen::{Regeneration, RegenerationQueue};

// == Execution Mode ==
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Queued and run after the client is released
    Deferred,
    /// Run on the spot, before the read returns
    Immediate,
}

// == Submission ==
/// What happened to a submitted regeneration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// Added to the lifecycle's queue
    Queued,
    /// An identical job was already queued
    Deduplicated,
    /// Ran inline and succeeded
    Ran,
    /// Ran inline and failed
    Failed,
    /// Refused because the lifecycle is no longer active
    Rejected,
}

impl Submission {
    /// True if the job ran before `submit` returned.
    pub fn ran_inline(self) -> bool {
        matches!(self, Submission::Ran | Submission::Failed)
    }
}

// == Regeneration Executor ==
pub trait RegenerationExecutor: Send + Sync {
    /// Which strategy this is.
    fn mode(&self) -> ExecutionMode;

    /// Accepts a job.
    fn submit(&self, job: Regeneration) -> Submission;

    /// Hands over everything still queued, leaving the executor empty.
    fn take_pending(&self) -> RegenerationQueue;

    /// Number of queued jobs.
    fn pending(&self) -> usize;
}

// == Deferred Executor ==
/// Collects jobs into a deduplicated queue for the finisher to drain.
#[derive(Debug, Default)]
pub struct DeferredExecutor {
    queue: Mutex<RegenerationQueue>,
}

impl DeferredExecutor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RegenerationExecutor for DeferredExecutor {
    fn mode(&self) -> ExecutionMode {
        ExecutionMode::Deferred
    }

    fn submit(&self, job: Regeneration) -> Submission {
        let mut queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
        if queue.enqueue(job) {
            Submission::Queued
        } else {
            Submission::Deduplicated
        }
    }

    fn take_pending(&self) -> RegenerationQueue {
        std::mem::take(&mut *self.queue.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn pending(&self) -> usize {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

// == Immediate Executor ==
/// Runs every job synchronously; nothing is ever queued.
///
/// Failures are logged and swallowed so readers only ever see stale data.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImmediateExecutor;

impl RegenerationExecutor for ImmediateExecutor {
    fn mode(&self) -> ExecutionMode {
        ExecutionMode::Immediate
    }

    fn submit(&self, job: Regeneration) -> Submission {
        match job.run() {
            Ok(()) => Submission::Ran,
            Err(failure) => {
                warn!(id = %failure.id, error = %failure.error, "Inline regeneration failed");
                Submission::Failed
            }
        }
    }

    fn take_pending(&self) -> RegenerationQueue {
        RegenerationQueue::new()
    }

    fn pending(&self) -> usize {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting(runs: &Arc<AtomicUsize>, args: Vec<serde_json::Value>) -> Regeneration {
        let runs = runs.clone();
        Regeneration::new("count", args, move |_| {
            runs.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    #[test]
    fn test_deferred_queues_without_running() {
        let runs = Arc::new(AtomicUsize::new(0));
        let executor = DeferredExecutor::new();

        assert_eq!(executor.submit(counting(&runs, vec![json!(1)])), Submission::Queued);
        assert_eq!(
            executor.submit(counting(&runs, vec![json!(1)])),
            Submission::Deduplicated
        );

        assert_eq!(executor.pending(), 1);
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_deferred_take_pending_empties() {
        let runs = Arc::new(AtomicUsize::new(0));
        let executor = DeferredExecutor::new();
        executor.submit(counting(&runs, vec![]));

        let queue = executor.take_pending();
        assert_eq!(queue.len(), 1);
        assert_eq!(executor.pending(), 0);
    }

    #[test]
    fn test_immediate_runs_every_submission() {
        let runs = Arc::new(AtomicUsize::new(0));
        let executor = ImmediateExecutor;

        assert_eq!(executor.submit(counting(&runs, vec![json!(1)])), Submission::Ran);
        assert_eq!(executor.submit(counting(&runs, vec![json!(1)])), Submission::Ran);

        assert_eq!(runs.load(Ordering::SeqCst), 2);
        assert!(executor.take_pending().is_empty());
    }

    #[test]
    fn test_immediate_swallows_failure() {
        let executor = ImmediateExecutor;
        let job = Regeneration::new("broken", vec![], |_| anyhow::bail!("boom"));

        let submission = executor.submit(job);
        assert_eq!(submission, Submission::Failed);
        assert!(submission.ran_inline());
    }
}
