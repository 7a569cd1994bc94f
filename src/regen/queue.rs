//! Regeneration Queue Module
//!
//! Ordered, deduplicated collection of regeneration work for one lifecycle.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::error::RegenerationFailure;
use crate::regen::Regeneration;

// == Drain Policy ==
/// What a drain does after a regeneration fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrainPolicy {
    /// Record the failure and keep draining
    #[default]
    ContinueOnError,
    /// Stop at the first failure; later items are skipped
    FailFast,
}

impl std::str::FromStr for DrainPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "continue" | "continue-on-error" => Ok(DrainPolicy::ContinueOnError),
            "fail-fast" | "failfast" => Ok(DrainPolicy::FailFast),
            other => Err(format!("unknown drain policy `{}`", other)),
        }
    }
}

// == Drain Report ==
/// Outcome of draining a queue.
#[derive(Debug, Default)]
pub struct DrainReport {
    /// Regenerations that ran (successfully or not)
    pub executed: usize,
    /// Failures in execution order
    pub failures: Vec<RegenerationFailure>,
    /// Regenerations never started because of `FailFast`
    pub skipped: usize,
}

impl DrainReport {
    /// True when every queued regeneration ran and succeeded.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.skipped == 0
    }

    /// Regenerations that ran and succeeded.
    pub fn succeeded(&self) -> usize {
        self.executed - self.failures.len()
    }
}

// == Regeneration Queue ==
/// Insertion-ordered queue keyed by dedup hash.
#[derive(Debug, Default)]
pub struct RegenerationQueue {
    items: Vec<Regeneration>,
    hashes: HashSet<String>,
}

impl RegenerationQueue {
    // == Constructor ==
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    // == Enqueue ==
    /// Adds `job` unless an identical job is already queued.
    ///
    /// Returns true if the job was added.
    pub fn enqueue(&mut self, job: Regeneration) -> bool {
        let hash = job.dedup_hash();
        if !self.hashes.insert(hash) {
            debug!(id = %job.id(), "Regeneration already queued");
            return false;
        }
        debug!(id = %job.id(), position = self.items.len(), "Regeneration queued");
        self.items.push(job);
        true
    }

    /// Returns true if a job with `hash` is queued.
    pub fn contains(&self, hash: &str) -> bool {
        self.hashes.contains(hash)
    }

    /// Number of queued jobs.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Identity tokens in execution order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(Regeneration::id)
    }

    // == Drain ==
    /// Runs every queued job in insertion order, consuming the queue.
    pub fn drain(self, policy: DrainPolicy) -> DrainReport {
        let total = self.items.len();
        let mut report = DrainReport::default();

        for job in self.items {
            report.executed += 1;
            if let Err(failure) = job.run() {
                warn!(id = %failure.id, error = %failure.error, "Regeneration failed");
                report.failures.push(failure);
                if policy == DrainPolicy::FailFast {
                    break;
                }
            }
        }

        report.skipped = total - report.executed;
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    fn recording(log: &Arc<Mutex<Vec<String>>>, id: &str, args: Vec<serde_json::Value>) -> Regeneration {
        let log = log.clone();
        let name = id.to_string();
        Regeneration::new(id, args, move |args| {
            log.lock()
                .unwrap()
                .push(format!("{}{}", name, serde_json::Value::from(args.to_vec())));
            Ok(())
        })
    }

    fn failing(log: &Arc<Mutex<Vec<String>>>, id: &str) -> Regeneration {
        let log = log.clone();
        let name = id.to_string();
        Regeneration::new(id, vec![], move |_| {
            log.lock().unwrap().push(name.clone());
            anyhow::bail!("{} exploded", name)
        })
    }

    #[test]
    fn test_queue_new() {
        let queue = RegenerationQueue::new();
        assert!(queue.is_empty());
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn test_duplicate_collapses() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut queue = RegenerationQueue::new();

        assert!(queue.enqueue(recording(&log, "fn", vec![json!(1), json!(2)])));
        assert!(!queue.enqueue(recording(&log, "fn", vec![json!(1), json!(2)])));
        assert_eq!(queue.len(), 1);

        let report = queue.drain(DrainPolicy::ContinueOnError);
        assert_eq!(report.executed, 1);
        assert_eq!(*log.lock().unwrap(), vec!["fn[1,2]".to_string()]);
    }

    #[test]
    fn test_distinct_args_both_run() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut queue = RegenerationQueue::new();

        queue.enqueue(recording(&log, "fn", vec![json!(1), json!(2)]));
        queue.enqueue(recording(&log, "fn", vec![json!(3), json!(4)]));

        let report = queue.drain(DrainPolicy::ContinueOnError);
        assert_eq!(report.executed, 2);
        assert!(report.is_clean());
        assert_eq!(
            *log.lock().unwrap(),
            vec!["fn[1,2]".to_string(), "fn[3,4]".to_string()]
        );
    }

    #[test]
    fn test_contains_and_ids() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut queue = RegenerationQueue::new();
        let job = recording(&log, "first", vec![]);
        let hash = job.dedup_hash();

        queue.enqueue(job);
        queue.enqueue(recording(&log, "second", vec![]));

        assert!(queue.contains(&hash));
        assert_eq!(queue.ids().collect::<Vec<_>>(), vec!["first", "second"]);
    }

    #[test]
    fn test_continue_on_error_runs_everything() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut queue = RegenerationQueue::new();
        queue.enqueue(failing(&log, "broken"));
        queue.enqueue(recording(&log, "after", vec![]));

        let report = queue.drain(DrainPolicy::ContinueOnError);

        assert_eq!(report.executed, 2);
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.skipped, 0);
        assert_eq!(report.failures[0].id, "broken");
        assert_eq!(log.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_fail_fast_skips_the_rest() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut queue = RegenerationQueue::new();
        queue.enqueue(recording(&log, "before", vec![]));
        queue.enqueue(failing(&log, "broken"));
        queue.enqueue(recording(&log, "after", vec![]));

        let report = queue.drain(DrainPolicy::FailFast);

        assert_eq!(report.executed, 2);
        assert_eq!(report.skipped, 1);
        assert!(!report.is_clean());
        assert_eq!(
            *log.lock().unwrap(),
            vec!["before[]".to_string(), "broken".to_string()]
        );
    }

    #[test]
    fn test_drain_policy_from_str() {
        assert_eq!("continue".parse(), Ok(DrainPolicy::ContinueOnError));
        assert_eq!("FAIL-FAST".parse(), Ok(DrainPolicy::FailFast));
        assert!("sometimes".parse::<DrainPolicy>().is_err());
    }
}
