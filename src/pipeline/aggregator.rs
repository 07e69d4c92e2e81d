use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use log::{debug, info, warn};

use crate::models::{SuiteId, UploadContext};

/// How many drained suite ids are remembered for late-upload warnings
const RECENTLY_DRAINED: usize = 1024;

#[derive(Default)]
struct Batches {
    pending: HashMap<SuiteId, Vec<UploadContext>>,
    drained: VecDeque<SuiteId>,
}

/// Buffers accepted uploads per check suite until the suite reports completion.
///
/// `enqueue` and `drain` each run as one critical section over the whole map,
/// so a drain never observes a half-appended batch and an enqueue either lands
/// in the batch being drained or starts a fresh one. The lock is never held
/// across an await point; callers process a drained batch after the lock is
/// released.
///
/// An upload arriving after its suite was drained starts a new batch that is
/// only processed if the suite reports completion again. Such late uploads
/// are logged as warnings for recently drained suites.
#[derive(Default)]
pub struct SuiteAggregator {
    batches: Mutex<Batches>,
}

impl SuiteAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an upload to its suite's batch, creating the batch if absent.
    ///
    /// Returns the batch size after the append.
    pub fn enqueue(&self, suite_id: SuiteId, context: UploadContext) -> usize {
        let mut batches = self.lock();
        if batches.drained.contains(&suite_id) && !batches.pending.contains_key(&suite_id) {
            warn!(
                "Check suite {} already completed, upload {} waits for another completion notification",
                suite_id, context.upload_id
            );
        }
        let batch = batches.pending.entry(suite_id).or_default();
        debug!(
            "Queued upload {} ({} bytes from {} job '{}') under check suite {}",
            context.upload_id,
            context.total_bytes(),
            context.identity.repository,
            context.identity.job_name,
            suite_id
        );
        batch.push(context);
        batch.len()
    }

    /// Atomically remove and return the whole batch of a suite.
    ///
    /// Returns an empty batch when nothing was queued.
    pub fn drain(&self, suite_id: SuiteId) -> Vec<UploadContext> {
        let batch = {
            let mut batches = self.lock();
            if !batches.drained.contains(&suite_id) {
                if batches.drained.len() == RECENTLY_DRAINED {
                    batches.drained.pop_front();
                }
                batches.drained.push_back(suite_id);
            }
            batches.pending.remove(&suite_id).unwrap_or_default()
        };
        info!("Drained {} queued uploads for check suite {}", batch.len(), suite_id);
        batch
    }

    /// Number of uploads waiting for a suite
    pub fn pending_uploads(&self, suite_id: SuiteId) -> usize {
        self.lock().pending.get(&suite_id).map_or(0, Vec::len)
    }

    /// Number of suites with at least one waiting upload
    pub fn pending_suites(&self) -> usize {
        self.lock().pending.len()
    }

    /// True if `suite_id` was drained recently
    pub fn was_drained(&self, suite_id: SuiteId) -> bool {
        self.lock().drained.contains(&suite_id)
    }

    fn lock(&self) -> MutexGuard<'_, Batches> {
        // Both critical sections leave the map consistent even if interrupted
        self.batches.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::upload_context;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_drain_without_enqueue_is_empty() {
        let aggregator = SuiteAggregator::new();
        assert!(aggregator.drain(42).is_empty());
        assert_eq!(aggregator.pending_suites(), 0);
    }

    #[test]
    fn test_enqueue_then_drain_preserves_order() {
        let aggregator = SuiteAggregator::new();
        assert_eq!(aggregator.enqueue(1, upload_context("linux", &[b"a"])), 1);
        assert_eq!(aggregator.enqueue(1, upload_context("windows", &[b"b"])), 2);
        aggregator.enqueue(2, upload_context("macos", &[b"c"]));

        let batch = aggregator.drain(1);
        let jobs: Vec<_> = batch.iter().map(|c| c.identity.job_name.as_str()).collect();
        assert_eq!(jobs, vec!["linux", "windows"]);

        assert_eq!(aggregator.pending_uploads(1), 0);
        assert_eq!(aggregator.pending_uploads(2), 1);
    }

    #[test]
    fn test_drain_clears_batch() {
        let aggregator = SuiteAggregator::new();
        aggregator.enqueue(1, upload_context("linux", &[b"a"]));
        assert_eq!(aggregator.drain(1).len(), 1);
        assert!(aggregator.drain(1).is_empty());
    }

    #[test]
    fn test_enqueue_after_drain_starts_new_batch() {
        let aggregator = SuiteAggregator::new();
        aggregator.enqueue(1, upload_context("linux", &[b"a"]));
        aggregator.drain(1);

        assert!(aggregator.was_drained(1));
        assert!(!aggregator.was_drained(2));

        aggregator.enqueue(1, upload_context("late", &[b"b"]));
        assert_eq!(aggregator.pending_uploads(1), 1);
        assert_eq!(aggregator.drain(1)[0].identity.job_name, "late");
    }

    #[test]
    fn test_concurrent_enqueue_and_drain_lose_nothing() {
        let aggregator = Arc::new(SuiteAggregator::new());
        let producers: Vec<_> = (0..8)
            .map(|t| {
                let aggregator = Arc::clone(&aggregator);
                thread::spawn(move || {
                    for i in 0..50 {
                        aggregator.enqueue(7, upload_context(&format!("job-{}-{}", t, i), &[b"x"]));
                    }
                })
            })
            .collect();

        let drainer = {
            let aggregator = Arc::clone(&aggregator);
            thread::spawn(move || {
                let mut seen = 0;
                for _ in 0..100 {
                    seen += aggregator.drain(7).len();
                    thread::yield_now();
                }
                seen
            })
        };

        for handle in producers {
            handle.join().unwrap();
        }
        let drained_concurrently = drainer.join().unwrap();
        let drained_after = aggregator.drain(7).len();

        assert_eq!(drained_concurrently + drained_after, 8 * 50);
    }
}
