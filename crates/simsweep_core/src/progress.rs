//! Shared progress counters and cancellation flag for a running sweep.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Progress tracking for a sweep.
///
/// Clones share the same counters, so a handle given to an interrupt
/// handler or a display thread observes the orchestration loop directly.
#[derive(Debug, Clone)]
pub struct SweepProgress {
    completed: Arc<AtomicUsize>,
    succeeded: Arc<AtomicUsize>,
    failed: Arc<AtomicUsize>,
    total: Arc<AtomicUsize>,
    cancelled: Arc<AtomicBool>,
}

impl SweepProgress {
    #[must_use]
    pub fn new(total: usize) -> Self {
        Self::with_cancel_flag(total, Arc::new(AtomicBool::new(false)))
    }

    /// Create a tracker around an existing cancellation flag (e.g. one set by
    /// a signal handler)
    #[must_use]
    pub fn with_cancel_flag(total: usize, cancelled: Arc<AtomicBool>) -> Self {
        Self {
            completed: Arc::new(AtomicUsize::new(0)),
            succeeded: Arc::new(AtomicUsize::new(0)),
            failed: Arc::new(AtomicUsize::new(0)),
            total: Arc::new(AtomicUsize::new(total)),
            cancelled,
        }
    }

    #[must_use]
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.succeeded.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.total.load(Ordering::Relaxed)
    }

    pub fn record_success(&self) {
        self.succeeded.fetch_add(1, Ordering::Relaxed);
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    /// Reset the counters for a new sweep (the cancellation flag is kept)
    pub fn reset(&self, total: usize) {
        self.completed.store(0, Ordering::Relaxed);
        self.succeeded.store(0, Ordering::Relaxed);
        self.failed.store(0, Ordering::Relaxed);
        self.total.store(total, Ordering::Relaxed);
    }

    /// Request cancellation; the running invocation is terminated
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl Default for SweepProgress {
    fn default() -> Self {
        Self::new(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_are_shared_between_clones() {
        let progress = SweepProgress::new(3);
        let observer = progress.clone();

        progress.record_success();
        progress.record_failure();
        progress.record_success();

        assert_eq!(observer.completed(), 3);
        assert_eq!(observer.succeeded(), 2);
        assert_eq!(observer.failed(), 1);

        observer.cancel();
        assert!(progress.is_cancelled());

        progress.reset(5);
        assert_eq!(observer.completed(), 0);
        assert_eq!(observer.total(), 5);
        assert!(observer.is_cancelled());
    }
}
