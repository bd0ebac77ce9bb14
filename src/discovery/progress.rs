//! Progress Tracker
//!
//! Concurrency-safe counters and a stage label, written by the fetcher and by
//! every adaptation worker, read by the progress renderer. Updates are
//! fire-and-forget: nothing here waits on the reader.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};

/// Point-in-time copy of the tracker
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub stage: String,
    pub total_items: usize,
    pub completed_items: usize,
    pub total_services: usize,
    pub finished_services: usize,
}

impl ProgressSnapshot {
    /// Item completion ratio in 0.0..=1.0
    pub fn ratio(&self) -> f64 {
        if self.total_items == 0 {
            return 0.0;
        }
        (self.completed_items as f64 / self.total_items as f64).min(1.0)
    }
}

#[derive(Debug, Default)]
pub struct ProgressTracker {
    stage: RwLock<String>,
    total_items: AtomicUsize,
    completed_items: AtomicUsize,
    total_services: AtomicUsize,
    finished_services: AtomicUsize,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_stage_label(&self, label: &str) {
        tracing::info!("{}", label);
        let mut stage = self.stage.write().unwrap_or_else(PoisonError::into_inner);
        *stage = label.to_string();
    }

    pub fn set_total_items(&self, total: usize) {
        self.total_items.store(total, Ordering::Relaxed);
    }

    pub fn increment_completed(&self) {
        self.completed_items.fetch_add(1, Ordering::Relaxed);
    }

    /// Zero the item counters at the start of a new listing
    pub fn reset_counts(&self) {
        self.total_items.store(0, Ordering::Relaxed);
        self.completed_items.store(0, Ordering::Relaxed);
    }

    pub fn set_total_services(&self, total: usize) {
        self.total_services.store(total, Ordering::Relaxed);
        self.finished_services.store(0, Ordering::Relaxed);
    }

    pub fn finish_service(&self) {
        self.finished_services.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        let stage = self
            .stage
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        ProgressSnapshot {
            stage,
            total_items: self.total_items.load(Ordering::Relaxed),
            completed_items: self.completed_items.load(Ordering::Relaxed),
            total_services: self.total_services.load(Ordering::Relaxed),
            finished_services: self.finished_services.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_counters_and_label() {
        let tracker = ProgressTracker::new();
        tracker.set_stage_label("Discovering networks...");
        tracker.set_total_items(3);
        tracker.increment_completed();

        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.stage, "Discovering networks...");
        assert_eq!(snapshot.total_items, 3);
        assert_eq!(snapshot.completed_items, 1);

        tracker.reset_counts();
        assert_eq!(tracker.snapshot().total_items, 0);
        assert_eq!(tracker.snapshot().completed_items, 0);
    }

    #[test]
    fn test_no_lost_updates_across_threads() {
        let tracker = Arc::new(ProgressTracker::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let tracker = Arc::clone(&tracker);
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        tracker.increment_completed();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(tracker.snapshot().completed_items, 8000);
    }

    #[test]
    fn test_ratio() {
        let snapshot = ProgressSnapshot {
            total_items: 4,
            completed_items: 1,
            ..Default::default()
        };
        assert_eq!(snapshot.ratio(), 0.25);
        assert_eq!(ProgressSnapshot::default().ratio(), 0.0);
    }
}
