//! Session-scoped upload counters.

use std::sync::{Mutex, MutexGuard};

use serde::Serialize;

/// Counters for the current session. They only grow, independent of which
/// jobs are still in the queue, until [`SessionStatsTracker::reset`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub total_added: u64,
    pub total_completed: u64,
    pub total_failed: u64,
}

#[derive(Debug, Default)]
pub struct SessionStatsTracker {
    stats: Mutex<SessionStats>,
}

impl SessionStatsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SessionStats> {
        // Counters stay meaningful even if a holder panicked
        self.stats.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn record_added(&self, count: usize) {
        self.lock().total_added += count as u64;
    }

    pub(crate) fn record_batch(&self, completed: usize, failed: usize) {
        let mut stats = self.lock();
        stats.total_completed += completed as u64;
        stats.total_failed += failed as u64;
    }

    pub fn snapshot(&self) -> SessionStats {
        *self.lock()
    }

    pub fn reset(&self) {
        *self.lock() = SessionStats::default();
    }
}
