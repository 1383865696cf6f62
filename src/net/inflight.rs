//! In-flight request tracking.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counts requests currently being handled.
#[derive(Debug, Clone, Default)]
pub struct InflightTracker {
    active_count: Arc<AtomicU64>,
}

impl InflightTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new request. Returns a guard that decrements on drop.
    pub fn track(&self) -> InflightGuard {
        self.active_count.fetch_add(1, Ordering::SeqCst);
        InflightGuard {
            active_count: Arc::clone(&self.active_count),
        }
    }

    pub fn active_count(&self) -> u64 {
        self.active_count.load(Ordering::SeqCst)
    }
}

/// Guard held for the lifetime of one request.
#[derive(Debug)]
pub struct InflightGuard {
    active_count: Arc<AtomicU64>,
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        self.active_count.fetch_sub(1, Ordering::SeqCst);
    }
}
