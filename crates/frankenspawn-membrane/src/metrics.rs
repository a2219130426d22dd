//! Atomic counters for spawn observability.
//!
//! All counters use relaxed ordering; they are advisory/diagnostic,
//! not synchronization primitives.

use std::sync::atomic::{AtomicU64, Ordering};

/// Global spawn operation counters.
pub struct SpawnMetrics {
    /// Spawn calls that reached the orchestrator.
    pub spawns: AtomicU64,
    /// Children created with a copied address space.
    pub forks: AtomicU64,
    /// Children created sharing the parent's address space.
    pub vforks: AtomicU64,
    /// fork/clone failures returned to the caller.
    pub fork_failures: AtomicU64,
    /// Pre-exec child failures reported over the error channel.
    pub child_failures_reported: AtomicU64,
    /// Handles rejected because they were unknown or already destroyed.
    pub handle_rejections: AtomicU64,
    /// Builder calls rejected with a validation errno.
    pub validation_failures: AtomicU64,
}

impl SpawnMetrics {
    /// Create a new zeroed metrics instance.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            spawns: AtomicU64::new(0),
            forks: AtomicU64::new(0),
            vforks: AtomicU64::new(0),
            fork_failures: AtomicU64::new(0),
            child_failures_reported: AtomicU64::new(0),
            handle_rejections: AtomicU64::new(0),
            validation_failures: AtomicU64::new(0),
        }
    }

    /// Increment a counter by 1.
    pub fn inc(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Read a counter value.
    pub fn get(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }

    /// Snapshot all counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            spawns: Self::get(&self.spawns),
            forks: Self::get(&self.forks),
            vforks: Self::get(&self.vforks),
            fork_failures: Self::get(&self.fork_failures),
            child_failures_reported: Self::get(&self.child_failures_reported),
            handle_rejections: Self::get(&self.handle_rejections),
            validation_failures: Self::get(&self.validation_failures),
        }
    }
}

impl Default for SpawnMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time snapshot of all spawn counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub spawns: u64,
    pub forks: u64,
    pub vforks: u64,
    pub fork_failures: u64,
    pub child_failures_reported: u64,
    pub handle_rejections: u64,
    pub validation_failures: u64,
}

/// Global metrics instance.
static GLOBAL_METRICS: SpawnMetrics = SpawnMetrics::new();

/// Access the global metrics singleton.
#[must_use]
pub fn global_metrics() -> &'static SpawnMetrics {
    &GLOBAL_METRICS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero() {
        let m = SpawnMetrics::new();
        assert_eq!(m.snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn increment_works() {
        let m = SpawnMetrics::new();
        SpawnMetrics::inc(&m.spawns);
        SpawnMetrics::inc(&m.spawns);
        SpawnMetrics::inc(&m.vforks);
        let snap = m.snapshot();
        assert_eq!(snap.spawns, 2);
        assert_eq!(snap.vforks, 1);
        assert_eq!(snap.forks, 0);
    }
}
