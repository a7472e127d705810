use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for observing ring activity.
///
/// Uses atomic counters with `Relaxed` ordering since these are purely
/// statistical - no control flow depends on exact values, and eventual
/// visibility is acceptable for observability.
#[derive(Debug)]
pub struct Metrics {
    handles_pushed: AtomicU64,
    handles_popped: AtomicU64,
    batches_pushed: AtomicU64,
    batches_popped: AtomicU64,
    reserve_retries: AtomicU64,
    handoff_spins: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            handles_pushed: AtomicU64::new(0),
            handles_popped: AtomicU64::new(0),
            batches_pushed: AtomicU64::new(0),
            batches_popped: AtomicU64::new(0),
            reserve_retries: AtomicU64::new(0),
            handoff_spins: AtomicU64::new(0),
        }
    }

    /// Record a completed push of `n` handles.
    #[inline]
    pub fn add_pushed(&self, n: u64) {
        self.handles_pushed.fetch_add(n, Ordering::Relaxed);
        self.batches_pushed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a completed pop of `n` handles.
    #[inline]
    pub fn add_popped(&self, n: u64) {
        self.handles_popped.fetch_add(n, Ordering::Relaxed);
        self.batches_popped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record `n` failed reservation CAS attempts.
    #[inline]
    pub fn add_reserve_retries(&self, n: u64) {
        self.reserve_retries.fetch_add(n, Ordering::Relaxed);
    }

    /// Record `n` spin iterations inside the handoff stall.
    #[inline]
    pub fn add_handoff_spins(&self, n: u64) {
        self.handoff_spins.fetch_add(n, Ordering::Relaxed);
    }

    /// Take a snapshot of current metrics values.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            handles_pushed: self.handles_pushed.load(Ordering::Relaxed),
            handles_popped: self.handles_popped.load(Ordering::Relaxed),
            batches_pushed: self.batches_pushed.load(Ordering::Relaxed),
            batches_popped: self.batches_popped.load(Ordering::Relaxed),
            reserve_retries: self.reserve_retries.load(Ordering::Relaxed),
            handoff_spins: self.handoff_spins.load(Ordering::Relaxed),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// A point-in-time copy of the metrics counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsSnapshot {
    pub handles_pushed: u64,
    pub handles_popped: u64,
    pub batches_pushed: u64,
    pub batches_popped: u64,
    pub reserve_retries: u64,
    pub handoff_spins: u64,
}
