//! Worker metrics for observability
//!
//! Counters for monitoring delivery health: queue pressure, drops and
//! destination failures.

use std::sync::atomic::{AtomicU64, Ordering};

/// Delivery counters of one worker
///
/// # Example
///
/// ```
/// use rust_fast_logger::WorkerMetrics;
///
/// let metrics = WorkerMetrics::new();
/// metrics.record_enqueued();
/// metrics.record_dropped();
///
/// assert_eq!(metrics.enqueued_count(), 1);
/// assert_eq!(metrics.dropped_count(), 1);
/// ```
#[derive(Debug)]
pub struct WorkerMetrics {
    /// Buffers accepted by the queue
    enqueued: AtomicU64,

    /// Buffers written to the destination, by any thread
    written: AtomicU64,

    /// Buffers released unwritten under the drop policy
    dropped: AtomicU64,

    /// Submissions that found the queue full
    queue_full_events: AtomicU64,

    /// Submissions that waited for queue space
    block_events: AtomicU64,

    /// Buffers written on the submitting thread
    direct_writes: AtomicU64,

    /// Failed writes or flushes
    write_errors: AtomicU64,
}

impl WorkerMetrics {
    pub const fn new() -> Self {
        Self {
            enqueued: AtomicU64::new(0),
            written: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            queue_full_events: AtomicU64::new(0),
            block_events: AtomicU64::new(0),
            direct_writes: AtomicU64::new(0),
            write_errors: AtomicU64::new(0),
        }
    }

    /// Buffers placed on the queue.
    #[inline]
    pub fn enqueued_count(&self) -> u64 {
        self.enqueued.load(Ordering::Relaxed)
    }

    /// Records written to the destination.
    #[inline]
    pub fn written_count(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }

    /// Records discarded by the drop policy.
    #[inline]
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Submissions that found the queue full.
    #[inline]
    pub fn queue_full_events(&self) -> u64 {
        self.queue_full_events.load(Ordering::Relaxed)
    }

    /// Submissions that blocked on a full queue.
    #[inline]
    pub fn block_events(&self) -> u64 {
        self.block_events.load(Ordering::Relaxed)
    }

    /// Records written on the calling thread.
    #[inline]
    pub fn direct_writes(&self) -> u64 {
        self.direct_writes.load(Ordering::Relaxed)
    }

    /// Failed writes.
    #[inline]
    pub fn write_errors(&self) -> u64 {
        self.write_errors.load(Ordering::Relaxed)
    }

    /// Count one enqueued buffer; returns the previous count.
    #[inline]
    pub fn record_enqueued(&self) -> u64 {
        self.enqueued.fetch_add(1, Ordering::Relaxed)
    }

    /// Count one written record; returns the previous count.
    #[inline]
    pub fn record_written(&self) -> u64 {
        self.written.fetch_add(1, Ordering::Relaxed)
    }

    /// Count one dropped record; returns the previous count.
    #[inline]
    pub fn record_dropped(&self) -> u64 {
        self.dropped.fetch_add(1, Ordering::Relaxed)
    }

    /// Count one full-queue event; returns the previous count.
    #[inline]
    pub fn record_queue_full(&self) -> u64 {
        self.queue_full_events.fetch_add(1, Ordering::Relaxed)
    }

    /// Count one blocking submission; returns the previous count.
    #[inline]
    pub fn record_block(&self) -> u64 {
        self.block_events.fetch_add(1, Ordering::Relaxed)
    }

    /// Count one direct write; returns the previous count.
    #[inline]
    pub fn record_direct_write(&self) -> u64 {
        self.direct_writes.fetch_add(1, Ordering::Relaxed)
    }

    /// Count one failed write; returns the previous count.
    #[inline]
    pub fn record_write_error(&self) -> u64 {
        self.write_errors.fetch_add(1, Ordering::Relaxed)
    }

    /// Dropped buffers as a percentage of all submissions.
    pub fn drop_rate(&self) -> f64 {
        let dropped = self.dropped_count() as f64;
        let total = self.written_count() as f64 + dropped;
        if total == 0.0 {
            0.0
        } else {
            (dropped / total) * 100.0
        }
    }

    /// Reset all counters to zero.
    pub fn reset(&self) {
        for counter in [
            &self.enqueued,
            &self.written,
            &self.dropped,
            &self.queue_full_events,
            &self.block_events,
            &self.direct_writes,
            &self.write_errors,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

impl Default for WorkerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for WorkerMetrics {
    /// Snapshot of the current values
    fn clone(&self) -> Self {
        Self {
            enqueued: AtomicU64::new(self.enqueued_count()),
            written: AtomicU64::new(self.written_count()),
            dropped: AtomicU64::new(self.dropped_count()),
            queue_full_events: AtomicU64::new(self.queue_full_events()),
            block_events: AtomicU64::new(self.block_events()),
            direct_writes: AtomicU64::new(self.direct_writes()),
            write_errors: AtomicU64::new(self.write_errors()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_new() {
        let metrics = WorkerMetrics::new();
        assert_eq!(metrics.enqueued_count(), 0);
        assert_eq!(metrics.written_count(), 0);
        assert_eq!(metrics.dropped_count(), 0);
        assert_eq!(metrics.write_errors(), 0);
    }

    #[test]
    fn test_record_returns_previous_value() {
        let metrics = WorkerMetrics::new();
        assert_eq!(metrics.record_dropped(), 0);
        assert_eq!(metrics.record_dropped(), 1);
        assert_eq!(metrics.dropped_count(), 2);
    }

    #[test]
    fn test_drop_rate() {
        let metrics = WorkerMetrics::new();
        assert_eq!(metrics.drop_rate(), 0.0);

        for _ in 0..100 {
            metrics.record_written();
        }
        for _ in 0..10 {
            metrics.record_dropped();
        }
        let rate = metrics.drop_rate();
        assert!(rate > 9.0 && rate < 10.0, "Drop rate was {}", rate);
    }

    #[test]
    fn test_reset_and_snapshot() {
        let metrics = WorkerMetrics::new();
        metrics.record_queue_full();
        metrics.record_direct_write();

        let snapshot = metrics.clone();
        metrics.reset();

        assert_eq!(metrics.queue_full_events(), 0);
        assert_eq!(snapshot.queue_full_events(), 1);
        assert_eq!(snapshot.direct_writes(), 1);
    }
}
