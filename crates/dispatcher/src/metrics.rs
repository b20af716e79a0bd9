//! Dispatch metrics for observability

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for one dispatcher instance
#[derive(Debug, Default)]
pub struct DispatchMetrics {
    /// Frames dequeued and dispatched
    dispatched: AtomicU64,
    /// Frames routed to the stream sink
    streamed: AtomicU64,
    /// Frames routed to the broker sink
    published: AtomicU64,
    /// Sink calls that failed
    sink_failures: AtomicU64,
    /// Frames forwarded to the output queue
    forwarded: AtomicU64,
    /// Frames returned to the pool
    pool_returned: AtomicU64,
    /// Frames released outright
    released: AtomicU64,
    /// Payload bytes pushed through the stream sink
    stream_bytes: AtomicU64,
}

impl DispatchMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_dispatched(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_streamed(&self) {
        self.streamed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_published(&self) {
        self.published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_sink_failures(&self) {
        self.sink_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_forwarded(&self) {
        self.forwarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_pool_returned(&self) {
        self.pool_returned.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_released(&self) {
        self.released.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_stream_bytes(&self, bytes: u64) {
        self.stream_bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn sink_failures(&self) -> u64 {
        self.sink_failures.load(Ordering::Relaxed)
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            dispatched: self.dispatched.load(Ordering::Relaxed),
            streamed: self.streamed.load(Ordering::Relaxed),
            published: self.published.load(Ordering::Relaxed),
            sink_failures: self.sink_failures.load(Ordering::Relaxed),
            forwarded: self.forwarded.load(Ordering::Relaxed),
            pool_returned: self.pool_returned.load(Ordering::Relaxed),
            released: self.released.load(Ordering::Relaxed),
            stream_bytes: self.stream_bytes.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of dispatch metrics (for reporting)
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsSnapshot {
    pub dispatched: u64,
    pub streamed: u64,
    pub published: u64,
    pub sink_failures: u64,
    pub forwarded: u64,
    pub pool_returned: u64,
    pub released: u64,
    pub stream_bytes: u64,
}

impl MetricsSnapshot {
    /// Disposal invariant check: every dispatched frame resolved exactly once
    pub fn disposals(&self) -> u64 {
        self.forwarded + self.pool_returned + self.released
    }
}
