//! Capture-side metrics

use metrics::{counter, gauge};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Capture metrics
#[derive(Debug, Default)]
pub struct CaptureMetrics {
    /// Total frames produced
    pub frames_produced: AtomicU64,

    /// Total frames refused by a closed queue
    pub frames_refused: AtomicU64,

    /// Current input queue depth
    pub queue_depth: AtomicUsize,
}

impl CaptureMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Record frame produced
    pub fn record_produced(&self) {
        self.frames_produced.fetch_add(1, Ordering::Relaxed);
        counter!("camrelay_frames_produced_total").increment(1);
    }

    /// Record frame refused by a closed queue
    pub fn record_refused(&self) {
        self.frames_refused.fetch_add(1, Ordering::Relaxed);
        counter!("camrelay_frames_refused_total").increment(1);
    }

    /// Update queue depth
    pub fn update_queue_depth(&self, depth: usize) {
        self.queue_depth.store(depth, Ordering::Relaxed);
        gauge!("camrelay_queue_depth", "queue" => "input").set(depth as f64);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> CaptureSnapshot {
        CaptureSnapshot {
            frames_produced: self.frames_produced.load(Ordering::Relaxed),
            frames_refused: self.frames_refused.load(Ordering::Relaxed),
            queue_depth: self.queue_depth.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Default)]
pub struct CaptureSnapshot {
    /// Total frames produced
    pub frames_produced: u64,

    /// Total frames refused by a closed queue
    pub frames_refused: u64,

    /// Current input queue depth
    pub queue_depth: usize,
}
