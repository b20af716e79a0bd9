//! Dispatch metric collection
//!
//! Prometheus recording helpers plus an in-memory aggregator for run
//! summaries.

use metrics::{counter, histogram};

/// Record one dispatched frame
///
/// Call once per iteration, after the sink returned.
pub fn record_frame_dispatched(route: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "camrelay_frames_dispatched_total",
        "route" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    if !success {
        counter!(
            "camrelay_sink_failures_total",
            "route" => route.to_string()
        )
        .increment(1);
    }
}

/// Record how a buffer was disposed of (forwarded / pool_returned / released)
pub fn record_frame_disposed(disposal: &str) {
    counter!(
        "camrelay_frames_disposed_total",
        "disposal" => disposal.to_string()
    )
    .increment(1);
}

/// Record payload bytes pushed through the stream sink
pub fn record_stream_bytes(bytes: u64) {
    counter!("camrelay_stream_bytes_total").increment(bytes);
    histogram!("camrelay_stream_part_bytes").record(bytes as f64);
}

/// Dispatch metrics aggregator
///
/// Aggregates per-iteration outcomes in memory for the end-of-run summary.
#[derive(Debug, Clone, Default)]
pub struct RelayMetricsAggregator {
    /// Total frames dispatched
    pub total_frames: u64,

    /// Frames routed to the stream sink
    pub streamed: u64,

    /// Frames routed to the broker sink
    pub published: u64,

    /// Sink failures
    pub sink_failures: u64,

    /// Disposal counts
    pub forwarded: u64,
    pub pool_returned: u64,
    pub released: u64,

    /// Payload size statistics (bytes)
    pub payload_stats: RunningStats,
}

impl RelayMetricsAggregator {
    /// Create a new aggregator
    pub fn new() -> Self {
        Self::default()
    }

    /// Update aggregate statistics with one iteration outcome
    pub fn update(&mut self, route: &str, success: bool, disposal: &str, payload_bytes: usize) {
        self.total_frames += 1;
        match route {
            "stream" => self.streamed += 1,
            _ => self.published += 1,
        }
        if !success {
            self.sink_failures += 1;
        }
        match disposal {
            "forwarded" => self.forwarded += 1,
            "pool_returned" => self.pool_returned += 1,
            _ => self.released += 1,
        }
        self.payload_stats.push(payload_bytes as f64);
    }

    /// Produce a summary report
    pub fn summary(&self) -> RelaySummary {
        RelaySummary {
            total_frames: self.total_frames,
            streamed: self.streamed,
            published: self.published,
            sink_failures: self.sink_failures,
            forwarded: self.forwarded,
            pool_returned: self.pool_returned,
            released: self.released,
            failure_rate: if self.total_frames > 0 {
                self.sink_failures as f64 / self.total_frames as f64 * 100.0
            } else {
                0.0
            },
            payload_bytes: StatsSummary::from(&self.payload_stats),
        }
    }

    /// Reset statistics
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Metrics summary
#[derive(Debug, Clone, Default)]
pub struct RelaySummary {
    pub total_frames: u64,
    pub streamed: u64,
    pub published: u64,
    pub sink_failures: u64,
    pub forwarded: u64,
    pub pool_returned: u64,
    pub released: u64,
    pub failure_rate: f64,
    pub payload_bytes: StatsSummary,
}

impl std::fmt::Display for RelaySummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Relay Summary ===")?;
        writeln!(f, "Total frames: {}", self.total_frames)?;
        writeln!(
            f,
            "Routed: {} streamed, {} published",
            self.streamed, self.published
        )?;
        writeln!(
            f,
            "Sink failures: {} ({:.2}%)",
            self.sink_failures, self.failure_rate
        )?;
        writeln!(
            f,
            "Disposals: {} forwarded, {} pool-returned, {} released",
            self.forwarded, self.pool_returned, self.released
        )?;
        writeln!(f, "Payload bytes: {}", self.payload_bytes)?;
        Ok(())
    }
}

/// Statistics summary
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count(),
            min: stats.min(),
            max: stats.max(),
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics calculator (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// Add a new value
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
            return;
        }

        self.min = self.min.min(value);
        self.max = self.max.max(value);

        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        let delta2 = value - self.mean;
        self.m2 += delta * delta2;
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    /// Mean of pushed values
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Sample standard deviation
    pub fn std_dev(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            (self.m2 / (self.count - 1) as f64).sqrt()
        }
    }
}
