//! Pipeline statistics and metrics.

use std::time::Duration;

use observability::RelayMetricsAggregator;

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Total frames dispatched through the relay
    pub frames_relayed: u64,

    /// Total frames produced by the capture sources
    pub frames_produced: u64,

    /// Iterations whose sink call failed
    pub sink_failures: u64,

    /// Buffers retained in the pool at shutdown
    pub pool_retained: usize,

    /// Total duration of the pipeline run
    pub duration: Duration,

    /// Per-iteration dispatch aggregator
    pub relay_metrics: RelayMetricsAggregator,
}

impl PipelineStats {
    /// Calculate frames per second throughput
    pub fn fps(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.frames_relayed as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Calculate sink failure rate as percentage
    #[allow(dead_code)]
    pub fn failure_rate(&self) -> f64 {
        if self.frames_relayed > 0 {
            (self.sink_failures as f64 / self.frames_relayed as f64) * 100.0
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n=== Pipeline Statistics ===\n");
        println!("Duration: {:.2}s", self.duration.as_secs_f64());
        println!("Frames produced: {}", self.frames_produced);
        println!("Frames relayed: {}", self.frames_relayed);
        println!("FPS: {:.2}", self.fps());
        println!("Pool retained at exit: {}", self.pool_retained);
        println!();
        print!("{}", self.relay_metrics.summary());
    }
}
