//! # Capture
//!
//! Frame acquisition side of the pipeline.
//!
//! Responsibilities:
//! - Bounded FIFO frame queues (producer -> dispatcher -> downstream)
//! - Frame buffer pool (return-to-pool protocol)
//! - Mock capture source for tests and demos

mod metrics;
mod mock;
mod pool;
mod queue;

pub use metrics::{CaptureMetrics, CaptureSnapshot};
pub use mock::{CaptureHalt, MockCaptureConfig, MockCaptureSource};
pub use pool::{FramePool, PoolSnapshot};
pub use queue::{frame_queue, FrameReceiver, FrameSender};
