//! # Dispatcher
//!
//! Frame dispatch module.
//!
//! Responsibilities:
//! - Consume `FrameBuffer` handles from the input queue
//! - Route each frame to the sink its pixel format selects
//! - Resolve buffer ownership after every sink call (forward / pool / release)

pub mod dispatcher;
pub mod error;
pub mod metrics;
pub mod route;
pub mod sinks;

pub use contracts::{FrameBuffer, FrameSink, SinkStatus};
pub use dispatcher::{Disposal, DispatchStats, Dispatcher, DispatcherConfig, IterationReport};
pub use error::DispatcherError;
pub use metrics::{DispatchMetrics, MetricsSnapshot};
pub use route::{select_sink, SinkRoute};
pub use sinks::{BrokerSink, BrokerSinkConfig, StreamSink, StreamSinkConfig};
