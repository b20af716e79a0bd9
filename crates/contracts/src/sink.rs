//! FrameSink trait - Dispatcher output interface
//!
//! Defines the abstract interface for Sinks.

use crate::{ContractError, FrameBuffer};

/// Outcome of a successful sink call
///
/// Consumed immediately by the dispatcher for logging/metrics; never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkStatus {
    /// Frame emitted as one multipart part
    Streamed { bytes: usize },
    /// Frame published to the broker under `topic`
    Published { topic: String },
}

/// Frame output trait
///
/// All sink implementations must implement this trait. A sink borrows the
/// frame: disposal responsibility stays with the caller.
#[trait_variant::make(FrameSink: Send)]
pub trait LocalFrameSink {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Emit one frame
    ///
    /// # Errors
    /// `SinkConnection` when the transport is gone, `SinkTransmit` when the
    /// transport accepted the call but the write/publish failed.
    async fn emit(&mut self, frame: &FrameBuffer) -> Result<SinkStatus, ContractError>;

    /// Close sink
    async fn close(&mut self) -> Result<(), ContractError>;
}
