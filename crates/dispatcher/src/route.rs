//! Sink selection
//!
//! Pure function of the frame's pixel format, kept out of the loop so the
//! routing branch is testable in isolation.

use contracts::PixelFormat;

/// The two forwarding strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkRoute {
    /// Publish the raw payload to the message broker
    Broker,
    /// Emit the encoded payload as one multipart part
    Stream,
}

/// Select the sink for a frame
///
/// Pre-encoded frames stream; everything else publishes. Never both,
/// never neither.
pub fn select_sink(format: PixelFormat) -> SinkRoute {
    if format.is_encoded() {
        SinkRoute::Stream
    } else {
        SinkRoute::Broker
    }
}
