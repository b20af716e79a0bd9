//! FrameBuffer - Capture output
//!
//! One captured image plus metadata, passed by handle through the pipeline.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Pixel format tag of a captured frame
///
/// The dispatch decision only cares about encoded vs. raw, but the concrete
/// raw layout is kept for diagnostics and downstream consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
    /// Pre-encoded JPEG, ready for multipart streaming
    Jpeg,
    Rgb565,
    Yuv422,
    Grayscale,
    Rgb888,
}

impl PixelFormat {
    /// Whether the payload is already an encoded image
    pub fn is_encoded(&self) -> bool {
        matches!(self, Self::Jpeg)
    }
}

/// Capture timestamp (seconds + microseconds since epoch)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FrameTimestamp {
    pub sec: i64,
    pub usec: u32,
}

impl FrameTimestamp {
    pub fn new(sec: i64, usec: u32) -> Self {
        Self { sec, usec }
    }

    /// Wire form used in the stream part header: `<sec>.<06usec>`
    pub fn as_header_value(&self) -> String {
        format!("{}.{:06}", self.sec, self.usec)
    }
}

/// Captured frame handle
///
/// The payload is zero-copy (`Bytes`); the handle itself carries disposal
/// responsibility. Whoever owns the `FrameBuffer` value must eventually
/// forward it, recycle it into a pool, or drop it - exactly once, which
/// the move semantics enforce.
#[derive(Debug, Serialize, Deserialize)]
pub struct FrameBuffer {
    /// Frame sequence number (monotonically increasing per source)
    pub seq: u64,

    /// Capture timestamp
    pub timestamp: FrameTimestamp,

    /// Pixel format tag
    pub format: PixelFormat,

    /// Raw frame bytes (zero-copy)
    pub payload: Bytes,
}

impl FrameBuffer {
    /// Create a new frame handle
    pub fn new(seq: u64, timestamp: FrameTimestamp, format: PixelFormat, payload: Bytes) -> Self {
        Self {
            seq,
            timestamp,
            format,
            payload,
        }
    }

    /// Payload length in bytes
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Whether the payload is empty
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}
