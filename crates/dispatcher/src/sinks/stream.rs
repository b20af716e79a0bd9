//! StreamSink - multipart chunked frame streaming
//!
//! Writes each frame as one part of a `multipart/x-mixed-replace` body.
//! The HTTP exchange that precedes the body belongs to the server, not here;
//! the sink only needs something that implements `AsyncWrite`.

use contracts::{ContractError, FrameBuffer, FrameSink, SinkStatus};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

/// Fixed part boundary, wire-compatible with the camera firmware consumers
pub const PART_BOUNDARY: &str = "123456789000000000000987654321";

/// Content-Type header value a server should answer with
pub const STREAM_CONTENT_TYPE: &str =
    "multipart/x-mixed-replace;boundary=123456789000000000000987654321";

const STREAM_BOUNDARY: &str = "\r\n--123456789000000000000987654321\r\n";

/// Configuration for StreamSink
#[derive(Debug, Clone)]
pub struct StreamSinkConfig {
    /// Payload slice size per chunk write
    pub chunk_size: usize,
}

impl Default for StreamSinkConfig {
    fn default() -> Self {
        Self { chunk_size: 4096 }
    }
}

/// Sink that emits frames as multipart parts over any async writer
///
/// A failed chunk write aborts the rest of that frame and latches the sink
/// broken: retrying mid-frame would corrupt the stream framing.
pub struct StreamSink<W> {
    name: String,
    writer: W,
    chunk_size: usize,
    broken: bool,
}

impl<W: AsyncWrite + Unpin + Send> StreamSink<W> {
    /// Create a new StreamSink over `writer`
    pub fn new(name: impl Into<String>, writer: W, config: StreamSinkConfig) -> Self {
        Self {
            name: name.into(),
            writer,
            chunk_size: config.chunk_size.max(1),
            broken: false,
        }
    }

    /// Whether a previous chunk write failed
    pub fn is_broken(&self) -> bool {
        self.broken
    }

    fn part_header(frame: &FrameBuffer) -> String {
        format!(
            "Content-Type: image/jpeg\r\nContent-Length: {}\r\nX-Timestamp: {}\r\n\r\n",
            frame.len(),
            frame.timestamp.as_header_value()
        )
    }

    async fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), ContractError> {
        if let Err(e) = self.writer.write_all(chunk).await {
            self.broken = true;
            warn!(sink = %self.name, error = %e, "chunk write failed, aborting frame");
            return Err(ContractError::sink_connection(&self.name, e.to_string()));
        }
        Ok(())
    }
}

impl<W: AsyncWrite + Unpin + Send> FrameSink for StreamSink<W> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn emit(&mut self, frame: &FrameBuffer) -> Result<SinkStatus, ContractError> {
        if self.broken {
            return Err(ContractError::sink_connection(
                &self.name,
                "stream consumer disconnected",
            ));
        }

        let header = Self::part_header(frame);
        let mut bytes = 0;

        self.write_chunk(STREAM_BOUNDARY.as_bytes()).await?;
        bytes += STREAM_BOUNDARY.len();
        self.write_chunk(header.as_bytes()).await?;
        bytes += header.len();

        // Payload goes out in chunk_size slices; the first failure aborts
        // the remainder of this frame.
        let payload = frame.payload.clone();
        for chunk in payload.chunks(self.chunk_size) {
            self.write_chunk(chunk).await?;
            bytes += chunk.len();
        }

        if let Err(e) = self.writer.flush().await {
            self.broken = true;
            return Err(ContractError::sink_connection(&self.name, e.to_string()));
        }

        debug!(sink = %self.name, seq = frame.seq, bytes, "frame streamed");
        Ok(SinkStatus::Streamed { bytes })
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        if !self.broken {
            self.writer.shutdown().await?;
        }
        debug!(sink = %self.name, "StreamSink closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use contracts::{FrameTimestamp, PixelFormat};
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    fn jpeg_frame(payload: &'static [u8]) -> FrameBuffer {
        FrameBuffer::new(
            7,
            FrameTimestamp::new(42, 123_456),
            PixelFormat::Jpeg,
            Bytes::from_static(payload),
        )
    }

    #[tokio::test]
    async fn emits_boundary_header_and_payload() {
        let mut sink = StreamSink::new("stream", Vec::new(), StreamSinkConfig::default());
        let frame = jpeg_frame(b"\xff\xd8payload\xff\xd9");

        let status = sink.emit(&frame).await.unwrap();

        let written = String::from_utf8_lossy(&sink.writer).into_owned();
        assert!(written.starts_with("\r\n--123456789000000000000987654321\r\n"));
        assert!(written.contains("Content-Type: image/jpeg\r\n"));
        assert!(written.contains("Content-Length: 11\r\n"));
        assert!(written.contains("X-Timestamp: 42.123456\r\n\r\n"));
        assert!(sink.writer.ends_with(b"\xff\xd9"));
        assert_eq!(
            status,
            SinkStatus::Streamed {
                bytes: sink.writer.len()
            }
        );
    }

    #[tokio::test]
    async fn payload_split_into_chunks() {
        let mut sink = StreamSink::new(
            "stream",
            Vec::new(),
            StreamSinkConfig { chunk_size: 4 },
        );
        let frame = jpeg_frame(&[0xAA; 10]);

        let status = sink.emit(&frame).await.unwrap();
        // All ten payload bytes arrive despite the 4-byte chunking
        assert!(sink.writer.ends_with(&[0xAA; 10]));
        assert!(matches!(status, SinkStatus::Streamed { .. }));
    }

    /// Writer that fails every write after the first `allowed` calls
    struct FlakyWriter {
        allowed: usize,
        writes: usize,
        written: Vec<u8>,
    }

    impl AsyncWrite for FlakyWriter {
        fn poll_write(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            if self.writes >= self.allowed {
                return Poll::Ready(Err(io::Error::new(
                    io::ErrorKind::BrokenPipe,
                    "consumer disconnected",
                )));
            }
            self.writes += 1;
            self.written.extend_from_slice(buf);
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn aborts_frame_on_first_failed_chunk() {
        // Boundary and header succeed, first payload chunk fails
        let writer = FlakyWriter {
            allowed: 2,
            writes: 0,
            written: Vec::new(),
        };
        let mut sink = StreamSink::new("stream", writer, StreamSinkConfig { chunk_size: 4 });
        let frame = jpeg_frame(&[0x55; 16]);

        let err = sink.emit(&frame).await.unwrap_err();
        assert!(err.is_connection_error());
        assert!(sink.is_broken());
        // No payload chunk landed after the failure
        assert_eq!(sink.writer.writes, 2);
    }

    #[tokio::test]
    async fn broken_sink_refuses_further_frames() {
        let writer = FlakyWriter {
            allowed: 0,
            writes: 0,
            written: Vec::new(),
        };
        let mut sink = StreamSink::new("stream", writer, StreamSinkConfig::default());
        let frame = jpeg_frame(b"\xff\xd8\xff\xd9");

        assert!(sink.emit(&frame).await.is_err());

        // Second frame is refused without touching the writer again
        let err = sink.emit(&frame).await.unwrap_err();
        assert!(err.is_connection_error());
        assert_eq!(sink.writer.writes, 0);
    }
}
