//! Mock capture source
//!
//! Stands in for camera hardware in tests and demos. Produces synthetic
//! frames at a fixed rate, reusing pooled buffers when available.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use contracts::{FrameBuffer, FrameTimestamp, PixelFormat};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::{CaptureMetrics, FramePool, FrameSender};

/// Mock capture source configuration
#[derive(Debug, Clone)]
pub struct MockCaptureConfig {
    /// Frame rate (Hz)
    pub frequency_hz: f64,

    /// Pixel format of produced frames
    pub format: PixelFormat,

    /// Payload size in bytes
    pub payload_size: usize,

    /// Stop after this many frames (None = until stopped)
    pub max_frames: Option<u64>,
}

impl Default for MockCaptureConfig {
    fn default() -> Self {
        Self {
            frequency_hz: 10.0,
            format: PixelFormat::Jpeg,
            payload_size: 4096,
            max_frames: None,
        }
    }
}

/// Mock capture source
///
/// Generates synthetic frame data for testing.
pub struct MockCaptureSource {
    config: MockCaptureConfig,
    running: Arc<AtomicBool>,
    seq: Arc<AtomicU64>,
}

impl MockCaptureSource {
    /// Create a new mock capture source
    pub fn new(config: MockCaptureConfig) -> Self {
        Self {
            config,
            running: Arc::new(AtomicBool::new(false)),
            seq: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Create a JPEG-producing source
    pub fn jpeg(frequency_hz: f64, payload_size: usize) -> Self {
        Self::new(MockCaptureConfig {
            frequency_hz,
            format: PixelFormat::Jpeg,
            payload_size,
            ..Default::default()
        })
    }

    /// Create a raw-frame source
    pub fn raw(frequency_hz: f64, format: PixelFormat, payload_size: usize) -> Self {
        Self::new(MockCaptureConfig {
            frequency_hz,
            format,
            payload_size,
            ..Default::default()
        })
    }

    /// Start producing frames into `tx`
    ///
    /// Reuses pooled buffers when a pool is provided. Returns the producer
    /// task handle; the task ends when stopped, when `max_frames` is
    /// reached, or when the queue closes.
    pub fn start(
        &self,
        tx: FrameSender,
        pool: Option<FramePool>,
        metrics: Arc<CaptureMetrics>,
    ) -> JoinHandle<u64> {
        self.running.store(true, Ordering::SeqCst);

        let config = self.config.clone();
        let running = Arc::clone(&self.running);
        let seq = Arc::clone(&self.seq);
        let interval = Duration::from_secs_f64(1.0 / config.frequency_hz.max(0.001));

        tokio::spawn(async move {
            debug!(format = ?config.format, hz = config.frequency_hz, "mock capture started");
            let mut produced: u64 = 0;

            while running.load(Ordering::SeqCst) {
                if let Some(max) = config.max_frames {
                    if produced >= max {
                        break;
                    }
                }

                let frame = build_frame(&config, &pool, seq.fetch_add(1, Ordering::SeqCst));
                trace!(seq = frame.seq, "mock frame captured");

                if tx.send(frame).await.is_err() {
                    metrics.record_refused();
                    break;
                }
                produced += 1;
                metrics.record_produced();
                metrics.update_queue_depth(tx.len());

                tokio::time::sleep(interval).await;
            }

            debug!(produced, "mock capture stopped");
            produced
        })
    }

    /// Stop producing frames
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Detached handle that can stop this source from another task
    pub fn halt_handle(&self) -> CaptureHalt {
        CaptureHalt {
            running: Arc::clone(&self.running),
        }
    }

    /// Whether the source is currently producing
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Clonable stop handle for a running capture source
#[derive(Clone)]
pub struct CaptureHalt {
    running: Arc<AtomicBool>,
}

impl CaptureHalt {
    /// Stop the source; the producer task exits at its next iteration
    pub fn halt(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

fn build_frame(config: &MockCaptureConfig, pool: &Option<FramePool>, seq: u64) -> FrameBuffer {
    // Reuse a pooled allocation when one is available
    let payload = pool
        .as_ref()
        .and_then(|p| p.acquire())
        .map(|recycled| recycled.payload)
        .filter(|payload| payload.len() == config.payload_size)
        .unwrap_or_else(|| synthetic_payload(config.format, config.payload_size));

    FrameBuffer::new(seq, now_timestamp(), config.format, payload)
}

fn synthetic_payload(format: PixelFormat, size: usize) -> Bytes {
    let mut data = vec![0u8; size.max(4)];
    if format.is_encoded() {
        // JPEG SOI/EOI markers so the payload looks like an encoded image
        data[0] = 0xFF;
        data[1] = 0xD8;
        let len = data.len();
        data[len - 2] = 0xFF;
        data[len - 1] = 0xD9;
    }
    Bytes::from(data)
}

fn now_timestamp() -> FrameTimestamp {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO);
    FrameTimestamp::new(now.as_secs() as i64, now.subsec_micros())
}
