//! Pipeline orchestrator - coordinates capture, dispatch, and sinks.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context as TaskContext, Poll};
use std::time::{Duration, Instant};

use anyhow::Result;
use contracts::{PixelFormat, RelayBlueprint, StreamTarget};
use tokio::io::AsyncWrite;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use capture::{frame_queue, CaptureMetrics, FramePool, MockCaptureSource};
use dispatcher::{
    BrokerSink, BrokerSinkConfig, Dispatcher, DispatcherConfig, DispatcherError, Disposal,
    SinkRoute, StreamSink, StreamSinkConfig,
};
use observability::{record_frame_dispatched, record_frame_disposed, record_stream_bytes};

use super::PipelineStats;
use crate::error::CliError;

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// The relay blueprint configuration
    pub blueprint: RelayBlueprint,

    /// Maximum number of frames to relay (None = unlimited)
    pub max_frames: Option<u64>,

    /// Pipeline timeout (None = no timeout)
    pub timeout: Option<Duration>,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Stream sink destination opened from the blueprint
///
/// One concrete writer type so a single dispatcher monomorphization covers
/// both targets.
enum StreamWriter {
    File(tokio::fs::File),
    Tcp(tokio::net::TcpStream),
}

impl AsyncWrite for StreamWriter {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut TaskContext<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        match &mut *self {
            StreamWriter::File(f) => Pin::new(f).poll_write(cx, buf),
            StreamWriter::Tcp(s) => Pin::new(s).poll_write(cx, buf),
        }
    }

    fn poll_flush(
        mut self: Pin<&mut Self>,
        cx: &mut TaskContext<'_>,
    ) -> Poll<std::io::Result<()>> {
        match &mut *self {
            StreamWriter::File(f) => Pin::new(f).poll_flush(cx),
            StreamWriter::Tcp(s) => Pin::new(s).poll_flush(cx),
        }
    }

    fn poll_shutdown(
        mut self: Pin<&mut Self>,
        cx: &mut TaskContext<'_>,
    ) -> Poll<std::io::Result<()>> {
        match &mut *self {
            StreamWriter::File(f) => Pin::new(f).poll_shutdown(cx),
            StreamWriter::Tcp(s) => Pin::new(s).poll_shutdown(cx),
        }
    }
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run the pipeline to completion
    ///
    /// Winds down when the stop channel flips true, the frame limit is
    /// reached, or the timeout fires. Shutdown drains: capture stops first,
    /// then the dispatcher consumes whatever is still queued.
    pub async fn run(self, stop: watch::Receiver<bool>) -> Result<PipelineStats> {
        let start_time = Instant::now();
        let blueprint = &self.config.blueprint;

        // Metrics endpoint (optional)
        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        // Open the stream target
        info!(target = ?blueprint.stream.target, "Opening stream target");
        let writer = open_stream_target(&blueprint.stream.target).await?;
        let stream = StreamSink::new(
            "stream",
            writer,
            StreamSinkConfig {
                chunk_size: blueprint.stream.chunk_size,
            },
        );

        // Broker sink; connection is established in the background, early
        // publishes fail over to disposal until the session is up.
        info!(
            host = %blueprint.broker.host,
            port = blueprint.broker.port,
            topic = %blueprint.broker.topic,
            "Connecting broker sink"
        );
        let broker = BrokerSink::connect(
            "broker",
            BrokerSinkConfig {
                host: blueprint.broker.host.clone(),
                port: blueprint.broker.port,
                client_id: blueprint.broker.client_id.clone(),
                topic: blueprint.broker.topic.clone(),
                username: blueprint.broker.username.clone(),
                password: blueprint.broker.password.clone(),
                ca_path: blueprint.broker.ca_path.clone(),
                fail_closed: blueprint.broker.fail_closed,
                keep_alive: Duration::from_secs(blueprint.broker.keep_alive_secs),
                ..Default::default()
            },
        );

        // Queues and buffer pool
        let (input_tx, input_rx) = frame_queue(blueprint.queue.input_capacity);
        let pool = if blueprint.queue.return_to_pool {
            Some(FramePool::new(blueprint.queue.pool_capacity))
        } else {
            None
        };

        // Optional output queue with a draining consumer standing in for
        // downstream processing
        let (output_tx, drain_handle) = if blueprint.queue.output_enabled {
            let (tx, rx) = frame_queue(blueprint.queue.output_capacity);
            let handle = tokio::spawn(async move {
                let mut drained: u64 = 0;
                while let Ok(frame) = rx.recv().await {
                    debug!(seq = frame.seq, len = frame.len(), "downstream consumed frame");
                    drained += 1;
                }
                drained
            });
            (Some(tx), Some(handle))
        } else {
            (None, None)
        };

        // Capture sources split by the configured JPEG ratio
        let capture_metrics = Arc::new(CaptureMetrics::new());
        let sources = build_capture_sources(blueprint);
        let mut capture_handles = Vec::with_capacity(sources.len());
        for source in &sources {
            capture_handles.push(source.start(
                input_tx.clone(),
                pool.clone(),
                Arc::clone(&capture_metrics),
            ));
        }

        info!(sources = sources.len(), "Capture started");

        // Shutdown controller: on stop or timeout, halt capture and close
        // the input queue so the dispatch loop drains out naturally.
        let controller_sources: Vec<_> = sources.iter().map(|s| s.halt_handle()).collect();
        let controller_tx = input_tx.clone();
        let timeout = self.config.timeout;
        let mut controller_stop = stop;
        let controller = tokio::spawn(async move {
            let deadline = async {
                match timeout {
                    Some(t) => tokio::time::sleep(t).await,
                    None => std::future::pending().await,
                }
            };
            tokio::select! {
                _ = controller_stop.changed() => {
                    info!("stop requested, halting capture");
                }
                _ = deadline => {
                    info!("pipeline timeout reached, halting capture");
                }
            }
            for halt in &controller_sources {
                halt.halt();
            }
            controller_tx.close();
        });

        // Dispatch loop
        let mut dispatcher = Dispatcher::new(
            DispatcherConfig {
                input: input_rx,
                output: output_tx.clone(),
                return_to_pool: blueprint.queue.return_to_pool,
                pool: pool.clone(),
            },
            broker,
            stream,
        );

        let mut stats = PipelineStats::default();
        let max_frames = self.config.max_frames;
        let mut halting = false;

        loop {
            let report = match dispatcher.run_once().await {
                Ok(report) => report,
                Err(DispatcherError::CaptureUnavailable) => {
                    info!("input queue drained, stopping dispatch loop");
                    break;
                }
                Err(e) => {
                    warn!(error = %e, "dispatch iteration failed");
                    break;
                }
            };

            let route = route_label(report.route);
            let disposal = disposal_label(report.disposal);
            let success = report.sink.is_ok();

            record_frame_dispatched(route, success);
            record_frame_disposed(disposal);
            if let Ok(contracts::SinkStatus::Streamed { bytes }) = &report.sink {
                record_stream_bytes(*bytes as u64);
            }
            stats
                .relay_metrics
                .update(route, success, disposal, report.payload_bytes);
            stats.frames_relayed += 1;
            if !success {
                stats.sink_failures += 1;
            }

            if let Some(max) = max_frames {
                if stats.frames_relayed >= max && !halting {
                    info!(max, "frame limit reached, halting capture");
                    for source in &sources {
                        source.stop();
                    }
                    input_tx.close();
                    halting = true;
                }
            }
        }

        dispatcher.close_sinks().await;
        controller.abort();

        // Capture tasks end once the queue closes
        for handle in capture_handles {
            match handle.await {
                Ok(produced) => stats.frames_produced += produced,
                Err(e) => warn!(error = %e, "capture task panicked"),
            }
        }

        if let Some(tx) = output_tx {
            tx.close();
        }
        if let Some(handle) = drain_handle {
            match handle.await {
                Ok(drained) => debug!(drained, "downstream drain finished"),
                Err(e) => warn!(error = %e, "drain task panicked"),
            }
        }

        if let Some(ref pool) = pool {
            let snapshot = pool.snapshot();
            info!(
                retained = snapshot.retained,
                recycled = snapshot.recycled,
                acquired = snapshot.acquired,
                released = snapshot.released,
                "Buffer pool final state"
            );
            stats.pool_retained = snapshot.retained;
        }

        stats.duration = start_time.elapsed();
        Ok(stats)
    }
}

/// Open the configured stream destination
async fn open_stream_target(target: &StreamTarget) -> Result<StreamWriter> {
    match target {
        StreamTarget::File(path) => {
            let file = tokio::fs::File::create(path)
                .await
                .map_err(|e| CliError::stream_target(path.display().to_string(), e.to_string()))?;
            Ok(StreamWriter::File(file))
        }
        StreamTarget::Tcp(addr) => {
            let socket = tokio::net::TcpStream::connect(addr)
                .await
                .map_err(|e| CliError::stream_target(addr.clone(), e.to_string()))?;
            Ok(StreamWriter::Tcp(socket))
        }
    }
}

/// Build mock capture sources honoring the configured JPEG ratio
///
/// A pure ratio (0.0 or 1.0) gets a single source; anything in between
/// splits the frequency across one encoded and one raw source.
fn build_capture_sources(blueprint: &RelayBlueprint) -> Vec<MockCaptureSource> {
    let capture = &blueprint.capture;
    let ratio = capture.jpeg_ratio.clamp(0.0, 1.0);

    if ratio >= 1.0 {
        vec![MockCaptureSource::jpeg(
            capture.frequency_hz,
            capture.payload_size,
        )]
    } else if ratio <= 0.0 {
        vec![MockCaptureSource::raw(
            capture.frequency_hz,
            PixelFormat::Rgb565,
            capture.payload_size,
        )]
    } else {
        vec![
            MockCaptureSource::jpeg(capture.frequency_hz * ratio, capture.payload_size),
            MockCaptureSource::raw(
                capture.frequency_hz * (1.0 - ratio),
                PixelFormat::Rgb565,
                capture.payload_size,
            ),
        ]
    }
}

fn route_label(route: SinkRoute) -> &'static str {
    match route {
        SinkRoute::Stream => "stream",
        SinkRoute::Broker => "broker",
    }
}

fn disposal_label(disposal: Disposal) -> &'static str {
    match disposal {
        Disposal::Forwarded => "forwarded",
        Disposal::PoolReturned => "pool_returned",
        Disposal::Released => "released",
    }
}
