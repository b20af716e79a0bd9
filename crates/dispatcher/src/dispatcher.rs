//! Dispatcher - main loop routing frames to sinks
//!
//! One iteration = one frame dequeued, dispatched, and its ownership
//! resolved. Exactly one of {forward, pool-return, release} happens per
//! frame, sink success or not.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use capture::{FramePool, FrameReceiver, FrameSender};
use contracts::{ContractError, FrameBuffer, FrameSink, SinkStatus};

use crate::error::DispatcherError;
use crate::metrics::{DispatchMetrics, MetricsSnapshot};
use crate::route::{select_sink, SinkRoute};

/// Dispatcher configuration
///
/// Set once before the loop starts; the dispatcher consumes it and no
/// concurrent reconfiguration is possible.
pub struct DispatcherConfig {
    /// Input queue (producer -> dispatcher)
    pub input: FrameReceiver,

    /// Optional output queue (dispatcher -> downstream consumer)
    pub output: Option<FrameSender>,

    /// Return buffers to the capture pool when no output queue is configured
    pub return_to_pool: bool,

    /// Capture-side buffer pool (required for return_to_pool)
    pub pool: Option<FramePool>,
}

/// How the dispatcher resolved ownership of a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposal {
    /// Sent to the output queue; downstream owns the buffer now
    Forwarded,
    /// Returned to the capture pool
    PoolReturned,
    /// Dropped outright (last-resort disposal)
    Released,
}

/// Result of one dispatch iteration
#[derive(Debug)]
pub struct IterationReport {
    /// Which sink the frame was routed to
    pub route: SinkRoute,
    /// Sink outcome; a failure here never blocks disposal
    pub sink: Result<SinkStatus, ContractError>,
    /// How the buffer was disposed of
    pub disposal: Disposal,
    /// Payload length of the dispatched frame
    pub payload_bytes: usize,
}

/// Statistics from a finished dispatch loop
#[derive(Debug, Clone, Copy, Default)]
pub struct DispatchStats {
    pub frames: u64,
    pub metrics: MetricsSnapshot,
}

/// The frame dispatcher
///
/// Owns its queues and both sinks; a single instance processes frames
/// strictly in arrival order. Run several instances over independent queue
/// pairs for parallelism.
pub struct Dispatcher<B, S> {
    input: FrameReceiver,
    output: Option<FrameSender>,
    return_to_pool: bool,
    pool: Option<FramePool>,
    broker: B,
    stream: S,
    metrics: Arc<DispatchMetrics>,
}

impl<B, S> Dispatcher<B, S>
where
    B: FrameSink + Send + 'static,
    S: FrameSink + Send + 'static,
{
    /// Create a dispatcher from configuration and the two sink adapters
    pub fn new(config: DispatcherConfig, broker: B, stream: S) -> Self {
        Self {
            input: config.input,
            output: config.output,
            return_to_pool: config.return_to_pool,
            pool: config.pool,
            broker,
            stream,
            metrics: Arc::new(DispatchMetrics::new()),
        }
    }

    /// Shared metrics handle
    pub fn metrics(&self) -> Arc<DispatchMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Run one iteration: dequeue, dispatch, resolve ownership
    ///
    /// # Errors
    /// `CaptureUnavailable` when the input queue is closed and drained; no
    /// buffer was touched in that case.
    pub async fn run_once(&mut self) -> Result<IterationReport, DispatcherError> {
        let frame = self
            .input
            .recv()
            .await
            .map_err(|_| DispatcherError::CaptureUnavailable)?;
        Ok(self.dispatch(frame).await)
    }

    /// Dispatch one already-dequeued frame
    ///
    /// Not cancel-safe by design: callers must let this future complete so
    /// the in-flight buffer reaches disposal.
    #[instrument(name = "dispatch_frame", skip(self, frame), fields(seq = frame.seq))]
    async fn dispatch(&mut self, frame: FrameBuffer) -> IterationReport {
        self.metrics.inc_dispatched();

        let payload_bytes = frame.len();
        let route = select_sink(frame.format);
        let sink = match route {
            SinkRoute::Broker => {
                self.metrics.inc_published();
                self.broker.emit(&frame).await
            }
            SinkRoute::Stream => {
                self.metrics.inc_streamed();
                self.stream.emit(&frame).await
            }
        };

        match &sink {
            Ok(SinkStatus::Streamed { bytes }) => {
                self.metrics.add_stream_bytes(*bytes as u64);
                debug!(route = ?route, bytes, "frame emitted");
            }
            Ok(SinkStatus::Published { topic }) => {
                debug!(route = ?route, topic = %topic, "frame emitted");
            }
            Err(e) => {
                self.metrics.inc_sink_failures();
                warn!(route = ?route, error = %e, "sink failed, disposing buffer anyway");
            }
        }

        // Disposal is unconditional: an undisposed buffer is worse than an
        // unreported send failure.
        let disposal = self.resolve_ownership(frame).await;

        IterationReport {
            route,
            sink,
            disposal,
            payload_bytes,
        }
    }

    /// Resolve buffer ownership in strict priority order
    ///
    /// output queue > pool return > release. The frame is moved in, so each
    /// path is the buffer's single disposal.
    async fn resolve_ownership(&mut self, frame: FrameBuffer) -> Disposal {
        if let Some(output) = &self.output {
            match output.send(frame).await {
                Ok(()) => {
                    self.metrics.inc_forwarded();
                    return Disposal::Forwarded;
                }
                Err(frame) => {
                    // Downstream is gone; fall back so the buffer is not leaked
                    warn!(seq = frame.seq, "output queue closed, retiring buffer locally");
                    return self.retire(frame);
                }
            }
        }
        self.retire(frame)
    }

    fn retire(&self, frame: FrameBuffer) -> Disposal {
        if self.return_to_pool {
            if let Some(pool) = &self.pool {
                pool.recycle(frame);
                self.metrics.inc_pool_returned();
                return Disposal::PoolReturned;
            }
        }
        drop(frame);
        self.metrics.inc_released();
        Disposal::Released
    }

    /// Run the dispatch loop until the input closes or `stop` flips true
    ///
    /// The stop signal is only honored on iteration boundaries; an in-flight
    /// frame always completes its ownership resolution first. Sink errors are
    /// reported and the loop keeps going.
    #[instrument(name = "dispatcher_run", skip(self, stop))]
    pub async fn run(mut self, mut stop: watch::Receiver<bool>) -> DispatchStats {
        info!("dispatcher started");
        let mut frames: u64 = 0;
        // Cleared when the stop sender is dropped; a closed stop channel
        // means "never stop", so only queue closure ends the loop then.
        let mut stop_open = true;

        loop {
            if *stop.borrow() {
                info!("stop signal received, shutting down");
                break;
            }

            // Cancelling a blocked receive is safe: no buffer has been
            // dequeued yet. Once a frame is in hand, dispatch runs to
            // completion.
            let frame = tokio::select! {
                biased;
                changed = stop.changed(), if stop_open => {
                    if changed.is_err() {
                        debug!("stop channel closed, running until the input closes");
                        stop_open = false;
                    }
                    continue;
                }
                received = self.input.recv() => match received {
                    Ok(frame) => frame,
                    Err(_) => {
                        info!("input queue closed, shutting down");
                        break;
                    }
                },
            };

            let report = self.dispatch(frame).await;
            frames += 1;

            if frames.is_multiple_of(100) {
                debug!(frames, "dispatcher progress");
            }

            if let Err(e) = &report.sink {
                debug!(error = %e, "iteration finished with sink error");
            }
        }

        self.close_sinks().await;

        let stats = DispatchStats {
            frames,
            metrics: self.metrics.snapshot(),
        };
        info!(frames = stats.frames, "dispatcher shutdown complete");
        stats
    }

    /// Spawn the dispatch loop as a background task
    pub fn spawn(self, stop: watch::Receiver<bool>) -> JoinHandle<DispatchStats> {
        tokio::spawn(async move { self.run(stop).await })
    }

    /// Close both sinks, logging failures
    ///
    /// `run` does this on exit; callers driving `run_once` themselves call
    /// it once the loop ends.
    pub async fn close_sinks(&mut self) {
        if let Err(e) = self.broker.close().await {
            warn!(error = %e, "broker sink close failed");
        }
        if let Err(e) = self.stream.close().await {
            warn!(error = %e, "stream sink close failed");
        }
    }
}
