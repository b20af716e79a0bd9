//! # Integration Tests
//!
//! End-to-end tests for the relay pipeline.
//!
//! Covers:
//! - Capture -> queue -> dispatcher -> sink flows without external services
//! - Buffer ownership accounting across the whole pipeline
//! - Configuration loading round-trips

#[cfg(test)]
mod contract_tests {
    use bytes::Bytes;
    use contracts::{FrameBuffer, FrameTimestamp, PixelFormat};

    #[test]
    fn timestamp_header_matches_wire_format() {
        let ts = FrameTimestamp::new(1700000000, 42);
        assert_eq!(ts.as_header_value(), "1700000000.000042");
    }

    #[test]
    fn only_jpeg_counts_as_encoded() {
        assert!(PixelFormat::Jpeg.is_encoded());
        for format in [
            PixelFormat::Rgb565,
            PixelFormat::Yuv422,
            PixelFormat::Grayscale,
            PixelFormat::Rgb888,
        ] {
            assert!(!format.is_encoded());
        }
    }

    #[test]
    fn frame_reports_payload_length() {
        let frame = FrameBuffer::new(
            7,
            FrameTimestamp::new(1, 0),
            PixelFormat::Jpeg,
            Bytes::from_static(b"\xff\xd8abc\xff\xd9"),
        );
        assert_eq!(frame.len(), 7);
        assert!(!frame.is_empty());
    }
}

#[cfg(test)]
mod config_tests {
    use config_loader::{ConfigFormat, ConfigLoader};

    const FULL_TOML: &str = r#"
[queue]
input_capacity = 8
output_enabled = true
output_capacity = 8
return_to_pool = true
pool_capacity = 8

[broker]
host = "mqtt.example.com"
port = 8883
client_id = "relay-1"
topic = "cameras/front/frames"
username = "relay"
password = "secret"
fail_closed = true
keep_alive_secs = 30

[stream]
chunk_size = 2048

[stream.target]
kind = "file"
value = "/tmp/out.mjpeg"

[capture]
frequency_hz = 15.0
payload_size = 2048
jpeg_ratio = 0.5
"#;

    #[test]
    fn full_config_round_trips_through_toml() {
        let blueprint = ConfigLoader::load_from_str(FULL_TOML, ConfigFormat::Toml).unwrap();
        assert_eq!(blueprint.broker.client_id, "relay-1");
        assert_eq!(blueprint.stream.chunk_size, 2048);

        let serialized = ConfigLoader::to_toml(&blueprint).unwrap();
        let reparsed = ConfigLoader::load_from_str(&serialized, ConfigFormat::Toml).unwrap();
        assert_eq!(reparsed.broker.topic, blueprint.broker.topic);
        assert_eq!(reparsed.queue.output_capacity, blueprint.queue.output_capacity);
    }

    #[test]
    fn json_config_loads() {
        let blueprint = ConfigLoader::load_from_str(FULL_TOML, ConfigFormat::Toml).unwrap();
        let json = ConfigLoader::to_json(&blueprint).unwrap();
        let reparsed = ConfigLoader::load_from_str(&json, ConfigFormat::Json).unwrap();
        assert_eq!(reparsed.capture.payload_size, 2048);
    }
}

#[cfg(test)]
mod metrics_tests {
    use observability::RelayMetricsAggregator;

    #[test]
    fn aggregator_tracks_a_mixed_run() {
        let mut agg = RelayMetricsAggregator::new();
        agg.update("stream", true, "pool_returned", 1024);
        agg.update("stream", true, "pool_returned", 2048);
        agg.update("broker", false, "released", 512);

        let summary = agg.summary();
        assert_eq!(summary.total_frames, 3);
        assert_eq!(summary.streamed, 2);
        assert_eq!(summary.published, 1);
        assert_eq!(summary.sink_failures, 1);
        assert_eq!(summary.pool_returned, 2);
        assert_eq!(summary.released, 1);
        assert!((summary.failure_rate - 100.0 / 3.0).abs() < 1e-9);
        assert_eq!(summary.payload_bytes.count, 3);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use bytes::Bytes;
    use contracts::{FrameBuffer, FrameTimestamp, PixelFormat};
    use tokio::io::AsyncReadExt;
    use tokio::sync::watch;

    use capture::{frame_queue, CaptureMetrics, FramePool, MockCaptureConfig, MockCaptureSource};
    use dispatcher::sinks::PART_BOUNDARY;
    use dispatcher::{
        BrokerSink, BrokerSinkConfig, Dispatcher, DispatcherConfig, StreamSink, StreamSinkConfig,
    };

    /// Broker sink pointed at a dead endpoint; publishes fail as
    /// connection errors.
    fn dead_broker() -> BrokerSink {
        BrokerSink::connect(
            "broker",
            BrokerSinkConfig {
                host: "127.0.0.1".to_string(),
                port: 59999,
                ..Default::default()
            },
        )
    }

    fn count_boundaries(stream: &[u8]) -> usize {
        stream
            .windows(PART_BOUNDARY.len())
            .filter(|w| *w == PART_BOUNDARY.as_bytes())
            .count()
    }

    /// Capture -> queue -> dispatcher -> stream sink, buffers recycled.
    ///
    /// Encoded frames must all reach the multipart stream and every buffer
    /// must come back to the pool when no output queue exists.
    #[tokio::test]
    async fn e2e_jpeg_frames_stream_and_recycle() {
        let (input_tx, input_rx) = frame_queue(8);
        let pool = FramePool::new(8);
        let capture_metrics = Arc::new(CaptureMetrics::new());

        let source = MockCaptureSource::new(MockCaptureConfig {
            frequency_hz: 200.0,
            format: PixelFormat::Jpeg,
            payload_size: 1024,
            max_frames: Some(3),
        });
        let capture_handle = source.start(
            input_tx.clone(),
            Some(pool.clone()),
            Arc::clone(&capture_metrics),
        );

        let (writer, mut reader) = tokio::io::duplex(1 << 20);
        let stream = StreamSink::new("stream", writer, StreamSinkConfig::default());

        let dispatcher = Dispatcher::new(
            DispatcherConfig {
                input: input_rx,
                output: None,
                return_to_pool: true,
                pool: Some(pool.clone()),
            },
            dead_broker(),
            stream,
        );

        let (_stop_tx, stop_rx) = watch::channel(false);
        let dispatcher_handle = dispatcher.spawn(stop_rx);

        let produced = tokio::time::timeout(Duration::from_secs(5), capture_handle)
            .await
            .expect("capture timed out")
            .expect("capture task panicked");
        assert_eq!(produced, 3);

        // Producer is done; close the queue so the dispatcher drains out
        input_tx.close();

        let stats = tokio::time::timeout(Duration::from_secs(5), dispatcher_handle)
            .await
            .expect("dispatcher timed out")
            .expect("dispatcher task panicked");

        assert_eq!(stats.frames, 3);
        assert_eq!(stats.metrics.streamed, 3);
        assert_eq!(stats.metrics.published, 0);
        assert_eq!(stats.metrics.sink_failures, 0);
        assert_eq!(stats.metrics.pool_returned, 3);
        assert_eq!(stats.metrics.released, 0);
        assert_eq!(stats.metrics.disposals(), stats.metrics.dispatched);
        assert_eq!(pool.snapshot().recycled, 3);

        // Sink close shuts the writer down, so the reader sees EOF
        let mut written = Vec::new();
        reader.read_to_end(&mut written).await.unwrap();
        assert_eq!(count_boundaries(&written), 3);
        assert!(written.windows(2).any(|w| w == &b"\xff\xd8"[..]));
    }

    /// Raw frames against an unreachable broker: every publish fails, every
    /// buffer is still disposed of exactly once.
    #[tokio::test]
    async fn e2e_broker_down_frames_still_disposed() {
        let (input_tx, input_rx) = frame_queue(8);
        let pool = FramePool::new(8);
        let capture_metrics = Arc::new(CaptureMetrics::new());

        let source = MockCaptureSource::new(MockCaptureConfig {
            frequency_hz: 200.0,
            format: PixelFormat::Rgb565,
            payload_size: 512,
            max_frames: Some(3),
        });
        let capture_handle = source.start(
            input_tx.clone(),
            Some(pool.clone()),
            Arc::clone(&capture_metrics),
        );

        let (writer, _reader) = tokio::io::duplex(1 << 16);
        let stream = StreamSink::new("stream", writer, StreamSinkConfig::default());

        let dispatcher = Dispatcher::new(
            DispatcherConfig {
                input: input_rx,
                output: None,
                return_to_pool: true,
                pool: Some(pool.clone()),
            },
            dead_broker(),
            stream,
        );

        let (_stop_tx, stop_rx) = watch::channel(false);
        let dispatcher_handle = dispatcher.spawn(stop_rx);

        tokio::time::timeout(Duration::from_secs(5), capture_handle)
            .await
            .expect("capture timed out")
            .expect("capture task panicked");
        input_tx.close();

        let stats = tokio::time::timeout(Duration::from_secs(5), dispatcher_handle)
            .await
            .expect("dispatcher timed out")
            .expect("dispatcher task panicked");

        assert_eq!(stats.metrics.published, 3);
        assert_eq!(stats.metrics.sink_failures, 3);
        assert_eq!(stats.metrics.pool_returned, 3);
        assert_eq!(stats.metrics.disposals(), stats.metrics.dispatched);
    }

    /// Output queue enabled: frames are handed downstream in arrival order
    /// and never touch the pool.
    #[tokio::test]
    async fn e2e_output_queue_preserves_order() {
        let (input_tx, input_rx) = frame_queue(8);
        let (output_tx, output_rx) = frame_queue(8);

        for seq in 0..5u64 {
            input_tx
                .send(FrameBuffer::new(
                    seq,
                    FrameTimestamp::new(seq as i64, 0),
                    PixelFormat::Jpeg,
                    Bytes::from_static(b"\xff\xd8data\xff\xd9"),
                ))
                .await
                .expect("queue closed");
        }
        input_tx.close();

        let (writer, _reader) = tokio::io::duplex(1 << 16);
        let stream = StreamSink::new("stream", writer, StreamSinkConfig::default());

        let dispatcher = Dispatcher::new(
            DispatcherConfig {
                input: input_rx,
                output: Some(output_tx),
                return_to_pool: false,
                pool: None,
            },
            dead_broker(),
            stream,
        );

        let (_stop_tx, stop_rx) = watch::channel(false);
        let stats = tokio::time::timeout(Duration::from_secs(5), dispatcher.spawn(stop_rx))
            .await
            .expect("dispatcher timed out")
            .expect("dispatcher task panicked");

        assert_eq!(stats.metrics.forwarded, 5);
        assert_eq!(stats.metrics.pool_returned, 0);
        assert_eq!(stats.metrics.released, 0);

        for expected in 0..5u64 {
            let frame = output_rx.recv().await.expect("output queue empty");
            assert_eq!(frame.seq, expected);
        }
    }

    /// Stop signal during a continuous capture run: the dispatcher winds
    /// down at an iteration boundary with no half-dispatched buffer.
    #[tokio::test]
    async fn e2e_stop_signal_leaves_no_unresolved_buffer() {
        let (input_tx, input_rx) = frame_queue(8);
        let pool = FramePool::new(8);
        let capture_metrics = Arc::new(CaptureMetrics::new());

        let source = MockCaptureSource::jpeg(500.0, 256);
        let capture_handle = source.start(
            input_tx.clone(),
            Some(pool.clone()),
            Arc::clone(&capture_metrics),
        );

        let (writer, _reader) = tokio::io::duplex(1 << 20);
        let stream = StreamSink::new("stream", writer, StreamSinkConfig::default());

        let dispatcher = Dispatcher::new(
            DispatcherConfig {
                input: input_rx,
                output: None,
                return_to_pool: true,
                pool: Some(pool.clone()),
            },
            dead_broker(),
            stream,
        );

        let (stop_tx, stop_rx) = watch::channel(false);
        let dispatcher_handle = dispatcher.spawn(stop_rx);

        tokio::time::sleep(Duration::from_millis(50)).await;
        stop_tx.send(true).unwrap();
        source.stop();

        let stats = tokio::time::timeout(Duration::from_secs(5), dispatcher_handle)
            .await
            .expect("dispatcher timed out")
            .expect("dispatcher task panicked");

        // Whatever was dispatched was also disposed, nothing in between
        assert_eq!(stats.metrics.disposals(), stats.metrics.dispatched);
        assert_eq!(stats.frames, stats.metrics.dispatched);

        tokio::time::timeout(Duration::from_secs(5), capture_handle)
            .await
            .expect("capture timed out")
            .expect("capture task panicked");
    }

    /// Mixed formats route by pixel format, not arrival order.
    #[tokio::test]
    async fn e2e_mixed_formats_split_across_sinks() {
        let (input_tx, input_rx) = frame_queue(8);

        let formats = [
            PixelFormat::Jpeg,
            PixelFormat::Rgb565,
            PixelFormat::Jpeg,
            PixelFormat::Yuv422,
        ];
        for (seq, format) in formats.into_iter().enumerate() {
            input_tx
                .send(FrameBuffer::new(
                    seq as u64,
                    FrameTimestamp::new(seq as i64, 0),
                    format,
                    Bytes::from_static(b"\xff\xd8data\xff\xd9"),
                ))
                .await
                .expect("queue closed");
        }
        input_tx.close();

        let (writer, mut reader) = tokio::io::duplex(1 << 16);
        let stream = StreamSink::new("stream", writer, StreamSinkConfig::default());

        let dispatcher = Dispatcher::new(
            DispatcherConfig {
                input: input_rx,
                output: None,
                return_to_pool: false,
                pool: None,
            },
            dead_broker(),
            stream,
        );

        let (_stop_tx, stop_rx) = watch::channel(false);
        let stats = tokio::time::timeout(Duration::from_secs(5), dispatcher.spawn(stop_rx))
            .await
            .expect("dispatcher timed out")
            .expect("dispatcher task panicked");

        assert_eq!(stats.metrics.streamed, 2);
        assert_eq!(stats.metrics.published, 2);
        assert_eq!(stats.metrics.released, 4);

        let mut written = Vec::new();
        reader.read_to_end(&mut written).await.unwrap();
        assert_eq!(count_boundaries(&written), 2);
    }
}
