//! Mock Pipeline Demo
//!
//! Runs the full relay path with a synthetic capture source and a file
//! stream target. No camera hardware or MQTT broker required: the broker
//! sink simply reports connection failures and the dispatcher keeps going.
//!
//! Run with: cargo run --bin mock_pipeline
//! Optionally pass a config path: cargo run --bin mock_pipeline config.toml

use std::sync::Arc;

use capture::{frame_queue, CaptureMetrics, FramePool, MockCaptureConfig, MockCaptureSource};
use config_loader::ConfigLoader;
use contracts::{PixelFormat, RelayBlueprint};
use dispatcher::{
    BrokerSink, BrokerSinkConfig, Dispatcher, DispatcherConfig, StreamSink, StreamSinkConfig,
};
use tokio::sync::watch;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    tracing::info!("Starting Mock Pipeline Demo");

    // ==== Stage 1: Use default config or load from file ====
    let blueprint = if let Some(path) = std::env::args().nth(1) {
        tracing::info!(path = %path, "Loading relay config");
        ConfigLoader::load_from_path(std::path::Path::new(&path))?
    } else {
        demo_blueprint()
    };

    // ==== Stage 2: Queues and buffer pool ====
    let (input_tx, input_rx) = frame_queue(blueprint.queue.input_capacity);
    let pool = FramePool::new(blueprint.queue.pool_capacity);

    // ==== Stage 3: Sinks ====
    let stream_file = tokio::fs::File::create("./demo_stream.mjpeg").await?;
    let stream = StreamSink::new(
        "stream",
        stream_file,
        StreamSinkConfig {
            chunk_size: blueprint.stream.chunk_size,
        },
    );

    let broker = BrokerSink::connect(
        "broker",
        BrokerSinkConfig {
            host: blueprint.broker.host.clone(),
            port: blueprint.broker.port,
            client_id: blueprint.broker.client_id.clone(),
            topic: blueprint.broker.topic.clone(),
            ..Default::default()
        },
    );

    // ==== Stage 4: Capture source (synthetic JPEG frames) ====
    let capture_metrics = Arc::new(CaptureMetrics::new());
    let source = MockCaptureSource::new(MockCaptureConfig {
        frequency_hz: blueprint.capture.frequency_hz,
        format: PixelFormat::Jpeg,
        payload_size: blueprint.capture.payload_size,
        max_frames: Some(30),
    });
    let capture_handle = source.start(
        input_tx.clone(),
        Some(pool.clone()),
        Arc::clone(&capture_metrics),
    );

    // ==== Stage 5: Dispatch until the capture run drains out ====
    let dispatcher = Dispatcher::new(
        DispatcherConfig {
            input: input_rx,
            output: None,
            return_to_pool: blueprint.queue.return_to_pool,
            pool: Some(pool.clone()),
        },
        broker,
        stream,
    );

    let (_stop_tx, stop_rx) = watch::channel(false);
    let dispatcher_handle = dispatcher.spawn(stop_rx);

    let produced = capture_handle.await?;
    tracing::info!(produced, "Capture finished");
    input_tx.close();

    let stats = dispatcher_handle.await?;

    tracing::info!(
        frames = stats.frames,
        streamed = stats.metrics.streamed,
        published = stats.metrics.published,
        sink_failures = stats.metrics.sink_failures,
        pool_returned = stats.metrics.pool_returned,
        released = stats.metrics.released,
        "Dispatch finished"
    );

    let pool_state = pool.snapshot();
    tracing::info!(
        retained = pool_state.retained,
        recycled = pool_state.recycled,
        acquired = pool_state.acquired,
        "Pool state"
    );

    tracing::info!("Demo complete; multipart output written to ./demo_stream.mjpeg");
    Ok(())
}

/// Built-in blueprint so the demo runs without a config file
fn demo_blueprint() -> RelayBlueprint {
    RelayBlueprint {
        queue: Default::default(),
        broker: contracts::BrokerSettings {
            host: "localhost".to_string(),
            port: 1883,
            client_id: "camrelay-demo".to_string(),
            topic: "camrelay/demo/frames".to_string(),
            username: None,
            password: None,
            ca_path: None,
            fail_closed: true,
            keep_alive_secs: 60,
        },
        stream: Default::default(),
        capture: Default::default(),
    }
}
