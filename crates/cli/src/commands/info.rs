//! `info` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;
use crate::error::CliError;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    queue: QueueInfo,
    broker: BrokerInfo,
    stream: StreamInfo,
    capture: CaptureInfo,
}

#[derive(Serialize)]
struct QueueInfo {
    input_capacity: usize,
    output_enabled: bool,
    output_capacity: usize,
    return_to_pool: bool,
    pool_capacity: usize,
}

#[derive(Serialize)]
struct BrokerInfo {
    host: String,
    port: u16,
    client_id: String,
    topic: String,
    tls: bool,
    fail_closed: bool,
    keep_alive_secs: u64,
}

#[derive(Serialize)]
struct StreamInfo {
    target: String,
    chunk_size: usize,
}

#[derive(Serialize)]
struct CaptureInfo {
    frequency_hz: f64,
    payload_size: usize,
    jpeg_ratio: f64,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&blueprint);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&blueprint);
    }

    Ok(())
}

fn build_config_info(blueprint: &contracts::RelayBlueprint) -> ConfigInfo {
    ConfigInfo {
        queue: QueueInfo {
            input_capacity: blueprint.queue.input_capacity,
            output_enabled: blueprint.queue.output_enabled,
            output_capacity: blueprint.queue.output_capacity,
            return_to_pool: blueprint.queue.return_to_pool,
            pool_capacity: blueprint.queue.pool_capacity,
        },
        broker: BrokerInfo {
            host: blueprint.broker.host.clone(),
            port: blueprint.broker.port,
            client_id: blueprint.broker.client_id.clone(),
            topic: blueprint.broker.topic.clone(),
            tls: blueprint.broker.ca_path.is_some(),
            fail_closed: blueprint.broker.fail_closed,
            keep_alive_secs: blueprint.broker.keep_alive_secs,
        },
        stream: StreamInfo {
            target: format!("{:?}", blueprint.stream.target),
            chunk_size: blueprint.stream.chunk_size,
        },
        capture: CaptureInfo {
            frequency_hz: blueprint.capture.frequency_hz,
            payload_size: blueprint.capture.payload_size,
            jpeg_ratio: blueprint.capture.jpeg_ratio,
        },
    }
}

fn print_config_info(blueprint: &contracts::RelayBlueprint) {
    println!("Queue settings:");
    println!("  Input capacity: {}", blueprint.queue.input_capacity);
    println!("  Output enabled: {}", blueprint.queue.output_enabled);
    println!("  Output capacity: {}", blueprint.queue.output_capacity);
    println!("  Return to pool: {}", blueprint.queue.return_to_pool);
    println!("  Pool capacity: {}", blueprint.queue.pool_capacity);

    println!("\nBroker sink:");
    println!(
        "  Broker: {}:{}",
        blueprint.broker.host, blueprint.broker.port
    );
    println!("  Client id: {}", blueprint.broker.client_id);
    println!("  Topic: {}", blueprint.broker.topic);
    println!("  TLS: {}", blueprint.broker.ca_path.is_some());
    println!("  Fail closed: {}", blueprint.broker.fail_closed);
    println!("  Keep-alive: {}s", blueprint.broker.keep_alive_secs);

    println!("\nStream sink:");
    println!("  Target: {:?}", blueprint.stream.target);
    println!("  Chunk size: {}", blueprint.stream.chunk_size);

    println!("\nCapture:");
    println!("  Frequency: {} Hz", blueprint.capture.frequency_hz);
    println!("  Payload size: {} bytes", blueprint.capture.payload_size);
    println!("  JPEG ratio: {:.2}", blueprint.capture.jpeg_ratio);
}
