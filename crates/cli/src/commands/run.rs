//! `run` command implementation.

use anyhow::{Context, Result};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_relay(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    // Validate config path
    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    // Load and parse configuration
    let mut blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    // Apply CLI overrides
    if let Some(ref host) = args.broker_host {
        info!(host = %host, "Overriding broker host from CLI");
        blueprint.broker.host = host.clone();
    }
    if let Some(port) = args.broker_port {
        info!(port = %port, "Overriding broker port from CLI");
        blueprint.broker.port = port;
    }

    info!(
        broker = format!("{}:{}", blueprint.broker.host, blueprint.broker.port),
        topic = %blueprint.broker.topic,
        stream_target = ?blueprint.stream.target,
        input_capacity = blueprint.queue.input_capacity,
        "Configuration loaded"
    );

    // Dry run - just validate and exit
    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    // Build pipeline configuration
    let pipeline_config = PipelineConfig {
        blueprint,
        max_frames: if args.max_frames == 0 {
            None
        } else {
            Some(args.max_frames)
        },
        timeout: if args.timeout == 0 {
            None
        } else {
            Some(Duration::from_secs(args.timeout))
        },
        metrics_port: if args.metrics_port == 0 {
            None
        } else {
            Some(args.metrics_port)
        },
    };

    // Create pipeline
    let pipeline = Pipeline::new(pipeline_config);

    // Setup graceful shutdown: the signal flips the stop channel, the
    // pipeline finishes its in-flight frame and winds down on its own.
    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        warn!("Received shutdown signal, stopping pipeline...");
        let _ = stop_tx.send(true);
    });

    info!("Starting pipeline...");

    let stats = pipeline
        .run(stop_rx)
        .await
        .context("Pipeline execution failed")?;

    info!(
        frames_relayed = stats.frames_relayed,
        sink_failures = stats.sink_failures,
        duration_secs = stats.duration.as_secs_f64(),
        fps = format!("{:.2}", stats.fps()),
        "Pipeline completed successfully"
    );

    // Print detailed statistics
    stats.print_summary();

    info!("camrelay finished");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &contracts::RelayBlueprint) {
    println!("\n=== Configuration Summary ===\n");
    println!("Queues:");
    println!("  Input capacity: {}", blueprint.queue.input_capacity);
    if blueprint.queue.output_enabled {
        println!("  Output capacity: {}", blueprint.queue.output_capacity);
    } else {
        println!("  Output queue: disabled");
    }
    println!("  Return to pool: {}", blueprint.queue.return_to_pool);
    println!("  Pool capacity: {}", blueprint.queue.pool_capacity);

    println!("\nBroker sink:");
    println!(
        "  Broker: {}:{}",
        blueprint.broker.host, blueprint.broker.port
    );
    println!("  Client id: {}", blueprint.broker.client_id);
    println!("  Topic: {}", blueprint.broker.topic);
    println!(
        "  TLS: {}",
        match blueprint.broker.ca_path {
            Some(ref ca) => format!("enabled ({})", ca.display()),
            None => "disabled".to_string(),
        }
    );
    println!("  Fail closed: {}", blueprint.broker.fail_closed);

    println!("\nStream sink:");
    println!("  Target: {:?}", blueprint.stream.target);
    println!("  Chunk size: {}", blueprint.stream.chunk_size);

    println!("\nCapture:");
    println!("  Frequency: {} Hz", blueprint.capture.frequency_hz);
    println!("  Payload size: {} bytes", blueprint.capture.payload_size);
    println!("  JPEG ratio: {:.2}", blueprint.capture.jpeg_ratio);
}
