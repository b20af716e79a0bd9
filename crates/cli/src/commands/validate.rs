//! `validate` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    broker: String,
    topic: String,
    stream_target: String,
    input_capacity: usize,
    output_enabled: bool,
    return_to_pool: bool,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    // Check file exists
    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    // Try to load and validate
    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);

            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    broker: format!("{}:{}", blueprint.broker.host, blueprint.broker.port),
                    topic: blueprint.broker.topic.clone(),
                    stream_target: format!("{:?}", blueprint.stream.target),
                    input_capacity: blueprint.queue.input_capacity,
                    output_enabled: blueprint.queue.output_enabled,
                    return_to_pool: blueprint.queue.return_to_pool,
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &contracts::RelayBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    if !blueprint.queue.output_enabled && !blueprint.queue.return_to_pool {
        warnings.push(
            "No output queue and return_to_pool disabled - every buffer will be released"
                .to_string(),
        );
    }

    if blueprint.broker.ca_path.is_none() {
        warnings.push("No broker trust material configured - MQTT uses plain TCP".to_string());
    }

    if !blueprint.broker.fail_closed {
        warnings.push(
            "broker.fail_closed is disabled - unreadable trust material degrades to plain TCP"
                .to_string(),
        );
    }

    if blueprint.broker.username.is_some() && blueprint.broker.password.is_none() {
        warnings.push("broker.username set without broker.password".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Broker: {}", summary.broker);
            println!("  Topic: {}", summary.topic);
            println!("  Stream target: {}", summary.stream_target);
            println!("  Input capacity: {}", summary.input_capacity);
            println!("  Output queue: {}", summary.output_enabled);
            println!("  Return to pool: {}", summary.return_to_pool);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
