//! RelayBlueprint - configuration schema
//!
//! Declarative description of one relay pipeline: queue shape, disposal
//! policy, broker endpoint, stream target. Loading and validation live in
//! `config_loader`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Complete pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayBlueprint {
    #[serde(default)]
    pub queue: QueueSettings,

    pub broker: BrokerSettings,

    #[serde(default)]
    pub stream: StreamSettings,

    #[serde(default)]
    pub capture: CaptureSettings,
}

/// Frame queue and disposal policy settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueSettings {
    /// Input queue capacity (producer -> dispatcher)
    pub input_capacity: usize,

    /// Enable the output queue (dispatcher -> downstream)
    pub output_enabled: bool,

    /// Output queue capacity
    pub output_capacity: usize,

    /// Return buffers to the capture pool when no output queue is configured
    pub return_to_pool: bool,

    /// Maximum buffers the pool retains
    pub pool_capacity: usize,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            input_capacity: 8,
            output_enabled: false,
            output_capacity: 8,
            return_to_pool: true,
            pool_capacity: 8,
        }
    }
}

/// Message broker endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerSettings {
    pub host: String,
    pub port: u16,

    #[serde(default = "default_client_id")]
    pub client_id: String,

    /// Topic raw frame payloads are published under
    pub topic: String,

    pub username: Option<String>,
    pub password: Option<String>,

    /// PEM trust material path (None = plain TCP)
    pub ca_path: Option<PathBuf>,

    /// Refuse publishes when trust material is configured but unreadable
    #[serde(default = "default_true")]
    pub fail_closed: bool,

    #[serde(default = "default_keep_alive")]
    pub keep_alive_secs: u64,
}

fn default_client_id() -> String {
    "camrelay".to_string()
}

fn default_true() -> bool {
    true
}

fn default_keep_alive() -> u64 {
    60
}

/// Multipart stream settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamSettings {
    /// Payload slice size per chunk write
    pub chunk_size: usize,

    /// Where the CLI points the stream: a file path or `tcp://host:port`
    pub target: StreamTarget,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            chunk_size: 4096,
            target: StreamTarget::default(),
        }
    }
}

/// Stream consumer endpoint for the CLI pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum StreamTarget {
    /// Append the multipart body to a file
    File(PathBuf),
    /// Connect to a TCP consumer
    Tcp(String),
}

impl Default for StreamTarget {
    fn default() -> Self {
        Self::File(PathBuf::from("./stream.mjpeg"))
    }
}

/// Mock capture source settings (demos/CLI)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureSettings {
    /// Frame rate (Hz)
    pub frequency_hz: f64,

    /// Synthetic payload size in bytes
    pub payload_size: usize,

    /// Fraction of frames produced pre-encoded (0.0 = all raw, 1.0 = all JPEG)
    pub jpeg_ratio: f64,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            frequency_hz: 10.0,
            payload_size: 4096,
            jpeg_ratio: 1.0,
        }
    }
}
