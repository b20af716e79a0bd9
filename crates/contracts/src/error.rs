//! Layered error definitions
//!
//! Categorized by source: config / capture / sink

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    /// Required credential or trust material absent
    #[error("missing {what}: '{path}'")]
    ConfigurationMissing { what: String, path: String },

    // ===== Capture Errors =====
    /// Input queue yielded nothing (closed, no producer)
    #[error("capture unavailable: input queue closed")]
    CaptureUnavailable,

    /// Queue closed while a frame was being handed off
    #[error("frame queue '{queue}' closed during send")]
    QueueClosed { queue: String },

    // ===== Sink Errors =====
    /// Transport could not be established or was dropped mid-write
    #[error("sink '{sink}' connection error: {message}")]
    SinkConnection { sink: String, message: String },

    /// Transport accepted the call but the write/publish failed
    #[error("sink '{sink}' transmit error: {message}")]
    SinkTransmit { sink: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create missing-configuration error
    pub fn configuration_missing(what: impl Into<String>, path: impl Into<String>) -> Self {
        Self::ConfigurationMissing {
            what: what.into(),
            path: path.into(),
        }
    }

    /// Create sink connection error
    pub fn sink_connection(sink: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkConnection {
            sink: sink.into(),
            message: message.into(),
        }
    }

    /// Create sink transmit error
    pub fn sink_transmit(sink: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkTransmit {
            sink: sink.into(),
            message: message.into(),
        }
    }

    /// Whether retrying means reconnecting rather than republishing
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Self::SinkConnection { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_vs_transmit_classification() {
        let conn = ContractError::sink_connection("broker", "link down");
        let tx = ContractError::sink_transmit("broker", "publish refused");
        assert!(conn.is_connection_error());
        assert!(!tx.is_connection_error());
    }

    #[test]
    fn display_includes_context() {
        let err = ContractError::configuration_missing("broker CA certificate", "/etc/ca.pem");
        assert_eq!(err.to_string(), "missing broker CA certificate: '/etc/ca.pem'");
    }
}
