//! Error types for CLI operations.

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Stream target connection error
    #[error("Failed to open stream target {target}: {message}")]
    StreamTarget { target: String, message: String },
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn stream_target(target: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StreamTarget {
            target: target.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_not_found_names_the_path() {
        let err = CliError::config_not_found("/etc/camrelay.toml");
        assert_eq!(
            err.to_string(),
            "Configuration file not found: /etc/camrelay.toml"
        );
    }

    #[test]
    fn stream_target_names_target_and_cause() {
        let err = CliError::stream_target("127.0.0.1:8080", "connection refused");
        assert_eq!(
            err.to_string(),
            "Failed to open stream target 127.0.0.1:8080: connection refused"
        );
    }
}
