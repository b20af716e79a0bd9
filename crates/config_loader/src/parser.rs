//! Configuration parsing
//!
//! TOML (primary) and JSON (optional) formats.

use contracts::{ContractError, RelayBlueprint};

/// Configuration file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML format (recommended)
    Toml,
    /// JSON format
    Json,
}

impl ConfigFormat {
    /// Infer format from file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Parse TOML configuration
pub fn parse_toml(content: &str) -> Result<RelayBlueprint, ContractError> {
    toml::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parse JSON configuration
pub fn parse_json(content: &str) -> Result<RelayBlueprint, ContractError> {
    serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parse configuration content according to format
pub fn parse(content: &str, format: ConfigFormat) -> Result<RelayBlueprint, ContractError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_toml_minimal() {
        let content = r#"
[broker]
host = "localhost"
port = 1883
topic = "camrelay/frames"
"#;
        let blueprint = parse_toml(content).unwrap();
        assert_eq!(blueprint.broker.host, "localhost");
        assert_eq!(blueprint.broker.client_id, "camrelay");
        assert!(blueprint.broker.fail_closed);
        assert_eq!(blueprint.queue.input_capacity, 8);
    }

    #[test]
    fn parse_json_minimal() {
        let content = r#"{"broker": {"host": "h", "port": 8883, "topic": "t"}}"#;
        let blueprint = parse_json(content).unwrap();
        assert_eq!(blueprint.broker.port, 8883);
    }

    #[test]
    fn parse_toml_invalid_reports_error() {
        let err = parse_toml("broker = 3").unwrap_err();
        assert!(err.to_string().contains("TOML parse error"));
    }

    #[test]
    fn extension_detection() {
        assert_eq!(ConfigFormat::from_extension("toml"), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_extension("JSON"), Some(ConfigFormat::Json));
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}
