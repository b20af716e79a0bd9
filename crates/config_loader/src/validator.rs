//! Configuration validation
//!
//! Validation rules:
//! - broker host/topic non-empty, port != 0
//! - queue capacities >= 1
//! - stream chunk_size >= 1, TCP target well-formed
//! - capture frequency_hz > 0, jpeg_ratio within [0, 1]

use contracts::{ContractError, RelayBlueprint, StreamTarget};

/// Validate a RelayBlueprint
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(blueprint: &RelayBlueprint) -> Result<(), ContractError> {
    validate_broker(blueprint)?;
    validate_queue(blueprint)?;
    validate_stream(blueprint)?;
    validate_capture(blueprint)?;
    Ok(())
}

fn validate_broker(blueprint: &RelayBlueprint) -> Result<(), ContractError> {
    let broker = &blueprint.broker;
    if broker.host.trim().is_empty() {
        return Err(ContractError::config_validation(
            "broker.host",
            "must not be empty",
        ));
    }
    if broker.port == 0 {
        return Err(ContractError::config_validation(
            "broker.port",
            "must not be 0",
        ));
    }
    if broker.topic.trim().is_empty() {
        return Err(ContractError::config_validation(
            "broker.topic",
            "must not be empty",
        ));
    }
    if broker.password.is_some() && broker.username.is_none() {
        return Err(ContractError::config_validation(
            "broker.username",
            "password provided without username",
        ));
    }
    Ok(())
}

fn validate_queue(blueprint: &RelayBlueprint) -> Result<(), ContractError> {
    let queue = &blueprint.queue;
    if queue.input_capacity == 0 {
        return Err(ContractError::config_validation(
            "queue.input_capacity",
            "must be >= 1",
        ));
    }
    if queue.output_enabled && queue.output_capacity == 0 {
        return Err(ContractError::config_validation(
            "queue.output_capacity",
            "must be >= 1 when output is enabled",
        ));
    }
    Ok(())
}

fn validate_stream(blueprint: &RelayBlueprint) -> Result<(), ContractError> {
    let stream = &blueprint.stream;
    if stream.chunk_size == 0 {
        return Err(ContractError::config_validation(
            "stream.chunk_size",
            "must be >= 1",
        ));
    }
    if let StreamTarget::Tcp(addr) = &stream.target {
        if !addr.contains(':') {
            return Err(ContractError::config_validation(
                "stream.target",
                format!("TCP target '{addr}' is missing a port"),
            ));
        }
    }
    Ok(())
}

fn validate_capture(blueprint: &RelayBlueprint) -> Result<(), ContractError> {
    let capture = &blueprint.capture;
    if capture.frequency_hz <= 0.0 {
        return Err(ContractError::config_validation(
            "capture.frequency_hz",
            format!("must be > 0, got {}", capture.frequency_hz),
        ));
    }
    if !(0.0..=1.0).contains(&capture.jpeg_ratio) {
        return Err(ContractError::config_validation(
            "capture.jpeg_ratio",
            format!("must be within [0, 1], got {}", capture.jpeg_ratio),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_toml;

    fn minimal() -> RelayBlueprint {
        parse_toml(
            r#"
[broker]
host = "localhost"
port = 1883
topic = "camrelay/frames"
"#,
        )
        .unwrap()
    }

    #[test]
    fn minimal_blueprint_is_valid() {
        assert!(validate(&minimal()).is_ok());
    }

    #[test]
    fn empty_topic_rejected() {
        let mut blueprint = minimal();
        blueprint.broker.topic = "  ".to_string();
        let err = validate(&blueprint).unwrap_err();
        assert!(err.to_string().contains("broker.topic"));
    }

    #[test]
    fn zero_port_rejected() {
        let mut blueprint = minimal();
        blueprint.broker.port = 0;
        assert!(validate(&blueprint).is_err());
    }

    #[test]
    fn password_without_username_rejected() {
        let mut blueprint = minimal();
        blueprint.broker.password = Some("secret".to_string());
        let err = validate(&blueprint).unwrap_err();
        assert!(err.to_string().contains("broker.username"));
    }

    #[test]
    fn zero_input_capacity_rejected() {
        let mut blueprint = minimal();
        blueprint.queue.input_capacity = 0;
        assert!(validate(&blueprint).is_err());
    }

    #[test]
    fn tcp_target_needs_port() {
        let mut blueprint = minimal();
        blueprint.stream.target = StreamTarget::Tcp("localhost".to_string());
        assert!(validate(&blueprint).is_err());

        blueprint.stream.target = StreamTarget::Tcp("localhost:8080".to_string());
        assert!(validate(&blueprint).is_ok());
    }

    #[test]
    fn jpeg_ratio_out_of_range_rejected() {
        let mut blueprint = minimal();
        blueprint.capture.jpeg_ratio = 1.5;
        assert!(validate(&blueprint).is_err());
    }
}
