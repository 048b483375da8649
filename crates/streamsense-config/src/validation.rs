//! Configuration validation
//!
//! Ensures values are within range before any socket is opened.

use crate::{ConfigError, ConfigResult, StreamsenseConfig, MAX_DURATION_SECS};

/// Validation errors that can occur during config validation
#[derive(Debug, Clone)]
pub enum ConfigValidationError {
    InvalidPortRange { port_base: u16, port_range: u16 },
    MissingRequired { field: String },
    InvalidValue { field: String, reason: String },
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidPortRange {
                port_base,
                port_range,
            } => {
                write!(
                    f,
                    "Discovery ports {} + {} do not fit in 1-65535",
                    port_base, port_range
                )
            }
            Self::MissingRequired { field } => {
                write!(f, "Missing required configuration: {}", field)
            }
            Self::InvalidValue { field, reason } => {
                write!(f, "Invalid configuration value for {}: {}", field, reason)
            }
        }
    }
}

/// Validate the complete configuration
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` listing every problem found
pub fn validate_config(config: &StreamsenseConfig) -> ConfigResult<()> {
    let mut errors = Vec::new();

    validate_discovery(config, &mut errors);
    validate_durations(config, &mut errors);
    validate_value_ranges(config, &mut errors);

    if !errors.is_empty() {
        let error_messages = errors
            .iter()
            .map(|e| format!("  - {}", e))
            .collect::<Vec<_>>()
            .join("\n");

        return Err(ConfigError::ValidationError(format!(
            "Configuration validation failed:\n{}",
            error_messages
        )));
    }

    Ok(())
}

fn validate_discovery(config: &StreamsenseConfig, errors: &mut Vec<ConfigValidationError>) {
    let discovery = &config.discovery;
    let last_port = u32::from(discovery.port_base) + u32::from(discovery.port_range);
    if discovery.port_base == 0 || discovery.port_range == 0 || last_port - 1 > u32::from(u16::MAX) {
        errors.push(ConfigValidationError::InvalidPortRange {
            port_base: discovery.port_base,
            port_range: discovery.port_range,
        });
    }

    if discovery.peers.is_empty() {
        errors.push(ConfigValidationError::MissingRequired {
            field: "discovery.peers".to_string(),
        });
    }
    if discovery.peers.iter().any(|p| p.trim().is_empty()) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "discovery.peers".to_string(),
            reason: "peer address cannot be empty".to_string(),
        });
    }
}

fn validate_durations(config: &StreamsenseConfig, errors: &mut Vec<ConfigValidationError>) {
    let durations = [
        ("discovery.timeout", config.discovery.timeout),
        ("discovery.query_interval", config.discovery.query_interval),
        ("inlet.connect_timeout", config.inlet.connect_timeout),
        ("inlet.retry_backoff", config.inlet.retry_backoff),
        ("inlet.close_grace", config.inlet.close_grace),
        ("pull.sample_timeout", config.pull.sample_timeout),
        ("pull.inter_pull_delay", config.pull.inter_pull_delay),
    ];

    for (field, value) in durations {
        if !(0.0..=MAX_DURATION_SECS).contains(&value) {
            errors.push(ConfigValidationError::InvalidValue {
                field: field.to_string(),
                reason: format!(
                    "must be between 0 and {} seconds, got {}",
                    MAX_DURATION_SECS, value
                ),
            });
        }
    }
}

fn validate_value_ranges(config: &StreamsenseConfig, errors: &mut Vec<ConfigValidationError>) {
    if config.discovery.query_interval <= 0.0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "discovery.query_interval".to_string(),
            reason: "must be greater than 0".to_string(),
        });
    }

    if config.inlet.connect_timeout <= 0.0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "inlet.connect_timeout".to_string(),
            reason: "must be greater than 0".to_string(),
        });
    }

    if config.inlet.max_buffered == 0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "inlet.max_buffered".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }

    if config.client.max_iterations == Some(0) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "client.max_iterations".to_string(),
            reason: "must be at least 1 when set".to_string(),
        });
    }

    if let Some(query) = &config.client.query {
        if query.trim().is_empty() {
            errors.push(ConfigValidationError::InvalidValue {
                field: "client.query".to_string(),
                reason: "omit the query to accept any stream".to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = StreamsenseConfig::default();
        let result = validate_config(&config);
        assert!(result.is_ok(), "Default config should be valid: {:?}", result);
    }

    #[test]
    fn test_port_range_overflow() {
        let mut config = StreamsenseConfig::default();
        config.discovery.port_base = 65530;
        config.discovery.port_range = 10;

        let err = validate_config(&config).unwrap_err().to_string();
        assert!(err.contains("65530"));
    }

    #[test]
    fn test_zero_port_range() {
        let mut config = StreamsenseConfig::default();
        config.discovery.port_range = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_missing_peers() {
        let mut config = StreamsenseConfig::default();
        config.discovery.peers.clear();

        let err = validate_config(&config).unwrap_err().to_string();
        assert!(err.contains("discovery.peers"));
    }

    #[test]
    fn test_negative_duration() {
        let mut config = StreamsenseConfig::default();
        config.pull.sample_timeout = -1.0;
        let err = validate_config(&config).unwrap_err().to_string();
        assert!(err.contains("pull.sample_timeout"));
    }

    #[test]
    fn test_huge_durations_rejected() {
        let mut config = StreamsenseConfig::default();
        config.discovery.timeout = 1e19;
        config.pull.sample_timeout = 1e300;
        config.inlet.close_grace = f64::INFINITY;

        let err = validate_config(&config).unwrap_err().to_string();
        assert!(err.contains("discovery.timeout"));
        assert!(err.contains("pull.sample_timeout"));
        assert!(err.contains("inlet.close_grace"));

        config.discovery.timeout = MAX_DURATION_SECS;
        config.pull.sample_timeout = MAX_DURATION_SECS;
        config.inlet.close_grace = 0.5;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_zero_pull_timeout_is_allowed() {
        let mut config = StreamsenseConfig::default();
        config.pull.sample_timeout = 0.0;
        config.pull.inter_pull_delay = 0.0;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_zero_buffer_rejected() {
        let mut config = StreamsenseConfig::default();
        config.inlet.max_buffered = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_errors_are_collected() {
        let mut config = StreamsenseConfig::default();
        config.inlet.max_buffered = 0;
        config.client.max_iterations = Some(0);
        let err = validate_config(&config).unwrap_err().to_string();
        assert!(err.contains("inlet.max_buffered"));
        assert!(err.contains("client.max_iterations"));
    }
}
