// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration loading with override support
//!
//! Two tiers:
//! 1. TOML file, only when a path is given explicitly (otherwise defaults)
//! 2. CLI arguments (explicit user overrides)

use crate::{ConfigError, ConfigResult, StreamsenseConfig};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Load configuration
///
/// # Arguments
///
/// * `config_path` - Optional path to a TOML file. `None` yields the defaults.
///
/// # Errors
///
/// Returns error if the given file is missing or contains invalid TOML
pub fn load_config(config_path: Option<&Path>) -> ConfigResult<StreamsenseConfig> {
    match config_path {
        None => Ok(StreamsenseConfig::default()),
        Some(path) => {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path.display().to_string()));
            }
            let content = fs::read_to_string(path)?;
            load_config_str(&content)
        }
    }
}

/// Parse configuration from TOML text; missing sections and keys take defaults
pub fn load_config_str(content: &str) -> ConfigResult<StreamsenseConfig> {
    Ok(toml::from_str(content)?)
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> ConfigResult<T> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| ConfigError::InvalidValue(format!("{} = '{}'", key, value)))
}

/// Apply CLI argument overrides to configuration
///
/// # Arguments
///
/// * `config` - Configuration to modify
/// * `cli_args` - Map of override keys to raw values, e.g.
///   `{"query": "type='EEG'", "max_iterations": "10", "peers": "127.0.0.1,10.0.0.255"}`
///
/// Unlike the file, overrides are explicit user input: an unparsable value or
/// unknown key is an error rather than silently skipped.
pub fn apply_cli_overrides(
    config: &mut StreamsenseConfig,
    cli_args: &HashMap<String, String>,
) -> ConfigResult<()> {
    for (key, value) in cli_args {
        match key.as_str() {
            // Discovery
            "discovery_timeout" => config.discovery.timeout = parse(key, value)?,
            "query_interval" => config.discovery.query_interval = parse(key, value)?,
            "port_base" => config.discovery.port_base = parse(key, value)?,
            "port_range" => config.discovery.port_range = parse(key, value)?,
            "peers" => {
                config.discovery.peers = value
                    .split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(String::from)
                    .collect();
            }

            // Inlet
            "max_buffered" => config.inlet.max_buffered = parse(key, value)?,
            "connect_timeout" => config.inlet.connect_timeout = parse(key, value)?,
            "open_retries" => config.inlet.open_retries = parse(key, value)?,

            // Pull
            "sample_timeout" => config.pull.sample_timeout = parse(key, value)?,
            "inter_pull_delay" => config.pull.inter_pull_delay = parse(key, value)?,

            // Client
            "query" => config.client.query = Some(value.clone()),
            "max_iterations" => config.client.max_iterations = Some(parse(key, value)?),

            other => return Err(ConfigError::UnknownOverride(other.to_string())),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_no_path_gives_defaults() {
        assert_eq!(load_config(None).unwrap(), StreamsenseConfig::default());
    }

    #[test]
    fn test_load_partial_file() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("streamsense.toml");

        let mut file = File::create(&config_path).unwrap();
        writeln!(file, "[discovery]").unwrap();
        writeln!(file, "timeout = 2.5").unwrap();
        writeln!(file, "peers = [\"10.0.0.255\"]").unwrap();
        writeln!(file, "[client]").unwrap();
        writeln!(file, "query = \"type='EEG'\"").unwrap();

        let config = load_config(Some(&config_path)).unwrap();

        assert_eq!(config.discovery.timeout, 2.5);
        assert_eq!(config.discovery.peers, vec!["10.0.0.255".to_string()]);
        assert_eq!(config.discovery.port_base, 16571);
        assert_eq!(config.client.query.as_deref(), Some("type='EEG'"));
        assert_eq!(config.inlet, crate::InletConfig::default());
    }

    #[test]
    fn test_missing_file() {
        let dir = tempdir().unwrap();
        let err = load_config(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_invalid_toml() {
        let err = load_config_str("[discovery\ntimeout = 1").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = StreamsenseConfig::default();
        let mut cli_args = HashMap::new();
        cli_args.insert("query".to_string(), "name='MyStream'".to_string());
        cli_args.insert("max_iterations".to_string(), "5".to_string());
        cli_args.insert("peers".to_string(), "127.0.0.1, 192.168.1.255".to_string());

        apply_cli_overrides(&mut config, &cli_args).unwrap();

        assert_eq!(config.client.query.as_deref(), Some("name='MyStream'"));
        assert_eq!(config.client.max_iterations, Some(5));
        assert_eq!(
            config.discovery.peers,
            vec!["127.0.0.1".to_string(), "192.168.1.255".to_string()]
        );
    }

    #[test]
    fn test_cli_override_precedence_over_file() {
        let mut config = load_config_str("[pull]\ninter_pull_delay = 3.0\n").unwrap();
        let mut cli_args = HashMap::new();
        cli_args.insert("inter_pull_delay".to_string(), "0.1".to_string());

        apply_cli_overrides(&mut config, &cli_args).unwrap();
        assert_eq!(config.pull.inter_pull_delay, 0.1);
    }

    #[test]
    fn test_bad_override_is_an_error() {
        let mut config = StreamsenseConfig::default();
        let mut cli_args = HashMap::new();
        cli_args.insert("max_iterations".to_string(), "many".to_string());
        assert!(matches!(
            apply_cli_overrides(&mut config, &cli_args),
            Err(ConfigError::InvalidValue(_))
        ));

        let mut cli_args = HashMap::new();
        cli_args.insert("colour".to_string(), "blue".to_string());
        assert!(matches!(
            apply_cli_overrides(&mut config, &cli_args),
            Err(ConfigError::UnknownOverride(_))
        ));
    }
}
