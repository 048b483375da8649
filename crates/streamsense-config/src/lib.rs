// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # streamsense configuration
//!
//! Typed configuration for the inlet client. Every value has a default, so a
//! configuration file is optional:
//! - built-in defaults (`StreamsenseConfig::default()`)
//! - an explicit TOML file passed with `--config`
//! - explicit CLI overrides
//!
//! Nothing is read from the environment and no file is searched for
//! implicitly.
//!
//! ## Usage
//!
//! ```rust
//! use streamsense_config::{load_config, validate_config};
//!
//! let config = load_config(None).unwrap();
//! validate_config(&config).unwrap();
//! assert_eq!(config.discovery.port_base, 16571);
//! assert_eq!(config.inlet.max_buffered, 1000);
//! ```

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod loader;
pub mod types;
pub mod validation;

pub use loader::{apply_cli_overrides, load_config, load_config_str};
pub use types::*;
pub use validation::{validate_config, ConfigValidationError};

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax: {0}")]
    ParseError(String),

    #[error("Validation failed: {0}")]
    ValidationError(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    #[error("Unknown override key: {0}")]
    UnknownOverride(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;
