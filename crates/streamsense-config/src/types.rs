// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration type definitions
//!
//! Durations are stored as seconds (`f64`), matching the TOML layout:
//!
//! ```toml
//! [discovery]
//! timeout = 2.0
//! peers = ["127.0.0.1"]
//!
//! [pull]
//! inter_pull_delay = 0.1
//! ```

use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Longest accepted duration setting: one day
pub const MAX_DURATION_SECS: f64 = 86_400.0;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct StreamsenseConfig {
    pub discovery: DiscoveryConfig,
    pub inlet: InletConfig,
    pub pull: PullConfig,
    pub client: ClientConfig,
}

/// Stream discovery on the local network
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Length of the discovery window (seconds)
    pub timeout: f64,
    /// Interval between repeated queries within one window (seconds)
    pub query_interval: f64,
    /// First UDP port outlets listen on
    pub port_base: u16,
    /// Number of consecutive ports, one per outlet on the same host
    pub port_range: u16,
    /// Addresses queried; broadcast addresses reach the whole segment
    pub peers: Vec<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            timeout: 1.0,
            query_interval: 0.25,
            port_base: 16571,
            port_range: 32,
            peers: vec!["127.0.0.1".to_string(), "255.255.255.255".to_string()],
        }
    }
}

impl DiscoveryConfig {
    pub fn timeout(&self) -> ConfigResult<Duration> {
        seconds("discovery.timeout", self.timeout)
    }

    pub fn query_interval(&self) -> ConfigResult<Duration> {
        seconds("discovery.query_interval", self.query_interval)
    }
}

/// Inlet session behaviour
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct InletConfig {
    /// Samples held per session before the oldest is dropped
    pub max_buffered: usize,
    /// TCP connect and handshake timeout (seconds)
    pub connect_timeout: f64,
    /// Extra open attempts after a transient failure
    pub open_retries: u32,
    /// Initial backoff between open attempts (seconds), doubled per attempt
    pub retry_backoff: f64,
    /// Upper bound for `close()` to unblock pulls and stop delivery (seconds)
    pub close_grace: f64,
}

impl Default for InletConfig {
    fn default() -> Self {
        Self {
            max_buffered: 1000,
            connect_timeout: 2.0,
            open_retries: 3,
            retry_backoff: 0.2,
            close_grace: 0.5,
        }
    }
}

impl InletConfig {
    pub fn connect_timeout(&self) -> ConfigResult<Duration> {
        seconds("inlet.connect_timeout", self.connect_timeout)
    }

    pub fn retry_backoff(&self) -> ConfigResult<Duration> {
        seconds("inlet.retry_backoff", self.retry_backoff)
    }

    pub fn close_grace(&self) -> ConfigResult<Duration> {
        seconds("inlet.close_grace", self.close_grace)
    }
}

/// Pull loop pacing
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PullConfig {
    /// Timeout handed to `pull_sample` (seconds)
    pub sample_timeout: f64,
    /// Pause between consecutive pulls (seconds)
    pub inter_pull_delay: f64,
}

impl Default for PullConfig {
    fn default() -> Self {
        Self {
            sample_timeout: 1.0,
            inter_pull_delay: 1.0,
        }
    }
}

impl PullConfig {
    pub fn sample_timeout(&self) -> ConfigResult<Duration> {
        seconds("pull.sample_timeout", self.sample_timeout)
    }

    pub fn inter_pull_delay(&self) -> ConfigResult<Duration> {
        seconds("pull.inter_pull_delay", self.inter_pull_delay)
    }
}

/// Client loop selection and bounds
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Stream predicate such as `type='EEG'`; `None` accepts any stream
    pub query: Option<String>,
    /// Stop after this many pull rounds; `None` runs until interrupted
    pub max_iterations: Option<u64>,
}

/// Seconds in `0..=MAX_DURATION_SECS` as a `Duration`
fn seconds(field: &str, value: f64) -> ConfigResult<Duration> {
    if !(0.0..=MAX_DURATION_SECS).contains(&value) {
        return Err(ConfigError::InvalidValue(format!(
            "{} = {}: expected 0 to {} seconds",
            field, value, MAX_DURATION_SECS
        )));
    }
    Duration::try_from_secs_f64(value)
        .map_err(|e| ConfigError::InvalidValue(format!("{} = {}: {}", field, value, e)))
}
