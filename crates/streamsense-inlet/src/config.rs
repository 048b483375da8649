//! Configuration for discovery and inlet sessions

use crate::error::{InletError, Result};
use std::time::Duration;

/// Discovery settings
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryConfig {
    /// Addresses queried (unicast or broadcast)
    pub peers: Vec<String>,

    /// First UDP port outlets listen on
    pub port_base: u16,

    /// Number of discovery ports
    pub port_range: u16,

    /// Re-send interval for queries within one discovery window
    pub query_interval: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            peers: vec!["127.0.0.1".to_string(), "255.255.255.255".to_string()],
            port_base: 16571,
            port_range: 32,
            query_interval: Duration::from_millis(250),
        }
    }
}

impl RegistryConfig {
    /// Set the queried peer addresses
    pub fn with_peers<I, S>(mut self, peers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.peers = peers.into_iter().map(Into::into).collect();
        self
    }

    /// Set the discovery port range
    pub fn with_ports(mut self, port_base: u16, port_range: u16) -> Self {
        self.port_base = port_base;
        self.port_range = port_range;
        self
    }

    pub fn with_query_interval(mut self, interval: Duration) -> Self {
        self.query_interval = interval;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.peers.is_empty() {
            return Err(InletError::InvalidConfig(
                "at least one discovery peer is required".to_string(),
            ));
        }
        if self.query_interval.is_zero() {
            return Err(InletError::InvalidConfig(
                "query_interval must be greater than 0".to_string(),
            ));
        }
        streamsense_transports::discovery::validate_port_range(self.port_base, self.port_range)?;
        Ok(())
    }
}

/// Inlet session settings
#[derive(Debug, Clone, PartialEq)]
pub struct InletConfig {
    /// Samples buffered per session; the oldest is dropped beyond this
    pub max_buffered: usize,

    /// TCP connect and handshake timeout
    pub connect_timeout: Duration,

    /// Extra attempts made by `open_with_retry`
    pub open_retries: u32,

    /// Retry backoff base
    pub retry_backoff: Duration,

    /// How long `close()` waits for the delivery thread
    pub close_grace: Duration,
}

impl Default for InletConfig {
    fn default() -> Self {
        Self {
            max_buffered: 1000,
            connect_timeout: Duration::from_secs(2),
            open_retries: 3,
            retry_backoff: Duration::from_millis(200),
            close_grace: Duration::from_millis(500),
        }
    }
}

impl InletConfig {
    pub fn with_max_buffered(mut self, max_buffered: usize) -> Self {
        self.max_buffered = max_buffered;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set retry attempts and backoff base for `open_with_retry`
    pub fn with_retries(mut self, retries: u32, backoff: Duration) -> Self {
        self.open_retries = retries;
        self.retry_backoff = backoff;
        self
    }

    pub fn with_close_grace(mut self, grace: Duration) -> Self {
        self.close_grace = grace;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_buffered == 0 {
            return Err(InletError::InvalidConfig(
                "max_buffered must be at least 1".to_string(),
            ));
        }
        if self.connect_timeout.is_zero() {
            return Err(InletError::InvalidConfig(
                "connect_timeout must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}
