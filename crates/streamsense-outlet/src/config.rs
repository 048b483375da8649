//! Outlet configuration

use crate::error::{OutletError, Result};
use std::time::Duration;

/// Outlet settings
#[derive(Debug, Clone, PartialEq)]
pub struct OutletConfig {
    /// Host name advertised in the descriptor
    pub hostname: String,

    /// Interface the data listener binds to
    pub bind_address: String,

    /// First discovery port
    pub port_base: u16,

    /// Number of discovery ports
    pub port_range: u16,

    /// Samples queued per consumer before the oldest is dropped
    pub max_buffered: usize,

    /// Time allowed for an inlet to complete its handshake, and for a
    /// stalled consumer write
    pub io_timeout: Duration,
}

impl Default for OutletConfig {
    fn default() -> Self {
        Self {
            hostname: "localhost".to_string(),
            bind_address: "0.0.0.0".to_string(),
            port_base: 16571,
            port_range: 32,
            max_buffered: 1024,
            io_timeout: Duration::from_secs(2),
        }
    }
}

impl OutletConfig {
    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }

    pub fn with_bind_address(mut self, address: impl Into<String>) -> Self {
        self.bind_address = address.into();
        self
    }

    /// Set the discovery port range
    pub fn with_ports(mut self, port_base: u16, port_range: u16) -> Self {
        self.port_base = port_base;
        self.port_range = port_range;
        self
    }

    pub fn with_max_buffered(mut self, max_buffered: usize) -> Self {
        self.max_buffered = max_buffered;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_buffered == 0 {
            return Err(OutletError::InvalidConfig(
                "max_buffered must be at least 1".to_string(),
            ));
        }
        if self.io_timeout.is_zero() {
            return Err(OutletError::InvalidConfig(
                "io_timeout must be greater than 0".to_string(),
            ));
        }
        streamsense_transports::discovery::validate_port_range(self.port_base, self.port_range)?;
        Ok(())
    }
}
