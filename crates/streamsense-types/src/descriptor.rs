//! Stream metadata: what a producer declares and what discovery reports

use crate::{ChannelFormat, StreamDataError};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Metadata a producer declares when creating an outlet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamInfo {
    /// Human-readable stream name
    pub name: String,
    /// Content type, e.g. "EEG"
    pub content_type: String,
    /// Number of channels per sample (must be positive)
    pub channel_count: usize,
    /// Nominal sample rate in Hz (0 = irregular)
    pub nominal_srate: f64,
    /// Storage format of each channel value
    pub channel_format: ChannelFormat,
    /// Producer-chosen stable identifier (may be empty)
    pub source_id: String,
}

impl StreamInfo {
    pub fn new(
        name: impl Into<String>,
        content_type: impl Into<String>,
        channel_count: usize,
        nominal_srate: f64,
        channel_format: ChannelFormat,
        source_id: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            channel_count,
            nominal_srate,
            channel_format,
            source_id: source_id.into(),
        }
    }

    pub fn validate(&self) -> Result<(), StreamDataError> {
        if self.name.is_empty() {
            return Err(StreamDataError::InvalidDescriptor(
                "stream name cannot be empty".to_string(),
            ));
        }
        if self.channel_count == 0 {
            return Err(StreamDataError::InvalidDescriptor(
                "channel_count must be positive".to_string(),
            ));
        }
        if !self.nominal_srate.is_finite() || self.nominal_srate < 0.0 {
            return Err(StreamDataError::InvalidDescriptor(format!(
                "nominal_srate must be a finite non-negative number, got {}",
                self.nominal_srate
            )));
        }
        Ok(())
    }
}

/// Immutable description of one advertised stream, as reported by discovery.
///
/// Descriptors are compared and deduplicated by [`uid`](Self::uid). The data
/// endpoint is where an inlet connects to receive samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamDescriptor {
    uid: String,
    #[serde(flatten)]
    info: StreamInfo,
    hostname: String,
    data_host: String,
    data_port: u16,
}

impl StreamDescriptor {
    pub fn new(
        uid: impl Into<String>,
        info: StreamInfo,
        hostname: impl Into<String>,
        data_host: impl Into<String>,
        data_port: u16,
    ) -> Self {
        Self {
            uid: uid.into(),
            info,
            hostname: hostname.into(),
            data_host: data_host.into(),
            data_port,
        }
    }

    /// Copy of this descriptor reachable through a different data host.
    ///
    /// Discovery uses this to replace the advertised host with the address
    /// the advertisement actually arrived from.
    pub fn with_data_host(&self, data_host: impl Into<String>) -> Self {
        Self {
            data_host: data_host.into(),
            ..self.clone()
        }
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn content_type(&self) -> &str {
        &self.info.content_type
    }

    pub fn channel_count(&self) -> usize {
        self.info.channel_count
    }

    pub fn nominal_srate(&self) -> f64 {
        self.info.nominal_srate
    }

    pub fn is_irregular(&self) -> bool {
        self.info.nominal_srate == crate::IRREGULAR_RATE
    }

    pub fn channel_format(&self) -> ChannelFormat {
        self.info.channel_format
    }

    pub fn source_id(&self) -> &str {
        &self.info.source_id
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn data_host(&self) -> &str {
        &self.data_host
    }

    pub fn data_port(&self) -> u16 {
        self.data_port
    }

    /// `host:port` of the data channel
    pub fn data_address(&self) -> String {
        format!("{}:{}", self.data_host, self.data_port)
    }

    pub fn info(&self) -> &StreamInfo {
        &self.info
    }

    pub fn validate(&self) -> Result<(), StreamDataError> {
        if self.uid.is_empty() {
            return Err(StreamDataError::InvalidDescriptor(
                "uid cannot be empty".to_string(),
            ));
        }
        if self.data_port == 0 {
            return Err(StreamDataError::InvalidDescriptor(
                "data_port cannot be 0".to_string(),
            ));
        }
        self.info.validate()
    }

    /// Multi-line human-readable summary of the stream.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        let rate = if self.is_irregular() {
            "irregular".to_string()
        } else {
            format!("{} Hz", self.info.nominal_srate)
        };
        let _ = writeln!(out, "stream '{}' ({})", self.info.name, self.uid);
        let _ = writeln!(out, "  type:      {}", self.info.content_type);
        let _ = writeln!(out, "  channels:  {} x {}", self.info.channel_count, self.info.channel_format);
        let _ = writeln!(out, "  rate:      {}", rate);
        let _ = writeln!(out, "  source_id: {}", self.info.source_id);
        let _ = write!(out, "  host:      {} ({})", self.hostname, self.data_address());
        out
    }
}
