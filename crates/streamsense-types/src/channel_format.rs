//! Channel value formats

use crate::StreamDataError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Storage format of each channel value on the wire.
///
/// Samples are always surfaced as `f64`; integer formats round and saturate
/// when a value is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelFormat {
    Float32,
    Double64,
    Int32,
    Int16,
    Int8,
}

impl ChannelFormat {
    /// Wire tag used by the data channel handshake
    pub fn tag(self) -> u8 {
        match self {
            ChannelFormat::Float32 => 1,
            ChannelFormat::Double64 => 2,
            ChannelFormat::Int32 => 4,
            ChannelFormat::Int16 => 5,
            ChannelFormat::Int8 => 6,
        }
    }

    pub fn from_tag(tag: u8) -> Result<Self, StreamDataError> {
        match tag {
            1 => Ok(ChannelFormat::Float32),
            2 => Ok(ChannelFormat::Double64),
            4 => Ok(ChannelFormat::Int32),
            5 => Ok(ChannelFormat::Int16),
            6 => Ok(ChannelFormat::Int8),
            other => Err(StreamDataError::UnknownChannelFormat(format!("tag {}", other))),
        }
    }

    /// Bytes occupied by one channel value
    pub fn byte_width(self) -> usize {
        match self {
            ChannelFormat::Float32 | ChannelFormat::Int32 => 4,
            ChannelFormat::Double64 => 8,
            ChannelFormat::Int16 => 2,
            ChannelFormat::Int8 => 1,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ChannelFormat::Float32 => "float32",
            ChannelFormat::Double64 => "double64",
            ChannelFormat::Int32 => "int32",
            ChannelFormat::Int16 => "int16",
            ChannelFormat::Int8 => "int8",
        }
    }
}

impl fmt::Display for ChannelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ChannelFormat {
    type Err = StreamDataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "float32" => Ok(ChannelFormat::Float32),
            "double64" => Ok(ChannelFormat::Double64),
            "int32" => Ok(ChannelFormat::Int32),
            "int16" => Ok(ChannelFormat::Int16),
            "int8" => Ok(ChannelFormat::Int8),
            other => Err(StreamDataError::UnknownChannelFormat(other.to_string())),
        }
    }
}
