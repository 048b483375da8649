use thiserror::Error;

/// Error type for invalid stream metadata and sample shapes.
///
/// # Examples
/// ```
/// use streamsense_types::{ChannelFormat, StreamInfo};
///
/// let info = StreamInfo::new("EEG-1", "EEG", 0, 256.0, ChannelFormat::Float32, "dev-1");
/// assert!(info.validate().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StreamDataError {
    /// Descriptor or stream info failed validation
    #[error("Invalid stream descriptor: {0}")]
    InvalidDescriptor(String),
    /// A sample or chunk does not match the stream's channel count
    #[error("Channel count mismatch: expected {expected} values, got {actual}")]
    ChannelMismatch { expected: usize, actual: usize },
    /// Unknown channel format tag or name
    #[error("Unknown channel format: {0}")]
    UnknownChannelFormat(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = StreamDataError::ChannelMismatch {
            expected: 8,
            actual: 3,
        };
        assert_eq!(
            err.to_string(),
            "Channel count mismatch: expected 8 values, got 3"
        );
        assert_eq!(
            StreamDataError::UnknownChannelFormat("int128".into()).to_string(),
            "Unknown channel format: int128"
        );
    }
}
