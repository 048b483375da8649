//! Sample containers: single samples, chunks and multiplexed chunks

use crate::StreamDataError;
use serde::{Deserialize, Serialize};

/// One multi-channel sample with its capture timestamp (seconds).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub values: Vec<f64>,
    pub timestamp: f64,
}

impl Sample {
    pub fn new(values: Vec<f64>, timestamp: f64) -> Self {
        Self { values, timestamp }
    }

    pub fn channel_count(&self) -> usize {
        self.values.len()
    }
}

/// Samples pulled together, in arrival order. May be empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub samples: Vec<Sample>,
}

impl Chunk {
    pub fn new(samples: Vec<Sample>) -> Self {
        Self { samples }
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn timestamps(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.timestamp).collect()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Sample> {
        self.samples.iter()
    }

    /// Flatten into channel-major-within-sample order.
    ///
    /// Fails if any sample does not carry exactly `channel_count` values.
    pub fn to_multiplexed(&self, channel_count: usize) -> Result<MultiplexedChunk, StreamDataError> {
        let mut values = Vec::with_capacity(self.samples.len() * channel_count);
        for sample in &self.samples {
            if sample.values.len() != channel_count {
                return Err(StreamDataError::ChannelMismatch {
                    expected: channel_count,
                    actual: sample.values.len(),
                });
            }
            values.extend_from_slice(&sample.values);
        }
        MultiplexedChunk::new(values, channel_count, self.timestamps())
    }
}

impl std::ops::Index<usize> for Chunk {
    type Output = Sample;

    fn index(&self, index: usize) -> &Self::Output {
        &self.samples[index]
    }
}

impl IntoIterator for Chunk {
    type Item = Sample;
    type IntoIter = std::vec::IntoIter<Sample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.into_iter()
    }
}

/// A chunk flattened into one contiguous value sequence.
///
/// `values[i * channel_count + c]` is channel `c` of sample `i`. The length of
/// `values` is always a whole multiple of `channel_count`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiplexedChunk {
    values: Vec<f64>,
    channel_count: usize,
    timestamps: Vec<f64>,
}

impl MultiplexedChunk {
    pub fn new(
        values: Vec<f64>,
        channel_count: usize,
        timestamps: Vec<f64>,
    ) -> Result<Self, StreamDataError> {
        if channel_count == 0 {
            return Err(StreamDataError::InvalidDescriptor(
                "channel_count must be positive".to_string(),
            ));
        }
        if values.len() % channel_count != 0 {
            return Err(StreamDataError::ChannelMismatch {
                expected: channel_count,
                actual: values.len() % channel_count,
            });
        }
        if values.len() / channel_count != timestamps.len() {
            return Err(StreamDataError::InvalidDescriptor(format!(
                "{} timestamps for {} samples",
                timestamps.len(),
                values.len() / channel_count
            )));
        }
        Ok(Self {
            values,
            channel_count,
            timestamps,
        })
    }

    /// Empty chunk for a stream with `channel_count` channels
    pub fn empty(channel_count: usize) -> Self {
        Self {
            values: Vec::new(),
            channel_count,
            timestamps: Vec::new(),
        }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn timestamps(&self) -> &[f64] {
        &self.timestamps
    }

    pub fn channel_count(&self) -> usize {
        self.channel_count
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn sample_count(&self) -> usize {
        self.timestamps.len()
    }

    /// Per-sample slices of `channel_count` values
    pub fn rows(&self) -> std::slice::Chunks<'_, f64> {
        self.values.chunks(self.channel_count.max(1))
    }

    pub fn into_values(self) -> Vec<f64> {
        self.values
    }
}
