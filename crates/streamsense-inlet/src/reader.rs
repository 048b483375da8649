// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Sample retrieval from an open [`InletSession`]

use crate::error::{InletError, Result};
use crate::session::{InletSession, SessionState};
use crossbeam::channel::{RecvTimeoutError, TryRecvError};
use crossbeam::select;
use std::time::Duration;
use streamsense_types::{deadline_after, Chunk, MultiplexedChunk, Sample};

/// Pulls samples from a session in three modes
///
/// Every pull on a session that is not open fails with `InvalidState`.
#[derive(Debug, Clone, Copy)]
pub struct SampleReader<'a> {
    session: &'a InletSession,
}

impl<'a> SampleReader<'a> {
    pub fn new(session: &'a InletSession) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &'a InletSession {
        self.session
    }

    /// Next sample, waiting at most `timeout`.
    ///
    /// `Ok(None)` means nothing arrived in time. A zero timeout never blocks.
    /// If the session is closed meanwhile, returns `InvalidState`.
    pub fn pull_sample(&self, timeout: Duration) -> Result<Option<Sample>> {
        let channels = self.session.pull_channels("pull_sample")?;
        let deadline = deadline_after(timeout);

        if timeout.is_zero() {
            return match channels.samples.try_recv() {
                Ok(sample) => Ok(Some(sample)),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => Ok(None),
            };
        }

        select! {
            recv(channels.samples) -> sample => match sample {
                Ok(sample) => Ok(Some(sample)),
                // Stream ended and drained: wait out the timeout unless closed.
                Err(_) => match channels.shutdown.recv_deadline(deadline) {
                    Err(RecvTimeoutError::Timeout) => Ok(None),
                    _ => Err(self.closed("pull_sample")),
                },
            },
            recv(channels.shutdown) -> _ => Err(self.closed("pull_sample")),
            default(timeout) => Ok(None),
        }
    }

    /// All samples buffered right now, in arrival order. Never blocks.
    pub fn pull_chunk(&self) -> Result<Chunk> {
        let channels = self.session.pull_channels("pull_chunk")?;

        // Bounded by the current length so a fast producer cannot keep the
        // caller draining forever.
        let available = channels.samples.len();
        let mut samples = Vec::with_capacity(available);
        for _ in 0..available {
            match channels.samples.try_recv() {
                Ok(sample) => samples.push(sample),
                Err(_) => break,
            }
        }
        Ok(Chunk::new(samples))
    }

    /// `pull_chunk` flattened to `sample_count * channel_count` values
    pub fn pull_chunk_multiplexed(&self) -> Result<MultiplexedChunk> {
        let chunk = self.pull_chunk()?;
        Ok(chunk.to_multiplexed(self.session.channel_count())?)
    }

    fn closed(&self, operation: &'static str) -> InletError {
        InletError::InvalidState {
            operation,
            state: SessionState::Closed,
        }
    }
}
