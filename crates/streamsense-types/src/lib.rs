// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Core value types shared by every streamsense crate.
//!
//! A *stream* is a named, typed, continuously produced sequence of
//! multi-channel numeric samples advertised on the local network. This crate
//! holds the immutable [`StreamDescriptor`] that identifies one, the
//! [`Sample`]/[`Chunk`]/[`MultiplexedChunk`] shapes data is pulled in, and the
//! [`StreamQuery`] predicate used to filter discovery results.

mod channel_format;
mod clock;
mod descriptor;
mod error;
mod query;
mod sample;

pub use channel_format::ChannelFormat;
pub use clock::{deadline_after, deadline_from, local_clock};
pub use descriptor::{StreamDescriptor, StreamInfo};
pub use error::StreamDataError;
pub use query::{QueryParseError, StreamQuery};
pub use sample::{Chunk, MultiplexedChunk, Sample};

/// Nominal sample rate used for streams without a fixed rate.
pub const IRREGULAR_RATE: f64 = 0.0;
