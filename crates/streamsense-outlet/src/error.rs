// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Error types for stream outlets

use streamsense_transports::TransportError;
use streamsense_types::StreamDataError;

/// Result type alias using OutletError
pub type Result<T> = std::result::Result<T, OutletError>;

#[derive(Debug, thiserror::Error)]
pub enum OutletError {
    /// Pushed sample does not match the stream layout
    #[error("Sample has {actual} values, stream has {expected} channels")]
    ChannelMismatch { expected: usize, actual: usize },

    /// Push after `close()`
    #[error("Outlet is closed")]
    Closed,

    /// Invalid stream metadata
    #[error("Invalid stream info: {0}")]
    InvalidInfo(#[from] StreamDataError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Socket setup failed
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Worker thread could not be started
    #[error("Thread error: {0}")]
    ThreadError(String),
}
