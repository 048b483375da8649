// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Error types for inlet sessions and discovery

use crate::session::SessionState;
use streamsense_transports::TransportError;
use streamsense_types::{QueryParseError, StreamDataError};

/// Result type alias using InletError
pub type Result<T> = std::result::Result<T, InletError>;

/// Error types for discovery and inlet sessions
#[derive(Debug, thiserror::Error)]
pub enum InletError {
    /// The stream's data endpoint could not be reached or the handshake failed
    #[error("Connection to stream '{uid}' failed: {source}")]
    Connection {
        uid: String,
        #[source]
        source: TransportError,
    },

    /// The endpoint is reachable but no longer serves this stream
    #[error("Stream '{uid}' is no longer available at {address}")]
    StaleDescriptor { uid: String, address: String },

    /// Operation not allowed in the session's current state
    #[error("Cannot {operation}: session is {state}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },

    /// Malformed stream predicate
    #[error(transparent)]
    Query(#[from] QueryParseError),

    /// Sample layout violated
    #[error("Stream data error: {0}")]
    Data(#[from] StreamDataError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Discovery socket failure
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Delivery thread could not be started
    #[error("Thread error: {0}")]
    ThreadError(String),
}

impl InletError {
    /// Check if error is retryable (for reconnection logic)
    pub fn is_retryable(&self) -> bool {
        match self {
            InletError::Connection { source, .. } => source.is_transient(),
            InletError::Transport(e) => e.is_transient(),
            _ => false,
        }
    }

    /// Whether this is a failure to open a session against its stream
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            InletError::Connection { .. } | InletError::StaleDescriptor { .. }
        )
    }

    pub fn is_invalid_state(&self) -> bool {
        matches!(self, InletError::InvalidState { .. })
    }
}
