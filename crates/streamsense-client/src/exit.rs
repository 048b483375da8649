// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Process exit codes and the errors that produce them

use streamsense_inlet::InletError;
use streamsense_transports::TransportError;
use thiserror::Error;

/// Why a client run stopped early
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("No streams found")]
    NoStreams,

    #[error("Connection failed: {0}")]
    Connection(#[source] InletError),

    #[error("Invalid session state: {0}")]
    InvalidState(#[source] InletError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to write output: {0}")]
    Output(#[from] std::io::Error),

    #[error("Client error: {0}")]
    Other(#[source] InletError),
}

impl From<InletError> for ClientError {
    fn from(err: InletError) -> Self {
        match err {
            e if e.is_connection_error() => ClientError::Connection(e),
            e if e.is_invalid_state() => ClientError::InvalidState(e),
            InletError::InvalidConfig(msg) => ClientError::Config(msg),
            e @ InletError::Query(_) => ClientError::Config(e.to_string()),
            InletError::Transport(TransportError::InvalidConfig(msg)) => ClientError::Config(msg),
            // Discovery sockets that cannot bind or send: the network is unusable
            e @ InletError::Transport(_) => ClientError::Connection(e),
            e => ClientError::Other(e),
        }
    }
}

impl From<streamsense_config::ConfigError> for ClientError {
    fn from(err: streamsense_config::ConfigError) -> Self {
        ClientError::Config(err.to_string())
    }
}

/// Exit status of the client process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    /// Finished or interrupted with the session closed
    Clean = 0,
    NoStreams = 1,
    ConnectionFailed = 2,
    /// Operation on a session in the wrong state, not caused by shutdown
    UsageError = 3,
    ConfigError = 4,
}

impl ExitCode {
    /// The one place a run's outcome becomes a process status
    pub fn from_result(result: &Result<(), ClientError>) -> Self {
        match result {
            Ok(()) => ExitCode::Clean,
            Err(ClientError::NoStreams) => ExitCode::NoStreams,
            Err(ClientError::Connection(_)) => ExitCode::ConnectionFailed,
            Err(ClientError::Config(_)) => ExitCode::ConfigError,
            Err(ClientError::Output(e)) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                ExitCode::Clean
            }
            Err(ClientError::InvalidState(_))
            | Err(ClientError::Output(_))
            | Err(ClientError::Other(_)) => ExitCode::UsageError,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        std::process::ExitCode::from(code.code())
    }
}
