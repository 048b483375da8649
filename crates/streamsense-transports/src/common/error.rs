//! Error types for all transports

/// Result type alias for transport operations
pub type TransportResult<T> = Result<T, TransportError>;

/// Transport-level failures
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to bind a socket
    #[error("Bind failed: {0}")]
    BindFailed(String),

    /// Failed to connect to a peer
    #[error("Connect failed: {0}")]
    ConnectFailed(String),

    /// Failed to send data
    #[error("Send failed: {0}")]
    SendFailed(String),

    /// Failed to receive data
    #[error("Receive failed: {0}")]
    ReceiveFailed(String),

    /// The peer does not serve the requested stream
    #[error("Unknown stream: {0}")]
    UnknownStream(String),

    /// Peer closed the connection
    #[error("Connection closed")]
    ConnectionClosed,

    /// Transport is not running
    #[error("Transport is not running")]
    NotRunning,

    /// Transport is already running
    #[error("Transport is already running")]
    AlreadyRunning,

    /// Invalid address or socket parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Datagram larger than the discovery limit
    #[error("Message too large: {size} bytes (max: {max_size})")]
    MessageTooLarge { size: usize, max_size: usize },

    /// Bytes that do not decode as a valid message or frame
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// Peer speaks a different protocol version
    #[error("Protocol version mismatch: local {local}, remote {remote}")]
    VersionMismatch { local: u16, remote: u16 },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl TransportError {
    /// Whether the failure may clear up if the operation is retried
    pub fn is_transient(&self) -> bool {
        match self {
            TransportError::ConnectFailed(_)
            | TransportError::ConnectionClosed
            | TransportError::SendFailed(_)
            | TransportError::ReceiveFailed(_) => true,
            TransportError::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::ConnectionRefused
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::WouldBlock
                    | std::io::ErrorKind::Interrupted
            ),
            _ => false,
        }
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<streamsense_types::StreamDataError> for TransportError {
    fn from(err: streamsense_types::StreamDataError) -> Self {
        Self::InvalidMessage(err.to_string())
    }
}
