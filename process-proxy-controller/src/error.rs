use thiserror::Error;

/// Errors an operation on a [`crate::Connection`] can reject with (§7).
///
/// None of these are retried by the connection: the originating operation
/// rejects with the decoded message and the connection moves on to the
/// next queued operation. The socket itself is only torn down on a
/// transport-level failure or an explicit close.
#[derive(Debug, Error, Clone)]
pub enum ConnectionError {
    /// The endpoint returned a non-zero status for this operation, with
    /// its own UTF-8 message.
    #[error("{0}")]
    Protocol(String),

    /// The socket closed (or errored) before or during this operation.
    #[error("connection closed")]
    Closed,

    /// `exit` was called after a previous `exit` succeeded, or after the
    /// connection closed. Rejected locally without touching the socket.
    #[error("connection already closed")]
    AlreadyClosed,

    #[error("io error: {0}")]
    Io(std::sync::Arc<std::io::Error>),

    #[error(transparent)]
    Wire(std::sync::Arc<process_proxy_wire::WireError>),
}

impl From<std::io::Error> for ConnectionError {
    fn from(e: std::io::Error) -> Self {
        ConnectionError::Io(std::sync::Arc::new(e))
    }
}

impl From<process_proxy_wire::WireError> for ConnectionError {
    fn from(e: process_proxy_wire::WireError) -> Self {
        ConnectionError::Wire(std::sync::Arc::new(e))
    }
}

/// Failures that can occur while an [`crate::Acceptor`] is validating a
/// handshake (§4.7, §7). These never reach the acceptor's consumer
/// callback: on any of them the socket is simply closed.
#[derive(Debug, Error)]
pub enum HandshakeError {
    #[error("handshake deadline exceeded")]
    Timeout,

    #[error("socket closed during handshake")]
    ShortRead,

    #[error("bad protocol prefix")]
    BadPrefix,

    #[error("token rejected by validation policy")]
    PolicyRejected,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Wire(#[from] process_proxy_wire::WireError),
}
