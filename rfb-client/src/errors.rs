//! Error types for the viewer client.

use std::io;
use thiserror::Error;

/// Errors surfaced by the connection layer.
///
/// The protocol engine itself only signals success/failure and logs the
/// nature of a violation; this layer wraps those outcomes together with
/// transport and configuration problems for the application.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport-level error (TCP, socket operations).
    #[error("Transport error: {0}")]
    Transport(#[from] io::Error),

    /// TCP connection establishment failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Connection attempt exceeded the configured timeout.
    #[error("Connection timeout after {0:?}")]
    Timeout(std::time::Duration),

    /// The server violated the protocol during the handshake.
    #[error("Handshake failed: {0}")]
    Handshake(String),

    /// The server violated the protocol after the handshake.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Connection has been closed.
    #[error("Connection closed")]
    ConnectionClosed,
}

impl ClientError {
    /// True if reconnecting may help.
    ///
    /// Authentication and configuration problems will fail the same way
    /// again; transient transport failures may not. Reconnection policy
    /// itself belongs to the application.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport(_)
                | Self::ConnectionFailed(_)
                | Self::Timeout(_)
                | Self::ConnectionClosed
        )
    }

    /// True for errors that should not be retried.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !self.is_retryable()
    }
}
