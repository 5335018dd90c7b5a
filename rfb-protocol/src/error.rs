//! Fatal protocol violations.
//!
//! The framing core distinguishes exactly two situations: "not enough bytes
//! yet" (not an error, modeled as [`Frame::Incomplete`](crate::io::Frame))
//! and the unrecoverable violations below. Every variant closes the
//! connection; there is no retry or partial recovery at this layer.

use thiserror::Error;

/// Unrecoverable protocol violation detected while framing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    /// Version line did not match `RFB ddd.ddd\n` with major 3, minor >= 7.
    #[error("invalid protocol version")]
    InvalidVersion,

    /// Server offered an empty security-type list.
    #[error("no security types offered")]
    NoSecurityTypes,

    /// None of the offered security types is supported.
    #[error("unsupported security types {0:?}")]
    UnsupportedSecurityTypes(Vec<u8>),

    /// Server reported a nonzero security result.
    #[error("authentication failed (result {0})")]
    AuthenticationFailed(u32),

    /// Desktop name length in the server-init message exceeds the sanity cap.
    #[error("desktop name of {0} bytes exceeds limit")]
    NameTooLong(u32),

    /// Message-type tag not part of the protocol.
    #[error("unknown server message type {0}")]
    UnknownMessageType(u8),

    /// Rectangle encoding the framer cannot byte-account.
    #[error("unsupported rectangle encoding {0}")]
    UnsupportedEncoding(i32),

    /// A length field declares a message larger than any legitimate one.
    #[error("message of {0} bytes exceeds maximum size")]
    MessageTooLarge(usize),

    /// Buffered bytes grew past the safety bound before a message boundary
    /// was found.
    #[error("{0} bytes buffered without a message boundary")]
    BufferOverrun(usize),

    /// A client-to-server send was not accepted in full.
    #[error("short write to peer")]
    ShortWrite,
}
