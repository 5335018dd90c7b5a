//! Buffered byte-stream access for the RFB framing core.
//!
//! The engine never owns a socket. It parses against a [`ByteSource`]: a
//! duplex stream that buffers inbound bytes and lets the framer look ahead
//! without consuming. Every parsing step follows the same discipline:
//!
//! 1. `peek` the fixed portion of a unit to learn any embedded lengths,
//! 2. confirm via [`ByteSource::bytes_available`] that the whole unit is
//!    buffered,
//! 3. only then `read` it in one call.
//!
//! A step that cannot complete reports [`Frame::Incomplete`] and consumes
//! nothing, so the owning connection can simply call again once more bytes
//! arrive. [`PeekCursor`] is the look-ahead companion: it walks peeked bytes
//! big-endian and reports exhaustion as `None` instead of an error.

use bytes::{Buf, Bytes, BytesMut};

/// Outcome of one framing attempt over buffered bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame {
    /// The unit is fully buffered and has been accounted for.
    Complete,
    /// Not enough bytes yet; nothing was consumed, retry after more data.
    Incomplete,
}

/// Duplex byte stream the protocol engine parses against.
///
/// Implementations buffer inbound bytes until the engine consumes them.
/// `peek` must be non-destructive and `read` must only ever be called for
/// byte counts a preceding peek/size check confirmed present; the engine
/// upholds that contract on its side.
pub trait ByteSource {
    /// Number of inbound bytes currently buffered.
    fn bytes_available(&self) -> usize;

    /// Look at up to `n` buffered bytes without consuming them.
    ///
    /// Returns fewer than `n` bytes when fewer are buffered.
    fn peek(&self, n: usize) -> &[u8];

    /// Consume up to `n` buffered bytes.
    fn read(&mut self, n: usize) -> Bytes;

    /// Send bytes to the peer, returning how many were accepted.
    fn write(&mut self, data: &[u8]) -> std::io::Result<usize>;

    /// Tear the connection down. Subsequent reads and writes are no-ops.
    fn close(&mut self);

    /// True once [`close`](Self::close) was called or the peer went away.
    fn is_closed(&self) -> bool;
}

/// In-memory [`ByteSource`] backed by [`BytesMut`].
///
/// The owning connection appends inbound socket data with
/// [`feed`](Self::feed) and drains outbound data with
/// [`take_written`](Self::take_written). Tests script entire conversations
/// through it; the tokio transport in the client crate wraps one of these
/// around a real socket.
#[derive(Debug, Default)]
pub struct StreamBuffer {
    inbound: BytesMut,
    outbound: BytesMut,
    closed: bool,
}

impl StreamBuffer {
    /// Create an empty stream buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append bytes received from the peer.
    ///
    /// Ignored after close, mirroring a torn-down socket.
    pub fn feed(&mut self, data: &[u8]) {
        if !self.closed {
            self.inbound.extend_from_slice(data);
        }
    }

    /// Drain everything written by the engine since the last call.
    pub fn take_written(&mut self) -> Bytes {
        self.outbound.split().freeze()
    }
}

impl ByteSource for StreamBuffer {
    fn bytes_available(&self) -> usize {
        self.inbound.len()
    }

    fn peek(&self, n: usize) -> &[u8] {
        &self.inbound[..n.min(self.inbound.len())]
    }

    fn read(&mut self, n: usize) -> Bytes {
        let n = n.min(self.inbound.len());
        self.inbound.split_to(n).freeze()
    }

    fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
        if self.closed {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "stream closed",
            ));
        }
        self.outbound.extend_from_slice(data);
        Ok(data.len())
    }

    fn close(&mut self) {
        self.closed = true;
        self.inbound.clear();
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

/// Non-consuming cursor over peeked bytes.
///
/// All multi-byte reads are big-endian (network order). Running off the end
/// yields `None`, which framers surface as [`Frame::Incomplete`]; the cursor
/// position then simply isn't committed, so the underlying buffer is left
/// untouched for the retry.
#[derive(Debug)]
pub struct PeekCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> PeekCursor<'a> {
    /// Create a cursor over a peeked byte slice.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Bytes walked so far - the length to commit once a unit is complete.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left to walk.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Option<&'a [u8]> {
        if self.remaining() < n {
            return None;
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Some(slice)
    }

    /// Advance past `n` bytes without interpreting them.
    pub fn skip(&mut self, n: usize) -> Option<()> {
        self.take(n).map(|_| ())
    }

    pub fn read_u8(&mut self) -> Option<u8> {
        self.take(1).map(|s| s[0])
    }

    pub fn read_u16(&mut self) -> Option<u16> {
        self.take(2).map(|mut s| s.get_u16())
    }

    pub fn read_u32(&mut self) -> Option<u32> {
        self.take(4).map(|mut s| s.get_u32())
    }

    pub fn read_i32(&mut self) -> Option<i32> {
        self.take(4).map(|mut s| s.get_i32())
    }
}
