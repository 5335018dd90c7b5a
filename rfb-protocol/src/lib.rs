//! Client-side RFB (Remote Framebuffer) protocol engine.
//!
//! This crate implements the wire-protocol core of the remote-desktop
//! administration client: handshake, classic VNC authentication, and the
//! incremental framing of server messages. It deliberately stops at byte
//! accounting - rectangle payloads are measured and handed onward as opaque
//! bytes, never decoded into pixels.
//!
//! The engine is synchronous and non-blocking. It parses against a
//! [`ByteSource`] that buffers whatever the socket has delivered so far;
//! a [`ClientProtocol::read`] call either completes one protocol step or
//! reports that more bytes are needed, consuming nothing in the latter
//! case. That makes the engine safe to drive from any readiness loop - the
//! companion client crate pumps it from a tokio socket, and tests script it
//! byte by byte.
//!
//! # Modules
//!
//! - [`io`] - byte-source seam, in-memory stream buffer, peek cursor
//! - [`auth`] - classic VNC challenge/response cipher
//! - [`messages`] - wire types, constants, client-request serializers
//! - [`encodings`] - per-encoding rectangle payload accounting
//! - [`connection`] - the handshake/framing state machine
//!
//! # Example
//!
//! ```
//! use rfb_protocol::{ClientProtocol, StreamBuffer};
//!
//! let mut engine = ClientProtocol::new(StreamBuffer::new(), b"secret");
//!
//! // The version line hasn't arrived: nothing happens, nothing is lost.
//! assert!(!engine.read());
//!
//! engine.source_mut().feed(b"RFB 003.008\n");
//! assert!(engine.read());
//! ```

pub mod auth;
pub mod connection;
pub mod encodings;
pub mod error;
pub mod io;
pub mod messages;

// Re-export commonly used types
pub use connection::{ClientProtocol, ConnectionState, MAX_MESSAGE_SIZE};
pub use error::FrameError;
pub use io::{ByteSource, Frame, PeekCursor, StreamBuffer};
pub use messages::{PixelFormat, RectangleHeader, MAX_ENCODINGS};
