//! RFB message vocabulary.
//!
//! - [`types`] - pixel format, rectangle headers, and the protocol's
//!   identifier and size tables
//! - [`client`] - serializers for the client-to-server requests this engine
//!   sends
//!
//! Server-to-client messages have no parsed representation here on purpose:
//! the engine's job is to byte-account them (see
//! [`connection`](crate::connection) and [`encodings`](crate::encodings))
//! and hand the raw bytes onward, not to decode their content.

pub mod client;
pub mod types;

pub use client::{
    ClientInit, FramebufferUpdateRequest, SetEncodings, SetPixelFormat, MAX_ENCODINGS,
};
pub use types::{PixelFormat, RectangleHeader};
