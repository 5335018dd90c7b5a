//! Client-to-server message serializers.
//!
//! The engine sends only the requests the administration core needs:
//! session setup (ClientInit), format and encoding negotiation, and screen
//! update polling. Each serializer produces the complete wire form in one
//! buffer so the caller can hand it to a single write; a partial send is a
//! fatal condition handled by the connection layer.

use super::types::{
    PixelFormat, MSG_FRAMEBUFFER_UPDATE_REQUEST, MSG_SET_ENCODINGS, MSG_SET_PIXEL_FORMAT,
};
use bytes::{BufMut, Bytes, BytesMut};
use rfb_common::Rect;

/// Most encodings one SetEncodings message may carry.
///
/// A compile-time bound; callers asking for more are rejected before
/// anything reaches the wire.
pub const MAX_ENCODINGS: usize = 64;

/// ClientInit - sent once after a successful security handshake.
///
/// # Wire Format
///
/// - 1 byte: shared flag (1 = allow other clients to stay connected)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientInit {
    pub shared: bool,
}

impl ClientInit {
    pub fn encode(&self) -> Bytes {
        Bytes::from(vec![u8::from(self.shared)])
    }
}

/// SetPixelFormat - ask the server to deliver pixels in a given format.
///
/// # Wire Format
///
/// - 1 byte: message type (0)
/// - 3 bytes: padding
/// - 16 bytes: pixel format block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetPixelFormat {
    pub pixel_format: PixelFormat,
}

impl SetPixelFormat {
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(20);
        buf.put_u8(MSG_SET_PIXEL_FORMAT);
        buf.put_bytes(0, 3); // padding
        self.pixel_format.write_wire(&mut buf);
        buf.freeze()
    }
}

/// SetEncodings - declare supported encodings in preference order.
///
/// # Wire Format
///
/// - 1 byte: message type (2)
/// - 1 byte: padding
/// - 2 bytes: encoding count
/// - count x 4 bytes: encoding identifiers (signed)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetEncodings {
    pub encodings: Vec<i32>,
}

impl SetEncodings {
    /// Serialize, or `None` when the list exceeds [`MAX_ENCODINGS`].
    pub fn encode(&self) -> Option<Bytes> {
        if self.encodings.len() > MAX_ENCODINGS {
            return None;
        }

        let mut buf = BytesMut::with_capacity(4 + 4 * self.encodings.len());
        buf.put_u8(MSG_SET_ENCODINGS);
        buf.put_u8(0); // padding
        buf.put_u16(self.encodings.len() as u16);
        for &encoding in &self.encodings {
            buf.put_i32(encoding);
        }
        Some(buf.freeze())
    }
}

/// FramebufferUpdateRequest - poll the server for screen changes.
///
/// # Wire Format
///
/// - 1 byte: message type (3)
/// - 1 byte: incremental flag
/// - 2 bytes each: x, y, width, height
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramebufferUpdateRequest {
    pub incremental: bool,
    pub region: Rect,
}

impl FramebufferUpdateRequest {
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(10);
        buf.put_u8(MSG_FRAMEBUFFER_UPDATE_REQUEST);
        buf.put_u8(u8::from(self.incremental));
        buf.put_u16(self.region.x);
        buf.put_u16(self.region.y);
        buf.put_u16(self.region.width);
        buf.put_u16(self.region.height);
        buf.freeze()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::types::{ENCODING_COPY_RECT, ENCODING_HEXTILE, ENCODING_RAW};

    #[test]
    fn test_client_init_wire_form() {
        assert_eq!(&ClientInit { shared: true }.encode()[..], &[1]);
        assert_eq!(&ClientInit { shared: false }.encode()[..], &[0]);
    }

    #[test]
    fn test_set_pixel_format_wire_form() {
        let msg = SetPixelFormat {
            pixel_format: PixelFormat::default(),
        };
        let bytes = msg.encode();

        assert_eq!(bytes.len(), 20);
        assert_eq!(bytes[0], MSG_SET_PIXEL_FORMAT);
        assert_eq!(&bytes[1..4], &[0, 0, 0]);
        // Pixel format block starts with bpp/depth/flags.
        assert_eq!(&bytes[4..8], &[32, 24, 0, 1]);
        // red_max = 255 big-endian.
        assert_eq!(&bytes[8..10], &[0x00, 0xFF]);
    }

    #[test]
    fn test_set_encodings_wire_form() {
        let msg = SetEncodings {
            encodings: vec![ENCODING_HEXTILE, ENCODING_COPY_RECT, ENCODING_RAW],
        };
        let bytes = msg.encode().unwrap();

        assert_eq!(bytes.len(), 4 + 3 * 4);
        assert_eq!(bytes[0], MSG_SET_ENCODINGS);
        assert_eq!(&bytes[2..4], &[0x00, 0x03]);
        assert_eq!(&bytes[4..8], &[0x00, 0x00, 0x00, 0x05]);
    }

    #[test]
    fn test_set_encodings_negative_id() {
        let msg = SetEncodings {
            encodings: vec![-224],
        };
        let bytes = msg.encode().unwrap();
        assert_eq!(&bytes[4..8], &[0xFF, 0xFF, 0xFF, 0x20]);
    }

    #[test]
    fn test_set_encodings_rejects_oversized_list() {
        let msg = SetEncodings {
            encodings: vec![ENCODING_RAW; MAX_ENCODINGS + 1],
        };
        assert!(msg.encode().is_none());

        let at_limit = SetEncodings {
            encodings: vec![ENCODING_RAW; MAX_ENCODINGS],
        };
        assert!(at_limit.encode().is_some());
    }

    #[test]
    fn test_update_request_wire_form() {
        let msg = FramebufferUpdateRequest {
            incremental: true,
            region: Rect::new(0, 0, 1024, 768),
        };
        let bytes = msg.encode();

        assert_eq!(bytes.len(), 10);
        assert_eq!(bytes[0], MSG_FRAMEBUFFER_UPDATE_REQUEST);
        assert_eq!(bytes[1], 1);
        assert_eq!(&bytes[2..6], &[0, 0, 0, 0]);
        assert_eq!(&bytes[6..8], &[0x04, 0x00]); // width 1024
        assert_eq!(&bytes[8..10], &[0x03, 0x00]); // height 768
    }
}
