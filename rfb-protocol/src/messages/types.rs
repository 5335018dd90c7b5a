//! Core RFB wire types and protocol constants.
//!
//! This module defines the vocabulary shared by the handshake and the
//! framers: [`PixelFormat`], [`RectangleHeader`], and the message-type /
//! security-type / encoding identifier tables.
//!
//! Network bytes are decoded field by field with explicit big-endian
//! conversion. The protocol fixes every layout, so nothing here overlays
//! structs onto raw buffers.

use crate::io::PeekCursor;
use bytes::{BufMut, BytesMut};
use rfb_common::Rect;

//
// Server-to-client message types
//

pub const MSG_FRAMEBUFFER_UPDATE: u8 = 0;
pub const MSG_SET_COLOUR_MAP_ENTRIES: u8 = 1;
pub const MSG_BELL: u8 = 2;
pub const MSG_SERVER_CUT_TEXT: u8 = 3;
pub const MSG_RESIZE_FRAMEBUFFER: u8 = 4;
pub const MSG_XVP: u8 = 250;

//
// Client-to-server message types
//

pub const MSG_SET_PIXEL_FORMAT: u8 = 0;
pub const MSG_SET_ENCODINGS: u8 = 2;
pub const MSG_FRAMEBUFFER_UPDATE_REQUEST: u8 = 3;

//
// Security types
//

/// No authentication.
pub const SECURITY_TYPE_NONE: u8 = 1;

/// Classic VNC password challenge/response.
pub const SECURITY_TYPE_VNC_AUTH: u8 = 2;

/// Security-result value for a successful handshake.
pub const AUTH_RESULT_OK: u32 = 0;

//
// Encoding identifiers (signed 32-bit on the wire)
//

pub const ENCODING_RAW: i32 = 0;
pub const ENCODING_COPY_RECT: i32 = 1;
pub const ENCODING_RRE: i32 = 2;
pub const ENCODING_CORRE: i32 = 4;
pub const ENCODING_HEXTILE: i32 = 5;
pub const ENCODING_ZLIB: i32 = 6;
pub const ENCODING_ULTRA: i32 = 9;
pub const ENCODING_ULTRA_ZIP: i32 = 10;
pub const ENCODING_ZRLE: i32 = 16;
pub const ENCODING_ZYWRLE: i32 = 17;

/// Cursor shape in X bitmap form.
pub const ENCODING_X_CURSOR: i32 = -240; // 0xFFFFFF10
/// Cursor shape in full pixels plus a transparency bitmask.
pub const ENCODING_RICH_CURSOR: i32 = -239; // 0xFFFFFF11
/// Pointer position report; coordinates travel in the rectangle header.
pub const ENCODING_POINTER_POS: i32 = -232; // 0xFFFFFF18
/// Sentinel ending a framebuffer update before the declared count.
pub const ENCODING_LAST_RECT: i32 = -224; // 0xFFFFFF20
/// Framebuffer size hint; dimensions travel in the rectangle header.
pub const ENCODING_NEW_FB_SIZE: i32 = -223; // 0xFFFFFF21
/// Keyboard LED state; the state travels in the rectangle header.
pub const ENCODING_KEYBOARD_LED_STATE: i32 = -131072; // 0xFFFE0000
/// Bitmap of message types the server understands.
pub const ENCODING_SUPPORTED_MESSAGES: i32 = -131071; // 0xFFFE0001
/// List of encodings the server understands; width carries the byte count.
pub const ENCODING_SUPPORTED_ENCODINGS: i32 = -131070; // 0xFFFE0002
/// Server software identity string; width carries the byte count.
pub const ENCODING_SERVER_IDENTITY: i32 = -131069; // 0xFFFE0003

//
// Fixed wire sizes
//

/// Version line: `RFB ddd.ddd\n`.
pub const VERSION_LINE_SIZE: usize = 12;
/// Pixel-format block inside SetPixelFormat and the server-init message.
pub const PIXEL_FORMAT_SIZE: usize = 16;
/// Server-init fixed header (width, height, pixel format, name length).
pub const SERVER_INIT_HEADER_SIZE: usize = 24;
/// FramebufferUpdate fixed header (type, padding, rectangle count).
pub const UPDATE_HEADER_SIZE: usize = 4;
/// Rectangle header (x, y, width, height, encoding).
pub const RECT_HEADER_SIZE: usize = 12;
/// SetColourMapEntries fixed header; 6 bytes per colour follow.
pub const COLOUR_MAP_HEADER_SIZE: usize = 6;
/// Bell message; type byte only.
pub const BELL_SIZE: usize = 1;
/// ServerCutText fixed header; the text follows.
pub const CUT_TEXT_HEADER_SIZE: usize = 8;
/// ResizeFrameBuffer message (type, padding, width, height).
pub const RESIZE_SIZE: usize = 6;
/// Xvp extension message (type, padding, version, code).
pub const XVP_SIZE: usize = 4;
/// CopyRect payload (source x, source y).
pub const COPY_RECT_SIZE: usize = 4;
/// RRE/CoRRE sub-header (subrectangle count).
pub const RRE_HEADER_SIZE: usize = 4;
/// RRE subrectangle coordinates (x, y, w, h as u16).
pub const RRE_SUBRECT_SIZE: usize = 4 * 2;
/// CoRRE subrectangle coordinates (x, y, w, h as u8).
pub const CORRE_SUBRECT_SIZE: usize = 4;
/// Zlib-family and ZRLE-family sub-header (compressed byte count).
pub const COMPRESSED_HEADER_SIZE: usize = 4;
/// XCursor colour block (foreground and background RGB).
pub const X_CURSOR_COLOURS_SIZE: usize = 6;
/// SupportedMessages payload (two 32-byte bitmaps).
pub const SUPPORTED_MESSAGES_SIZE: usize = 64;

//
// Hextile sub-encoding flags
//

pub const HEXTILE_RAW: u8 = 0x01;
pub const HEXTILE_BACKGROUND_SPECIFIED: u8 = 0x02;
pub const HEXTILE_FOREGROUND_SPECIFIED: u8 = 0x04;
pub const HEXTILE_ANY_SUBRECTS: u8 = 0x08;
pub const HEXTILE_SUBRECTS_COLOURED: u8 = 0x10;

/// RFB pixel format description.
///
/// Populated once from the server-init message and consulted by the
/// rectangle framers for the bytes-per-pixel factor.
///
/// # Wire Format
///
/// 16 bytes: bits-per-pixel, depth, big-endian flag, true-colour flag,
/// red/green/blue max (u16 each), red/green/blue shift, 3 padding bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelFormat {
    pub bits_per_pixel: u8,
    pub depth: u8,
    pub big_endian: bool,
    pub true_colour: bool,
    pub red_max: u16,
    pub green_max: u16,
    pub blue_max: u16,
    pub red_shift: u8,
    pub green_shift: u8,
    pub blue_shift: u8,
}

impl Default for PixelFormat {
    /// Standard 32-bit true-colour format, the near-universal default.
    fn default() -> Self {
        Self {
            bits_per_pixel: 32,
            depth: 24,
            big_endian: false,
            true_colour: true,
            red_max: 255,
            green_max: 255,
            blue_max: 255,
            red_shift: 16,
            green_shift: 8,
            blue_shift: 0,
        }
    }
}

impl PixelFormat {
    /// Bytes each pixel occupies on the wire.
    pub fn bytes_per_pixel(&self) -> usize {
        usize::from(self.bits_per_pixel).div_ceil(8)
    }

    /// Decode a complete 16-byte pixel-format block.
    pub fn from_wire(bytes: &[u8; PIXEL_FORMAT_SIZE]) -> Self {
        Self {
            bits_per_pixel: bytes[0],
            depth: bytes[1],
            big_endian: bytes[2] != 0,
            true_colour: bytes[3] != 0,
            red_max: u16::from_be_bytes([bytes[4], bytes[5]]),
            green_max: u16::from_be_bytes([bytes[6], bytes[7]]),
            blue_max: u16::from_be_bytes([bytes[8], bytes[9]]),
            red_shift: bytes[10],
            green_shift: bytes[11],
            blue_shift: bytes[12],
            // bytes[13..16] are padding
        }
    }

    /// Decode a pixel-format block; `None` if the cursor runs dry.
    pub fn parse(cursor: &mut PeekCursor<'_>) -> Option<Self> {
        let mut block = [0u8; PIXEL_FORMAT_SIZE];
        for slot in block.iter_mut() {
            *slot = cursor.read_u8()?;
        }
        Some(Self::from_wire(&block))
    }

    /// Append the 16-byte wire form.
    pub fn write_wire(&self, buf: &mut BytesMut) {
        buf.put_u8(self.bits_per_pixel);
        buf.put_u8(self.depth);
        buf.put_u8(self.big_endian.into());
        buf.put_u8(self.true_colour.into());
        buf.put_u16(self.red_max);
        buf.put_u16(self.green_max);
        buf.put_u16(self.blue_max);
        buf.put_u8(self.red_shift);
        buf.put_u8(self.green_shift);
        buf.put_u8(self.blue_shift);
        buf.put_bytes(0, 3); // padding
    }
}

/// Header of one rectangle within a framebuffer update.
///
/// Ephemeral: parsed, byte-accounted, and discarded once per iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RectangleHeader {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
    pub encoding: i32,
}

impl RectangleHeader {
    /// Decode a 12-byte rectangle header; `None` if the cursor runs dry.
    pub fn parse(cursor: &mut PeekCursor<'_>) -> Option<Self> {
        Some(Self {
            x: cursor.read_u16()?,
            y: cursor.read_u16()?,
            width: cursor.read_u16()?,
            height: cursor.read_u16()?,
            encoding: cursor.read_i32()?,
        })
    }

    /// The screen region this rectangle covers.
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    /// True for encodings that carry metadata rather than screen content.
    ///
    /// These are excluded from the updated-region accumulation.
    pub fn is_pseudo(&self) -> bool {
        matches!(
            self.encoding,
            ENCODING_SUPPORTED_ENCODINGS
                | ENCODING_SUPPORTED_MESSAGES
                | ENCODING_SERVER_IDENTITY
                | ENCODING_POINTER_POS
                | ENCODING_KEYBOARD_LED_STATE
                | ENCODING_NEW_FB_SIZE
        )
    }
}
