//! Rectangle payload accounting.
//!
//! Each rectangle in a framebuffer update is followed by payload whose
//! length depends on the encoding - and for several encodings the length
//! lives *inside* the payload (subrectangle counts, compressed-byte counts,
//! per-tile flags). The framers here walk a [`PeekCursor`] over buffered
//! bytes far enough to account for every payload byte without interpreting
//! pixel content. Compressed payloads stay opaque; nothing is inflated.
//!
//! Running off the end of the buffer yields [`Frame::Incomplete`]: the
//! cursor position is abandoned and the whole message is retried once more
//! data arrives. An encoding the engine does not know is fatal.

use crate::connection::MAX_MESSAGE_SIZE;
use crate::error::FrameError;
use crate::io::{Frame, PeekCursor};
use crate::messages::types::*;

/// Account for one rectangle's payload, advancing `cursor` past it.
///
/// `bytes_per_pixel` comes from the pixel format cached at server-init.
/// On [`Frame::Incomplete`] the cursor is in an undefined position and must
/// be discarded by the caller.
pub fn rect_payload(
    cursor: &mut PeekCursor<'_>,
    header: &RectangleHeader,
    bytes_per_pixel: usize,
) -> Result<Frame, FrameError> {
    let width = usize::from(header.width);
    let height = usize::from(header.height);
    // Cursor-shape bitmasks pack one bit per pixel per row.
    let bytes_per_row = width.div_ceil(8);

    let complete = match header.encoding {
        ENCODING_LAST_RECT => Some(()),

        ENCODING_RAW => cursor.skip(width * height * bytes_per_pixel),

        ENCODING_COPY_RECT => cursor.skip(COPY_RECT_SIZE),

        ENCODING_RRE => return subrect_run(cursor, bytes_per_pixel, RRE_SUBRECT_SIZE),

        ENCODING_CORRE => return subrect_run(cursor, bytes_per_pixel, CORRE_SUBRECT_SIZE),

        ENCODING_HEXTILE => return hextile_tiles(cursor, header, bytes_per_pixel),

        ENCODING_ZLIB | ENCODING_ULTRA | ENCODING_ULTRA_ZIP | ENCODING_ZRLE
        | ENCODING_ZYWRLE => return compressed_run(cursor),

        ENCODING_X_CURSOR => {
            if width * height == 0 {
                Some(())
            } else {
                cursor
                    .skip(X_CURSOR_COLOURS_SIZE)
                    .and_then(|_| cursor.skip(2 * bytes_per_row * height))
            }
        }

        ENCODING_RICH_CURSOR => {
            if width * height == 0 {
                Some(())
            } else {
                cursor
                    .skip(width * height * bytes_per_pixel)
                    .and_then(|_| cursor.skip(bytes_per_row * height))
            }
        }

        ENCODING_SUPPORTED_MESSAGES => cursor.skip(SUPPORTED_MESSAGES_SIZE),

        // Width carries the payload byte count for these two.
        ENCODING_SUPPORTED_ENCODINGS | ENCODING_SERVER_IDENTITY => cursor.skip(width),

        // Metadata travels entirely in the rectangle header.
        ENCODING_POINTER_POS | ENCODING_KEYBOARD_LED_STATE | ENCODING_NEW_FB_SIZE => Some(()),

        other => return Err(FrameError::UnsupportedEncoding(other)),
    };

    Ok(match complete {
        Some(()) => Frame::Complete,
        None => Frame::Incomplete,
    })
}

/// RRE and CoRRE: a subrectangle count, a background pixel, then one pixel
/// plus one coordinate block per subrectangle.
fn subrect_run(
    cursor: &mut PeekCursor<'_>,
    bytes_per_pixel: usize,
    subrect_size: usize,
) -> Result<Frame, FrameError> {
    let Some(n_subrects) = cursor.read_u32() else {
        return Ok(Frame::Incomplete);
    };

    let data_size = bytes_per_pixel + n_subrects as usize * (bytes_per_pixel + subrect_size);
    if data_size > MAX_MESSAGE_SIZE {
        return Err(FrameError::MessageTooLarge(data_size));
    }

    Ok(match cursor.skip(data_size) {
        Some(()) => Frame::Complete,
        None => Frame::Incomplete,
    })
}

/// Zlib-family and ZRLE-family: a 4-byte compressed length, then that many
/// opaque bytes.
fn compressed_run(cursor: &mut PeekCursor<'_>) -> Result<Frame, FrameError> {
    let Some(length) = cursor.read_u32() else {
        return Ok(Frame::Incomplete);
    };

    let length = length as usize;
    if length > MAX_MESSAGE_SIZE {
        return Err(FrameError::MessageTooLarge(length));
    }

    Ok(match cursor.skip(length) {
        Some(()) => Frame::Complete,
        None => Frame::Incomplete,
    })
}

/// Hextile: 16x16 tiles in row-major order, clipped at the rectangle's
/// right and bottom edges. Every tile declares its own layout in a
/// sub-encoding byte, so the walk has to visit each tile in turn.
fn hextile_tiles(
    cursor: &mut PeekCursor<'_>,
    header: &RectangleHeader,
    bytes_per_pixel: usize,
) -> Result<Frame, FrameError> {
    let rx = u32::from(header.x);
    let ry = u32::from(header.y);
    let rw = u32::from(header.width);
    let rh = u32::from(header.height);

    for y in (ry..ry + rh).step_by(16) {
        for x in (rx..rx + rw).step_by(16) {
            let tile_w = 16.min(rx + rw - x) as usize;
            let tile_h = 16.min(ry + rh - y) as usize;

            let Some(sub_encoding) = cursor.read_u8() else {
                return Ok(Frame::Incomplete);
            };

            if sub_encoding & HEXTILE_RAW != 0 {
                // Raw tiles carry pixels only; remaining flags do not apply.
                if cursor.skip(tile_w * tile_h * bytes_per_pixel).is_none() {
                    return Ok(Frame::Incomplete);
                }
                continue;
            }

            if sub_encoding & HEXTILE_BACKGROUND_SPECIFIED != 0
                && cursor.skip(bytes_per_pixel).is_none()
            {
                return Ok(Frame::Incomplete);
            }

            if sub_encoding & HEXTILE_FOREGROUND_SPECIFIED != 0
                && cursor.skip(bytes_per_pixel).is_none()
            {
                return Ok(Frame::Incomplete);
            }

            if sub_encoding & HEXTILE_ANY_SUBRECTS == 0 {
                continue;
            }

            let Some(n_subrects) = cursor.read_u8() else {
                return Ok(Frame::Incomplete);
            };

            // Two coordinate bytes per subrect, plus a pixel each when the
            // coloured flag is set.
            let subrect_size = if sub_encoding & HEXTILE_SUBRECTS_COLOURED != 0 {
                2 + bytes_per_pixel
            } else {
                2
            };

            if cursor.skip(usize::from(n_subrects) * subrect_size).is_none() {
                return Ok(Frame::Incomplete);
            }
        }
    }

    Ok(Frame::Complete)
}
