//! End-to-end framing tests over a scripted server byte stream.
//!
//! These tests exercise the whole engine the way a connection loop does:
//! feed whatever "arrived", call `read()` until it reports no progress,
//! repeat. The central property is fragmentation invariance - chopping the
//! same server bytes into arbitrary chunks must produce exactly the same
//! states, framed messages, and client responses as one big delivery.

use bytes::{BufMut, BytesMut};
use proptest::prelude::*;
use rfb_common::Rect;
use rfb_protocol::messages::types::*;
use rfb_protocol::{ByteSource, ClientProtocol, ConnectionState, StreamBuffer};

const PASSWORD: &[u8] = b"passwd";
const CHALLENGE: [u8; 16] = [0xA5; 16];

/// Server side of a complete session: handshake with VNC authentication,
/// then a mix of every message type the engine frames.
fn server_stream() -> Vec<u8> {
    let mut buf = BytesMut::new();

    // Handshake.
    buf.put_slice(b"RFB 003.008\n");
    buf.put_slice(&[2, SECURITY_TYPE_NONE, SECURITY_TYPE_VNC_AUTH]);
    buf.put_slice(&CHALLENGE);
    buf.put_u32(AUTH_RESULT_OK);

    // Server init: 640x480, default format, named desktop.
    buf.put_u16(640);
    buf.put_u16(480);
    PixelFormat::default().write_wire(&mut buf);
    let name = b"integration-desk";
    buf.put_u32(name.len() as u32);
    buf.put_slice(name);

    // Bell.
    buf.put_u8(MSG_BELL);

    // Framebuffer update: one raw rect and one hextile rect.
    buf.put_u8(MSG_FRAMEBUFFER_UPDATE);
    buf.put_u8(0);
    buf.put_u16(2);
    buf.put_u16(5);
    buf.put_u16(10);
    buf.put_u16(16);
    buf.put_u16(8);
    buf.put_i32(ENCODING_RAW);
    buf.put_bytes(0x11, 16 * 8 * 4);
    buf.put_u16(32);
    buf.put_u16(32);
    buf.put_u16(16);
    buf.put_u16(16);
    buf.put_i32(ENCODING_HEXTILE);
    buf.put_u8(HEXTILE_RAW);
    buf.put_bytes(0x22, 16 * 16 * 4);

    // Server cut text.
    buf.put_u8(MSG_SERVER_CUT_TEXT);
    buf.put_bytes(0, 3);
    buf.put_u32(9);
    buf.put_slice(b"clipboard");

    // Colour map entries.
    buf.put_u8(MSG_SET_COLOUR_MAP_ENTRIES);
    buf.put_u8(0);
    buf.put_u16(0);
    buf.put_u16(2);
    buf.put_bytes(0, 2 * 6);

    // Resize, then an update sized for the new screen.
    buf.put_u8(MSG_RESIZE_FRAMEBUFFER);
    buf.put_u8(0);
    buf.put_u16(1024);
    buf.put_u16(768);

    buf.put_u8(MSG_FRAMEBUFFER_UPDATE);
    buf.put_u8(0);
    buf.put_u16(1);
    buf.put_u16(700);
    buf.put_u16(500);
    buf.put_u16(4);
    buf.put_u16(4);
    buf.put_i32(ENCODING_RAW);
    buf.put_bytes(0x33, 4 * 4 * 4);

    // Xvp extension message.
    buf.put_slice(&[MSG_XVP, 0, 1, 2]);

    buf.to_vec()
}

#[derive(Debug, PartialEq, Eq)]
struct SessionResult {
    final_state: ConnectionState,
    closed: bool,
    geometry: (u16, u16),
    desktop_name: String,
    messages: Vec<Vec<u8>>,
    regions: Vec<Rect>,
    written: Vec<u8>,
    leftover: usize,
}

/// Feed the stream in the given chunks, draining the engine after each.
fn drive_chunks(chunks: &[&[u8]]) -> SessionResult {
    let mut proto = ClientProtocol::new(StreamBuffer::new(), PASSWORD);
    let mut messages = Vec::new();
    let mut regions = Vec::new();

    for chunk in chunks {
        proto.source_mut().feed(chunk);
        loop {
            let was_running = proto.is_running();
            if !proto.read() {
                break;
            }
            if was_running {
                let message = proto.last_message().to_vec();
                if message[0] == MSG_FRAMEBUFFER_UPDATE {
                    regions.push(proto.updated_region());
                }
                messages.push(message);
            }
        }
    }

    SessionResult {
        final_state: proto.state(),
        closed: proto.source_mut().is_closed(),
        geometry: proto.framebuffer_size(),
        desktop_name: proto.desktop_name().to_string(),
        messages,
        regions,
        leftover: proto.source_mut().bytes_available(),
        written: proto.source_mut().take_written().to_vec(),
    }
}

#[test]
fn full_session_frames_every_message() {
    let stream = server_stream();
    let result = drive_chunks(&[&stream]);

    assert_eq!(result.final_state, ConnectionState::Running);
    assert!(!result.closed);
    assert_eq!(result.desktop_name, "integration-desk");
    assert_eq!(result.geometry, (1024, 768));
    assert_eq!(result.leftover, 0);

    // Bell, update, cut text, colour map, resize, update, xvp.
    assert_eq!(result.messages.len(), 7);
    assert_eq!(result.messages[0], vec![MSG_BELL]);
    assert_eq!(result.messages[2].len(), 8 + 9);
    assert_eq!(result.messages[3].len(), 6 + 12);
    assert_eq!(result.messages[4].len(), RESIZE_SIZE);
    assert_eq!(result.messages[6].len(), XVP_SIZE);

    // First update: bounding box of the raw rect (5,10,16,8) and the
    // hextile rect (32,32,16,16). Second update: single rect.
    assert_eq!(result.regions, vec![Rect::new(5, 10, 43, 38), Rect::new(700, 500, 4, 4)]);

    // Client side: version echo, security choice, auth response,
    // client-init - all before the first framed message.
    assert_eq!(&result.written[..12], b"RFB 003.008\n");
    assert_eq!(result.written[12], SECURITY_TYPE_VNC_AUTH);
    assert_eq!(result.written.len(), 12 + 1 + 16 + 1);
    assert_eq!(*result.written.last().unwrap(), 1); // shared-session flag
}

#[test]
fn byte_at_a_time_matches_single_delivery() {
    let stream = server_stream();
    let reference = drive_chunks(&[&stream]);

    let chunks: Vec<&[u8]> = stream.chunks(1).collect();
    assert_eq!(drive_chunks(&chunks), reference);
}

#[test]
fn trailing_bytes_stay_buffered_for_next_call() {
    let mut stream = server_stream();
    // A second bell right behind the scripted session.
    stream.push(MSG_BELL);

    let result = drive_chunks(&[&stream]);
    assert_eq!(result.messages.len(), 8);
    assert_eq!(result.messages[7], vec![MSG_BELL]);
    assert_eq!(result.leftover, 0);
}

#[test]
fn authentication_response_is_reproducible() {
    let stream = server_stream();
    let first = drive_chunks(&[&stream]);
    let second = drive_chunks(&[&stream]);

    // Same password, same challenge: byte-identical client output.
    assert_eq!(first.written, second.written);
}

proptest! {
    /// Chop the session stream at arbitrary positions; every chunking must
    /// produce the same result as one delivery.
    #[test]
    fn fragmentation_invariance(cuts in prop::collection::vec(any::<prop::sample::Index>(), 0..12)) {
        let stream = server_stream();
        let reference = drive_chunks(&[&stream]);

        let mut positions: Vec<usize> = cuts.iter().map(|ix| ix.index(stream.len())).collect();
        positions.sort_unstable();
        positions.dedup();

        let mut chunks = Vec::new();
        let mut start = 0;
        for position in positions {
            chunks.push(&stream[start..position]);
            start = position;
        }
        chunks.push(&stream[start..]);

        prop_assert_eq!(drive_chunks(&chunks), reference);
    }
}
