//! The RFB client protocol state machine.
//!
//! [`ClientProtocol`] owns a [`ByteSource`] and drives it through the
//! handshake into steady-state message framing. The owning connection calls
//! [`read`](ClientProtocol::read) whenever bytes may have arrived:
//!
//! - `true` means one complete protocol step happened - a handshake phase
//!   advanced or one whole application message was framed;
//! - `false` means either "not enough bytes yet, call again later" or, if
//!   the source is now closed, "the connection is dead".
//!
//! Nothing is ever consumed speculatively. Every step peeks far enough to
//! learn the unit's total length, confirms that many bytes are buffered,
//! and only then reads them in one call - so a call that returns without
//! completing a step leaves the stream byte-for-byte untouched.
//!
//! # States
//!
//! Transitions are strictly forward and no state is ever revisited:
//!
//! ```text
//! Protocol -> SecurityInit -> SecurityChallenge -> SecurityResult
//!          -> FramebufferInit -> Running
//! ```
//!
//! (`SecurityChallenge` is skipped when the server accepts the `None`
//! security type.) `Running` is terminal: the engine frames one message per
//! successful call until the connection closes.

use crate::auth::{self, CHALLENGE_SIZE};
use crate::encodings;
use crate::error::FrameError;
use crate::io::{ByteSource, Frame, PeekCursor};
use crate::messages::client::{
    ClientInit, FramebufferUpdateRequest, SetEncodings, SetPixelFormat,
};
use crate::messages::types::*;
use bytes::Bytes;
use rfb_common::Rect;
use std::fmt;
use tracing::{debug, warn};

/// Hard bound on buffered-but-unframed bytes.
///
/// A well-behaved server never needs this much lookahead before a message
/// boundary is known; exceeding it means the peer is hostile or broken and
/// the connection is closed.
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024;

/// Longest acceptable desktop name in the server-init message.
const MAX_NAME_LENGTH: u32 = 255;

/// Handshake and steady-state phases, in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// Awaiting the server's 12-byte version line.
    Protocol,
    /// Awaiting the security-type list.
    SecurityInit,
    /// Awaiting the 16-byte authentication challenge.
    SecurityChallenge,
    /// Awaiting the 4-byte security result.
    SecurityResult,
    /// Awaiting the server-init message.
    FramebufferInit,
    /// Steady state: framing one application message per call.
    Running,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Protocol => "Protocol",
            Self::SecurityInit => "SecurityInit",
            Self::SecurityChallenge => "SecurityChallenge",
            Self::SecurityResult => "SecurityResult",
            Self::FramebufferInit => "FramebufferInit",
            Self::Running => "Running",
        };
        f.write_str(name)
    }
}

/// Client-side RFB protocol engine.
///
/// One instance per connection, owned and driven by a single caller; the
/// engine itself never blocks, spawns, or times out.
#[derive(Debug)]
pub struct ClientProtocol<S> {
    source: S,
    /// Consumed by the challenge step and dropped at the end of the
    /// handshake; never retained into the Running state.
    password: Option<Vec<u8>>,
    state: ConnectionState,
    pixel_format: PixelFormat,
    width: u16,
    height: u16,
    desktop_name: String,
    /// Raw bytes of the last fully framed message. At most one message is
    /// pending: a new one is never framed before this buffer is replaced.
    last_message: Bytes,
    updated_region: Rect,
}

impl<S: ByteSource> ClientProtocol<S> {
    /// Create an engine over a byte source.
    ///
    /// `password` feeds the challenge/response step if the server asks for
    /// it; pass an empty slice when no authentication is expected.
    pub fn new(source: S, password: &[u8]) -> Self {
        Self {
            source,
            password: Some(password.to_vec()),
            state: ConnectionState::Protocol,
            pixel_format: PixelFormat::default(),
            width: 0,
            height: 0,
            desktop_name: String::new(),
            last_message: Bytes::new(),
            updated_region: Rect::empty(),
        }
    }

    /// Current handshake/steady-state phase.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// True once the handshake finished and messages are being framed.
    pub fn is_running(&self) -> bool {
        self.state == ConnectionState::Running
    }

    /// Framebuffer geometry from server-init, updated on resize messages.
    pub fn framebuffer_size(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    /// Pixel format announced in the server-init message.
    pub fn pixel_format(&self) -> &PixelFormat {
        &self.pixel_format
    }

    /// Desktop name announced in the server-init message.
    pub fn desktop_name(&self) -> &str {
        &self.desktop_name
    }

    /// Bounding rectangle of the content touched by the last framed
    /// framebuffer update. Recomputed per update message.
    pub fn updated_region(&self) -> Rect {
        self.updated_region
    }

    /// Raw bytes of the last framed message (type byte included).
    pub fn last_message(&self) -> &[u8] {
        &self.last_message
    }

    /// Hand the last framed message to the caller.
    pub fn take_last_message(&mut self) -> Bytes {
        std::mem::take(&mut self.last_message)
    }

    /// Access the underlying byte source (e.g. to feed inbound data).
    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Tear down the engine and recover the byte source.
    pub fn into_source(self) -> S {
        self.source
    }

    /// Drive one protocol step.
    ///
    /// Returns `true` when a step completed (state advanced or a message
    /// was framed); `false` when more bytes are needed or the connection is
    /// closed. A protocol violation closes the source, after which every
    /// call returns `false`.
    pub fn read(&mut self) -> bool {
        if self.source.is_closed() {
            return false;
        }

        match self.state {
            ConnectionState::Protocol => self.read_protocol_version(),
            ConnectionState::SecurityInit => self.receive_security_types(),
            ConnectionState::SecurityChallenge => self.receive_security_challenge(),
            ConnectionState::SecurityResult => self.receive_security_result(),
            ConnectionState::FramebufferInit => self.receive_server_init(),
            ConnectionState::Running => self.receive_message(),
        }
    }

    //
    // Handshake phases
    //

    fn read_protocol_version(&mut self) -> bool {
        if self.source.bytes_available() < VERSION_LINE_SIZE {
            return false;
        }

        let mut line = [0u8; VERSION_LINE_SIZE];
        line.copy_from_slice(self.source.peek(VERSION_LINE_SIZE));

        let Some((major, minor)) = parse_version_line(&line) else {
            return self.fail(FrameError::InvalidVersion);
        };
        if major != 3 || minor < 7 {
            warn!(major, minor, "server offered an unsupported version");
            return self.fail(FrameError::InvalidVersion);
        }

        self.source.read(VERSION_LINE_SIZE);

        // Mirror the server's version line back, pinning the session to
        // exactly the version it advertised.
        if !self.send(&line) {
            return false;
        }

        debug!(major, minor, "protocol version negotiated");
        self.state = ConnectionState::SecurityInit;
        true
    }

    fn receive_security_types(&mut self) -> bool {
        if self.source.bytes_available() < 2 {
            return false;
        }

        let count = usize::from(self.source.peek(1)[0]);
        if count == 0 {
            return self.fail(FrameError::NoSecurityTypes);
        }
        if self.source.bytes_available() < 1 + count {
            return false;
        }

        let offered = self.source.peek(1 + count)[1..].to_vec();

        let (chosen, next) = if offered.contains(&SECURITY_TYPE_VNC_AUTH) {
            (SECURITY_TYPE_VNC_AUTH, ConnectionState::SecurityChallenge)
        } else if offered.contains(&SECURITY_TYPE_NONE) {
            (SECURITY_TYPE_NONE, ConnectionState::SecurityResult)
        } else {
            return self.fail(FrameError::UnsupportedSecurityTypes(offered));
        };

        self.source.read(1 + count);
        if !self.send(&[chosen]) {
            return false;
        }

        debug!(security_type = chosen, "security type selected");
        self.state = next;
        true
    }

    fn receive_security_challenge(&mut self) -> bool {
        if self.source.bytes_available() < CHALLENGE_SIZE {
            return false;
        }

        let mut challenge = [0u8; CHALLENGE_SIZE];
        challenge.copy_from_slice(self.source.peek(CHALLENGE_SIZE));
        self.source.read(CHALLENGE_SIZE);

        let password = self.password.take().unwrap_or_default();
        let response = auth::encrypt_challenge(&password, &challenge);

        if !self.send(&response) {
            return false;
        }

        self.state = ConnectionState::SecurityResult;
        true
    }

    fn receive_security_result(&mut self) -> bool {
        if self.source.bytes_available() < 4 {
            return false;
        }

        let mut code = [0u8; 4];
        code.copy_from_slice(self.source.peek(4));
        self.source.read(4);

        let result = u32::from_be_bytes(code);
        if result != AUTH_RESULT_OK {
            return self.fail(FrameError::AuthenticationFailed(result));
        }

        debug!("authentication successful");
        // The credential has served its purpose either way.
        self.password = None;

        // Request a shared session; the administration use case always
        // coexists with the console user.
        if !self.send(&ClientInit { shared: true }.encode()) {
            return false;
        }

        self.state = ConnectionState::FramebufferInit;
        true
    }

    fn receive_server_init(&mut self) -> bool {
        if self.source.bytes_available() < SERVER_INIT_HEADER_SIZE {
            return false;
        }

        let mut head = [0u8; SERVER_INIT_HEADER_SIZE];
        head.copy_from_slice(self.source.peek(SERVER_INIT_HEADER_SIZE));

        let name_length = u32::from_be_bytes([head[20], head[21], head[22], head[23]]);
        if name_length > MAX_NAME_LENGTH {
            return self.fail(FrameError::NameTooLong(name_length));
        }

        // Second phase: the whole variable-length message must be buffered
        // before a single byte is consumed.
        let total = SERVER_INIT_HEADER_SIZE + name_length as usize;
        if self.source.bytes_available() < total {
            return false;
        }

        let message = self.source.read(total);

        self.width = u16::from_be_bytes([message[0], message[1]]);
        self.height = u16::from_be_bytes([message[2], message[3]]);

        let mut format = [0u8; PIXEL_FORMAT_SIZE];
        format.copy_from_slice(&message[4..4 + PIXEL_FORMAT_SIZE]);
        self.pixel_format = PixelFormat::from_wire(&format);

        self.desktop_name =
            String::from_utf8_lossy(&message[SERVER_INIT_HEADER_SIZE..]).into_owned();
        self.last_message = message;

        debug!(
            width = self.width,
            height = self.height,
            name = %self.desktop_name,
            "server init received"
        );
        self.state = ConnectionState::Running;
        true
    }

    //
    // Steady-state message framing
    //

    fn receive_message(&mut self) -> bool {
        let available = self.source.bytes_available();

        // If this much piled up before a single boundary was found, the
        // peer is flooding us; stop before the buffer grows without limit.
        if available > MAX_MESSAGE_SIZE {
            return self.fail(FrameError::BufferOverrun(available));
        }
        if available == 0 {
            return false;
        }

        let tag = self.source.peek(1)[0];
        let mut region = Rect::empty();
        let length;
        let outcome = {
            let buf = self.source.peek(available);
            let mut cursor = PeekCursor::new(buf);
            let outcome = match tag {
                MSG_FRAMEBUFFER_UPDATE => self.frame_update(&mut cursor, &mut region),
                MSG_SET_COLOUR_MAP_ENTRIES => frame_colour_map(&mut cursor),
                MSG_BELL => frame_fixed(&mut cursor, BELL_SIZE),
                MSG_SERVER_CUT_TEXT => frame_cut_text(&mut cursor),
                MSG_RESIZE_FRAMEBUFFER => frame_fixed(&mut cursor, RESIZE_SIZE),
                MSG_XVP => frame_fixed(&mut cursor, XVP_SIZE),
                other => Err(FrameError::UnknownMessageType(other)),
            };
            length = cursor.position();
            outcome
        };

        match outcome {
            Ok(Frame::Complete) => self.commit_message(tag, length, region),
            Ok(Frame::Incomplete) => false,
            Err(error) => self.fail(error),
        }
    }

    /// Consume a fully validated message and apply its side effects.
    fn commit_message(&mut self, tag: u8, length: usize, region: Rect) -> bool {
        self.last_message = self.source.read(length);

        match tag {
            MSG_FRAMEBUFFER_UPDATE => {
                self.updated_region = region;
            }
            MSG_RESIZE_FRAMEBUFFER => {
                // Geometry is re-read from the consumed bytes so later
                // update requests cover the new screen.
                let message = &self.last_message;
                self.width = u16::from_be_bytes([message[2], message[3]]);
                self.height = u16::from_be_bytes([message[4], message[5]]);
                debug!(
                    width = self.width,
                    height = self.height,
                    "framebuffer resized"
                );
            }
            _ => {}
        }

        true
    }

    /// Walk a framebuffer-update message: fixed header, then
    /// `rect_count` rectangles, each with an encoding-dependent payload.
    fn frame_update(
        &self,
        cursor: &mut PeekCursor<'_>,
        region: &mut Rect,
    ) -> Result<Frame, FrameError> {
        // Message type and padding byte.
        if cursor.skip(2).is_none() {
            return Ok(Frame::Incomplete);
        }
        let Some(rect_count) = cursor.read_u16() else {
            return Ok(Frame::Incomplete);
        };

        let bytes_per_pixel = self.pixel_format.bytes_per_pixel();
        let mut updated = Rect::empty();

        for _ in 0..rect_count {
            let Some(header) = RectangleHeader::parse(cursor) else {
                return Ok(Frame::Incomplete);
            };

            // The remaining declared rectangles are not on the wire.
            if header.encoding == ENCODING_LAST_RECT {
                break;
            }

            match encodings::rect_payload(cursor, &header, bytes_per_pixel)? {
                Frame::Complete => {}
                Frame::Incomplete => return Ok(Frame::Incomplete),
            }

            if !header.is_pseudo() && header.rect().fits_within(self.width, self.height) {
                updated = updated.union(&header.rect());
            }
        }

        *region = updated;
        Ok(Frame::Complete)
    }

    //
    // Client-to-server requests
    //

    /// Ask the server to deliver pixels in `format`.
    pub fn set_pixel_format(&mut self, format: &PixelFormat) -> bool {
        self.send(
            &SetPixelFormat {
                pixel_format: format.clone(),
            }
            .encode(),
        )
    }

    /// Declare the encodings this client accepts, in preference order.
    ///
    /// Lists longer than [`MAX_ENCODINGS`](crate::messages::MAX_ENCODINGS)
    /// are rejected without touching the wire.
    pub fn set_encodings(&mut self, encodings: &[i32]) -> bool {
        let message = SetEncodings {
            encodings: encodings.to_vec(),
        };
        match message.encode() {
            Some(bytes) => self.send(&bytes),
            None => {
                warn!(count = encodings.len(), "encoding list exceeds the limit");
                false
            }
        }
    }

    /// Request a full-screen framebuffer update.
    pub fn request_framebuffer_update(&mut self, incremental: bool) -> bool {
        let request = FramebufferUpdateRequest {
            incremental,
            region: Rect::new(0, 0, self.width, self.height),
        };
        self.send(&request.encode())
    }

    //
    // Failure and send plumbing
    //

    /// Log the violation, close the connection, report failure.
    fn fail(&mut self, error: FrameError) -> bool {
        warn!(%error, state = %self.state, "protocol violation, closing connection");
        self.source.close();
        false
    }

    /// Write a complete message; anything short of a full send is fatal.
    fn send(&mut self, data: &[u8]) -> bool {
        match self.source.write(data) {
            Ok(n) if n == data.len() => true,
            _ => self.fail(FrameError::ShortWrite),
        }
    }
}

/// Parse `RFB ddd.ddd\n` into (major, minor); `None` on any deviation.
fn parse_version_line(line: &[u8; VERSION_LINE_SIZE]) -> Option<(u32, u32)> {
    if &line[0..4] != b"RFB " || line[7] != b'.' || line[11] != b'\n' {
        return None;
    }

    let digits = |bytes: &[u8]| -> Option<u32> {
        let mut value = 0u32;
        for &b in bytes {
            if !b.is_ascii_digit() {
                return None;
            }
            value = value * 10 + u32::from(b - b'0');
        }
        Some(value)
    };

    Some((digits(&line[4..7])?, digits(&line[8..11])?))
}

/// SetColourMapEntries: fixed header plus six bytes per colour.
fn frame_colour_map(cursor: &mut PeekCursor<'_>) -> Result<Frame, FrameError> {
    // Type, padding, first-colour index.
    if cursor.skip(4).is_none() {
        return Ok(Frame::Incomplete);
    }
    let Some(n_colours) = cursor.read_u16() else {
        return Ok(Frame::Incomplete);
    };

    let payload = usize::from(n_colours) * 6;
    if COLOUR_MAP_HEADER_SIZE + payload > MAX_MESSAGE_SIZE {
        return Err(FrameError::MessageTooLarge(COLOUR_MAP_HEADER_SIZE + payload));
    }

    Ok(match cursor.skip(payload) {
        Some(()) => Frame::Complete,
        None => Frame::Incomplete,
    })
}

/// ServerCutText: fixed header plus the announced text length.
fn frame_cut_text(cursor: &mut PeekCursor<'_>) -> Result<Frame, FrameError> {
    // Type and three padding bytes.
    if cursor.skip(4).is_none() {
        return Ok(Frame::Incomplete);
    }
    let Some(length) = cursor.read_u32() else {
        return Ok(Frame::Incomplete);
    };

    let total = CUT_TEXT_HEADER_SIZE + length as usize;
    if total > MAX_MESSAGE_SIZE {
        return Err(FrameError::MessageTooLarge(total));
    }

    Ok(match cursor.skip(length as usize) {
        Some(()) => Frame::Complete,
        None => Frame::Incomplete,
    })
}

/// Fixed-size message: the tag byte determines the whole length.
fn frame_fixed(cursor: &mut PeekCursor<'_>, size: usize) -> Result<Frame, FrameError> {
    Ok(match cursor.skip(size) {
        Some(()) => Frame::Complete,
        None => Frame::Incomplete,
    })
}
