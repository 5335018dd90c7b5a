//! Connection driver: handshake and steady-state event delivery.
//!
//! [`ViewerClient`] owns the protocol engine and its TCP transport and
//! turns the engine's pull-based framing into awaitable events. The drive
//! loop is exactly the engine's contract: call `read()` until it reports no
//! progress, then wait for socket readiness, pump bytes, repeat. All
//! waiting happens here - the engine itself never blocks.

use crate::config::Config;
use crate::errors::ClientError;
use crate::transport::TcpSource;
use bytes::Bytes;
use rfb_common::Rect;
use rfb_protocol::messages::types::{
    MSG_BELL, MSG_FRAMEBUFFER_UPDATE, MSG_RESIZE_FRAMEBUFFER, MSG_SERVER_CUT_TEXT,
    MSG_SET_COLOUR_MAP_ENTRIES, MSG_XVP,
};
use rfb_protocol::{ByteSource, ClientProtocol, PixelFormat};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info};

/// One framed server message, with its envelope data decoded.
///
/// Message payloads stay raw: rendering and clipboard handling live in the
/// application, this layer only frames and labels.
#[derive(Debug)]
pub enum ServerEvent {
    /// Screen content changed; `region` bounds the affected area.
    FramebufferUpdated { region: Rect, message: Bytes },
    /// The server rang its bell.
    Bell,
    /// Clipboard text from the server (raw message bytes).
    CutText { message: Bytes },
    /// Palette update (raw message bytes).
    ColourMap { message: Bytes },
    /// The framebuffer changed size.
    Resized { width: u16, height: u16 },
    /// Xvp extension notification (raw message bytes).
    Xvp { message: Bytes },
}

/// A connected viewer session.
#[derive(Debug)]
pub struct ViewerClient {
    engine: ClientProtocol<TcpSource>,
    config: Config,
}

impl ViewerClient {
    /// Open the TCP connection described by `config`.
    pub async fn connect(config: Config) -> Result<Self, ClientError> {
        let deadline = Duration::from_millis(config.connection.timeout_ms);
        let source = timeout(
            deadline,
            TcpSource::connect(&config.connection.host, config.connection.port),
        )
        .await
        .map_err(|_| ClientError::Timeout(deadline))?
        .map_err(|e| ClientError::ConnectionFailed(e.to_string()))?;

        info!(peer = %source.peer_endpoint(), "connected");

        let engine = ClientProtocol::new(source, config.password_bytes());
        Ok(Self { engine, config })
    }

    /// Drive the handshake to completion, then announce our encodings and
    /// request the first full-screen update.
    pub async fn handshake(&mut self) -> Result<(), ClientError> {
        while !self.engine.is_running() {
            if self.engine.read() {
                continue;
            }
            if self.engine.source_mut().is_closed() {
                return Err(ClientError::Handshake(
                    "server rejected the session".into(),
                ));
            }
            self.pump().await?;
        }

        let (width, height) = self.engine.framebuffer_size();
        info!(
            width,
            height,
            name = %self.engine.desktop_name(),
            "session established"
        );

        if !self.engine.set_encodings(&self.config.display.encodings) {
            return Err(ClientError::ConnectionClosed);
        }
        if !self.engine.request_framebuffer_update(false) {
            return Err(ClientError::ConnectionClosed);
        }

        Ok(())
    }

    /// Wait for and frame the next server message.
    pub async fn next_event(&mut self) -> Result<ServerEvent, ClientError> {
        loop {
            if self.engine.read() {
                return self.event_from_last();
            }
            if self.engine.source_mut().is_closed() {
                return Err(ClientError::ConnectionClosed);
            }
            self.pump().await?;
        }
    }

    /// Poll the server for further screen changes.
    pub fn request_update(&mut self, incremental: bool) -> Result<(), ClientError> {
        if self.engine.request_framebuffer_update(incremental) {
            Ok(())
        } else {
            Err(ClientError::ConnectionClosed)
        }
    }

    /// Current framebuffer geometry.
    pub fn framebuffer_size(&self) -> (u16, u16) {
        self.engine.framebuffer_size()
    }

    /// Desktop name from the server-init message.
    pub fn desktop_name(&self) -> &str {
        self.engine.desktop_name()
    }

    /// Pixel format from the server-init message.
    pub fn pixel_format(&self) -> &PixelFormat {
        self.engine.pixel_format()
    }

    /// Wait for readiness and move socket bytes into the engine's buffer.
    async fn pump(&mut self) -> Result<(), ClientError> {
        self.engine.source_mut().readable().await?;
        let pulled = self.engine.source_mut().fill()?;
        if pulled > 0 {
            debug!(bytes = pulled, "buffered inbound data");
        }
        Ok(())
    }

    /// Label the message the engine just framed.
    fn event_from_last(&mut self) -> Result<ServerEvent, ClientError> {
        let region = self.engine.updated_region();
        let message = self.engine.take_last_message();

        match message.first().copied() {
            Some(MSG_FRAMEBUFFER_UPDATE) => Ok(ServerEvent::FramebufferUpdated { region, message }),
            Some(MSG_BELL) => Ok(ServerEvent::Bell),
            Some(MSG_SERVER_CUT_TEXT) => Ok(ServerEvent::CutText { message }),
            Some(MSG_SET_COLOUR_MAP_ENTRIES) => Ok(ServerEvent::ColourMap { message }),
            Some(MSG_RESIZE_FRAMEBUFFER) => {
                let (width, height) = self.engine.framebuffer_size();
                Ok(ServerEvent::Resized { width, height })
            }
            Some(MSG_XVP) => Ok(ServerEvent::Xvp { message }),
            other => Err(ClientError::Protocol(format!(
                "unexpected framed message tag {other:?}"
            ))),
        }
    }
}
