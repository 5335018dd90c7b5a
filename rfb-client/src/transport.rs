//! TCP transport backing the protocol engine.
//!
//! [`TcpSource`] adapts a tokio [`TcpStream`] to the engine's
//! [`ByteSource`] seam. Inbound bytes are pumped into an internal buffer
//! with non-blocking reads whenever the socket signals readiness; the
//! engine then peeks and consumes from that buffer at its own pace.
//! Outbound messages go straight to the socket - the engine's requests are
//! small, and a send the kernel will not accept whole is treated as fatal
//! upstream.

use bytes::{Bytes, BytesMut};
use rfb_protocol::ByteSource;
use std::io;
use tokio::net::TcpStream;
use tracing::debug;

/// A connected VNC server socket plus its inbound buffer.
#[derive(Debug)]
pub struct TcpSource {
    stream: TcpStream,
    inbound: BytesMut,
    closed: bool,
}

impl TcpSource {
    /// Connect to `host:port`.
    pub async fn connect(host: &str, port: u16) -> io::Result<Self> {
        let stream = TcpStream::connect((host, port)).await?;
        stream.set_nodelay(true)?;
        debug!(host, port, "connected");

        Ok(Self {
            stream,
            inbound: BytesMut::with_capacity(16 * 1024),
            closed: false,
        })
    }

    /// Peer endpoint for logging.
    pub fn peer_endpoint(&self) -> String {
        self.stream
            .peer_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|_| String::from("<disconnected>"))
    }

    /// Wait until the socket may have data to read.
    pub async fn readable(&self) -> io::Result<()> {
        self.stream.readable().await
    }

    /// Drain whatever the socket has ready into the inbound buffer.
    ///
    /// Returns the number of bytes pulled in. Returns `Ok(0)` and marks the
    /// source closed when the peer has shut the connection down.
    pub fn fill(&mut self) -> io::Result<usize> {
        if self.closed {
            return Ok(0);
        }

        let mut total = 0;
        loop {
            match self.stream.try_read_buf(&mut self.inbound) {
                Ok(0) => {
                    debug!("peer closed the connection");
                    self.closed = true;
                    break;
                }
                Ok(n) => total += n,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => {
                    self.closed = true;
                    return Err(e);
                }
            }
        }

        Ok(total)
    }
}

impl ByteSource for TcpSource {
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

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        if self.closed {
            return Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "connection closed",
            ));
        }

        let mut written = 0;
        while written < data.len() {
            match self.stream.try_write(&data[written..]) {
                Ok(n) => written += n,
                // Report the short write; the engine treats it as fatal.
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => {
                    self.closed = true;
                    return Err(e);
                }
            }
        }

        Ok(written)
    }

    fn close(&mut self) {
        self.closed = true;
        self.inbound.clear();
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_fill_buffers_inbound_bytes() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket.write_all(b"RFB 003.008\n").await.unwrap();
            socket
        });

        let mut source = TcpSource::connect("127.0.0.1", port).await.unwrap();
        let _server_socket = server.await.unwrap();

        while source.bytes_available() < 12 {
            source.readable().await.unwrap();
            source.fill().unwrap();
        }

        assert_eq!(source.peek(4), b"RFB ");
        assert_eq!(&source.read(12)[..], b"RFB 003.008\n");
        assert_eq!(source.bytes_available(), 0);
    }

    #[tokio::test]
    async fn test_peer_shutdown_marks_closed() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            drop(socket);
        });

        let mut source = TcpSource::connect("127.0.0.1", port).await.unwrap();
        server.await.unwrap();

        loop {
            source.readable().await.unwrap();
            source.fill().unwrap();
            if source.is_closed() {
                break;
            }
        }
    }

    #[tokio::test]
    async fn test_close_discards_buffered_bytes() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(std::time::Duration::from_secs(5)).await;
        });

        let mut source = TcpSource::connect("127.0.0.1", port).await.unwrap();
        source.inbound.extend_from_slice(b"stale");
        source.close();

        assert!(source.is_closed());
        assert_eq!(source.bytes_available(), 0);
        assert!(source.write(b"x").is_err());
    }
}
