//! Viewer client driven against an in-process scripted VNC server.

use bytes::{BufMut, BytesMut};
use rfb_client::{ClientError, Config, ServerEvent, ViewerClient};
use rfb_common::Rect;
use rfb_protocol::messages::types::{ENCODING_RAW, MSG_FRAMEBUFFER_UPDATE, MSG_SERVER_CUT_TEXT};
use rfb_protocol::PixelFormat;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Everything the scripted server sends after accepting, in one buffer.
fn server_script() -> Vec<u8> {
    let mut buf = BytesMut::new();

    // Security-type list (None only) and a successful result.
    buf.put_slice(&[1, 1]);
    buf.put_u32(0);

    // Server init: 320x240, default pixel format.
    buf.put_u16(320);
    buf.put_u16(240);
    PixelFormat::default().write_wire(&mut buf);
    let name = b"it-lab";
    buf.put_u32(name.len() as u32);
    buf.put_slice(name);

    // Bell.
    buf.put_u8(2);

    // One raw rectangle at (1,2) sized 3x4.
    buf.put_u8(MSG_FRAMEBUFFER_UPDATE);
    buf.put_u8(0);
    buf.put_u16(1);
    buf.put_u16(1);
    buf.put_u16(2);
    buf.put_u16(3);
    buf.put_u16(4);
    buf.put_i32(ENCODING_RAW);
    buf.put_bytes(0xAB, 3 * 4 * 4);

    // Clipboard text.
    buf.put_u8(MSG_SERVER_CUT_TEXT);
    buf.put_bytes(0, 3);
    buf.put_u32(2);
    buf.put_slice(b"hi");

    buf.to_vec()
}

#[tokio::test]
async fn session_against_scripted_server() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();

        socket.write_all(b"RFB 003.008\n").await.unwrap();
        let mut echo = [0u8; 12];
        socket.read_exact(&mut echo).await.unwrap();
        assert_eq!(&echo, b"RFB 003.008\n");

        socket.write_all(&server_script()).await.unwrap();

        // Absorb the client's requests until it hangs up.
        let mut sink = [0u8; 256];
        while socket.read(&mut sink).await.unwrap_or(0) > 0 {}
    });

    let mut config = Config::for_host("127.0.0.1");
    config.connection.port = port;

    let mut client = ViewerClient::connect(config).await.unwrap();
    client.handshake().await.unwrap();

    assert_eq!(client.framebuffer_size(), (320, 240));
    assert_eq!(client.desktop_name(), "it-lab");
    assert_eq!(client.pixel_format().bits_per_pixel, 32);

    match client.next_event().await.unwrap() {
        ServerEvent::Bell => {}
        other => panic!("expected bell, got {other:?}"),
    }

    match client.next_event().await.unwrap() {
        ServerEvent::FramebufferUpdated { region, message } => {
            assert_eq!(region, Rect::new(1, 2, 3, 4));
            assert_eq!(message.len(), 4 + 12 + 3 * 4 * 4);
        }
        other => panic!("expected framebuffer update, got {other:?}"),
    }

    match client.next_event().await.unwrap() {
        ServerEvent::CutText { message } => {
            assert_eq!(&message[8..], b"hi");
        }
        other => panic!("expected cut text, got {other:?}"),
    }

    drop(client);
    server.await.unwrap();
}

#[tokio::test]
async fn handshake_fails_against_bad_version() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        socket.write_all(b"RFB 003.003\n").await.unwrap();
        // Keep the socket open; the client must reject on its own.
        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
    });

    let mut config = Config::for_host("127.0.0.1");
    config.connection.port = port;

    let mut client = ViewerClient::connect(config).await.unwrap();
    let error = client.handshake().await.unwrap_err();
    assert!(matches!(error, ClientError::Handshake(_)));
}

#[tokio::test]
async fn connect_refused_is_retryable() {
    // Bind-then-drop leaves a port with nothing listening.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let mut config = Config::for_host("127.0.0.1");
    config.connection.port = port;

    let error = ViewerClient::connect(config).await.unwrap_err();
    assert!(error.is_retryable());
}
