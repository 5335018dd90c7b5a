//! Headless viewer example - connect, frame messages, log what arrives.
//!
//! Usage:
//!   cargo run --example headless -- host[:port] [password]

use rfb_client::{Config, ServerEvent, ViewerClient};
use std::env;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let mut args = env::args().skip(1);
    let target = args.next().unwrap_or_else(|| String::from("localhost"));
    let password = args.next();

    let (host, port) = match target.split_once(':') {
        Some((host, port)) => (host.to_string(), port.parse()?),
        None => (target, 5900),
    };

    let mut config = Config::for_host(host);
    config.connection.port = port;
    config.connection.password = password;

    let mut client = ViewerClient::connect(config).await?;
    client.handshake().await?;

    let (width, height) = client.framebuffer_size();
    info!(width, height, name = client.desktop_name(), "session up");

    loop {
        match client.next_event().await? {
            ServerEvent::FramebufferUpdated { region, message } => {
                info!(?region, bytes = message.len(), "framebuffer update");
                client.request_update(true)?;
            }
            ServerEvent::Bell => info!("bell"),
            ServerEvent::CutText { message } => {
                info!(bytes = message.len() - 8, "server cut text");
            }
            ServerEvent::Resized { width, height } => {
                info!(width, height, "framebuffer resized");
            }
            ServerEvent::ColourMap { message } => {
                info!(bytes = message.len(), "colour map entries");
            }
            ServerEvent::Xvp { message } => {
                info!(bytes = message.len(), "xvp message");
            }
        }
    }
}
