//! Connection layer for the RFB client engine.
//!
//! This crate owns what the protocol core deliberately does not: sockets,
//! waiting, and configuration. It pumps a tokio TCP stream into the
//! [`rfb_protocol::ClientProtocol`] engine and surfaces each framed server
//! message as a [`ServerEvent`].
//!
//! # Quick start
//!
//! ```no_run
//! use rfb_client::{Config, ServerEvent, ViewerClient};
//!
//! # async fn example() -> Result<(), rfb_client::ClientError> {
//! let mut client = ViewerClient::connect(Config::for_host("lab-12")).await?;
//! client.handshake().await?;
//!
//! loop {
//!     match client.next_event().await? {
//!         ServerEvent::FramebufferUpdated { region, .. } => {
//!             println!("screen changed: {region:?}");
//!             client.request_update(true)?;
//!         }
//!         ServerEvent::Bell => println!("bell"),
//!         _ => {}
//!     }
//! }
//! # }
//! ```

pub mod client;
pub mod config;
pub mod errors;
pub mod transport;

pub use client::{ServerEvent, ViewerClient};
pub use config::{Config, ConnectionConfig, DisplayConfig};
pub use errors::ClientError;
pub use transport::TcpSource;
