//! Configuration types for the viewer client.

use crate::errors::ClientError;
use rfb_protocol::messages::types::{
    ENCODING_COPY_RECT, ENCODING_CORRE, ENCODING_HEXTILE, ENCODING_LAST_RECT,
    ENCODING_NEW_FB_SIZE, ENCODING_POINTER_POS, ENCODING_RAW, ENCODING_RICH_CURSOR, ENCODING_RRE,
    ENCODING_ZRLE,
};
use serde::{Deserialize, Serialize};

/// Complete client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Connection settings.
    pub connection: ConnectionConfig,
    /// Display/framing settings.
    #[serde(default)]
    pub display: DisplayConfig,
}

/// Connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Server hostname or IP address.
    pub host: String,
    /// Server port (typically 5900 + display number).
    #[serde(default = "default_port")]
    pub port: u16,
    /// VNC password, if the server requires authentication.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Connection timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_port() -> u16 {
    5900
}

fn default_timeout_ms() -> u64 {
    10_000
}

/// Display configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Encodings to advertise, in preference order.
    #[serde(default = "default_encodings")]
    pub encodings: Vec<i32>,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            encodings: default_encodings(),
        }
    }
}

fn default_encodings() -> Vec<i32> {
    vec![
        ENCODING_ZRLE,
        ENCODING_HEXTILE,
        ENCODING_CORRE,
        ENCODING_RRE,
        ENCODING_COPY_RECT,
        ENCODING_RAW,
        ENCODING_LAST_RECT,
        ENCODING_NEW_FB_SIZE,
        ENCODING_POINTER_POS,
        ENCODING_RICH_CURSOR,
    ]
}

impl Config {
    /// Minimal configuration for a host with default port and no password.
    pub fn for_host(host: impl Into<String>) -> Self {
        Self {
            connection: ConnectionConfig {
                host: host.into(),
                port: default_port(),
                password: None,
                timeout_ms: default_timeout_ms(),
            },
            display: DisplayConfig::default(),
        }
    }

    /// Parse a TOML configuration document.
    pub fn from_toml(text: &str) -> Result<Self, ClientError> {
        toml::from_str(text).map_err(|e| ClientError::Config(e.to_string()))
    }

    /// Password as bytes for the challenge step; empty when unset.
    pub fn password_bytes(&self) -> &[u8] {
        self.connection
            .password
            .as_deref()
            .map(str::as_bytes)
            .unwrap_or_default()
    }
}
