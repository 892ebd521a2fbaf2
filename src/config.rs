//! Application configuration
//!
//! Loaded from a TOML file; every section and field is optional.
//!
//! ```toml
//! [server]
//! bind_addr = "0.0.0.0:8000"
//!
//! [registry]
//! data_path = "/app/data/streams.json"
//! expiry = "enforce"
//!
//! [ingest]
//! app = "live"
//! hls_port = 8088
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::registry::{RegistryConfig, StreamKey};
use crate::server::ServerConfig;

/// Where encoders publish to and viewers play from
///
/// Only used to print URLs for newly issued keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// RTMP application name
    pub app: String,

    /// RTMP port, omitted from URLs when it is the standard 1935
    pub rtmp_port: u16,

    /// Port of the HLS playback server
    pub hls_port: u16,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            app: "live".to_string(),
            rtmp_port: 1935,
            hls_port: 8088,
        }
    }
}

impl IngestConfig {
    /// URL an encoder (OBS, vMix, ffmpeg) publishes to
    pub fn publish_url(&self, host: &str, key: &StreamKey) -> String {
        if self.rtmp_port == 1935 {
            format!("rtmp://{}/{}/{}", host, self.app, key)
        } else {
            format!("rtmp://{}:{}/{}/{}", host, self.rtmp_port, self.app, key)
        }
    }

    /// HLS playlist URL for viewers
    pub fn playback_url(&self, host: &str, key: &StreamKey) -> String {
        format!("http://{}:{}/hls/{}.m3u8", host, self.hls_port, key)
    }
}

/// Top-level configuration file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub registry: RegistryConfig,
    pub ingest: IngestConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.registry.validate()?;
        Ok(config)
    }

    /// Load configuration from `path` if it exists, defaults otherwise
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::info!(path = %path.display(), "No config file found, using defaults");
            Ok(Self::default())
        }
    }
}
