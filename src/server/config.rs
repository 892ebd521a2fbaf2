//! Server configuration

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

/// Callback listener configuration options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the ingest server posts callbacks to
    pub bind_addr: SocketAddr,

    /// Largest callback body accepted, in bytes
    pub max_body_size: usize,

    /// Probe the port first and stand down if another instance holds it
    pub single_instance: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            max_body_size: 16 * 1024, // 16KB, callbacks are a handful of form fields
            single_instance: true,
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set the maximum callback body size
    pub fn max_body_size(mut self, size: usize) -> Self {
        self.max_body_size = size;
        self
    }

    /// Skip the duplicate-instance probe
    pub fn allow_multiple_instances(mut self) -> Self {
        self.single_instance = false;
        self
    }
}
