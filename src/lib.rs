//! Stream key registry for self-hosted RTMP ingest
//!
//! Issues time-limited stream keys, persists them as a single JSON
//! document, and keeps each key's live/offline flag in step with the
//! `on_publish` / `on_publish_done` callbacks of an nginx-rtmp style ingest
//! server.
//!
//! ```no_run
//! use std::sync::Arc;
//! use stream_keys::{JsonFileStore, NotificationServer, ServerConfig, StreamRegistry};
//!
//! # async fn run() -> stream_keys::Result<()> {
//! let registry = Arc::new(StreamRegistry::new(JsonFileStore::new("data/streams.json")));
//! let record = registry.create("Studio A", "Main camera", 24).await?;
//! println!("stream key: {}", record.stream_key);
//!
//! let server = NotificationServer::new(ServerConfig::default(), registry);
//! server.run().await
//! # }
//! ```

pub mod config;
pub mod error;
pub mod registry;
pub mod server;
pub mod stats;

pub use config::{Config, IngestConfig};
pub use error::{Error, Result};
pub use registry::{
    ExpiryPolicy, JsonFileStore, MemoryStore, RegistryConfig, RegistryError, RegistrySnapshot,
    SnapshotStore, StreamKey, StreamRecord, StreamRegistry, StreamState,
};
pub use server::{Acquisition, ListenerGuard, NotificationServer, ServerConfig};
pub use stats::RegistryStats;
