//! Stream key registry
//!
//! The registry issues stream keys and tracks whether the ingest server
//! currently has a publisher on each of them.
//!
//! # Architecture
//!
//! ```text
//!                       Arc<StreamRegistry<S>>
//!                   ┌──────────────────────────┐
//!   create/delete ─►│ lock: Mutex<()>          │◄─ set_active (callbacks)
//!                   │   load ─► mutate ─► save │
//!                   └────────────┬─────────────┘
//!                                │
//!                                ▼
//!                       S: SnapshotStore
//!                   ┌──────────────────────────┐
//!                   │ streams: [StreamRecord]  │
//!                   │ active_streams: {key: t} │
//!                   │ next_id                  │
//!                   └──────────────────────────┘
//! ```
//!
//! # Consistency
//!
//! `active_streams` holds exactly the keys whose record has `is_active`
//! set. Only [`RegistrySnapshot::set_active`] and
//! [`RegistrySnapshot::remove`] change either side, and the service saves
//! the whole snapshot under its lock, so the two never drift apart on disk.

pub mod config;
pub mod error;
pub mod key;
pub mod record;
pub mod service;
pub mod snapshot;
pub mod store;
mod timestamp;

pub use config::{ExpiryPolicy, RegistryConfig};
pub use error::RegistryError;
pub use key::{StreamKey, DEFAULT_KEY_LENGTH, MIN_KEY_LENGTH};
pub use record::{ActiveStream, StreamRecord, StreamState};
pub use service::StreamRegistry;
pub use snapshot::RegistrySnapshot;
pub use store::{JsonFileStore, MemoryStore, SnapshotStore};
