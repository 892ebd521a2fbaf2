//! Aggregate counts over the registry

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::registry::RegistrySnapshot;

/// Registry-wide statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    /// Issued keys
    pub total_streams: usize,
    /// Keys with a publisher right now
    pub active_streams: usize,
    /// Keys past their expiry
    pub expired_streams: usize,
}

impl RegistryStats {
    /// Compute statistics for `snapshot` as of `now`
    pub fn from_snapshot(snapshot: &RegistrySnapshot, now: DateTime<Utc>) -> Self {
        Self {
            total_streams: snapshot.streams.len(),
            active_streams: snapshot.active_streams.len(),
            expired_streams: snapshot
                .streams
                .iter()
                .filter(|s| s.is_expired_at(now))
                .count(),
        }
    }
}
