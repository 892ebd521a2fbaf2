//! Stream record and state types
//!
//! This module defines the per-credential record stored in the registry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::key::StreamKey;
use super::timestamp;

/// Publishing state of a stream record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamState {
    /// No encoder is publishing under the key (initial state)
    Offline,
    /// The ingest server reported an active publisher
    Live,
}

/// One issued stream key and its status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamRecord {
    /// Registry-assigned id, never reused
    pub id: u64,

    /// Operator-supplied display name
    pub name: String,

    /// Operator-supplied description
    #[serde(default)]
    pub description: String,

    /// The credential itself
    pub stream_key: StreamKey,

    /// When the key was issued
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub created_at: DateTime<Utc>,

    /// `created_at + ttl`
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub expires_at: DateTime<Utc>,

    /// Whether the ingest server currently reports a publisher
    #[serde(default)]
    pub is_active: bool,

    /// Last time the stream went live
    #[serde(default, deserialize_with = "timestamp::deserialize_option")]
    pub last_used: Option<DateTime<Utc>>,
}

impl StreamRecord {
    pub(crate) fn new(
        id: u64,
        name: String,
        description: String,
        stream_key: StreamKey,
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name,
            description,
            stream_key,
            created_at: now,
            expires_at,
            is_active: false,
            last_used: None,
        }
    }

    /// Current state derived from the active flag
    pub fn state(&self) -> StreamState {
        if self.is_active {
            StreamState::Live
        } else {
            StreamState::Offline
        }
    }

    /// Whether the key is past its expiry at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Whether the key is past its expiry
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

/// A live record joined with the time it went live
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveStream {
    pub since: DateTime<Utc>,
    #[serde(flatten)]
    pub record: StreamRecord,
}
