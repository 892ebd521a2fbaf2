//! Registry snapshot
//!
//! The snapshot is the unit of persistence: every record, the index of live
//! keys, and the id counter. All mutations that touch the `is_active` flag go
//! through this type so the flag and the index change together.

use std::collections::BTreeMap;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::RegistryError;
use super::key::StreamKey;
use super::record::{ActiveStream, StreamRecord};
use super::timestamp;

/// Full persisted registry document
///
/// `streams` and `active_streams` are required and unknown fields are
/// rejected, so a document of the wrong shape fails to load instead of
/// reading as an empty registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistrySnapshot {
    /// Records in creation order
    pub streams: Vec<StreamRecord>,

    /// Live keys and the time each went live
    #[serde(deserialize_with = "timestamp::deserialize_map")]
    pub active_streams: BTreeMap<StreamKey, DateTime<Utc>>,

    /// Next id to hand out (0 = derive from existing records)
    #[serde(default)]
    pub next_id: u64,
}

impl RegistrySnapshot {
    /// Create an empty snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a snapshot from its JSON document
    pub fn from_slice(data: &[u8]) -> Result<Self, RegistryError> {
        Ok(serde_json::from_slice(data)?)
    }

    /// Encode the snapshot as a pretty-printed JSON document
    pub fn to_bytes(&self) -> Result<Bytes, RegistryError> {
        Ok(Bytes::from(serde_json::to_vec_pretty(self)?))
    }

    /// Reserve the next record id
    ///
    /// Ids are monotonic across deletions. Documents written before the
    /// counter existed resume after the highest id present.
    pub fn allocate_id(&mut self) -> u64 {
        let floor = self.streams.iter().map(|s| s.id).max().unwrap_or(0) + 1;
        let id = self.next_id.max(floor);
        self.next_id = id + 1;
        id
    }

    /// Find a record by stream key
    pub fn find(&self, key: &StreamKey) -> Option<&StreamRecord> {
        self.streams.iter().find(|s| &s.stream_key == key)
    }

    /// Find a record by id
    pub fn find_by_id(&self, id: u64) -> Option<&StreamRecord> {
        self.streams.iter().find(|s| s.id == id)
    }

    pub(crate) fn push(&mut self, record: StreamRecord) {
        self.streams.push(record);
    }

    /// Apply a status transition to the record holding `key`
    ///
    /// Going live stamps `last_used` and (re)inserts the index entry;
    /// going offline drops the index entry if present. Returns the updated
    /// record, or `None` when no record matches (nothing is changed).
    pub fn set_active(
        &mut self,
        key: &StreamKey,
        active: bool,
        now: DateTime<Utc>,
    ) -> Option<StreamRecord> {
        let record = self.streams.iter_mut().find(|s| &s.stream_key == key)?;

        record.is_active = active;
        if active {
            record.last_used = Some(now);
            self.active_streams.insert(key.clone(), now);
        } else {
            self.active_streams.remove(key);
        }

        Some(record.clone())
    }

    /// Remove the record with `id` along with its index entry
    pub fn remove(&mut self, id: u64) -> Option<StreamRecord> {
        let pos = self.streams.iter().position(|s| s.id == id)?;
        let record = self.streams.remove(pos);
        self.active_streams.remove(&record.stream_key);
        Some(record)
    }

    /// Live records joined with their activation time
    pub fn active(&self) -> Vec<ActiveStream> {
        self.active_streams
            .iter()
            .filter_map(|(key, since)| {
                self.find(key).map(|record| ActiveStream {
                    since: *since,
                    record: record.clone(),
                })
            })
            .collect()
    }

    /// Whether the live index matches the record flags exactly
    pub fn is_consistent(&self) -> bool {
        let live = self.streams.iter().filter(|s| s.is_active).count();
        live == self.active_streams.len()
            && self
                .streams
                .iter()
                .filter(|s| s.is_active)
                .all(|s| self.active_streams.contains_key(&s.stream_key))
    }

    /// Rebuild the live index from the record flags
    ///
    /// Returns the number of entries added or removed.
    pub fn repair_active_index(&mut self) -> usize {
        let mut fixed = 0;

        let streams = &self.streams;
        let before = self.active_streams.len();
        self.active_streams
            .retain(|key, _| streams.iter().any(|s| s.is_active && &s.stream_key == key));
        fixed += before - self.active_streams.len();

        for record in self.streams.iter().filter(|s| s.is_active) {
            if !self.active_streams.contains_key(&record.stream_key) {
                let since = record.last_used.unwrap_or(record.created_at);
                self.active_streams.insert(record.stream_key.clone(), since);
                fixed += 1;
            }
        }

        fixed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn snapshot_with(keys: &[&str]) -> RegistrySnapshot {
        let mut snapshot = RegistrySnapshot::new();
        let now = Utc::now();
        for key in keys {
            let id = snapshot.allocate_id();
            snapshot.push(StreamRecord::new(
                id,
                format!("stream {id}"),
                String::new(),
                StreamKey::new(*key),
                now,
                now + Duration::hours(1),
            ));
        }
        snapshot
    }

    #[test]
    fn test_ids_start_at_one() {
        let mut snapshot = RegistrySnapshot::new();
        assert_eq!(snapshot.allocate_id(), 1);
        assert_eq!(snapshot.allocate_id(), 2);
    }

    #[test]
    fn test_ids_not_reused_after_delete() {
        let mut snapshot = snapshot_with(&["a", "b", "c"]);
        snapshot.remove(3).unwrap();
        snapshot.remove(1).unwrap();

        assert_eq!(snapshot.allocate_id(), 4);
    }

    #[test]
    fn test_id_counter_derived_for_legacy_documents() {
        let mut snapshot = snapshot_with(&["a", "b"]);
        snapshot.next_id = 0;

        assert_eq!(snapshot.allocate_id(), 3);
    }

    #[test]
    fn test_set_active_round_trip() {
        let mut snapshot = snapshot_with(&["a", "b"]);
        let key = StreamKey::new("a");
        let t1 = Utc::now();

        let record = snapshot.set_active(&key, true, t1).unwrap();
        assert!(record.is_active);
        assert_eq!(record.last_used, Some(t1));
        assert_eq!(snapshot.active_streams.get(&key), Some(&t1));
        assert!(snapshot.is_consistent());

        let t2 = t1 + Duration::seconds(5);
        let record = snapshot.set_active(&key, false, t2).unwrap();
        assert!(!record.is_active);
        assert_eq!(record.last_used, Some(t1));
        assert!(snapshot.active_streams.is_empty());
        assert!(snapshot.is_consistent());
    }

    #[test]
    fn test_set_active_twice_keeps_one_entry() {
        let mut snapshot = snapshot_with(&["a"]);
        let key = StreamKey::new("a");
        let t1 = Utc::now();
        let t2 = t1 + Duration::seconds(1);

        snapshot.set_active(&key, true, t1);
        let record = snapshot.set_active(&key, true, t2).unwrap();

        assert_eq!(snapshot.active_streams.len(), 1);
        assert_eq!(record.last_used, Some(t2));
    }

    #[test]
    fn test_set_inactive_when_offline_is_noop() {
        let mut snapshot = snapshot_with(&["a"]);
        let before = snapshot.clone();

        snapshot.set_active(&StreamKey::new("a"), false, Utc::now());

        assert_eq!(snapshot, before);
    }

    #[test]
    fn test_set_active_unknown_key() {
        let mut snapshot = snapshot_with(&["a"]);
        let before = snapshot.clone();

        assert!(snapshot
            .set_active(&StreamKey::new("zzz"), true, Utc::now())
            .is_none());
        assert_eq!(snapshot, before);
    }

    #[test]
    fn test_remove_live_record_clears_index() {
        let mut snapshot = snapshot_with(&["a", "b"]);
        snapshot.set_active(&StreamKey::new("b"), true, Utc::now());

        let removed = snapshot.remove(2).unwrap();

        assert_eq!(removed.stream_key, StreamKey::new("b"));
        assert_eq!(snapshot.streams.len(), 1);
        assert!(snapshot.active_streams.is_empty());
        assert!(snapshot.remove(2).is_none());
    }

    #[test]
    fn test_active_join() {
        let mut snapshot = snapshot_with(&["a", "b", "c"]);
        let now = Utc::now();
        snapshot.set_active(&StreamKey::new("c"), true, now);

        let active = snapshot.active();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].record.id, 3);
        assert_eq!(active[0].since, now);
    }

    #[test]
    fn test_repair_active_index() {
        let mut snapshot = snapshot_with(&["a", "b"]);
        snapshot.streams[0].is_active = true;
        snapshot
            .active_streams
            .insert(StreamKey::new("gone"), Utc::now());
        snapshot
            .active_streams
            .insert(StreamKey::new("b"), Utc::now());
        assert!(!snapshot.is_consistent());

        assert_eq!(snapshot.repair_active_index(), 3);
        assert!(snapshot.is_consistent());
        assert_eq!(snapshot.active_streams.len(), 1);
        assert!(snapshot.active_streams.contains_key(&StreamKey::new("a")));
    }

    #[test]
    fn test_document_layout() {
        let mut snapshot = snapshot_with(&["a"]);
        snapshot.set_active(&StreamKey::new("a"), true, Utc::now());

        let bytes = snapshot.to_bytes().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(value["streams"][0]["stream_key"], "a");
        assert!(value["active_streams"]["a"].is_string());
        assert_eq!(value["next_id"], 2);
        assert_eq!(RegistrySnapshot::from_slice(&bytes).unwrap(), snapshot);
    }

    #[test]
    fn test_decode_legacy_document() {
        let json = br#"{"streams": [], "active_streams": {}}"#;
        let snapshot = RegistrySnapshot::from_slice(json).unwrap();
        assert_eq!(snapshot, RegistrySnapshot::new());

        assert!(RegistrySnapshot::from_slice(b"not json").is_err());
    }

    #[test]
    fn test_decode_naive_timestamps() {
        let json = br#"{
            "streams": [{
                "id": 1,
                "name": "Studio A",
                "description": "",
                "stream_key": "a",
                "created_at": "2024-05-01T10:00:00.123456",
                "expires_at": "2024-05-02T10:00:00.123456",
                "is_active": true,
                "last_used": "2024-05-01T11:30:00.5"
            }],
            "active_streams": {"a": "2024-05-01T11:30:00.5"}
        }"#;
        let snapshot = RegistrySnapshot::from_slice(json).unwrap();

        let record = &snapshot.streams[0];
        assert_eq!(record.expires_at - record.created_at, Duration::hours(24));
        assert_eq!(
            snapshot.active_streams.get(&StreamKey::new("a")).copied(),
            record.last_used
        );
        assert!(snapshot.is_consistent());
    }

    #[test]
    fn test_decode_rejects_wrong_shape() {
        let docs: [&[u8]; 6] = [
            b"{}",
            br#"{"streams": []}"#,
            br#"{"stream": [], "active_streams": {}}"#,
            br#"{"streams": [], "active_streams": {}, "extra": 1}"#,
            b"[]",
            b"null",
        ];
        for doc in docs {
            let err = RegistrySnapshot::from_slice(doc).unwrap_err();
            assert!(matches!(err, RegistryError::Storage(_)), "{err}");
        }
    }
}
