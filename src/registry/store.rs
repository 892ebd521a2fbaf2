//! Snapshot persistence
//!
//! Stores read and write the whole registry document at once. They do no
//! locking of their own; `StreamRegistry` serializes every load/save pair.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use bytes::Bytes;

use super::error::RegistryError;
use super::snapshot::RegistrySnapshot;

/// Whole-document storage for a registry snapshot
pub trait SnapshotStore: Send + Sync + 'static {
    /// Read the current snapshot (empty if nothing was saved yet)
    fn load(&self) -> impl Future<Output = Result<RegistrySnapshot, RegistryError>> + Send;

    /// Replace the persisted snapshot
    fn save(
        &self,
        snapshot: &RegistrySnapshot,
    ) -> impl Future<Output = Result<(), RegistryError>> + Send;
}

fn decode(data: &[u8], source: &str) -> Result<RegistrySnapshot, RegistryError> {
    let mut snapshot = RegistrySnapshot::from_slice(data)?;

    if !snapshot.is_consistent() {
        let fixed = snapshot.repair_active_index();
        tracing::warn!(
            source = source,
            fixed = fixed,
            "Active index disagreed with stream flags, rebuilt from flags"
        );
    }

    Ok(snapshot)
}

/// JSON document on the local filesystem
///
/// Saves write a sibling temp file and rename it over the document, so a
/// crash mid-write leaves the previous version intact.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl SnapshotStore for JsonFileStore {
    async fn load(&self) -> Result<RegistrySnapshot, RegistryError> {
        let data = match tokio::fs::read(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "No registry document yet");
                return Ok(RegistrySnapshot::new());
            }
            Err(e) => return Err(RegistryError::storage("failed to read registry", e)),
        };

        decode(&data, &self.path.display().to_string())
    }

    async fn save(&self, snapshot: &RegistrySnapshot) -> Result<(), RegistryError> {
        let payload = snapshot.to_bytes()?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| RegistryError::storage("failed to create registry directory", e))?;
        }

        let temp = self.temp_path();
        tokio::fs::write(&temp, &payload)
            .await
            .map_err(|e| RegistryError::storage("failed to write registry", e))?;
        tokio::fs::rename(&temp, &self.path)
            .await
            .map_err(|e| RegistryError::storage("failed to replace registry", e))?;

        tracing::trace!(path = %self.path.display(), bytes = payload.len(), "Registry saved");
        Ok(())
    }
}

/// In-process store holding the encoded document
///
/// Goes through the same encode/decode path as the file store, so tests see
/// the same document semantics.
#[derive(Debug, Default)]
pub struct MemoryStore {
    document: Mutex<Option<Bytes>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with a raw document
    pub fn with_document(document: impl Into<Bytes>) -> Self {
        Self {
            document: Mutex::new(Some(document.into())),
        }
    }

    /// The currently stored document, if any
    pub fn document(&self) -> Option<Bytes> {
        self.document.lock().ok().and_then(|doc| doc.clone())
    }

    fn current(&self) -> Result<Option<Bytes>, RegistryError> {
        self.document
            .lock()
            .map(|doc| doc.clone())
            .map_err(|e| RegistryError::storage("memory store poisoned", e))
    }
}

impl SnapshotStore for MemoryStore {
    async fn load(&self) -> Result<RegistrySnapshot, RegistryError> {
        match self.current()? {
            Some(data) => decode(&data, "memory"),
            None => Ok(RegistrySnapshot::new()),
        }
    }

    async fn save(&self, snapshot: &RegistrySnapshot) -> Result<(), RegistryError> {
        let payload = snapshot.to_bytes()?;
        let mut doc = self
            .document
            .lock()
            .map_err(|e| RegistryError::storage("memory store poisoned", e))?;
        *doc = Some(payload);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::key::StreamKey;
    use chrono::Utc;
    use tokio_test::{assert_err, assert_ok};

    #[tokio::test]
    async fn test_file_store_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("streams.json"));

        let snapshot = assert_ok!(store.load().await);
        assert_eq!(snapshot, RegistrySnapshot::new());
    }

    #[tokio::test]
    async fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested/data/streams.json"));

        let mut snapshot = RegistrySnapshot::new();
        snapshot
            .active_streams
            .insert(StreamKey::new("orphan"), Utc::now());
        snapshot.next_id = 7;
        // The orphan entry is repaired away on load
        assert_ok!(store.save(&snapshot).await);

        let loaded = assert_ok!(store.load().await);
        assert_eq!(loaded.next_id, 7);
        assert!(loaded.active_streams.is_empty());
        assert!(!store.temp_path().exists());
    }

    #[tokio::test]
    async fn test_file_store_corrupt_document_is_storage_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("streams.json");
        std::fs::write(&path, b"{ not json").unwrap();

        let store = JsonFileStore::new(&path);
        let err = assert_err!(store.load().await);
        assert!(matches!(err, RegistryError::Storage(_)));
    }

    #[tokio::test]
    async fn test_file_store_reads_naive_timestamp_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("streams.json");
        std::fs::write(
            &path,
            br#"{
  "streams": [
    {
      "id": 1,
      "name": "Channel 44",
      "description": "",
      "stream_key": "AbCdEf123456",
      "created_at": "2024-05-01T10:00:00.123456",
      "expires_at": "2024-05-02T10:00:00.123456",
      "is_active": false,
      "last_used": null
    },
    {
      "id": 2,
      "name": "Channel 45",
      "description": "backup feed",
      "stream_key": "ZyXwVu987654",
      "created_at": "2024-05-01T10:05:12.004211",
      "expires_at": "2024-05-31T10:05:12.004211",
      "is_active": true,
      "last_used": "2024-05-01T11:00:03.861002"
    }
  ],
  "active_streams": {
    "ZyXwVu987654": "2024-05-01T11:00:03.861002"
  }
}"#,
        )
        .unwrap();

        let store = JsonFileStore::new(&path);
        let snapshot = assert_ok!(store.load().await);
        assert_eq!(snapshot.streams.len(), 2);
        assert!(snapshot.is_consistent());
        assert!(snapshot.streams[0].last_used.is_none());
        assert_eq!(snapshot.clone().allocate_id(), 3);

        let live = StreamKey::new("ZyXwVu987654");
        let since = snapshot.active_streams[&live];
        assert_eq!(snapshot.find(&live).unwrap().last_used, Some(since));

        // Rewritten in the current format and read back unchanged
        assert_ok!(store.save(&snapshot).await);
        assert_eq!(assert_ok!(store.load().await), snapshot);
    }

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemoryStore::new();
        assert!(store.document().is_none());

        let mut snapshot = RegistrySnapshot::new();
        snapshot.next_id = 3;
        assert_ok!(store.save(&snapshot).await);

        assert!(store.document().is_some());
        assert_eq!(assert_ok!(store.load().await), snapshot);
    }

    #[tokio::test]
    async fn test_memory_store_bad_document() {
        let store = MemoryStore::with_document(&b"[]"[..]);
        let err = assert_err!(store.load().await);
        assert!(matches!(err, RegistryError::Storage(_)));
    }

    #[tokio::test]
    async fn test_file_store_wrong_shape_is_not_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("streams.json");
        let original = br#"{"stream": [{"id": 1}], "active_streams": {}}"#;
        std::fs::write(&path, original).unwrap();

        let store = JsonFileStore::new(&path);
        let err = assert_err!(store.load().await);
        assert!(matches!(err, RegistryError::Storage(_)));
        assert_eq!(std::fs::read(&path).unwrap(), original);
    }
}
