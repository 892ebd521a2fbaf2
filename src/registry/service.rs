//! Stream registry service
//!
//! Business rules over a [`SnapshotStore`]. Every operation loads a fresh
//! snapshot, applies its change, and saves it back before returning. The
//! whole load/mutate/save sequence runs under one async mutex, so concurrent
//! callback handlers and operator commands cannot overwrite each other.

use chrono::{Duration, Utc};
use tokio::sync::Mutex;

use super::config::RegistryConfig;
use super::error::RegistryError;
use super::key::StreamKey;
use super::record::{ActiveStream, StreamRecord};
use super::snapshot::RegistrySnapshot;
use super::store::SnapshotStore;
use crate::stats::RegistryStats;

/// Central registry of issued stream keys
pub struct StreamRegistry<S: SnapshotStore> {
    store: S,

    config: RegistryConfig,

    /// Serializes every load/save pair against the store
    lock: Mutex<()>,
}

impl<S: SnapshotStore> StreamRegistry<S> {
    /// Create a registry with default configuration
    pub fn new(store: S) -> Self {
        Self::with_config(store, RegistryConfig::default())
    }

    /// Create a registry with custom configuration
    pub fn with_config(store: S, config: RegistryConfig) -> Self {
        Self {
            store,
            config,
            lock: Mutex::new(()),
        }
    }

    /// Get the registry configuration
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Get the underlying store
    pub fn store(&self) -> &S {
        &self.store
    }

    async fn read<T>(&self, f: impl FnOnce(&RegistrySnapshot) -> T) -> Result<T, RegistryError> {
        let _guard = self.lock.lock().await;
        let snapshot = self.store.load().await?;
        Ok(f(&snapshot))
    }

    /// Run `f` against a fresh snapshot and persist the result if it changed
    async fn mutate<T>(
        &self,
        f: impl FnOnce(&mut RegistrySnapshot) -> Result<T, RegistryError>,
    ) -> Result<T, RegistryError> {
        let _guard = self.lock.lock().await;
        let mut snapshot = self.store.load().await?;
        let before = snapshot.clone();

        let result = f(&mut snapshot)?;

        if snapshot != before {
            self.store.save(&snapshot).await?;
        }
        Ok(result)
    }

    /// Issue a new stream key
    pub async fn create(
        &self,
        name: &str,
        description: &str,
        ttl_hours: u32,
    ) -> Result<StreamRecord, RegistryError> {
        self.config.validate()?;

        let name = name.trim();
        if name.is_empty() {
            return Err(RegistryError::InvalidRequest("stream name is required".into()));
        }
        if ttl_hours == 0 || ttl_hours > self.config.max_ttl_hours {
            return Err(RegistryError::InvalidRequest(format!(
                "ttl must be between 1 and {} hours",
                self.config.max_ttl_hours
            )));
        }

        let now = Utc::now();
        let expires_at = Duration::try_hours(i64::from(ttl_hours))
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or_else(|| {
                RegistryError::InvalidRequest(format!(
                    "ttl of {ttl_hours} hours is out of range"
                ))
            })?;

        let record = self
            .mutate(|snapshot| {
                let id = snapshot.allocate_id();
                let record = StreamRecord::new(
                    id,
                    name.to_string(),
                    description.to_string(),
                    StreamKey::generate(self.config.key_length),
                    now,
                    expires_at,
                );
                snapshot.push(record.clone());
                Ok(record)
            })
            .await?;

        tracing::info!(
            id = record.id,
            name = %record.name,
            expires_at = %record.expires_at,
            "Stream key issued"
        );

        Ok(record)
    }

    /// Issue a new stream key with the configured default TTL
    pub async fn create_default(
        &self,
        name: &str,
        description: &str,
    ) -> Result<StreamRecord, RegistryError> {
        self.create(name, description, self.config.default_ttl_hours)
            .await
    }

    /// Find the record holding `key`
    pub async fn lookup(&self, key: &StreamKey) -> Result<Option<StreamRecord>, RegistryError> {
        self.read(|snapshot| snapshot.find(key).cloned()).await
    }

    /// Find a record by id
    pub async fn get(&self, id: u64) -> Result<Option<StreamRecord>, RegistryError> {
        self.read(|snapshot| snapshot.find_by_id(id).cloned()).await
    }

    /// The full current snapshot
    pub async fn list(&self) -> Result<RegistrySnapshot, RegistryError> {
        self.read(|snapshot| snapshot.clone()).await
    }

    /// Live streams with their activation time
    pub async fn active(&self) -> Result<Vec<ActiveStream>, RegistryError> {
        self.read(RegistrySnapshot::active).await
    }

    /// Aggregate counts over the registry
    pub async fn stats(&self) -> Result<RegistryStats, RegistryError> {
        let now = Utc::now();
        self.read(|snapshot| RegistryStats::from_snapshot(snapshot, now))
            .await
    }

    /// Mark the stream holding `key` live or offline
    ///
    /// Returns `None` without touching the store if no record matches.
    pub async fn set_active(
        &self,
        key: &StreamKey,
        active: bool,
    ) -> Result<Option<StreamRecord>, RegistryError> {
        let updated = self
            .mutate(|snapshot| Ok(snapshot.set_active(key, active, Utc::now())))
            .await?;

        match &updated {
            Some(record) => tracing::info!(
                stream = %key,
                id = record.id,
                live = active,
                "Stream status updated"
            ),
            None => tracing::debug!(stream = %key, live = active, "Status update for unknown key"),
        }

        Ok(updated)
    }

    /// Delete the record with `id`
    ///
    /// Returns `false` if no such record exists.
    pub async fn delete(&self, id: u64) -> Result<bool, RegistryError> {
        let removed = self.mutate(|snapshot| Ok(snapshot.remove(id))).await?;

        match &removed {
            Some(record) => tracing::info!(
                id = id,
                stream = %record.stream_key,
                was_live = record.is_active,
                "Stream key deleted"
            ),
            None => tracing::debug!(id = id, "Delete for unknown id"),
        }

        Ok(removed.is_some())
    }
}
