//! Ingest callback handling
//!
//! The ingest server (nginx-rtmp `on_publish` / `on_publish_done` or
//! anything speaking the same convention) posts the stream name whenever an
//! encoder starts or stops publishing. A non-2xx answer to the start call
//! makes the ingest server drop the publisher.

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use serde::Deserialize;
use thiserror::Error;

use crate::registry::{
    ExpiryPolicy, RegistryError, RegistrySnapshot, SnapshotStore, StreamKey, StreamRecord,
    StreamRegistry,
};

/// Error type for callback and read endpoints
#[derive(Debug, Error)]
pub enum CallbackError {
    /// The request did not name a stream
    #[error("missing stream name")]
    MalformedRequest,

    /// A read endpoint was asked for a key that does not exist
    #[error("stream not found: {0}")]
    StreamNotFound(StreamKey),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl IntoResponse for CallbackError {
    fn into_response(self) -> Response {
        let status = match &self {
            CallbackError::MalformedRequest => StatusCode::BAD_REQUEST,
            CallbackError::StreamNotFound(_) => StatusCode::NOT_FOUND,
            CallbackError::Registry(RegistryError::UnknownCredential(_))
            | CallbackError::Registry(RegistryError::CredentialExpired(_)) => StatusCode::FORBIDDEN,
            CallbackError::Registry(RegistryError::InvalidRequest(_)) => StatusCode::BAD_REQUEST,
            CallbackError::Registry(RegistryError::Storage(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let message = match &self {
            CallbackError::Registry(RegistryError::UnknownCredential(_)) => {
                "invalid stream key".to_string()
            }
            CallbackError::Registry(RegistryError::CredentialExpired(_)) => {
                "stream key expired".to_string()
            }
            CallbackError::Registry(RegistryError::Storage(e)) => {
                tracing::error!(error = %e, "Registry storage failure");
                "internal error".to_string()
            }
            other => other.to_string(),
        };

        (status, message).into_response()
    }
}

/// Fields the ingest server sends with a callback
///
/// Only the stream name matters; `app`, `addr` and the rest are accepted
/// for logging and otherwise ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackParams {
    /// Stream name as published (`rtmp://host/app/<name>`)
    pub name: Option<String>,
    /// Alternative field name used by direct API callers
    pub stream_key: Option<String>,
    pub app: Option<String>,
    pub addr: Option<String>,
}

impl CallbackParams {
    /// The presented credential, if any non-empty one was sent
    ///
    /// Returned exactly as sent; keys are compared byte for byte.
    pub fn credential(&self) -> Option<&str> {
        [self.name.as_deref(), self.stream_key.as_deref()]
            .into_iter()
            .flatten()
            .find(|s| !s.is_empty())
    }
}

/// Translates ingest callbacks into registry status transitions
pub struct NotificationListener<S: SnapshotStore> {
    registry: Arc<StreamRegistry<S>>,
}

impl<S: SnapshotStore> NotificationListener<S> {
    pub fn new(registry: Arc<StreamRegistry<S>>) -> Self {
        Self { registry }
    }

    /// Get a reference to the stream registry
    pub fn registry(&self) -> &Arc<StreamRegistry<S>> {
        &self.registry
    }

    /// An encoder started publishing under `credential`
    pub async fn on_start(&self, credential: Option<&str>) -> Result<StreamRecord, CallbackError> {
        let key = Self::resolve(credential)?;
        self.transition(key, true).await
    }

    /// An encoder stopped publishing under `credential`
    pub async fn on_stop(&self, credential: Option<&str>) -> Result<StreamRecord, CallbackError> {
        let key = Self::resolve(credential)?;
        self.transition(key, false).await
    }

    /// The full registry snapshot
    pub async fn list_all(&self) -> Result<RegistrySnapshot, CallbackError> {
        Ok(self.registry.list().await?)
    }

    /// A single record by key
    pub async fn lookup(&self, key: &str) -> Result<StreamRecord, CallbackError> {
        let key = StreamKey::new(key);
        self.registry
            .lookup(&key)
            .await?
            .ok_or(CallbackError::StreamNotFound(key))
    }

    fn resolve(credential: Option<&str>) -> Result<StreamKey, CallbackError> {
        credential
            .filter(|s| !s.is_empty())
            .map(StreamKey::new)
            .ok_or(CallbackError::MalformedRequest)
    }

    async fn transition(&self, key: StreamKey, active: bool) -> Result<StreamRecord, CallbackError> {
        let Some(record) = self.registry.lookup(&key).await? else {
            tracing::warn!(stream = %key, live = active, "Rejected callback for unknown stream key");
            return Err(RegistryError::UnknownCredential(key).into());
        };

        if active
            && self.registry.config().expiry == ExpiryPolicy::Enforce
            && record.is_expired_at(Utc::now())
        {
            tracing::warn!(
                stream = %key,
                id = record.id,
                expired_at = %record.expires_at,
                "Rejected start for expired stream key"
            );
            return Err(RegistryError::CredentialExpired(key).into());
        }

        // The record can be deleted between lookup and transition
        let updated = self.registry.set_active(&key, active).await?;
        updated.ok_or_else(|| RegistryError::UnknownCredential(key).into())
    }
}
