//! Registry error types
//!
//! Error types for stream registry operations.

use thiserror::Error;

use super::key::StreamKey;

/// Error type for registry operations
#[derive(Debug, Error)]
pub enum RegistryError {
    /// No record carries the presented stream key
    #[error("unknown stream key: {0}")]
    UnknownCredential(StreamKey),

    /// The key exists but expired and expiry is enforced
    #[error("stream key expired: {0}")]
    CredentialExpired(StreamKey),

    /// A create request carried invalid parameters
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The persisted document could not be read or written
    #[error("storage failure: {0}")]
    Storage(String),
}

impl RegistryError {
    pub(crate) fn storage(context: &str, err: impl std::fmt::Display) -> Self {
        RegistryError::Storage(format!("{context}: {err}"))
    }
}

impl From<serde_json::Error> for RegistryError {
    fn from(err: serde_json::Error) -> Self {
        RegistryError::storage("invalid registry document", err)
    }
}
