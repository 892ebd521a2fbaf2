//! Crate-level error type

use thiserror::Error;

use crate::registry::RegistryError;

/// Errors from loading configuration or running the listener
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Result alias using the crate error
pub type Result<T> = std::result::Result<T, Error>;
