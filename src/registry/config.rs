//! Registry configuration

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::error::RegistryError;
use super::key::{DEFAULT_KEY_LENGTH, MIN_KEY_LENGTH};

/// How expiry timestamps are treated when an encoder starts publishing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpiryPolicy {
    /// `expires_at` is informational; expired keys may still go live
    #[default]
    Advisory,
    /// Start callbacks for expired keys are rejected
    Enforce,
}

/// Registry configuration options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Location of the registry document
    pub data_path: PathBuf,

    /// Length of generated stream keys
    pub key_length: usize,

    /// TTL used when the caller does not pick one
    pub default_ttl_hours: u32,

    /// Upper bound accepted for a TTL
    pub max_ttl_hours: u32,

    /// Expiry handling for start callbacks
    pub expiry: ExpiryPolicy,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("data/streams.json"),
            key_length: DEFAULT_KEY_LENGTH,
            default_ttl_hours: 24,
            max_ttl_hours: 720, // 30 days
            expiry: ExpiryPolicy::Advisory,
        }
    }
}

impl RegistryConfig {
    /// Set the registry document path
    pub fn data_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_path = path.into();
        self
    }

    /// Set the generated key length
    pub fn key_length(mut self, length: usize) -> Self {
        self.key_length = length;
        self
    }

    /// Set the default TTL
    pub fn default_ttl_hours(mut self, hours: u32) -> Self {
        self.default_ttl_hours = hours;
        self
    }

    /// Set the maximum TTL
    pub fn max_ttl_hours(mut self, hours: u32) -> Self {
        self.max_ttl_hours = hours;
        self
    }

    /// Set the expiry policy
    pub fn expiry(mut self, policy: ExpiryPolicy) -> Self {
        self.expiry = policy;
        self
    }

    /// Check the options that would make issued keys unusable
    pub fn validate(&self) -> Result<(), RegistryError> {
        if self.key_length < MIN_KEY_LENGTH {
            return Err(RegistryError::InvalidRequest(format!(
                "key length must be at least {MIN_KEY_LENGTH}, got {}",
                self.key_length
            )));
        }
        if self.default_ttl_hours == 0 || self.default_ttl_hours > self.max_ttl_hours {
            return Err(RegistryError::InvalidRequest(format!(
                "default ttl must be between 1 and {} hours",
                self.max_ttl_hours
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RegistryConfig::default();

        assert_eq!(config.data_path, PathBuf::from("data/streams.json"));
        assert_eq!(config.key_length, 12);
        assert_eq!(config.default_ttl_hours, 24);
        assert_eq!(config.max_ttl_hours, 720);
        assert_eq!(config.expiry, ExpiryPolicy::Advisory);
    }

    #[test]
    fn test_builder_chaining() {
        let config = RegistryConfig::default()
            .data_path("/tmp/keys.json")
            .key_length(20)
            .default_ttl_hours(2)
            .max_ttl_hours(48)
            .expiry(ExpiryPolicy::Enforce);

        assert_eq!(config.data_path, PathBuf::from("/tmp/keys.json"));
        assert_eq!(config.key_length, 20);
        assert_eq!(config.default_ttl_hours, 2);
        assert_eq!(config.max_ttl_hours, 48);
        assert_eq!(config.expiry, ExpiryPolicy::Enforce);
    }

    #[test]
    fn test_validate() {
        assert!(RegistryConfig::default().validate().is_ok());
        assert!(RegistryConfig::default().key_length(64).validate().is_ok());

        for config in [
            RegistryConfig::default().key_length(0),
            RegistryConfig::default().key_length(MIN_KEY_LENGTH - 1),
            RegistryConfig::default().default_ttl_hours(0),
            RegistryConfig::default().max_ttl_hours(12),
        ] {
            assert!(matches!(
                config.validate(),
                Err(RegistryError::InvalidRequest(_))
            ));
        }
    }

    #[test]
    fn test_partial_toml() {
        let config: RegistryConfig = toml::from_str("expiry = \"enforce\"").unwrap();

        assert_eq!(config.expiry, ExpiryPolicy::Enforce);
        assert_eq!(config.key_length, 12);
    }
}
