//! Redis connection configuration

use serde::Deserialize;

use crate::domain::CHANNEL_SEPARATOR;

use super::error::ValidationError;

/// Standalone Redis server settings.
///
/// `prefix` is also used by the Sentinel backend.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct RedisStoreConfig {
    /// Redis host name or address
    #[serde(default = "default_host")]
    pub host: String,

    /// Redis port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Logical database index
    #[serde(default)]
    pub db: i64,

    /// Channel name prefix, `<prefix>#<room>`
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

impl RedisStoreConfig {
    /// Validate the standalone server settings
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.host.trim().is_empty() {
            return Err(ValidationError::MissingRequired("store.redis.host"));
        }
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        if self.db < 0 {
            return Err(ValidationError::InvalidDatabaseIndex);
        }
        self.validate_prefix()
    }

    /// Validate only the channel prefix
    pub fn validate_prefix(&self) -> Result<(), ValidationError> {
        if self.prefix.contains(CHANNEL_SEPARATOR) {
            return Err(ValidationError::InvalidPrefix);
        }
        Ok(())
    }
}

impl Default for RedisStoreConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            db: 0,
            prefix: default_prefix(),
        }
    }
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    6379
}

fn default_prefix() -> String {
    "roomcast".to_string()
}
