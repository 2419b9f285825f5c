//! Backplane store selection

use serde::Deserialize;

use super::error::ValidationError;
use super::redis::RedisStoreConfig;
use super::sentinel::SentinelConfig;

/// Which backend carries room traffic.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum StoreType {
    /// Single-process delivery, no external connections.
    #[default]
    #[serde(alias = "disabled")]
    Memory,

    /// Standalone Redis server.
    Redis,

    /// Redis behind Sentinel failover.
    RedisSentinel,

    /// Any other value; treated as memory.
    #[serde(other)]
    Unrecognized,
}

/// `store` configuration section
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct StoreConfig {
    #[serde(rename = "type", default)]
    pub store_type: StoreType,

    #[serde(default)]
    pub redis: RedisStoreConfig,

    #[serde(default)]
    pub sentinel: SentinelConfig,
}

/// The resolved backend a factory is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendConfiguration {
    Memory,
    RedisStandalone {
        host: String,
        port: u16,
        db: i64,
        prefix: String,
    },
    RedisSentinel {
        addrs: Vec<String>,
        master_name: String,
        db: i64,
        prefix: String,
    },
}

impl StoreConfig {
    /// Memory store with default settings.
    pub fn memory() -> Self {
        Self::default()
    }

    /// Standalone Redis store.
    pub fn redis(host: impl Into<String>, port: u16, db: i64, prefix: impl Into<String>) -> Self {
        Self {
            store_type: StoreType::Redis,
            redis: RedisStoreConfig {
                host: host.into(),
                port,
                db,
                prefix: prefix.into(),
            },
            sentinel: SentinelConfig::default(),
        }
    }

    /// Sentinel-backed store. The prefix lives in the `redis` section.
    pub fn sentinel<I, S>(addrs: I, master_name: impl Into<String>, prefix: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            store_type: StoreType::RedisSentinel,
            redis: RedisStoreConfig {
                prefix: prefix.into(),
                ..Default::default()
            },
            sentinel: SentinelConfig {
                addrs: addrs.into_iter().map(Into::into).collect(),
                master_name: master_name.into(),
                db: 0,
            },
        }
    }

    /// Resolves the backend. Pure: nothing is contacted.
    pub fn backend(&self) -> BackendConfiguration {
        match self.store_type {
            StoreType::Memory | StoreType::Unrecognized => BackendConfiguration::Memory,
            StoreType::Redis => BackendConfiguration::RedisStandalone {
                host: self.redis.host.clone(),
                port: self.redis.port,
                db: self.redis.db,
                prefix: self.redis.prefix.clone(),
            },
            StoreType::RedisSentinel => BackendConfiguration::RedisSentinel {
                addrs: self.sentinel.addrs.clone(),
                master_name: self.sentinel.master_name.clone(),
                db: self.sentinel.db,
                prefix: self.redis.prefix.clone(),
            },
        }
    }

    /// Validates the settings of the selected backend only.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self.store_type {
            StoreType::Memory | StoreType::Unrecognized => Ok(()),
            StoreType::Redis => self.redis.validate(),
            StoreType::RedisSentinel => {
                self.redis.validate_prefix()?;
                self.sentinel.validate()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_memory() {
        assert_eq!(StoreConfig::default().store_type, StoreType::Memory);
        assert_eq!(StoreConfig::default().backend(), BackendConfiguration::Memory);
    }

    #[test]
    fn test_unrecognized_resolves_to_memory() {
        let config = StoreConfig {
            store_type: StoreType::Unrecognized,
            ..Default::default()
        };
        assert_eq!(config.backend(), BackendConfiguration::Memory);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_redis_backend() {
        let config = StoreConfig::redis("localhost", 6379, 0, "sio");
        assert_eq!(
            config.backend(),
            BackendConfiguration::RedisStandalone {
                host: "localhost".to_string(),
                port: 6379,
                db: 0,
                prefix: "sio".to_string(),
            }
        );
    }

    #[test]
    fn test_sentinel_backend_reuses_redis_prefix() {
        let config = StoreConfig::sentinel(["10.0.0.1:26379"], "mymaster", "sio");
        assert_eq!(
            config.backend(),
            BackendConfiguration::RedisSentinel {
                addrs: vec!["10.0.0.1:26379".to_string()],
                master_name: "mymaster".to_string(),
                db: 0,
                prefix: "sio".to_string(),
            }
        );
    }

    #[test]
    fn test_validation_only_checks_selected_backend() {
        let mut config = StoreConfig::memory();
        config.redis.port = 0;
        assert!(config.validate().is_ok());

        config.store_type = StoreType::Redis;
        assert_eq!(config.validate(), Err(ValidationError::InvalidPort));
    }

    #[test]
    fn test_sentinel_validation_checks_prefix() {
        let config = StoreConfig::sentinel(["10.0.0.1:26379"], "mymaster", "bad#prefix");
        assert_eq!(config.validate(), Err(ValidationError::InvalidPrefix));
    }

    #[test]
    fn test_store_type_from_json() {
        let parse = |s: &str| serde_json::from_str::<StoreType>(s).unwrap();
        assert_eq!(parse("\"memory\""), StoreType::Memory);
        assert_eq!(parse("\"disabled\""), StoreType::Memory);
        assert_eq!(parse("\"redis\""), StoreType::Redis);
        assert_eq!(parse("\"redis-sentinel\""), StoreType::RedisSentinel);
        assert_eq!(parse("\"cassandra\""), StoreType::Unrecognized);
    }
}
