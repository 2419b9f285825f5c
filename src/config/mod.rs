//! Backplane configuration module
//!
//! Type-safe configuration loaded with the `config` and `dotenvy` crates.
//! Environment variables use the `ROOMCAST` prefix and `__` between nested
//! keys. Sentinel addresses are a comma-separated list.
//!
//! # Example
//!
//! ```no_run
//! use roomcast::config::BackplaneConfig;
//!
//! let config = BackplaneConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Store type: {:?}", config.store.store_type);
//! ```

mod error;
mod logging;
mod redis;
mod sentinel;
mod store;

pub use error::{ConfigError, ValidationError};
pub use logging::{LogFormat, LoggingConfig};
pub use redis::RedisStoreConfig;
pub use sentinel::SentinelConfig;
pub use store::{BackendConfiguration, StoreConfig, StoreType};

use serde::Deserialize;
use std::path::Path;

const ENV_PREFIX: &str = "ROOMCAST";

/// Root backplane configuration
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct BackplaneConfig {
    /// Backend carrying room traffic
    #[serde(default)]
    pub store: StoreConfig,

    /// Log level and format
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl BackplaneConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `ROOMCAST` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    ///
    /// # Environment Variable Format
    ///
    /// - `ROOMCAST__STORE__TYPE=redis` -> `store.type = redis`
    /// - `ROOMCAST__STORE__SENTINEL__ADDRS=a:26379,b:26379` -> list of two
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(environment())
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Load configuration from a file, overridden by environment variables
    ///
    /// The format is inferred from the extension (TOML, YAML, JSON).
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(environment())
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate the selected store's settings
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any value of the selected backend is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.store.validate()
    }
}

fn environment() -> config::Environment {
    config::Environment::default()
        .prefix(ENV_PREFIX)
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("store.sentinel.addrs")
}
