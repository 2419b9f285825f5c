//! Redis Sentinel configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Sentinel failover settings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SentinelConfig {
    /// Sentinel addresses as `host:port`
    #[serde(default)]
    pub addrs: Vec<String>,

    /// Name of the monitored master group
    #[serde(default = "default_master_name", alias = "master-name")]
    pub master_name: String,

    /// Logical database index on the master
    #[serde(default)]
    pub db: i64,
}

impl SentinelConfig {
    /// Validate Sentinel settings
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.addrs.is_empty() {
            return Err(ValidationError::MissingRequired("store.sentinel.addrs"));
        }
        if let Some(bad) = self.addrs.iter().find(|addr| !is_host_port(addr)) {
            return Err(ValidationError::InvalidSentinelAddress(bad.clone()));
        }
        if self.master_name.trim().is_empty() {
            return Err(ValidationError::MissingRequired("store.sentinel.master_name"));
        }
        if self.db < 0 {
            return Err(ValidationError::InvalidDatabaseIndex);
        }
        Ok(())
    }
}

impl Default for SentinelConfig {
    fn default() -> Self {
        Self {
            addrs: Vec::new(),
            master_name: default_master_name(),
            db: 0,
        }
    }
}

fn default_master_name() -> String {
    "mymaster".to_string()
}

fn is_host_port(addr: &str) -> bool {
    match addr.rsplit_once(':') {
        Some((host, port)) => {
            !host.trim().is_empty() && port.parse::<u16>().map(|p| p != 0).unwrap_or(false)
        }
        None => false,
    }
}
