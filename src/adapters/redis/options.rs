//! Connection options shared by both halves of a Redis connection pair.
//!
//! One options value is built per factory; each connection builds its own
//! [`Endpoint`] from it so the two connections stay independent.

use redis::sentinel::{Sentinel, SentinelNodeConnectionInfo};
use redis::{Client, ConnectionAddr, ConnectionInfo, RedisConnectionInfo, RedisError, RedisResult};
use tokio::sync::Mutex;

use crate::domain::AdapterError;

/// Sentinel failover options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailoverOptions {
    /// Sentinel addresses as `host:port`.
    pub sentinel_addrs: Vec<String>,

    /// Name of the monitored master group.
    pub master_name: String,

    /// Logical database index on the master.
    pub db: i64,
}

impl FailoverOptions {
    fn sentinel_urls(&self) -> Vec<String> {
        self.sentinel_addrs
            .iter()
            .map(|addr| format!("redis://{}", addr))
            .collect()
    }

    fn node_info(&self) -> SentinelNodeConnectionInfo {
        SentinelNodeConnectionInfo {
            tls_mode: None,
            redis_connection_info: Some(RedisConnectionInfo {
                db: self.db,
                ..Default::default()
            }),
        }
    }
}

/// How to reach the Redis server carrying room traffic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionOptions {
    /// A single Redis server.
    Standalone { host: String, port: u16, db: i64 },

    /// The current master of a Sentinel-monitored group.
    Failover(FailoverOptions),
}

impl ConnectionOptions {
    /// Human-readable target, for logs.
    pub fn describe(&self) -> String {
        match self {
            ConnectionOptions::Standalone { host, port, db } => {
                format!("{}/{}", join_host_port(host, *port), db)
            }
            ConnectionOptions::Failover(opts) => format!(
                "sentinel [{}] master {}/{}",
                opts.sentinel_addrs.join(", "),
                opts.master_name,
                opts.db
            ),
        }
    }
}

/// Maps any Redis client error to `BackendUnavailable`.
pub(crate) fn unavailable(err: RedisError) -> AdapterError {
    AdapterError::unavailable(err.to_string())
}

/// `host:port`, bracketing IPv6 literals.
pub fn join_host_port(host: &str, port: u16) -> String {
    if host.contains(':') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}

/// Resolves a `redis::Client` each time a connection is (re)established.
///
/// Nothing here touches the network until [`Endpoint::client`] is awaited.
/// For failover options the current master is asked from Sentinel on every
/// call, so a reconnect after failover lands on the new master.
pub(crate) struct Endpoint {
    options: ConnectionOptions,
    sentinel: Mutex<Option<Sentinel>>,
}

impl Endpoint {
    pub(crate) fn new(options: ConnectionOptions) -> Self {
        Self {
            options,
            sentinel: Mutex::new(None),
        }
    }

    pub(crate) async fn client(&self) -> RedisResult<Client> {
        match &self.options {
            ConnectionOptions::Standalone { host, port, db } => Client::open(ConnectionInfo {
                addr: ConnectionAddr::Tcp(host.clone(), *port),
                redis: RedisConnectionInfo {
                    db: *db,
                    ..Default::default()
                },
            }),
            ConnectionOptions::Failover(opts) => {
                let mut guard = self.sentinel.lock().await;
                let sentinel = match guard.take() {
                    Some(sentinel) => guard.insert(sentinel),
                    None => guard.insert(Sentinel::build(opts.sentinel_urls())?),
                };
                sentinel
                    .async_master_for(&opts.master_name, Some(&opts.node_info()))
                    .await
            }
        }
    }
}

impl std::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
