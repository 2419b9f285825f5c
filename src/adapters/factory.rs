//! Backend selection and lifecycle of the shared pub/sub connections.
//!
//! The factory is built once per process. It picks the backend from the
//! store configuration, creates the shared connection pair when the backend
//! needs one, and hands out one adapter per room. Closing the factory is the
//! only way the shared connections are released.

use std::fmt;
use std::sync::Arc;

use crate::config::{BackendConfiguration, StoreConfig, StoreType};
use crate::domain::{CloseError, RoomId};
use crate::ports::Adapter;

use super::memory::MemoryAdapter;
use super::redis::{ConnectionOptions, FailoverOptions, RedisAdapter};
use super::registry::HandlerRegistry;
use super::SharedConnectionPair;

/// Function producing the adapter for a room.
pub type RoomConstructor = Arc<dyn Fn(RoomId) -> Arc<dyn Adapter> + Send + Sync>;

/// The backend a factory was built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Memory,
    Redis,
    RedisSentinel,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Memory => "memory",
            BackendKind::Redis => "redis",
            BackendKind::RedisSentinel => "redis-sentinel",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone)]
enum Backend {
    Memory {
        registry: Arc<HandlerRegistry>,
    },
    PubSub {
        kind: BackendKind,
        prefix: String,
        connections: Arc<SharedConnectionPair>,
    },
}

impl Backend {
    fn new_adapter(&self, room: RoomId) -> Arc<dyn Adapter> {
        match self {
            Backend::Memory { registry } => Arc::new(MemoryAdapter::new(registry.clone(), room)),
            Backend::PubSub {
                prefix,
                connections,
                ..
            } => Arc::new(RedisAdapter::new(connections.clone(), prefix, room)),
        }
    }
}

/// Builds room adapters backed by one shared backend.
///
/// # Example
///
/// ```
/// use roomcast::adapters::AdapterFactory;
/// use roomcast::config::StoreConfig;
///
/// let factory = AdapterFactory::new(&StoreConfig::memory());
/// let lobby = factory.new_adapter("lobby".into());
/// assert!(lobby.channel().is_none());
/// ```
pub struct AdapterFactory {
    backend: Backend,
}

impl AdapterFactory {
    /// Builds a factory from store settings.
    ///
    /// Unrecognized store types fall back to memory with a warning.
    /// Redis backends must be built inside a Tokio runtime; nothing is
    /// contacted until the first adapter is used.
    pub fn new(config: &StoreConfig) -> Self {
        if config.store_type == StoreType::Unrecognized {
            tracing::warn!("Unrecognized store type, falling back to in-memory adapter");
        }
        Self::from_backend(config.backend())
    }

    /// Builds a factory from an already resolved backend.
    pub fn from_backend(backend: BackendConfiguration) -> Self {
        match backend {
            BackendConfiguration::Memory => Self::memory(),
            BackendConfiguration::RedisStandalone {
                host,
                port,
                db,
                prefix,
            } => {
                tracing::info!(
                    backend = %BackendKind::Redis,
                    host = %host,
                    port,
                    db,
                    prefix = %prefix,
                    "Room adapter factory ready"
                );
                let options = ConnectionOptions::Standalone { host, port, db };
                Self::redis(BackendKind::Redis, &options, prefix)
            }
            BackendConfiguration::RedisSentinel {
                addrs,
                master_name,
                db,
                prefix,
            } => {
                tracing::info!(
                    backend = %BackendKind::RedisSentinel,
                    sentinels = %addrs.join(","),
                    master = %master_name,
                    prefix = %prefix,
                    "Room adapter factory ready"
                );
                let options = ConnectionOptions::Failover(FailoverOptions {
                    sentinel_addrs: addrs,
                    master_name,
                    db,
                });
                Self::redis(BackendKind::RedisSentinel, &options, prefix)
            }
        }
    }

    fn redis(kind: BackendKind, options: &ConnectionOptions, prefix: String) -> Self {
        let connections = Arc::new(SharedConnectionPair::redis(options));
        Self::with_connections(kind, prefix, connections)
    }

    /// In-process factory. Adapters for the same room share handlers.
    pub fn memory() -> Self {
        tracing::info!(backend = %BackendKind::Memory, "Room adapter factory ready");
        Self {
            backend: Backend::Memory {
                registry: Arc::new(HandlerRegistry::new()),
            },
        }
    }

    /// Factory over an existing connection pair.
    pub fn with_connections(
        kind: BackendKind,
        prefix: impl Into<String>,
        connections: Arc<SharedConnectionPair>,
    ) -> Self {
        Self {
            backend: Backend::PubSub {
                kind,
                prefix: prefix.into(),
                connections,
            },
        }
    }

    pub fn backend_kind(&self) -> BackendKind {
        match &self.backend {
            Backend::Memory { .. } => BackendKind::Memory,
            Backend::PubSub { kind, .. } => *kind,
        }
    }

    /// Channel prefix, `None` for memory.
    pub fn prefix(&self) -> Option<&str> {
        match &self.backend {
            Backend::Memory { .. } => None,
            Backend::PubSub { prefix, .. } => Some(prefix),
        }
    }

    /// Number of network connections held by the factory.
    pub fn connection_count(&self) -> usize {
        match &self.backend {
            Backend::Memory { .. } => 0,
            Backend::PubSub { .. } => 2,
        }
    }

    /// Short description of the backend, for logs and status output.
    pub fn describe(&self) -> String {
        match &self.backend {
            Backend::Memory { .. } => BackendKind::Memory.to_string(),
            Backend::PubSub { kind, prefix, .. } => format!("{} (prefix {:?})", kind, prefix),
        }
    }

    /// Creates the adapter for `room`.
    pub fn new_adapter(&self, room: RoomId) -> Arc<dyn Adapter> {
        self.backend.new_adapter(room)
    }

    /// Room constructor detached from the factory's lifetime.
    pub fn room_constructor(&self) -> RoomConstructor {
        let backend = self.backend.clone();
        Arc::new(move |room| backend.new_adapter(room))
    }

    /// Releases the shared connections.
    ///
    /// Every connection is attempted; all failures are reported together.
    /// In-flight broadcasts fail with `BackendUnavailable`.
    pub async fn close(&self) -> Result<(), CloseError> {
        match &self.backend {
            Backend::Memory { .. } => Ok(()),
            Backend::PubSub { kind, connections, .. } => {
                let result = connections.close().await;
                match &result {
                    Ok(()) => tracing::info!(backend = %kind, "Room adapter factory closed"),
                    Err(e) => tracing::error!(backend = %kind, error = %e, "Room adapter factory close failed"),
                }
                result
            }
        }
    }
}

impl fmt::Debug for AdapterFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterFactory")
            .field("backend", &self.backend_kind())
            .field("prefix", &self.prefix())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::LoopbackBroker;
    use crate::domain::{ConnectionError, ConnectionRole};

    #[test]
    fn memory_factory_has_no_connections() {
        let factory = AdapterFactory::new(&StoreConfig::memory());
        assert_eq!(factory.backend_kind(), BackendKind::Memory);
        assert_eq!(factory.connection_count(), 0);
        assert_eq!(factory.prefix(), None);
        assert_eq!(factory.describe(), "memory");
    }

    #[tokio::test]
    async fn memory_close_is_ok() {
        let factory = AdapterFactory::memory();
        assert!(factory.close().await.is_ok());
        assert!(factory.close().await.is_ok());
    }

    #[test]
    fn unrecognized_store_falls_back_to_memory() {
        let config = StoreConfig {
            store_type: StoreType::Unrecognized,
            ..Default::default()
        };
        assert_eq!(AdapterFactory::new(&config).backend_kind(), BackendKind::Memory);
    }

    #[tokio::test]
    async fn redis_factory_reports_kind_and_prefix() {
        let factory = AdapterFactory::new(&StoreConfig::redis("localhost", 6379, 0, "sio"));
        assert_eq!(factory.backend_kind(), BackendKind::Redis);
        assert_eq!(factory.prefix(), Some("sio"));
        assert_eq!(factory.connection_count(), 2);
        assert_eq!(factory.describe(), "redis (prefix \"sio\")");
        factory.close().await.unwrap();
    }

    #[tokio::test]
    async fn sentinel_room_channel_uses_prefix() {
        let factory =
            AdapterFactory::new(&StoreConfig::sentinel(["10.0.0.1:26379"], "mymaster", "sio"));
        assert_eq!(factory.backend_kind(), BackendKind::RedisSentinel);

        let constructor = factory.room_constructor();
        let lobby = constructor("lobby".into());

        assert_eq!(lobby.channel(), Some("sio#lobby"));
        lobby.close();
        factory.close().await.unwrap();
    }

    #[tokio::test]
    async fn from_backend_maps_each_variant() {
        let cases = [
            (BackendConfiguration::Memory, BackendKind::Memory, None),
            (
                BackendConfiguration::RedisStandalone {
                    host: "localhost".to_string(),
                    port: 6379,
                    db: 0,
                    prefix: "sio".to_string(),
                },
                BackendKind::Redis,
                Some("sio"),
            ),
            (
                BackendConfiguration::RedisSentinel {
                    addrs: vec!["10.0.0.1:26379".to_string()],
                    master_name: "mymaster".to_string(),
                    db: 0,
                    prefix: "rt".to_string(),
                },
                BackendKind::RedisSentinel,
                Some("rt"),
            ),
        ];

        for (backend, kind, prefix) in cases {
            let factory = AdapterFactory::from_backend(backend);
            assert_eq!(factory.backend_kind(), kind);
            assert_eq!(factory.prefix(), prefix);
            factory.close().await.unwrap();
        }
    }

    #[tokio::test]
    async fn close_aggregates_both_failures() {
        let broker = LoopbackBroker::new();
        let factory = AdapterFactory::with_connections(
            BackendKind::Redis,
            "sio",
            Arc::new(broker.connect()),
        );
        broker.fail_closes(true);

        let err = factory.close().await.unwrap_err();
        let roles: Vec<_> = err.failures().iter().map(|f| f.role).collect();

        assert_eq!(roles, vec![ConnectionRole::Publish, ConnectionRole::Subscribe]);
        assert!(err
            .failures()
            .iter()
            .all(|f| matches!(f.error, ConnectionError::Backend(_))));
    }
}
