//! The two long-lived pub/sub connections shared by every room of a factory.

use std::sync::Arc;

use crate::domain::{AdapterError, CloseError, CloseFailure, ConnectionRole};
use crate::ports::{PublishConnection, SubscribeConnection};

use super::redis::{ConnectionOptions, RedisPublisher, RedisSubscriber};
use super::registry::HandlerRegistry;

/// One publish connection, one subscribe connection, and the registry the
/// subscribe side routes into.
///
/// Owned by [`AdapterFactory`](super::AdapterFactory). Adapters receive an
/// `Arc` and may publish, subscribe and unsubscribe through it; closing is
/// reserved to the factory.
pub struct SharedConnectionPair {
    publisher: Arc<dyn PublishConnection>,
    subscriber: Arc<dyn SubscribeConnection>,
    registry: Arc<HandlerRegistry>,
}

impl SharedConnectionPair {
    /// Assembles a pair from existing connections.
    ///
    /// `subscriber` must route incoming messages into `registry`.
    pub fn new(
        publisher: Arc<dyn PublishConnection>,
        subscriber: Arc<dyn SubscribeConnection>,
        registry: Arc<HandlerRegistry>,
    ) -> Self {
        Self {
            publisher,
            subscriber,
            registry,
        }
    }

    /// Creates two independent Redis connections from one options value.
    ///
    /// Must be called inside a Tokio runtime; no network contact happens
    /// until first use.
    pub fn redis(options: &ConnectionOptions) -> Self {
        let registry = Arc::new(HandlerRegistry::new());
        let publisher = Arc::new(RedisPublisher::new(options.clone()));
        let subscriber = Arc::new(RedisSubscriber::spawn(options.clone(), registry.clone()));
        Self::new(publisher, subscriber, registry)
    }

    /// Registry of handlers keyed by channel name.
    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.registry
    }

    pub async fn publish(&self, channel: &str, payload: Vec<u8>) -> Result<(), AdapterError> {
        self.publisher.publish(channel, payload).await
    }

    pub fn subscribe(&self, channel: &str) {
        self.subscriber.subscribe(channel);
    }

    pub fn unsubscribe(&self, channel: &str) {
        self.subscriber.unsubscribe(channel);
    }

    /// Closes both connections, attempting each one regardless of the
    /// other's outcome.
    pub(crate) async fn close(&self) -> Result<(), CloseError> {
        let mut failures = Vec::new();

        if let Err(error) = self.publisher.close().await {
            failures.push(CloseFailure {
                role: ConnectionRole::Publish,
                error,
            });
        }
        if let Err(error) = self.subscriber.close().await {
            failures.push(CloseFailure {
                role: ConnectionRole::Subscribe,
                error,
            });
        }

        CloseError::from_failures(failures)
    }
}

impl std::fmt::Debug for SharedConnectionPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedConnectionPair")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
