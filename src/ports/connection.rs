//! Pub/sub connection ports.
//!
//! A shared connection pair is made of one publish connection and one
//! subscribe connection. Adapters only use them; the factory alone closes
//! them. Splitting the two sides behind traits lets tests run the Redis
//! adapter against an in-process broker.

use async_trait::async_trait;

use crate::domain::{AdapterError, ConnectionError};

/// Publish-only side of a shared connection pair.
#[async_trait]
pub trait PublishConnection: Send + Sync {
    /// Publish `payload` on `channel`.
    ///
    /// Returns `BackendUnavailable` when the backend cannot be reached or the
    /// connection has been closed. Never retries.
    async fn publish(&self, channel: &str, payload: Vec<u8>) -> Result<(), AdapterError>;

    /// Release the connection. A second call reports `AlreadyClosed`.
    async fn close(&self) -> Result<(), ConnectionError>;
}

/// Subscribe-only side of a shared connection pair.
///
/// Incoming messages are routed into the pair's `HandlerRegistry` by the
/// implementation; subscribe requests never block.
#[async_trait]
pub trait SubscribeConnection: Send + Sync {
    /// Start receiving messages published on `channel`.
    fn subscribe(&self, channel: &str);

    /// Stop receiving messages published on `channel`.
    fn unsubscribe(&self, channel: &str);

    /// Release the connection and stop dispatching. A second call reports
    /// `AlreadyClosed`.
    async fn close(&self) -> Result<(), ConnectionError>;
}
