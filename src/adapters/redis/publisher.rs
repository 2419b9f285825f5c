//! Publish-only Redis connection.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tokio::sync::{watch, Mutex};

use crate::domain::{AdapterError, ConnectionError};
use crate::ports::PublishConnection;

use super::options::{unavailable, ConnectionOptions, Endpoint};

/// Shared publish connection.
///
/// The multiplexed connection is opened on first publish and cached. When a
/// publish fails the cached connection is discarded, so the next publish
/// resolves the endpoint again (picking up a Sentinel failover). A failed
/// publish is never retried here.
pub struct RedisPublisher {
    endpoint: Endpoint,
    connection: Mutex<Option<MultiplexedConnection>>,
    closed: watch::Sender<bool>,
}

impl RedisPublisher {
    /// Creates a publisher. Does not contact the server.
    pub fn new(options: ConnectionOptions) -> Self {
        let (closed, _) = watch::channel(false);
        Self {
            endpoint: Endpoint::new(options),
            connection: Mutex::new(None),
            closed,
        }
    }

    async fn connection(&self) -> Result<MultiplexedConnection, AdapterError> {
        let mut cached = self.connection.lock().await;
        if let Some(conn) = cached.as_ref() {
            return Ok(conn.clone());
        }
        let client = self.endpoint.client().await.map_err(unavailable)?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(unavailable)?;
        tracing::debug!("Publish connection established");
        *cached = Some(conn.clone());
        Ok(conn)
    }

    async fn publish_once(&self, channel: &str, payload: Vec<u8>) -> Result<(), AdapterError> {
        let mut conn = self.connection().await?;
        if let Err(e) = conn.publish::<_, _, ()>(channel, payload).await {
            self.connection.lock().await.take();
            return Err(unavailable(e));
        }
        Ok(())
    }
}

#[async_trait]
impl PublishConnection for RedisPublisher {
    async fn publish(&self, channel: &str, payload: Vec<u8>) -> Result<(), AdapterError> {
        let mut closed = self.closed.subscribe();
        if *closed.borrow() {
            return Err(AdapterError::unavailable("publish connection closed"));
        }

        tokio::select! {
            _ = wait_closed(&mut closed) => {
                Err(AdapterError::unavailable("publish connection closed"))
            }
            result = self.publish_once(channel, payload) => result,
        }
    }

    async fn close(&self) -> Result<(), ConnectionError> {
        if self.closed.send_replace(true) {
            return Err(ConnectionError::AlreadyClosed);
        }
        self.connection.lock().await.take();
        tracing::debug!("Publish connection closed");
        Ok(())
    }
}

async fn wait_closed(closed: &mut watch::Receiver<bool>) {
    let _ = closed.wait_for(|closed| *closed).await;
}

impl std::fmt::Debug for RedisPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisPublisher")
            .field("endpoint", &self.endpoint)
            .field("closed", &*self.closed.borrow())
            .finish_non_exhaustive()
    }
}
