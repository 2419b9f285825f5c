//! In-process pub/sub broker for tests and local development.
//!
//! `LoopbackBroker` stands in for a Redis server: each call to
//! [`LoopbackBroker::connect`] yields a fresh [`SharedConnectionPair`], as
//! if a separate process had connected. Published messages are delivered
//! synchronously to every open subscribe connection holding the channel.
//!
//! Failures can be injected for publishing (`set_available(false)`) and for
//! closing (`fail_closes(true)`).

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::domain::{AdapterError, ConnectionError};
use crate::ports::{PublishConnection, SubscribeConnection};

use super::registry::HandlerRegistry;
use super::SharedConnectionPair;

/// In-process broker shared by any number of connection pairs.
#[derive(Clone, Default)]
pub struct LoopbackBroker {
    state: Arc<BrokerState>,
}

#[derive(Default)]
struct BrokerState {
    unavailable: AtomicBool,
    fail_closes: AtomicBool,
    published: AtomicUsize,
    endpoints: Mutex<Vec<Arc<SubscriberEndpoint>>>,
}

struct SubscriberEndpoint {
    registry: Arc<HandlerRegistry>,
    channels: Mutex<HashSet<String>>,
    closed: AtomicBool,
}

impl SubscriberEndpoint {
    fn is_subscribed(&self, channel: &str) -> bool {
        !self.closed.load(Ordering::SeqCst)
            && self
                .channels
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .contains(channel)
    }
}

impl LoopbackBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a new connection pair against this broker.
    pub fn connect(&self) -> SharedConnectionPair {
        let registry = Arc::new(HandlerRegistry::new());
        let endpoint = Arc::new(SubscriberEndpoint {
            registry: registry.clone(),
            channels: Mutex::new(HashSet::new()),
            closed: AtomicBool::new(false),
        });
        self.state
            .endpoints
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(endpoint.clone());

        let publisher = Arc::new(LoopbackPublisher {
            broker: self.state.clone(),
            closed: AtomicBool::new(false),
        });
        let subscriber = Arc::new(LoopbackSubscriber {
            broker: self.state.clone(),
            endpoint,
        });
        SharedConnectionPair::new(publisher, subscriber, registry)
    }

    /// When `false`, every publish fails with `BackendUnavailable`.
    pub fn set_available(&self, available: bool) {
        self.state.unavailable.store(!available, Ordering::SeqCst);
    }

    /// When `true`, closing any connection fails with a backend error.
    pub fn fail_closes(&self, fail: bool) {
        self.state.fail_closes.store(fail, Ordering::SeqCst);
    }

    /// Number of open subscribe connections holding `channel`.
    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.state
            .endpoints
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|endpoint| endpoint.is_subscribed(channel))
            .count()
    }

    /// Number of messages accepted for publishing so far.
    pub fn published_count(&self) -> usize {
        self.state.published.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for LoopbackBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoopbackBroker")
            .field("published", &self.published_count())
            .finish_non_exhaustive()
    }
}

fn check_close(broker: &BrokerState, closed: &AtomicBool) -> Result<(), ConnectionError> {
    if closed.swap(true, Ordering::SeqCst) {
        return Err(ConnectionError::AlreadyClosed);
    }
    if broker.fail_closes.load(Ordering::SeqCst) {
        return Err(ConnectionError::Backend("injected close failure".to_string()));
    }
    Ok(())
}

struct LoopbackPublisher {
    broker: Arc<BrokerState>,
    closed: AtomicBool,
}

#[async_trait]
impl PublishConnection for LoopbackPublisher {
    async fn publish(&self, channel: &str, payload: Vec<u8>) -> Result<(), AdapterError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(AdapterError::unavailable("publish connection closed"));
        }
        if self.broker.unavailable.load(Ordering::SeqCst) {
            return Err(AdapterError::unavailable("broker unavailable"));
        }
        self.broker.published.fetch_add(1, Ordering::SeqCst);

        let targets: Vec<Arc<HandlerRegistry>> = self
            .broker
            .endpoints
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|endpoint| endpoint.is_subscribed(channel))
            .map(|endpoint| endpoint.registry.clone())
            .collect();

        for registry in targets {
            registry.dispatch(channel, &payload).await;
        }
        Ok(())
    }

    async fn close(&self) -> Result<(), ConnectionError> {
        check_close(&self.broker, &self.closed)
    }
}

struct LoopbackSubscriber {
    broker: Arc<BrokerState>,
    endpoint: Arc<SubscriberEndpoint>,
}

impl LoopbackSubscriber {
    fn channels(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        self.endpoint
            .channels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl SubscribeConnection for LoopbackSubscriber {
    fn subscribe(&self, channel: &str) {
        if !self.endpoint.closed.load(Ordering::SeqCst) {
            self.channels().insert(channel.to_string());
        }
    }

    fn unsubscribe(&self, channel: &str) {
        self.channels().remove(channel);
    }

    async fn close(&self) -> Result<(), ConnectionError> {
        check_close(&self.broker, &self.endpoint.closed)?;
        self.channels().clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RoomMessage;
    use crate::ports::handler_fn;
    use serde_json::json;

    #[tokio::test]
    async fn publish_reaches_other_pairs() {
        let broker = LoopbackBroker::new();
        let sender = broker.connect();
        let receiver = broker.connect();
        let adapter = crate::adapters::registry::AdapterId::new();
        receiver.registry().attach("sio#lobby", adapter);
        receiver.subscribe("sio#lobby");

        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        receiver.registry().add_handler(
            "sio#lobby",
            adapter,
            handler_fn("count", move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
        );

        let payload = RoomMessage::new("signal", json!(1)).encode().unwrap();
        sender.publish("sio#lobby", payload).await.unwrap();

        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert_eq!(broker.published_count(), 1);
    }

    #[tokio::test]
    async fn unavailable_broker_rejects_publish() {
        let broker = LoopbackBroker::new();
        let pair = broker.connect();
        broker.set_available(false);

        let err = pair.publish("sio#lobby", Vec::new()).await.unwrap_err();

        assert!(err.is_unavailable());
        assert_eq!(broker.published_count(), 0);
    }

    #[tokio::test]
    async fn closed_subscriber_drops_channels() {
        let broker = LoopbackBroker::new();
        let pair = broker.connect();
        pair.subscribe("sio#lobby");
        assert_eq!(broker.subscriber_count("sio#lobby"), 1);

        pair.close().await.unwrap();

        assert_eq!(broker.subscriber_count("sio#lobby"), 0);
        pair.subscribe("sio#lobby");
        assert_eq!(broker.subscriber_count("sio#lobby"), 0);
    }

    #[tokio::test]
    async fn injected_close_failure_reports_both_roles() {
        let broker = LoopbackBroker::new();
        let pair = broker.connect();
        broker.fail_closes(true);

        let err = pair.close().await.unwrap_err();

        assert_eq!(err.failures().len(), 2);
    }
}
