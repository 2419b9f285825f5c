//! Redis-backed room adapter for multi-instance deployments.
//!
//! Every room of a process shares the same two connections. Each adapter
//! publishes on `<prefix>#<room>` and receives through the shared
//! subscribe connection, which demultiplexes by exact channel name.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::adapters::registry::AdapterId;
use crate::adapters::SharedConnectionPair;
use crate::domain::{AdapterError, RoomChannelName, RoomId, RoomMessage};
use crate::ports::{Adapter, MessageHandler, SubscriptionId};

/// Room adapter relaying through a shared Redis connection pair.
///
/// The channel is subscribed when the first adapter for it is created and
/// unsubscribed when the last one is closed, so closing one adapter never
/// cuts off a sibling serving the same room.
pub struct RedisAdapter {
    id: AdapterId,
    room: RoomId,
    channel: RoomChannelName,
    connections: Arc<SharedConnectionPair>,
    closed: AtomicBool,
}

impl RedisAdapter {
    /// Creates an adapter for `room` and subscribes its channel.
    pub fn new(
        connections: Arc<SharedConnectionPair>,
        prefix: &str,
        room: impl Into<RoomId>,
    ) -> Self {
        let room = room.into();
        let channel = RoomChannelName::new(prefix, &room);
        let id = AdapterId::new();

        if connections.registry().attach(channel.as_str(), id) {
            connections.subscribe(channel.as_str());
        }
        tracing::debug!(%room, %channel, "Created redis adapter");

        Self {
            id,
            room,
            channel,
            connections,
            closed: AtomicBool::new(false),
        }
    }

    /// The channel this room's traffic travels on.
    pub fn channel_name(&self) -> &RoomChannelName {
        &self.channel
    }

    /// Whether `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Adapter for RedisAdapter {
    fn room(&self) -> &RoomId {
        &self.room
    }

    fn channel(&self) -> Option<&str> {
        Some(self.channel.as_str())
    }

    async fn broadcast(&self, message: RoomMessage) -> Result<(), AdapterError> {
        let payload = message.encode()?;
        self.connections
            .publish(self.channel.as_str(), payload)
            .await
            .map_err(|e| {
                tracing::warn!(
                    room = %self.room,
                    channel = %self.channel,
                    message_id = %message.id,
                    error = %e,
                    "Broadcast failed"
                );
                e
            })
    }

    fn subscribe(&self, handler: Arc<dyn MessageHandler>) -> Option<SubscriptionId> {
        self.connections
            .registry()
            .add_handler(self.channel.as_str(), self.id, handler)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.connections
            .registry()
            .remove_handler(self.channel.as_str(), self.id, id)
    }

    fn handler_count(&self) -> usize {
        self.connections
            .registry()
            .handler_count(self.channel.as_str(), self.id)
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if self
            .connections
            .registry()
            .detach(self.channel.as_str(), self.id)
        {
            self.connections.unsubscribe(self.channel.as_str());
        }
        tracing::debug!(room = %self.room, channel = %self.channel, "Closed redis adapter");
    }
}

impl std::fmt::Debug for RedisAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisAdapter")
            .field("room", &self.room)
            .field("channel", &self.channel)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::LoopbackBroker;
    use crate::ports::handler_fn;
    use serde_json::json;
    use std::sync::Mutex;

    fn recording(log: &Arc<Mutex<Vec<String>>>) -> Arc<dyn MessageHandler> {
        let log = log.clone();
        handler_fn("recording", move |msg| {
            log.lock().unwrap().push(msg.event.clone());
            Ok(())
        })
    }

    #[tokio::test]
    async fn channel_name_uses_prefix() {
        let broker = LoopbackBroker::new();
        let adapter = RedisAdapter::new(Arc::new(broker.connect()), "sio", "lobby");
        assert_eq!(adapter.channel(), Some("sio#lobby"));
        assert_eq!(adapter.channel_name().as_str(), "sio#lobby");
    }

    #[tokio::test]
    async fn broadcast_round_trips_through_broker() {
        let broker = LoopbackBroker::new();
        let adapter = RedisAdapter::new(Arc::new(broker.connect()), "sio", "lobby");
        let log = Arc::new(Mutex::new(Vec::new()));
        adapter.subscribe(recording(&log));

        adapter
            .broadcast(RoomMessage::new("signal", json!({"userId": "u1"})))
            .await
            .unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["signal".to_string()]);
    }

    #[tokio::test]
    async fn channel_subscribed_once_per_room() {
        let broker = LoopbackBroker::new();
        let pair = Arc::new(broker.connect());
        let first = RedisAdapter::new(pair.clone(), "sio", "lobby");
        let second = RedisAdapter::new(pair, "sio", "lobby");

        assert_eq!(broker.subscriber_count("sio#lobby"), 1);

        first.close();
        assert_eq!(broker.subscriber_count("sio#lobby"), 1);
        second.close();
        assert_eq!(broker.subscriber_count("sio#lobby"), 0);
    }

    #[tokio::test]
    async fn broadcast_fails_when_backend_unavailable() {
        let broker = LoopbackBroker::new();
        let adapter = RedisAdapter::new(Arc::new(broker.connect()), "sio", "lobby");
        broker.set_available(false);

        let err = adapter
            .broadcast(RoomMessage::new("signal", json!(null)))
            .await
            .unwrap_err();

        assert!(err.is_unavailable());
    }
}
