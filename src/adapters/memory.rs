//! In-process adapter for single-instance deployments.
//!
//! Broadcast is a direct fan-out to the handlers registered for the room in
//! this process. No network, no serialization.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::domain::{AdapterError, RoomId, RoomMessage};
use crate::ports::{Adapter, MessageHandler, SubscriptionId};

use super::registry::{AdapterId, HandlerRegistry};

/// Room adapter delivering messages within the current process.
///
/// Features:
/// - Sequential delivery on the broadcaster's task (deterministic)
/// - Per-handler isolation: a failing or panicking handler is logged and
///   skipped
/// - Adapters created by the same factory for the same room share their
///   handlers through the registry
///
/// # Example
///
/// ```ignore
/// let adapter = MemoryAdapter::standalone("lobby");
/// adapter.subscribe(handler);
/// adapter.broadcast(RoomMessage::new("ready", payload)).await?;
/// ```
pub struct MemoryAdapter {
    id: AdapterId,
    room: RoomId,
    registry: Arc<HandlerRegistry>,
    closed: AtomicBool,
}

impl MemoryAdapter {
    /// Creates an adapter for `room` backed by a shared registry.
    pub fn new(registry: Arc<HandlerRegistry>, room: impl Into<RoomId>) -> Self {
        let room = room.into();
        let id = AdapterId::new();
        registry.attach(room.as_str(), id);
        Self {
            id,
            room,
            registry,
            closed: AtomicBool::new(false),
        }
    }

    /// Creates an adapter with its own private registry.
    pub fn standalone(room: impl Into<RoomId>) -> Self {
        Self::new(Arc::new(HandlerRegistry::new()), room)
    }

    /// Whether `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Adapter for MemoryAdapter {
    fn room(&self) -> &RoomId {
        &self.room
    }

    fn channel(&self) -> Option<&str> {
        None
    }

    async fn broadcast(&self, message: RoomMessage) -> Result<(), AdapterError> {
        let delivered = self.registry.deliver(self.room.as_str(), &message).await;
        tracing::trace!(
            room = %self.room,
            message_id = %message.id,
            delivered,
            "Broadcast delivered in memory"
        );
        Ok(())
    }

    fn subscribe(&self, handler: Arc<dyn MessageHandler>) -> Option<SubscriptionId> {
        self.registry.add_handler(self.room.as_str(), self.id, handler)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.registry.remove_handler(self.room.as_str(), self.id, id)
    }

    fn handler_count(&self) -> usize {
        self.registry.handler_count(self.room.as_str(), self.id)
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.registry.detach(self.room.as_str(), self.id);
        tracing::debug!(room = %self.room, "Closed memory adapter");
    }
}

impl std::fmt::Debug for MemoryAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryAdapter")
            .field("room", &self.room)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}
