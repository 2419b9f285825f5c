//! Adapter port - the per-room broadcast capability.
//!
//! The surrounding connection-handling code depends only on this trait. It
//! never knows whether messages travel through process memory or through a
//! shared Redis server.

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::{AdapterError, RoomId, RoomMessage};

use super::{MessageHandler, SubscriptionId};

/// Broadcast/subscribe capability scoped to a single room.
///
/// Implementations must ensure:
/// - Handlers registered on a room receive every message broadcast on that
///   room, and nothing broadcast on other rooms
/// - A failing handler never prevents delivery to the others
/// - `close` is idempotent and never releases connections shared with
///   sibling adapters
///
/// # Example
///
/// ```ignore
/// let adapter = factory.new_adapter("lobby".into());
/// let id = adapter.subscribe(handler).expect("adapter open");
/// adapter.broadcast(RoomMessage::new("ready", payload)).await?;
/// adapter.unsubscribe(id);
/// adapter.close();
/// ```
#[async_trait]
pub trait Adapter: Send + Sync {
    /// The room this adapter serves.
    fn room(&self) -> &RoomId;

    /// Backend topic carrying this room's traffic, if the backend uses one.
    fn channel(&self) -> Option<&str>;

    /// Deliver `message` to every current subscriber of the room.
    ///
    /// For network backends success means the broker accepted the message,
    /// not that remote subscribers processed it.
    async fn broadcast(&self, message: RoomMessage) -> Result<(), AdapterError>;

    /// Attach a local delivery callback. Registrations are additive.
    ///
    /// Returns `None` once the adapter has been closed.
    fn subscribe(&self, handler: Arc<dyn MessageHandler>) -> Option<SubscriptionId>;

    /// Detach a callback registered through this adapter.
    ///
    /// Returns `false` if it was not (or no longer) registered.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;

    /// Number of callbacks currently registered through this adapter.
    fn handler_count(&self) -> usize;

    /// Release room-local state. Safe to call more than once.
    fn close(&self);
}
