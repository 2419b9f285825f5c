//! Channel-keyed handler registry shared by every adapter of a factory.
//!
//! The registry is the demultiplexer behind a shared subscribe connection:
//! a message arriving on channel C is delivered only to the handlers
//! registered for C. The memory backend uses the same registry keyed by
//! room id.
//!
//! # Thread Safety
//!
//! Uses a `std::sync::RwLock`: dispatch (reads) vastly outnumbers
//! subscribe/close (writes). Handler lists are cloned out of the lock before
//! any handler runs, so no lock is ever held across an `.await`.

use futures::FutureExt;
use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, PoisonError, RwLock};
use uuid::Uuid;

use crate::domain::RoomMessage;
use crate::ports::{MessageHandler, SubscriptionId};

/// Identity of one adapter instance within a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AdapterId(Uuid);

impl AdapterId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AdapterId {
    fn default() -> Self {
        Self::new()
    }
}

struct Registration {
    id: SubscriptionId,
    owner: AdapterId,
    handler: Arc<dyn MessageHandler>,
}

#[derive(Default)]
struct ChannelEntry {
    adapters: HashSet<AdapterId>,
    handlers: Vec<Registration>,
}

/// Handler registry keyed by channel (or room) name.
///
/// Adapters `attach` on construction and `detach` on close; the return
/// values tell the Redis adapter when the shared subscribe connection must
/// subscribe or unsubscribe the channel.
#[derive(Default)]
pub struct HandlerRegistry {
    channels: RwLock<HashMap<String, ChannelEntry>>,
}

impl HandlerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `adapter` as a user of `channel`.
    ///
    /// Returns `true` if it is the first adapter on that channel.
    pub fn attach(&self, channel: &str, adapter: AdapterId) -> bool {
        let mut channels = self.write();
        let entry = channels.entry(channel.to_string()).or_default();
        let first = entry.adapters.is_empty();
        entry.adapters.insert(adapter);
        first
    }

    /// Removes `adapter` and every handler it registered on `channel`.
    ///
    /// Returns `true` if the channel has no adapters left and was dropped.
    /// Detaching an unknown adapter is a no-op returning `false`.
    pub fn detach(&self, channel: &str, adapter: AdapterId) -> bool {
        let mut channels = self.write();
        let Some(entry) = channels.get_mut(channel) else {
            return false;
        };
        if !entry.adapters.remove(&adapter) {
            return false;
        }
        entry.handlers.retain(|r| r.owner != adapter);
        if entry.adapters.is_empty() {
            channels.remove(channel);
            return true;
        }
        false
    }

    /// Adds a handler owned by `adapter` on `channel`.
    ///
    /// Returns `None` if `adapter` is not attached to `channel`.
    pub fn add_handler(
        &self,
        channel: &str,
        adapter: AdapterId,
        handler: Arc<dyn MessageHandler>,
    ) -> Option<SubscriptionId> {
        let mut channels = self.write();
        let entry = channels.get_mut(channel)?;
        if !entry.adapters.contains(&adapter) {
            return None;
        }
        let id = SubscriptionId::new();
        entry.handlers.push(Registration {
            id,
            owner: adapter,
            handler,
        });
        Some(id)
    }

    /// Removes a handler, only if `adapter` owns it.
    pub fn remove_handler(&self, channel: &str, adapter: AdapterId, id: SubscriptionId) -> bool {
        let mut channels = self.write();
        let Some(entry) = channels.get_mut(channel) else {
            return false;
        };
        let before = entry.handlers.len();
        entry
            .handlers
            .retain(|r| !(r.id == id && r.owner == adapter));
        entry.handlers.len() != before
    }

    /// Snapshot of the handlers registered on `channel`, in registration order.
    pub fn handlers(&self, channel: &str) -> Vec<Arc<dyn MessageHandler>> {
        self.read()
            .get(channel)
            .map(|entry| entry.handlers.iter().map(|r| r.handler.clone()).collect())
            .unwrap_or_default()
    }

    /// Number of handlers on `channel` owned by `adapter`.
    pub fn handler_count(&self, channel: &str, adapter: AdapterId) -> usize {
        self.read()
            .get(channel)
            .map(|entry| entry.handlers.iter().filter(|r| r.owner == adapter).count())
            .unwrap_or(0)
    }

    /// Whether any adapter is attached to `channel`.
    pub fn contains(&self, channel: &str) -> bool {
        self.read().contains_key(channel)
    }

    /// Every channel with at least one attached adapter.
    pub fn channels(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Invokes every handler on `channel` with `message`.
    ///
    /// Each invocation is isolated: errors are logged, panics are caught, and
    /// the remaining handlers still run. Returns the number of handlers that
    /// completed successfully.
    pub async fn deliver(&self, channel: &str, message: &RoomMessage) -> usize {
        let handlers = self.handlers(channel);
        let mut delivered = 0;

        for handler in handlers {
            match AssertUnwindSafe(handler.handle(message)).catch_unwind().await {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(e)) => {
                    tracing::warn!(
                        channel,
                        handler = handler.name(),
                        message_id = %message.id,
                        error = %e,
                        "Room message handler failed"
                    );
                }
                Err(panic) => {
                    tracing::error!(
                        channel,
                        handler = handler.name(),
                        message_id = %message.id,
                        panic = panic_message(panic.as_ref()),
                        "Room message handler panicked"
                    );
                }
            }
        }

        delivered
    }

    /// Decodes a raw pub/sub payload and delivers it on `channel`.
    ///
    /// Undecodable payloads are logged and dropped.
    pub async fn dispatch(&self, channel: &str, payload: &[u8]) -> usize {
        match RoomMessage::decode(payload) {
            Ok(message) => self.deliver(channel, &message).await,
            Err(e) => {
                tracing::warn!(channel, error = %e, "Dropping undecodable room message");
                0
            }
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, ChannelEntry>> {
        self.channels.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, ChannelEntry>> {
        self.channels.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("channels", &self.channels())
            .finish()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}
