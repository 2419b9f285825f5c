//! MessageHandler port - local delivery callbacks for room messages.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::RoomMessage;

/// Error reported by a handler. Logged by the dispatcher, never propagated
/// to the broadcaster.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct HandlerError(String);

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Handler invoked for every message delivered to a room.
///
/// Implementations should be:
/// - **Quick** - the dispatch task delivers messages one at a time
/// - **Self-contained** - errors are logged and otherwise ignored
///
/// # Example
///
/// ```ignore
/// struct ClientWriter { /* ... */ }
///
/// #[async_trait]
/// impl MessageHandler for ClientWriter {
///     async fn handle(&self, message: &RoomMessage) -> Result<(), HandlerError> {
///         self.socket.send(message).await.map_err(|e| HandlerError::new(e.to_string()))
///     }
///
///     fn name(&self) -> &str {
///         "ClientWriter"
///     }
/// }
/// ```
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Process one message.
    async fn handle(&self, message: &RoomMessage) -> Result<(), HandlerError>;

    /// Handler name for logging.
    fn name(&self) -> &str;
}

/// Handle returned by `Adapter::subscribe`, used to detach the handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Wraps a synchronous closure as a [`MessageHandler`].
pub struct FnHandler<F> {
    name: String,
    f: F,
}

#[async_trait]
impl<F> MessageHandler for FnHandler<F>
where
    F: Fn(&RoomMessage) -> Result<(), HandlerError> + Send + Sync,
{
    async fn handle(&self, message: &RoomMessage) -> Result<(), HandlerError> {
        (self.f)(message)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Builds a shared handler from a closure.
///
/// ```ignore
/// adapter.subscribe(handler_fn("audit", |msg| {
///     tracing::info!(event = %msg.event, "seen");
///     Ok(())
/// }));
/// ```
pub fn handler_fn<F>(name: impl Into<String>, f: F) -> Arc<dyn MessageHandler>
where
    F: Fn(&RoomMessage) -> Result<(), HandlerError> + Send + Sync + 'static,
{
    Arc::new(FnHandler {
        name: name.into(),
        f,
    })
}
