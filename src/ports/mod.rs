//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Room Ports
//!
//! - `Adapter` - Room-scoped broadcast and subscription
//! - `MessageHandler` - Callback receiving messages delivered to a room
//!
//! ## Connection Ports
//!
//! - `PublishConnection` - Publish side of a shared connection pair
//! - `SubscribeConnection` - Subscribe side of a shared connection pair

mod adapter;
mod connection;
mod message_handler;

pub use adapter::Adapter;
pub use connection::{PublishConnection, SubscribeConnection};
pub use message_handler::{handler_fn, FnHandler, HandlerError, MessageHandler, SubscriptionId};
