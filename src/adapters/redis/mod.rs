//! Redis pub/sub backend.
//!
//! - `RedisAdapter` - per-room adapter publishing on `<prefix>#<room>`
//! - `RedisPublisher` - shared publish-only connection
//! - `RedisSubscriber` - shared subscribe-only connection and dispatch loop
//! - `ConnectionOptions` - standalone or Sentinel failover target

mod adapter;
mod options;
mod publisher;
mod subscriber;

pub use adapter::RedisAdapter;
pub use options::{join_host_port, ConnectionOptions, FailoverOptions};
pub use publisher::RedisPublisher;
pub use subscriber::{RedisSubscriber, CONNECT_TIMEOUT, RECONNECT_DELAY};
