//! Adapters - Implementations of port interfaces.
//!
//! - `memory` - Single-process room adapter
//! - `redis` - Redis pub/sub room adapter and its connections
//! - `loopback` - In-process broker standing in for Redis
//! - `factory` - Backend selection and connection lifecycle

mod connection_pair;
mod factory;
mod loopback;
mod memory;
pub mod redis;
mod registry;

pub use connection_pair::SharedConnectionPair;
pub use factory::{AdapterFactory, BackendKind, RoomConstructor};
pub use loopback::LoopbackBroker;
pub use memory::MemoryAdapter;
pub use redis::RedisAdapter;
pub use registry::{AdapterId, HandlerRegistry};
