//! Domain layer containing the backplane's core types.
//!
//! # Module Organization
//!
//! - `room` - Room identifiers and their pub/sub channel names
//! - `message` - The payload broadcast to a room
//! - `errors` - Adapter, connection and close errors

mod errors;
mod message;
mod room;

pub use errors::{AdapterError, CloseError, CloseFailure, ConnectionError, ConnectionRole};
pub use message::{MessageId, RoomMessage};
pub use room::{RoomChannelName, RoomId, CHANNEL_SEPARATOR};
