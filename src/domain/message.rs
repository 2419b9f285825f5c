//! Broadcast envelope exchanged between instances.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::AdapterError;

/// Unique identifier of a broadcast message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(Uuid);

impl MessageId {
    /// Creates a new random MessageId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a MessageId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MessageId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// A message broadcast to every subscriber of a room.
///
/// The payload is opaque to the backplane; the event name lets handlers
/// route without inspecting it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomMessage {
    /// Unique id, stable across instances.
    pub id: MessageId,

    /// Application event name (e.g. `"signal"`, `"users"`).
    pub event: String,

    /// Application payload.
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl RoomMessage {
    /// Creates a message with a fresh id.
    pub fn new(event: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            id: MessageId::new(),
            event: event.into(),
            payload,
        }
    }

    /// Encodes the message for the pub/sub wire.
    pub fn encode(&self) -> Result<Vec<u8>, AdapterError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decodes a message received from the pub/sub wire.
    pub fn decode(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}
