//! Room identity and channel naming.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator between the configured prefix and the room identifier.
///
/// Part of the wire contract: independently built instances must agree on it
/// to exchange messages over the same Redis server.
pub const CHANNEL_SEPARATOR: char = '#';

/// Identifier of a room hosted by the surrounding system.
///
/// Opaque to the backplane; any string is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    /// Creates a room identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for RoomId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RoomId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for RoomId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Pub/sub channel carrying one room's traffic: `<prefix>#<room>`.
///
/// Computing it has no side effects, so it can be derived repeatedly and
/// compared.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoomChannelName(String);

impl RoomChannelName {
    /// Derives the channel name for `room` under `prefix`.
    pub fn new(prefix: &str, room: &RoomId) -> Self {
        let mut name = String::with_capacity(prefix.len() + 1 + room.as_str().len());
        name.push_str(prefix);
        name.push(CHANNEL_SEPARATOR);
        name.push_str(room.as_str());
        Self(name)
    }

    /// Returns the channel name as sent to the backend.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomChannelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RoomChannelName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn channel_name_joins_prefix_and_room() {
        let channel = RoomChannelName::new("sio", &RoomId::new("lobby"));
        assert_eq!(channel.as_str(), "sio#lobby");
    }

    #[test]
    fn channel_name_with_empty_prefix() {
        let channel = RoomChannelName::new("", &RoomId::new("lobby"));
        assert_eq!(channel.as_str(), "#lobby");
    }

    #[test]
    fn channel_name_is_deterministic() {
        let room = RoomId::new("room-1");
        assert_eq!(
            RoomChannelName::new("app", &room),
            RoomChannelName::new("app", &room)
        );
    }

    #[test]
    fn room_id_displays_raw_value() {
        assert_eq!(RoomId::from("a b").to_string(), "a b");
    }

    proptest! {
        #[test]
        fn distinct_rooms_never_share_a_channel(
            prefix in ".{0,12}",
            r1 in ".{0,24}",
            r2 in ".{0,24}",
        ) {
            prop_assume!(r1 != r2);
            let c1 = RoomChannelName::new(&prefix, &RoomId::new(r1));
            let c2 = RoomChannelName::new(&prefix, &RoomId::new(r2));
            prop_assert_ne!(c1, c2);
        }

        #[test]
        fn channel_name_ends_with_room(prefix in "[a-z]{0,8}", room in ".{0,24}") {
            let channel = RoomChannelName::new(&prefix, &RoomId::new(room.clone()));
            let expected_suffix = format!("#{}", room);
            prop_assert!(channel.as_str().ends_with(&expected_suffix));
        }
    }
}
