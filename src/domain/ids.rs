//! Type-safe identifiers for devices, users, and browser sessions.
//!
//! [`DeviceId`] and [`UserId`] are newtype wrappers around the opaque
//! string identifiers supplied at connect time. [`SessionId`] is a
//! server-generated UUID v4 distinguishing concurrent browser tabs of
//! the same user.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Unique identifier for a mobile device.
///
/// Supplied by the device itself via the `deviceId` query parameter on
/// the WebSocket handshake. Used as the dictionary key in
/// [`super::DeviceRegistry`] and as the routing target for commands.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    /// Creates a `DeviceId` from any string-like value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for DeviceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for DeviceId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Unique identifier for a user, resolved by the upstream gateway.
///
/// Carried on every trusted `X-User-Name` header; the relay never
/// authenticates it. Keys the fan-out sets in
/// [`super::UserSessionRegistry`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Creates a `UserId` from any string-like value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for UserId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Unique identifier for one browser session (one open tab).
///
/// Wraps a UUID v4. Generated server-side when the session connects;
/// a user with several tabs open holds several `SessionId`s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(uuid::Uuid);

impl SessionId {
    /// Creates a new random `SessionId` (UUID v4).
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Returns the inner [`uuid::Uuid`].
    #[must_use]
    pub const fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn device_id_round_trips_as_string() {
        let id = DeviceId::new("D-42");
        assert_eq!(id.as_str(), "D-42");
        assert_eq!(format!("{id}"), "D-42");
    }

    #[test]
    fn user_id_hash_works_in_hashmap() {
        use std::collections::HashMap;
        let id = UserId::new("alice");
        let mut map = HashMap::new();
        map.insert(id.clone(), 1);
        assert_eq!(map.get(&id), Some(&1));
    }

    #[test]
    fn session_ids_are_unique() {
        assert_ne!(SessionId::new(), SessionId::new());
    }

    #[test]
    fn device_id_serde_is_transparent() {
        let id = DeviceId::new("D-1");
        let json = serde_json::to_string(&id).unwrap_or_default();
        assert_eq!(json, "\"D-1\"");
    }
}
