//! Strongly-typed identifiers.
//!
//! Each identifier type is a thin wrapper around a UUID with a phantom type
//! parameter, so a subscription handle can never be passed where a session
//! identifier is expected.
//!
//! # Examples
//!
//! ```
//! use warden_core::id::{SessionId, SubscriptionId};
//! use std::str::FromStr;
//!
//! let session = SessionId::new();
//! let subscription = SubscriptionId::new();
//! assert_ne!(session.to_string(), subscription.to_string());
//!
//! let id_str = "550e8400-e29b-41d4-a716-446655440000";
//! let session = SessionId::from_str(id_str).unwrap();
//! assert_eq!(session.to_string(), id_str);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;
use uuid::Uuid;

/// A type-safe identifier based on UUID.
#[derive(Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id<T> {
    uuid: Uuid,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T> Id<T> {
    /// Create a new random identifier.
    pub fn new() -> Self {
        Self::from_uuid(Uuid::new_v4())
    }

    /// Create an identifier from a specific UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self {
            uuid,
            _marker: PhantomData,
        }
    }

    /// Get the underlying UUID.
    pub fn uuid(&self) -> Uuid {
        self.uuid
    }
}

// Manual impls so the marker type does not need to implement these traits.
impl<T> Clone for Id<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Id<T> {}

impl<T> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.uuid == other.uuid
    }
}

impl<T> Eq for Id<T> {}

impl<T> std::hash::Hash for Id<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.uuid.hash(state);
    }
}

impl<T> Default for Id<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.uuid)
    }
}

impl<T> FromStr for Id<T> {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_uuid(Uuid::parse_str(s)?))
    }
}

/// Marker type for coordinator sessions.
#[derive(Debug)]
pub struct SessionMarker;
/// Identifier for a coordinator session.
pub type SessionId = Id<SessionMarker>;

/// Marker type for observation bus subscriptions.
#[derive(Debug)]
pub struct SubscriptionMarker;
/// Handle returned by a bus subscription.
pub type SubscriptionId = Id<SubscriptionMarker>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_ids_are_unique() {
        let ids: HashSet<SessionId> = (0..100).map(|_| SessionId::new()).collect();
        assert_eq!(ids.len(), 100);
    }

    #[test]
    fn test_serializes_as_plain_uuid() {
        let uuid = Uuid::new_v4();
        let id = SubscriptionId::from_uuid(uuid);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", uuid));

        let back: SubscriptionId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(SessionId::from_str("not-a-uuid").is_err());
    }
}
