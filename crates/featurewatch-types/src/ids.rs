//! Domain identifier newtypes.
//!
//! Each identifier wraps a `String` rather than leaving raw `String`s to
//! flow between layers, the same way `correlation::RequestId` gives the
//! request-tracking value its own type instead of passing a bare string.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! string_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Wrap an existing string value.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Borrow the string representation.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the id and return the inner string.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

string_id!(SearchId, "Stable identifier of a saved search.");
string_id!(FeatureId, "Stable identifier of a web-platform feature.");
string_id!(
    EventId,
    "Identifier of a FeatureDiffEvent. Equal to the transport's triggerID for the run that produced it."
);
string_id!(
    StateId,
    "Content-addressed digest of a persisted Snapshot blob."
);
string_id!(DiffId, "Content-addressed digest of a persisted Diff blob.");
string_id!(
    WorkerId,
    "Identifier of the process/task instance holding an advisory lock."
);

impl StateId {
    /// Build a StateId from a computed content digest (hex SHA-256).
    pub fn from_digest(digest: impl Into<String>) -> Self {
        Self::new(digest)
    }
}

impl DiffId {
    /// Build a DiffId from a computed content digest (hex SHA-256).
    pub fn from_digest(digest: impl Into<String>) -> Self {
        Self::new(digest)
    }
}

impl WorkerId {
    /// Generate a fresh WorkerId (UUIDv7) for a process/task instance that
    /// has no externally supplied triggerID to reuse (e.g. the dispatcher).
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_id_ordering() {
        let mut ids = vec![FeatureId::new("b"), FeatureId::new("a"), FeatureId::new("c")];
        ids.sort();
        assert_eq!(
            ids,
            vec![FeatureId::new("a"), FeatureId::new("b"), FeatureId::new("c")]
        );
    }

    #[test]
    fn test_display_roundtrip() {
        let id = SearchId::new("search-123");
        assert_eq!(format!("{}", id), "search-123");
    }

    #[test]
    fn test_worker_id_generate_unique() {
        let a = WorkerId::generate();
        let b = WorkerId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn test_serde_roundtrip() {
        let id = EventId::new("trigger-abc");
        let json = serde_json::to_string(&id).unwrap();
        let back: EventId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }
}
