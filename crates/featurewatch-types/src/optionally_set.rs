//! "Optionally set" field marker.
//!
//! A `Feature` field is only eligible for diffing when it was *present* in
//! the OLD snapshot — a field absent in OLD must never produce a spurious
//! modification just because NEW happens to carry a value (schema
//! expansion safety). `OptionallySet<T>` gives that invariant its own named
//! type rather than leaving "was this field set" as an implicit convention
//! on `Option<Option<T>>`, the same way [`crate::Sensitive`] gives
//! "must be redacted" its own type instead of a doc comment on a `String`.

use serde::{Deserialize, Serialize};

/// Wrapper distinguishing "field absent from the source snapshot" from
/// "field present with this value."
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OptionallySet<T>(Option<T>);

impl<T> OptionallySet<T> {
    /// Mark the field as present with the given value.
    pub fn set(value: T) -> Self {
        Self(Some(value))
    }

    /// Mark the field as absent from the source snapshot.
    pub fn unset() -> Self {
        Self(None)
    }

    /// True if the field was present in the source snapshot.
    pub fn is_set(&self) -> bool {
        self.0.is_some()
    }

    /// Borrow the value, if the field was set.
    pub fn get(&self) -> Option<&T> {
        self.0.as_ref()
    }

    /// Consume the wrapper, returning the value if it was set.
    pub fn into_inner(self) -> Option<T> {
        self.0
    }
}

impl<T> Default for OptionallySet<T> {
    fn default() -> Self {
        Self::unset()
    }
}

impl<T> From<Option<T>> for OptionallySet<T> {
    fn from(value: Option<T>) -> Self {
        Self(value)
    }
}
