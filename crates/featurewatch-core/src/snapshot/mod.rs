//! Snapshot envelope: an immutable, content-addressed record of a saved
//! search's matched feature set at a point in time.
//!
//! ## Responsibilities
//!
//! - Define the `Snapshot` schema diffed by `diff::engine`.
//!
//! ## Non-Responsibilities
//!
//! - Content-addressed persistence and digest computation (`featurewatch-store::cas`).
//! - Orchestration (`featurewatch-engine`).

use crate::model::Feature;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Current envelope schema version understood by this crate.
pub const CURRENT_API_VERSION: u32 = 1;

/// A versioned, immutable snapshot of a saved search's matched features.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Snapshot {
    /// Envelope schema version; the migrator chain in `featurewatch-store`
    /// brings older snapshots forward to [`CURRENT_API_VERSION`] before
    /// this type is ever constructed.
    pub api_version: u32,
    pub metadata: SnapshotMetadata,
    /// Matched features, keyed by id for uniqueness and deterministic iteration.
    pub data: BTreeMap<String, Feature>,
}

/// Identity and provenance metadata for a [`Snapshot`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SnapshotMetadata {
    /// Content-addressed id of this snapshot (the stateID).
    pub id: String,
    /// The event that produced this snapshot.
    pub event_id: String,
    /// The saved search this snapshot belongs to.
    pub search_id: String,
    /// Digest of the saved-search query text at capture time, used to
    /// detect `QUERY_CHANGED` between runs.
    pub query_signature: String,
    pub generated_at: chrono::DateTime<chrono::Utc>,
}

impl Snapshot {
    /// Construct a new snapshot at the current schema version.
    pub fn new(metadata: SnapshotMetadata, data: BTreeMap<String, Feature>) -> Self {
        Self {
            api_version: CURRENT_API_VERSION,
            metadata,
            data,
        }
    }
}
