//! Diff output types.
//!
//! All types implement `Debug, Clone, Serialize, Deserialize, PartialEq`.
//! Lists are always produced pre-sorted (by `id` ascending, unless noted)
//! so that two runs over the same inputs serialize byte-identically.

use crate::model::{BaselineStatus, Browser, BrowserImpl, MdnDoc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Current diff schema version produced by this engine.
pub const CURRENT_API_VERSION: u32 = 1;

/// A generic before/after pair, used for every field-level change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Change<T> {
    pub from: T,
    pub to: T,
}

impl<T> Change<T> {
    pub fn new(from: T, to: T) -> Self {
        Self { from, to }
    }
}

/// The top-level structured diff between two snapshots of one saved search.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Diff {
    /// Envelope schema version (always [`CURRENT_API_VERSION`] for output
    /// produced by this engine).
    pub api_version: u32,
    /// Features newly matched by the query.
    pub added: Vec<FeatureAdded>,
    /// Features that fell out of the matched set. `reason` starts as
    /// `Unmatched`; the reconciler may upgrade it to `Deleted` or remove
    /// the entry entirely (folding it into `moves`/`splits`).
    pub removed: Vec<FeatureRemoved>,
    /// Features present in both snapshots with at least one changed field.
    pub modified: Vec<FeatureModified>,
    /// Single-target renames reconciled from a removed/added pair.
    pub moves: Vec<FeatureMoved>,
    /// One-to-many reclassifications reconciled from a removed id whose
    /// catalog entry names several successor ids, all of which appear in
    /// `added`.
    pub splits: Vec<FeatureSplit>,
    /// True when the saved-search query text changed since the prior snapshot.
    pub query_changed: bool,
}

impl Diff {
    /// An empty diff with `query_changed` false, used as the identity value
    /// before populating comparison results.
    pub fn empty() -> Self {
        Self {
            api_version: CURRENT_API_VERSION,
            added: Vec::new(),
            removed: Vec::new(),
            modified: Vec::new(),
            moves: Vec::new(),
            splits: Vec::new(),
            query_changed: false,
        }
    }

    /// True iff at least one of added/removed/modified/moves/splits is
    /// non-empty, or the query changed — the basis for reasons closure.
    pub fn has_changes(&self) -> bool {
        !self.added.is_empty()
            || !self.removed.is_empty()
            || !self.modified.is_empty()
            || !self.moves.is_empty()
            || !self.splits.is_empty()
            || self.query_changed
    }
}

/// Reason a feature entered `added`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum AddedReason {
    NewMatch,
}

/// A newly matched feature.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureAdded {
    pub id: String,
    pub name: Option<String>,
    pub reason: AddedReason,
    pub docs: Option<crate::model::Docs>,
}

/// Reason a feature entered `removed`. Starts as `Unmatched`; the
/// reconciler may rewrite it to `Deleted`, or remove the entry if it folds
/// into a move or split.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum RemovedReason {
    Unmatched,
    Deleted,
}

/// A feature that fell out of the matched set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureRemoved {
    pub id: String,
    pub name: Option<String>,
    pub reason: RemovedReason,
}

/// A feature present in both snapshots with at least one changed field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureModified {
    pub id: String,
    pub name: Option<String>,
    pub name_change: Option<Change<String>>,
    pub baseline_change: Option<Change<BaselineStatus>>,
    /// Keyed by canonical browser enum for deterministic serialization.
    pub browser_changes: BTreeMap<Browser, Change<BrowserImpl>>,
    pub docs_change: Option<Change<Vec<MdnDoc>>>,
}

/// A single-target rename reconciled from a removed/added pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureMoved {
    pub from_id: String,
    pub from_name: Option<String>,
    pub to_id: String,
    pub to_name: Option<String>,
}

/// A one-to-many reclassification reconciled from a removed id whose
/// catalog entry names several successor ids.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureSplit {
    pub from_id: String,
    pub from_name: Option<String>,
    pub to: Vec<FeatureAdded>,
}
