//! Reconciler: upgrades preliminary `removed` entries into moves, splits,
//! or true deletions by consulting the feature catalog.
//!
//! The catalog lookup is expressed as a synchronous, visitor-dispatched
//! [`FeatureCatalog`] trait so this module stays pure and I/O-free, the
//! same way `diff::engine` does; `featurewatch-engine` is responsible for
//! resolving the async `FeatureFetcher.GetFeature` calls ahead of time and
//! handing this module a ready [`FeatureCatalog`] implementation (e.g. a
//! pre-populated `BTreeMap`).

use crate::diff::model::{Diff, FeatureAdded, FeatureMoved, FeatureSplit, RemovedReason};
use std::collections::BTreeSet;

/// The four possible shapes a catalog entry can take for a previously
/// matched, now-removed feature id.
///
/// Expressed as a tagged variant dispatched through [`Visit`] rather than
/// via inheritance or downcasting, per the reconciler's closed-extension
/// requirement.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureCatalogEntry {
    /// The feature still exists in the catalog under the same id.
    Regular,
    /// The feature was renamed; `new_id` is its current id.
    Moved { new_id: String },
    /// The feature was split into several successor ids.
    Split { new_ids: Vec<String> },
    /// No catalog entry exists for this id at all.
    NotFound,
}

/// Dispatches on a [`FeatureCatalogEntry`] without downcasting.
pub trait Visit<R> {
    fn visit_regular(&self) -> R;
    fn visit_moved(&self, new_id: &str) -> R;
    fn visit_split(&self, new_ids: &[String]) -> R;
    fn visit_not_found(&self) -> R;
}

impl FeatureCatalogEntry {
    /// Dispatch this entry to a [`Visit`] implementation.
    pub fn accept<R>(&self, visitor: &impl Visit<R>) -> R {
        match self {
            FeatureCatalogEntry::Regular => visitor.visit_regular(),
            FeatureCatalogEntry::Moved { new_id } => visitor.visit_moved(new_id),
            FeatureCatalogEntry::Split { new_ids } => visitor.visit_split(new_ids),
            FeatureCatalogEntry::NotFound => visitor.visit_not_found(),
        }
    }
}

/// Synchronous feature-catalog lookup consumed by [`reconcile`].
pub trait FeatureCatalog {
    fn get_feature(&self, id: &str) -> FeatureCatalogEntry;
}

/// Upgrade a preliminary [`Diff`]'s `removed` entries into moves, splits,
/// or true deletions.
///
/// Moves are reconciled before splits so a rename is never interpreted as
/// a 1-of-N split. Removed ids are iterated in id order (they already are,
/// since `diff::engine::compare` emits them sorted) for determinism.
pub fn reconcile(mut diff: Diff, catalog: &impl FeatureCatalog) -> Diff {
    reconcile_moves(&mut diff, catalog);
    reconcile_splits(&mut diff, catalog);
    reconcile_deletions(&mut diff, catalog);
    diff
}

struct MoveVisitor<'a> {
    added_ids: &'a BTreeSet<String>,
}

impl Visit<Option<String>> for MoveVisitor<'_> {
    fn visit_regular(&self) -> Option<String> {
        None
    }
    fn visit_moved(&self, new_id: &str) -> Option<String> {
        self.added_ids
            .contains(new_id)
            .then(|| new_id.to_string())
    }
    fn visit_split(&self, _new_ids: &[String]) -> Option<String> {
        None
    }
    fn visit_not_found(&self) -> Option<String> {
        None
    }
}

fn reconcile_moves(diff: &mut Diff, catalog: &impl FeatureCatalog) {
    let added_ids: BTreeSet<String> = diff.added.iter().map(|a| a.id.clone()).collect();
    let mut moves = Vec::new();
    let mut resolved_removed: BTreeSet<String> = BTreeSet::new();
    let mut resolved_added: BTreeSet<String> = BTreeSet::new();

    let removed_ids: Vec<String> = diff.removed.iter().map(|r| r.id.clone()).collect();
    for from_id in removed_ids {
        let entry = catalog.get_feature(&from_id);
        let visitor = MoveVisitor {
            added_ids: &added_ids,
        };
        if let Some(to_id) = entry.accept(&visitor) {
            let from_name = diff
                .removed
                .iter()
                .find(|r| r.id == from_id)
                .and_then(|r| r.name.clone());
            let to_name = diff
                .added
                .iter()
                .find(|a| a.id == to_id)
                .and_then(|a| a.name.clone());
            moves.push(FeatureMoved {
                from_id: from_id.clone(),
                from_name,
                to_id: to_id.clone(),
                to_name,
            });
            resolved_removed.insert(from_id);
            resolved_added.insert(to_id);
        }
    }

    diff.removed.retain(|r| !resolved_removed.contains(&r.id));
    diff.added.retain(|a| !resolved_added.contains(&a.id));
    diff.moves = moves;
}

struct SplitVisitor;

impl Visit<Option<Vec<String>>> for SplitVisitor {
    fn visit_regular(&self) -> Option<Vec<String>> {
        None
    }
    fn visit_moved(&self, _new_id: &str) -> Option<Vec<String>> {
        None
    }
    fn visit_split(&self, new_ids: &[String]) -> Option<Vec<String>> {
        Some(new_ids.to_vec())
    }
    fn visit_not_found(&self) -> Option<Vec<String>> {
        None
    }
}

fn reconcile_splits(diff: &mut Diff, catalog: &impl FeatureCatalog) {
    let mut splits = Vec::new();
    let mut resolved_removed: BTreeSet<String> = BTreeSet::new();
    let mut resolved_added: BTreeSet<String> = BTreeSet::new();

    let removed_ids: Vec<String> = diff.removed.iter().map(|r| r.id.clone()).collect();
    for from_id in removed_ids {
        let entry = catalog.get_feature(&from_id);
        let visitor = SplitVisitor;
        let Some(candidate_ids) = entry.accept(&visitor) else {
            continue;
        };

        let matched: Vec<FeatureAdded> = diff
            .added
            .iter()
            .filter(|a| candidate_ids.contains(&a.id))
            .cloned()
            .collect();
        if matched.is_empty() {
            continue;
        }

        let from_name = diff
            .removed
            .iter()
            .find(|r| r.id == from_id)
            .and_then(|r| r.name.clone());

        for m in &matched {
            resolved_added.insert(m.id.clone());
        }
        resolved_removed.insert(from_id.clone());
        splits.push(FeatureSplit {
            from_id,
            from_name,
            to: matched,
        });
    }

    diff.removed.retain(|r| !resolved_removed.contains(&r.id));
    diff.added.retain(|a| !resolved_added.contains(&a.id));
    diff.splits = splits;
}

fn reconcile_deletions(diff: &mut Diff, catalog: &impl FeatureCatalog) {
    for removed in diff.removed.iter_mut() {
        if matches!(catalog.get_feature(&removed.id), FeatureCatalogEntry::NotFound) {
            removed.reason = RemovedReason::Deleted;
        }
    }
}
