//! Pure snapshot comparison engine.
//!
//! The single entry point is [`compare`], which accepts the OLD and NEW
//! feature maps and produces a [`Diff`]. No I/O, `O(|old| + |new|)`.

use crate::diff::model::{
    AddedReason, Change, Diff, FeatureAdded, FeatureModified, FeatureRemoved, RemovedReason,
};
use crate::model::{BaselineStatus, Browser, BrowserImpl, Feature, MdnDoc};
use std::collections::BTreeMap;

/// Compare two feature maps and produce a structured, deterministic diff.
///
/// `query_changed` is passed in rather than recomputed here: the caller
/// (`featurewatch-engine::producer`) owns the comparison of query
/// signatures across snapshot metadata, which is outside this pure
/// function's scope.
pub fn compare(
    old: &BTreeMap<String, Feature>,
    new: &BTreeMap<String, Feature>,
    query_changed: bool,
) -> Diff {
    let mut diff = Diff::empty();
    diff.query_changed = query_changed;

    // BTreeMap iteration is already id-ordered, so added/removed/modified
    // come out sorted without an explicit sort pass.
    for (id, new_feature) in new {
        if !old.contains_key(id) {
            diff.added.push(FeatureAdded {
                id: id.clone(),
                name: new_feature.name.get().cloned(),
                reason: AddedReason::NewMatch,
                docs: new_feature.docs.get().cloned(),
            });
        }
    }

    for (id, old_feature) in old {
        if !new.contains_key(id) {
            diff.removed.push(FeatureRemoved {
                id: id.clone(),
                name: old_feature.name.get().cloned(),
                reason: RemovedReason::Unmatched,
            });
        }
    }

    for (id, old_feature) in old {
        let Some(new_feature) = new.get(id) else {
            continue;
        };
        if let Some(modified) = compare_feature(id, old_feature, new_feature) {
            diff.modified.push(modified);
        }
    }

    diff
}

/// Field-wise comparison of one feature present in both snapshots.
///
/// A field only contributes to the result if it was *set* in OLD — per the
/// "optionally set" invariant, a field absent in OLD must never produce a
/// modification regardless of NEW's value.
fn compare_feature(id: &str, old: &Feature, new: &Feature) -> Option<FeatureModified> {
    let name_change = if old.name.is_set() {
        match (old.name.get(), new.name.get()) {
            (Some(o), Some(n)) if o != n => Some(Change::new(o.clone(), n.clone())),
            _ => None,
        }
    } else {
        None
    };

    let baseline_change = if old.baseline_status.is_set() {
        compare_baseline(old.baseline_status.get(), new.baseline_status.get())
    } else {
        None
    };

    let browser_changes = if old.browser_impls.is_set() {
        compare_browser_impls(old.browser_impls.get(), new.browser_impls.get())
    } else {
        BTreeMap::new()
    };

    let docs_change = if old.docs.is_set() {
        compare_docs(old.docs.get(), new.docs.get())
    } else {
        None
    };

    if name_change.is_none()
        && baseline_change.is_none()
        && browser_changes.is_empty()
        && docs_change.is_none()
    {
        return None;
    }

    Some(FeatureModified {
        id: id.to_string(),
        name: new.name.get().cloned(),
        name_change,
        baseline_change,
        browser_changes,
        docs_change,
    })
}

fn compare_baseline(
    old: Option<&BaselineStatus>,
    new: Option<&BaselineStatus>,
) -> Option<Change<BaselineStatus>> {
    let (old, new) = (old?, new?);
    if old.status != new.status {
        Some(Change::new(old.clone(), new.clone()))
    } else {
        None
    }
}

fn compare_browser_impls(
    old: Option<&BTreeMap<Browser, featurewatch_types::OptionallySet<BrowserImpl>>>,
    new: Option<&BTreeMap<Browser, featurewatch_types::OptionallySet<BrowserImpl>>>,
) -> BTreeMap<Browser, Change<BrowserImpl>> {
    let mut changes = BTreeMap::new();
    let Some(old) = old else {
        return changes;
    };
    let empty = BTreeMap::new();
    let new = new.unwrap_or(&empty);

    for (browser, old_entry) in old {
        if !old_entry.is_set() {
            continue;
        }
        let old_impl = old_entry.get().expect("checked is_set above");
        let new_impl = new.get(browser).and_then(|e| e.get());
        if let Some(new_impl) = new_impl {
            if old_impl.status != new_impl.status
                || old_impl.version != new_impl.version
                || old_impl.date != new_impl.date
            {
                changes.insert(*browser, Change::new(old_impl.clone(), new_impl.clone()));
            }
        }
    }
    changes
}

fn compare_docs(
    old: Option<&crate::model::Docs>,
    new: Option<&crate::model::Docs>,
) -> Option<Change<Vec<MdnDoc>>> {
    let old = old?;
    if !old.mdn_docs.is_set() {
        return None;
    }
    let old_docs = old.mdn_docs.get().cloned().unwrap_or_default();
    let new_docs = new
        .and_then(|d| d.mdn_docs.get().cloned())
        .unwrap_or_default();

    let mut old_sorted = old_docs;
    let mut new_sorted = new_docs;
    old_sorted.sort_by(|a, b| a.url.cmp(&b.url));
    new_sorted.sort_by(|a, b| a.url.cmp(&b.url));

    let old_urls: Vec<&Option<String>> = old_sorted.iter().map(|d| &d.url).collect();
    let new_urls: Vec<&Option<String>> = new_sorted.iter().map(|d| &d.url).collect();

    if old_urls != new_urls {
        Some(Change::new(old_sorted, new_sorted))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BaselineStatusValue, BrowserStatus, Docs};
    use featurewatch_types::OptionallySet;

    fn unset_feature(id: &str) -> Feature {
        Feature {
            id: id.to_string(),
            name: OptionallySet::unset(),
            baseline_status: OptionallySet::unset(),
            browser_impls: OptionallySet::unset(),
            docs: OptionallySet::unset(),
        }
    }

    #[test]
    fn added_feature_is_classified_new_match() {
        let old = BTreeMap::new();
        let mut new = BTreeMap::new();
        let mut f = unset_feature("grid");
        f.name = OptionallySet::set("CSS Grid".to_string());
        new.insert("grid".to_string(), f);

        let diff = compare(&old, &new, false);
        assert_eq!(diff.added.len(), 1);
        assert_eq!(diff.added[0].id, "grid");
        assert_eq!(diff.added[0].reason, AddedReason::NewMatch);
        assert!(diff.removed.is_empty());
    }

    #[test]
    fn removed_feature_starts_unmatched() {
        let mut old = BTreeMap::new();
        old.insert("gone".to_string(), unset_feature("gone"));
        let new = BTreeMap::new();

        let diff = compare(&old, &new, false);
        assert_eq!(diff.removed.len(), 1);
        assert_eq!(diff.removed[0].reason, RemovedReason::Unmatched);
    }

    #[test]
    fn unset_old_field_never_reports_modification() {
        let mut old = BTreeMap::new();
        old.insert("grid".to_string(), unset_feature("grid"));
        let mut new = BTreeMap::new();
        let mut nf = unset_feature("grid");
        nf.name = OptionallySet::set("Something else".to_string());
        new.insert("grid".to_string(), nf);

        let diff = compare(&old, &new, false);
        assert!(diff.modified.is_empty());
    }

    #[test]
    fn browser_status_change_is_detected() {
        let mut old_impls = BTreeMap::new();
        old_impls.insert(
            Browser::Chrome,
            OptionallySet::set(BrowserImpl {
                status: BrowserStatus::Unavailable,
                version: None,
                date: None,
            }),
        );
        let mut old_feature = unset_feature("grid");
        old_feature.browser_impls = OptionallySet::set(old_impls);

        let mut new_impls = BTreeMap::new();
        new_impls.insert(
            Browser::Chrome,
            OptionallySet::set(BrowserImpl {
                status: BrowserStatus::Available,
                version: Some("120".to_string()),
                date: None,
            }),
        );
        let mut new_feature = unset_feature("grid");
        new_feature.browser_impls = OptionallySet::set(new_impls);

        let mut old = BTreeMap::new();
        old.insert("grid".to_string(), old_feature);
        let mut new = BTreeMap::new();
        new.insert("grid".to_string(), new_feature);

        let diff = compare(&old, &new, false);
        assert_eq!(diff.modified.len(), 1);
        let change = diff.modified[0].browser_changes.get(&Browser::Chrome).unwrap();
        assert_eq!(change.to.status, BrowserStatus::Available);
    }

    #[test]
    fn baseline_status_change_is_detected() {
        let mut old_feature = unset_feature("grid");
        old_feature.baseline_status = OptionallySet::set(BaselineStatus {
            status: BaselineStatusValue::Limited,
            low_date: None,
            high_date: None,
        });
        let mut new_feature = unset_feature("grid");
        new_feature.baseline_status = OptionallySet::set(BaselineStatus {
            status: BaselineStatusValue::Widely,
            low_date: None,
            high_date: None,
        });

        let mut old = BTreeMap::new();
        old.insert("grid".to_string(), old_feature);
        let mut new = BTreeMap::new();
        new.insert("grid".to_string(), new_feature);

        let diff = compare(&old, &new, false);
        assert_eq!(diff.modified.len(), 1);
        assert!(diff.modified[0].baseline_change.is_some());
    }

    #[test]
    fn docs_list_reorder_without_url_change_is_not_modification() {
        let mut old_feature = unset_feature("grid");
        old_feature.docs = OptionallySet::set(Docs {
            mdn_docs: OptionallySet::set(vec![
                MdnDoc {
                    url: Some("https://mdn/b".into()),
                    title: "B".into(),
                    slug: "b".into(),
                },
                MdnDoc {
                    url: Some("https://mdn/a".into()),
                    title: "A".into(),
                    slug: "a".into(),
                },
            ]),
        });
        let mut new_feature = unset_feature("grid");
        new_feature.docs = OptionallySet::set(Docs {
            mdn_docs: OptionallySet::set(vec![
                MdnDoc {
                    url: Some("https://mdn/a".into()),
                    title: "A".into(),
                    slug: "a".into(),
                },
                MdnDoc {
                    url: Some("https://mdn/b".into()),
                    title: "B".into(),
                    slug: "b".into(),
                },
            ]),
        });

        let mut old = BTreeMap::new();
        old.insert("grid".to_string(), old_feature);
        let mut new = BTreeMap::new();
        new.insert("grid".to_string(), new_feature);

        let diff = compare(&old, &new, false);
        assert!(diff.modified.is_empty());
    }

    #[test]
    fn output_is_sorted_by_id() {
        let mut new = BTreeMap::new();
        for id in ["zeta", "alpha", "mu"] {
            new.insert(id.to_string(), unset_feature(id));
        }
        let old = BTreeMap::new();
        let diff = compare(&old, &new, false);
        let ids: Vec<&str> = diff.added.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["alpha", "mu", "zeta"]);
    }
}
