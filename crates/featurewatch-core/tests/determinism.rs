//! Property tests for `diff::engine::compare`'s determinism and the
//! "optionally set" field-monotonicity invariant.

use featurewatch_core::diff::compare;
use featurewatch_core::model::Feature;
use featurewatch_types::OptionallySet;
use proptest::prelude::*;
use std::collections::BTreeMap;

fn arb_id() -> impl Strategy<Value = String> {
    "[a-z]{3,8}"
}

fn arb_entry() -> impl Strategy<Value = (String, Option<String>)> {
    (arb_id(), prop_oneof![Just(None), any::<String>().prop_map(Some)])
}

fn arb_feature_map() -> impl Strategy<Value = BTreeMap<String, Feature>> {
    prop::collection::vec(arb_entry(), 0..12).prop_map(|entries| {
        entries
            .into_iter()
            .map(|(id, name)| {
                (
                    id.clone(),
                    Feature {
                        id,
                        name: OptionallySet::from(name),
                        baseline_status: OptionallySet::unset(),
                        browser_impls: OptionallySet::unset(),
                        docs: OptionallySet::unset(),
                    },
                )
            })
            .collect::<BTreeMap<_, _>>()
    })
}

proptest! {
    /// Running `compare` twice over the same inputs produces byte-identical
    /// JSON output: no hidden iteration-order leak into the result.
    #[test]
    fn compare_is_deterministic_across_repeated_runs(
        old in arb_feature_map(),
        new in arb_feature_map(),
    ) {
        let first = compare(&old, &new, false);
        let second = compare(&old, &new, false);
        let first_json = serde_json::to_string(&first).unwrap();
        let second_json = serde_json::to_string(&second).unwrap();
        prop_assert_eq!(first_json, second_json);
    }

    /// `added`/`removed` entries are always sorted by id, regardless of the
    /// input maps' insertion order (moot for `BTreeMap`, but pins the
    /// contract independent of the underlying collection).
    #[test]
    fn added_and_removed_are_sorted_by_id(
        old in arb_feature_map(),
        new in arb_feature_map(),
    ) {
        let diff = compare(&old, &new, false);
        let added_ids: Vec<&str> = diff.added.iter().map(|a| a.id.as_str()).collect();
        let mut sorted_added = added_ids.clone();
        sorted_added.sort();
        prop_assert_eq!(added_ids, sorted_added);

        let removed_ids: Vec<&str> = diff.removed.iter().map(|r| r.id.as_str()).collect();
        let mut sorted_removed = removed_ids.clone();
        sorted_removed.sort();
        prop_assert_eq!(removed_ids, sorted_removed);
    }

    /// A field left unset in OLD never contributes a modification, no matter
    /// what NEW carries for the same id.
    #[test]
    fn unset_old_name_never_produces_a_name_change(id in arb_id(), new_name in any::<String>()) {
        let mut old = BTreeMap::new();
        old.insert(
            id.clone(),
            Feature {
                id: id.clone(),
                name: OptionallySet::unset(),
                baseline_status: OptionallySet::unset(),
                browser_impls: OptionallySet::unset(),
                docs: OptionallySet::unset(),
            },
        );
        let mut new = BTreeMap::new();
        new.insert(
            id.clone(),
            Feature {
                id,
                name: OptionallySet::set(new_name),
                baseline_status: OptionallySet::unset(),
                browser_impls: OptionallySet::unset(),
                docs: OptionallySet::unset(),
            },
        );

        let diff = compare(&old, &new, false);
        prop_assert!(diff.modified.is_empty());
    }
}
