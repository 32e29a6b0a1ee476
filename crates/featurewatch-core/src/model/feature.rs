//! The canonical, comparable `Feature` record and its nested value types.
//!
//! Every field that can be absent from an older-schema snapshot is wrapped
//! in [`OptionallySet`], so the diff engine (`diff::engine`) can tell "field
//! was never recorded" apart from "field was recorded as empty/false".

use featurewatch_types::OptionallySet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A web-platform capability record, identified by a stable string id.
///
/// `id` is always present; every other field carries its own presence flag
/// via [`OptionallySet`] so a field absent in an OLD snapshot is never
/// treated as "changed to absent" by the diff engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Feature {
    /// Stable identifier, unique within a snapshot.
    pub id: String,
    /// Human-readable feature name.
    pub name: OptionallySet<String>,
    /// Web Platform Baseline status.
    pub baseline_status: OptionallySet<BaselineStatus>,
    /// Per-browser implementation status, keyed by canonical browser.
    pub browser_impls: OptionallySet<BTreeMap<Browser, OptionallySet<BrowserImpl>>>,
    /// Documentation links.
    pub docs: OptionallySet<Docs>,
}

/// Web Platform Baseline classification for a feature.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BaselineStatus {
    /// Current Baseline tier.
    pub status: BaselineStatusValue,
    /// Date the feature entered "low" availability, if known.
    pub low_date: Option<chrono::DateTime<chrono::Utc>>,
    /// Date the feature entered "high" (widely available) status, if known.
    pub high_date: Option<chrono::DateTime<chrono::Utc>>,
}

/// The three Baseline tiers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BaselineStatusValue {
    /// Newly available in the most recent browser to ship it.
    Limited,
    /// Widely available, but younger than the standard Baseline window.
    Newly,
    /// Widely available across all core browsers for the standard window.
    Widely,
}

/// The canonical set of browsers a feature's implementation status is tracked for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Browser {
    Chrome,
    ChromeAndroid,
    Edge,
    Firefox,
    FirefoxAndroid,
    Safari,
    SafariIos,
}

/// Per-browser implementation status for a feature.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BrowserImpl {
    /// Whether the browser ships the feature.
    pub status: BrowserStatus,
    /// The version it shipped in, if known. Compared as an opaque string,
    /// never parsed as semver.
    pub version: Option<String>,
    /// The date it shipped, if known. Compared as an instant.
    pub date: Option<chrono::DateTime<chrono::Utc>>,
}

/// Whether a browser has shipped a feature.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BrowserStatus {
    Available,
    Unavailable,
}

/// Documentation links attached to a feature.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Docs {
    /// MDN documentation entries.
    pub mdn_docs: OptionallySet<Vec<MdnDoc>>,
}

/// A single MDN documentation entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MdnDoc {
    /// Absolute URL of the doc page. `None` sorts before any value when
    /// ordering doc lists for comparison.
    pub url: Option<String>,
    pub title: String,
    pub slug: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feature_unset_fields_round_trip() {
        let f = Feature {
            id: "grid".into(),
            name: OptionallySet::unset(),
            baseline_status: OptionallySet::unset(),
            browser_impls: OptionallySet::unset(),
            docs: OptionallySet::unset(),
        };
        let json = serde_json::to_string(&f).unwrap();
        let back: Feature = serde_json::from_str(&json).unwrap();
        assert_eq!(f, back);
        assert!(!back.name.is_set());
    }

    #[test]
    fn browser_ordering_is_canonical() {
        let mut browsers = vec![Browser::Safari, Browser::Chrome, Browser::Edge];
        browsers.sort();
        assert_eq!(
            browsers,
            vec![Browser::Chrome, Browser::Edge, Browser::Safari]
        );
    }
}
