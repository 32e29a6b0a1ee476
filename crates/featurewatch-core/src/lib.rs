//! featurewatch core — pure, I/O-free diff and reconciliation library.
//!
//! This crate owns:
//! - The canonical [`model::Feature`] record and [`snapshot::Snapshot`] envelope.
//! - The [`diff::engine::compare`] comparison function.
//! - The [`reconcile::reconcile`] reconciliation pass.
//!
//! Nothing in this crate performs I/O or holds shared mutable state; the
//! engine crate (`featurewatch-engine`) owns orchestration and the
//! collaborator calls that feed this crate's pure functions.

pub mod diff;
pub mod model;
pub mod reconcile;
pub mod snapshot;

pub use diff::{compare, Diff};
pub use model::Feature;
pub use reconcile::{reconcile, FeatureCatalog, FeatureCatalogEntry};
pub use snapshot::Snapshot;
