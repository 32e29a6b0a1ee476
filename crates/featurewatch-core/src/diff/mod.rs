//! Snapshot diff engine.
//!
//! Compares two feature snapshots for the same saved search and produces a
//! structured, deterministic diff.
//!
//! ## Entry point
//!
//! ```ignore
//! use featurewatch_core::diff::engine::compare;
//!
//! let diff = compare(&old, &new, query_changed);
//! ```
//!
//! ## Guarantees
//!
//! - **Determinism**: identical inputs produce identical diff output
//!   ordering — `BTreeMap` iteration plus explicit sorts, not a
//!   round-trip-through-JSON check (there is no non-deterministic
//!   `HashMap` iteration in this engine to guard against).
//! - **Field-set monotonicity**: a field absent in OLD never produces a
//!   modification, regardless of NEW's value.

pub mod engine;
pub mod model;

pub use engine::compare;
pub use model::Diff;
