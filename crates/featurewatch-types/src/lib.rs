//! Core types shared across the featurewatch facilities.
//!
//! - **Correlation types**: RequestId, TraceId, SpanId, RequestContext.
//! - **Domain identifiers**: SearchId, FeatureId, EventId, StateId, DiffId, WorkerId.
//! - **Sensitive data**: Sensitive<T> marker for automatic redaction.
//! - **OptionallySet<T>**: per-field "was this set in the source snapshot" marker.
//! - **Schema constants**: canonical field keys and event names.
//! - **Frequency**: the schedule class for a saved search's refresh.

pub mod correlation;
pub mod frequency;
pub mod ids;
pub mod optionally_set;
pub mod schema;
pub mod sensitive;

pub use correlation::{RequestContext, RequestId, SpanId, TraceId};
pub use frequency::Frequency;
pub use ids::{DiffId, EventId, FeatureId, SearchId, StateId, WorkerId};
pub use optionally_set::OptionallySet;
pub use sensitive::Sensitive;
