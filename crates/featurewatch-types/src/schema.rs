//! Canonical schema constants for structured logging and events
//!
//! These constants ensure consistency across all logging and error reporting.

// Canonical field keys for structured logging
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";
pub const FIELD_REQUEST_ID: &str = "request_id";
pub const FIELD_TRACE_ID: &str = "trace_id";
pub const FIELD_SPAN_ID: &str = "span_id";

// Domain identifiers
pub const FIELD_SEARCH_ID: &str = "search_id";
pub const FIELD_FEATURE_ID: &str = "feature_id";
pub const FIELD_EVENT_ID: &str = "event_id";
pub const FIELD_TRIGGER_ID: &str = "trigger_id";
pub const FIELD_STATE_ID: &str = "state_id";
pub const FIELD_DIFF_ID: &str = "diff_id";
pub const FIELD_WORKER_ID: &str = "worker_id";
pub const FIELD_FREQUENCY: &str = "frequency";

// Error fields
pub const FIELD_ERR_KIND: &str = "err.kind";
pub const FIELD_ERR_CODE: &str = "err.code";

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";
