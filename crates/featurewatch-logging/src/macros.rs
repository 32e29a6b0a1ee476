//! Structured logging macros.
//!
//! These wrap `tracing` events with the field names defined in
//! `featurewatch_types::schema` so every log line in the pipeline carries
//! the same correlation keys, regardless of which crate emits it.

/// Emit a structured "operation start" event.
///
/// ```rust
/// use featurewatch_logging::log_op_start;
///
/// log_op_start!("producer.process_search", search_id = "search-1");
/// ```
#[macro_export]
macro_rules! log_op_start {
    ($op:expr) => {
        ::tracing::info!(
            op = $op,
            event = $crate::__schema::EVENT_START,
        );
    };
    ($op:expr, $($field:ident = $value:expr),+ $(,)?) => {
        ::tracing::info!(
            op = $op,
            event = $crate::__schema::EVENT_START,
            $($field = $value),+
        );
    };
}

/// Emit a structured "operation end" event, including elapsed duration.
///
/// ```rust
/// use featurewatch_logging::log_op_end;
///
/// log_op_end!("producer.process_search", 12, search_id = "search-1");
/// ```
#[macro_export]
macro_rules! log_op_end {
    ($op:expr, $duration_ms:expr) => {
        ::tracing::info!(
            op = $op,
            event = $crate::__schema::EVENT_END,
            duration_ms = $duration_ms,
        );
    };
    ($op:expr, $duration_ms:expr, $($field:ident = $value:expr),+ $(,)?) => {
        ::tracing::info!(
            op = $op,
            event = $crate::__schema::EVENT_END,
            duration_ms = $duration_ms,
            $($field = $value),+
        );
    };
}

/// Emit a structured "operation end with error" event from a [`FwError`](featurewatch_errors::FwError).
///
/// Takes the error by reference; callers are expected to have already
/// classified the failure into a `FwError` before logging it.
///
/// ```rust
/// use featurewatch_errors::{FwError, FwErrorKind};
/// use featurewatch_logging::log_op_error;
///
/// let err = FwError::new(FwErrorKind::CollaboratorIo).with_message("timeout");
/// log_op_error!("producer.process_search", &err);
/// ```
#[macro_export]
macro_rules! log_op_error {
    ($op:expr, $err:expr) => {{
        let fw_err: &::featurewatch_errors::FwError = $err;
        ::tracing::error!(
            op = $op,
            event = $crate::__schema::EVENT_END_ERROR,
            err_kind = ?fw_err.kind(),
            err_code = fw_err.code(),
            err_message = %fw_err,
        );
    }};
    ($op:expr, $err:expr, $($field:ident = $value:expr),+ $(,)?) => {{
        let fw_err: &::featurewatch_errors::FwError = $err;
        ::tracing::error!(
            op = $op,
            event = $crate::__schema::EVENT_END_ERROR,
            err_kind = ?fw_err.kind(),
            err_code = fw_err.code(),
            err_message = %fw_err,
            $($field = $value),+
        );
    }};
}

#[doc(hidden)]
pub use featurewatch_types::schema as __schema;
