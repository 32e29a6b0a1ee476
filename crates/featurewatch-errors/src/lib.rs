//! Canonical error facility for the featurewatch pipeline.
//!
//! Every layer (transport adapters, store, engine) wraps lower-layer
//! errors in a [`FwError`] rather than letting raw I/O/serde errors cross
//! module boundaries unclassified. The pub/sub callback at the edge of
//! `featurewatch-engine` is the sole place that turns a [`FwError`]'s
//! [`ErrorClass`] into an ack/nack decision.

use featurewatch_types::{RequestId, TraceId};
use std::fmt;

/// Result type alias using [`FwError`].
pub type Result<T> = std::result::Result<T, FwError>;

/// Classification of an error by its effect on the caller, not by origin.
///
/// This is the taxonomy the pub/sub callback dispatches on: it never
/// string-matches messages, only `kind().class()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Retry via transport NACK.
    Transient,
    /// Ack, log, halt this message — operator-visible, not user-visible.
    PermanentSystem,
    /// Ack, mark the subscription/recipient degraded.
    PermanentUser,
    /// Ack; a duplicate of work already completed.
    Duplicate,
    /// Not an error: ack, nothing published.
    NoChange,
}

/// Canonical error kind taxonomy for the featurewatch pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FwErrorKind {
    /// Advisory lock for (searchID, frequency) is held by another worker.
    LockContention,
    /// A collaborator call (FeatureFetcher/BlobStore/MetadataStore) failed transiently.
    CollaboratorIo,
    /// The outbound event/job publish failed.
    PublishFailed,
    /// A blob envelope was malformed or its `kind` was unrecognized.
    InvalidFormat,
    /// No migrator chain brings a blob's apiVersion forward to current.
    SchemaMigrationFailed,
    /// Sender adapter reports a configuration problem (not a recipient problem).
    SenderConfigError,
    /// A delivery/notification sentinel already fired for this identity.
    DuplicateNotification,
    /// Sender adapter reports the recipient cannot be reached at all.
    UndeliverableRecipient,
    /// Subscriber preferences caused the channel to be dropped.
    SubscriberPreferencesDropped,
    /// Compare/Reconcile produced no reasons; this is a successful no-op.
    NoChangesDetected,
    /// Unclassified internal error.
    Internal,
}

impl FwErrorKind {
    /// Stable error code, suitable for programmatic handling and telemetry.
    pub fn code(&self) -> &'static str {
        match self {
            FwErrorKind::LockContention => "ERR_LOCK_CONTENTION",
            FwErrorKind::CollaboratorIo => "ERR_COLLABORATOR_IO",
            FwErrorKind::PublishFailed => "ERR_PUBLISH_FAILED",
            FwErrorKind::InvalidFormat => "ERR_INVALID_FORMAT",
            FwErrorKind::SchemaMigrationFailed => "ERR_SCHEMA_MIGRATION_FAILED",
            FwErrorKind::SenderConfigError => "ERR_SENDER_CONFIG",
            FwErrorKind::DuplicateNotification => "ERR_DUPLICATE_NOTIFICATION",
            FwErrorKind::UndeliverableRecipient => "ERR_UNDELIVERABLE_RECIPIENT",
            FwErrorKind::SubscriberPreferencesDropped => "ERR_SUBSCRIBER_PREFERENCES_DROPPED",
            FwErrorKind::NoChangesDetected => "ERR_NO_CHANGES_DETECTED",
            FwErrorKind::Internal => "ERR_INTERNAL",
        }
    }

    /// The effect-on-caller classification for this kind.
    pub fn class(&self) -> ErrorClass {
        match self {
            FwErrorKind::LockContention
            | FwErrorKind::CollaboratorIo
            | FwErrorKind::PublishFailed => ErrorClass::Transient,
            FwErrorKind::InvalidFormat
            | FwErrorKind::SchemaMigrationFailed
            | FwErrorKind::SenderConfigError
            | FwErrorKind::Internal => ErrorClass::PermanentSystem,
            FwErrorKind::DuplicateNotification => ErrorClass::Duplicate,
            FwErrorKind::UndeliverableRecipient | FwErrorKind::SubscriberPreferencesDropped => {
                ErrorClass::PermanentUser
            }
            FwErrorKind::NoChangesDetected => ErrorClass::NoChange,
        }
    }
}

/// Canonical structured error type.
///
/// Mirrors the builder shape used throughout the pipeline's lower layers:
/// construct with a kind, then attach whatever context is available at the
/// call site.
#[derive(Debug, Clone)]
pub struct FwError {
    kind: FwErrorKind,
    op: Option<String>,
    search_id: Option<String>,
    event_id: Option<String>,
    request_id: Option<RequestId>,
    trace_id: Option<TraceId>,
    message: String,
    source: Option<Box<FwError>>,
}

impl FwError {
    /// Create a new error with the specified kind.
    pub fn new(kind: FwErrorKind) -> Self {
        Self {
            kind,
            op: None,
            search_id: None,
            event_id: None,
            request_id: None,
            trace_id: None,
            message: String::new(),
            source: None,
        }
    }

    /// Attach the operation that raised this error.
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Attach the saved search id in scope when this error was raised.
    pub fn with_search_id(mut self, search_id: impl Into<String>) -> Self {
        self.search_id = Some(search_id.into());
        self
    }

    /// Attach the event id in scope when this error was raised.
    pub fn with_event_id(mut self, event_id: impl Into<String>) -> Self {
        self.event_id = Some(event_id.into());
        self
    }

    /// Attach a request id for correlation.
    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = Some(request_id);
        self
    }

    /// Attach a trace id for correlation.
    pub fn with_trace_id(mut self, trace_id: TraceId) -> Self {
        self.trace_id = Some(trace_id);
        self
    }

    /// Attach a human-readable message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Wrap a lower-layer error, preserving it for `source()` identity.
    pub fn with_source(mut self, source: FwError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// The error kind.
    pub fn kind(&self) -> FwErrorKind {
        self.kind
    }

    /// The stable error code for this error's kind.
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// The effect-on-caller classification for this error.
    pub fn class(&self) -> ErrorClass {
        self.kind.class()
    }

    /// The operation context, if any.
    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// The saved search id context, if any.
    pub fn search_id(&self) -> Option<&str> {
        self.search_id.as_deref()
    }

    /// The event id context, if any.
    pub fn event_id(&self) -> Option<&str> {
        self.event_id.as_deref()
    }

    /// The wrapped lower-layer error, if any.
    pub fn source_error(&self) -> Option<&FwError> {
        self.source.as_deref()
    }
}

impl fmt::Display for FwError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(search_id) = &self.search_id {
            write!(f, " (search_id: {})", search_id)?;
        }
        if let Some(event_id) = &self.event_id {
            write!(f, " (event_id: {})", event_id)?;
        }
        if let Some(source) = &self.source {
            write!(f, " caused by: {}", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for FwError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_deref().map(|e| e as &dyn std::error::Error)
    }
}

impl From<serde_json::Error> for FwError {
    fn from(err: serde_json::Error) -> Self {
        FwError::new(FwErrorKind::InvalidFormat)
            .with_op("deserialize")
            .with_message(err.to_string())
    }
}

/// Construct a transient collaborator-IO error.
pub fn collaborator_io(op: &str, message: impl Into<String>) -> FwError {
    FwError::new(FwErrorKind::CollaboratorIo)
        .with_op(op)
        .with_message(message)
}

/// Construct a lock-contention error.
pub fn lock_contention(search_id: &str, frequency: &str) -> FwError {
    FwError::new(FwErrorKind::LockContention)
        .with_op("acquire_lock")
        .with_search_id(search_id)
        .with_message(format!("lock for frequency {} is held", frequency))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_code_stable() {
        assert_eq!(FwErrorKind::LockContention.code(), "ERR_LOCK_CONTENTION");
        assert_eq!(
            FwErrorKind::NoChangesDetected.code(),
            "ERR_NO_CHANGES_DETECTED"
        );
    }

    #[test]
    fn test_classification() {
        assert_eq!(FwErrorKind::LockContention.class(), ErrorClass::Transient);
        assert_eq!(
            FwErrorKind::InvalidFormat.class(),
            ErrorClass::PermanentSystem
        );
        assert_eq!(
            FwErrorKind::UndeliverableRecipient.class(),
            ErrorClass::PermanentUser
        );
        assert_eq!(
            FwErrorKind::DuplicateNotification.class(),
            ErrorClass::Duplicate
        );
        assert_eq!(
            FwErrorKind::NoChangesDetected.class(),
            ErrorClass::NoChange
        );
    }

    #[test]
    fn test_builder_and_display() {
        let err = FwError::new(FwErrorKind::CollaboratorIo)
            .with_op("blob_store.get")
            .with_search_id("search-1")
            .with_message("connection reset");
        let s = format!("{}", err);
        assert!(s.contains("ERR_COLLABORATOR_IO"));
        assert!(s.contains("search-1"));
        assert!(s.contains("connection reset"));
    }

    #[test]
    fn test_source_chain_preserved() {
        let root = FwError::new(FwErrorKind::Internal).with_message("disk full");
        let wrapped = FwError::new(FwErrorKind::CollaboratorIo)
            .with_op("blob_store.store")
            .with_source(root);
        assert_eq!(wrapped.source_error().unwrap().kind(), FwErrorKind::Internal);
        assert!(std::error::Error::source(&wrapped).is_some());
    }
}
