//! Test capture mode: collect emitted log events in-memory for assertions.
//!
//! ```rust
//! use featurewatch_logging::{init_test_capture, log_op_start};
//!
//! let capture = init_test_capture();
//! log_op_start!("producer.process_search", search_id = "search-1");
//! let events = capture.events();
//! assert!(events.iter().any(|e| e.fields.get("op").map(String::as_str) == Some("producer.process_search")));
//! ```

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

/// A single captured log event, with its level, target and structured fields.
#[derive(Debug, Clone)]
pub struct CapturedEvent {
    pub level: String,
    pub target: String,
    pub fields: BTreeMap<String, String>,
}

#[derive(Default)]
struct FieldVisitor {
    fields: BTreeMap<String, String>,
}

impl Visit for FieldVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.fields
            .insert(field.name().to_string(), format!("{:?}", value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.fields.insert(field.name().to_string(), value.to_string());
    }
}

/// A `tracing_subscriber::Layer` that appends every event to a shared buffer.
struct TestCaptureLayer {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl<S> Layer<S> for TestCaptureLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);
        let captured = CapturedEvent {
            level: event.metadata().level().to_string(),
            target: event.metadata().target().to_string(),
            fields: visitor.fields,
        };
        self.events.lock().expect("capture buffer poisoned").push(captured);
    }
}

/// Handle to a test-capture subscriber's recorded events.
#[derive(Clone)]
pub struct TestCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl TestCapture {
    /// Snapshot of all events recorded so far.
    pub fn events(&self) -> Vec<CapturedEvent> {
        self.events.lock().expect("capture buffer poisoned").clone()
    }

    /// Clear all recorded events.
    pub fn clear(&self) {
        self.events.lock().expect("capture buffer poisoned").clear();
    }

    /// True if any captured event has a field matching `key` = `value`.
    pub fn has_field(&self, key: &str, value: &str) -> bool {
        self.events()
            .iter()
            .any(|e| e.fields.get(key).map(String::as_str) == Some(value))
    }
}

/// Install a process-local test-capture subscriber and return its handle.
///
/// Intended for use at the top of a `#[test]` or `#[tokio::test]`. Safe to
/// call more than once per process; each call installs its own subscriber
/// scoped to the current thread via `tracing::subscriber::set_default`,
/// returning a guard-free handle backed by a fresh buffer.
pub fn init_test_capture() -> TestCapture {
    let events = Arc::new(Mutex::new(Vec::new()));
    let layer = TestCaptureLayer {
        events: events.clone(),
    };
    let subscriber = tracing_subscriber::registry().with(layer);
    // Leak the guard: test-capture subscribers live for the life of the
    // thread they're installed on, which is what a #[test] function wants.
    let guard = tracing::subscriber::set_default(subscriber);
    std::mem::forget(guard);
    TestCapture { events }
}
