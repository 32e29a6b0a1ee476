//! In-memory test doubles for every collaborator trait, backed by
//! `tokio::sync::mpsc` where the real contract is pub/sub-shaped.
//!
//! Suitable for unit/integration tests and the `featurewatch-cli` demo
//! commands; a real deployment swaps these for Pub/Sub-, blob-store-, and
//! SMTP-backed implementations without touching `featurewatch-engine`.

use crate::contracts::{
    BlobStore, CatalogEntry, Channel, CommandPublisher, CommandSubscriber, EmailJobSubscriber,
    EmailPublisher, EmailSender, EventPublisher, EventSubscriber, FeatureFetcher, LatestEventInfo,
    LockHandle, MetadataStore, PushJobSubscriber, PushPublisher, PushSender, SavedSearchLister,
    SavedSearchRef, Subscription, SubscriptionLister,
};
use crate::envelopes::{CommandEnvelope, EmailDeliveryJob, FeatureDiffEventEnvelope, PushDeliveryJob};
use async_trait::async_trait;
use featurewatch_core::model::Feature;
use featurewatch_errors::{FwError, FwErrorKind};
use featurewatch_types::Frequency;
use std::collections::BTreeMap;
use std::sync::Mutex;
use tokio::sync::mpsc;

/// Sending half of an in-memory command bus.
pub struct InMemoryCommandPublisher {
    tx: mpsc::UnboundedSender<CommandEnvelope>,
}

/// Receiving half of an in-memory command bus.
pub struct InMemoryCommandSubscriber {
    rx: mpsc::UnboundedReceiver<CommandEnvelope>,
}

/// Construct a connected command publisher/subscriber pair.
pub fn command_channel() -> (InMemoryCommandPublisher, InMemoryCommandSubscriber) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        InMemoryCommandPublisher { tx },
        InMemoryCommandSubscriber { rx },
    )
}

#[async_trait]
impl CommandPublisher for InMemoryCommandPublisher {
    async fn publish(&self, envelope: CommandEnvelope) -> Result<(), FwError> {
        self.tx.send(envelope).map_err(|_| {
            FwError::new(FwErrorKind::PublishFailed)
                .with_op("command_publisher.publish")
                .with_message("subscriber channel closed")
        })
    }
}

#[async_trait]
impl CommandSubscriber for InMemoryCommandSubscriber {
    async fn recv(&mut self) -> Option<CommandEnvelope> {
        self.rx.recv().await
    }
}

/// Sending half of an in-memory `FeatureDiffEvent` bus.
pub struct InMemoryEventPublisher {
    tx: mpsc::UnboundedSender<FeatureDiffEventEnvelope>,
}

/// Receiving half of an in-memory `FeatureDiffEvent` bus.
pub struct InMemoryEventSubscriber {
    rx: mpsc::UnboundedReceiver<FeatureDiffEventEnvelope>,
}

pub fn event_channel() -> (InMemoryEventPublisher, InMemoryEventSubscriber) {
    let (tx, rx) = mpsc::unbounded_channel();
    (InMemoryEventPublisher { tx }, InMemoryEventSubscriber { rx })
}

#[async_trait]
impl EventPublisher for InMemoryEventPublisher {
    async fn publish(&self, event: FeatureDiffEventEnvelope) -> Result<(), FwError> {
        self.tx.send(event).map_err(|_| {
            FwError::new(FwErrorKind::PublishFailed)
                .with_op("event_publisher.publish")
                .with_message("subscriber channel closed")
        })
    }
}

#[async_trait]
impl EventSubscriber for InMemoryEventSubscriber {
    async fn recv(&mut self) -> Option<FeatureDiffEventEnvelope> {
        self.rx.recv().await
    }
}

/// Sending half of an in-memory email delivery job queue.
pub struct InMemoryEmailJobPublisher {
    tx: mpsc::UnboundedSender<EmailDeliveryJob>,
}

/// Receiving half of an in-memory email delivery job queue, drained by the
/// final-mile delivery loop.
pub struct InMemoryEmailJobSubscriber {
    rx: mpsc::UnboundedReceiver<EmailDeliveryJob>,
}

/// Construct a connected email job publisher/subscriber pair: the
/// publisher is what the dispatcher enqueues onto, the subscriber is what
/// the delivery loop drains and hands to an [`EmailSender`].
pub fn email_job_channel() -> (InMemoryEmailJobPublisher, InMemoryEmailJobSubscriber) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        InMemoryEmailJobPublisher { tx },
        InMemoryEmailJobSubscriber { rx },
    )
}

#[async_trait]
impl EmailPublisher for InMemoryEmailJobPublisher {
    async fn publish_email_job(&self, job: EmailDeliveryJob) -> Result<(), FwError> {
        self.tx.send(job).map_err(|_| {
            FwError::new(FwErrorKind::PublishFailed)
                .with_op("email_job_publisher.publish_email_job")
                .with_message("delivery subscriber channel closed")
        })
    }
}

#[async_trait]
impl EmailJobSubscriber for InMemoryEmailJobSubscriber {
    async fn recv(&mut self) -> Option<EmailDeliveryJob> {
        self.rx.recv().await
    }
}

/// Sending half of an in-memory push delivery job queue.
pub struct InMemoryPushJobPublisher {
    tx: mpsc::UnboundedSender<PushDeliveryJob>,
}

/// Receiving half of an in-memory push delivery job queue, drained by the
/// final-mile delivery loop.
pub struct InMemoryPushJobSubscriber {
    rx: mpsc::UnboundedReceiver<PushDeliveryJob>,
}

/// Construct a connected push job publisher/subscriber pair, analogous to
/// [`email_job_channel`].
pub fn push_job_channel() -> (InMemoryPushJobPublisher, InMemoryPushJobSubscriber) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        InMemoryPushJobPublisher { tx },
        InMemoryPushJobSubscriber { rx },
    )
}

#[async_trait]
impl PushPublisher for InMemoryPushJobPublisher {
    async fn publish_push_job(&self, job: PushDeliveryJob) -> Result<(), FwError> {
        self.tx.send(job).map_err(|_| {
            FwError::new(FwErrorKind::PublishFailed)
                .with_op("push_job_publisher.publish_push_job")
                .with_message("delivery subscriber channel closed")
        })
    }
}

#[async_trait]
impl PushJobSubscriber for InMemoryPushJobSubscriber {
    async fn recv(&mut self) -> Option<PushDeliveryJob> {
        self.rx.recv().await
    }
}

/// An in-memory feature corpus plus a catalog of removed-id resolutions,
/// for driving the producer/reconciler against scripted fixtures.
pub struct InMemoryFeatureFetcher {
    features: Mutex<BTreeMap<String, Feature>>,
    catalog: Mutex<BTreeMap<String, CatalogEntry>>,
}

impl InMemoryFeatureFetcher {
    pub fn new(features: BTreeMap<String, Feature>, catalog: BTreeMap<String, CatalogEntry>) -> Self {
        Self {
            features: Mutex::new(features),
            catalog: Mutex::new(catalog),
        }
    }

    /// Replace the corpus returned by `fetch_features`, simulating a
    /// re-evaluation picking up new data.
    pub fn set_features(&self, features: BTreeMap<String, Feature>) {
        *self.features.lock().expect("poisoned") = features;
    }
}

#[async_trait]
impl FeatureFetcher for InMemoryFeatureFetcher {
    async fn fetch_features(&self, _query: &str) -> Result<Vec<Feature>, FwError> {
        Ok(self.features.lock().expect("poisoned").values().cloned().collect())
    }

    async fn get_feature(&self, id: &str) -> Result<CatalogEntry, FwError> {
        Ok(self
            .catalog
            .lock()
            .expect("poisoned")
            .get(id)
            .cloned()
            .unwrap_or(CatalogEntry::NotFound))
    }
}

/// An in-process blob store backed by a `BTreeMap`, for tests that don't
/// need real filesystem persistence.
#[derive(Default)]
pub struct InMemoryBlobStore {
    blobs: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn store(&self, dir: &str, bytes: &[u8]) -> Result<(String, String), FwError> {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        let digest = hex::encode(hasher.finalize());
        let path = format!("{}/{}.json", dir, digest);

        let mut blobs = self.blobs.lock().expect("poisoned");
        match blobs.get(&path) {
            Some(existing) if existing != bytes => {
                return Err(FwError::new(FwErrorKind::Internal)
                    .with_op("blob_store.store")
                    .with_message(format!("content digest collision for {}", digest)));
            }
            _ => {
                blobs.insert(path.clone(), bytes.to_vec());
            }
        }
        Ok((digest, path))
    }

    async fn get(&self, full_path: &str) -> Result<Vec<u8>, FwError> {
        self.blobs
            .lock()
            .expect("poisoned")
            .get(full_path)
            .cloned()
            .ok_or_else(|| {
                FwError::new(FwErrorKind::CollaboratorIo)
                    .with_op("blob_store.get")
                    .with_message(format!("blob not found: {}", full_path))
            })
    }
}

/// An in-process metadata store backed by a `Mutex<BTreeMap>`, mirroring
/// the lock-contention and latest-event semantics of
/// `featurewatch-store::metadata::SqliteMetadataStore` without requiring
/// SQLite.
#[derive(Default)]
pub struct InMemoryMetadataStore {
    locks: Mutex<BTreeMap<(String, String), (String, i64)>>,
    events: Mutex<BTreeMap<(String, String), LatestEventInfo>>,
}

impl InMemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(search_id: &str, frequency: Frequency) -> (String, String) {
        (search_id.to_string(), frequency.as_wire_str().to_string())
    }
}

#[async_trait]
impl MetadataStore for InMemoryMetadataStore {
    async fn acquire_lock(
        &self,
        search_id: &str,
        frequency: Frequency,
        worker_id: &str,
        ttl_ms: i64,
    ) -> Result<LockHandle, FwError> {
        let key = Self::key(search_id, frequency);
        let now = chrono::Utc::now().timestamp_millis();
        let mut locks = self.locks.lock().expect("poisoned");
        if let Some((holder, expires_at)) = locks.get(&key) {
            if *expires_at > now && holder != worker_id {
                return Err(featurewatch_errors::lock_contention(
                    search_id,
                    frequency.as_wire_str(),
                ));
            }
        }
        locks.insert(key, (worker_id.to_string(), now + ttl_ms));
        Ok(LockHandle {
            search_id: search_id.to_string(),
            frequency,
            worker_id: worker_id.to_string(),
        })
    }

    async fn release_lock(&self, handle: &LockHandle) -> Result<(), FwError> {
        let key = Self::key(&handle.search_id, handle.frequency);
        let mut locks = self.locks.lock().expect("poisoned");
        if let Some((holder, _)) = locks.get(&key) {
            if holder == &handle.worker_id {
                locks.remove(&key);
            }
        }
        Ok(())
    }

    async fn publish_event(
        &self,
        search_id: &str,
        frequency: Frequency,
        info: LatestEventInfo,
    ) -> Result<(), FwError> {
        let key = Self::key(search_id, frequency);
        self.events.lock().expect("poisoned").insert(key, info);
        Ok(())
    }

    async fn get_latest_event(
        &self,
        search_id: &str,
        frequency: Frequency,
    ) -> Result<Option<LatestEventInfo>, FwError> {
        let key = Self::key(search_id, frequency);
        Ok(self.events.lock().expect("poisoned").get(&key).cloned())
    }
}

/// An email publisher/sender double that records every job it receives.
#[derive(Default)]
pub struct RecordingEmailSink {
    jobs: Mutex<Vec<EmailDeliveryJob>>,
}

impl RecordingEmailSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn jobs(&self) -> Vec<EmailDeliveryJob> {
        self.jobs.lock().expect("poisoned").clone()
    }
}

#[async_trait]
impl EmailPublisher for RecordingEmailSink {
    async fn publish_email_job(&self, job: EmailDeliveryJob) -> Result<(), FwError> {
        self.jobs.lock().expect("poisoned").push(job);
        Ok(())
    }
}

/// A push publisher double that records every job it receives.
#[derive(Default)]
pub struct RecordingPushSink {
    jobs: Mutex<Vec<PushDeliveryJob>>,
}

impl RecordingPushSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn jobs(&self) -> Vec<PushDeliveryJob> {
        self.jobs.lock().expect("poisoned").clone()
    }
}

#[async_trait]
impl PushPublisher for RecordingPushSink {
    async fn publish_push_job(&self, job: PushDeliveryJob) -> Result<(), FwError> {
        self.jobs.lock().expect("poisoned").push(job);
        Ok(())
    }
}

/// A final-mile email sender double whose response is scripted per
/// recipient, for exercising the dispatcher's error classification. Every
/// call is recorded regardless of outcome, so tests can assert the
/// final-mile adapter was actually reached rather than just enqueued.
#[derive(Default)]
pub struct ScriptedEmailSender {
    responses: Mutex<BTreeMap<String, FwErrorKind>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedEmailSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `send` to `recipient` fail with `kind`.
    pub fn fail_for(&self, recipient: &str, kind: FwErrorKind) {
        self.responses
            .lock()
            .expect("poisoned")
            .insert(recipient.to_string(), kind);
    }

    /// Every recipient `send` was called with, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("poisoned").clone()
    }
}

#[async_trait]
impl EmailSender for ScriptedEmailSender {
    async fn send(&self, _id: &str, to: &str, _subject: &str, _html_body: &str) -> Result<(), FwError> {
        self.calls.lock().expect("poisoned").push(to.to_string());
        if let Some(kind) = self.responses.lock().expect("poisoned").get(to) {
            return Err(FwError::new(*kind)
                .with_op("email_sender.send")
                .with_message(format!("scripted failure for {}", to)));
        }
        Ok(())
    }
}

/// A final-mile push sender double, always succeeding unless scripted.
/// Every call is recorded regardless of outcome.
#[derive(Default)]
pub struct ScriptedPushSender {
    responses: Mutex<BTreeMap<String, FwErrorKind>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedPushSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_for(&self, recipient: &str, kind: FwErrorKind) {
        self.responses
            .lock()
            .expect("poisoned")
            .insert(recipient.to_string(), kind);
    }

    /// Every recipient `send` was called with, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("poisoned").clone()
    }
}

#[async_trait]
impl PushSender for ScriptedPushSender {
    async fn send(&self, _id: &str, to: &str, _title: &str, _body: &str) -> Result<(), FwError> {
        self.calls.lock().expect("poisoned").push(to.to_string());
        if let Some(kind) = self.responses.lock().expect("poisoned").get(to) {
            return Err(FwError::new(*kind)
                .with_op("push_sender.send")
                .with_message(format!("scripted failure for {}", to)));
        }
        Ok(())
    }
}

/// A fixed, paginated list of saved searches per frequency, for exercising
/// the fan-out handler without a real Spanner-backed listing.
#[derive(Default)]
pub struct InMemorySavedSearchLister {
    searches: Mutex<BTreeMap<String, Vec<SavedSearchRef>>>,
    page_size: usize,
}

impl InMemorySavedSearchLister {
    /// `page_size` of 0 means "return everything in one page".
    pub fn new(page_size: usize) -> Self {
        Self {
            searches: Mutex::new(BTreeMap::new()),
            page_size,
        }
    }

    pub fn set_searches(&self, frequency: Frequency, searches: Vec<SavedSearchRef>) {
        self.searches
            .lock()
            .expect("poisoned")
            .insert(frequency.as_wire_str().to_string(), searches);
    }
}

#[async_trait]
impl SavedSearchLister for InMemorySavedSearchLister {
    async fn list_saved_searches(
        &self,
        frequency: Frequency,
        page_token: Option<String>,
    ) -> Result<(Vec<SavedSearchRef>, Option<String>), FwError> {
        let all = self
            .searches
            .lock()
            .expect("poisoned")
            .get(frequency.as_wire_str())
            .cloned()
            .unwrap_or_default();
        let offset: usize = page_token.as_deref().map(|t| t.parse().unwrap_or(0)).unwrap_or(0);
        let page_size = if self.page_size == 0 { all.len().max(1) } else { self.page_size };
        let page: Vec<SavedSearchRef> = all.iter().skip(offset).take(page_size).cloned().collect();
        let next = offset + page.len();
        let next_token = if next < all.len() { Some(next.to_string()) } else { None };
        Ok((page, next_token))
    }
}

/// A fixed subscription list keyed by search id, for exercising the
/// dispatcher's per-channel fan-out without a real subscriptions store.
#[derive(Default)]
pub struct InMemorySubscriptionLister {
    subscriptions: Mutex<BTreeMap<String, Vec<Subscription>>>,
}

impl InMemorySubscriptionLister {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_subscriptions(&self, search_id: &str, subs: Vec<Subscription>) {
        self.subscriptions
            .lock()
            .expect("poisoned")
            .insert(search_id.to_string(), subs);
    }
}

#[async_trait]
impl SubscriptionLister for InMemorySubscriptionLister {
    async fn list_subscriptions(&self, search_id: &str) -> Result<Vec<Subscription>, FwError> {
        Ok(self
            .subscriptions
            .lock()
            .expect("poisoned")
            .get(search_id)
            .cloned()
            .unwrap_or_default())
    }
}
