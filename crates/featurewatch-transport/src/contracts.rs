//! Async collaborator contracts consumed by `featurewatch-engine`.
//!
//! Every method is a suspension point: no shared mutable state crosses
//! these boundaries within a single `process_search` call. Implementations
//! must be `Send + Sync` so they can be held behind `Arc<dyn Trait>` and
//! called from concurrently spawned tasks.

use async_trait::async_trait;
use featurewatch_core::model::Feature;
use featurewatch_errors::FwError;
use featurewatch_types::Frequency;

/// The four shapes a feature catalog lookup can resolve to, mirroring
/// [`featurewatch_core::reconcile::FeatureCatalogEntry`] at the async
/// boundary. `featurewatch-engine` resolves a batch of these ahead of a
/// `reconcile` call and converts them into the core's synchronous enum.
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogEntry {
    Regular,
    Moved { new_id: String },
    Split { new_ids: Vec<String> },
    NotFound,
}

impl From<CatalogEntry> for featurewatch_core::reconcile::FeatureCatalogEntry {
    fn from(entry: CatalogEntry) -> Self {
        use featurewatch_core::reconcile::FeatureCatalogEntry as Core;
        match entry {
            CatalogEntry::Regular => Core::Regular,
            CatalogEntry::Moved { new_id } => Core::Moved { new_id },
            CatalogEntry::Split { new_ids } => Core::Split { new_ids },
            CatalogEntry::NotFound => Core::NotFound,
        }
    }
}

/// External search-query execution and feature-catalog lookup.
#[async_trait]
pub trait FeatureFetcher: Send + Sync {
    /// Execute `query` against the feature corpus and return every
    /// matched feature, fully paginated and aggregated — partial pages
    /// must never reach the diff engine.
    async fn fetch_features(&self, query: &str) -> Result<Vec<Feature>, FwError>;

    /// Resolve a single feature id's current catalog status, for
    /// reconciliation of a `removed` entry.
    async fn get_feature(&self, id: &str) -> Result<CatalogEntry, FwError>;
}

/// Content-addressed storage of blob envelopes (state/diff JSON).
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` under the given top-level directory (`"state"` or
    /// `"diff"`), keyed by its content digest. Returns the full path,
    /// which doubles as the blob's id.
    async fn store(&self, dir: &str, bytes: &[u8]) -> Result<(String, String), FwError>;

    /// Read back a blob by the full path returned from `store`.
    async fn get(&self, full_path: &str) -> Result<Vec<u8>, FwError>;
}

/// Identity of the most recently published event for a `(search_id,
/// frequency)` pair, as recorded in the metadata store's hot index.
#[derive(Debug, Clone, PartialEq)]
pub struct LatestEventInfo {
    pub event_id: String,
    pub state_id: String,
    pub diff_id: Option<String>,
    pub state_blob_path: String,
    pub diff_blob_path: Option<String>,
    pub query_signature: String,
    pub generated_at: chrono::DateTime<chrono::Utc>,
}

/// A guard representing a held advisory lock; dropping it does not itself
/// release the lock — callers must `release` it explicitly via
/// [`MetadataStore::release_lock`], typically from a `scopeguard` that
/// fires on every exit path including cancellation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockHandle {
    pub search_id: String,
    pub frequency: Frequency,
    pub worker_id: String,
}

/// Hot index of the latest event per `(search_id, frequency)`, plus the
/// per-search advisory lock.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Acquire the advisory lock for `(search_id, frequency)`, bound to
    /// `worker_id` for `ttl_ms`. Fails with a transient
    /// `FwErrorKind::LockContention` if another worker currently holds an
    /// unexpired lock.
    async fn acquire_lock(
        &self,
        search_id: &str,
        frequency: Frequency,
        worker_id: &str,
        ttl_ms: i64,
    ) -> Result<LockHandle, FwError>;

    /// Release a previously acquired lock. Idempotent: releasing an
    /// already-expired or already-released lock is not an error.
    async fn release_lock(&self, handle: &LockHandle) -> Result<(), FwError>;

    /// Upsert the latest-event row for `(search_id, frequency)`.
    async fn publish_event(
        &self,
        search_id: &str,
        frequency: Frequency,
        info: LatestEventInfo,
    ) -> Result<(), FwError>;

    /// Look up the latest event for `(search_id, frequency)`. `None` means
    /// no prior run exists (cold start), expressed as an `Option` rather
    /// than a sentinel not-found error.
    async fn get_latest_event(
        &self,
        search_id: &str,
        frequency: Frequency,
    ) -> Result<Option<LatestEventInfo>, FwError>;
}

/// Producer-side publish of refresh/batch-trigger commands.
#[async_trait]
pub trait CommandPublisher: Send + Sync {
    async fn publish(&self, envelope: crate::envelopes::CommandEnvelope) -> Result<(), FwError>;
}

/// Consumer-side subscription to refresh/batch-trigger commands.
#[async_trait]
pub trait CommandSubscriber: Send + Sync {
    /// Receive the next command, or `None` if the channel has closed.
    async fn recv(&mut self) -> Option<crate::envelopes::CommandEnvelope>;
}

/// Outbound publish of a `FeatureDiffEvent`.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: crate::envelopes::FeatureDiffEventEnvelope)
        -> Result<(), FwError>;
}

/// Consumer-side subscription to `FeatureDiffEvent`s, for the dispatcher.
#[async_trait]
pub trait EventSubscriber: Send + Sync {
    async fn recv(&mut self) -> Option<crate::envelopes::FeatureDiffEventEnvelope>;
}

/// Outbound publish of an email delivery job.
#[async_trait]
pub trait EmailPublisher: Send + Sync {
    async fn publish_email_job(&self, job: crate::envelopes::EmailDeliveryJob) -> Result<(), FwError>;
}

/// Outbound publish of a push delivery job.
#[async_trait]
pub trait PushPublisher: Send + Sync {
    async fn publish_push_job(&self, job: crate::envelopes::PushDeliveryJob) -> Result<(), FwError>;
}

/// Consumer-side subscription to enqueued email delivery jobs, drained by
/// the final-mile delivery loop that calls [`EmailSender`].
#[async_trait]
pub trait EmailJobSubscriber: Send + Sync {
    async fn recv(&mut self) -> Option<crate::envelopes::EmailDeliveryJob>;
}

/// Consumer-side subscription to enqueued push delivery jobs, drained by
/// the final-mile delivery loop that calls [`PushSender`].
#[async_trait]
pub trait PushJobSubscriber: Send + Sync {
    async fn recv(&mut self) -> Option<crate::envelopes::PushDeliveryJob>;
}

/// Final-mile email send, implemented by a concrete SMTP/provider adapter.
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(
        &self,
        id: &str,
        to: &str,
        subject: &str,
        html_body: &str,
    ) -> Result<(), FwError>;
}

/// Final-mile push send, implemented by a concrete push-provider adapter.
#[async_trait]
pub trait PushSender: Send + Sync {
    async fn send(&self, id: &str, to: &str, title: &str, body: &str) -> Result<(), FwError>;
}

/// One page of saved-search listing results.
#[derive(Debug, Clone, PartialEq)]
pub struct SavedSearchRef {
    pub search_id: String,
    pub query: String,
}

/// Paginated listing of saved searches at a given refresh frequency,
/// consumed by the batch fan-out handler. Persistent storage of the
/// underlying searches is an external collaborator; this is the only
/// contract the core needs of it.
#[async_trait]
pub trait SavedSearchLister: Send + Sync {
    /// Return the next page of searches scheduled at `frequency`, plus a
    /// token for the following page, or `None` once exhausted.
    async fn list_saved_searches(
        &self,
        frequency: Frequency,
        page_token: Option<String>,
    ) -> Result<(Vec<SavedSearchRef>, Option<String>), FwError>;
}

/// One subscriber's notification channel for a saved search.
#[derive(Debug, Clone, PartialEq)]
pub enum Channel {
    Email { recipient_email: String },
    Push { recipient_token: String },
}

/// A single active subscription to a saved search's diff events.
#[derive(Debug, Clone, PartialEq)]
pub struct Subscription {
    pub subscription_id: String,
    pub channel: Channel,
}

/// Enumerates the active subscriptions for a saved search, consumed by the
/// dispatcher to fan a `FeatureDiffEvent` out into per-channel delivery jobs.
#[async_trait]
pub trait SubscriptionLister: Send + Sync {
    async fn list_subscriptions(&self, search_id: &str) -> Result<Vec<Subscription>, FwError>;
}
