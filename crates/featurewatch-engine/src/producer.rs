//! Producer orchestrator: `process_search` drives one saved search through
//! lock acquisition, feature fetch, diff, reconciliation, blob persistence,
//! and event publication.
//!
//! This is the only place in the engine that touches more than one
//! collaborator in sequence; every suspension point is an `async fn` call
//! on a trait object, and no shared mutable state crosses them within a
//! single call, per the concurrency model's requirement.

use crate::config::ProducerConfig;
use featurewatch_core::diff::model::Diff;
use featurewatch_core::model::Feature;
use featurewatch_core::reconcile::{FeatureCatalog, FeatureCatalogEntry};
use featurewatch_core::snapshot::{Snapshot, SnapshotMetadata};
use featurewatch_errors::FwError;
use featurewatch_store::envelope::{BlobEnvelope, KIND_DIFF, KIND_SNAPSHOT};
use featurewatch_transport::contracts::{
    BlobStore, CatalogEntry, EventPublisher, FeatureFetcher, LatestEventInfo, MetadataStore,
};
use featurewatch_transport::envelopes::{FeatureDiffEventData, FeatureDiffEventEnvelope, Reason};
use featurewatch_types::Frequency;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::sync::Arc;

/// The collaborators `process_search` needs, held behind `Arc<dyn Trait>`
/// so the struct is `Clone`-cheap and safe to share across spawned tasks.
#[derive(Clone)]
pub struct ProducerContext {
    pub feature_fetcher: Arc<dyn FeatureFetcher>,
    pub blob_store: Arc<dyn BlobStore>,
    pub metadata_store: Arc<dyn MetadataStore>,
    pub event_publisher: Arc<dyn EventPublisher>,
    pub config: ProducerConfig,
}

/// The result of a successful `process_search` call. `NoChange` is not an
/// error: it is an ack with nothing published.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessOutcome {
    Published { event_id: String },
    NoChange,
}

/// A pre-resolved, synchronous view over a batch of async `get_feature`
/// lookups, handed to `featurewatch_core::reconcile::reconcile`.
struct ResolvedCatalog(BTreeMap<String, FeatureCatalogEntry>);

impl FeatureCatalog for ResolvedCatalog {
    fn get_feature(&self, id: &str) -> FeatureCatalogEntry {
        self.0.get(id).cloned().unwrap_or(FeatureCatalogEntry::NotFound)
    }
}

fn query_signature(query: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(query.as_bytes());
    hex::encode(hasher.finalize())
}

/// Run the producer state machine for one saved search.
///
/// `trigger_id` is both the lock's `worker_id` and the resulting event's
/// `event_id` — per the idempotency contract, re-delivery with the same
/// `trigger_id` against unchanged inputs reproduces the same blobs
/// (content-addressed) and the same metadata row.
pub async fn process_search(
    ctx: &ProducerContext,
    search_id: &str,
    query: &str,
    frequency: Frequency,
    trigger_id: &str,
) -> Result<ProcessOutcome, FwError> {
    let lock = ctx
        .metadata_store
        .acquire_lock(search_id, frequency, trigger_id, ctx.config.lock_ttl_ms)
        .await?;

    // Guards the case where the enclosing task is cancelled mid-await: the
    // synchronous `Drop` still runs, and spawns the release as a detached
    // task since it cannot itself `.await`. The ordinary path below defuses
    // this guard and releases inline, so tests observe release
    // synchronously rather than racing a detached task.
    let metadata_store = ctx.metadata_store.clone();
    let release_on_drop = scopeguard::guard(Some(lock.clone()), move |pending| {
        if let Some(lock) = pending {
            tokio::spawn(async move {
                let _ = metadata_store.release_lock(&lock).await;
            });
        }
    });

    let result = run_locked(ctx, search_id, query, frequency, trigger_id).await;

    scopeguard::ScopeGuard::into_inner(release_on_drop);
    if let Err(release_err) = ctx.metadata_store.release_lock(&lock).await {
        tracing::warn!(
            search_id = search_id,
            error = %release_err,
            "lock release failed; relying on TTL expiry"
        );
    }

    result
}

async fn run_locked(
    ctx: &ProducerContext,
    search_id: &str,
    query: &str,
    frequency: Frequency,
    trigger_id: &str,
) -> Result<ProcessOutcome, FwError> {
    let prior = ctx
        .metadata_store
        .get_latest_event(search_id, frequency)
        .await?;

    let prior_snapshot = match &prior {
        Some(info) => Some(load_snapshot(ctx, &info.state_blob_path).await?),
        None => None,
    };

    let live_features = ctx.feature_fetcher.fetch_features(query).await?;
    let new_map: BTreeMap<String, Feature> = live_features
        .into_iter()
        .map(|f| (f.id.clone(), f))
        .collect();
    let old_map = prior_snapshot
        .as_ref()
        .map(|s| s.data.clone())
        .unwrap_or_default();

    let signature = query_signature(query);
    let query_changed = prior_snapshot
        .as_ref()
        .map(|s| s.metadata.query_signature != signature)
        .unwrap_or(false);

    let diff = featurewatch_core::compare(&old_map, &new_map, query_changed);
    let diff = reconcile_with_catalog(ctx, diff).await?;

    let content_changed = diff_has_content(&diff);
    if !content_changed && !diff.query_changed {
        return Ok(ProcessOutcome::NoChange);
    }

    let generated_at = chrono::Utc::now();
    // The envelope's own content digest (computed by `blob_store.store`
    // below) can't be embedded in the bytes it's a digest of, so
    // `metadata.id` uses a digest of the feature map alone — still
    // content-addressed, just over a narrower payload than the full blob.
    let content_digest = {
        let mut hasher = Sha256::new();
        hasher.update(serde_json::to_vec(&new_map)?);
        hex::encode(hasher.finalize())
    };
    let state_snapshot = Snapshot::new(
        SnapshotMetadata {
            id: content_digest,
            event_id: trigger_id.to_string(),
            search_id: search_id.to_string(),
            query_signature: signature.clone(),
            generated_at,
        },
        new_map,
    );

    let state_bytes = BlobEnvelope::new(KIND_SNAPSHOT, featurewatch_core::snapshot::CURRENT_API_VERSION, state_snapshot)
        .to_bytes()?;
    let (state_id, state_blob_path) = ctx.blob_store.store("state", &state_bytes).await?;

    let (diff_id, diff_blob_path) = if content_changed {
        let diff_bytes = BlobEnvelope::new(KIND_DIFF, featurewatch_core::diff::model::CURRENT_API_VERSION, diff.clone())
            .to_bytes()?;
        let (digest, path) = ctx.blob_store.store("diff", &diff_bytes).await?;
        (Some(digest), Some(path))
    } else {
        (None, None)
    };

    let reasons = compute_reasons(content_changed, diff.query_changed);
    let summary = base64_summary(&diff);

    let info = LatestEventInfo {
        event_id: trigger_id.to_string(),
        state_id: state_id.clone(),
        diff_id: diff_id.clone(),
        state_blob_path: state_blob_path.clone(),
        diff_blob_path: diff_blob_path.clone(),
        query_signature: signature.clone(),
        generated_at,
    };
    ctx.metadata_store
        .publish_event(search_id, frequency, info)
        .await?;

    let envelope = FeatureDiffEventEnvelope::new(FeatureDiffEventData {
        event_id: trigger_id.to_string(),
        search_id: search_id.to_string(),
        query: query.to_string(),
        summary,
        state_id,
        diff_id,
        state_blob_path,
        diff_blob_path,
        reasons,
        frequency,
        generated_at,
    });
    ctx.event_publisher.publish(envelope).await?;

    Ok(ProcessOutcome::Published {
        event_id: trigger_id.to_string(),
    })
}

async fn load_snapshot(ctx: &ProducerContext, path: &str) -> Result<Snapshot, FwError> {
    let bytes = ctx.blob_store.get(path).await?;
    BlobEnvelope::decode(&bytes, KIND_SNAPSHOT, featurewatch_core::snapshot::CURRENT_API_VERSION)
}

async fn reconcile_with_catalog(ctx: &ProducerContext, diff: Diff) -> Result<Diff, FwError> {
    let mut resolved = BTreeMap::new();
    for removed in &diff.removed {
        let entry = ctx.feature_fetcher.get_feature(&removed.id).await?;
        resolved.insert(removed.id.clone(), core_entry(entry));
    }
    let catalog = ResolvedCatalog(resolved);
    Ok(featurewatch_core::reconcile(diff, &catalog))
}

fn core_entry(entry: CatalogEntry) -> FeatureCatalogEntry {
    entry.into()
}

fn diff_has_content(diff: &Diff) -> bool {
    !diff.added.is_empty()
        || !diff.removed.is_empty()
        || !diff.modified.is_empty()
        || !diff.moves.is_empty()
        || !diff.splits.is_empty()
}

fn compute_reasons(content_changed: bool, query_changed: bool) -> Vec<Reason> {
    let mut reasons = Vec::new();
    if content_changed {
        reasons.push(Reason::DataUpdated);
    }
    if query_changed {
        reasons.push(Reason::QueryChanged);
    }
    reasons
}

fn base64_summary(diff: &Diff) -> String {
    use base64::Engine;
    let text = format!(
        "added={} removed={} modified={} moves={} splits={} query_changed={}",
        diff.added.len(),
        diff.removed.len(),
        diff.modified.len(),
        diff.moves.len(),
        diff.splits.len(),
        diff.query_changed
    );
    base64::engine::general_purpose::STANDARD.encode(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use featurewatch_core::model::{BaselineStatus, BaselineStatusValue};
    use featurewatch_errors::FwErrorKind;
    use featurewatch_transport::inmemory::{
        event_channel, InMemoryBlobStore, InMemoryFeatureFetcher, InMemoryMetadataStore,
    };
    use featurewatch_types::OptionallySet;

    fn feature(id: &str, name: &str) -> Feature {
        Feature {
            id: id.to_string(),
            name: OptionallySet::set(name.to_string()),
            baseline_status: OptionallySet::set(BaselineStatus {
                status: BaselineStatusValue::Widely,
                low_date: None,
                high_date: None,
            }),
            browser_impls: OptionallySet::unset(),
            docs: OptionallySet::unset(),
        }
    }

    fn test_ctx(fetcher: InMemoryFeatureFetcher) -> ProducerContext {
        let (event_publisher, _subscriber) = event_channel();
        ProducerContext {
            feature_fetcher: Arc::new(fetcher),
            blob_store: Arc::new(InMemoryBlobStore::new()),
            metadata_store: Arc::new(InMemoryMetadataStore::new()),
            event_publisher: Arc::new(event_publisher),
            config: ProducerConfig::default(),
        }
    }

    #[tokio::test]
    async fn cold_start_publishes_added_feature() {
        let mut features = BTreeMap::new();
        features.insert("grid".to_string(), feature("grid", "CSS Grid"));
        let fetcher = InMemoryFeatureFetcher::new(features, BTreeMap::new());
        let ctx = test_ctx(fetcher);

        let outcome = process_search(&ctx, "s1", "category:css", Frequency::Immediate, "trigger-1")
            .await
            .unwrap();
        assert_eq!(
            outcome,
            ProcessOutcome::Published {
                event_id: "trigger-1".to_string()
            }
        );
    }

    #[tokio::test]
    async fn identical_rerun_is_a_no_change() {
        let mut features = BTreeMap::new();
        features.insert("grid".to_string(), feature("grid", "CSS Grid"));
        let fetcher = InMemoryFeatureFetcher::new(features, BTreeMap::new());
        let ctx = test_ctx(fetcher);

        process_search(&ctx, "s1", "category:css", Frequency::Immediate, "trigger-1")
            .await
            .unwrap();
        let outcome = process_search(&ctx, "s1", "category:css", Frequency::Immediate, "trigger-2")
            .await
            .unwrap();
        assert_eq!(outcome, ProcessOutcome::NoChange);
    }

    #[tokio::test]
    async fn idempotent_rerun_with_same_trigger_produces_same_state_id() {
        let mut features = BTreeMap::new();
        features.insert("grid".to_string(), feature("grid", "CSS Grid"));
        let fetcher = InMemoryFeatureFetcher::new(features, BTreeMap::new());
        let ctx = test_ctx(fetcher);

        process_search(&ctx, "s1", "category:css", Frequency::Immediate, "trigger-1")
            .await
            .unwrap();
        let first_info = ctx
            .metadata_store
            .get_latest_event("s1", Frequency::Immediate)
            .await
            .unwrap()
            .unwrap();

        // Re-run against an unchanged feature set and a fresh but
        // content-identical `Snapshot` — state id is the content digest,
        // so a rename-free replay regenerates the same id.
        let outcome = process_search(&ctx, "s1", "category:css", Frequency::Immediate, "trigger-1")
            .await
            .unwrap();
        assert_eq!(outcome, ProcessOutcome::NoChange);
        let second_info = ctx
            .metadata_store
            .get_latest_event("s1", Frequency::Immediate)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first_info.state_id, second_info.state_id);
    }

    #[tokio::test]
    async fn concurrent_calls_for_same_search_serialize_via_lock() {
        let mut features = BTreeMap::new();
        features.insert("grid".to_string(), feature("grid", "CSS Grid"));
        let fetcher = InMemoryFeatureFetcher::new(features, BTreeMap::new());
        let ctx = test_ctx(fetcher);

        let lock = ctx
            .metadata_store
            .acquire_lock("s1", Frequency::Immediate, "holder", 60_000)
            .await
            .unwrap();

        let err = process_search(&ctx, "s1", "category:css", Frequency::Immediate, "trigger-1")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), FwErrorKind::LockContention);

        ctx.metadata_store.release_lock(&lock).await.unwrap();
    }
}
