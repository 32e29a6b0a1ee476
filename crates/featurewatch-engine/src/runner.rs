//! Task wiring: the fan-out handler, the producer consumer, and the
//! dispatcher each run as independent long-lived tasks, each consuming
//! its own subscription and spawning one task per inbound message.
//!
//! Concurrency is bounded only on the producer side, via a semaphore sized
//! by [`crate::config::EngineConfig::max_concurrent_searches`] — fan-out
//! and dispatch are comparatively cheap per message and are left
//! unbounded, matching the "parallel worker tasks... each subscription
//! callback runs on an independent task" scheduling model.

use crate::delivery::{self, DeliveryContext};
use crate::dispatcher::{self, DispatcherContext};
use crate::fanout::{self, FanoutContext};
use crate::producer::{self, ProducerContext};
use featurewatch_transport::contracts::{
    CommandSubscriber, EmailJobSubscriber, EventSubscriber, PushJobSubscriber,
};
use featurewatch_transport::envelopes::CommandEnvelope;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Deterministic per-message trigger id: same command redelivered by the
/// transport produces the same id, so the producer's idempotency contract
/// sees it as a retry rather than a new event.
fn command_trigger_id(search_id: &str, timestamp: &chrono::DateTime<chrono::Utc>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(search_id.as_bytes());
    hasher.update(timestamp.to_rfc3339().as_bytes());
    hex::encode(hasher.finalize())
}

/// Running handles for the engine's loops, plus the token that stops them.
pub struct EngineHandle {
    pub cancellation: CancellationToken,
    fanout: JoinHandle<()>,
    producer: JoinHandle<()>,
    dispatcher: JoinHandle<()>,
    email_delivery: JoinHandle<()>,
    push_delivery: JoinHandle<()>,
}

impl EngineHandle {
    /// Cancel every loop and wait for them to exit.
    pub async fn shutdown(self) {
        self.cancellation.cancel();
        let _ = tokio::join!(
            self.fanout,
            self.producer,
            self.dispatcher,
            self.email_delivery,
            self.push_delivery
        );
    }
}

/// Spawn the fan-out, producer, dispatcher, and final-mile delivery loops
/// as independent tasks.
///
/// `trigger_subscriber` delivers `BatchRefreshTrigger` messages, distinct
/// from `command_subscriber`, which delivers the per-search
/// `RefreshSearchCommand`/`SearchConfigurationChangedEvent` messages the
/// fan-out handler (or an external caller) publishes onto the producer's
/// input topic. `email_job_subscriber`/`push_job_subscriber` drain the jobs
/// the dispatcher enqueues and hand each to `delivery_ctx`'s sender.
#[allow(clippy::too_many_arguments)]
pub fn spawn_engine(
    producer_ctx: ProducerContext,
    fanout_ctx: FanoutContext,
    dispatcher_ctx: DispatcherContext,
    delivery_ctx: DeliveryContext,
    trigger_subscriber: Box<dyn CommandSubscriber>,
    command_subscriber: Box<dyn CommandSubscriber>,
    event_subscriber: Box<dyn EventSubscriber>,
    email_job_subscriber: Box<dyn EmailJobSubscriber>,
    push_job_subscriber: Box<dyn PushJobSubscriber>,
    max_concurrent_searches: usize,
) -> EngineHandle {
    let cancellation = CancellationToken::new();

    let fanout = tokio::spawn(run_fanout_loop(
        fanout_ctx,
        trigger_subscriber,
        cancellation.clone(),
    ));
    let producer = tokio::spawn(run_producer_loop(
        producer_ctx,
        command_subscriber,
        max_concurrent_searches,
        cancellation.clone(),
    ));
    let dispatcher = tokio::spawn(run_dispatcher_loop(
        dispatcher_ctx,
        event_subscriber,
        cancellation.clone(),
    ));
    let email_delivery = tokio::spawn(run_email_delivery_loop(
        delivery_ctx.clone(),
        email_job_subscriber,
        cancellation.clone(),
    ));
    let push_delivery = tokio::spawn(run_push_delivery_loop(
        delivery_ctx,
        push_job_subscriber,
        cancellation.clone(),
    ));

    EngineHandle {
        cancellation,
        fanout,
        producer,
        dispatcher,
        email_delivery,
        push_delivery,
    }
}

async fn run_fanout_loop(
    ctx: FanoutContext,
    mut subscriber: Box<dyn CommandSubscriber>,
    cancellation: CancellationToken,
) {
    loop {
        let envelope = tokio::select! {
            biased;
            _ = cancellation.cancelled() => break,
            msg = subscriber.recv() => msg,
        };
        let Some(envelope) = envelope else { break };
        let CommandEnvelope::BatchRefreshTrigger(trigger) = envelope else {
            continue;
        };
        let ctx = ctx.clone();
        tokio::spawn(async move {
            let generated_at = chrono::Utc::now();
            if let Err(err) = fanout::process_batch_update(&ctx, trigger.frequency, generated_at).await
            {
                tracing::error!(error = %err, frequency = ?trigger.frequency, "batch fan-out failed");
            }
        });
    }
}

async fn run_producer_loop(
    ctx: ProducerContext,
    mut subscriber: Box<dyn CommandSubscriber>,
    max_concurrent_searches: usize,
    cancellation: CancellationToken,
) {
    let semaphore = Arc::new(Semaphore::new(max_concurrent_searches.max(1)));
    loop {
        let envelope = tokio::select! {
            biased;
            _ = cancellation.cancelled() => break,
            msg = subscriber.recv() => msg,
        };
        let Some(envelope) = envelope else { break };
        let command = match envelope {
            CommandEnvelope::RefreshSearch(cmd) => cmd,
            CommandEnvelope::SearchConfigurationChanged(cmd) => cmd,
            CommandEnvelope::BatchRefreshTrigger(_) => continue,
        };

        let ctx = ctx.clone();
        let semaphore = semaphore.clone();
        tokio::spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return,
            };
            let trigger_id = command_trigger_id(&command.search_id, &command.timestamp);
            match producer::process_search(
                &ctx,
                &command.search_id,
                &command.query,
                command.frequency,
                &trigger_id,
            )
            .await
            {
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(
                        search_id = %command.search_id,
                        error = %err,
                        class = ?err.class(),
                        "process_search failed"
                    );
                }
            }
        });
    }
}

async fn run_dispatcher_loop(
    ctx: DispatcherContext,
    mut subscriber: Box<dyn EventSubscriber>,
    cancellation: CancellationToken,
) {
    loop {
        let envelope = tokio::select! {
            biased;
            _ = cancellation.cancelled() => break,
            msg = subscriber.recv() => msg,
        };
        let Some(envelope) = envelope else { break };
        let ctx = ctx.clone();
        tokio::spawn(async move {
            match dispatcher::process_event(&ctx, &envelope.data).await {
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(
                        search_id = %envelope.data.search_id,
                        event_id = %envelope.data.event_id,
                        error = %err,
                        "process_event failed"
                    );
                }
            }
        });
    }
}

async fn run_email_delivery_loop(
    ctx: DeliveryContext,
    mut subscriber: Box<dyn EmailJobSubscriber>,
    cancellation: CancellationToken,
) {
    loop {
        let job = tokio::select! {
            biased;
            _ = cancellation.cancelled() => break,
            msg = subscriber.recv() => msg,
        };
        let Some(job) = job else { break };
        let ctx = ctx.clone();
        tokio::spawn(async move {
            if let Err(err) = delivery::send_email_job(&ctx, &job).await {
                tracing::warn!(
                    search_id = %job.metadata.search_id,
                    event_id = %job.metadata.event_id,
                    subscription_id = %job.subscription_id,
                    error = %err,
                    class = ?err.class(),
                    "email delivery failed"
                );
            }
        });
    }
}

async fn run_push_delivery_loop(
    ctx: DeliveryContext,
    mut subscriber: Box<dyn PushJobSubscriber>,
    cancellation: CancellationToken,
) {
    loop {
        let job = tokio::select! {
            biased;
            _ = cancellation.cancelled() => break,
            msg = subscriber.recv() => msg,
        };
        let Some(job) = job else { break };
        let ctx = ctx.clone();
        tokio::spawn(async move {
            if let Err(err) = delivery::send_push_job(&ctx, &job).await {
                tracing::warn!(
                    search_id = %job.metadata.search_id,
                    event_id = %job.metadata.event_id,
                    subscription_id = %job.subscription_id,
                    error = %err,
                    class = ?err.class(),
                    "push delivery failed"
                );
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProducerConfig;
    use featurewatch_core::model::{BaselineStatus, BaselineStatusValue, Feature};
    use featurewatch_transport::contracts::SavedSearchRef;
    use featurewatch_transport::envelopes::BatchRefreshTrigger;
    use featurewatch_transport::inmemory::{
        command_channel, email_job_channel, event_channel, push_job_channel, InMemoryBlobStore,
        InMemoryFeatureFetcher, InMemoryMetadataStore, InMemorySavedSearchLister,
        InMemorySubscriptionLister, RecordingEmailSink, RecordingPushSink, ScriptedEmailSender,
        ScriptedPushSender,
    };
    use featurewatch_types::{Frequency, OptionallySet};
    use std::collections::BTreeMap;
    use std::time::Duration;

    fn feature(id: &str) -> Feature {
        Feature {
            id: id.to_string(),
            name: OptionallySet::set(id.to_string()),
            baseline_status: OptionallySet::set(BaselineStatus {
                status: BaselineStatusValue::Widely,
                low_date: None,
                high_date: None,
            }),
            browser_impls: OptionallySet::unset(),
            docs: OptionallySet::unset(),
        }
    }

    #[tokio::test]
    async fn full_loop_fans_out_processes_and_dispatches() {
        let saved_search_lister = Arc::new(InMemorySavedSearchLister::new(10));
        saved_search_lister.set_searches(
            Frequency::Immediate,
            vec![SavedSearchRef {
                search_id: "s1".to_string(),
                query: "category:css".to_string(),
            }],
        );

        let mut features = BTreeMap::new();
        features.insert("grid".to_string(), feature("grid"));
        let feature_fetcher = Arc::new(InMemoryFeatureFetcher::new(features, BTreeMap::new()));
        let blob_store = Arc::new(InMemoryBlobStore::new());
        let metadata_store = Arc::new(InMemoryMetadataStore::new());
        let (event_publisher, event_subscriber) = event_channel();

        let subscription_lister = Arc::new(InMemorySubscriptionLister::new());
        let email_sink = Arc::new(RecordingEmailSink::new());

        let (trigger_publisher, trigger_subscriber) = command_channel();
        let (command_publisher, command_subscriber) = command_channel();

        let producer_ctx = ProducerContext {
            feature_fetcher,
            blob_store,
            metadata_store,
            event_publisher: Arc::new(event_publisher),
            config: ProducerConfig::default(),
        };
        let fanout_ctx = FanoutContext {
            saved_search_lister,
            command_publisher: Arc::new(command_publisher),
        };
        let dispatcher_ctx = DispatcherContext {
            subscription_lister,
            email_publisher: email_sink.clone(),
            push_publisher: Arc::new(RecordingPushSink::new()),
        };
        let delivery_ctx = DeliveryContext {
            email_sender: Arc::new(ScriptedEmailSender::new()),
            push_sender: Arc::new(ScriptedPushSender::new()),
        };
        let (_email_job_publisher, email_job_subscriber) = email_job_channel();
        let (_push_job_publisher, push_job_subscriber) = push_job_channel();

        let handle = spawn_engine(
            producer_ctx,
            fanout_ctx,
            dispatcher_ctx,
            delivery_ctx,
            Box::new(trigger_subscriber),
            Box::new(command_subscriber),
            Box::new(event_subscriber),
            Box::new(email_job_subscriber),
            Box::new(push_job_subscriber),
            4,
        );

        trigger_publisher
            .publish(CommandEnvelope::BatchRefreshTrigger(BatchRefreshTrigger {
                frequency: Frequency::Immediate,
            }))
            .await
            .unwrap();

        // Give the spawned tasks a few scheduler turns to settle: fan-out
        // publishes onto the command channel the producer loop reads.
        tokio::time::sleep(Duration::from_millis(50)).await;

        handle.shutdown().await;

        assert_eq!(email_sink.jobs().len(), 0); // no subscriptions configured
    }

    #[tokio::test]
    async fn shutdown_stops_all_loops_without_panicking() {
        let (_trigger_publisher, trigger_subscriber) = command_channel();
        let (_command_publisher, command_subscriber) = command_channel();
        let (_event_publisher, event_subscriber) = event_channel();

        let producer_ctx = ProducerContext {
            feature_fetcher: Arc::new(InMemoryFeatureFetcher::new(BTreeMap::new(), BTreeMap::new())),
            blob_store: Arc::new(InMemoryBlobStore::new()),
            metadata_store: Arc::new(InMemoryMetadataStore::new()),
            event_publisher: Arc::new(event_channel().0),
            config: ProducerConfig::default(),
        };
        let fanout_ctx = FanoutContext {
            saved_search_lister: Arc::new(InMemorySavedSearchLister::new(10)),
            command_publisher: Arc::new(command_channel().0),
        };
        let dispatcher_ctx = DispatcherContext {
            subscription_lister: Arc::new(InMemorySubscriptionLister::new()),
            email_publisher: Arc::new(RecordingEmailSink::new()),
            push_publisher: Arc::new(RecordingPushSink::new()),
        };
        let delivery_ctx = DeliveryContext {
            email_sender: Arc::new(ScriptedEmailSender::new()),
            push_sender: Arc::new(ScriptedPushSender::new()),
        };
        let (_email_job_publisher, email_job_subscriber) = email_job_channel();
        let (_push_job_publisher, push_job_subscriber) = push_job_channel();

        let handle = spawn_engine(
            producer_ctx,
            fanout_ctx,
            dispatcher_ctx,
            delivery_ctx,
            Box::new(trigger_subscriber),
            Box::new(command_subscriber),
            Box::new(event_subscriber),
            Box::new(email_job_subscriber),
            Box::new(push_job_subscriber),
            2,
        );
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn email_delivery_loop_drains_jobs_enqueued_by_the_dispatcher() {
        let saved_search_lister = Arc::new(InMemorySavedSearchLister::new(10));
        saved_search_lister.set_searches(
            Frequency::Immediate,
            vec![SavedSearchRef {
                search_id: "s1".to_string(),
                query: "category:css".to_string(),
            }],
        );

        let mut features = BTreeMap::new();
        features.insert("grid".to_string(), feature("grid"));
        let feature_fetcher = Arc::new(InMemoryFeatureFetcher::new(features, BTreeMap::new()));
        let blob_store = Arc::new(InMemoryBlobStore::new());
        let metadata_store = Arc::new(InMemoryMetadataStore::new());
        let (event_publisher, event_subscriber) = event_channel();

        let subscription_lister = Arc::new(InMemorySubscriptionLister::new());
        subscription_lister.set_subscriptions(
            "s1",
            vec![featurewatch_transport::contracts::Subscription {
                subscription_id: "sub1".to_string(),
                channel: featurewatch_transport::contracts::Channel::Email {
                    recipient_email: "a@example.com".to_string(),
                },
            }],
        );

        let (trigger_publisher, trigger_subscriber) = command_channel();
        let (command_publisher, command_subscriber) = command_channel();
        let (email_job_publisher, email_job_subscriber) = email_job_channel();
        let (_push_job_publisher, push_job_subscriber) = push_job_channel();

        let email_sender = Arc::new(ScriptedEmailSender::new());
        email_sender.fail_for("a@example.com", featurewatch_errors::FwErrorKind::UndeliverableRecipient);

        let producer_ctx = ProducerContext {
            feature_fetcher,
            blob_store,
            metadata_store,
            event_publisher: Arc::new(event_publisher),
            config: ProducerConfig::default(),
        };
        let fanout_ctx = FanoutContext {
            saved_search_lister,
            command_publisher: Arc::new(command_publisher),
        };
        let dispatcher_ctx = DispatcherContext {
            subscription_lister,
            email_publisher: Arc::new(email_job_publisher),
            push_publisher: Arc::new(RecordingPushSink::new()),
        };
        let delivery_ctx = DeliveryContext {
            email_sender: email_sender.clone(),
            push_sender: Arc::new(ScriptedPushSender::new()),
        };

        let handle = spawn_engine(
            producer_ctx,
            fanout_ctx,
            dispatcher_ctx,
            delivery_ctx,
            Box::new(trigger_subscriber),
            Box::new(command_subscriber),
            Box::new(event_subscriber),
            Box::new(email_job_subscriber),
            Box::new(push_job_subscriber),
            4,
        );

        trigger_publisher
            .publish(CommandEnvelope::BatchRefreshTrigger(BatchRefreshTrigger {
                frequency: Frequency::Immediate,
            }))
            .await
            .unwrap();

        // Give the fan-out -> producer -> dispatcher -> delivery chain a
        // few scheduler turns to settle before asserting it reached the
        // final-mile sender.
        tokio::time::sleep(Duration::from_millis(100)).await;

        handle.shutdown().await;

        assert_eq!(email_sender.calls(), vec!["a@example.com".to_string()]);
    }

    #[test]
    fn refresh_command_trigger_id_is_deterministic_for_redelivery() {
        let ts = chrono::Utc::now();
        let a = command_trigger_id("s1", &ts);
        let b = command_trigger_id("s1", &ts);
        assert_eq!(a, b);
    }
}
