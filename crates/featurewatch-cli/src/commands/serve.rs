//! `serve`: run the fan-out handler, producer, and dispatcher loops
//! against in-memory transport, periodically firing a batch trigger,
//! until the process receives Ctrl-C.

use clap::Args;
use featurewatch_engine::{
    spawn_engine, DeliveryContext, DispatcherContext, FanoutContext, ProducerConfig, ProducerContext,
};
use featurewatch_transport::contracts::{CommandPublisher, SavedSearchRef};
use featurewatch_transport::envelopes::{BatchRefreshTrigger, CommandEnvelope};
use featurewatch_transport::inmemory::{
    command_channel, email_job_channel, event_channel, push_job_channel, InMemoryBlobStore,
    InMemoryFeatureFetcher, InMemoryMetadataStore, InMemorySavedSearchLister,
    InMemorySubscriptionLister, ScriptedEmailSender, ScriptedPushSender,
};
use featurewatch_types::Frequency;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Upper bound on concurrently in-flight `process_search` tasks.
    #[arg(long, default_value_t = 8)]
    pub max_concurrent_searches: usize,

    /// Seconds between synthetic `BatchRefreshTrigger` firings, demonstrating
    /// the scheduled fan-out path. Zero disables the synthetic trigger.
    #[arg(long, default_value_t = 30)]
    pub trigger_interval_secs: u64,
}

pub async fn execute(args: ServeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let saved_search_lister = Arc::new(InMemorySavedSearchLister::new(50));
    saved_search_lister.set_searches(Frequency::Immediate, Vec::<SavedSearchRef>::new());

    let (trigger_publisher, trigger_subscriber) = command_channel();
    let (command_publisher, command_subscriber) = command_channel();
    let (event_publisher, event_subscriber) = event_channel();
    let (email_job_publisher, email_job_subscriber) = email_job_channel();
    let (push_job_publisher, push_job_subscriber) = push_job_channel();

    let producer_ctx = ProducerContext {
        feature_fetcher: Arc::new(InMemoryFeatureFetcher::new(BTreeMap::new(), BTreeMap::new())),
        blob_store: Arc::new(InMemoryBlobStore::new()),
        metadata_store: Arc::new(InMemoryMetadataStore::new()),
        event_publisher: Arc::new(event_publisher),
        config: ProducerConfig::default(),
    };
    let fanout_ctx = FanoutContext {
        saved_search_lister,
        command_publisher: Arc::new(command_publisher),
    };
    let dispatcher_ctx = DispatcherContext {
        subscription_lister: Arc::new(InMemorySubscriptionLister::new()),
        email_publisher: Arc::new(email_job_publisher),
        push_publisher: Arc::new(push_job_publisher),
    };
    // A real deployment swaps these for an SMTP/push-provider adapter; the
    // demo CLI logs final-mile sends through the scripted doubles instead.
    let delivery_ctx = DeliveryContext {
        email_sender: Arc::new(ScriptedEmailSender::new()),
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
        args.max_concurrent_searches,
    );

    tracing::info!("featurewatch engine running; press Ctrl-C to stop");

    if args.trigger_interval_secs > 0 {
        let interval = std::time::Duration::from_secs(args.trigger_interval_secs);
        let ticker = tokio::spawn(async move {
            let mut interval = tokio::time::interval(interval);
            loop {
                interval.tick().await;
                let trigger = CommandEnvelope::BatchRefreshTrigger(BatchRefreshTrigger {
                    frequency: Frequency::Immediate,
                });
                if trigger_publisher.publish(trigger).await.is_err() {
                    break;
                }
            }
        });
        tokio::signal::ctrl_c().await?;
        ticker.abort();
    } else {
        tokio::signal::ctrl_c().await?;
    }

    tracing::info!("shutting down");
    handle.shutdown().await;
    Ok(())
}
