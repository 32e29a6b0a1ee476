//! `run-once`: drive a single saved search through the producer against
//! in-memory collaborators, seeded from a fixture file, and print the
//! resulting event (or the no-change ack).

use clap::Args;
use featurewatch_core::model::Feature;
use featurewatch_engine::{process_search, ProcessOutcome, ProducerConfig, ProducerContext};
use featurewatch_transport::contracts::EventSubscriber;
use featurewatch_transport::inmemory::{
    event_channel, InMemoryBlobStore, InMemoryFeatureFetcher, InMemoryMetadataStore,
};
use featurewatch_types::Frequency;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Args)]
pub struct RunOnceArgs {
    /// Saved search identifier.
    #[arg(long)]
    pub search_id: String,

    /// The saved search's query text (opaque to the producer; only its
    /// digest is compared across runs).
    #[arg(long)]
    pub query: String,

    #[arg(long, value_enum, default_value = "immediate")]
    pub frequency: CliFrequency,

    /// Path to a JSON file containing the current feature list (an array
    /// of `Feature` records) returned by the fixture feature fetcher.
    #[arg(long)]
    pub fixture: std::path::PathBuf,

    /// Trigger id for this run; defaults to a fresh UUID, so re-running
    /// with the same value exercises the idempotency contract.
    #[arg(long)]
    pub trigger_id: Option<String>,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum CliFrequency {
    Immediate,
    Weekly,
}

impl From<CliFrequency> for Frequency {
    fn from(value: CliFrequency) -> Self {
        match value {
            CliFrequency::Immediate => Frequency::Immediate,
            CliFrequency::Weekly => Frequency::Weekly,
        }
    }
}

pub async fn execute(args: RunOnceArgs) -> Result<(), Box<dyn std::error::Error>> {
    let fixture_bytes = std::fs::read(&args.fixture)?;
    let features: Vec<Feature> = serde_json::from_slice(&fixture_bytes)?;
    let by_id: BTreeMap<String, Feature> = features.into_iter().map(|f| (f.id.clone(), f)).collect();

    let (event_publisher, mut event_subscriber) = event_channel();
    let ctx = ProducerContext {
        feature_fetcher: Arc::new(InMemoryFeatureFetcher::new(by_id, BTreeMap::new())),
        blob_store: Arc::new(InMemoryBlobStore::new()),
        metadata_store: Arc::new(InMemoryMetadataStore::new()),
        event_publisher: Arc::new(event_publisher),
        config: ProducerConfig::default(),
    };

    let trigger_id = args
        .trigger_id
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let outcome = process_search(
        &ctx,
        &args.search_id,
        &args.query,
        args.frequency.into(),
        &trigger_id,
    )
    .await?;

    match outcome {
        ProcessOutcome::NoChange => {
            println!("no change detected; nothing published");
        }
        ProcessOutcome::Published { event_id } => {
            let event = event_subscriber
                .recv()
                .await
                .ok_or("producer reported a publish but no event arrived on the channel")?;
            println!("published event_id={event_id}");
            println!("{}", serde_json::to_string_pretty(&event)?);
        }
    }

    Ok(())
}
