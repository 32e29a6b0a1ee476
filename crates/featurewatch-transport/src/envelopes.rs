//! Wire envelope shapes exchanged with the external pub/sub transport.
//!
//! Every envelope carries `api_version` and `kind` the way
//! `featurewatch-store`'s blob envelopes do, so a future migrator chain
//! has somewhere to dispatch.

use featurewatch_types::Frequency;
use serde::{Deserialize, Serialize};

/// Inbound command envelope: either a single-search refresh request or a
/// batch-wide trigger fanned out by the scheduler.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", content = "data")]
pub enum CommandEnvelope {
    #[serde(rename = "RefreshSearchCommand")]
    RefreshSearch(RefreshSearchCommand),
    #[serde(rename = "SearchConfigurationChangedEvent")]
    SearchConfigurationChanged(RefreshSearchCommand),
    #[serde(rename = "BatchRefreshTrigger")]
    BatchRefreshTrigger(BatchRefreshTrigger),
}

impl CommandEnvelope {
    pub const API_VERSION: &'static str = "v1";
}

/// Request to re-evaluate one saved search.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RefreshSearchCommand {
    pub search_id: String,
    pub query: String,
    pub frequency: Frequency,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Request to fan out refresh commands for every saved search at a given
/// frequency.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchRefreshTrigger {
    pub frequency: Frequency,
}

/// The reasons a `FeatureDiffEvent` was produced.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Reason {
    DataUpdated,
    QueryChanged,
    NewSubscription,
}

/// Outbound `FeatureDiffEvent` envelope, published once per successful
/// diff run that produces at least one [`Reason`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureDiffEventEnvelope {
    pub api_version: String,
    pub kind: String,
    pub data: FeatureDiffEventData,
}

impl FeatureDiffEventEnvelope {
    pub fn new(data: FeatureDiffEventData) -> Self {
        Self {
            api_version: "v1".to_string(),
            kind: "FeatureDiffEvent".to_string(),
            data,
        }
    }
}

/// The `data` payload of a [`FeatureDiffEventEnvelope`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureDiffEventData {
    pub event_id: String,
    pub search_id: String,
    pub query: String,
    /// Human-readable diff summary, base64-encoded per the wire contract.
    pub summary: String,
    pub state_id: String,
    pub diff_id: Option<String>,
    pub state_blob_path: String,
    pub diff_blob_path: Option<String>,
    pub reasons: Vec<Reason>,
    pub frequency: Frequency,
    pub generated_at: chrono::DateTime<chrono::Utc>,
}

/// Metadata carried alongside every delivery job, for template rendering
/// and telemetry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeliveryMetadata {
    pub event_id: String,
    pub search_id: String,
    pub query: String,
    pub frequency: Frequency,
    pub generated_at: chrono::DateTime<chrono::Utc>,
}

/// An email delivery job handed to `EmailPublisher.PublishEmailJob`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmailDeliveryJob {
    pub subscription_id: String,
    pub recipient_email: String,
    pub summary_raw: String,
    pub metadata: DeliveryMetadata,
}

/// A push delivery job, analogous to [`EmailDeliveryJob`] for push channels.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PushDeliveryJob {
    pub subscription_id: String,
    pub recipient_token: String,
    pub summary_raw: String,
    pub metadata: DeliveryMetadata,
}
