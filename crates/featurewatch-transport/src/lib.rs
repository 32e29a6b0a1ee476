//! Collaborator contracts and wire envelopes for the featurewatch pipeline.
//!
//! This crate defines only the trait boundaries `featurewatch-engine`
//! consumes from its external collaborators (query execution, blob
//! storage, metadata storage, pub/sub transport, email/push senders),
//! plus in-memory implementations suitable for tests and the demo CLI.
//! `featurewatch-store::{blob, metadata}` provide the filesystem/SQLite
//! implementations of [`contracts::BlobStore`] and [`contracts::MetadataStore`].

pub mod contracts;
pub mod envelopes;
pub mod inmemory;

pub use contracts::{
    BlobStore, CatalogEntry, Channel, CommandPublisher, CommandSubscriber, EmailJobSubscriber,
    EmailPublisher, EmailSender, EventPublisher, EventSubscriber, FeatureFetcher, LatestEventInfo,
    LockHandle, MetadataStore, PushJobSubscriber, PushPublisher, PushSender, SavedSearchLister,
    SavedSearchRef, Subscription, SubscriptionLister,
};
