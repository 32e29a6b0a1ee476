//! Orchestration layer: ties the pure diffing/reconciliation core to its
//! async collaborators (feature fetch, blob/metadata storage, pub/sub
//! transport, delivery senders) and the task scheduling that drives them.

pub mod config;
pub mod delivery;
pub mod dispatcher;
pub mod fanout;
pub mod producer;
pub mod runner;

pub use config::{EngineConfig, ProducerConfig};
pub use delivery::{send_email_job, send_push_job, DeliveryContext};
pub use dispatcher::{process_event, DispatchOutcome, DispatcherContext};
pub use fanout::{process_batch_update, FanoutContext};
pub use producer::{process_search, ProcessOutcome, ProducerContext};
pub use runner::{spawn_engine, EngineHandle};
