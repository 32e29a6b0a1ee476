//! Persistence layer: SQLite metadata/locking, content-addressed blob
//! storage, and schema migrations.
//!
//! `cas`/`blob` implement `featurewatch_transport::contracts::BlobStore`
//! against the local filesystem; `metadata` implements
//! `featurewatch_transport::contracts::MetadataStore` against SQLite.

pub mod blob;
pub mod cas;
pub mod db;
pub mod envelope;
pub mod errors;
pub mod metadata;
pub mod migrations;

pub use blob::FsBlobStore;
pub use envelope::BlobEnvelope;
pub use errors::Result;
pub use metadata::SqliteMetadataStore;
