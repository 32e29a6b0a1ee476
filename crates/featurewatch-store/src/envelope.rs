//! Versioned blob envelope for snapshot/diff blobs written through
//! [`crate::blob::FsBlobStore`].
//!
//! `kind` and `api_version` are checked on decode; a mismatch on either is
//! `ErrInvalidFormat`/`ErrSchemaMigrationFailed`. There is only one schema
//! version in production so there is no migrator chain yet — this is the
//! extension point future migrators key off, per the CAS module's
//! versioning convention.

use featurewatch_errors::{FwError, FwErrorKind};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// `kind` tag for a state-snapshot blob.
pub const KIND_SNAPSHOT: &str = "FeatureListSnapshot";
/// `kind` tag for a diff blob.
pub const KIND_DIFF: &str = "FeatureListDiff";

/// `{api_version, kind, data}` wrapper persisted by `BlobStore`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BlobEnvelope<T> {
    pub api_version: u32,
    pub kind: String,
    pub data: T,
}

impl<T: Serialize> BlobEnvelope<T> {
    pub fn new(kind: &str, api_version: u32, data: T) -> Self {
        Self {
            api_version,
            kind: kind.to_string(),
            data,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, FwError> {
        serde_json::to_vec(self).map_err(FwError::from)
    }
}

impl<T: DeserializeOwned> BlobEnvelope<T> {
    /// Decode `bytes`, verifying `kind` matches `expected_kind` and
    /// `api_version` matches `expected_api_version` exactly.
    pub fn decode(
        bytes: &[u8],
        expected_kind: &str,
        expected_api_version: u32,
    ) -> Result<T, FwError> {
        let envelope: BlobEnvelope<T> = serde_json::from_slice(bytes).map_err(|e| {
            FwError::new(FwErrorKind::InvalidFormat)
                .with_op("blob_envelope.decode")
                .with_message(e.to_string())
        })?;
        if envelope.kind != expected_kind {
            return Err(FwError::new(FwErrorKind::InvalidFormat)
                .with_op("blob_envelope.decode")
                .with_message(format!(
                    "unexpected blob kind {}, wanted {}",
                    envelope.kind, expected_kind
                )));
        }
        if envelope.api_version != expected_api_version {
            return Err(FwError::new(FwErrorKind::SchemaMigrationFailed)
                .with_op("blob_envelope.decode")
                .with_message(format!(
                    "no migrator registered for api_version {}",
                    envelope.api_version
                )));
        }
        Ok(envelope.data)
    }
}
