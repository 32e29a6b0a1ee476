//! Store-specific error helpers, wrapping `featurewatch_errors::FwError`.

use featurewatch_errors::{FwError, FwErrorKind};

pub type Result<T> = std::result::Result<T, FwError>;

/// A migration's SQL batch failed to apply.
pub fn migration_error(migration_id: &str, reason: &str) -> FwError {
    FwError::new(FwErrorKind::SchemaMigrationFailed)
        .with_op("migration")
        .with_message(format!("migration {} failed: {}", migration_id, reason))
}

/// A migration's recorded checksum no longer matches its embedded SQL.
pub fn checksum_mismatch(migration_id: &str, expected: &str, actual: &str) -> FwError {
    FwError::new(FwErrorKind::SchemaMigrationFailed)
        .with_op("migration_checksum")
        .with_message(format!(
            "checksum mismatch for migration {}: expected {}, got {}",
            migration_id, expected, actual
        ))
}

/// Writing a blob whose digest collides with an existing blob of different content.
///
/// Indicates a SHA-256 collision or a CAS corruption bug, never a normal
/// operating condition; classified as a system-permanent error.
pub fn cas_collision(digest: &str) -> FwError {
    FwError::new(FwErrorKind::Internal)
        .with_op("blob_store.store")
        .with_message(format!("content digest collision for {}", digest))
}

/// A blob lookup by digest/path found nothing. Classified transient: a
/// `BlobStore.Get` miss is retried rather than treated as permanent.
pub fn cas_missing(path: &str) -> FwError {
    FwError::new(FwErrorKind::CollaboratorIo)
        .with_op("blob_store.get")
        .with_message(format!("blob not found: {}", path))
}

pub fn from_rusqlite(err: rusqlite::Error) -> FwError {
    FwError::new(FwErrorKind::CollaboratorIo)
        .with_op("sqlite")
        .with_message(err.to_string())
}

pub fn io_error(operation: &str, err: std::io::Error) -> FwError {
    FwError::new(FwErrorKind::CollaboratorIo)
        .with_op(operation.to_string())
        .with_message(err.to_string())
}
