//! SQLite-backed [`MetadataStore`]: the hot index of the latest event per
//! `(search_id, frequency)`, plus the per-search advisory lock.
//!
//! Lock acquisition is a conditional `INSERT OR REPLACE`, guarded by
//! `expires_at_ms < now OR worker_id = ?` — the same "insert if not
//! already there, atomically" idiom `featurewatch-store::migrations`
//! applies to the `schema_version` ledger.

use crate::errors::from_rusqlite;
use async_trait::async_trait;
use featurewatch_errors::{FwError, FwErrorKind};
use featurewatch_transport::contracts::{LatestEventInfo, LockHandle, MetadataStore};
use featurewatch_types::Frequency;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

/// [`MetadataStore`] backed by a single shared SQLite connection.
///
/// Every operation runs on `tokio::task::spawn_blocking`, serialized by an
/// internal mutex — SQLite itself serializes writers, so this is purely
/// about keeping blocking calls off the async executor, not additional
/// application-level locking.
pub struct SqliteMetadataStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteMetadataStore {
    /// Wrap an already-migrated connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }
}

fn freq_str(frequency: Frequency) -> &'static str {
    frequency.as_wire_str()
}

#[async_trait]
impl MetadataStore for SqliteMetadataStore {
    async fn acquire_lock(
        &self,
        search_id: &str,
        frequency: Frequency,
        worker_id: &str,
        ttl_ms: i64,
    ) -> Result<LockHandle, FwError> {
        let conn = self.conn.clone();
        let search_id = search_id.to_string();
        let worker_id = worker_id.to_string();
        let freq = freq_str(frequency).to_string();

        let (search_id, worker_id) = tokio::task::spawn_blocking(move || {
            let conn = conn.lock().expect("poisoned");
            let now = chrono::Utc::now().timestamp_millis();
            let expires_at = now + ttl_ms;

            let updated = conn
                .execute(
                    "INSERT INTO locks (search_id, frequency, worker_id, expires_at_ms)
                     VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT(search_id, frequency) DO UPDATE SET
                       worker_id = excluded.worker_id,
                       expires_at_ms = excluded.expires_at_ms
                     WHERE locks.expires_at_ms < ?5 OR locks.worker_id = ?3",
                    params![search_id, freq, worker_id, expires_at, now],
                )
                .map_err(from_rusqlite)?;

            if updated == 0 {
                return Err(featurewatch_errors::lock_contention(&search_id, &freq));
            }
            Ok((search_id, worker_id))
        })
        .await
        .map_err(|e| {
            FwError::new(FwErrorKind::Internal)
                .with_op("metadata_store.acquire_lock")
                .with_message(format!("blocking task panicked: {}", e))
        })??;

        Ok(LockHandle {
            search_id,
            frequency,
            worker_id,
        })
    }

    async fn release_lock(&self, handle: &LockHandle) -> Result<(), FwError> {
        let conn = self.conn.clone();
        let search_id = handle.search_id.clone();
        let worker_id = handle.worker_id.clone();
        let freq = freq_str(handle.frequency).to_string();

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().expect("poisoned");
            conn.execute(
                "DELETE FROM locks WHERE search_id = ?1 AND frequency = ?2 AND worker_id = ?3",
                params![search_id, freq, worker_id],
            )
            .map_err(from_rusqlite)?;
            Ok::<(), FwError>(())
        })
        .await
        .map_err(|e| {
            FwError::new(FwErrorKind::Internal)
                .with_op("metadata_store.release_lock")
                .with_message(format!("blocking task panicked: {}", e))
        })??;
        Ok(())
    }

    async fn publish_event(
        &self,
        search_id: &str,
        frequency: Frequency,
        info: LatestEventInfo,
    ) -> Result<(), FwError> {
        let conn = self.conn.clone();
        let search_id = search_id.to_string();
        let freq = freq_str(frequency).to_string();

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().expect("poisoned");
            conn.execute(
                "INSERT INTO latest_event
                   (search_id, frequency, event_id, state_id, diff_id,
                    state_blob_path, diff_blob_path, query_signature, generated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT(search_id, frequency) DO UPDATE SET
                   event_id = excluded.event_id,
                   state_id = excluded.state_id,
                   diff_id = excluded.diff_id,
                   state_blob_path = excluded.state_blob_path,
                   diff_blob_path = excluded.diff_blob_path,
                   query_signature = excluded.query_signature,
                   generated_at = excluded.generated_at",
                params![
                    search_id,
                    freq,
                    info.event_id,
                    info.state_id,
                    info.diff_id,
                    info.state_blob_path,
                    info.diff_blob_path,
                    info.query_signature,
                    info.generated_at.timestamp_millis(),
                ],
            )
            .map_err(from_rusqlite)?;
            Ok::<(), FwError>(())
        })
        .await
        .map_err(|e| {
            FwError::new(FwErrorKind::Internal)
                .with_op("metadata_store.publish_event")
                .with_message(format!("blocking task panicked: {}", e))
        })??;
        Ok(())
    }

    async fn get_latest_event(
        &self,
        search_id: &str,
        frequency: Frequency,
    ) -> Result<Option<LatestEventInfo>, FwError> {
        let conn = self.conn.clone();
        let search_id = search_id.to_string();
        let freq = freq_str(frequency).to_string();

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().expect("poisoned");
            conn.query_row(
                "SELECT event_id, state_id, diff_id, state_blob_path, diff_blob_path,
                        query_signature, generated_at
                 FROM latest_event WHERE search_id = ?1 AND frequency = ?2",
                params![search_id, freq],
                |row| {
                    let generated_at_ms: i64 = row.get(6)?;
                    Ok(LatestEventInfo {
                        event_id: row.get(0)?,
                        state_id: row.get(1)?,
                        diff_id: row.get(2)?,
                        state_blob_path: row.get(3)?,
                        diff_blob_path: row.get(4)?,
                        query_signature: row.get(5)?,
                        generated_at: chrono::DateTime::from_timestamp_millis(generated_at_ms)
                            .unwrap_or_default(),
                    })
                },
            )
            .optional()
            .map_err(from_rusqlite)
        })
        .await
        .map_err(|e| {
            FwError::new(FwErrorKind::Internal)
                .with_op("metadata_store.get_latest_event")
                .with_message(format!("blocking task panicked: {}", e))
        })?
    }
}
