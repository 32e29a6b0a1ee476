//! Filesystem-based content-addressed storage for blob envelopes.
//!
//! Provides atomic writes, collision detection, and content-addressed
//! reads under a two-level directory layout: `<root>/<dir>/<shard>/<digest>.json`,
//! where `dir` is `"state"` or `"diff"` and `shard` is the digest's first
//! two hex characters.

#![allow(clippy::result_large_err)]

use crate::cas::atomic::atomic_write;
use crate::cas::sharding::shard_path;
use crate::errors::{cas_collision, cas_missing, io_error, Result};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::PathBuf;

/// Filesystem-based CAS store rooted at a single directory.
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Write `content` under `dir`, keyed by its SHA-256 digest.
    ///
    /// Idempotent: writing identical content twice succeeds and returns the
    /// same digest. Writing different content that happens to hash to an
    /// already-occupied digest is a collision error.
    ///
    /// Returns `(digest, full_path)`; `digest` doubles as the content's
    /// stateID/diffID per the CAS-derived-id convention.
    pub fn write(&self, dir: &str, content: &[u8]) -> Result<(String, String)> {
        let digest = compute_digest(content);
        let target_path = shard_path(&self.root, dir, &digest);

        if target_path.exists() {
            let existing = fs::read(&target_path).map_err(|e| io_error("read_blob", e))?;
            if existing != content {
                return Err(cas_collision(&digest));
            }
        } else {
            atomic_write(&target_path, content)?;
        }

        Ok((digest, target_path.to_string_lossy().into_owned()))
    }

    /// Read content from a previously returned full path.
    pub fn read(&self, full_path: &str) -> Result<Vec<u8>> {
        let path = PathBuf::from(full_path);
        if !path.exists() {
            return Err(cas_missing(full_path));
        }
        fs::read(&path).map_err(|e| io_error("read_blob", e))
    }
}

fn compute_digest(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}
