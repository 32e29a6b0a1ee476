//! Sharding logic for CAS.
//!
//! Shards blobs into subdirectories keyed by the first 2 hex characters of
//! the digest, to avoid filesystem performance issues with too many files
//! in a single directory.

use std::path::{Path, PathBuf};

/// Compute the shard path for a digest under a given top-level directory.
///
/// For `dir = "state"`, `digest = "abc123..."`, returns
/// `<root>/state/ab/abc123....json`.
pub fn shard_path(root: &Path, dir: &str, digest: &str) -> PathBuf {
    let shard = &digest[..2.min(digest.len())];
    root.join(dir).join(shard).join(format!("{}.json", digest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shard_path() {
        let root = Path::new("/blobs");
        let digest = "abc123def456";
        let path = shard_path(root, "state", digest);
        assert_eq!(path, PathBuf::from("/blobs/state/ab/abc123def456.json"));
    }

    #[test]
    fn test_shard_path_full_digest() {
        let root = Path::new("/blobs");
        let digest = "a".repeat(64);
        let path = shard_path(root, "diff", &digest);
        assert!(path.starts_with(Path::new("/blobs/diff/aa")));
    }
}
