//! Content-addressed storage for state/diff blob envelopes.
//!
//! - Atomic temp-file-then-rename writes.
//! - Collision detection on digest reuse with differing bytes.
//! - Sharding by the first 2 hex characters of the digest.

mod atomic;
mod fs_store;
mod sharding;

pub use fs_store::FsStore;
