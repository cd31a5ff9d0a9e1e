//! Cache store abstraction
//!
//! The ephemeral environment cache is plain filesystem state: one directory
//! per fingerprint, no index, no database. The `CacheStore` trait gives the
//! lifecycle logic a narrow seam so it can be exercised against an
//! in-memory fake without provisioning anything.

use crate::error::RunxResult;
use crate::fingerprint::Fingerprint;
use std::path::PathBuf;
use std::time::Duration;

/// Marker file that flags an entry for reaping on the next sweep
pub const EXPIRED_FILENAME: &str = "expired";

/// Lifecycle state of a cache entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    /// No directory exists at the fingerprint path
    Absent,
    /// Directory exists, unmarked, and younger than the threshold
    Ready,
    /// Marked for expiry, or strictly older than the threshold
    Expired,
}

/// Expiry rule shared by every store backend.
///
/// The age comparison is a strict inequality: an entry exactly at the
/// threshold is still reusable.
pub fn is_expired(age: Duration, threshold: Duration, has_marker: bool) -> bool {
    has_marker || age > threshold
}

/// Filesystem-shaped registry of fingerprint → environment
pub trait CacheStore {
    /// The directory an entry for this fingerprint lives (or would live) at
    fn entry_path(&self, fingerprint: &Fingerprint) -> PathBuf;

    /// Current lifecycle state of the entry
    fn lookup(&self, fingerprint: &Fingerprint) -> RunxResult<EntryState>;

    /// Flag the entry so the next sweep reaps it. The directory is left in
    /// place because the current invocation may still be using it.
    fn mark_expired(&self, fingerprint: &Fingerprint) -> RunxResult<()>;

    /// Remove the entry immediately. Missing entries are not an error.
    fn clear(&self, fingerprint: &Fingerprint) -> RunxResult<()>;

    /// Reap every expired entry in the cache, returning what was removed.
    ///
    /// Reaping only ever happens here: any invocation's sweep cleans up
    /// after all others, with the filesystem as the only coordination.
    fn sweep(&self) -> RunxResult<Vec<Fingerprint>>;
}
