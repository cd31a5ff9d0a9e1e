//! Ephemeral environment cache
//!
//! Content-addressed cache of provisioned environments, keyed by the
//! fingerprint of the inputs that define them. Entirely filesystem-driven:
//! identity survives process exit because the fingerprint *is* the
//! directory name, and expiration is derived from the directory's age plus
//! an optional `expired` marker file.
//!
//! # Lifecycle
//!
//! | State   | On disk                                   | Reusable |
//! |---------|-------------------------------------------|----------|
//! | Absent  | no directory                              | no       |
//! | Ready   | directory, no marker, age <= threshold    | yes      |
//! | Expired | marker present, or age > threshold        | no       |
//!
//! Expired entries are reaped opportunistically: every invocation sweeps
//! the whole cache before its own lookup, so any run cleans up after all
//! others with no background process and no inter-process coordination.

pub mod fs;
#[cfg(test)]
pub mod mem;
pub mod store;

pub use fs::{Claim, EntryInfo, FsStore, PendingEntry};
pub use store::{is_expired, CacheStore, EntryState, EXPIRED_FILENAME};

use crate::error::RunxResult;
use crate::fingerprint::Fingerprint;
use std::path::Path;
use tracing::debug;

/// Prepare the cache before resolving `fingerprint` for this run.
///
/// When caching is disabled, a pre-existing entry for the fingerprint is
/// cleared up front so the run provisions fresh. The exception: when the
/// caller names an expected binary that is absent, the entry is kept and
/// re-provisioned in place. Afterwards the whole cache is swept, which is
/// where all reaping happens.
pub fn prepare_entry(
    store: &dyn CacheStore,
    fingerprint: &Fingerprint,
    use_cache: bool,
    expected_bin: Option<&Path>,
) -> RunxResult<Vec<Fingerprint>> {
    if !use_cache && expected_bin.is_none_or(|bin| bin.exists()) {
        store.clear(fingerprint)?;
    }
    let reaped = store.sweep()?;
    if !reaped.is_empty() {
        debug!("Swept {} expired environment(s)", reaped.len());
    }
    Ok(reaped)
}
