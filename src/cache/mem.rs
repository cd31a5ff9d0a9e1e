//! In-memory cache store fake for lifecycle tests

use crate::cache::store::{is_expired, CacheStore, EntryState};
use crate::error::RunxResult;
use crate::fingerprint::Fingerprint;
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
struct MemEntry {
    age: Duration,
    marker: bool,
}

/// A `CacheStore` that lives entirely in memory.
///
/// Ages are injected rather than measured, so expiry decisions can be
/// tested without sleeping or touching real timestamps.
pub struct MemoryStore {
    threshold: Duration,
    entries: RefCell<HashMap<String, MemEntry>>,
}

impl MemoryStore {
    pub fn new(threshold: Duration) -> Self {
        Self {
            threshold,
            entries: RefCell::new(HashMap::new()),
        }
    }

    pub fn insert(&self, fingerprint: &Fingerprint, age: Duration, marker: bool) {
        self.entries
            .borrow_mut()
            .insert(fingerprint.to_string(), MemEntry { age, marker });
    }

    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.entries.borrow().contains_key(fingerprint.as_str())
    }

    pub fn has_marker(&self, fingerprint: &Fingerprint) -> bool {
        self.entries
            .borrow()
            .get(fingerprint.as_str())
            .is_some_and(|e| e.marker)
    }
}

impl CacheStore for MemoryStore {
    fn entry_path(&self, fingerprint: &Fingerprint) -> PathBuf {
        PathBuf::from("/mem").join(fingerprint.as_str())
    }

    fn lookup(&self, fingerprint: &Fingerprint) -> RunxResult<EntryState> {
        Ok(match self.entries.borrow().get(fingerprint.as_str()) {
            None => EntryState::Absent,
            Some(e) if is_expired(e.age, self.threshold, e.marker) => EntryState::Expired,
            Some(_) => EntryState::Ready,
        })
    }

    fn mark_expired(&self, fingerprint: &Fingerprint) -> RunxResult<()> {
        if let Some(e) = self.entries.borrow_mut().get_mut(fingerprint.as_str()) {
            e.marker = true;
        }
        Ok(())
    }

    fn clear(&self, fingerprint: &Fingerprint) -> RunxResult<()> {
        self.entries.borrow_mut().remove(fingerprint.as_str());
        Ok(())
    }

    fn sweep(&self) -> RunxResult<Vec<Fingerprint>> {
        let mut reaped = Vec::new();
        self.entries.borrow_mut().retain(|name, e| {
            if is_expired(e.age, self.threshold, e.marker) {
                if let Some(fp) = Fingerprint::from_dir_name(name) {
                    reaped.push(fp);
                }
                false
            } else {
                true
            }
        });
        Ok(reaped)
    }
}
