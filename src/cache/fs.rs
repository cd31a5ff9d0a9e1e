//! Filesystem-backed cache store
//!
//! Entries are directories named by their fingerprint under a single cache
//! root. State is derived entirely from on-disk facts: presence of the
//! directory, presence of the `expired` marker, and the directory's
//! creation time. There is no lock file; claiming an entry uses the
//! exclusive-create semantics of `create_dir` so concurrent claims on one
//! fingerprint produce exactly one builder, and losers reuse the entry.

use crate::cache::store::{is_expired, CacheStore, EntryState, EXPIRED_FILENAME};
use crate::error::{RunxError, RunxResult};
use crate::fingerprint::Fingerprint;
use chrono::{DateTime, Utc};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, info};

/// Outcome of claiming a fingerprint for provisioning
pub enum Claim {
    /// This invocation won the claim and must provision into the entry
    Pending(PendingEntry),
    /// The entry already exists and can be inspected for reuse
    Existing(PathBuf),
}

/// A claimed-but-unprovisioned cache entry.
///
/// Dropping an uncommitted entry removes the directory, so a failed build
/// never leaves a half-provisioned entry that looks `Ready`.
pub struct PendingEntry {
    path: PathBuf,
    committed: bool,
}

impl PendingEntry {
    /// Directory to provision the environment into
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Keep the provisioned entry, returning its path
    pub fn commit(mut self) -> PathBuf {
        self.committed = true;
        self.path.clone()
    }
}

impl Drop for PendingEntry {
    fn drop(&mut self) {
        if !self.committed {
            debug!("Removing abandoned cache entry {}", self.path.display());
            let _ = fs::remove_dir_all(&self.path);
        }
    }
}

/// A cache entry as reported by [`FsStore::entries`].
///
/// Entries always exist on disk when enumerated, so their state reduces to
/// one bit: due for reaping or not.
#[derive(Debug, Clone)]
pub struct EntryInfo {
    pub fingerprint: Fingerprint,
    pub created_at: DateTime<Utc>,
    pub expired: bool,
}

/// Filesystem cache store rooted at a single directory
pub struct FsStore {
    root: PathBuf,
    threshold: Duration,
}

impl FsStore {
    /// Create a store over `root` with an expiration threshold in days
    pub fn new(root: PathBuf, expiration_days: u32) -> Self {
        Self {
            root,
            threshold: Duration::from_secs(u64::from(expiration_days) * 24 * 60 * 60),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Claim the fingerprint for provisioning.
    ///
    /// Uses exclusive directory creation as the atomic claim primitive:
    /// exactly one concurrent invocation wins; the rest observe `Existing`.
    pub fn claim(&self, fingerprint: &Fingerprint) -> RunxResult<Claim> {
        self.ensure_root()?;
        let path = self.entry_path(fingerprint);
        match fs::create_dir(&path) {
            Ok(()) => Ok(Claim::Pending(PendingEntry {
                path,
                committed: false,
            })),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(Claim::Existing(path)),
            Err(e) => Err(RunxError::CacheClaim {
                fingerprint: fingerprint.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    /// Enumerate every entry in the cache, oldest first
    pub fn entries(&self) -> RunxResult<Vec<EntryInfo>> {
        let mut entries = Vec::new();
        let iter = match fs::read_dir(&self.root) {
            Ok(iter) => iter,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(entries),
            Err(e) => return Err(RunxError::io(format!("reading cache directory {}", self.root.display()), e)),
        };

        for dir_entry in iter {
            let dir_entry =
                dir_entry.map_err(|e| RunxError::io("reading cache directory entry", e))?;
            let name = dir_entry.file_name();
            let Some(fingerprint) = Fingerprint::from_dir_name(&name.to_string_lossy()) else {
                continue;
            };
            let path = dir_entry.path();
            if !path.is_dir() {
                continue;
            }
            let created = creation_time(&path)?;
            entries.push(EntryInfo {
                expired: self.is_entry_expired(&path, created),
                fingerprint,
                created_at: DateTime::<Utc>::from(created),
            });
        }

        entries.sort_by_key(|e| e.created_at);
        Ok(entries)
    }

    fn ensure_root(&self) -> RunxResult<()> {
        fs::create_dir_all(&self.root).map_err(|e| {
            RunxError::io(format!("creating cache directory {}", self.root.display()), e)
        })
    }

    fn is_entry_expired(&self, path: &Path, created: SystemTime) -> bool {
        let has_marker = path.join(EXPIRED_FILENAME).exists();
        let age = created.elapsed().unwrap_or(Duration::ZERO);
        is_expired(age, self.threshold, has_marker)
    }
}

impl CacheStore for FsStore {
    fn entry_path(&self, fingerprint: &Fingerprint) -> PathBuf {
        self.root.join(fingerprint.as_str())
    }

    fn lookup(&self, fingerprint: &Fingerprint) -> RunxResult<EntryState> {
        let path = self.entry_path(fingerprint);
        if !path.is_dir() {
            return Ok(EntryState::Absent);
        }
        if self.is_entry_expired(&path, creation_time(&path)?) {
            Ok(EntryState::Expired)
        } else {
            Ok(EntryState::Ready)
        }
    }

    fn mark_expired(&self, fingerprint: &Fingerprint) -> RunxResult<()> {
        let marker = self.entry_path(fingerprint).join(EXPIRED_FILENAME);
        debug!("Marking environment {fingerprint} as expired");
        fs::File::create(&marker)
            .map(|_| ())
            .map_err(|e| RunxError::io(format!("writing expiration marker {}", marker.display()), e))
    }

    fn clear(&self, fingerprint: &Fingerprint) -> RunxResult<()> {
        let path = self.entry_path(fingerprint);
        info!("Removing cached environment {}", path.display());
        match fs::remove_dir_all(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(RunxError::io(
                format!("removing cached environment {}", path.display()),
                e,
            )),
        }
    }

    fn sweep(&self) -> RunxResult<Vec<Fingerprint>> {
        let mut reaped = Vec::new();
        for entry in self.entries()? {
            if entry.expired {
                info!("Removing expired environment {}", entry.fingerprint);
                self.clear(&entry.fingerprint)?;
                reaped.push(entry.fingerprint);
            }
        }
        Ok(reaped)
    }
}

/// Entry creation time, falling back to mtime on filesystems that don't
/// report birth times.
fn creation_time(path: &Path) -> RunxResult<SystemTime> {
    let meta = fs::metadata(path)
        .map_err(|e| RunxError::io(format!("reading metadata for {}", path.display()), e))?;
    Ok(meta.created().or_else(|_| meta.modified()).unwrap_or(SystemTime::now()))
}
