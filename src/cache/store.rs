//! Cache Store Module
//!
//! Maps keys to files under `{root}/{source}/{key}{ext}` and owns the
//! write/read discipline: temp-file-then-rename writes and reads that expire
//! stale files as a side effect.
//!
//! Every rename into place and every removal made on behalf of a read goes
//! through one commit lock. A read only rewrites or removes the file it
//! actually opened, so within a process a completed write is never undone by
//! a reader that saw an older version.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, SystemTime};

use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::cache::{CacheKey, Codec, Envelope};
use crate::error::{CacheError, Result};

/// Suffix appended to in-flight temp files.
const TEMP_SUFFIX: &str = ".tmp";

// == Lookup ==
/// Outcome of reading a key.
///
/// A read is not side-effect free: a live file is rewritten with new access
/// metadata, and an expired or corrupt one is deleted before this is
/// returned.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    /// Live entry, with access metadata already updated
    Hit(Envelope),
    /// No file for this key
    Missing,
    /// File was older than the TTL; `removed` reports whether it was deleted
    Expired { removed: bool },
    /// File could not be decoded; `removed` reports whether it was deleted
    Corrupt { removed: bool },
}

// == File Identity ==
/// Enough of a file's metadata to tell whether it was replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileIdentity {
    len: u64,
    modified: Option<SystemTime>,
    #[cfg(unix)]
    ino: u64,
}

impl FileIdentity {
    fn from_metadata(meta: &fs::Metadata) -> Self {
        #[cfg(unix)]
        use std::os::unix::fs::MetadataExt;

        Self {
            len: meta.len(),
            modified: meta.modified().ok(),
            #[cfg(unix)]
            ino: meta.ino(),
        }
    }

    /// Identity of the file at `path`, or `None` when it is absent.
    fn of(path: &Path) -> io::Result<Option<Self>> {
        match fs::metadata(path) {
            Ok(meta) => Ok(Some(Self::from_metadata(&meta))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}

// == Disk Store ==
/// File-per-entry storage rooted at a single directory.
#[derive(Debug)]
pub struct DiskStore {
    /// Cache root directory
    root: PathBuf,
    /// Encoding for entry files
    codec: Codec,
    /// Maximum entry age
    ttl: Duration,
    /// Distinguishes temp files of concurrent writers in this process
    temp_seq: AtomicU64,
    /// Serializes renames and read-driven removals
    commit: Mutex<()>,
}

impl DiskStore {
    // == Constructor ==
    /// Creates a store. No directories are touched until the first write.
    pub fn new(root: impl Into<PathBuf>, codec: Codec, ttl: Duration) -> Self {
        Self {
            root: root.into(),
            codec,
            ttl,
            temp_seq: AtomicU64::new(0),
            commit: Mutex::new(()),
        }
    }

    /// Cache root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Codec used for entry files.
    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    /// Directory holding one source's entries.
    pub fn source_dir(&self, source: &str) -> PathBuf {
        self.root.join(source)
    }

    /// Full path of the file backing `key`.
    pub fn entry_path(&self, key: &CacheKey, source: &str) -> PathBuf {
        self.source_dir(source)
            .join(format!("{}{}", key, self.codec.file_extension()))
    }

    // == Read ==
    /// Reads `key`, expiring or touching the file as appropriate.
    ///
    /// Corrupt files are removed and reported as `Lookup::Corrupt` so the
    /// next write starts clean.
    pub fn read(&self, key: &CacheKey, source: &str) -> Result<Lookup> {
        let path = self.entry_path(key, source);

        let mut file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Lookup::Missing),
            Err(e) => return Err(CacheError::io(&path, e)),
        };
        let observed = file
            .metadata()
            .map(|meta| FileIdentity::from_metadata(&meta))
            .map_err(|e| CacheError::io(&path, e))?;

        if self.is_expired_at(observed.modified, SystemTime::now()) {
            drop(file);
            debug!("Cache file expired: {}", path.display());
            let removed = self.remove_if_expired(&path)?;
            return Ok(Lookup::Expired { removed });
        }

        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)
            .map_err(|e| CacheError::io(&path, e))?;
        drop(file);

        let mut envelope = match self.codec.decode(&bytes) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!("Removing corrupt cache file {}: {}", path.display(), e);
                let removed = self.remove_if_unchanged(&path, &observed).unwrap_or_else(|rm| {
                    warn!("Failed to remove corrupt cache file: {}", rm);
                    false
                });
                return Ok(Lookup::Corrupt { removed });
            }
        };

        envelope.record_access(Utc::now());
        match self.rewrite_if_unchanged(&path, &envelope, &observed) {
            Ok(true) => {}
            Ok(false) => debug!("Skipped access update for {}: entry was replaced", key),
            Err(e) => debug!("Failed to update access metadata for {}: {}", key, e),
        }

        Ok(Lookup::Hit(envelope))
    }

    // == Write ==
    /// Encodes `payload` and atomically replaces the entry for `key`.
    ///
    /// Encoding happens before any file is created, so a payload that cannot
    /// be serialized leaves the disk untouched.
    pub fn write<T>(
        &self,
        key: &CacheKey,
        source: &str,
        payload: &T,
        metadata: Option<Map<String, Value>>,
    ) -> Result<u64>
    where
        T: Serialize + ?Sized,
    {
        let bytes = self.codec.encode(payload, metadata)?;
        let dir = self.source_dir(source);
        fs::create_dir_all(&dir).map_err(|e| CacheError::io(&dir, e))?;

        let path = self.entry_path(key, source);
        self.write_atomic(&path, &bytes, None)?;
        Ok(bytes.len() as u64)
    }

    // == Delete ==
    /// Removes the file for `key`; returns whether one existed.
    pub fn delete(&self, key: &CacheKey, source: &str) -> Result<bool> {
        remove_if_present(&self.entry_path(key, source))
    }

    // == Expiry ==
    /// Whether the file at `path` is older than the TTL.
    ///
    /// An unreadable mtime counts as expired.
    pub fn is_expired(&self, path: &Path) -> bool {
        let modified = fs::metadata(path).and_then(|m| m.modified()).ok();
        self.is_expired_at(modified, SystemTime::now())
    }

    fn is_expired_at(&self, modified: Option<SystemTime>, now: SystemTime) -> bool {
        match modified {
            // A future mtime (clock skew) counts as age zero
            Some(mtime) => now
                .duration_since(mtime)
                .map(|age| age > self.ttl)
                .unwrap_or(false),
            None => true,
        }
    }

    /// Removes `path` if it is still expired once the commit lock is held.
    ///
    /// A fresh write that lands after the expiry was first observed keeps
    /// its file.
    pub fn remove_if_expired(&self, path: &Path) -> Result<bool> {
        let _guard = self.commit_guard();
        match FileIdentity::of(path).map_err(|e| CacheError::io(path, e))? {
            Some(current) if self.is_expired_at(current.modified, SystemTime::now()) => {
                remove_if_present(path)
            }
            _ => Ok(false),
        }
    }

    fn remove_if_unchanged(&self, path: &Path, observed: &FileIdentity) -> Result<bool> {
        let _guard = self.commit_guard();
        match FileIdentity::of(path).map_err(|e| CacheError::io(path, e))? {
            Some(current) if current == *observed => remove_if_present(path),
            _ => Ok(false),
        }
    }

    // == Entry Files ==
    /// Every entry file under every source directory.
    ///
    /// Only files carrying the codec extension are listed, which leaves out
    /// the ledger at the root and any in-flight temp files.
    pub fn entry_files(&self) -> Result<Vec<PathBuf>> {
        let ext = self.codec.file_extension();
        let mut files = Vec::new();

        let sources = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(files),
            Err(e) => return Err(CacheError::io(&self.root, e)),
        };

        for source in sources {
            let source = source.map_err(|e| CacheError::io(&self.root, e))?;
            let source_path = source.path();
            if !source_path.is_dir() {
                continue;
            }

            let entries = fs::read_dir(&source_path).map_err(|e| CacheError::io(&source_path, e))?;
            for entry in entries {
                let entry = entry.map_err(|e| CacheError::io(&source_path, e))?;
                let path = entry.path();
                let is_entry = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.ends_with(ext))
                    .unwrap_or(false);
                if is_entry && path.is_file() {
                    files.push(path);
                }
            }
        }

        Ok(files)
    }

    // == Atomic Write ==
    /// Writes `bytes` to a sibling temp file, then renames it over `path`.
    ///
    /// Readers observe either the previous file or the new one in full. When
    /// `mtime` is given it is applied to the temp file before the rename.
    pub fn write_atomic(&self, path: &Path, bytes: &[u8], mtime: Option<SystemTime>) -> Result<()> {
        self.replace(path, bytes, mtime, None).map(|_| ())
    }

    /// Rewrites a live entry with updated access metadata, keeping its mtime.
    ///
    /// Returns `false` without touching `path` when the file there is no
    /// longer the one the envelope was read from.
    fn rewrite_if_unchanged(
        &self,
        path: &Path,
        envelope: &Envelope,
        observed: &FileIdentity,
    ) -> Result<bool> {
        let bytes = self.codec.encode_envelope(envelope)?;
        self.replace(path, &bytes, observed.modified, Some(observed))
    }

    /// Temp-then-rename, optionally guarded by the identity of the file being
    /// replaced. Returns whether the rename happened.
    fn replace(
        &self,
        path: &Path,
        bytes: &[u8],
        mtime: Option<SystemTime>,
        expected: Option<&FileIdentity>,
    ) -> Result<bool> {
        let temp = self.temp_path(path);

        let result = write_and_sync(&temp, bytes, mtime)
            .and_then(|_| {
                let _guard = self.commit_guard();
                if let Some(expected) = expected {
                    if FileIdentity::of(path)?.as_ref() != Some(expected) {
                        return Ok(false);
                    }
                }
                fs::rename(&temp, path).map(|_| true)
            })
            .map_err(|e| CacheError::io(path, e));

        if !matches!(result, Ok(true)) {
            if let Err(e) = remove_if_present(&temp) {
                debug!("Failed to remove temp file: {}", e);
            }
        }
        result
    }

    fn commit_guard(&self) -> MutexGuard<'_, ()> {
        // The lock guards no data, so a poisoned one is still usable
        self.commit.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn temp_path(&self, path: &Path) -> PathBuf {
        let seq = self.temp_seq.fetch_add(1, Ordering::Relaxed);
        let mut name = path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(format!(".{}-{}{}", std::process::id(), seq, TEMP_SUFFIX));
        path.with_file_name(name)
    }
}

// == Utility Functions ==
fn write_and_sync(path: &Path, bytes: &[u8], mtime: Option<SystemTime>) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    if let Some(mtime) = mtime {
        file.set_modified(mtime)?;
    }
    file.sync_all()
}

/// Removes `path`, treating an absent file as a no-op.
pub(crate) fn remove_if_present(path: &Path) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(CacheError::io(path, e)),
    }
}
