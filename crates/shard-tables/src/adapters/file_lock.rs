//! # File Lock Adapter
//!
//! `DistributedLock` for processes sharing a filesystem. Uses `fs2` advisory
//! locking (flock on Unix, LockFile on Windows) on a directory guard file to
//! make check-and-create atomic across processes.
//!
//! Each held key is a file in the lock directory:
//!
//! ```text
//! <dir>/<key>.lock
//!   line 1: holder token
//!   line 2: expiry, milliseconds since the Unix epoch
//! ```

use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use fs2::FileExt;
use thiserror::Error;
use tracing::warn;

use crate::domain::BackendError;
use crate::ports::outbound::DistributedLock;

/// Errors from the file lock.
#[derive(Debug, Error)]
pub enum FileLockError {
    /// Lock directory could not be created or is not a directory.
    #[error("lock directory {path} is unusable: {source}")]
    Directory {
        /// Lock directory
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },
    /// Reading, writing or locking a lock file failed.
    #[error("lock file {path} failed: {source}")]
    Io {
        /// Lock file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },
}

impl From<FileLockError> for BackendError {
    fn from(err: FileLockError) -> Self {
        BackendError::with_source("file lock failure", err)
    }
}

/// Cross-process lock backed by a directory of key files.
#[derive(Debug, Clone)]
pub struct FileLock {
    dir: PathBuf,
}

impl FileLock {
    /// Guard file serializing access to the key files.
    const GUARD_FILE: &'static str = ".guard";

    /// Open (creating if needed) the lock directory at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, FileLockError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| FileLockError::Directory {
            path: dir.clone(),
            source,
        })?;
        if !dir.is_dir() {
            return Err(FileLockError::Directory {
                path: dir,
                source: io::Error::new(ErrorKind::InvalidInput, "not a directory"),
            });
        }
        Ok(Self { dir })
    }

    /// Lock directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Token of the live holder of `key`, if any.
    pub fn holder(&self, key: &str) -> Result<Option<String>, FileLockError> {
        let _guard = self.lock_directory()?;
        let path = self.key_path(key);
        Ok(read_holder(&path)?
            .filter(|h| h.expires_at_ms > now_ms())
            .map(|h| h.token))
    }

    /// Path of the file recording `key`.
    fn key_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.lock", encode_key(key)))
    }

    fn lock_directory(&self) -> Result<DirectoryGuard, FileLockError> {
        let path = self.dir.join(Self::GUARD_FILE);
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .open(&path)
            .map_err(|source| FileLockError::Io {
                path: path.clone(),
                source,
            })?;
        file.lock_exclusive()
            .map_err(|source| FileLockError::Io { path, source })?;
        Ok(DirectoryGuard { file })
    }

    fn try_acquire(&self, key: &str, token: &str, ttl: Duration) -> Result<bool, FileLockError> {
        let _guard = self.lock_directory()?;
        let path = self.key_path(key);
        let now = now_ms();

        if let Some(holder) = read_holder(&path)? {
            if holder.expires_at_ms > now {
                return Ok(false);
            }
        }

        let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
        let contents = format!("{}\n{}\n", token, now.saturating_add(ttl_ms));
        fs::write(&path, contents).map_err(|source| FileLockError::Io { path, source })?;
        Ok(true)
    }

    fn try_release(&self, key: &str, token: &str) -> Result<(), FileLockError> {
        let _guard = self.lock_directory()?;
        let path = self.key_path(key);
        match read_holder(&path)? {
            Some(holder) if holder.token == token => match fs::remove_file(&path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
                Err(source) => Err(FileLockError::Io { path, source }),
            },
            _ => Ok(()),
        }
    }
}

impl DistributedLock for FileLock {
    fn acquire_if_absent(
        &self,
        key: &str,
        token: &str,
        ttl: Duration,
    ) -> Result<bool, BackendError> {
        Ok(self.try_acquire(key, token, ttl)?)
    }

    fn release(&self, key: &str, token: &str) -> Result<(), BackendError> {
        Ok(self.try_release(key, token)?)
    }
}

/// Exclusive hold on the directory guard file, released on drop.
struct DirectoryGuard {
    file: File,
}

impl Drop for DirectoryGuard {
    fn drop(&mut self) {
        // Closing the handle also releases the lock.
        #[allow(clippy::incompatible_msrv)]
        let _ = self.file.unlock();
    }
}

struct Holder {
    token: String,
    expires_at_ms: u64,
}

/// Read a key file. Missing means free; unparseable content is left behind
/// by a crashed writer and is treated as expired.
fn read_holder(path: &Path) -> Result<Option<Holder>, FileLockError> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(FileLockError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let mut lines = contents.lines();
    let parsed = match (lines.next(), lines.next().map(|l| l.trim().parse::<u64>())) {
        (Some(token), Some(Ok(expires_at_ms))) if !token.is_empty() => Some(Holder {
            token: token.to_string(),
            expires_at_ms,
        }),
        _ => None,
    };
    if parsed.is_none() {
        warn!("[shard-tables] reclaiming corrupt lock file {}", path.display());
        return Ok(Some(Holder {
            token: String::new(),
            expires_at_ms: 0,
        }));
    }
    Ok(parsed)
}

/// Key as a file name: identifier characters pass through, anything else is
/// percent-encoded.
fn encode_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-' {
            out.push(char::from(byte));
        } else {
            out.push_str(&format!("%{:02X}", byte));
        }
    }
    out
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}
