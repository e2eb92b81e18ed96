//! File-backed bounded log of memory records.

use super::record::{MemoryDocument, MemoryRecord};
use crate::errors::MemoryBankError;
use parking_lot::Mutex;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind as IoErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant, SystemTime};
use tracing::{debug, warn};

/// Default number of records kept.
pub const DEFAULT_CAPACITY: usize = 10;

const LOCK_RETRY_INTERVAL: Duration = Duration::from_millis(20);
const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(10);
const STALE_LOCK_AGE: Duration = Duration::from_secs(30);

/// Serializes read-modify-write cycles within this process.
static WRITE_LOCK: Mutex<()> = parking_lot::const_mutex(());

/// Bounded, persisted, chronological log of insight records.
///
/// Every write rewrites the whole store through a temporary file in the same
/// directory followed by a rename, so readers see either the old or the new
/// document and never a torn one. Writers are serialized by a process-wide
/// mutex and, across processes, by an exclusive `<store>.lock` file.
///
/// Calls block on filesystem I/O; async callers go through
/// `tokio::task::spawn_blocking`.
#[derive(Debug, Clone)]
pub struct MemoryBank {
    path: PathBuf,
    capacity: usize,
    lock_timeout: Duration,
}

impl MemoryBank {
    /// Opens the bank stored at `path` with the default capacity.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            capacity: DEFAULT_CAPACITY,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    /// Sets the number of records kept. A capacity of zero keeps one.
    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    /// Sets how long a writer waits for the cross-process lock.
    #[must_use]
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Returns the store path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the persisted records, oldest first.
    ///
    /// A missing store reads as empty. An unparseable store also reads as
    /// empty and is reinitialized so later writers start clean.
    #[must_use]
    pub fn read(&self) -> Vec<MemoryRecord> {
        match self.load() {
            Ok(Some(records)) => records,
            Ok(None) => Vec::new(),
            Err(MemoryBankError::Serialization(e)) => {
                warn!(path = %self.path.display(), error = %e, "Memory bank is corrupt; reinitializing");
                if let Err(e) = self.reinitialize() {
                    warn!(path = %self.path.display(), error = %e, "Could not reinitialize memory bank");
                }
                Vec::new()
            }
            Err(e) => {
                warn!(error = %e, "Could not read memory bank; treating as empty");
                Vec::new()
            }
        }
    }

    /// Returns the last `k` records, oldest first.
    #[must_use]
    pub fn recent(&self, k: usize) -> Vec<MemoryRecord> {
        let mut records = self.read();
        let skip = records.len().saturating_sub(k);
        records.drain(..skip);
        records
    }

    /// Appends a record stamped with the current time.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock cannot be taken or the store cannot be
    /// written. The store is left as it was.
    pub fn write(&self, insight: impl Into<String>, source: impl Into<String>) -> Result<MemoryRecord, MemoryBankError> {
        self.append(MemoryRecord::new(insight, source))
    }

    /// Appends a record, keeps the last `capacity` records and persists.
    ///
    /// # Errors
    ///
    /// See [`MemoryBank::write`].
    pub fn append(&self, record: MemoryRecord) -> Result<MemoryRecord, MemoryBankError> {
        let _guard = WRITE_LOCK.lock();
        let _lock = StoreLock::acquire(&self.lock_path(), self.lock_timeout)?;
        self.append_locked(record)
    }

    /// Writes like [`MemoryBank::write`] unless `cancelled` is set once the
    /// store lock is held, in which case nothing is written and `None` is
    /// returned.
    ///
    /// # Errors
    ///
    /// See [`MemoryBank::write`].
    pub fn write_unless_cancelled(
        &self,
        insight: impl Into<String>,
        source: impl Into<String>,
        cancelled: &AtomicBool,
    ) -> Result<Option<MemoryRecord>, MemoryBankError> {
        let _guard = WRITE_LOCK.lock();
        let _lock = StoreLock::acquire(&self.lock_path(), self.lock_timeout)?;
        if cancelled.load(Ordering::Acquire) {
            debug!(path = %self.path.display(), "Memory write cancelled");
            return Ok(None);
        }
        self.append_locked(MemoryRecord::new(insight, source)).map(Some)
    }

    fn append_locked(&self, record: MemoryRecord) -> Result<MemoryRecord, MemoryBankError> {
        let mut records = match self.load() {
            Ok(records) => records.unwrap_or_default(),
            Err(MemoryBankError::Serialization(e)) => {
                warn!(path = %self.path.display(), error = %e, "Memory bank is corrupt; starting from empty");
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        records.push(record.clone());
        let overflow = records.len().saturating_sub(self.capacity);
        records.drain(..overflow);

        self.persist(&MemoryDocument { past_insights: records })?;
        debug!(path = %self.path.display(), source = %record.source, "Memory record written");
        Ok(record)
    }

    fn load(&self) -> Result<Option<Vec<MemoryRecord>>, MemoryBankError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == IoErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(MemoryBankError::io(&self.path, e)),
        };
        let document: MemoryDocument = serde_json::from_str(&content)?;
        Ok(Some(document.past_insights))
    }

    fn reinitialize(&self) -> Result<(), MemoryBankError> {
        let _guard = WRITE_LOCK.lock();
        let _lock = StoreLock::acquire(&self.lock_path(), self.lock_timeout)?;
        // Another writer may have repaired it while we waited.
        if matches!(self.load(), Err(MemoryBankError::Serialization(_))) {
            self.persist(&MemoryDocument::default())?;
        }
        Ok(())
    }

    fn persist(&self, document: &MemoryDocument) -> Result<(), MemoryBankError> {
        let dir = store_dir(&self.path);
        fs::create_dir_all(dir).map_err(|e| MemoryBankError::io(dir, e))?;

        let mut file = tempfile::NamedTempFile::new_in(dir).map_err(|e| MemoryBankError::io(dir, e))?;
        serde_json::to_writer_pretty(&mut file, document)?;
        file.flush().map_err(|e| MemoryBankError::io(file.path(), e))?;
        file.as_file()
            .sync_all()
            .map_err(|e| MemoryBankError::io(file.path(), e))?;
        file.persist(&self.path)
            .map_err(|e| MemoryBankError::io(&self.path, e.error))?;
        Ok(())
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".lock");
        PathBuf::from(name)
    }
}

fn store_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Exclusive lock file, removed on drop.
#[derive(Debug)]
struct StoreLock {
    path: PathBuf,
}

impl StoreLock {
    fn acquire(path: &Path, timeout: Duration) -> Result<Self, MemoryBankError> {
        fs::create_dir_all(store_dir(path)).map_err(|e| MemoryBankError::io(path, e))?;
        let start = Instant::now();
        loop {
            match OpenOptions::new().write(true).create_new(true).open(path) {
                Ok(mut file) => {
                    let _ = writeln!(file, "{}", std::process::id());
                    return Ok(Self { path: path.to_path_buf() });
                }
                Err(e) if e.kind() == IoErrorKind::AlreadyExists => {
                    if is_stale(path) {
                        warn!(path = %path.display(), "Breaking stale memory bank lock");
                        let _ = fs::remove_file(path);
                        continue;
                    }
                    if start.elapsed() >= timeout {
                        return Err(MemoryBankError::LockTimeout(path.to_path_buf()));
                    }
                    std::thread::sleep(LOCK_RETRY_INTERVAL);
                }
                Err(e) => return Err(MemoryBankError::io(path, e)),
            }
        }
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

fn is_stale(path: &Path) -> bool {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|modified| SystemTime::now().duration_since(modified).ok())
        .is_some_and(|age| age > STALE_LOCK_AGE)
}
