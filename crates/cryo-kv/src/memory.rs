//! In-memory key-value engine with optimistic transactions.
//!
//! [`MemoryKv`] keeps committed entries in a `HashMap` behind a `RwLock`,
//! tagging each entry with the version of the commit that last wrote it.
//! A [`MemoryTransaction`] records the version of every key it reads and
//! validates that set at commit time: if any observed version moved, the
//! commit fails with [`KvError::CommitConflict`] and the caller retries.
//! This is what makes refcount read-modify-writes safe under concurrency.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use tracing::debug;

use crate::error::{KvError, KvResult};
use crate::traits::{KvEngine, KvTransaction};

#[derive(Clone)]
struct VersionedEntry {
    version: u64,
    data: Vec<u8>,
}

struct Inner {
    entries: HashMap<Vec<u8>, VersionedEntry>,
    /// Monotonic commit clock; every commit stamps its writes with a fresh tick.
    clock: u64,
}

/// Versioned in-memory engine for tests and embedding.
pub struct MemoryKv {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryKv {
    /// Create a new empty engine.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                entries: HashMap::new(),
                clock: 0,
            })),
        }
    }

    /// Number of committed entries.
    pub fn len(&self) -> KvResult<usize> {
        let inner = lock_read(&self.inner)?;
        Ok(inner.entries.len())
    }

    /// Returns `true` if no entries have been committed.
    pub fn is_empty(&self) -> KvResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Read a committed entry outside any transaction (test helper).
    pub fn committed(&self, key: &[u8]) -> KvResult<Option<Vec<u8>>> {
        let inner = lock_read(&self.inner)?;
        Ok(inner.entries.get(key).map(|e| e.data.clone()))
    }
}

impl Default for MemoryKv {
    fn default() -> Self {
        Self::new()
    }
}

impl KvEngine for MemoryKv {
    type Txn = MemoryTransaction;

    fn begin(&self) -> MemoryTransaction {
        MemoryTransaction {
            inner: Arc::clone(&self.inner),
            reads: HashMap::new(),
            writes: BTreeMap::new(),
        }
    }
}

impl std::fmt::Debug for MemoryKv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryKv")
            .field("entry_count", &self.len().ok())
            .finish()
    }
}

fn lock_read(inner: &RwLock<Inner>) -> KvResult<std::sync::RwLockReadGuard<'_, Inner>> {
    inner
        .read()
        .map_err(|e| KvError::Engine(format!("lock poisoned: {e}")))
}

fn lock_write(inner: &RwLock<Inner>) -> KvResult<std::sync::RwLockWriteGuard<'_, Inner>> {
    inner
        .write()
        .map_err(|e| KvError::Engine(format!("lock poisoned: {e}")))
}

/// An optimistic transaction against a [`MemoryKv`].
///
/// Reads record the observed version of each key (`None` for observed-absent)
/// the first time the key is touched; writes are buffered as put-or-delete.
/// Dropping the transaction without committing aborts it.
pub struct MemoryTransaction {
    inner: Arc<RwLock<Inner>>,
    /// Key -> version observed at first read (`None` = key was absent).
    reads: HashMap<Vec<u8>, Option<u64>>,
    /// Key -> buffered write (`None` = deletion).
    writes: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl KvTransaction for MemoryTransaction {
    fn get(&mut self, key: &[u8]) -> KvResult<Option<Vec<u8>>> {
        // Own buffered writes win over committed state.
        if let Some(buffered) = self.writes.get(key) {
            return Ok(buffered.clone());
        }
        let inner = lock_read(&self.inner)?;
        let entry = inner.entries.get(key);
        // Only the first observation counts for validation; later reads of
        // the same key inside this transaction see a consistent view anyway.
        self.reads
            .entry(key.to_vec())
            .or_insert_with(|| entry.map(|e| e.version));
        Ok(entry.map(|e| e.data.clone()))
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> KvResult<()> {
        self.writes.insert(key.to_vec(), Some(value.to_vec()));
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> KvResult<()> {
        self.writes.insert(key.to_vec(), None);
        Ok(())
    }

    fn scan_prefix(&mut self, prefix: &[u8]) -> KvResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> = BTreeMap::new();
        {
            let inner = lock_read(&self.inner)?;
            for (key, entry) in &inner.entries {
                if key.starts_with(prefix) {
                    merged.insert(key.clone(), entry.data.clone());
                    // Observed entries join the read set for validation.
                    self.reads
                        .entry(key.clone())
                        .or_insert(Some(entry.version));
                }
            }
        }
        // Own buffered writes win over committed state.
        for (key, write) in self.writes.range(prefix.to_vec()..) {
            if !key.starts_with(prefix) {
                break;
            }
            match write {
                Some(data) => {
                    merged.insert(key.clone(), data.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }
        Ok(merged.into_iter().collect())
    }

    fn commit(self) -> KvResult<()> {
        let mut inner = lock_write(&self.inner)?;

        // Validate the read set against current committed versions.
        for (key, observed) in &self.reads {
            let current = inner.entries.get(key).map(|e| e.version);
            if current != *observed {
                debug!(
                    key_len = key.len(),
                    "commit conflict: observed version moved"
                );
                return Err(KvError::CommitConflict);
            }
        }

        if self.writes.is_empty() {
            return Ok(());
        }

        inner.clock += 1;
        let version = inner.clock;
        for (key, write) in self.writes {
            match write {
                Some(data) => {
                    inner.entries.insert(key, VersionedEntry { version, data });
                }
                None => {
                    inner.entries.remove(&key);
                }
            }
        }
        Ok(())
    }

    fn abort(self) {
        // Buffered writes are dropped with the transaction.
    }
}
