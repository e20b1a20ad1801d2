//! The [`KvEngine`] and [`KvTransaction`] traits defining the backend seam.

use crate::error::KvResult;

/// A scoped, atomic batch of reads and writes.
///
/// Implementations must satisfy these invariants:
/// - Writes are buffered: nothing is visible to other transactions before
///   `commit` returns `Ok`.
/// - Reads see this transaction's own buffered writes first, then the
///   committed state the transaction started from.
/// - `commit` is all-or-nothing; `abort` (or dropping the transaction)
///   discards every buffered write with no partial persistence.
/// - A read-modify-write race with a concurrent committer must surface as
///   [`crate::KvError::CommitConflict`], never as a lost update.
pub trait KvTransaction {
    /// Read the bytes at `key`. Returns `Ok(None)` if absent.
    fn get(&mut self, key: &[u8]) -> KvResult<Option<Vec<u8>>>;

    /// Buffer a write of `value` at `key`.
    fn put(&mut self, key: &[u8], value: &[u8]) -> KvResult<()>;

    /// Buffer a deletion of `key`. Deleting an absent key is a no-op.
    fn delete(&mut self, key: &[u8]) -> KvResult<()>;

    /// List all entries whose key starts with `prefix`, sorted by key.
    ///
    /// Sees this transaction's buffered writes merged over committed state,
    /// like `get`.
    fn scan_prefix(&mut self, prefix: &[u8]) -> KvResult<Vec<(Vec<u8>, Vec<u8>)>>;

    /// Atomically publish every buffered write.
    fn commit(self) -> KvResult<()>
    where
        Self: Sized;

    /// Discard every buffered write.
    fn abort(self)
    where
        Self: Sized;
}

/// A key-value engine that can open transactions.
pub trait KvEngine: Send + Sync {
    /// The transaction type this engine hands out.
    type Txn: KvTransaction;

    /// Open a new transaction against the current committed state.
    fn begin(&self) -> Self::Txn;
}
