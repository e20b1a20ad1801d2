//! Per-key reference counts.
//!
//! A count tracks how many live parents (save roots, referencing composites,
//! checkpoint bindings) point at a key. Counts live in their own `r/`
//! keyspace as u32-LE and are only ever touched inside a transaction, so
//! adjustments become visible atomically at commit.

use cryo_kv::KvTransaction;
use cryo_types::StorageKey;
use tracing::trace;

use crate::error::{StoreError, StoreResult};
use crate::keys;

/// Transaction-scoped reference count maintenance.
pub struct ReferenceCounter;

impl ReferenceCounter {
    /// Add one reference to `key`, creating the counter at 1 if absent.
    ///
    /// Called exactly once per (parent, distinct child) reference and once
    /// per save root. A counter at `u32::MAX` is
    /// [`StoreError::RefCountOverflow`]; wrapping to zero would silently
    /// discard every live reference.
    pub fn increment<T: KvTransaction>(txn: &mut T, key: &StorageKey) -> StoreResult<u32> {
        let count = match Self::read(txn, key)? {
            Some(current) => current
                .checked_add(1)
                .ok_or(StoreError::RefCountOverflow(*key))?,
            None => 1,
        };
        txn.put(&keys::refcount_key(key), &count.to_le_bytes())?;
        trace!(key = %key.short_hex(), count, "refcount increment");
        Ok(count)
    }

    /// Drop one reference from `key`.
    ///
    /// Decrementing an absent or zero counter is
    /// [`StoreError::RefCountUnderflow`]: it means a caller released
    /// something it never referenced, which is a bug, not a normal failure.
    ///
    /// At zero the counter entry itself is removed, preserving the invariant
    /// that a key has a counter exactly while it has references. The caller
    /// is responsible for removing the value entry (see
    /// [`crate::ValueDeleter`]).
    pub fn decrement<T: KvTransaction>(txn: &mut T, key: &StorageKey) -> StoreResult<u32> {
        let current = match Self::read(txn, key)? {
            Some(current) if current > 0 => current,
            _ => return Err(StoreError::RefCountUnderflow(*key)),
        };
        let count = current - 1;
        if count == 0 {
            txn.delete(&keys::refcount_key(key))?;
        } else {
            txn.put(&keys::refcount_key(key), &count.to_le_bytes())?;
        }
        trace!(key = %key.short_hex(), count, "refcount decrement");
        Ok(count)
    }

    /// Read the count for `key`. Returns `Ok(None)` if never referenced.
    pub fn read<T: KvTransaction>(txn: &mut T, key: &StorageKey) -> StoreResult<Option<u32>> {
        match txn.get(&keys::refcount_key(key))? {
            None => Ok(None),
            Some(bytes) => {
                let arr: [u8; 4] = bytes.as_slice().try_into().map_err(|_| {
                    StoreError::Corruption {
                        key: *key,
                        reason: format!("reference count must be 4 bytes, got {}", bytes.len()),
                    }
                })?;
                Ok(Some(u32::from_le_bytes(arr)))
            }
        }
    }
}
