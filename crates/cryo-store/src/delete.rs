//! Cascading release of value graphs.
//!
//! A subvalue is deleted exactly when its last parent goes away: releasing a
//! key decrements its count, and at zero the entry is removed after every
//! child reference it held is released in turn. The count, not structural
//! position, governs liveness — a key referenced both by a checkpoint root
//! and by another live composite survives until both references drop.

use cryo_kv::KvTransaction;
use cryo_types::{StorageKey, Value, ValueRef};
use tracing::debug;

use crate::address::ContentAddresser;
use crate::error::{StoreError, StoreResult};
use crate::keys;
use crate::refcount::ReferenceCounter;
use crate::results::Released;

/// Releases references and garbage-collects unreferenced entries.
pub struct ValueDeleter;

impl ValueDeleter {
    /// Drop one reference from `key`, cascading deletion if it was the last.
    ///
    /// Children are released before the parent's entry is removed, so the
    /// store never holds a composite whose children are already gone.
    /// Releasing a key that holds no references is
    /// [`StoreError::RefCountUnderflow`].
    pub fn release<T: KvTransaction>(txn: &mut T, key: &StorageKey) -> StoreResult<Released> {
        let reference_count = ReferenceCounter::decrement(txn, key)?;
        if reference_count > 0 {
            return Ok(Released { reference_count });
        }

        // The last reference dropped: remove the entry and release every
        // child reference it held, cascading. Explicit worklist; the value
        // model is a DAG with bounded arity, so the reachable-key set
        // strictly shrinks and the cascade terminates.
        let mut worklist = vec![*key];
        while let Some(dead) = worklist.pop() {
            let children = Self::remove_entry(txn, &dead)?;
            for child in children {
                if ReferenceCounter::decrement(txn, &child)? == 0 {
                    worklist.push(child);
                }
            }
        }

        Ok(Released { reference_count: 0 })
    }

    /// Remove the value entry for a zero-count key, returning the distinct
    /// child keys it referenced.
    fn remove_entry<T: KvTransaction>(
        txn: &mut T,
        key: &StorageKey,
    ) -> StoreResult<Vec<StorageKey>> {
        let bytes = txn
            .get(&keys::value_key(key))?
            // Count said the value existed; its absence means the
            // consistency model was broken.
            .ok_or(StoreError::DanglingReference(*key))?;
        let value = ContentAddresser::decode(key, &bytes)?;
        txn.delete(&keys::value_key(key))?;
        debug!(key = %key.short_hex(), "removed unreferenced value entry");

        let mut children: Vec<StorageKey> = Vec::new();
        if let Value::Composite(refs) = value {
            for child in refs {
                if let ValueRef::Stored(ck) = child {
                    // One reference per distinct child key, matching save.
                    if !children.contains(&ck) {
                        children.push(ck);
                    }
                }
            }
        }
        Ok(children)
    }
}
