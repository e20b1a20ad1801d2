//! The checkpoint directory: names to snapshot root keys.
//!
//! A name moves through exactly three transitions: `Unbound -> Bound(key)`
//! on bind, `Bound(k1) -> Bound(k2)` on rebind (releasing `k1`), and
//! `Bound(key) -> Unbound` on remove (releasing `key`). Nothing else.

use cryo_kv::KvTransaction;
use cryo_store::{keys, Released, ValueDeleter};
use cryo_types::StorageKey;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{display_name, CheckpointError, CheckpointResult};

/// The durable record stored under `c/<name>`.
#[derive(Debug, Serialize, Deserialize)]
struct Binding {
    root: StorageKey,
}

/// Maps checkpoint names to machine-state root keys.
pub struct CheckpointDirectory;

impl CheckpointDirectory {
    /// Bind `name` to `key`, upserting.
    ///
    /// The binding takes over one reference to `key` that the caller
    /// already holds — typically the reference returned by the save that
    /// produced `key`. If `name` was already bound, the old binding's
    /// reference is released first (possibly cascading), so replacing a
    /// checkpoint drops the old snapshot's hold on its graph.
    pub fn bind<T: KvTransaction>(
        txn: &mut T,
        name: &[u8],
        key: StorageKey,
    ) -> CheckpointResult<()> {
        if let Some(previous) = Self::resolve(txn, name)? {
            let released = ValueDeleter::release(txn, &previous)?;
            debug!(
                name = %display_name(name),
                old = %previous.short_hex(),
                new = %key.short_hex(),
                old_count = released.reference_count,
                "rebound checkpoint"
            );
        } else {
            debug!(name = %display_name(name), key = %key.short_hex(), "bound checkpoint");
        }
        let record = bincode::serialize(&Binding { root: key })
            .map_err(|e| CheckpointError::corrupt_binding(name, e.to_string()))?;
        txn.put(&keys::checkpoint_key(name), &record)?;
        Ok(())
    }

    /// Look up the root key bound to `name`. Returns `Ok(None)` if unbound.
    pub fn resolve<T: KvTransaction>(
        txn: &mut T,
        name: &[u8],
    ) -> CheckpointResult<Option<StorageKey>> {
        match txn.get(&keys::checkpoint_key(name))? {
            None => Ok(None),
            Some(bytes) => {
                let binding: Binding = bincode::deserialize(&bytes)
                    .map_err(|e| CheckpointError::corrupt_binding(name, e.to_string()))?;
                Ok(Some(binding.root))
            }
        }
    }

    /// Remove the binding for `name`, releasing its reference on the root
    /// key (cascading if it was the last).
    ///
    /// Removing an unbound name is [`CheckpointError::NotFound`].
    pub fn remove<T: KvTransaction>(txn: &mut T, name: &[u8]) -> CheckpointResult<Released> {
        let root = Self::resolve(txn, name)?.ok_or_else(|| CheckpointError::not_found(name))?;
        let released = ValueDeleter::release(txn, &root)?;
        txn.delete(&keys::checkpoint_key(name))?;
        debug!(
            name = %display_name(name),
            key = %root.short_hex(),
            count = released.reference_count,
            "removed checkpoint"
        );
        Ok(released)
    }

    /// List all bindings, sorted by name.
    pub fn list<T: KvTransaction>(txn: &mut T) -> CheckpointResult<Vec<(Vec<u8>, StorageKey)>> {
        let entries = txn.scan_prefix(keys::CHECKPOINT_PREFIX)?;
        let mut out = Vec::with_capacity(entries.len());
        for (engine_key, bytes) in entries {
            let name = engine_key[keys::CHECKPOINT_PREFIX.len()..].to_vec();
            let binding: Binding = bincode::deserialize(&bytes)
                .map_err(|e| CheckpointError::corrupt_binding(&name, e.to_string()))?;
            out.push((name, binding.root));
        }
        Ok(out)
    }
}
