//! Deduplicating save of a value graph.
//!
//! Saving walks the graph children-before-parent, so within one transaction
//! a parent's persisted encoding never references a key that is not yet
//! durable. Dedup happens per key: if an entry already exists, its content
//! is necessarily identical, so only the reference count moves.

use std::collections::HashMap;

use cryo_kv::KvTransaction;
use cryo_types::{StorageKey, Value};
use tracing::debug;

use crate::address::{ContentAddresser, NodePlan};
use crate::error::{StoreError, StoreResult};
use crate::keys;
use crate::refcount::ReferenceCounter;
use crate::results::Saved;

/// Saves value graphs into the store.
pub struct ValueSaver;

impl ValueSaver {
    /// Save `value` and everything reachable from it, returning the root's
    /// key and post-increment reference count.
    ///
    /// Idempotent: saving the same logical graph twice raises refcounts and
    /// writes nothing twice. A `Stored` child must already have an entry;
    /// referencing one that does not is [`StoreError::DanglingReference`].
    /// A composite wider than the arity bound is rejected during planning,
    /// before any bytes are written.
    pub fn save<T: KvTransaction>(txn: &mut T, value: &Value) -> StoreResult<Saved> {
        let (root, plans) = ContentAddresser::plan(value)?;
        let root_count = Self::save_planned(txn, root, &plans)?;
        Ok(Saved {
            key: root,
            reference_count: root_count,
        })
    }

    /// Save the graph rooted at `root` from pre-computed node plans.
    ///
    /// Worklist discipline: a key is pushed once per referencing parent
    /// (plus once for the root itself), and descent stops at any key that
    /// already has an entry. Returns the root's post-increment count.
    fn save_planned<T: KvTransaction>(
        txn: &mut T,
        root: StorageKey,
        plans: &HashMap<StorageKey, NodePlan>,
    ) -> StoreResult<u32> {
        let mut root_count = 0;
        let mut stack = vec![root];

        while let Some(key) = stack.pop() {
            let count = match ReferenceCounter::read(txn, &key)? {
                // Entry exists: content is identical by construction, so
                // take a reference and do not descend.
                Some(_) => ReferenceCounter::increment(txn, &key)?,
                None => match plans.get(&key) {
                    Some(plan) => {
                        txn.put(&keys::value_key(&key), &plan.encoding)?;
                        let count = ReferenceCounter::increment(txn, &key)?;
                        debug!(
                            key = %key.short_hex(),
                            children = plan.children.len(),
                            "wrote new value entry"
                        );
                        // One reference per distinct child of this new parent.
                        for child in plan.children.iter().rev() {
                            stack.push(*child);
                        }
                        count
                    }
                    // A Stored reference to something never saved.
                    None => return Err(StoreError::DanglingReference(key)),
                },
            };
            if key == root {
                root_count = count;
            }
        }

        Ok(root_count)
    }
}
