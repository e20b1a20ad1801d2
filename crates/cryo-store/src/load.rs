//! Read-side reconstruction of stored value graphs.
//!
//! Loading never mutates reference counts. The shallow mode is the lazy
//! path: a composite comes back with `Stored` child keys, and the caller
//! re-issues a load per child on first access, so reading a prefix of a
//! large graph never materializes the rest.

use std::collections::{HashMap, HashSet};

use cryo_kv::KvTransaction;
use cryo_types::{StorageKey, Value, ValueRef};

use crate::address::ContentAddresser;
use crate::error::{StoreError, StoreResult};
use crate::keys;
use crate::refcount::ReferenceCounter;
use crate::results::Loaded;

/// Loads value graphs back out of the store.
pub struct ValueLoader;

impl ValueLoader {
    /// Load the value at `key`, shallowly.
    ///
    /// Composite children come back as `Stored` keys; resolve them on demand
    /// with [`ValueLoader::resolve_child`] or another `load`. Absence is
    /// [`StoreError::NotFound`]; bytes that fail to decode or do not hash
    /// back to `key` are [`StoreError::Corruption`].
    pub fn load<T: KvTransaction>(txn: &mut T, key: &StorageKey) -> StoreResult<Loaded> {
        let bytes = txn
            .get(&keys::value_key(key))?
            .ok_or(StoreError::NotFound(*key))?;
        if ContentAddresser::key_for_encoding(&bytes) != *key {
            return Err(StoreError::Corruption {
                key: *key,
                reason: "stored bytes do not hash back to their key".to_string(),
            });
        }
        let value = ContentAddresser::decode(key, &bytes)?;
        // A stored value without a counter means the cascade protocol was
        // bypassed; surface it rather than inventing a count.
        let reference_count =
            ReferenceCounter::read(txn, key)?.ok_or(StoreError::Corruption {
                key: *key,
                reason: "value present without reference count".to_string(),
            })?;
        Ok(Loaded {
            value,
            reference_count,
        })
    }

    /// Load the entire graph rooted at `key`, eagerly.
    ///
    /// Every `Stored` child is materialized back into an `Inline` value.
    /// Walks with an explicit stack (graphs can be deep) and loads each
    /// shared subvalue once.
    pub fn load_deep<T: KvTransaction>(txn: &mut T, key: &StorageKey) -> StoreResult<Loaded> {
        enum Frame {
            Enter(StorageKey),
            Exit(StorageKey),
        }

        // Phase 1: shallow-load every reachable key, recording post-order.
        let mut shallow: HashMap<StorageKey, Value> = HashMap::new();
        let mut order: Vec<StorageKey> = Vec::new();
        let mut entered: HashSet<StorageKey> = HashSet::new();
        let mut root_count = 0;
        let mut stack = vec![Frame::Enter(*key)];

        while let Some(frame) = stack.pop() {
            match frame {
                Frame::Enter(k) => {
                    if !entered.insert(k) {
                        continue;
                    }
                    let loaded = Self::load(txn, &k)?;
                    if k == *key {
                        root_count = loaded.reference_count;
                    }
                    stack.push(Frame::Exit(k));
                    for child in loaded.value.children().iter().rev() {
                        if let ValueRef::Stored(ck) = child {
                            stack.push(Frame::Enter(*ck));
                        }
                    }
                    shallow.insert(k, loaded.value);
                }
                Frame::Exit(k) => order.push(k),
            }
        }

        // Phase 2: assemble children-before-parents; post-order guarantees
        // every Stored child is already materialized (the value model is a
        // DAG, so no Exit can pop before its descendants).
        let mut full: HashMap<StorageKey, Value> = HashMap::new();
        for k in order {
            let value = shallow.remove(&k).ok_or(StoreError::NotFound(k))?;
            let resolved = match value {
                Value::Composite(children) => {
                    let mut inlined = Vec::with_capacity(children.len());
                    for child in children {
                        match child {
                            ValueRef::Stored(ck) => {
                                let cv = full.get(&ck).cloned().ok_or_else(|| {
                                    StoreError::Corruption {
                                        key: k,
                                        reason: format!(
                                            "child {} missing during deep load",
                                            ck.short_hex()
                                        ),
                                    }
                                })?;
                                inlined.push(ValueRef::Inline(cv));
                            }
                            inline => inlined.push(inline),
                        }
                    }
                    Value::Composite(inlined)
                }
                leaf => leaf,
            };
            full.insert(k, resolved);
        }

        Ok(Loaded {
            value: full.remove(key).ok_or(StoreError::NotFound(*key))?,
            reference_count: root_count,
        })
    }

    /// Resolve one child of a (typically shallowly loaded) composite.
    ///
    /// An `Inline` child is returned as-is; a `Stored` child is loaded
    /// shallowly, keeping laziness one level at a time. Returns `Ok(None)`
    /// if `index` is out of range or the value is not a composite.
    pub fn resolve_child<T: KvTransaction>(
        txn: &mut T,
        value: &Value,
        index: usize,
    ) -> StoreResult<Option<Value>> {
        match value.children().get(index) {
            Some(ValueRef::Inline(child)) => Ok(Some(child.clone())),
            Some(ValueRef::Stored(key)) => Ok(Some(Self::load(txn, key)?.value)),
            None => Ok(None),
        }
    }
}
