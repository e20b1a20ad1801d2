//! Saving and restoring full machine snapshots.
//!
//! A snapshot composes the keys of the machine's register, stacks, and
//! static segment with its code points and status into one composite value,
//! saves it through the regular value path (so it gets the same addressing
//! and refcounting as everything else), and binds a checkpoint name to the
//! resulting root — all inside the caller's transaction.

use cryo_kv::KvTransaction;
use cryo_store::{Record, Saved, ValueLoader, ValueSaver};
use cryo_types::{MachineStateKeys, StorageKey, Value, ValueRef};
use tracing::debug;

use crate::directory::CheckpointDirectory;
use crate::error::{display_name, CheckpointError, CheckpointResult};

/// Saves machine snapshots under checkpoint names.
pub struct MachineStateSaver;

impl MachineStateSaver {
    /// Save `state` as a composite value and bind `checkpoint_name` to its
    /// root key, atomically within `txn`.
    ///
    /// The register/stack/static keys in `state` must already be durable
    /// (saved earlier in this or a committed transaction); a key that is
    /// not is [`cryo_store::StoreError::DanglingReference`]. The binding
    /// takes over the save's reference on the root.
    pub fn save_machine_state<T: KvTransaction>(
        txn: &mut T,
        state: &MachineStateKeys,
        checkpoint_name: &[u8],
    ) -> CheckpointResult<Saved> {
        let saved = ValueSaver::save(txn, &state.to_value())?;
        CheckpointDirectory::bind(txn, checkpoint_name, saved.key)?;
        debug!(
            name = %display_name(checkpoint_name),
            root = %saved.key.short_hex(),
            count = saved.reference_count,
            "saved machine state"
        );
        Ok(saved)
    }
}

/// Restores machine snapshots from checkpoint names.
pub struct MachineStateLoader;

impl MachineStateLoader {
    /// Resolve `checkpoint_name` and decode the bound snapshot back into a
    /// [`MachineStateKeys`] record.
    pub fn load_machine_state<T: KvTransaction>(
        txn: &mut T,
        checkpoint_name: &[u8],
    ) -> CheckpointResult<Record<MachineStateKeys>> {
        let root = CheckpointDirectory::resolve(txn, checkpoint_name)?
            .ok_or_else(|| CheckpointError::not_found(checkpoint_name))?;
        Self::load_by_key(txn, &root)
    }

    /// Decode the snapshot stored at `root` directly.
    pub fn load_by_key<T: KvTransaction>(
        txn: &mut T,
        root: &StorageKey,
    ) -> CheckpointResult<Record<MachineStateKeys>> {
        let loaded = ValueLoader::load(txn, root)?;

        // The shallow load hands every slot back as a stored key. The key
        // slots stay that way; the code-point and status slots are small
        // leaves, so resolve just those before decoding the record.
        let children = loaded.value.children();
        let mut resolved = Vec::with_capacity(children.len());
        for (idx, child) in children.iter().enumerate() {
            match (idx, child) {
                (4..=6, ValueRef::Stored(key)) => {
                    let leaf = ValueLoader::load(txn, key)?;
                    resolved.push(ValueRef::Inline(leaf.value));
                }
                (_, other) => resolved.push(other.clone()),
            }
        }

        let state = MachineStateKeys::from_value(&Value::Composite(resolved))?;
        Ok(Record {
            reference_count: loaded.reference_count,
            data: state,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cryo_kv::{KvEngine, KvTransaction, MemoryKv};
    use cryo_store::{ContentAddresser, ReferenceCounter, StoreError, ValueDeleter};
    use cryo_types::{CodePoint, MachineStatus};

    /// Save the supporting value graphs and build a snapshot record the way
    /// a machine would before checkpointing.
    fn durable_state<T: KvTransaction>(txn: &mut T, seed: u64) -> MachineStateKeys {
        let static_root = ValueSaver::save(txn, &Value::buffer(b"static".to_vec())).unwrap();
        let register = ValueSaver::save(txn, &Value::from_u64(seed)).unwrap();
        let stack = ValueSaver::save(
            txn,
            &Value::composite_of(vec![Value::from_u64(seed + 1), Value::from_u64(seed + 2)])
                .unwrap(),
        )
        .unwrap();
        let aux = ValueSaver::save(txn, &Value::composite(vec![]).unwrap()).unwrap();
        MachineStateKeys {
            static_root: static_root.key,
            register: register.key,
            data_stack: stack.key,
            aux_stack: aux.key,
            program_counter: CodePoint::new(40, StorageKey::from_bytes(b"code")),
            error_counter: CodePoint::new(0, StorageKey::from_bytes(b"code")),
            status: MachineStatus::Extensive,
        }
    }

    #[test]
    fn save_and_restore_roundtrip() {
        let kv = MemoryKv::new();
        let mut txn = kv.begin();
        let state = durable_state(&mut txn, 100);
        MachineStateSaver::save_machine_state(&mut txn, &state, b"resume-here").unwrap();
        txn.commit().unwrap();

        let mut fresh = kv.begin();
        let restored = MachineStateLoader::load_machine_state(&mut fresh, b"resume-here").unwrap();
        assert_eq!(restored.data, state);
        assert_eq!(restored.reference_count, 1);
    }

    #[test]
    fn snapshot_references_its_slots() {
        let kv = MemoryKv::new();
        let mut txn = kv.begin();
        let state = durable_state(&mut txn, 1);
        MachineStateSaver::save_machine_state(&mut txn, &state, b"ckpt").unwrap();

        // Each key slot gained one reference from the snapshot composite.
        assert_eq!(
            ReferenceCounter::read(&mut txn, &state.register).unwrap(),
            Some(2)
        );
        assert_eq!(
            ReferenceCounter::read(&mut txn, &state.data_stack).unwrap(),
            Some(2)
        );
    }

    #[test]
    fn snapshot_with_undurable_slot_is_rejected() {
        let kv = MemoryKv::new();
        let mut txn = kv.begin();
        let mut state = durable_state(&mut txn, 1);
        state.register = StorageKey::from_bytes(b"never saved");
        let err =
            MachineStateSaver::save_machine_state(&mut txn, &state, b"ckpt").unwrap_err();
        assert!(matches!(
            err,
            CheckpointError::Store(StoreError::DanglingReference(_))
        ));
    }

    #[test]
    fn load_unknown_checkpoint_is_not_found() {
        let kv = MemoryKv::new();
        let mut txn = kv.begin();
        assert!(matches!(
            MachineStateLoader::load_machine_state(&mut txn, b"ghost").unwrap_err(),
            CheckpointError::NotFound { .. }
        ));
    }

    #[test]
    fn snapshot_root_is_content_addressed() {
        let kv = MemoryKv::new();
        let mut txn = kv.begin();
        let state = durable_state(&mut txn, 9);
        let saved =
            MachineStateSaver::save_machine_state(&mut txn, &state, b"ckpt").unwrap();
        assert_eq!(saved.key, ContentAddresser::address_of(&state.to_value()).unwrap());
    }

    #[test]
    fn identical_states_share_one_snapshot() {
        let kv = MemoryKv::new();
        let mut txn = kv.begin();
        let state = durable_state(&mut txn, 3);
        let first =
            MachineStateSaver::save_machine_state(&mut txn, &state, b"ckpt-a").unwrap();
        let second =
            MachineStateSaver::save_machine_state(&mut txn, &state, b"ckpt-b").unwrap();
        assert_eq!(first.key, second.key);
        // Two bindings, two references on the shared root.
        assert_eq!(
            ReferenceCounter::read(&mut txn, &first.key).unwrap(),
            Some(2)
        );
    }

    #[test]
    fn removing_checkpoint_releases_slots() {
        let kv = MemoryKv::new();
        let mut txn = kv.begin();
        let state = durable_state(&mut txn, 5);
        MachineStateSaver::save_machine_state(&mut txn, &state, b"ckpt").unwrap();

        CheckpointDirectory::remove(&mut txn, b"ckpt").unwrap();
        // The snapshot composite is gone; the slot values keep the caller's
        // original save references.
        assert_eq!(
            ReferenceCounter::read(&mut txn, &state.register).unwrap(),
            Some(1)
        );
        // Releasing the caller's references reclaims everything.
        for key in [
            state.static_root,
            state.register,
            state.data_stack,
            state.aux_stack,
        ] {
            ValueDeleter::release(&mut txn, &key).unwrap();
        }
        txn.commit().unwrap();
        assert!(kv.is_empty().unwrap());
    }
}
