//! Content addressing: canonical encoding and key computation.
//!
//! Every value has exactly one canonical byte encoding, and its storage key
//! is the domain-separated BLAKE3 hash of that encoding. The encoding is
//! type-tagged so the four value kinds can never collide, and a composite
//! encodes the storage *keys* of its children rather than their bytes: a
//! parent's address changes only when a child's identity changes, which is
//! what makes structural sharing work.
//!
//! # Canonical layout
//!
//! | kind       | bytes                                              |
//! |------------|----------------------------------------------------|
//! | scalar     | `0x00` + 32-byte big-endian numeric                |
//! | code point | `0x01` + u64-LE offset + 32-byte code root         |
//! | buffer     | `0x02` + u64-LE length + raw bytes                 |
//! | composite  | `0x03` + u8 arity + 32-byte child key per slot     |
//!
//! Addressing walks the graph with an explicit stack: value graphs (stacks
//! in particular) can be arbitrarily deep, so no step recurses.

use std::collections::HashMap;

use cryo_types::{CodePoint, StorageKey, TypeError, Value, ValueRef, MAX_COMPOSITE_ARITY};

use crate::error::{StoreError, StoreResult};

const TAG_SCALAR: u8 = 0x00;
const TAG_CODEPOINT: u8 = 0x01;
const TAG_BUFFER: u8 = 0x02;
const TAG_COMPOSITE: u8 = 0x03;

/// Domain tag mixed into every key hash. Bump the version if the canonical
/// layout ever changes, so old and new encodings can never alias.
const DOMAIN: &str = "cryo-value-v1";

/// Per-node output of an addressing pass.
#[derive(Clone, Debug)]
pub(crate) struct NodePlan {
    /// Canonical encoding of this node.
    pub encoding: Vec<u8>,
    /// Distinct child keys, in first-appearance order. Empty for leaves.
    ///
    /// Distinct, because a composite holds one reference per distinct child
    /// key: `[x, x]` pins `x` once, not twice.
    pub children: Vec<StorageKey>,
}

/// Computes deterministic storage keys from canonical value encodings.
///
/// Pure and deterministic: no side effects, stable across processes.
pub struct ContentAddresser;

impl ContentAddresser {
    /// The storage key of `value`.
    ///
    /// Fails only if a composite in the graph exceeds the arity bound.
    /// [`Value::composite`] construction makes that unrepresentable, but the
    /// `Composite` variant itself is public, so it is checked here too.
    pub fn address_of(value: &Value) -> StoreResult<StorageKey> {
        let (root, _) = Self::plan(value)?;
        Ok(root)
    }

    /// The canonical encoding of `value` (children resolved to keys).
    pub fn encode(value: &Value) -> StoreResult<Vec<u8>> {
        let (root, plans) = Self::plan(value)?;
        // The root is always present in its own plan.
        Ok(plans[&root].encoding.clone())
    }

    /// Hash a canonical encoding into its storage key.
    pub fn key_for_encoding(encoding: &[u8]) -> StorageKey {
        let mut hasher = blake3::Hasher::new();
        hasher.update(DOMAIN.as_bytes());
        hasher.update(b":");
        hasher.update(encoding);
        StorageKey::from_hash(*hasher.finalize().as_bytes())
    }

    /// Address every inline node reachable from `value`, bottom-up.
    ///
    /// Returns the root key and a plan per distinct key. Structurally equal
    /// subvalues collapse onto one plan, mirroring how they collapse onto
    /// one stored entry. A composite wider than the arity bound is rejected
    /// here, before any caller can persist an encoding whose one-byte arity
    /// field would lie about it.
    pub(crate) fn plan(
        value: &Value,
    ) -> StoreResult<(StorageKey, HashMap<StorageKey, NodePlan>)> {
        enum Frame<'a> {
            Enter(&'a Value),
            Exit(&'a Value),
        }

        let ptr = |v: &Value| v as *const Value as usize;
        let mut key_of: HashMap<usize, StorageKey> = HashMap::new();
        let mut plans: HashMap<StorageKey, NodePlan> = HashMap::new();
        let mut stack = vec![Frame::Enter(value)];

        while let Some(frame) = stack.pop() {
            match frame {
                Frame::Enter(v) => {
                    if key_of.contains_key(&ptr(v)) {
                        continue;
                    }
                    stack.push(Frame::Exit(v));
                    if let Value::Composite(children) = v {
                        if children.len() > MAX_COMPOSITE_ARITY {
                            return Err(StoreError::Type(TypeError::ArityExceeded {
                                arity: children.len(),
                                max: MAX_COMPOSITE_ARITY,
                            }));
                        }
                        for child in children.iter().rev() {
                            if let ValueRef::Inline(cv) = child {
                                stack.push(Frame::Enter(cv));
                            }
                        }
                    }
                }
                Frame::Exit(v) => {
                    // Children (if any) were addressed first.
                    let encoding = encode_node(v, |child| match child {
                        ValueRef::Stored(k) => *k,
                        ValueRef::Inline(cv) => key_of[&ptr(cv)],
                    });
                    let key = Self::key_for_encoding(&encoding);
                    key_of.insert(ptr(v), key);
                    plans.entry(key).or_insert_with(|| NodePlan {
                        children: distinct_child_keys(v, &key_of),
                        encoding,
                    });
                }
            }
        }

        Ok((key_of[&ptr(value)], plans))
    }

    /// Decode a canonical encoding back into a value.
    ///
    /// Shallow: composite children come back as `Stored` keys. `key` is the
    /// entry the bytes were read from, used for error reporting.
    pub fn decode(key: &StorageKey, bytes: &[u8]) -> StoreResult<Value> {
        let corrupt = |reason: &str| StoreError::Corruption {
            key: *key,
            reason: reason.to_string(),
        };

        let (&tag, rest) = bytes.split_first().ok_or_else(|| corrupt("empty encoding"))?;
        match tag {
            TAG_SCALAR => {
                let arr: [u8; 32] = rest
                    .try_into()
                    .map_err(|_| corrupt("scalar must be exactly 32 bytes"))?;
                Ok(Value::Scalar(arr))
            }
            TAG_CODEPOINT => {
                if rest.len() != 8 + 32 {
                    return Err(corrupt("code point must be 40 bytes after the tag"));
                }
                let mut off = [0u8; 8];
                off.copy_from_slice(&rest[..8]);
                let offset = u64::from_le_bytes(off);
                let mut root = [0u8; 32];
                root.copy_from_slice(&rest[8..]);
                Ok(Value::CodePoint(CodePoint::new(
                    offset,
                    StorageKey::from_hash(root),
                )))
            }
            TAG_BUFFER => {
                if rest.len() < 8 {
                    return Err(corrupt("buffer missing length field"));
                }
                let mut len_bytes = [0u8; 8];
                len_bytes.copy_from_slice(&rest[..8]);
                let len = u64::from_le_bytes(len_bytes);
                let data = &rest[8..];
                if data.len() as u64 != len {
                    return Err(corrupt("buffer length field disagrees with payload"));
                }
                Ok(Value::Buffer(data.to_vec()))
            }
            TAG_COMPOSITE => {
                let (&arity, body) = rest
                    .split_first()
                    .ok_or_else(|| corrupt("composite missing arity"))?;
                let arity = arity as usize;
                if arity > MAX_COMPOSITE_ARITY {
                    return Err(corrupt("composite arity exceeds bound"));
                }
                if body.len() != arity * 32 {
                    return Err(corrupt("composite body length disagrees with arity"));
                }
                let children = body
                    .chunks_exact(32)
                    .map(|chunk| {
                        let mut arr = [0u8; 32];
                        arr.copy_from_slice(chunk);
                        ValueRef::Stored(StorageKey::from_hash(arr))
                    })
                    .collect();
                Ok(Value::Composite(children))
            }
            other => Err(corrupt(&format!("unknown type tag {other:#04x}"))),
        }
    }
}

/// Encode one node, resolving each child through `child_key`.
fn encode_node(value: &Value, mut child_key: impl FnMut(&ValueRef) -> StorageKey) -> Vec<u8> {
    match value {
        Value::Scalar(bytes) => {
            let mut out = Vec::with_capacity(1 + 32);
            out.push(TAG_SCALAR);
            out.extend_from_slice(bytes);
            out
        }
        Value::CodePoint(cp) => {
            let mut out = Vec::with_capacity(1 + 8 + 32);
            out.push(TAG_CODEPOINT);
            out.extend_from_slice(&cp.offset.to_le_bytes());
            out.extend_from_slice(cp.code_root.as_bytes());
            out
        }
        Value::Buffer(data) => {
            let mut out = Vec::with_capacity(1 + 8 + data.len());
            out.push(TAG_BUFFER);
            out.extend_from_slice(&(data.len() as u64).to_le_bytes());
            out.extend_from_slice(data);
            out
        }
        Value::Composite(children) => {
            let mut out = Vec::with_capacity(2 + children.len() * 32);
            out.push(TAG_COMPOSITE);
            out.push(children.len() as u8);
            for child in children {
                out.extend_from_slice(child_key(child).as_bytes());
            }
            out
        }
    }
}

fn distinct_child_keys(value: &Value, key_of: &HashMap<usize, StorageKey>) -> Vec<StorageKey> {
    let ptr = |v: &Value| v as *const Value as usize;
    let mut seen = Vec::new();
    if let Value::Composite(children) = value {
        for child in children {
            let key = match child {
                ValueRef::Stored(k) => *k,
                ValueRef::Inline(cv) => key_of[&ptr(cv)],
            };
            if !seen.contains(&key) {
                seen.push(key);
            }
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn address_is_deterministic() {
        let v = Value::from_u64(5);
        assert_eq!(
            ContentAddresser::address_of(&v).unwrap(),
            ContentAddresser::address_of(&v).unwrap()
        );
    }

    #[test]
    fn kinds_never_collide() {
        // A scalar, a buffer, and a composite chosen so their payloads are
        // byte-identical apart from the tag still get distinct keys.
        let scalar = Value::Scalar([7u8; 32]);
        let buffer = Value::Buffer([7u8; 32].to_vec());
        assert_ne!(
            ContentAddresser::address_of(&scalar).unwrap(),
            ContentAddresser::address_of(&buffer).unwrap()
        );
    }

    #[test]
    fn composite_address_depends_on_child_identity() {
        let a = Value::composite_of(vec![Value::from_u64(1), Value::from_u64(2)]).unwrap();
        let b = Value::composite_of(vec![Value::from_u64(1), Value::from_u64(3)]).unwrap();
        assert_ne!(
            ContentAddresser::address_of(&a).unwrap(),
            ContentAddresser::address_of(&b).unwrap()
        );
    }

    #[test]
    fn inline_and_stored_child_address_identically() {
        let child = Value::from_u64(9);
        let child_key = ContentAddresser::address_of(&child).unwrap();
        let inline = Value::composite(vec![ValueRef::Inline(child)]).unwrap();
        let stored = Value::composite(vec![ValueRef::Stored(child_key)]).unwrap();
        assert_eq!(
            ContentAddresser::address_of(&inline).unwrap(),
            ContentAddresser::address_of(&stored).unwrap()
        );
    }

    #[test]
    fn deep_chain_does_not_overflow() {
        // A 10k-deep cons chain; recursion here would blow the stack.
        let mut v = Value::from_u64(0);
        for i in 0..10_000u64 {
            v = Value::composite(vec![
                ValueRef::Inline(Value::from_u64(i)),
                ValueRef::Inline(v),
            ])
            .unwrap();
        }
        let key = ContentAddresser::address_of(&v).unwrap();
        assert!(!key.is_null());
    }

    #[test]
    fn leaf_decode_roundtrip() {
        for v in [
            Value::from_u64(42),
            Value::Scalar([0xff; 32]),
            Value::buffer(b"blob".to_vec()),
            Value::buffer(Vec::new()),
            Value::code_point(12, StorageKey::from_bytes(b"code")),
        ] {
            let encoding = ContentAddresser::encode(&v).unwrap();
            let key = ContentAddresser::key_for_encoding(&encoding);
            let decoded = ContentAddresser::decode(&key, &encoding).unwrap();
            assert_eq!(decoded, v);
        }
    }

    #[test]
    fn composite_decodes_to_stored_children() {
        let child = Value::from_u64(5);
        let child_key = ContentAddresser::address_of(&child).unwrap();
        let parent = Value::composite_of(vec![child.clone(), child]).unwrap();

        let encoding = ContentAddresser::encode(&parent).unwrap();
        let key = ContentAddresser::key_for_encoding(&encoding);
        let decoded = ContentAddresser::decode(&key, &encoding).unwrap();
        assert_eq!(
            decoded,
            Value::Composite(vec![
                ValueRef::Stored(child_key),
                ValueRef::Stored(child_key),
            ])
        );
    }

    #[test]
    fn plan_dedups_identical_children() {
        let parent =
            Value::composite_of(vec![Value::from_u64(5), Value::from_u64(5)]).unwrap();
        let (root, plans) = ContentAddresser::plan(&parent).unwrap();
        // One plan for the parent, one for the shared child.
        assert_eq!(plans.len(), 2);
        assert_eq!(plans[&root].children.len(), 1);
    }

    #[test]
    fn decode_rejects_garbage() {
        let key = StorageKey::from_bytes(b"k");
        for bytes in [
            &[][..],
            &[0x09][..],                   // unknown tag
            &[TAG_SCALAR, 1, 2][..],       // short scalar
            &[TAG_COMPOSITE][..],          // missing arity
            &[TAG_COMPOSITE, 2, 0][..],    // truncated children
            &[TAG_COMPOSITE, 9][..],       // arity over bound
            &[TAG_BUFFER, 1][..],          // missing length field
            &[TAG_BUFFER, 5, 0, 0, 0, 0, 0, 0, 0, 1][..], // length mismatch
        ] {
            let err = ContentAddresser::decode(&key, bytes).unwrap_err();
            assert!(matches!(err, StoreError::Corruption { .. }), "{bytes:?}");
        }
    }

    #[test]
    fn over_arity_composite_is_rejected() {
        // The `Composite` variant is public, so a graph can bypass the
        // `Value::composite` constructor check; addressing must refuse it
        // rather than emit an arity byte that lies.
        let wide = Value::Composite(
            (0..9u64)
                .map(|n| ValueRef::Inline(Value::from_u64(n)))
                .collect(),
        );
        assert!(matches!(
            ContentAddresser::address_of(&wide).unwrap_err(),
            StoreError::Type(TypeError::ArityExceeded { arity: 9, max: 8 })
        ));

        // Wide enough to wrap a u8, nested below a valid root.
        let huge = Value::Composite(
            (0..256u64)
                .map(|n| ValueRef::Inline(Value::from_u64(n)))
                .collect(),
        );
        let root = Value::Composite(vec![ValueRef::Inline(huge)]);
        assert!(matches!(
            ContentAddresser::address_of(&root).unwrap_err(),
            StoreError::Type(TypeError::ArityExceeded { arity: 256, .. })
        ));
    }

    // -----------------------------------------------------------------------
    // Properties
    // -----------------------------------------------------------------------

    fn arb_value() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            any::<u64>().prop_map(Value::from_u64),
            proptest::collection::vec(any::<u8>(), 0..64).prop_map(Value::Buffer),
            (any::<u64>(), any::<[u8; 32]>())
                .prop_map(|(off, root)| Value::code_point(off, StorageKey::from_hash(root))),
        ];
        leaf.prop_recursive(4, 64, 8, |inner| {
            proptest::collection::vec(inner.prop_map(ValueRef::Inline), 0..=8)
                .prop_map(Value::Composite)
        })
    }

    proptest! {
        #[test]
        fn address_stable_across_calls(v in arb_value()) {
            prop_assert_eq!(
                ContentAddresser::address_of(&v).unwrap(),
                ContentAddresser::address_of(&v).unwrap()
            );
        }

        #[test]
        fn encoding_hashes_to_address(v in arb_value()) {
            let encoding = ContentAddresser::encode(&v).unwrap();
            prop_assert_eq!(
                ContentAddresser::key_for_encoding(&encoding),
                ContentAddresser::address_of(&v).unwrap()
            );
        }

        #[test]
        fn decode_preserves_identity(v in arb_value()) {
            // Decoding the canonical encoding yields a value with the same
            // address, even though composite children come back as keys.
            let encoding = ContentAddresser::encode(&v).unwrap();
            let key = ContentAddresser::address_of(&v).unwrap();
            let decoded = ContentAddresser::decode(&key, &encoding).unwrap();
            prop_assert_eq!(ContentAddresser::address_of(&decoded).unwrap(), key);
        }

        #[test]
        fn distinct_scalars_get_distinct_keys(a in any::<u64>(), b in any::<u64>()) {
            prop_assume!(a != b);
            prop_assert_ne!(
                ContentAddresser::address_of(&Value::from_u64(a)).unwrap(),
                ContentAddresser::address_of(&Value::from_u64(b)).unwrap()
            );
        }
    }
}
