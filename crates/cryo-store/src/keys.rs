//! Keyspace layout within the key-value engine.
//!
//! Three disjoint prefixes keep value encodings, reference counts, and
//! checkpoint bindings from ever colliding:
//!
//! - `v/<storage-key>` — canonical value encodings
//! - `r/<storage-key>` — u32-LE reference counts
//! - `c/<name>` — checkpoint name bindings

use cryo_types::StorageKey;

/// Prefix for canonical value encodings.
pub const VALUE_PREFIX: &[u8] = b"v/";
/// Prefix for reference counts.
pub const REFCOUNT_PREFIX: &[u8] = b"r/";
/// Prefix for checkpoint name bindings.
pub const CHECKPOINT_PREFIX: &[u8] = b"c/";

fn prefixed(prefix: &[u8], suffix: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(prefix.len() + suffix.len());
    out.extend_from_slice(prefix);
    out.extend_from_slice(suffix);
    out
}

/// Engine key holding the canonical encoding for `key`.
pub fn value_key(key: &StorageKey) -> Vec<u8> {
    prefixed(VALUE_PREFIX, key.as_bytes())
}

/// Engine key holding the reference count for `key`.
pub fn refcount_key(key: &StorageKey) -> Vec<u8> {
    prefixed(REFCOUNT_PREFIX, key.as_bytes())
}

/// Engine key holding the binding for checkpoint `name`.
///
/// Checkpoint names are opaque bytes chosen by the caller; no format is
/// imposed here.
pub fn checkpoint_key(name: &[u8]) -> Vec<u8> {
    prefixed(CHECKPOINT_PREFIX, name)
}
