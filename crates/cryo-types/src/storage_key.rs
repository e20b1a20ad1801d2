use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Content-addressed identifier for a stored value.
///
/// A `StorageKey` is the BLAKE3 hash of a value's canonical encoding.
/// Identical encodings always produce the same `StorageKey`, making stored
/// values deduplicatable and shareable across parents.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StorageKey([u8; 32]);

impl StorageKey {
    /// Compute a `StorageKey` by hashing raw bytes.
    ///
    /// This is a convenience for tests and for keys that do not go through
    /// the canonical value encoding (e.g. code roots).
    pub fn from_bytes(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Create a `StorageKey` from a pre-computed hash.
    pub fn from_hash(hash: [u8; 32]) -> Self {
        Self(hash)
    }

    /// The null key (all zeros). Represents "no value".
    pub const fn null() -> Self {
        Self([0u8; 32])
    }

    /// Returns `true` if this is the null key.
    pub fn is_null(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// The raw 32-byte hash.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Hex-encoded string representation.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short hex representation (first 8 characters).
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..4])
    }

    /// Parse from a hex string.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        if bytes.len() != 32 {
            return Err(TypeError::InvalidLength {
                expected: 32,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Debug for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StorageKey({})", self.short_hex())
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl From<[u8; 32]> for StorageKey {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl From<StorageKey> for [u8; 32] {
    fn from(key: StorageKey) -> Self {
        key.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_bytes_is_deterministic() {
        let data = b"hello world";
        let k1 = StorageKey::from_bytes(data);
        let k2 = StorageKey::from_bytes(data);
        assert_eq!(k1, k2);
    }

    #[test]
    fn different_data_produces_different_keys() {
        let k1 = StorageKey::from_bytes(b"hello");
        let k2 = StorageKey::from_bytes(b"world");
        assert_ne!(k1, k2);
    }

    #[test]
    fn null_is_all_zeros() {
        let null = StorageKey::null();
        assert!(null.is_null());
        assert_eq!(null.as_bytes(), &[0u8; 32]);
    }

    #[test]
    fn hex_roundtrip() {
        let key = StorageKey::from_bytes(b"test");
        let hex = key.to_hex();
        let parsed = StorageKey::from_hex(&hex).unwrap();
        assert_eq!(key, parsed);
    }

    #[test]
    fn from_hex_rejects_bad_length() {
        let err = StorageKey::from_hex("abcd").unwrap_err();
        assert_eq!(
            err,
            TypeError::InvalidLength {
                expected: 32,
                actual: 2
            }
        );
    }

    #[test]
    fn from_hex_rejects_non_hex() {
        assert!(matches!(
            StorageKey::from_hex("zz").unwrap_err(),
            TypeError::InvalidHex(_)
        ));
    }

    #[test]
    fn short_hex_is_prefix_of_hex() {
        let key = StorageKey::from_bytes(b"prefix");
        assert!(key.to_hex().starts_with(&key.short_hex()));
        assert_eq!(key.short_hex().len(), 8);
    }

    #[test]
    fn serde_roundtrip() {
        let key = StorageKey::from_bytes(b"serde");
        let json = serde_json::to_string(&key).unwrap();
        let back: StorageKey = serde_json::from_str(&json).unwrap();
        assert_eq!(key, back);
    }
}
