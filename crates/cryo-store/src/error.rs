use cryo_types::{StorageKey, TypeError};
use thiserror::Error;

/// Errors from value-store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested key has no stored value. Expected and recoverable;
    /// the caller decides what absence means.
    #[error("value not found: {0}")]
    NotFound(StorageKey),

    /// Stored bytes failed to decode per the canonical format, or did not
    /// hash back to their own key. Non-recoverable for that key.
    #[error("corrupt value {key}: {reason}")]
    Corruption { key: StorageKey, reason: String },

    /// A reference count was decremented past zero. This means a caller
    /// bypassed the save/release protocol; it is a bug, not a normal
    /// failure, and must not be swallowed.
    #[error("reference count underflow on {0}")]
    RefCountUnderflow(StorageKey),

    /// A reference count hit `u32::MAX`. Wrapping would zero the counter
    /// while references are live, so the increment is refused instead.
    #[error("reference count overflow on {0}")]
    RefCountOverflow(StorageKey),

    /// A composite names a child key that has no stored value, or a
    /// zero-count entry still had no value to remove. Same severity as
    /// [`StoreError::RefCountUnderflow`]: the consistency model was broken.
    #[error("dangling reference: {0}")]
    DanglingReference(StorageKey),

    /// Engine-level failure. Retryable by caller policy; the store never
    /// retries internally.
    #[error(transparent)]
    Kv(#[from] cryo_kv::KvError),

    /// A foundation type could not be constructed or converted.
    #[error(transparent)]
    Type(#[from] TypeError),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
