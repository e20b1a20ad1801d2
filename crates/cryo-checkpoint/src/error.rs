use cryo_store::StoreError;
use thiserror::Error;

/// Errors from checkpoint operations.
#[derive(Debug, Error)]
pub enum CheckpointError {
    /// No checkpoint is bound under this name.
    #[error("checkpoint not found: {name}")]
    NotFound {
        /// Lossy rendering of the (opaque) checkpoint name.
        name: String,
    },

    /// The stored binding record failed to decode.
    #[error("corrupt checkpoint binding {name}: {reason}")]
    CorruptBinding { name: String, reason: String },

    /// Failure in the underlying value store.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Engine-level failure.
    #[error(transparent)]
    Kv(#[from] cryo_kv::KvError),

    /// A snapshot value did not have the machine-state shape.
    #[error(transparent)]
    Type(#[from] cryo_types::TypeError),
}

impl CheckpointError {
    pub(crate) fn not_found(name: &[u8]) -> Self {
        Self::NotFound {
            name: display_name(name),
        }
    }

    pub(crate) fn corrupt_binding(name: &[u8], reason: impl Into<String>) -> Self {
        Self::CorruptBinding {
            name: display_name(name),
            reason: reason.into(),
        }
    }
}

/// Checkpoint names are opaque bytes; render them readably for errors.
pub(crate) fn display_name(name: &[u8]) -> String {
    match std::str::from_utf8(name) {
        Ok(s) => s.to_string(),
        Err(_) => hex::encode(name),
    }
}

/// Result alias for checkpoint operations.
pub type CheckpointResult<T> = Result<T, CheckpointError>;
