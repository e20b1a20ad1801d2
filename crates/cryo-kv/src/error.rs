use thiserror::Error;

/// Errors from the key-value engine.
#[derive(Debug, Error)]
pub enum KvError {
    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored bytes failed an engine-level integrity check.
    #[error("corrupt entry: {0}")]
    Corruption(String),

    /// A concurrent transaction committed a change to a key this
    /// transaction read. Retryable: re-run the whole transaction.
    #[error("commit conflict: a key in the read set was modified concurrently")]
    CommitConflict,

    /// The engine itself failed (poisoned lock, closed backend).
    #[error("engine failure: {0}")]
    Engine(String),
}

/// Result alias for engine operations.
pub type KvResult<T> = Result<T, KvError>;
