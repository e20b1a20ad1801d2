use thiserror::Error;

/// Errors from constructing or converting foundation types.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    /// A hex string could not be decoded.
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    /// A byte slice had the wrong length for the target type.
    #[error("invalid length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// A composite was constructed with more children than the arity bound.
    #[error("composite arity {arity} exceeds maximum {max}")]
    ArityExceeded { arity: usize, max: usize },

    /// A status scalar did not name a known machine status.
    #[error("unknown machine status code: {0}")]
    UnknownStatus(u64),

    /// A value did not have the shape of a machine-state composite.
    #[error("malformed machine state: {0}")]
    MalformedMachineState(String),
}
