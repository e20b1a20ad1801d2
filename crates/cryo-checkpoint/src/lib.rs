//! Named machine-state checkpoints.
//!
//! A checkpoint is a durable binding from a caller-chosen name (opaque
//! bytes) to the storage key of a full machine-state snapshot. Snapshot and
//! naming happen in one transaction: a reader can never observe a name
//! bound to a not-yet-durable state.
//!
//! The binding owns one reference to its root key. Rebinding a name
//! releases the old snapshot's hold on its graph; removing the binding
//! releases the reference and lets the cascade reclaim whatever the
//! snapshot solely kept alive.

pub mod directory;
pub mod error;
pub mod machine;

pub use directory::CheckpointDirectory;
pub use error::{CheckpointError, CheckpointResult};
pub use machine::{MachineStateLoader, MachineStateSaver};
