//! Key-value engine contract for cryo.
//!
//! The checkpoint store consumes its durable backend through a minimal
//! transactional capability: `get`/`put`/`delete` grouped into an atomic
//! batch with `commit`/`abort`. Any ordered key-value engine that can offer
//! those semantics (an LSM store, a B-tree, a remote service) can sit behind
//! the [`KvEngine`] trait.
//!
//! # Isolation
//!
//! Each transaction reads from committed state plus its own buffered
//! writes, and publishes nothing until commit. Commits are all-or-nothing.
//! Two transactions that both read-modify-write the same key must not both
//! commit with a lost update; the engine detects the race and fails the
//! later commit with [`KvError::CommitConflict`], which callers treat as
//! retryable.
//!
//! # Backends
//!
//! - [`MemoryKv`] — versioned in-memory engine with optimistic transactions,
//!   for tests and embedding.

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{KvError, KvResult};
pub use memory::{MemoryKv, MemoryTransaction};
pub use traits::{KvEngine, KvTransaction};
