//! Content-addressed, reference-counted value store.
//!
//! This crate is the core of cryo: it persists immutable value DAGs into a
//! transactional key-value engine so that a machine's runtime state can be
//! suspended and resumed bit-for-bit. Structurally identical subvalues are
//! stored once and shared by many parents; a per-key reference count tracks
//! exactly how many live parents point at each entry, so deletion never
//! leaves dangling references and never leaks orphaned data.
//!
//! # Components
//!
//! - [`ContentAddresser`] — deterministic storage keys from canonical value
//!   encodings (domain-separated BLAKE3)
//! - [`ReferenceCounter`] — per-key live-parent counts, transaction-scoped
//! - [`ValueSaver`] — deduplicating, children-first save of a value graph
//! - [`ValueLoader`] — shallow (lazy) and deep (eager) reconstruction
//! - [`ValueDeleter`] — cascading release when the last reference drops
//!
//! # Design Rules
//!
//! 1. Values are immutable once written; the same encoding always maps to
//!    the same key.
//! 2. Within one transaction, children are durable before their parent is
//!    written, and children are released before their parent is removed.
//! 3. A key's entry exists exactly while its reference count is positive.
//! 4. All mutation happens inside a [`cryo_kv::KvTransaction`]; aborting a
//!    transaction leaves no partial state and no refcount drift.
//! 5. Reference-count underflow is a fatal invariant violation, never a
//!    tolerated no-op.

pub mod address;
pub mod delete;
pub mod error;
pub mod keys;
pub mod load;
pub mod refcount;
pub mod results;
pub mod save;

pub use address::ContentAddresser;
pub use delete::ValueDeleter;
pub use error::{StoreError, StoreResult};
pub use load::ValueLoader;
pub use refcount::ReferenceCounter;
pub use results::{Loaded, Record, Released, Saved};
pub use save::ValueSaver;
