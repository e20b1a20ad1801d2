//! Foundation types for cryo.
//!
//! This crate provides the core value-graph and snapshot types used
//! throughout the cryo checkpoint store. Every other cryo crate depends on
//! `cryo-types`.
//!
//! # Key Types
//!
//! - [`StorageKey`] — Content-addressed identifier (BLAKE3 hash of a value's
//!   canonical encoding)
//! - [`Value`] — Immutable node in a rooted value DAG: scalar, code-point,
//!   buffer, or composite
//! - [`ValueRef`] — A composite child: inlined value or the key of an
//!   already-stored value
//! - [`MachineStateKeys`] — Fixed-shape record of the keys making up one
//!   point-in-time machine snapshot
//! - [`MachineStatus`] — Runnable / halted / errored snapshot status

pub mod error;
pub mod machine;
pub mod storage_key;
pub mod value;

pub use error::TypeError;
pub use machine::{MachineStateKeys, MachineStatus};
pub use storage_key::StorageKey;
pub use value::{CodePoint, Value, ValueKind, ValueRef, MAX_COMPOSITE_ARITY};
