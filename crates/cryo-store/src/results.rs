//! Result payloads for store operations.
//!
//! Every mutating or reading operation reports the post-operation reference
//! count alongside its payload. These are the `Ok` halves of tagged results:
//! an error can never be mistaken for valid data.

use cryo_types::{StorageKey, Value};

/// Outcome of a successful save: where the value lives and how many live
/// references now point at it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Saved {
    /// Content address of the saved root.
    pub key: StorageKey,
    /// Reference count after this save's increment.
    pub reference_count: u32,
}

/// Outcome of a successful load.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Loaded {
    /// The reconstructed value. Composite children may still be `Stored`
    /// keys when loaded shallowly.
    pub value: Value,
    /// Reference count at load time. Loading never changes it.
    pub reference_count: u32,
}

/// Outcome of a successful release.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Released {
    /// Reference count after the decrement. Zero means the entry (and any
    /// children it solely held) has been removed.
    pub reference_count: u32,
}

impl Released {
    /// Returns `true` if the release removed the entry.
    pub fn is_removed(&self) -> bool {
        self.reference_count == 0
    }
}

/// A typed read: reference count plus decoded payload.
///
/// Parameterizes the load shape uniformly for reads that decode the stored
/// value into a richer type (e.g. a machine-state record).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record<T> {
    /// Reference count at read time.
    pub reference_count: u32,
    /// The decoded payload.
    pub data: T,
}

impl<T> Record<T> {
    /// Map the payload, keeping the reference count.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Record<U> {
        Record {
            reference_count: self.reference_count,
            data: f(self.data),
        }
    }
}
