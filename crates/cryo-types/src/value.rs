use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::storage_key::StorageKey;

/// Maximum number of children a composite value may hold.
///
/// The bound keeps stored encodings fixed-width-indexable and guarantees
/// that release cascades terminate over strictly shrinking key sets.
pub const MAX_COMPOSITE_ARITY: usize = 8;

/// The kind of a value, used for type tags and diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    /// Fixed-width 256-bit numeric.
    Scalar,
    /// Reference into immutable, content-addressed program code.
    CodePoint,
    /// Opaque byte blob.
    Buffer,
    /// Ordered, bounded-arity sequence of child values.
    Composite,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar => write!(f, "scalar"),
            Self::CodePoint => write!(f, "codepoint"),
            Self::Buffer => write!(f, "buffer"),
            Self::Composite => write!(f, "composite"),
        }
    }
}

/// A reference into immutable program code.
///
/// The code segment is itself content-addressed; a code point pins a
/// specific offset within a specific code root.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CodePoint {
    /// Instruction offset within the code segment.
    pub offset: u64,
    /// Content address of the code segment.
    pub code_root: StorageKey,
}

impl CodePoint {
    /// Create a code point at `offset` within the segment named by `code_root`.
    pub fn new(offset: u64, code_root: StorageKey) -> Self {
        Self { offset, code_root }
    }
}

/// A composite child: either an inlined value or the storage key of a value
/// that has already been saved.
///
/// Structural sharing is expressed through `Stored`: two parents referencing
/// the same key share one persisted copy of the child.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueRef {
    /// The child value carried inline, not yet saved on its own.
    Inline(Value),
    /// The content address of an already-stored child.
    Stored(StorageKey),
}

/// An immutable node in a rooted value DAG.
///
/// Values are never mutated after creation. A composite may reference a
/// child either inline or by storage key, but never an ancestor: the value
/// model is acyclic by construction, which the release cascade relies on
/// for termination.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Value {
    /// 256-bit big-endian numeric.
    Scalar([u8; 32]),
    /// Reference into immutable program code.
    CodePoint(CodePoint),
    /// Opaque byte blob.
    Buffer(Vec<u8>),
    /// Ordered children, at most [`MAX_COMPOSITE_ARITY`] of them.
    Composite(Vec<ValueRef>),
}

impl Value {
    /// A scalar from a `u64`, widened to 256 bits big-endian.
    pub fn from_u64(n: u64) -> Self {
        let mut bytes = [0u8; 32];
        bytes[24..].copy_from_slice(&n.to_be_bytes());
        Self::Scalar(bytes)
    }

    /// A scalar from raw 256-bit big-endian bytes.
    pub fn scalar(bytes: [u8; 32]) -> Self {
        Self::Scalar(bytes)
    }

    /// A code-point value.
    pub fn code_point(offset: u64, code_root: StorageKey) -> Self {
        Self::CodePoint(CodePoint::new(offset, code_root))
    }

    /// A buffer value from raw bytes.
    pub fn buffer(data: impl Into<Vec<u8>>) -> Self {
        Self::Buffer(data.into())
    }

    /// A composite value. Fails if `children` exceeds the arity bound.
    pub fn composite(children: Vec<ValueRef>) -> Result<Self, TypeError> {
        if children.len() > MAX_COMPOSITE_ARITY {
            return Err(TypeError::ArityExceeded {
                arity: children.len(),
                max: MAX_COMPOSITE_ARITY,
            });
        }
        Ok(Self::Composite(children))
    }

    /// A composite whose children are all inlined values.
    pub fn composite_of(children: Vec<Value>) -> Result<Self, TypeError> {
        Self::composite(children.into_iter().map(ValueRef::Inline).collect())
    }

    /// The kind tag for this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Scalar(_) => ValueKind::Scalar,
            Self::CodePoint(_) => ValueKind::CodePoint,
            Self::Buffer(_) => ValueKind::Buffer,
            Self::Composite(_) => ValueKind::Composite,
        }
    }

    /// Returns `true` if this value is a composite.
    pub fn is_composite(&self) -> bool {
        matches!(self, Self::Composite(_))
    }

    /// The scalar payload as a `u64`, if this is a scalar that fits.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Scalar(bytes) if bytes[..24].iter().all(|b| *b == 0) => {
                let mut tail = [0u8; 8];
                tail.copy_from_slice(&bytes[24..]);
                Some(u64::from_be_bytes(tail))
            }
            _ => None,
        }
    }

    /// The children of a composite, or an empty slice otherwise.
    pub fn children(&self) -> &[ValueRef] {
        match self {
            Self::Composite(children) => children,
            _ => &[],
        }
    }
}
