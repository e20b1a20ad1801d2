//! Fixed-shape machine snapshot records.
//!
//! A [`MachineStateKeys`] names the storage keys of every register/stack
//! slot of one point-in-time machine snapshot, plus its status. It converts
//! to and from a composite [`Value`], so a snapshot inherits the same
//! content addressing and reference counting as any other stored value.

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::storage_key::StorageKey;
use crate::value::{CodePoint, Value, ValueRef};

/// Execution status captured in a snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MachineStatus {
    /// The machine can keep running from this state.
    Extensive,
    /// The machine halted normally.
    Halted,
    /// The machine stopped with an error.
    Errored,
}

impl MachineStatus {
    /// Numeric code used in the status scalar of a snapshot composite.
    pub fn code(&self) -> u64 {
        match self {
            Self::Extensive => 0,
            Self::Halted => 1,
            Self::Errored => 2,
        }
    }

    /// Parse from a numeric code.
    pub fn from_code(code: u64) -> Result<Self, TypeError> {
        match code {
            0 => Ok(Self::Extensive),
            1 => Ok(Self::Halted),
            2 => Ok(Self::Errored),
            other => Err(TypeError::UnknownStatus(other)),
        }
    }
}

/// The storage keys making up one machine snapshot.
///
/// Every slot except the code points and status is the key of a value that
/// must already be durable before the snapshot composite is saved; the
/// snapshot then holds one reference on each.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineStateKeys {
    /// Root of the immutable static data segment.
    pub static_root: StorageKey,
    /// The machine register value.
    pub register: StorageKey,
    /// The data stack, saved as a value graph.
    pub data_stack: StorageKey,
    /// The auxiliary stack, saved as a value graph.
    pub aux_stack: StorageKey,
    /// Where execution resumes.
    pub program_counter: CodePoint,
    /// Where execution jumps on error.
    pub error_counter: CodePoint,
    /// Snapshot status.
    pub status: MachineStatus,
}

impl MachineStateKeys {
    /// Build the composite value under which this snapshot is stored.
    ///
    /// The key slots are `Stored` references (the snapshot takes one
    /// reference on each); code points and the status scalar are inlined.
    pub fn to_value(&self) -> Value {
        Value::Composite(vec![
            ValueRef::Stored(self.static_root),
            ValueRef::Stored(self.register),
            ValueRef::Stored(self.data_stack),
            ValueRef::Stored(self.aux_stack),
            ValueRef::Inline(Value::CodePoint(self.program_counter)),
            ValueRef::Inline(Value::CodePoint(self.error_counter)),
            ValueRef::Inline(Value::from_u64(self.status.code())),
        ])
    }

    /// Decode a snapshot record back from its composite value.
    pub fn from_value(value: &Value) -> Result<Self, TypeError> {
        let children = match value {
            Value::Composite(children) if children.len() == 7 => children,
            Value::Composite(children) => {
                return Err(TypeError::MalformedMachineState(format!(
                    "expected 7 slots, got {}",
                    children.len()
                )))
            }
            other => {
                return Err(TypeError::MalformedMachineState(format!(
                    "expected composite, got {}",
                    other.kind()
                )))
            }
        };

        let stored = |idx: usize, slot: &str| match &children[idx] {
            ValueRef::Stored(key) => Ok(*key),
            ValueRef::Inline(_) => Err(TypeError::MalformedMachineState(format!(
                "{slot} slot must be a stored reference"
            ))),
        };
        let code_point = |idx: usize, slot: &str| match &children[idx] {
            ValueRef::Inline(Value::CodePoint(cp)) => Ok(*cp),
            _ => Err(TypeError::MalformedMachineState(format!(
                "{slot} slot must be an inline code point"
            ))),
        };

        let status = match &children[6] {
            ValueRef::Inline(v) => {
                let code = v.as_u64().ok_or_else(|| {
                    TypeError::MalformedMachineState("status slot must be a small scalar".into())
                })?;
                MachineStatus::from_code(code)?
            }
            ValueRef::Stored(_) => {
                return Err(TypeError::MalformedMachineState(
                    "status slot must be inline".into(),
                ))
            }
        };

        Ok(Self {
            static_root: stored(0, "static_root")?,
            register: stored(1, "register")?,
            data_stack: stored(2, "data_stack")?,
            aux_stack: stored(3, "aux_stack")?,
            program_counter: code_point(4, "program_counter")?,
            error_counter: code_point(5, "error_counter")?,
            status,
        })
    }
}
