//! Append-only ledger of tool calls.
//!
//! Every call routed through a [`TraceLedger`] becomes one [`CallRecord`]. When
//! the workload finishes, [`TraceLedger::finish`] hands back the read-only
//! [`Trace`] that the verifier compares.

use crate::errors::TooltraceError;
use crate::hashing::{digest, to_value};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One recorded tool invocation. Field order is the on-disk order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRecord {
    pub tool: String,
    pub input: Value,
    pub output: Value,
    /// Hex SHA-256 of the canonical `output`.
    pub digest: String,
}

impl CallRecord {
    /// Build a record, deriving `digest` from `output`.
    pub fn new(
        tool: impl Into<String>,
        input: Value,
        output: Value,
    ) -> Result<Self, TooltraceError> {
        let digest = digest(&output)?;
        Ok(Self {
            tool: tool.into(),
            input,
            output,
            digest,
        })
    }
}

/// Ordered call records for a single workload execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Trace {
    records: Vec<CallRecord>,
}

impl Trace {
    pub fn from_records(records: Vec<CallRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[CallRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CallRecord> {
        self.records.iter()
    }

    pub fn into_records(self) -> Vec<CallRecord> {
        self.records
    }
}

impl<'a> IntoIterator for &'a Trace {
    type Item = &'a CallRecord;
    type IntoIter = std::slice::Iter<'a, CallRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[derive(Debug, Default)]
pub struct TraceLedger {
    records: Vec<CallRecord>,
}

impl TraceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `compute` on `input`, append the resulting call record and return
    /// the computed output untouched.
    pub fn invoke<I, O, F>(
        &mut self,
        tool: &str,
        input: &I,
        compute: F,
    ) -> Result<O, TooltraceError>
    where
        I: Serialize + ?Sized,
        O: Serialize,
        F: FnOnce(&I) -> O,
    {
        self.try_invoke(tool, input, |input| Ok(compute(input)))
    }

    /// Fallible form of [`TraceLedger::invoke`]. A failed call leaves the
    /// ledger untouched.
    pub fn try_invoke<I, O, F>(
        &mut self,
        tool: &str,
        input: &I,
        compute: F,
    ) -> Result<O, TooltraceError>
    where
        I: Serialize + ?Sized,
        O: Serialize,
        F: FnOnce(&I) -> Result<O, TooltraceError>,
    {
        let input_value = to_value(input)?;
        let output = compute(input)?;
        let record = CallRecord::new(tool, input_value, to_value(&output)?)?;
        self.records.push(record);
        Ok(output)
    }

    pub fn records(&self) -> &[CallRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn finish(self) -> Trace {
        Trace {
            records: self.records,
        }
    }
}
