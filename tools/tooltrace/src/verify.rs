//! Replay verification: order-sensitive structural equality of two traces.
//!
//! A mismatch is an ordinary finding, reported as `ok: false`, never an error.

use crate::ledger::{CallRecord, Trace};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DivergentField {
    Length,
    Tool,
    Input,
    Output,
    Digest,
}

impl DivergentField {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Length => "length",
            Self::Tool => "tool",
            Self::Input => "input",
            Self::Output => "output",
            Self::Digest => "digest",
        }
    }
}

/// First point at which two traces stop agreeing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Divergence {
    pub index: usize,
    pub field: DivergentField,
}

impl fmt::Display for Divergence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "step {} differs in {}", self.index, self.field.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReplayReport {
    pub ok: bool,
    pub divergence: Option<Divergence>,
}

pub fn verify(a: &Trace, b: &Trace) -> bool {
    compare(a, b).ok
}

pub fn compare(a: &Trace, b: &Trace) -> ReplayReport {
    let divergence = a
        .iter()
        .zip(b.iter())
        .enumerate()
        .find_map(|(index, (left, right))| {
            record_divergence(left, right).map(|field| Divergence { index, field })
        })
        .or_else(|| {
            (a.len() != b.len()).then(|| Divergence {
                index: a.len().min(b.len()),
                field: DivergentField::Length,
            })
        });
    ReplayReport {
        ok: divergence.is_none(),
        divergence,
    }
}

fn record_divergence(left: &CallRecord, right: &CallRecord) -> Option<DivergentField> {
    if left.tool != right.tool {
        Some(DivergentField::Tool)
    } else if left.input != right.input {
        Some(DivergentField::Input)
    } else if left.output != right.output {
        Some(DivergentField::Output)
    } else if left.digest != right.digest {
        Some(DivergentField::Digest)
    } else {
        None
    }
}
