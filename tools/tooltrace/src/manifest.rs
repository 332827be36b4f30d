//! Evidence manifest: the auditor-facing summary of verifier outcomes.
//!
//! Field names are a published contract. Renaming or removing one requires a
//! bump of [`MANIFEST_VERSION`].

use crate::ledger::Trace;
use crate::runtime::Clock;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

pub const MANIFEST_VERSION: &str = "1.0";
pub const REPLAY_VERIFIER_NAME: &str = "trace_ledger_replay";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Predicate {
    Pass,
    Fail,
}

impl Predicate {
    pub fn from_ok(ok: bool) -> Self {
        if ok {
            Self::Pass
        } else {
            Self::Fail
        }
    }

    pub fn is_pass(self) -> bool {
        self == Self::Pass
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Fail => "fail",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    pub steps: usize,
    pub replay: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifierReport {
    pub name: String,
    pub predicate: Predicate,
    pub evidence: Evidence,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceManifest {
    pub manifest_version: String,
    pub verifiers: Vec<VerifierReport>,
    pub overall: Predicate,
    pub timestamp: String,
}

impl EvidenceManifest {
    /// `overall` passes only when every verifier passes.
    pub fn from_reports(verifiers: Vec<VerifierReport>, generated_at: SystemTime) -> Self {
        let overall = Predicate::from_ok(verifiers.iter().all(|v| v.predicate.is_pass()));
        Self {
            manifest_version: MANIFEST_VERSION.to_string(),
            verifiers,
            overall,
            timestamp: format_timestamp(generated_at),
        }
    }
}

pub fn replay_report(trace: &Trace, replay_ok: bool) -> VerifierReport {
    VerifierReport {
        name: REPLAY_VERIFIER_NAME.to_string(),
        predicate: Predicate::from_ok(replay_ok),
        evidence: Evidence {
            steps: trace.len(),
            replay: replay_ok,
        },
    }
}

pub fn build_manifest(trace: &Trace, replay_ok: bool, clock: &dyn Clock) -> EvidenceManifest {
    EvidenceManifest::from_reports(vec![replay_report(trace, replay_ok)], clock.now())
}

/// UTC, second precision, trailing `Z`.
pub fn format_timestamp(at: SystemTime) -> String {
    DateTime::<Utc>::from(at).to_rfc3339_opts(SecondsFormat::Secs, true)
}
