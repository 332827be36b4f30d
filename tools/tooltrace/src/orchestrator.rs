//! Drives a workload twice under independent ledgers, compares the traces and
//! writes the evidence manifest.

use crate::agent::Workload;
use crate::config::RunPaths;
use crate::errors::TooltraceError;
use crate::hashing::digest;
use crate::ledger::Trace;
use crate::logging::RunLog;
use crate::manifest::{build_manifest, EvidenceManifest};
use crate::persist::{read_trace, write_manifest, write_trace};
use crate::runtime::ProductionRuntime;
use crate::tools::{RecordingTools, Tools};
use crate::verify::{compare, ReplayReport};
use serde_json::{json, Number, Value};
use std::path::Path;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Flip one byte of the second run's last recorded output before comparing.
    pub tamper: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReplayRun {
    pub summaries: [String; 2],
    pub traces: [Trace; 2],
    pub report: ReplayReport,
    pub manifest: EvidenceManifest,
}

/// Execute `workload` once against a fresh recording wrapper around `tools`.
pub fn record_run<T: Tools>(
    workload: &dyn Workload,
    tools: T,
) -> Result<(String, Trace), TooltraceError> {
    let mut recording = RecordingTools::new(tools);
    let summary = workload.run(&mut recording)?;
    Ok((summary, recording.into_trace()))
}

pub fn run_replay_check<T, F>(
    runtime: &ProductionRuntime,
    paths: &RunPaths,
    workload: &dyn Workload,
    make_tools: F,
    options: RunOptions,
    log: &RunLog,
) -> Result<ReplayRun, TooltraceError>
where
    T: Tools,
    F: Fn() -> T,
{
    let first = execute_and_persist(runtime, paths, workload, make_tools(), 1, false, log)?;
    let second = execute_and_persist(
        runtime,
        paths,
        workload,
        make_tools(),
        2,
        options.tamper,
        log,
    )?;

    let report = compare(&first.1, &second.1);
    let payload = json!({
        "ok": report.ok,
        "divergence": report.divergence,
        "steps": [first.1.len(), second.1.len()],
    });
    if report.ok {
        log.info("replay_compared", payload)?;
    } else {
        log.warn("replay_compared", payload)?;
    }

    let manifest = build_manifest(&first.1, report.ok, runtime.clock.as_ref());
    write_manifest(runtime.file_system.as_ref(), &paths.manifest, &manifest)?;
    log.info(
        "manifest_written",
        json!({
            "path": paths.manifest.display().to_string(),
            "overall": manifest.overall.as_str(),
        }),
    )?;

    report_to_terminal(runtime, &report)?;
    runtime
        .terminal
        .write_line(&format!("manifest: {}", paths.manifest.display()))?;

    Ok(ReplayRun {
        summaries: [first.0, second.0],
        traces: [first.1, second.1],
        report,
        manifest,
    })
}

/// Compare two previously persisted traces without executing anything.
pub fn compare_trace_files(
    runtime: &ProductionRuntime,
    a: &Path,
    b: &Path,
    log: &RunLog,
) -> Result<ReplayReport, TooltraceError> {
    let fs = runtime.file_system.as_ref();
    let report = compare(&read_trace(fs, a)?, &read_trace(fs, b)?);
    log.info(
        "replay_compared",
        json!({
            "ok": report.ok,
            "divergence": report.divergence,
            "traces": [a.display().to_string(), b.display().to_string()],
        }),
    )?;
    report_to_terminal(runtime, &report)?;
    Ok(report)
}

fn execute_and_persist<T: Tools>(
    runtime: &ProductionRuntime,
    paths: &RunPaths,
    workload: &dyn Workload,
    tools: T,
    run: usize,
    tamper: bool,
    log: &RunLog,
) -> Result<(String, Trace), TooltraceError> {
    log.info(
        "run_started",
        json!({"run": run, "workload": workload.name()}),
    )?;
    let (summary, mut trace) = record_run(workload, tools)?;
    for (step, record) in trace.iter().enumerate() {
        log.info(
            "tool_call",
            json!({"run": run, "step": step, "tool": record.tool, "digest": record.digest}),
        )?;
    }
    if tamper {
        trace = flip_last_output_byte(trace)?;
        log.warn("trace_tampered", json!({"run": run}))?;
    }

    let path = &paths.traces[run - 1];
    write_trace(runtime.file_system.as_ref(), path, &trace)?;
    log.info(
        "trace_written",
        json!({"run": run, "path": path.display().to_string(), "steps": trace.len()}),
    )?;
    Ok((summary, trace))
}

fn report_to_terminal(
    runtime: &ProductionRuntime,
    report: &ReplayReport,
) -> Result<(), TooltraceError> {
    runtime
        .terminal
        .write_line(&format!("replay: {}", report.ok))?;
    if let Some(divergence) = report.divergence {
        runtime
            .terminal
            .write_line(&format!("replay mismatch: {divergence}"))?;
    }
    Ok(())
}

/// Copy of `trace` whose last output has one byte altered. The digest is
/// recomputed so the altered trace still loads from disk.
pub fn flip_last_output_byte(trace: Trace) -> Result<Trace, TooltraceError> {
    let mut records = trace.into_records();
    if let Some(last) = records.last_mut() {
        if !flip_first_leaf(&mut last.output) {
            last.output = Value::Bool(true);
        }
        last.digest = digest(&last.output)?;
    }
    Ok(Trace::from_records(records))
}

fn flip_first_leaf(value: &mut Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => {
            *flag = !*flag;
            true
        }
        Value::Number(number) => {
            *value = flip_number(number);
            true
        }
        Value::String(text) => {
            match text.pop() {
                Some(c) if c.is_ascii() => text.push(char::from(c as u8 ^ 0x01)),
                Some(c) => {
                    text.push(c);
                    text.push('!');
                }
                None => text.push('!'),
            }
            true
        }
        Value::Array(items) => items.iter_mut().any(flip_first_leaf),
        Value::Object(map) => map.values_mut().any(flip_first_leaf),
    }
}

fn flip_number(number: &Number) -> Value {
    if let Some(n) = number.as_u64() {
        Value::from(n ^ 1)
    } else if let Some(n) = number.as_i64() {
        Value::from(n ^ 1)
    } else {
        let flipped = f64::from_bits(number.as_f64().unwrap_or_default().to_bits() ^ 1);
        Value::from(if flipped.is_finite() { flipped } else { 0.0 })
    }
}
