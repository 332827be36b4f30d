use crate::errors::TooltraceError;
use crate::hashing::digest;
use crate::ledger::Trace;
use crate::manifest::EvidenceManifest;
use crate::runtime::FileSystem;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};

pub fn write_trace(
    fs: &dyn FileSystem,
    path: &Path,
    trace: &Trace,
) -> Result<(), TooltraceError> {
    write_json_atomic(fs, path, trace)
}

/// Load a persisted trace, rejecting any record whose digest no longer
/// matches its output.
pub fn read_trace(fs: &dyn FileSystem, path: &Path) -> Result<Trace, TooltraceError> {
    let trace: Trace = read_json(fs, path)?;
    for (step, record) in trace.iter().enumerate() {
        if digest(&record.output)? != record.digest {
            return Err(TooltraceError::Persistence(format!(
                "{}: step {step} digest does not match output",
                path.display()
            )));
        }
    }
    Ok(trace)
}

pub fn write_manifest(
    fs: &dyn FileSystem,
    path: &Path,
    manifest: &EvidenceManifest,
) -> Result<(), TooltraceError> {
    write_json_atomic(fs, path, manifest)
}

pub fn read_manifest(
    fs: &dyn FileSystem,
    path: &Path,
) -> Result<EvidenceManifest, TooltraceError> {
    read_json(fs, path)
}

/// Pretty JSON written to a `.tmp` sibling and renamed over `path`, so a
/// failed write never leaves a truncated document behind.
pub fn write_json_atomic<T: Serialize + ?Sized>(
    fs: &dyn FileSystem,
    path: &Path,
    value: &T,
) -> Result<(), TooltraceError> {
    let mut text = serde_json::to_string_pretty(value)
        .map_err(|e| TooltraceError::Serialization(e.to_string()))?;
    text.push('\n');

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs.create_dir_all(parent)
                .map_err(|e| persistence_error(path, e))?;
        }
    }

    let tmp = temp_sibling(path)?;
    if let Err(err) = fs.write_string(&tmp, &text) {
        let _ = fs.remove_file(&tmp);
        return Err(persistence_error(path, err));
    }
    if let Err(err) = fs.rename(&tmp, path) {
        let _ = fs.remove_file(&tmp);
        return Err(persistence_error(path, err));
    }
    Ok(())
}

fn read_json<T: DeserializeOwned>(fs: &dyn FileSystem, path: &Path) -> Result<T, TooltraceError> {
    let text = fs
        .read_to_string(path)
        .map_err(|e| persistence_error(path, e))?;
    serde_json::from_str(&text).map_err(|e| {
        TooltraceError::Persistence(format!("{}: invalid json: {e}", path.display()))
    })
}

fn temp_sibling(path: &Path) -> Result<PathBuf, TooltraceError> {
    let mut name = path
        .file_name()
        .ok_or_else(|| {
            TooltraceError::Persistence(format!(
                "{}: destination has no file name",
                path.display()
            ))
        })?
        .to_os_string();
    name.push(".tmp");
    Ok(path.with_file_name(name))
}

fn persistence_error(path: &Path, err: TooltraceError) -> TooltraceError {
    TooltraceError::Persistence(format!("{}: {err}", path.display()))
}
