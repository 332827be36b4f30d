//! Canonical JSON rendering and content digests for recorded tool payloads.
//!
//! The canonical form is compact JSON with object keys sorted by byte order at
//! every nesting level, so two values that are structurally equal always render
//! to the same bytes regardless of how their maps were built.

use crate::errors::TooltraceError;
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Convert any serializable payload into the recorded value model.
pub fn to_value<T: Serialize + ?Sized>(value: &T) -> Result<Value, TooltraceError> {
    serde_json::to_value(value).map_err(|e| TooltraceError::Serialization(e.to_string()))
}

pub fn canonical_json<T: Serialize + ?Sized>(value: &T) -> Result<String, TooltraceError> {
    let value = to_value(value)?;
    let mut out = String::new();
    write_canonical(&value, &mut out)?;
    Ok(out)
}

/// SHA-256 of the canonical rendering, as 64 lowercase hex chars.
pub fn digest<T: Serialize + ?Sized>(value: &T) -> Result<String, TooltraceError> {
    let canonical = canonical_json(value)?;
    Ok(hex_bytes(&Sha256::digest(canonical.as_bytes())))
}

fn write_canonical(value: &Value, out: &mut String) -> Result<(), TooltraceError> {
    match value {
        Value::Array(items) => {
            out.push('[');
            for (idx, item) in items.iter().enumerate() {
                if idx > 0 {
                    out.push(',');
                }
                write_canonical(item, out)?;
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut entries = map.iter().collect::<Vec<_>>();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (idx, (key, item)) in entries.into_iter().enumerate() {
                if idx > 0 {
                    out.push(',');
                }
                out.push_str(&render_scalar(key)?);
                out.push(':');
                write_canonical(item, out)?;
            }
            out.push('}');
        }
        scalar => out.push_str(&render_scalar(scalar)?),
    }
    Ok(())
}

fn render_scalar<T: Serialize + ?Sized>(value: &T) -> Result<String, TooltraceError> {
    serde_json::to_string(value).map_err(|e| TooltraceError::Serialization(e.to_string()))
}

pub(crate) fn hex_bytes(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
