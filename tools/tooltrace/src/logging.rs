use crate::errors::TooltraceError;
use serde::Serialize;
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 4096;

#[derive(Debug, Clone)]
pub struct JsonlLogger {
    pub path: PathBuf,
    pub max_payload_bytes: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogEvent<'a> {
    pub level: &'a str,
    pub event_type: &'a str,
    pub payload: Value,
}

impl JsonlLogger {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
        }
    }

    pub fn append(&self, event: &LogEvent<'_>) -> Result<(), TooltraceError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| TooltraceError::Io(e.to_string()))?;
        }
        let truncated = truncate_json(event.payload.clone(), self.max_payload_bytes);
        let line = serde_json::to_string(&LogEvent {
            level: event.level,
            event_type: event.event_type,
            payload: truncated,
        })
        .map_err(|e| TooltraceError::Io(e.to_string()))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| TooltraceError::Io(e.to_string()))?;
        file.write_all(line.as_bytes())
            .map_err(|e| TooltraceError::Io(e.to_string()))?;
        file.write_all(b"\n")
            .map_err(|e| TooltraceError::Io(e.to_string()))
    }
}

/// Run log that may be switched off. Every driver event goes through here.
#[derive(Debug, Clone, Default)]
pub struct RunLog {
    logger: Option<JsonlLogger>,
}

impl RunLog {
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn to_file(logger: JsonlLogger) -> Self {
        Self {
            logger: Some(logger),
        }
    }

    pub fn info(&self, event_type: &str, payload: Value) -> Result<(), TooltraceError> {
        self.emit("info", event_type, payload)
    }

    pub fn warn(&self, event_type: &str, payload: Value) -> Result<(), TooltraceError> {
        self.emit("warn", event_type, payload)
    }

    fn emit(&self, level: &str, event_type: &str, payload: Value) -> Result<(), TooltraceError> {
        let Some(logger) = &self.logger else {
            return Ok(());
        };
        logger.append(&LogEvent {
            level,
            event_type,
            payload,
        })
    }
}

fn truncate_json(value: Value, max_bytes: usize) -> Value {
    let rendered = serde_json::to_string(&value).unwrap_or_default();
    if rendered.len() <= max_bytes {
        return value;
    }
    let mut cut = max_bytes.saturating_sub(3);
    while cut > 0 && !rendered.is_char_boundary(cut) {
        cut -= 1;
    }
    Value::String(format!("{}...", &rendered[..cut]))
}

#[cfg(test)]
mod tests {
    use super::{JsonlLogger, LogEvent, RunLog};
    use serde_json::json;

    #[test]
    fn logger_truncates_large_payloads_and_writes_jsonl() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("logs").join("run.jsonl");
        let mut logger = JsonlLogger::new(&path);
        logger.max_payload_bytes = 20;

        logger
            .append(&LogEvent {
                level: "info",
                event_type: "tool_call",
                payload: json!({"text": "abcdefghijklmnopqrstuvwxyz"}),
            })
            .expect("append");

        let text = std::fs::read_to_string(&path).expect("read");
        assert!(text.contains("\"event_type\":\"tool_call\""));
        assert!(text.contains("..."));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("run.jsonl");
        let mut logger = JsonlLogger::new(&path);
        logger.max_payload_bytes = 8;
        logger
            .append(&LogEvent {
                level: "info",
                event_type: "tool_call",
                payload: json!("ééééééé"),
            })
            .expect("append");
        let line = std::fs::read_to_string(&path).expect("read");
        let parsed: serde_json::Value = serde_json::from_str(line.trim()).expect("json line");
        assert!(parsed["payload"]
            .as_str()
            .expect("string payload")
            .ends_with("..."));
    }

    #[test]
    fn run_log_appends_one_line_per_event() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("run.jsonl");
        let log = RunLog::to_file(JsonlLogger::new(&path));
        log.info("run_started", json!({"run": 1})).expect("info");
        log.warn("replay_compared", json!({"ok": false}))
            .expect("warn");

        let text = std::fs::read_to_string(&path).expect("read");
        let lines = text.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].contains("\"level\":\"warn\""));
    }

    #[test]
    fn disabled_run_log_is_a_no_op() {
        RunLog::disabled()
            .info("run_started", json!({}))
            .expect("no-op");
    }
}
