use crate::errors::TooltraceError;
use crate::logging::DEFAULT_MAX_PAYLOAD_BYTES;
use crate::runtime::FileSystem;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub config_path: Option<PathBuf>,
    pub out_dir: Option<PathBuf>,
    pub customer_id: Option<u64>,
    pub log_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    pub workload: WorkloadConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkloadConfig {
    pub customer_id: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub trace_files: [String; 2],
    pub manifest_file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    pub path: Option<PathBuf>,
    pub max_payload_bytes: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workload: WorkloadConfig { customer_id: 123 },
            output: OutputConfig {
                dir: PathBuf::from("."),
                trace_files: [
                    "trace_run1.json".to_string(),
                    "trace_run2.json".to_string(),
                ],
                manifest_file: "evidence_manifest.json".to_string(),
            },
            logging: LoggingConfig {
                path: None,
                max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct PartialAppConfig {
    workload: Option<PartialWorkloadConfig>,
    output: Option<PartialOutputConfig>,
    logging: Option<PartialLoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct PartialWorkloadConfig {
    customer_id: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct PartialOutputConfig {
    dir: Option<PathBuf>,
    trace_files: Option<[String; 2]>,
    manifest_file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct PartialLoggingConfig {
    path: Option<PathBuf>,
    max_payload_bytes: Option<usize>,
}

/// Absolute locations of every file a run touches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPaths {
    pub traces: [PathBuf; 2],
    pub manifest: PathBuf,
    pub log: Option<PathBuf>,
}

pub fn load_config(
    overrides: &CliOverrides,
    process_cwd: &Path,
    fs: &dyn FileSystem,
) -> Result<(AppConfig, RunPaths), TooltraceError> {
    let mut cfg = AppConfig::default();

    if let Some(path) = &overrides.config_path {
        let file_contents = fs.read_to_string(path)?;
        let partial: PartialAppConfig = toml::from_str(&file_contents)
            .map_err(|e| TooltraceError::ConfigParse(e.to_string()))?;
        merge_partial_config(&mut cfg, partial);
    }

    apply_cli_overrides(&mut cfg, overrides);
    validate_config(&cfg)?;

    let paths = resolve_paths(process_cwd, &cfg);
    Ok((cfg, paths))
}

fn merge_partial_config(cfg: &mut AppConfig, partial: PartialAppConfig) {
    if let Some(workload) = partial.workload {
        if let Some(customer_id) = workload.customer_id {
            cfg.workload.customer_id = customer_id;
        }
    }

    if let Some(output) = partial.output {
        if let Some(dir) = output.dir {
            cfg.output.dir = dir;
        }
        if let Some(trace_files) = output.trace_files {
            cfg.output.trace_files = trace_files;
        }
        if let Some(manifest_file) = output.manifest_file {
            cfg.output.manifest_file = manifest_file;
        }
    }

    if let Some(logging) = partial.logging {
        if let Some(path) = logging.path {
            cfg.logging.path = Some(path);
        }
        if let Some(value) = logging.max_payload_bytes {
            cfg.logging.max_payload_bytes = value;
        }
    }
}

fn apply_cli_overrides(cfg: &mut AppConfig, overrides: &CliOverrides) {
    if let Some(dir) = &overrides.out_dir {
        cfg.output.dir = dir.clone();
    }
    if let Some(customer_id) = overrides.customer_id {
        cfg.workload.customer_id = customer_id;
    }
    if let Some(path) = &overrides.log_path {
        cfg.logging.path = Some(path.clone());
    }
}

pub fn resolve_paths(process_cwd: &Path, cfg: &AppConfig) -> RunPaths {
    let dir = absolutize_path(process_cwd, &cfg.output.dir);
    RunPaths {
        traces: [
            dir.join(&cfg.output.trace_files[0]),
            dir.join(&cfg.output.trace_files[1]),
        ],
        manifest: dir.join(&cfg.output.manifest_file),
        log: cfg
            .logging
            .path
            .as_ref()
            .map(|path| absolutize_path(process_cwd, path)),
    }
}

fn absolutize_path(base: &Path, value: &Path) -> PathBuf {
    if value.as_os_str().is_empty() || value == Path::new(".") {
        base.to_path_buf()
    } else if value.is_absolute() {
        value.to_path_buf()
    } else {
        base.join(value)
    }
}

fn validate_config(cfg: &AppConfig) -> Result<(), TooltraceError> {
    let names = [
        ("output.trace_files[0]", cfg.output.trace_files[0].as_str()),
        ("output.trace_files[1]", cfg.output.trace_files[1].as_str()),
        ("output.manifest_file", cfg.output.manifest_file.as_str()),
    ];

    for (key, name) in names {
        if name.trim().is_empty() {
            return Err(TooltraceError::InvalidConfig(format!(
                "{key} must not be empty"
            )));
        }
        if name.contains('/') || name.contains('\\') {
            return Err(TooltraceError::InvalidConfig(format!(
                "{key} must be a file name, not a path"
            )));
        }
    }

    for (idx, (key, name)) in names.iter().enumerate() {
        if names[idx + 1..].iter().any(|(_, other)| other == name) {
            return Err(TooltraceError::InvalidConfig(format!(
                "{key} collides with another output file"
            )));
        }
    }

    if cfg.logging.max_payload_bytes == 0 {
        return Err(TooltraceError::InvalidConfig(
            "logging.max_payload_bytes must be greater than zero".to_string(),
        ));
    }

    Ok(())
}
