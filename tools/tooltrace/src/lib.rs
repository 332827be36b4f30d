pub mod agent;
pub mod config;
pub mod errors;
pub mod hashing;
pub mod ledger;
pub mod logging;
pub mod manifest;
pub mod orchestrator;
pub mod persist;
pub mod runtime;
pub mod tools;
pub mod verify;

use agent::OrderSummaryAgent;
use clap::{error::ErrorKind, CommandFactory, Parser};
use config::{load_config, CliOverrides};
use errors::TooltraceError;
use logging::{JsonlLogger, RunLog};
use orchestrator::{compare_trace_files, run_replay_check, RunOptions};
use runtime::ProductionRuntime;
use std::path::PathBuf;
use tools::MockTools;

/// Exit code when the replay check ran to completion but found a mismatch.
pub const EXIT_REPLAY_MISMATCH: i32 = 2;

#[derive(Debug, Clone, Parser)]
#[command(name = "tooltrace")]
#[command(about = "Record a scripted agent twice and attest that its tool calls replay identically")]
pub struct Cli {
    #[arg(long)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub out_dir: Option<PathBuf>,
    #[arg(long)]
    pub customer_id: Option<u64>,
    #[arg(long)]
    pub log_file: Option<PathBuf>,
    /// Alter one byte of the second run's recorded output before comparing.
    #[arg(long, default_value_t = false)]
    pub tamper: bool,
    /// Compare two persisted trace files instead of running the workload.
    #[arg(long, num_args = 2, value_names = ["TRACE_A", "TRACE_B"])]
    pub compare: Option<Vec<PathBuf>>,
}

pub fn run() -> Result<i32, TooltraceError> {
    let args = std::env::args_os().collect::<Vec<_>>();
    let cwd = std::env::current_dir().map_err(|e| TooltraceError::Io(e.to_string()))?;
    let runtime = ProductionRuntime::new();
    run_with_runtime(&args, &cwd, &runtime)
}

pub fn run_with_runtime(
    args: &[std::ffi::OsString],
    cwd: &std::path::Path,
    runtime: &ProductionRuntime,
) -> Result<i32, TooltraceError> {
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) => match error.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                print!("{error}");
                return Ok(0);
            }
            _ => return Err(TooltraceError::Cli(error.to_string())),
        },
    };

    let overrides = CliOverrides {
        config_path: cli.config.clone(),
        out_dir: cli.out_dir.clone(),
        customer_id: cli.customer_id,
        log_path: cli.log_file.clone(),
    };
    let (cfg, paths) = load_config(&overrides, cwd, runtime.file_system.as_ref())?;

    let log = match &paths.log {
        Some(path) => {
            let mut logger = JsonlLogger::new(path);
            logger.max_payload_bytes = cfg.logging.max_payload_bytes;
            RunLog::to_file(logger)
        }
        None => RunLog::disabled(),
    };

    if let Some(pair) = &cli.compare {
        let [a, b] = pair.as_slice() else {
            return Err(TooltraceError::Cli(
                "--compare takes exactly two trace files".to_string(),
            ));
        };
        let report = compare_trace_files(runtime, &cwd.join(a), &cwd.join(b), &log)?;
        return Ok(exit_code(report.ok));
    }

    let workload = OrderSummaryAgent::new(cfg.workload.customer_id);
    let outcome = run_replay_check(
        runtime,
        &paths,
        &workload,
        MockTools::default,
        RunOptions { tamper: cli.tamper },
        &log,
    )?;
    Ok(exit_code(outcome.report.ok))
}

fn exit_code(replay_ok: bool) -> i32 {
    if replay_ok {
        0
    } else {
        EXIT_REPLAY_MISMATCH
    }
}

pub fn render_help() -> Result<String, TooltraceError> {
    let mut cmd = Cli::command();
    let mut buffer = Vec::new();
    cmd.write_long_help(&mut buffer)
        .map_err(|e| TooltraceError::Io(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TooltraceError::Io(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::{render_help, run_with_runtime, EXIT_REPLAY_MISMATCH};
    use crate::errors::TooltraceError;
    use crate::runtime::{FakeClock, FakeFileSystem, FakeTerminal, ProductionRuntime};
    use std::ffi::OsString;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    fn args(list: &[&str]) -> Vec<OsString> {
        std::iter::once("tooltrace")
            .chain(list.iter().copied())
            .map(OsString::from)
            .collect()
    }

    fn fake_runtime(fs: FakeFileSystem, terminal: FakeTerminal) -> ProductionRuntime {
        ProductionRuntime {
            clock: Arc::new(FakeClock::default()),
            file_system: Arc::new(fs),
            terminal: Arc::new(terminal),
        }
    }

    #[test]
    fn default_run_passes_and_writes_artifacts() {
        let fs = FakeFileSystem::default();
        let terminal = FakeTerminal::default();
        let runtime = fake_runtime(fs.clone(), terminal.clone());
        let code = run_with_runtime(&args(&["--out-dir", "out"]), Path::new("/w"), &runtime)
            .expect("run");
        assert_eq!(code, 0);
        assert_eq!(
            fs.paths(),
            vec![
                PathBuf::from("/w/out/evidence_manifest.json"),
                PathBuf::from("/w/out/trace_run1.json"),
                PathBuf::from("/w/out/trace_run2.json"),
            ]
        );
        assert_eq!(terminal.written_lines()[0], "replay: true");
    }

    #[test]
    fn tamper_flag_reports_mismatch_exit_code() {
        let runtime = fake_runtime(FakeFileSystem::default(), FakeTerminal::default());
        let code = run_with_runtime(&args(&["--tamper"]), Path::new("/w"), &runtime)
            .expect("run");
        assert_eq!(code, EXIT_REPLAY_MISMATCH);
    }

    #[test]
    fn config_file_is_honored() {
        let fs = FakeFileSystem::with_file(
            "/w/cfg.toml",
            "[workload]\ncustomer_id = 5\n[output]\nmanifest_file = \"m.json\"\n",
        );
        let terminal = FakeTerminal::default();
        let runtime = fake_runtime(fs.clone(), terminal.clone());
        let code = run_with_runtime(
            &args(&["--config", "/w/cfg.toml"]),
            Path::new("/w"),
            &runtime,
        )
        .expect("run");
        assert_eq!(code, 0);
        assert!(fs.paths().contains(&PathBuf::from("/w/m.json")));
        assert_eq!(terminal.written_lines()[1], "manifest: /w/m.json");
    }

    #[test]
    fn unknown_flag_is_a_cli_error() {
        let runtime = fake_runtime(FakeFileSystem::default(), FakeTerminal::default());
        let err = run_with_runtime(&args(&["--bogus"]), Path::new("/w"), &runtime)
            .expect_err("unknown flag");
        assert!(matches!(err, TooltraceError::Cli(_)));
    }

    #[test]
    fn help_mentions_every_flag() {
        let help = render_help().expect("help");
        for flag in ["--config", "--out-dir", "--customer-id", "--tamper", "--compare"] {
            assert!(help.contains(flag), "{flag} missing from help");
        }
    }
}
