use assert_cmd::cargo::cargo_bin_cmd;
use serde_json::Value;

fn fixture(path: &str) -> String {
    format!("{}/tests/fixtures/{path}", env!("CARGO_MANIFEST_DIR"))
}

fn read_json(path: &std::path::Path) -> Value {
    let text = std::fs::read_to_string(path).expect("read json file");
    serde_json::from_str(&text).expect("parse json file")
}

#[test]
fn help_lists_flags() {
    let mut cmd = cargo_bin_cmd!("tooltrace");
    cmd.arg("--help");
    let out = cmd.assert().success();
    let stdout = String::from_utf8(out.get_output().stdout.clone()).expect("utf8");

    assert!(stdout.contains("--tamper"));
    assert!(stdout.contains("--compare"));
    assert!(stdout.contains("--out-dir"));
}

#[test]
fn default_run_writes_traces_and_passing_manifest() {
    let temp = tempfile::tempdir().expect("tempdir");
    let mut cmd = cargo_bin_cmd!("tooltrace");
    cmd.current_dir(temp.path());
    let out = cmd.assert().success();
    let stdout = String::from_utf8(out.get_output().stdout.clone()).expect("utf8");
    assert!(stdout.contains("replay: true"));
    assert!(stdout.contains("manifest: "));
    assert!(stdout.contains("evidence_manifest.json"));

    let manifest = read_json(&temp.path().join("evidence_manifest.json"));
    assert_eq!(manifest["manifest_version"], "1.0");
    assert_eq!(manifest["overall"], "pass");
    assert_eq!(manifest["verifiers"][0]["predicate"], "pass");
    assert_eq!(manifest["verifiers"][0]["evidence"]["steps"], 2);
    assert_eq!(manifest["verifiers"][0]["evidence"]["replay"], true);
    assert!(manifest["timestamp"]
        .as_str()
        .expect("timestamp string")
        .ends_with('Z'));

    let run1 = read_json(&temp.path().join("trace_run1.json"));
    let run2 = read_json(&temp.path().join("trace_run2.json"));
    assert_eq!(run1, run2);
    assert_eq!(run1[0]["tool"], "GET:orders");
    assert_eq!(run1[1]["tool"], "WRITE:report");
    assert_eq!(run1[1]["input"]["text"], "Customer 123 total amount: 200");
}

#[test]
fn tamper_run_exits_with_mismatch_code_and_failing_manifest() {
    let temp = tempfile::tempdir().expect("tempdir");
    let mut cmd = cargo_bin_cmd!("tooltrace");
    cmd.current_dir(temp.path()).arg("--tamper");
    let out = cmd.assert().code(2);
    let stdout = String::from_utf8(out.get_output().stdout.clone()).expect("utf8");
    assert!(stdout.contains("replay: false"));
    assert!(stdout.contains("replay mismatch: step 1 differs in output"));

    let manifest = read_json(&temp.path().join("evidence_manifest.json"));
    assert_eq!(manifest["overall"], "fail");
    assert_eq!(manifest["verifiers"][0]["evidence"]["replay"], false);
}

#[test]
fn config_fixture_controls_output_layout() {
    let temp = tempfile::tempdir().expect("tempdir");
    let mut cmd = cargo_bin_cmd!("tooltrace");
    cmd.current_dir(temp.path())
        .arg("--config")
        .arg(fixture("configs/minimal.toml"))
        .arg("--log-file")
        .arg("logs/run.jsonl");
    cmd.assert().success();

    let artifacts = temp.path().join("artifacts");
    assert!(artifacts.join("run_a.json").is_file());
    assert!(artifacts.join("run_b.json").is_file());
    assert!(artifacts.join("manifest.json").is_file());

    let log = std::fs::read_to_string(temp.path().join("logs/run.jsonl")).expect("read log");
    assert!(log.contains("\"event_type\":\"tool_call\""));
    assert!(log.contains("\"event_type\":\"manifest_written\""));
}

#[test]
fn compare_mode_checks_persisted_traces() {
    let temp = tempfile::tempdir().expect("tempdir");
    cargo_bin_cmd!("tooltrace")
        .current_dir(temp.path())
        .arg("--tamper")
        .assert()
        .code(2);

    cargo_bin_cmd!("tooltrace")
        .current_dir(temp.path())
        .args(["--compare", "trace_run1.json", "trace_run1.json"])
        .assert()
        .success();

    cargo_bin_cmd!("tooltrace")
        .current_dir(temp.path())
        .args(["--compare", "trace_run1.json", "trace_run2.json"])
        .assert()
        .code(2);
}

#[test]
fn colliding_config_exits_nonzero() {
    let mut cmd = cargo_bin_cmd!("tooltrace");
    cmd.arg("--config").arg(fixture("configs/colliding.toml"));
    let out = cmd.assert().code(1);
    let stderr = String::from_utf8(out.get_output().stderr.clone()).expect("utf8");
    assert!(stderr.contains("invalid config"));
}

#[test]
fn missing_config_path_exits_nonzero() {
    let mut cmd = cargo_bin_cmd!("tooltrace");
    cmd.arg("--config").arg(fixture("configs/missing.toml"));
    cmd.assert().code(1);
}
