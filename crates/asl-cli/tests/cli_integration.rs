use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn temp_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("asl-cli-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// An `asl` command isolated from the user's config and environment.
fn asl(home: &PathBuf) -> Command {
    let mut cmd = Command::cargo_bin("asl").unwrap();
    cmd.env("ASL_HOME", home)
        .env_remove("ASL_STATE")
        .env_remove("ASL_TIMEOUT")
        .env_remove("ASL_LOG")
        .env_remove("RUST_LOG");
    cmd
}

fn stdout_json(output: &std::process::Output) -> serde_json::Value {
    let stdout = String::from_utf8(output.stdout.clone()).unwrap();
    serde_json::from_str(stdout.trim()).unwrap()
}

// ---------------------------------------------------------------------------
// General
// ---------------------------------------------------------------------------

#[test]
fn test_help_exits_zero() {
    asl(&temp_dir())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("asl"));
}

#[test]
fn test_unknown_subcommand_fails() {
    asl(&temp_dir()).arg("explode").assert().failure();
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

#[test]
fn test_run_prints_output_table() {
    let assert = asl(&temp_dir())
        .args(["run", fixture_path("arithmetic.asl").to_str().unwrap()])
        .assert()
        .success();

    let json = stdout_json(assert.get_output());
    assert_eq!(json["total"].as_f64(), Some(21.0));
    assert_eq!(json["ratio"].as_f64(), Some(2.5));
    assert_eq!(json["over"], serde_json::Value::Bool(true));
    // Variables never reach the output table.
    assert!(json.get("base").is_none());
}

#[test]
fn test_run_reads_stdin() {
    let assert = asl(&temp_dir())
        .arg("run")
        .write_stdin("a: 2 * (3 + 4)\nb: \"x\"")
        .assert()
        .success();

    let json = stdout_json(assert.get_output());
    assert_eq!(json["a"].as_f64(), Some(14.0));
    assert_eq!(json["b"], serde_json::Value::String("x".into()));
}

#[test]
fn test_run_pretty_output() {
    asl(&temp_dir())
        .args(["run", "--pretty"])
        .write_stdin("a: 1\nb: 2")
        .assert()
        .success()
        .stdout(predicate::str::contains("\n  \"a\""));
}

#[test]
fn test_run_with_arguments() {
    let assert = asl(&temp_dir())
        .args([
            "run",
            fixture_path("arguments.asl").to_str().unwrap(),
            "--arg",
            "host=web-01",
            "--arg",
            "limit=21",
        ])
        .assert()
        .success();

    let json = stdout_json(assert.get_output());
    assert_eq!(json["host"], serde_json::Value::String("web-01".into()));
    assert_eq!(json["doubled"].as_f64(), Some(42.0));
}

#[test]
fn test_run_missing_argument_is_runtime_error() {
    asl(&temp_dir())
        .args(["run", fixture_path("arguments.asl").to_str().unwrap()])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Unknown script argument `host`"));
}

#[test]
fn test_run_rejects_malformed_argument() {
    asl(&temp_dir())
        .args(["run", fixture_path("arguments.asl").to_str().unwrap(), "--arg", "host"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("KEY=VALUE"));
}

#[test]
fn test_run_syntax_error_exit_code() {
    asl(&temp_dir())
        .args(["run", fixture_path("syntax_error.asl").to_str().unwrap()])
        .assert()
        .code(2)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Parse error"));
}

#[test]
fn test_run_runtime_error_exit_code() {
    asl(&temp_dir())
        .args(["run", fixture_path("runtime_error.asl").to_str().unwrap()])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Runtime error: Divide by zero"));
}

#[test]
fn test_run_missing_file_exit_code() {
    asl(&temp_dir())
        .args(["run", "/nonexistent/script.asl"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("I/O error"));
}

#[test]
fn test_run_timeout_exit_code() {
    asl(&temp_dir())
        .args(["run", fixture_path("spin.asl").to_str().unwrap(), "--timeout", "1"])
        .assert()
        .code(5)
        .stderr(predicate::str::contains("timed out after 1s"));
}

#[test]
fn test_timeout_from_environment() {
    asl(&temp_dir())
        .args(["run", fixture_path("spin.asl").to_str().unwrap()])
        .env("ASL_TIMEOUT", "1")
        .assert()
        .code(5);
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[test]
fn test_state_persists_between_runs() {
    let home = temp_dir();
    let state = home.join("state.json");
    let script = fixture_path("counter.asl");

    for expected in [1.0, 2.0] {
        let assert = asl(&home)
            .args(["run", script.to_str().unwrap(), "--state", state.to_str().unwrap()])
            .assert()
            .success();
        let json = stdout_json(assert.get_output());
        assert_eq!(json["runs"].as_f64(), Some(expected));
    }

    let saved: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&state).unwrap()).unwrap();
    assert_eq!(saved["counters"]["runs"], serde_json::json!(2));
    assert_eq!(saved["series"]["history"].as_array().unwrap().len(), 2);
}

#[test]
fn test_state_from_environment() {
    let home = temp_dir();
    let state = home.join("env-state.json");
    asl(&home)
        .args(["run", fixture_path("counter.asl").to_str().unwrap()])
        .env("ASL_STATE", &state)
        .assert()
        .success();
    assert!(state.exists());
}

#[test]
fn test_state_kept_after_runtime_error() {
    let home = temp_dir();
    let state = home.join("state.json");
    asl(&home)
        .args(["run", "--state", state.to_str().unwrap()])
        .write_stdin("counter(\"c\").increment(4)\nerror(\"stop\")")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("stop"));

    let saved: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&state).unwrap()).unwrap();
    assert_eq!(saved["counters"]["c"], serde_json::json!(4));
}

#[test]
fn test_corrupt_state_file_exit_code() {
    let home = temp_dir();
    let state = home.join("state.json");
    std::fs::write(&state, "not json").unwrap();
    asl(&home)
        .args(["run", "--state", state.to_str().unwrap()])
        .write_stdin("a: 1")
        .assert()
        .code(4)
        .stderr(predicate::str::contains("Invalid state file"));
}

#[test]
fn test_every_with_times_repeats() {
    let home = temp_dir();
    let state = home.join("state.json");
    let assert = asl(&home)
        .args([
            "run",
            fixture_path("counter.asl").to_str().unwrap(),
            "--state",
            state.to_str().unwrap(),
            "--every",
            "10ms",
            "--times",
            "3",
        ])
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let runs: Vec<f64> = stdout
        .lines()
        .map(|line| serde_json::from_str::<serde_json::Value>(line).unwrap()["runs"].as_f64().unwrap())
        .collect();
    assert_eq!(runs, vec![1.0, 2.0, 3.0]);
}

// ---------------------------------------------------------------------------
// check / tokens
// ---------------------------------------------------------------------------

#[test]
fn test_check_valid_script() {
    asl(&temp_dir())
        .args(["check", fixture_path("arithmetic.asl").to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("OK: 4 commands"));
}

#[test]
fn test_check_reports_every_syntax_error() {
    let assert = asl(&temp_dir())
        .args(["check", fixture_path("syntax_error.asl").to_str().unwrap()])
        .assert()
        .code(2);

    let stderr = String::from_utf8(assert.get_output().stderr.clone()).unwrap();
    assert_eq!(stderr.matches("Parse error").count(), 2);
}

#[test]
fn test_tokens_dump() {
    asl(&temp_dir())
        .arg("tokens")
        .write_stdin("$a: \"hi\" >= 2")
        .assert()
        .success()
        .stdout(predicate::str::contains("Variable"))
        .stdout(predicate::str::contains("GreaterEqual"))
        .stdout(predicate::str::contains("\"hi\""))
        .stdout(predicate::str::contains("Eof"));
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

#[test]
fn test_config_set_state_is_used_by_run() {
    let home = temp_dir();
    let state = home.join("configured.json");

    asl(&home)
        .args(["config", "set-state", state.to_str().unwrap()])
        .assert()
        .success();
    assert!(home.join("config.json").exists());

    asl(&home)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("configured.json"));

    asl(&home)
        .args(["run", fixture_path("counter.asl").to_str().unwrap()])
        .assert()
        .success();
    assert!(state.exists());
}

#[test]
fn test_log_file_option() {
    let home = temp_dir();
    let log = home.join("logs").join("asl.log");
    asl(&home)
        .args(["--log-level", "debug", "--log-file", log.to_str().unwrap(), "run"])
        .write_stdin("log(\"from script\")")
        .assert()
        .success();

    let contents = std::fs::read_to_string(&log).unwrap();
    assert!(contents.contains("from script"));
}

#[test]
fn test_unwritable_log_directory_falls_back_to_stderr() {
    let home = temp_dir();
    let blocker = home.join("blocker");
    std::fs::write(&blocker, "").unwrap();
    let log = blocker.join("logs").join("asl.log");

    let assert = asl(&home)
        .args(["--log-file", log.to_str().unwrap(), "run"])
        .write_stdin("a: 1")
        .assert()
        .success()
        .stderr(predicate::str::contains("cannot create log directory"));
    assert_eq!(stdout_json(assert.get_output())["a"].as_f64(), Some(1.0));
}

#[test]
fn test_every_rejects_oversized_interval() {
    asl(&temp_dir())
        .args(["run", fixture_path("arithmetic.asl").to_str().unwrap(), "--every", "1e30"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid interval"));
}
