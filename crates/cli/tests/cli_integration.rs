//! CLI integration tests for all subcommands except `serve`.
//!
//! Uses `assert_cmd` to spawn the `statescope` binary and verify
//! exit codes, stdout content, and stderr content. Every test runs inside
//! its own temp directory so no stray `statescope.toml` is picked up.

mod common;

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn statescope(cwd: &Path) -> Command {
    let mut cmd = cargo_bin_cmd!("statescope");
    cmd.current_dir(cwd);
    cmd.env_remove("RUST_LOG");
    cmd.env_remove("STATESCOPE_API_KEY");
    cmd.env_remove("STATESCOPE_RATE_LIMIT");
    cmd
}

fn seeded() -> TempDir {
    let dir = TempDir::new().unwrap();
    common::seed_histories(dir.path());
    dir
}

fn stdout_json(output: &std::process::Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("stdout is JSON")
}

// ──────────────────────────────────────────────
// 1. Help and version
// ──────────────────────────────────────────────

#[test]
fn help_lists_subcommands() {
    let tmp = TempDir::new().unwrap();
    statescope(tmp.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Reconstruct and browse iWF execution histories"))
        .stdout(predicate::str::contains("replay"))
        .stdout(predicate::str::contains("serve"));
}

#[test]
fn version_exits_0() {
    let tmp = TempDir::new().unwrap();
    statescope(tmp.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("statescope"));
}

// ──────────────────────────────────────────────
// 2. replay
// ──────────────────────────────────────────────

#[test]
fn replay_bare_log_as_json() {
    let tmp = TempDir::new().unwrap();
    let log_path = tmp.path().join("log.json");
    fs::write(&log_path, serde_json::to_string(&common::order_log()).unwrap()).unwrap();

    let output = statescope(tmp.path())
        .args(["replay", "log.json", "--output", "json"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{:?}", output);

    let json = stdout_json(&output);
    let events = json["historyEvents"].as_array().unwrap();
    let kinds: Vec<&str> = events
        .iter()
        .map(|e| e["eventType"].as_str().unwrap())
        .collect();
    assert_eq!(
        kinds,
        ["ExecutionStarted", "WaitUntil", "Execute", "Execute", "SignalReceived"]
    );
    assert_eq!(events[1]["fromEventId"], -1);
    assert_eq!(events[2]["fromEventId"], 1);
    assert_eq!(events[3]["stateId"], "charge");
    assert_eq!(events[3]["fromEventId"], 2);
    assert_eq!(json["pendingStates"][0]["stateId"], "notify");
    assert_eq!(json["pendingStates"][0]["fromEventIds"][0], 2);
}

#[test]
fn replay_exported_record_as_text() {
    let tmp = seeded();
    statescope(tmp.path())
        .args(["replay", "order-1.run-a.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("History (5 events):"))
        .stdout(predicate::str::contains("-> charge, notify"))
        .stdout(predicate::str::contains("notify <- [2]"));
}

#[test]
fn replay_with_explicit_initial_input() {
    let tmp = TempDir::new().unwrap();
    // No ExecutionStarted event: the start state comes from --input.
    let mut log = common::Log::new();
    log.wait_until("init", "init-1");
    fs::write(
        tmp.path().join("log.json"),
        serde_json::to_string(&log.events()).unwrap(),
    )
    .unwrap();
    fs::write(
        tmp.path().join("input.json"),
        common::order_input().to_string(),
    )
    .unwrap();

    let output = statescope(tmp.path())
        .args(["replay", "log.json", "--input", "input.json", "--output", "json"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{:?}", output);
    let json = stdout_json(&output);
    assert_eq!(json["historyEvents"][0]["eventType"], "WaitUntil");
    assert_eq!(json["historyEvents"][0]["fromEventId"], -1);
}

fn replay_with_input(input: serde_json::Value) -> std::process::Output {
    let tmp = TempDir::new().unwrap();
    let mut log = common::Log::new();
    log.wait_until("", "blank-1");
    fs::write(
        tmp.path().join("log.json"),
        serde_json::to_string(&log.events()).unwrap(),
    )
    .unwrap();
    fs::write(tmp.path().join("input.json"), input.to_string()).unwrap();

    statescope(tmp.path())
        .args(["replay", "log.json", "--input", "input.json", "--output", "json"])
        .output()
        .unwrap()
}

#[test]
fn replay_input_with_empty_start_state_is_unsupported() {
    let output = replay_with_input(serde_json::json!({
        "iwfWorkflowType": "OrderWorkflow",
        "startStateId": ""
    }));
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    let err: serde_json::Value = serde_json::from_slice(&output.stderr).unwrap();
    assert_eq!(err["kind"], "UnsupportedExecution");
    assert!(err["error"].as_str().unwrap().contains("startStateId"));
}

#[test]
fn replay_input_without_start_state_is_unsupported() {
    let output = replay_with_input(serde_json::json!({ "iwfWorkflowType": "OrderWorkflow" }));
    assert_eq!(output.status.code(), Some(1));
    let err: serde_json::Value = serde_json::from_slice(&output.stderr).unwrap();
    assert_eq!(err["kind"], "UnsupportedExecution");
}

#[test]
fn replay_input_that_is_not_json_is_invalid() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("log.json"), "[]").unwrap();
    fs::write(tmp.path().join("input.json"), "{ nope").unwrap();

    let output = statescope(tmp.path())
        .args(["replay", "log.json", "--input", "input.json", "--output", "json"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let err: serde_json::Value = serde_json::from_slice(&output.stderr).unwrap();
    assert_eq!(err["kind"], "InvalidInput");
}

#[test]
fn replay_malformed_log_fails() {
    let tmp = seeded();
    statescope(tmp.path())
        .args(["replay", "broken-1.run-a.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("malformed history at event 2"))
        .stderr(predicate::str::contains("unknown schedule id 42"));
}

#[test]
fn replay_foreign_log_reports_kind_in_json() {
    let tmp = seeded();
    let output = statescope(tmp.path())
        .args(["replay", "cron-1.run-a.json", "--output", "json"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let err: serde_json::Value = serde_json::from_slice(&output.stderr).unwrap();
    assert_eq!(err["kind"], "UnsupportedExecution");
}

#[test]
fn replay_missing_file_fails() {
    let tmp = TempDir::new().unwrap();
    statescope(tmp.path())
        .args(["replay", "nope.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("could not read 'nope.json'"));
}

// ──────────────────────────────────────────────
// 3. show / list
// ──────────────────────────────────────────────

#[test]
fn show_renders_view() {
    let tmp = seeded();
    statescope(tmp.path())
        .args(["show", "order-1", "--history-dir", "."])
        .assert()
        .success()
        .stdout(predicate::str::contains("Execution order-1 (run run-a)"))
        .stdout(predicate::str::contains("Workflow: OrderWorkflow"))
        .stdout(predicate::str::contains("Status:   RUNNING"));
}

#[test]
fn show_json_carries_view_fields() {
    let tmp = seeded();
    let output = statescope(tmp.path())
        .args(["show", "order-1", "--run-id", "run-a", "--history-dir", "."])
        .args(["--output", "json"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{:?}", output);
    let json = stdout_json(&output);
    assert_eq!(json["executionId"], "order-1");
    assert_eq!(json["workflowType"], "OrderWorkflow");
    assert_eq!(json["workflowStartedTimestamp"], common::T0.unix_timestamp());
    assert_eq!(json["historyEvents"].as_array().unwrap().len(), 5);
}

#[test]
fn show_unknown_execution_fails() {
    let tmp = seeded();
    statescope(tmp.path())
        .args(["show", "missing", "--history-dir", "."])
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing"));
}

#[test]
fn show_unknown_status_fails() {
    let tmp = TempDir::new().unwrap();
    common::write_record(tmp.path(), "odd-1", "run-a", "99", 0, common::order_log());
    statescope(tmp.path())
        .args(["show", "odd-1", "--history-dir", "."])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown execution status '99'"));
}

#[test]
fn history_dir_comes_from_config_file() {
    let tmp = TempDir::new().unwrap();
    let histories = tmp.path().join("exports");
    fs::create_dir(&histories).unwrap();
    common::seed_histories(&histories);
    fs::write(
        tmp.path().join("statescope.toml"),
        "[history]\ndir = \"exports\"\n",
    )
    .unwrap();

    statescope(tmp.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("order-1"))
        .stdout(predicate::str::contains("cron-1"));
}

#[test]
fn list_json_is_latest_first() {
    let tmp = seeded();
    let output = statescope(tmp.path())
        .args(["list", "--history-dir", ".", "--output", "json"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{:?}", output);
    let rows = stdout_json(&output)["executions"].clone();
    let ids: Vec<&str> = rows
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["executionId"].as_str().unwrap())
        .collect();
    assert_eq!(ids, ["cron-1", "broken-1", "order-1"]);
    assert_eq!(rows[1]["status"], "FAILED");
}

#[test]
fn list_empty_directory() {
    let tmp = TempDir::new().unwrap();
    statescope(tmp.path())
        .args(["list", "--history-dir", "."])
        .assert()
        .success()
        .stdout(predicate::str::contains("No executions found."));
}

#[test]
fn bad_config_file_fails() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("custom.toml"), "[server]\nport = \"x\"\n").unwrap();
    statescope(tmp.path())
        .args(["--config", "custom.toml", "status", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("could not parse 'custom.toml'"));
}

// ──────────────────────────────────────────────
// 4. status
// ──────────────────────────────────────────────

#[test]
fn status_maps_numeric_and_prefixed_codes() {
    let tmp = TempDir::new().unwrap();
    statescope(tmp.path())
        .args(["status", "7"])
        .assert()
        .success()
        .stdout("TIMEOUT\n");
    statescope(tmp.path())
        .args(["status", "WORKFLOW_EXECUTION_STATUS_TIMED_OUT"])
        .assert()
        .success()
        .stdout("TIMEOUT\n");
}

#[test]
fn status_json_output() {
    let tmp = TempDir::new().unwrap();
    let output = statescope(tmp.path())
        .args(["status", "ContinuedAsNew", "--output", "json"])
        .output()
        .unwrap();
    let json = stdout_json(&output);
    assert_eq!(json["status"], "CONTINUED_AS_NEW");
    assert_eq!(json["closed"], true);
}

#[test]
fn status_unknown_code_fails() {
    let tmp = TempDir::new().unwrap();
    statescope(tmp.path())
        .args(["status", "99"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown execution status '99'"));
}
