//! Restores must reject a bad snapshot before contacting the store.
//!
//! Each test points at a store nobody listens on: reaching the connect step
//! would turn the expected header message into a connection error.

use crate::common::cli::{CliResult, CliRunner};
use crate::common::fixtures::{TestWorkspace, UNREACHABLE_STORE_YAML};

fn restore(ws: &TestWorkspace, snapshot: &str, compact: bool) -> CliResult {
    ws.write("config.yaml", UNREACHABLE_STORE_YAML);
    ws.write("snap.jsonl", snapshot);
    let config = ws.arg("config.yaml");
    let input = ws.arg("snap.jsonl");
    let args: [&str; 4] = ["restore", &config, &input, "--purge"];
    let cli = CliRunner::new();
    if compact { cli.run_compact(&args) } else { cli.run(&args) }
}

#[test]
fn empty_file_reports_missing_header() {
    let ws = TestWorkspace::new();
    restore(&ws, "", false)
        .assert_exit_code(1)
        .assert_stderr_contains("Header not found.")
        .assert_stderr_contains("Aborting restore.");
}

#[test]
fn non_json_header() {
    let ws = TestWorkspace::new();
    restore(&ws, "hello world\n{\"type\":\"string\"}\n", false)
        .assert_exit_code(1)
        .assert_stderr_contains("Header not JSON.");
}

#[test]
fn header_must_be_object() {
    let ws = TestWorkspace::new();
    restore(&ws, "[\"redis\"]\n", false)
        .assert_exit_code(1)
        .assert_stderr_contains("Header not JSON dict.");
}

#[test]
fn header_needs_backup_kind() {
    let ws = TestWorkspace::new();
    restore(&ws, "{\"timestamp\": \"2024-03-15T08:30:00\"}\n", false)
        .assert_exit_code(1)
        .assert_stderr_contains("Header missing backup_type.");
}

#[test]
fn robot_mode_reports_rejection_events() {
    let ws = TestWorkspace::new();
    let result = restore(&ws, "{\"backup_type\": \"riak\"}\n", true);
    result.assert_exit_code(1);
    assert_eq!(result.events(), ["header_rejected", "restore_aborted"]);
    assert_eq!(
        result.json_lines()[0]["reason"],
        "Only redis backup type currently supported."
    );
}

#[test]
fn valid_header_proceeds_to_connect() {
    let ws = TestWorkspace::new();
    ws.write("config.yaml", UNREACHABLE_STORE_YAML);
    ws.write_snapshot("snap.jsonl", &[r#"{"type":"string","key":"k","value":"v","ttl":null}"#]);
    CliRunner::new()
        .run(&["restore", &ws.arg("config.yaml"), &ws.arg("snap.jsonl")])
        .assert_exit_code(1)
        .assert_stderr_contains("Redis error");
}
