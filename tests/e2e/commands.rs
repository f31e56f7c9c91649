//! Argument handling, version and completions.

use assert_cmd::Command;
use predicates::prelude::*;

use crate::common::cli::CliRunner;
use crate::common::fixtures::{TestWorkspace, UNREACHABLE_STORE_YAML};
use crate::common::init_test_logging;

#[test]
fn help_lists_subcommands() {
    init_test_logging();
    CliRunner::new()
        .run(&["--help"])
        .assert_exit_code(0)
        .assert_stdout_contains("backup")
        .assert_stdout_contains("restore");
}

#[test]
fn restore_help_lists_flags() {
    CliRunner::new()
        .run(&["restore", "--help"])
        .assert_exit_code(0)
        .assert_stdout_contains("--purge")
        .assert_stdout_contains("--frozen-ttls");
}

#[test]
fn missing_subcommand_is_usage_error() {
    CliRunner::new().run(&[]).assert_exit_code(1);
}

#[test]
fn missing_positional_is_usage_error() {
    CliRunner::new()
        .run(&["backup", "config.yaml"])
        .assert_exit_code(1)
        .assert_stderr_contains("<OUTPUT>");
}

#[test]
fn unknown_flag_is_usage_error() {
    CliRunner::new()
        .run(&["restore", "a.yaml", "b.jsonl", "--purge-all"])
        .assert_exit_code(1);
}

#[test]
fn version_human() {
    CliRunner::new()
        .run(&["version"])
        .assert_success()
        .assert_stdout_matches(r"^kvsnap \d+\.\d+\.\d+")
        .assert_stdout_contains("rustc:");
}

#[test]
fn version_robot() {
    let result = CliRunner::new().run(&["version", "--robot"]);
    result.assert_success();
    let json = result.json();
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    assert!(json["git_dirty"].is_boolean());
}

#[test]
fn format_env_var_selects_json() {
    let result = CliRunner::new()
        .with_env("KVSNAP_FORMAT", "json")
        .run(&["version"]);
    result.assert_success();
    assert!(result.json().get("git_sha").is_some());
}

#[test]
fn completions_for_bash() {
    Command::cargo_bin("kvsnap")
        .unwrap()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("_kvsnap").and(predicate::str::contains("restore")));
}

#[test]
fn completions_reject_unknown_shell() {
    Command::cargo_bin("kvsnap")
        .unwrap()
        .args(["completions", "tcsh"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("invalid value 'tcsh'"));
}

#[test]
fn missing_config_file_fails() {
    let ws = TestWorkspace::new();
    CliRunner::new()
        .run(&["backup", &ws.arg("absent.yaml"), &ws.arg("out.jsonl")])
        .assert_exit_code(1)
        .assert_stderr_contains("Configuration file not found");
}

#[test]
fn unreachable_store_fails_backup_without_output_file() {
    let ws = TestWorkspace::new();
    ws.write("config.yaml", UNREACHABLE_STORE_YAML);
    CliRunner::new()
        .run(&["backup", &ws.arg("config.yaml"), &ws.arg("out.jsonl")])
        .assert_exit_code(1)
        .assert_stderr_contains("Redis error");
    assert!(!ws.path().join("out.jsonl").exists());
}

#[test]
fn robot_errors_are_json_on_stderr() {
    let ws = TestWorkspace::new();
    let result = CliRunner::new().run(&[
        "--robot",
        "backup",
        &ws.arg("absent.yaml"),
        &ws.arg("out.jsonl"),
    ]);
    result.assert_exit_code(1);
    let error: serde_json::Value = serde_json::from_str(result.stderr.trim()).unwrap();
    assert_eq!(error["error"], true);
    assert_eq!(error["recoverable"], true);
}
