//! Basic CLI E2E tests.
//!
//! Tests invoke CLI commands via cargo run and verify outputs.

use std::process::Command;

/// Run a CLI command and return output.
fn run_cli(args: &[&str]) -> (String, String, i32) {
    let output = Command::new("cargo")
        .args(["run", "-p", "pollify-cli", "--"])
        .args(args)
        .env("POLLIFY_ENV", "dev")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

#[test]
fn test_help() {
    let (stdout, _stderr, code) = run_cli(&["--help"]);
    assert_eq!(code, 0, "help failed");
    assert!(stdout.contains("Pollify CLI"));
}

#[test]
fn test_form_list() {
    let (stdout, _stderr, code) = run_cli(&["form", "list"]);
    assert_eq!(code, 0, "form list failed");
    assert!(
        serde_json::from_str::<serde_json::Value>(&stdout).is_ok(),
        "form list did not print JSON: {stdout}"
    );
}

#[test]
fn test_metrics_missing_form_fails() {
    let (_stdout, stderr, code) = run_cli(&["metrics", "no-such-form"]);
    assert!(code != 0, "metrics on a missing form unexpectedly succeeded");
    assert!(stderr.contains("error"));
}
