//! CLI Integration Tests
//!
//! Tests for the `neo4j-json-io` binary using `assert_cmd`.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Get the CLI binary command, isolated from the caller's environment.
#[allow(deprecated)]
fn export_cmd() -> Command {
    let mut cmd = Command::cargo_bin("neo4j-json-io").unwrap();
    cmd.env_remove("NEO4J_USERNAME")
        .env_remove("NEO4J_PASSWORD")
        .env_remove("RUST_LOG");
    cmd
}

// =============================================================================
// Help & Version Tests
// =============================================================================

#[test]
fn test_help_displays_usage() {
    export_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("--export"))
        .stdout(predicate::str::contains("--endpoint"));
}

#[test]
fn test_short_help() {
    export_cmd()
        .arg("-h")
        .assert()
        .success()
        .stdout(predicate::str::contains("--username"));
}

#[test]
fn test_version_displays_version() {
    export_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

// =============================================================================
// Usage Errors
// =============================================================================

#[test]
fn test_no_arguments_is_usage_error() {
    export_cmd()
        .arg("--no-update-check")
        .assert()
        .code(2)
        .stderr(predicate::str::contains(
            "export and endpoint arguments must be specified",
        ))
        .stderr(predicate::str::contains("Usage:"));
}

#[test]
fn test_missing_endpoint_is_usage_error() {
    let temp_dir = TempDir::new().unwrap();
    let output = temp_dir.path().join("graph.json.gz");

    export_cmd()
        .arg("--no-update-check")
        .arg("--export")
        .arg(&output)
        .assert()
        .code(2);

    assert!(!output.exists());
}

#[test]
fn test_missing_export_is_usage_error() {
    export_cmd()
        .args(["--no-update-check", "-e", "bolt://localhost:7687"])
        .assert()
        .code(2);
}

// =============================================================================
// Export Failures
// =============================================================================

#[test]
fn test_unsupported_scheme_fails() {
    let temp_dir = TempDir::new().unwrap();
    let output = temp_dir.path().join("graph.json.gz");

    export_cmd()
        .arg("--no-update-check")
        .arg("--export")
        .arg(&output)
        .args(["--endpoint", "ftp://localhost"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("ftp"));
}

#[test]
fn test_unreachable_endpoint_fails() {
    let temp_dir = TempDir::new().unwrap();
    let output = temp_dir.path().join("graph.json.gz");

    export_cmd()
        .arg("--no-update-check")
        .arg("--export")
        .arg(&output)
        .args(["--endpoint", "http://127.0.0.1:1"])
        .assert()
        .code(1);
}

// =============================================================================
// Configuration File
// =============================================================================

#[test]
fn test_config_file_supplies_arguments() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("export.yaml");
    let output = temp_dir.path().join("graph.json.gz");
    fs::write(
        &config_path,
        format!(
            "endpoint: http://127.0.0.1:1\noutput: {}\noptions:\n  check_for_updates: false\n",
            output.display()
        ),
    )
    .unwrap();

    // Arguments are complete, so this fails on connect rather than on usage.
    export_cmd()
        .arg("--config")
        .arg(&config_path)
        .assert()
        .code(1);
}

#[test]
fn test_invalid_config_file_fails() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("bad.yaml");
    fs::write(&config_path, "options: [not, a, map]").unwrap();

    export_cmd()
        .args(["--no-update-check", "--config"])
        .arg(&config_path)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("YAML"));
}
