//! CLI integration tests

use std::process::Command;

fn kinv(args: &[&str]) -> std::process::Output {
    Command::new("cargo")
        .args(["run", "-q", "-p", "kinv-cli", "--"])
        .args(args)
        .output()
        .expect("Failed to execute command")
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = kinv(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(
        stdout.contains("Kubernetes cluster resource inventory"),
        "Should show app name"
    );
    assert!(stdout.contains("collect"), "Should show collect command");
    assert!(stdout.contains("show"), "Should show show command");
    assert!(stdout.contains("--log-format"), "Should show log format option");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = kinv(&["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("kinv"), "Should show binary name");
}

/// Test collect subcommand help
#[test]
fn test_collect_help() {
    let output = kinv(&["collect", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Collect help should succeed");
    for flag in [
        "--context",
        "--output",
        "--obfuscate",
        "--resume",
        "--parallelism",
        "--discipline",
        "--metrics-file",
    ] {
        assert!(stdout.contains(flag), "Should show {} option", flag);
    }
}

/// Test show subcommand help
#[test]
fn test_show_help() {
    let output = kinv(&["show", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Show help should succeed");
    assert!(stdout.contains("--format"), "Should show format option");
}

/// Test rendering a snapshot as JSON
#[test]
fn test_show_snapshot_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("snapshot.json");
    std::fs::write(
        &path,
        r#"{
  "cluster": "prod",
  "has_metrics": false,
  "nodes": {
    "node-a": {
      "instance_type": "m5.large",
      "region": "unknown",
      "zone": "unknown",
      "capacity": { "cpu": 2.0, "memory_gb": 8.0 }
    }
  },
  "namespaces": {}
}"#,
    )
    .unwrap();

    let output = kinv(&["show", path.to_str().unwrap(), "--format", "json"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Show should succeed");
    let json: serde_json::Value = serde_json::from_str(&stdout).expect("valid JSON");
    assert_eq!(json["cluster"], "prod");
    assert_eq!(json["nodes"]["node-a"]["capacity"]["cpu"], 2.0);
}

/// Test that an invalid discipline is rejected
#[test]
fn test_invalid_discipline() {
    let output = kinv(&["collect", "--discipline", "random"]);

    assert!(!output.status.success(), "Invalid discipline should fail");
}

/// Test that a missing snapshot is reported
#[test]
fn test_show_missing_snapshot() {
    let output = kinv(&["show", "/nonexistent/snapshot.json"]);

    assert!(!output.status.success(), "Missing snapshot should fail");
}
