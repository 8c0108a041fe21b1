// CLI integration tests: argument handling and fatal configuration errors.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Runs `dsnap` from an empty directory with logging silenced.
fn dsnap(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("dsnap").unwrap();
    cmd.current_dir(dir.path())
        .env("DSNAP_LOG_OUTPUT", "off")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn help_lists_subcommands() {
    let dir = TempDir::new().unwrap();
    dsnap(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("prune"))
        .stdout(predicate::str::contains("resolve"));
}

#[test]
fn run_without_inventory_fails() {
    let dir = TempDir::new().unwrap();
    dsnap(&dir)
        .args(["run", "--project", "p"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("No inventory source configured"));
}

#[test]
fn unsupported_backup_type_in_config_file_fails() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("servers.txt"), "web-01,7\n").unwrap();
    fs::write(
        dir.path().join("dsnap.yaml"),
        "project: p\nservers: servers.txt\nbackup_type: weekly\n",
    )
    .unwrap();

    dsnap(&dir)
        .arg("run")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Unsupported backup type 'weekly'"));
}

#[test]
fn unsupported_backup_type_flag_fails() {
    let dir = TempDir::new().unwrap();
    dsnap(&dir)
        .args(["prune", "--project", "p", "--backup-type", "differential"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Unsupported backup type"));
}

#[test]
fn unknown_config_field_fails() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("custom.yaml");
    fs::write(&config, "project: p\nretention: 3\n").unwrap();

    dsnap(&dir)
        .arg("prune")
        .arg("--config")
        .arg(&config)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("unknown field"));
}

#[test]
fn missing_explicit_config_file_fails() {
    let dir = TempDir::new().unwrap();
    dsnap(&dir)
        .args(["prune", "--config", "nope.yaml"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Config file not found"));
}

#[test]
fn malformed_labels_fail() {
    let dir = TempDir::new().unwrap();
    dsnap(&dir)
        .args(["prune", "--project", "p", "--labels", "env=prod,oops"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("labels"));
}

#[test]
fn unknown_provider_fails() {
    let dir = TempDir::new().unwrap();
    dsnap(&dir)
        .args(["prune", "--project", "p", "--provider", "azure"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Unknown provider: azure"));
}
