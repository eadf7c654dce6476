//! Integration tests for the variations binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn variations(root: &Path) -> Command {
    let mut cmd = Command::cargo_bin("variations").unwrap();
    cmd.env_remove("RUST_LOG")
        .env_remove("VARIATIONS_ROOT")
        .env_remove("VARIATIONS_CONFIGURATION_PATH")
        .arg("--root")
        .arg(root);
    cmd
}

#[test]
fn test_add_creates_variation() {
    let dir = TempDir::new().unwrap();

    variations(dir.path())
        .args(["add", "Beta"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Created variation \"Beta\""));

    let overlay = dir.path().join("variations/Beta");
    assert!(overlay.join("android").is_dir());
    assert!(overlay.join("ios/main_target").is_dir());
    assert!(overlay.join("src").is_dir());

    let registry = fs::read_to_string(dir.path().join("variations/apps.json")).unwrap();
    assert!(registry.contains("\"name\": \"Beta\""));
    assert!(registry.contains("\"bundleId\": \"com.example.beta\""));
}

#[test]
fn test_add_several() {
    let dir = TempDir::new().unwrap();

    variations(dir.path())
        .args(["add", "Alpha", "Beta", "Gamma"])
        .assert()
        .success();

    for name in ["Alpha", "Beta", "Gamma"] {
        assert!(dir.path().join("variations").join(name).is_dir());
    }
}

#[test]
fn test_duplicate_add_is_skipped() {
    let dir = TempDir::new().unwrap();
    let registry = dir.path().join("variations/apps.json");

    variations(dir.path()).args(["add", "Beta"]).assert().success();
    let before = fs::read(&registry).unwrap();

    variations(dir.path())
        .args(["add", "Beta"])
        .assert()
        .success()
        .stderr(predicate::str::contains("variation \"Beta\" exists, skipping.."));
    assert_eq!(fs::read(&registry).unwrap(), before);
}

#[test]
fn test_unknown_command() {
    let dir = TempDir::new().unwrap();

    variations(dir.path())
        .arg("frobnicate")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_missing_command_prints_help() {
    let dir = TempDir::new().unwrap();

    variations(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage"))
        .stdout(predicate::str::contains("switch"));
}

#[test]
fn test_no_arguments_prints_help() {
    let mut cmd = Command::cargo_bin("variations").unwrap();
    cmd.env_remove("VARIATIONS_ROOT")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage"));
}

#[test]
fn test_help() {
    let dir = TempDir::new().unwrap();

    variations(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("switch").and(predicate::str::contains("add")));
}

#[test]
fn test_switch_to_missing_variation() {
    let dir = TempDir::new().unwrap();
    variations(dir.path()).args(["add", "Beta"]).assert().success();

    variations(dir.path())
        .args(["switch", "Nope"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("error: could not switch to \"Nope\""))
        .stderr(predicate::str::contains("variation \"Nope\" does not exist"));
}

#[test]
fn test_switch_without_registry() {
    let dir = TempDir::new().unwrap();

    variations(dir.path())
        .args(["switch", "Acme"])
        .assert()
        .code(1)
        .stderr(predicate::str::starts_with("error:"));
}
