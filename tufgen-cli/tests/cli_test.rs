//! Integration tests for the tufgen command line

use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

/// Helper to run a tufgen subcommand in a directory
fn run_tufgen(dir: &Path, args: &[&str]) -> std::io::Result<std::process::Output> {
    Command::new(env!("CARGO_BIN_EXE_tufgen"))
        .args(args)
        .current_dir(dir)
        .output()
}

#[test]
fn test_keygen_creates_key_pairs() {
    let temp_dir = TempDir::new().unwrap();

    let output = run_tufgen(temp_dir.path(), &["keygen"]).unwrap();
    assert!(output.status.success(), "keygen command failed");

    for role in [
        "root",
        "targets",
        "snapshot",
        "timestamp",
        "package_metadata",
        "package",
    ] {
        assert!(temp_dir.path().join("keys").join(role).exists());
        assert!(temp_dir
            .path()
            .join("keys")
            .join(format!("{role}.pub"))
            .exists());
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Generated key pair for role 'root'"));
}

#[test]
fn test_keygen_selected_roles_only() {
    let temp_dir = TempDir::new().unwrap();

    let output = run_tufgen(temp_dir.path(), &["keygen", "--roles", "root,targets"]).unwrap();
    assert!(output.status.success());
    assert!(temp_dir.path().join("keys/root").exists());
    assert!(temp_dir.path().join("keys/targets.pub").exists());
    assert!(!temp_dir.path().join("keys/snapshot").exists());
}

#[test]
fn test_basic_fixture_end_to_end() {
    let temp_dir = TempDir::new().unwrap();
    assert!(run_tufgen(temp_dir.path(), &["keygen"]).unwrap().status.success());

    let output = run_tufgen(temp_dir.path(), &["basic"]).unwrap();
    assert!(output.status.success(), "basic command failed");

    let metadata = temp_dir.path().join("metadata");
    for file in ["1.root.json", "1.targets.json", "1.snapshot.json", "timestamp.json"] {
        assert!(metadata.join(file).exists(), "missing {file}");
    }
    assert!(!temp_dir.path().join("metadata.staged").exists());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Published basic fixture metadata"));

    // A second run must fail instead of overwriting the fixture.
    let output = run_tufgen(temp_dir.path(), &["basic"]).unwrap();
    assert!(!output.status.success(), "second basic run must fail");
}

#[test]
fn test_delegated_fixture_end_to_end() {
    let temp_dir = TempDir::new().unwrap();
    assert!(run_tufgen(temp_dir.path(), &["keygen"]).unwrap().status.success());

    let output = run_tufgen(temp_dir.path(), &["delegated"]).unwrap();
    assert!(output.status.success(), "delegated command failed");

    let metadata = temp_dir.path().join("metadata");
    assert!(metadata.join("1.package_metadata.json").exists());
    assert!(metadata.join("1.package.json").exists());

    // Delegation patterns are published in the top-level targets metadata.
    let targets: serde_json::Value =
        serde_json::from_slice(&fs::read(metadata.join("1.targets.json")).unwrap()).unwrap();
    let roles = targets["signed"]["delegations"]["roles"].as_array().unwrap();
    assert_eq!(roles.len(), 2);

    // Regeneration over existing metadata succeeds.
    let output = run_tufgen(temp_dir.path(), &["delegated"]).unwrap();
    assert!(output.status.success(), "delegated rerun must succeed");
}

#[test]
fn test_missing_keys_is_a_fatal_error() {
    let temp_dir = TempDir::new().unwrap();
    let output = run_tufgen(temp_dir.path(), &["basic"]).unwrap();
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("root"), "error should name the missing role");
}
