//! Integration tests for the two fixture drivers

use std::fs;
use std::path::Path;
use tempfile::TempDir;

use tufgen_core::fixture::{
    generate_basic, generate_delegated, ALL_FIXTURE_ROLES, PASSPHRASE, ROLE_PACKAGE,
    ROLE_PACKAGE_METADATA,
};
use tufgen_core::keys::TufKey;
use tufgen_core::metadata::{verify_metadata, Root, Signed, Targets};
use tufgen_core::{KeyStore, PublicKey};

/// Mint a key pair for every role both fixtures use
fn setup_keys(dir: &Path) {
    let store = KeyStore::new(dir, PASSPHRASE);
    for role in ALL_FIXTURE_ROLES {
        store.generate(role).unwrap();
    }
}

fn load_public_key(dir: &Path, role: &str) -> PublicKey {
    let contents = fs::read_to_string(dir.join("keys").join(format!("{role}.pub"))).unwrap();
    let tuf: TufKey = serde_json::from_str(&contents).unwrap();
    PublicKey::from_tuf(tuf, role).unwrap()
}

fn read_signed<T: serde::de::DeserializeOwned>(path: &Path) -> Signed<T> {
    serde_json::from_slice(&fs::read(path).unwrap()).unwrap()
}

#[test]
fn basic_produces_live_metadata_for_all_top_level_roles() {
    let temp_dir = TempDir::new().unwrap();
    setup_keys(temp_dir.path());

    generate_basic(temp_dir.path()).unwrap();

    let metadata = temp_dir.path().join("metadata");
    assert!(metadata.is_dir());
    // The staging directory was promoted, not copied.
    assert!(!temp_dir.path().join("metadata.staged").exists());
    for file in ["1.root.json", "1.targets.json", "1.snapshot.json", "timestamp.json"] {
        assert!(metadata.join(file).exists(), "missing {file}");
    }
}

#[test]
fn basic_second_run_fails_without_clobbering() {
    let temp_dir = TempDir::new().unwrap();
    setup_keys(temp_dir.path());
    generate_basic(temp_dir.path()).unwrap();
    let before = fs::read(temp_dir.path().join("metadata/1.root.json")).unwrap();

    assert!(generate_basic(temp_dir.path()).is_err());

    // The existing output is untouched.
    let after = fs::read(temp_dir.path().join("metadata/1.root.json")).unwrap();
    assert_eq!(before, after);
}

#[test]
fn basic_roles_carry_exactly_the_published_verification_key() {
    let temp_dir = TempDir::new().unwrap();
    setup_keys(temp_dir.path());
    generate_basic(temp_dir.path()).unwrap();

    let root: Signed<Root> = read_signed(&temp_dir.path().join("metadata/1.root.json"));
    for role in ["root", "targets", "snapshot", "timestamp"] {
        let public = load_public_key(temp_dir.path(), role);
        let entry = &root.signed.roles[role];
        assert_eq!(entry.keyids.len(), 1, "role {role} must have one key");
        assert_eq!(entry.keyids[0], public.key_id());
        assert_eq!(root.signed.keys[public.key_id()], *public.tuf_key());
    }
    // Root metadata is signed by the root key from keys/root.pub.
    let root_key = load_public_key(temp_dir.path(), "root");
    assert!(verify_metadata(&root, &root_key).unwrap());
}

#[test]
fn basic_declares_its_two_targets() {
    let temp_dir = TempDir::new().unwrap();
    setup_keys(temp_dir.path());
    generate_basic(temp_dir.path()).unwrap();

    let targets: Signed<Targets> = read_signed(&temp_dir.path().join("metadata/1.targets.json"));
    assert!(targets.signed.targets.contains_key("packages.json"));
    assert!(targets.signed.targets.contains_key("p2/drupal/core.json"));
    assert!(targets.signed.delegations.is_none());

    let targets_key = load_public_key(temp_dir.path(), "targets");
    assert!(verify_metadata(&targets, &targets_key).unwrap());
}

#[test]
fn basic_expiries_are_pinned() {
    let temp_dir = TempDir::new().unwrap();
    setup_keys(temp_dir.path());
    generate_basic(temp_dir.path()).unwrap();

    // Pinned clock: 2020-01-01T00:00:00Z plus the root lifetime of 365 days.
    let root: Signed<Root> = read_signed(&temp_dir.path().join("metadata/1.root.json"));
    assert_eq!(root.signed.expires, "2020-12-31T00:00:00Z");
}

#[test]
fn delegated_publishes_delegated_role_metadata() {
    let temp_dir = TempDir::new().unwrap();
    setup_keys(temp_dir.path());
    generate_delegated(temp_dir.path()).unwrap();

    let metadata = temp_dir.path().join("metadata");
    for file in [
        "1.root.json",
        "1.targets.json",
        "1.snapshot.json",
        "timestamp.json",
        "1.package_metadata.json",
        "1.package.json",
    ] {
        assert!(metadata.join(file).exists(), "missing {file}");
    }

    // The top-level targets role delegates each role to its path patterns.
    let targets: Signed<Targets> = read_signed(&metadata.join("1.targets.json"));
    let delegations = targets.signed.delegations.unwrap();
    let patterns: Vec<(&str, &[String])> = delegations
        .roles
        .iter()
        .map(|r| (r.name.as_str(), r.paths.as_slice()))
        .collect();
    assert_eq!(delegations.roles.len(), 2);
    assert!(patterns.contains(&(
        ROLE_PACKAGE_METADATA,
        &["files/packages/8/p2/*".to_string()][..]
    )));
    assert!(patterns.contains(&(ROLE_PACKAGE, &["drupal/*".to_string()][..])));

    // Each delegated role signs its own restricted targets.
    let package_metadata: Signed<Targets> = read_signed(&metadata.join("1.package_metadata.json"));
    assert!(package_metadata
        .signed
        .targets
        .contains_key("files/packages/8/p2/drupal/token.json"));
    let pm_key = load_public_key(temp_dir.path(), ROLE_PACKAGE_METADATA);
    assert!(verify_metadata(&package_metadata, &pm_key).unwrap());

    let package: Signed<Targets> = read_signed(&metadata.join("1.package.json"));
    assert!(package.signed.targets.contains_key("drupal/token/1.9.0.0"));
    let package_key = load_public_key(temp_dir.path(), ROLE_PACKAGE);
    assert!(verify_metadata(&package, &package_key).unwrap());
}

#[test]
fn delegated_rerun_replaces_existing_metadata() {
    let temp_dir = TempDir::new().unwrap();
    setup_keys(temp_dir.path());
    generate_delegated(temp_dir.path()).unwrap();

    // Drop a marker in the live directory; regeneration must remove it.
    let marker = temp_dir.path().join("metadata/stale-marker");
    fs::write(&marker, "old").unwrap();

    generate_delegated(temp_dir.path()).unwrap();
    assert!(!marker.exists());
    assert!(temp_dir.path().join("metadata/1.root.json").exists());
    assert!(!temp_dir.path().join("metadata.staged").exists());
}

#[test]
fn delegated_succeeds_over_foreign_metadata_directory() {
    let temp_dir = TempDir::new().unwrap();
    setup_keys(temp_dir.path());

    // A pre-existing metadata directory from some earlier state.
    fs::create_dir_all(temp_dir.path().join("metadata")).unwrap();
    fs::write(temp_dir.path().join("metadata/leftover.json"), "{}").unwrap();

    generate_delegated(temp_dir.path()).unwrap();
    assert!(!temp_dir.path().join("metadata/leftover.json").exists());
    assert!(temp_dir.path().join("metadata/1.snapshot.json").exists());
}

#[test]
fn drivers_fail_fast_without_key_material() {
    let temp_dir = TempDir::new().unwrap();
    assert!(generate_basic(temp_dir.path()).is_err());
    assert!(generate_delegated(temp_dir.path()).is_err());
    // Nothing was published.
    assert!(!temp_dir.path().join("metadata").exists());
}

#[test]
fn basic_runs_are_reproducible() {
    // Same keys, pinned clock: two runs from the same inputs produce
    // byte-identical metadata.
    let first = TempDir::new().unwrap();
    setup_keys(first.path());
    generate_basic(first.path()).unwrap();

    let second = TempDir::new().unwrap();
    fs::create_dir_all(second.path().join("keys")).unwrap();
    for entry in fs::read_dir(first.path().join("keys")).unwrap() {
        let entry = entry.unwrap();
        fs::copy(
            entry.path(),
            second.path().join("keys").join(entry.file_name()),
        )
        .unwrap();
    }
    generate_basic(second.path()).unwrap();

    for file in ["1.root.json", "1.targets.json", "1.snapshot.json", "timestamp.json"] {
        let a = fs::read(first.path().join("metadata").join(file)).unwrap();
        let b = fs::read(second.path().join("metadata").join(file)).unwrap();
        assert_eq!(a, b, "{file} differs between runs");
    }
}
