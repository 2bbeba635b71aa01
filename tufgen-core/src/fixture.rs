//! Fixture drivers: the two metadata-publishing workflows
//!
//! Each driver runs to completion against one repository directory: import
//! key pairs, assign keys to roles, (optionally) declare delegations,
//! register targets, write signed metadata to `metadata.staged/`, then
//! promote the staging directory to `metadata/`. Any failure aborts the run;
//! regeneration is by convention (clear the output and re-run).

use crate::clock::Clock;
use crate::keys::store::KeyStore;
use crate::repository::{
    Repository, METADATA_DIR, METADATA_STAGED_DIR, TARGETS_DIR, TOP_LEVEL_ROLES,
};
use anyhow::{Context, Result};
use chrono::DateTime;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Fixed passphrase protecting every key in a fixture key store
pub const PASSPHRASE: &str = "pw";

/// Pinned publish time of the basic fixture (2020-01-01T00:00:00Z), so its
/// signatures are reproducible
pub const BASIC_FIXED_TIME: i64 = 1_577_836_800;

/// Delegated role restricted to package metadata paths
pub const ROLE_PACKAGE_METADATA: &str = "package_metadata";

/// Delegated role restricted to package content paths
pub const ROLE_PACKAGE: &str = "package";

/// Every role name the two fixtures use, in key-generation order
pub const ALL_FIXTURE_ROLES: [&str; 6] = [
    "root",
    "targets",
    "snapshot",
    "timestamp",
    ROLE_PACKAGE_METADATA,
    ROLE_PACKAGE,
];

/// Targets declared by the basic fixture
const BASIC_TARGETS: [&str; 2] = ["packages.json", "p2/drupal/core.json"];

/// Build the basic fixture: four top-level roles, two targets
///
/// Promotion is a plain rename, so a pre-existing `metadata/` directory makes
/// the run fail rather than silently overwriting it.
pub fn generate_basic(dir: &Path) -> Result<PathBuf> {
    let pinned = DateTime::from_timestamp(BASIC_FIXED_TIME, 0)
        .context("Pinned fixture timestamp is out of range")?;
    info!("Initializing TUF repository in {}", dir.display());
    let mut repository = Repository::create(dir, Clock::Fixed(pinned));
    let store = KeyStore::new(dir, PASSPHRASE);

    load_top_level_roles(&mut repository, &store)?;
    repository.mark_dirty(&TOP_LEVEL_ROLES)?;

    ensure_target_files(dir, &BASIC_TARGETS)?;
    repository.add_targets(BASIC_TARGETS)?;

    repository.mark_dirty(&["snapshot", "targets", "timestamp"])?;
    repository.status();
    repository.write_all(true)?;

    promote(dir, false)
}

/// Build the delegated fixture: the four top-level roles plus the
/// `package_metadata` and `package` delegated roles
///
/// Promotion removes any pre-existing `metadata/` directory first, so the
/// fixture can be regenerated in place.
pub fn generate_delegated(dir: &Path) -> Result<PathBuf> {
    info!("Initializing TUF repository in {}", dir.display());
    let mut repository = Repository::create(dir, Clock::System);
    let store = KeyStore::new(dir, PASSPHRASE);

    load_top_level_roles(&mut repository, &store)?;

    // Declare the delegated roles and load their keys.
    let (pm_public, pm_private) = store
        .import_keypair(ROLE_PACKAGE_METADATA)
        .with_context(|| format!("Failed to import key pair for role '{ROLE_PACKAGE_METADATA}'"))?;
    repository.delegate(ROLE_PACKAGE_METADATA, pm_public, &["files/packages/8/p2/*"])?;
    repository.load_signing_key(ROLE_PACKAGE_METADATA, pm_private)?;

    let (pkg_public, pkg_private) = store
        .import_keypair(ROLE_PACKAGE)
        .with_context(|| format!("Failed to import key pair for role '{ROLE_PACKAGE}'"))?;
    repository.delegate(ROLE_PACKAGE, pkg_public, &["drupal/*"])?;
    repository.load_signing_key(ROLE_PACKAGE, pkg_private)?;

    repository.mark_dirty(&TOP_LEVEL_ROLES)?;

    let package_metadata_target = "files/packages/8/p2/drupal/token.json";
    let package_target = "drupal/token/1.9.0.0";
    ensure_target_files(dir, &["packages.json", package_metadata_target, package_target])?;
    repository.add_target("packages.json")?;
    repository.add_delegated_target(ROLE_PACKAGE_METADATA, package_metadata_target)?;
    repository.add_delegated_target(ROLE_PACKAGE, package_target)?;

    repository.mark_dirty(&[
        "snapshot",
        "targets",
        "timestamp",
        ROLE_PACKAGE_METADATA,
        ROLE_PACKAGE,
    ])?;
    repository.status();
    repository.write_all(true)?;

    promote(dir, true)
}

/// Import one key pair per top-level role and wire it in as both the
/// verification and signing key
fn load_top_level_roles(repository: &mut Repository, store: &KeyStore) -> Result<()> {
    for role in TOP_LEVEL_ROLES {
        let (public, private) = store
            .import_keypair(role)
            .with_context(|| format!("Failed to import key pair for role '{role}'"))?;
        repository.add_verification_key(role, public)?;
        repository.load_signing_key(role, private)?;
    }
    Ok(())
}

/// Write deterministic placeholder content for any declared target that does
/// not exist yet, so a fixture can be generated into an empty directory
fn ensure_target_files(dir: &Path, paths: &[&str]) -> Result<()> {
    for path in paths {
        let full = dir.join(TARGETS_DIR).join(path);
        if full.exists() {
            continue;
        }
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create target directory {}", parent.display()))?;
        }
        let placeholder = format!("{{\"fixture-target\":\"{path}\"}}\n");
        fs::write(&full, placeholder)
            .with_context(|| format!("Failed to write target file {}", full.display()))?;
    }
    Ok(())
}

/// Atomically promote the staging directory to the live metadata directory
///
/// With `replace_existing`, a pre-existing live directory is removed first;
/// otherwise the rename fails if one exists. There is no locking: two
/// concurrent publishers racing this step is unsupported.
fn promote(dir: &Path, replace_existing: bool) -> Result<PathBuf> {
    let staged = dir.join(METADATA_STAGED_DIR);
    let live = dir.join(METADATA_DIR);
    if replace_existing && live.exists() {
        fs::remove_dir_all(&live)
            .with_context(|| format!("Failed to remove old metadata directory {}", live.display()))?;
    }
    fs::rename(&staged, &live).with_context(|| {
        format!(
            "Failed to promote {} to {}",
            staged.display(),
            live.display()
        )
    })?;
    info!("Published metadata to {}", live.display());
    Ok(live)
}
