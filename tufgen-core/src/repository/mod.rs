//! In-memory repository state and the signed-metadata publish step
//!
//! A `Repository` is created fresh for each run. Roles are mutated by
//! attaching keys, targets and delegations; `write_all` then builds, signs
//! and writes metadata for every dirty role into the staging directory
//! (`metadata.staged/`). Promotion of the staging directory to the live
//! `metadata/` directory is the caller's responsibility — the two fixture
//! drivers deliberately promote differently.

pub mod error;

use crate::clock::{format_timestamp, Clock};
use crate::keys::{PrivateKey, PublicKey, TufKey};
use crate::metadata::schema::{
    DelegatedRole, Delegations, MetaFile, RoleKeys, Root, Snapshot, TargetDescription, Targets,
    Timestamp, SPEC_VERSION,
};
use crate::metadata::signing::sign_metadata;
use chrono::Duration;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};

pub use error::RepositoryError;

/// Top-level role names
pub const ROLE_ROOT: &str = "root";
pub const ROLE_TARGETS: &str = "targets";
pub const ROLE_SNAPSHOT: &str = "snapshot";
pub const ROLE_TIMESTAMP: &str = "timestamp";

/// The four top-level roles every repository carries
pub const TOP_LEVEL_ROLES: [&str; 4] = [ROLE_ROOT, ROLE_TARGETS, ROLE_SNAPSHOT, ROLE_TIMESTAMP];

/// Staging directory written by `write_all`
pub const METADATA_STAGED_DIR: &str = "metadata.staged";

/// Live metadata directory the staging directory is promoted to
pub const METADATA_DIR: &str = "metadata";

/// Directory holding target file content, relative to the repository root
pub const TARGETS_DIR: &str = "targets";

/// Every fixture repository starts from version 1 metadata
const INITIAL_VERSION: u64 = 1;

/// Signing threshold the fixtures publish for every role
const THRESHOLD: u32 = 1;

/// Role lifetimes, matching the defaults of the tool the original fixtures
/// were generated with
const ROOT_LIFETIME_DAYS: i64 = 365;
const TARGETS_LIFETIME_DAYS: i64 = 90;
const SNAPSHOT_LIFETIME_DAYS: i64 = 7;
const TIMESTAMP_LIFETIME_DAYS: i64 = 1;

/// Keys attached to one role
#[derive(Debug, Default)]
struct RoleState {
    verification_keys: Vec<PublicKey>,
    signing_keys: Vec<PrivateKey>,
}

impl RoleState {
    fn keyids(&self) -> Vec<String> {
        self.verification_keys
            .iter()
            .map(|k| k.key_id().to_string())
            .collect()
    }
}

/// A declared delegation: restricted path patterns plus the role's own keys
/// and targets
#[derive(Debug)]
struct DelegatedState {
    name: String,
    paths: Vec<String>,
    state: RoleState,
    targets: BTreeSet<String>,
}

/// In-memory repository being assembled for one publish
#[derive(Debug)]
pub struct Repository {
    root_dir: PathBuf,
    clock: Clock,
    roles: BTreeMap<String, RoleState>,
    target_paths: BTreeSet<String>,
    delegations: Vec<DelegatedState>,
    dirty: BTreeSet<String>,
}

impl Repository {
    /// Create a fresh repository over `root_dir`
    pub fn create(root_dir: &Path, clock: Clock) -> Self {
        let mut roles = BTreeMap::new();
        for role in TOP_LEVEL_ROLES {
            roles.insert(role.to_string(), RoleState::default());
        }
        Repository {
            root_dir: root_dir.to_path_buf(),
            clock,
            roles,
            target_paths: BTreeSet::new(),
            delegations: Vec::new(),
            dirty: BTreeSet::new(),
        }
    }

    /// Attach a verification key to a top-level role
    ///
    /// Delegated roles get their verification key through [`Repository::delegate`].
    pub fn add_verification_key(
        &mut self,
        role: &str,
        key: PublicKey,
    ) -> Result<(), RepositoryError> {
        let state = self
            .roles
            .get_mut(role)
            .ok_or_else(|| RepositoryError::UnknownRole {
                role: role.to_string(),
            })?;
        state.verification_keys.push(key);
        Ok(())
    }

    /// Load a signing key for a top-level or delegated role
    pub fn load_signing_key(
        &mut self,
        role: &str,
        key: PrivateKey,
    ) -> Result<(), RepositoryError> {
        if let Some(state) = self.roles.get_mut(role) {
            state.signing_keys.push(key);
            return Ok(());
        }
        if let Some(delegated) = self.delegations.iter_mut().find(|d| d.name == role) {
            delegated.state.signing_keys.push(key);
            return Ok(());
        }
        Err(RepositoryError::UnknownRole {
            role: role.to_string(),
        })
    }

    /// Declare a delegated role scoped to the given path patterns
    ///
    /// The patterns are published verbatim; this tool never evaluates them.
    pub fn delegate(
        &mut self,
        name: &str,
        key: PublicKey,
        paths: &[&str],
    ) -> Result<(), RepositoryError> {
        if TOP_LEVEL_ROLES.contains(&name) {
            return Err(RepositoryError::ReservedRoleName {
                role: name.to_string(),
            });
        }
        if self.delegations.iter().any(|d| d.name == name) {
            return Err(RepositoryError::DuplicateDelegation {
                role: name.to_string(),
            });
        }
        self.delegations.push(DelegatedState {
            name: name.to_string(),
            paths: paths.iter().map(|p| p.to_string()).collect(),
            state: RoleState {
                verification_keys: vec![key],
                signing_keys: Vec::new(),
            },
            targets: BTreeSet::new(),
        });
        Ok(())
    }

    /// Register a target path with the top-level targets role
    pub fn add_target(&mut self, path: &str) -> Result<(), RepositoryError> {
        validate_target_path(path)?;
        self.target_paths.insert(path.to_string());
        Ok(())
    }

    /// Register several target paths with the top-level targets role
    pub fn add_targets<'a, I>(&mut self, paths: I) -> Result<(), RepositoryError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        for path in paths {
            self.add_target(path)?;
        }
        Ok(())
    }

    /// Register a target path with a delegated role
    pub fn add_delegated_target(&mut self, role: &str, path: &str) -> Result<(), RepositoryError> {
        validate_target_path(path)?;
        let delegated = self
            .delegations
            .iter_mut()
            .find(|d| d.name == role)
            .ok_or_else(|| RepositoryError::UnknownRole {
                role: role.to_string(),
            })?;
        delegated.targets.insert(path.to_string());
        Ok(())
    }

    /// Mark roles whose metadata must be regenerated and re-signed
    pub fn mark_dirty(&mut self, roles: &[&str]) -> Result<(), RepositoryError> {
        for role in roles {
            if !self.roles.contains_key(*role) && !self.delegations.iter().any(|d| d.name == *role)
            {
                return Err(RepositoryError::UnknownRole {
                    role: role.to_string(),
                });
            }
            self.dirty.insert(role.to_string());
        }
        Ok(())
    }

    /// Log a summary of the repository state before publishing
    pub fn status(&self) {
        for (name, state) in &self.roles {
            info!(
                role = name.as_str(),
                verification_keys = state.verification_keys.len(),
                signing_keys = state.signing_keys.len(),
                dirty = self.dirty.contains(name),
                "Role status"
            );
        }
        for delegated in &self.delegations {
            info!(
                role = delegated.name.as_str(),
                paths = ?delegated.paths,
                targets = delegated.targets.len(),
                dirty = self.dirty.contains(&delegated.name),
                "Delegated role status"
            );
        }
        info!(targets = self.target_paths.len(), "Top-level target count");
    }

    /// Build, sign and write metadata for every dirty role into the staging
    /// directory, returning its path
    ///
    /// With `consistent_snapshot` enabled, every file except `timestamp.json`
    /// is written under its version-prefixed name (`1.root.json`, ...).
    pub fn write_all(&self, consistent_snapshot: bool) -> Result<PathBuf, RepositoryError> {
        let staged = self.root_dir.join(METADATA_STAGED_DIR);
        fs::create_dir_all(&staged).map_err(|source| RepositoryError::WriteError {
            path: staged.clone(),
            source,
        })?;

        let now = self.clock.now();
        let mut snapshot_meta: BTreeMap<String, MetaFile> = BTreeMap::new();
        snapshot_meta.insert(
            "root.json".to_string(),
            MetaFile::version_only(INITIAL_VERSION),
        );
        snapshot_meta.insert(
            "targets.json".to_string(),
            MetaFile::version_only(INITIAL_VERSION),
        );

        // Delegated targets metadata first; snapshot lists each of them.
        for delegated in &self.delegations {
            snapshot_meta.insert(
                format!("{}.json", delegated.name),
                MetaFile::version_only(INITIAL_VERSION),
            );
            if !self.dirty.contains(&delegated.name) {
                continue;
            }
            let payload = Targets {
                role_type: ROLE_TARGETS.to_string(),
                spec_version: SPEC_VERSION.to_string(),
                delegations: None,
                expires: expiry(now, TARGETS_LIFETIME_DAYS),
                targets: self.describe_targets(&delegated.targets)?,
                version: INITIAL_VERSION,
            };
            self.write_role(
                &staged,
                &delegated.name,
                &delegated.state,
                payload,
                consistent_snapshot,
            )?;
        }

        if self.dirty.contains(ROLE_TARGETS) {
            let payload = Targets {
                role_type: ROLE_TARGETS.to_string(),
                spec_version: SPEC_VERSION.to_string(),
                delegations: self.build_delegations()?,
                expires: expiry(now, TARGETS_LIFETIME_DAYS),
                targets: self.describe_targets(&self.target_paths)?,
                version: INITIAL_VERSION,
            };
            self.write_role(
                &staged,
                ROLE_TARGETS,
                self.role(ROLE_TARGETS)?,
                payload,
                consistent_snapshot,
            )?;
        }

        if self.dirty.contains(ROLE_ROOT) {
            let payload = self.build_root(now, consistent_snapshot)?;
            self.write_role(
                &staged,
                ROLE_ROOT,
                self.role(ROLE_ROOT)?,
                payload,
                consistent_snapshot,
            )?;
        }

        let mut snapshot_bytes: Option<Vec<u8>> = None;
        if self.dirty.contains(ROLE_SNAPSHOT) {
            let payload = Snapshot {
                role_type: ROLE_SNAPSHOT.to_string(),
                spec_version: SPEC_VERSION.to_string(),
                expires: expiry(now, SNAPSHOT_LIFETIME_DAYS),
                meta: snapshot_meta,
                version: INITIAL_VERSION,
            };
            let bytes = self.write_role(
                &staged,
                ROLE_SNAPSHOT,
                self.role(ROLE_SNAPSHOT)?,
                payload,
                consistent_snapshot,
            )?;
            snapshot_bytes = Some(bytes);
        }

        if self.dirty.contains(ROLE_TIMESTAMP) {
            // The timestamp digest covers the exact snapshot bytes written in
            // this publish.
            let bytes = snapshot_bytes.ok_or(RepositoryError::SnapshotNotWritten)?;
            let mut hashes = BTreeMap::new();
            hashes.insert("sha256".to_string(), hex::encode(Sha256::digest(&bytes)));
            let mut meta = BTreeMap::new();
            meta.insert(
                "snapshot.json".to_string(),
                MetaFile {
                    hashes: Some(hashes),
                    length: Some(bytes.len() as u64),
                    version: INITIAL_VERSION,
                },
            );
            let payload = Timestamp {
                role_type: ROLE_TIMESTAMP.to_string(),
                spec_version: SPEC_VERSION.to_string(),
                expires: expiry(now, TIMESTAMP_LIFETIME_DAYS),
                meta,
                version: INITIAL_VERSION,
            };
            // The timestamp file is never version-prefixed.
            self.write_role(&staged, ROLE_TIMESTAMP, self.role(ROLE_TIMESTAMP)?, payload, false)?;
        }

        info!(staged = %staged.display(), "Wrote signed metadata for dirty roles");
        Ok(staged)
    }

    fn role(&self, name: &str) -> Result<&RoleState, RepositoryError> {
        self.roles
            .get(name)
            .ok_or_else(|| RepositoryError::UnknownRole {
                role: name.to_string(),
            })
    }

    /// Assemble root metadata: every top-level role's keys and thresholds
    fn build_root(
        &self,
        now: chrono::DateTime<chrono::Utc>,
        consistent_snapshot: bool,
    ) -> Result<Root, RepositoryError> {
        let mut keys: BTreeMap<String, TufKey> = BTreeMap::new();
        let mut roles: BTreeMap<String, RoleKeys> = BTreeMap::new();
        for name in TOP_LEVEL_ROLES {
            let state = self.role(name)?;
            if state.verification_keys.is_empty() {
                return Err(RepositoryError::NoVerificationKey {
                    role: name.to_string(),
                });
            }
            for key in &state.verification_keys {
                keys.insert(key.key_id().to_string(), key.tuf_key().clone());
            }
            roles.insert(
                name.to_string(),
                RoleKeys {
                    keyids: state.keyids(),
                    threshold: THRESHOLD,
                },
            );
        }
        Ok(Root {
            role_type: ROLE_ROOT.to_string(),
            spec_version: SPEC_VERSION.to_string(),
            consistent_snapshot,
            expires: expiry(now, ROOT_LIFETIME_DAYS),
            keys,
            roles,
            version: INITIAL_VERSION,
        })
    }

    /// Assemble the delegations block of the top-level targets role
    fn build_delegations(&self) -> Result<Option<Delegations>, RepositoryError> {
        if self.delegations.is_empty() {
            return Ok(None);
        }
        let mut keys: BTreeMap<String, TufKey> = BTreeMap::new();
        let mut roles = Vec::new();
        for delegated in &self.delegations {
            if delegated.state.verification_keys.is_empty() {
                return Err(RepositoryError::NoVerificationKey {
                    role: delegated.name.clone(),
                });
            }
            for key in &delegated.state.verification_keys {
                keys.insert(key.key_id().to_string(), key.tuf_key().clone());
            }
            roles.push(DelegatedRole {
                name: delegated.name.clone(),
                keyids: delegated.state.keyids(),
                paths: delegated.paths.clone(),
                terminating: false,
                threshold: THRESHOLD,
            });
        }
        Ok(Some(Delegations { keys, roles }))
    }

    /// Hash every declared target from the repository's targets directory
    fn describe_targets(
        &self,
        paths: &BTreeSet<String>,
    ) -> Result<BTreeMap<String, TargetDescription>, RepositoryError> {
        let mut described = BTreeMap::new();
        for path in paths {
            let full = self.root_dir.join(TARGETS_DIR).join(path);
            let contents =
                fs::read(&full).map_err(|source| RepositoryError::TargetNotFound {
                    path: full.clone(),
                    source,
                })?;
            let mut hashes = BTreeMap::new();
            hashes.insert(
                "sha256".to_string(),
                hex::encode(Sha256::digest(&contents)),
            );
            described.insert(
                path.clone(),
                TargetDescription {
                    length: contents.len() as u64,
                    hashes,
                },
            );
        }
        Ok(described)
    }

    /// Sign a payload with a role's keys and write it into the staging
    /// directory, returning the exact bytes written
    fn write_role<T: Serialize>(
        &self,
        staged: &Path,
        role: &str,
        state: &RoleState,
        payload: T,
        versioned_name: bool,
    ) -> Result<Vec<u8>, RepositoryError> {
        if state.signing_keys.is_empty() {
            return Err(RepositoryError::NoSigningKey {
                role: role.to_string(),
            });
        }
        let signing_keys: Vec<&PrivateKey> = state.signing_keys.iter().collect();
        let signed =
            sign_metadata(payload, &signing_keys).map_err(|source| {
                RepositoryError::SerializeError {
                    role: role.to_string(),
                    source,
                }
            })?;
        let mut bytes =
            serde_json::to_vec_pretty(&signed).map_err(|source| RepositoryError::SerializeError {
                role: role.to_string(),
                source,
            })?;
        bytes.push(b'\n');

        let filename = if versioned_name {
            format!("{INITIAL_VERSION}.{role}.json")
        } else {
            format!("{role}.json")
        };
        let path = staged.join(&filename);
        fs::write(&path, &bytes).map_err(|source| RepositoryError::WriteError {
            path: path.clone(),
            source,
        })?;
        debug!(role, file = filename.as_str(), "Wrote signed metadata");
        Ok(bytes)
    }
}

/// Reject absolute paths and parent-directory escapes
fn validate_target_path(path: &str) -> Result<(), RepositoryError> {
    let invalid = path.is_empty()
        || Path::new(path).components().any(|c| {
            !matches!(c, Component::Normal(_))
        });
    if invalid {
        return Err(RepositoryError::InvalidTargetPath {
            path: path.to_string(),
        });
    }
    Ok(())
}

fn expiry(now: chrono::DateTime<chrono::Utc>, days: i64) -> String {
    format_timestamp(now + Duration::days(days))
}
