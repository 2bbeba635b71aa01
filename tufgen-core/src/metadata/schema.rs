//! TUF 1.0 metadata schema types
//!
//! Field names and the `_type` discriminator follow the TUF specification's
//! JSON layout. All maps are `BTreeMap` so serialized output is deterministic.

use crate::keys::TufKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// TUF specification version stamped into every metadata file
pub const SPEC_VERSION: &str = "1.0.0";

/// A single signature over the canonical form of the `signed` portion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    /// ID of the key that produced this signature
    pub keyid: String,
    /// Hex-encoded ed25519 signature
    pub sig: String,
}

/// Envelope wrapping a metadata payload with its signatures
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signed<T> {
    pub signatures: Vec<Signature>,
    pub signed: T,
}

/// Key IDs and threshold for one role, as listed in root metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleKeys {
    pub keyids: Vec<String>,
    pub threshold: u32,
}

/// Root role metadata: the trust anchor listing every top-level role's keys
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Root {
    #[serde(rename = "_type")]
    pub role_type: String,
    pub spec_version: String,
    pub consistent_snapshot: bool,
    pub expires: String,
    pub keys: BTreeMap<String, TufKey>,
    pub roles: BTreeMap<String, RoleKeys>,
    pub version: u64,
}

/// Description of one target file: its length and content digests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetDescription {
    pub length: u64,
    pub hashes: BTreeMap<String, String>,
}

/// One delegated role entry inside a targets role's delegations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegatedRole {
    pub name: String,
    pub keyids: Vec<String>,
    /// Path patterns this role is trusted for (emitted verbatim, never
    /// evaluated by this tool)
    pub paths: Vec<String>,
    pub terminating: bool,
    pub threshold: u32,
}

/// Delegations block: the delegated roles and the keys they verify with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delegations {
    pub keys: BTreeMap<String, TufKey>,
    pub roles: Vec<DelegatedRole>,
}

/// Targets role metadata (top-level or delegated)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Targets {
    #[serde(rename = "_type")]
    pub role_type: String,
    pub spec_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delegations: Option<Delegations>,
    pub expires: String,
    pub targets: BTreeMap<String, TargetDescription>,
    pub version: u64,
}

/// Entry in a snapshot or timestamp `meta` map
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaFile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hashes: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<u64>,
    pub version: u64,
}

impl MetaFile {
    /// A version-only entry (snapshot style)
    pub fn version_only(version: u64) -> Self {
        MetaFile {
            hashes: None,
            length: None,
            version,
        }
    }
}

/// Snapshot role metadata: versions of every other metadata file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(rename = "_type")]
    pub role_type: String,
    pub spec_version: String,
    pub expires: String,
    pub meta: BTreeMap<String, MetaFile>,
    pub version: u64,
}

/// Timestamp role metadata: the freshness pointer at the current snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timestamp {
    #[serde(rename = "_type")]
    pub role_type: String,
    pub spec_version: String,
    pub expires: String,
    pub meta: BTreeMap<String, MetaFile>,
    pub version: u64,
}
