//! Repository engine error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while configuring roles or writing signed metadata
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// A role name was used that the repository does not know about
    #[error("Unknown role '{role}'\n\nTop-level roles are root, targets, snapshot and timestamp; delegated\nroles must be declared with delegate() before they can be referenced.")]
    UnknownRole { role: String },

    /// A delegated role was declared twice
    #[error("Delegated role '{role}' is already declared")]
    DuplicateDelegation { role: String },

    /// A delegated role tried to reuse a top-level role name
    #[error("'{role}' is a reserved top-level role name and cannot be delegated")]
    ReservedRoleName { role: String },

    /// A role is dirty but has no verification key attached
    #[error("Role '{role}' has no verification key; call add_verification_key() before publishing")]
    NoVerificationKey { role: String },

    /// A role is dirty but has no signing key loaded
    #[error("Role '{role}' has no signing key loaded; its metadata cannot be signed")]
    NoSigningKey { role: String },

    /// A target path escaped the targets directory or was malformed
    #[error("Invalid target path '{path}': target paths must be relative and must not contain '..'")]
    InvalidTargetPath { path: String },

    /// A declared target file does not exist on disk at publish time
    #[error("Target file not found: {path}\n\nDeclared targets are hashed from the repository's targets/ directory at\npublish time; the file must exist before write_all() is called.")]
    TargetNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Timestamp was marked dirty without snapshot being written in the same run
    #[error("Timestamp metadata references the snapshot written in the same publish; mark 'snapshot' dirty as well")]
    SnapshotNotWritten,

    /// Metadata serialization failed
    #[error("Failed to serialize metadata for role '{role}'")]
    SerializeError {
        role: String,
        #[source]
        source: serde_json::Error,
    },

    /// A metadata file could not be written to the staging directory
    #[error("Failed to write metadata file: {path}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
