//! Key store error types with clear, actionable messages

use std::path::PathBuf;
use thiserror::Error;

/// Key store specific errors
#[derive(Error, Debug)]
pub enum KeyStoreError {
    /// A key file for the requested role does not exist
    #[error("Key file not found for role '{role}': {path}\n\nEvery role needs a '<role>' (private) and '<role>.pub' (public) file\nunder the keys/ directory. To create a fresh pair, run:\n  tufgen keygen --roles {role}")]
    KeyNotFound { role: String, path: PathBuf },

    /// A key pair for the role already exists on disk
    #[error("A key file for role '{role}' already exists: {path}\n\nRefusing to overwrite existing key material. Delete the file first if\nyou really want to regenerate this role's keys.")]
    KeyExists { role: String, path: PathBuf },

    /// Failed to read a key file
    #[error("Failed to read key file: {path}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse a key file
    #[error("Failed to parse key file (corrupted or invalid format): {path}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The key file was parsed but its contents are unusable
    #[error("Invalid key material for role '{role}': {reason}")]
    InvalidKey { role: String, reason: String },

    /// Private key decryption failed
    #[error("Failed to decrypt private key for role '{role}' (wrong passphrase or corrupted key file)")]
    DecryptionFailed { role: String },

    /// Private key encryption failed
    #[error("Failed to seal private key for role '{role}': {reason}")]
    SealError { role: String, reason: String },

    /// Failed to write a key file
    #[error("Failed to write key file: {path}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to produce the canonical form of a key definition
    #[error("Failed to canonicalize key definition")]
    CanonicalizeError {
        #[source]
        source: serde_json::Error,
    },
}
