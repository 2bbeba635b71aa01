//! On-disk key store: `keys/<role>` and `keys/<role>.pub` file pairs
//!
//! Public keys are stored as the TUF key object itself, so the key ID can be
//! derived from the file content alone. Private keys are stored as a sealed
//! envelope: the 32-byte ed25519 seed encrypted with AES-256-GCM under a
//! key derived from the store passphrase with scrypt.

use crate::keys::error::KeyStoreError;
use crate::keys::{PrivateKey, PublicKey, TufKey, KEY_SCHEME, KEY_TYPE};
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Directory under the repository root holding key material
pub const KEYS_DIR: &str = "keys";

/// KDF identifier written to private key files
const KDF: &str = "scrypt";

/// Cipher identifier written to private key files
const CIPHER: &str = "aes-256-gcm";

/// scrypt cost parameter (log2 N)
const SCRYPT_LOG_N: u8 = 14;
/// scrypt block size parameter
const SCRYPT_R: u32 = 8;
/// scrypt parallelism parameter
const SCRYPT_P: u32 = 1;

const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const SEED_LEN: usize = 32;

/// Sealed private key envelope, as serialized to `keys/<role>`
#[derive(Debug, Serialize, Deserialize)]
struct SealedKeyFile {
    keytype: String,
    scheme: String,
    kdf: String,
    cipher: String,
    /// Hex-encoded scrypt salt
    salt: String,
    /// Hex-encoded AES-GCM nonce
    nonce: String,
    /// Hex-encoded sealed ed25519 seed
    ciphertext: String,
}

/// Loads and mints role key pairs from a repository's `keys/` directory
#[derive(Debug, Clone)]
pub struct KeyStore {
    dir: PathBuf,
    passphrase: String,
}

impl KeyStore {
    /// Create a key store rooted at `<repo_root>/keys/`
    pub fn new(repo_root: &Path, passphrase: &str) -> Self {
        KeyStore {
            dir: repo_root.join(KEYS_DIR),
            passphrase: passphrase.to_string(),
        }
    }

    fn private_path(&self, role: &str) -> PathBuf {
        self.dir.join(role)
    }

    fn public_path(&self, role: &str) -> PathBuf {
        self.dir.join(format!("{role}.pub"))
    }

    /// Load and decrypt the key pair for a role
    ///
    /// Any missing file, parse failure, or wrong passphrase is fatal; there
    /// is no retry.
    pub fn import_keypair(&self, role: &str) -> Result<(PublicKey, PrivateKey), KeyStoreError> {
        let public = self.load_public(role)?;
        let private = self.load_private(role)?;
        debug!(role, key_id = public.key_id(), "Imported key pair");
        Ok((public, private))
    }

    /// Generate a fresh key pair for a role and write both files
    ///
    /// Refuses to overwrite existing key material.
    pub fn generate(&self, role: &str) -> Result<(PublicKey, PrivateKey), KeyStoreError> {
        for path in [self.private_path(role), self.public_path(role)] {
            if path.exists() {
                return Err(KeyStoreError::KeyExists {
                    role: role.to_string(),
                    path,
                });
            }
        }

        let mut seed = [0u8; SEED_LEN];
        OsRng.fill_bytes(&mut seed);
        let private = PrivateKey::from_seed(seed)?;
        let public = private.public()?;

        fs::create_dir_all(&self.dir).map_err(|source| KeyStoreError::WriteError {
            path: self.dir.clone(),
            source,
        })?;
        self.write_public(role, &public)?;
        self.write_private(role, &private)?;
        debug!(role, key_id = public.key_id(), "Generated key pair");
        Ok((public, private))
    }

    fn load_public(&self, role: &str) -> Result<PublicKey, KeyStoreError> {
        let path = self.public_path(role);
        let contents = read_key_file(role, &path)?;
        let tuf: TufKey =
            serde_json::from_str(&contents).map_err(|source| KeyStoreError::ParseError {
                path,
                source,
            })?;
        PublicKey::from_tuf(tuf, role)
    }

    fn load_private(&self, role: &str) -> Result<PrivateKey, KeyStoreError> {
        let path = self.private_path(role);
        let contents = read_key_file(role, &path)?;
        let sealed: SealedKeyFile =
            serde_json::from_str(&contents).map_err(|source| KeyStoreError::ParseError {
                path,
                source,
            })?;

        if sealed.keytype != KEY_TYPE
            || sealed.scheme != KEY_SCHEME
            || sealed.kdf != KDF
            || sealed.cipher != CIPHER
        {
            return Err(KeyStoreError::InvalidKey {
                role: role.to_string(),
                reason: format!(
                    "unsupported key envelope ({}/{}/{}/{})",
                    sealed.keytype, sealed.scheme, sealed.kdf, sealed.cipher
                ),
            });
        }

        let salt = decode_hex_field(role, "salt", &sealed.salt)?;
        let nonce = decode_hex_field(role, "nonce", &sealed.nonce)?;
        let ciphertext = decode_hex_field(role, "ciphertext", &sealed.ciphertext)?;
        if nonce.len() != NONCE_LEN {
            return Err(KeyStoreError::InvalidKey {
                role: role.to_string(),
                reason: format!("nonce must be {NONCE_LEN} bytes"),
            });
        }

        let cipher = self.derive_cipher(role, &salt)?;
        let plaintext = cipher
            .decrypt(Nonce::from_slice(&nonce), ciphertext.as_slice())
            .map_err(|_| KeyStoreError::DecryptionFailed {
                role: role.to_string(),
            })?;
        let seed: [u8; SEED_LEN] =
            plaintext
                .try_into()
                .map_err(|_| KeyStoreError::InvalidKey {
                    role: role.to_string(),
                    reason: format!("decrypted seed must be {SEED_LEN} bytes"),
                })?;
        PrivateKey::from_seed(seed)
    }

    fn write_public(&self, role: &str, key: &PublicKey) -> Result<(), KeyStoreError> {
        let path = self.public_path(role);
        let json = serde_json::to_string_pretty(key.tuf_key()).map_err(|source| {
            KeyStoreError::ParseError {
                path: path.clone(),
                source,
            }
        })?;
        fs::write(&path, json + "\n").map_err(|source| KeyStoreError::WriteError { path, source })
    }

    fn write_private(&self, role: &str, key: &PrivateKey) -> Result<(), KeyStoreError> {
        let mut salt = [0u8; SALT_LEN];
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut salt);
        OsRng.fill_bytes(&mut nonce);

        let cipher = self.derive_cipher(role, &salt)?;
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), key.seed().as_slice())
            .map_err(|_| KeyStoreError::SealError {
                role: role.to_string(),
                reason: "AES-GCM encryption failed".to_string(),
            })?;

        let sealed = SealedKeyFile {
            keytype: KEY_TYPE.to_string(),
            scheme: KEY_SCHEME.to_string(),
            kdf: KDF.to_string(),
            cipher: CIPHER.to_string(),
            salt: hex::encode(salt),
            nonce: hex::encode(nonce),
            ciphertext: hex::encode(ciphertext),
        };
        let path = self.private_path(role);
        let json =
            serde_json::to_string_pretty(&sealed).map_err(|source| KeyStoreError::ParseError {
                path: path.clone(),
                source,
            })?;
        fs::write(&path, json + "\n").map_err(|source| KeyStoreError::WriteError { path, source })
    }

    /// Derive the AES-256-GCM cipher for a given salt from the store passphrase
    fn derive_cipher(&self, role: &str, salt: &[u8]) -> Result<Aes256Gcm, KeyStoreError> {
        let params = scrypt::Params::new(SCRYPT_LOG_N, SCRYPT_R, SCRYPT_P, 32).map_err(|e| {
            KeyStoreError::SealError {
                role: role.to_string(),
                reason: format!("invalid scrypt parameters: {e}"),
            }
        })?;
        let mut derived = [0u8; 32];
        scrypt::scrypt(self.passphrase.as_bytes(), salt, &params, &mut derived).map_err(|e| {
            KeyStoreError::SealError {
                role: role.to_string(),
                reason: format!("key derivation failed: {e}"),
            }
        })?;
        Aes256Gcm::new_from_slice(&derived).map_err(|e| KeyStoreError::SealError {
            role: role.to_string(),
            reason: format!("cipher construction failed: {e}"),
        })
    }
}

fn read_key_file(role: &str, path: &Path) -> Result<String, KeyStoreError> {
    if !path.exists() {
        return Err(KeyStoreError::KeyNotFound {
            role: role.to_string(),
            path: path.to_path_buf(),
        });
    }
    fs::read_to_string(path).map_err(|source| KeyStoreError::ReadError {
        path: path.to_path_buf(),
        source,
    })
}

fn decode_hex_field(role: &str, field: &str, value: &str) -> Result<Vec<u8>, KeyStoreError> {
    hex::decode(value).map_err(|e| KeyStoreError::InvalidKey {
        role: role.to_string(),
        reason: format!("{field} is not valid hex: {e}"),
    })
}
