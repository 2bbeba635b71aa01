//! Ed25519 key material for TUF roles
//!
//! A role's verification key is the TUF public-key object published inside
//! root metadata (and inside targets metadata for delegated roles); its key ID
//! is the SHA-256 digest of the object's canonical JSON form. Signing keys
//! wrap an ed25519 seed loaded from the passphrase-protected key store.

pub mod error;
pub mod store;

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub use error::KeyStoreError;

/// Key type identifier published in metadata
pub const KEY_TYPE: &str = "ed25519";

/// Signature scheme identifier published in metadata
pub const KEY_SCHEME: &str = "ed25519";

/// Public key value wrapper, as serialized inside metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyVal {
    /// Hex-encoded 32-byte ed25519 public key
    pub public: String,
}

/// The TUF public-key object: exactly what gets embedded in metadata and
/// written to `<role>.pub` files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TufKey {
    /// Key type (always "ed25519")
    pub keytype: String,
    /// Signature scheme (always "ed25519")
    pub scheme: String,
    /// The key material itself
    pub keyval: KeyVal,
}

impl TufKey {
    /// Build the TUF key object for an ed25519 verifying key
    pub fn from_verifying_key(key: &VerifyingKey) -> Self {
        TufKey {
            keytype: KEY_TYPE.to_string(),
            scheme: KEY_SCHEME.to_string(),
            keyval: KeyVal {
                public: hex::encode(key.to_bytes()),
            },
        }
    }

    /// Compute the key ID: hex SHA-256 of the canonical JSON form of this object
    pub fn key_id(&self) -> Result<String, KeyStoreError> {
        let canonical = serde_jcs::to_vec(self)
            .map_err(|source| KeyStoreError::CanonicalizeError { source })?;
        Ok(hex::encode(Sha256::digest(&canonical)))
    }
}

/// A role verification key: the published TUF key object plus the parsed
/// ed25519 key and its precomputed key ID
#[derive(Debug, Clone)]
pub struct PublicKey {
    tuf: TufKey,
    key: VerifyingKey,
    key_id: String,
}

impl PublicKey {
    /// Wrap an ed25519 verifying key
    pub fn new(key: VerifyingKey) -> Result<Self, KeyStoreError> {
        let tuf = TufKey::from_verifying_key(&key);
        let key_id = tuf.key_id()?;
        Ok(PublicKey { tuf, key, key_id })
    }

    /// Parse a TUF key object (e.g. loaded from a `.pub` file)
    pub fn from_tuf(tuf: TufKey, role: &str) -> Result<Self, KeyStoreError> {
        if tuf.keytype != KEY_TYPE || tuf.scheme != KEY_SCHEME {
            return Err(KeyStoreError::InvalidKey {
                role: role.to_string(),
                reason: format!(
                    "unsupported key type '{}' / scheme '{}'",
                    tuf.keytype, tuf.scheme
                ),
            });
        }
        let raw = hex::decode(&tuf.keyval.public).map_err(|e| KeyStoreError::InvalidKey {
            role: role.to_string(),
            reason: format!("public key is not valid hex: {e}"),
        })?;
        let bytes: [u8; 32] = raw.try_into().map_err(|_| KeyStoreError::InvalidKey {
            role: role.to_string(),
            reason: "public key must be exactly 32 bytes".to_string(),
        })?;
        let key = VerifyingKey::from_bytes(&bytes).map_err(|e| KeyStoreError::InvalidKey {
            role: role.to_string(),
            reason: format!("not a valid ed25519 public key: {e}"),
        })?;
        let key_id = tuf.key_id()?;
        Ok(PublicKey { tuf, key, key_id })
    }

    /// The key ID used to reference this key from role metadata
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// The TUF key object embedded in metadata
    pub fn tuf_key(&self) -> &TufKey {
        &self.tuf
    }

    /// Verify a hex-encoded signature over a message
    pub fn verify(&self, message: &[u8], sig_hex: &str) -> bool {
        let raw = match hex::decode(sig_hex) {
            Ok(raw) => raw,
            Err(_) => return false,
        };
        let bytes: [u8; 64] = match raw.try_into() {
            Ok(bytes) => bytes,
            Err(_) => return false,
        };
        let signature = Signature::from_bytes(&bytes);
        self.key.verify(message, &signature).is_ok()
    }
}

/// A role signing key, held in memory for the duration of one run
#[derive(Debug, Clone)]
pub struct PrivateKey {
    key: SigningKey,
    key_id: String,
}

impl PrivateKey {
    /// Build a signing key from a 32-byte ed25519 seed
    pub fn from_seed(seed: [u8; 32]) -> Result<Self, KeyStoreError> {
        let key = SigningKey::from_bytes(&seed);
        let key_id = TufKey::from_verifying_key(&key.verifying_key()).key_id()?;
        Ok(PrivateKey { key, key_id })
    }

    /// The key ID matching this key's public half
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// The corresponding verification key
    pub fn public(&self) -> Result<PublicKey, KeyStoreError> {
        PublicKey::new(self.key.verifying_key())
    }

    /// Sign a message, returning the hex-encoded signature
    pub fn sign(&self, message: &[u8]) -> String {
        hex::encode(self.key.sign(message).to_bytes())
    }

    /// The raw 32-byte seed (only used by the key store when sealing to disk)
    pub(crate) fn seed(&self) -> [u8; 32] {
        self.key.to_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> PrivateKey {
        PrivateKey::from_seed([7u8; 32]).unwrap()
    }

    #[test]
    fn key_id_is_stable_and_matches_public_half() {
        let private = test_key();
        let public = private.public().unwrap();
        assert_eq!(private.key_id(), public.key_id());
        assert_eq!(public.key_id().len(), 64);
        // Recomputing from the serialized TUF object gives the same ID.
        assert_eq!(public.tuf_key().key_id().unwrap(), public.key_id());
    }

    #[test]
    fn sign_and_verify_roundtrip() {
        let private = test_key();
        let public = private.public().unwrap();
        let sig = private.sign(b"hello");
        assert!(public.verify(b"hello", &sig));
        assert!(!public.verify(b"tampered", &sig));
        assert!(!public.verify(b"hello", "not-hex"));
    }

    #[test]
    fn rejects_malformed_tuf_keys() {
        let tuf = TufKey {
            keytype: "rsa".to_string(),
            scheme: KEY_SCHEME.to_string(),
            keyval: KeyVal {
                public: "00".repeat(32),
            },
        };
        assert!(matches!(
            PublicKey::from_tuf(tuf, "root"),
            Err(KeyStoreError::InvalidKey { .. })
        ));

        let tuf = TufKey {
            keytype: KEY_TYPE.to_string(),
            scheme: KEY_SCHEME.to_string(),
            keyval: KeyVal {
                public: "abcd".to_string(),
            },
        };
        assert!(matches!(
            PublicKey::from_tuf(tuf, "root"),
            Err(KeyStoreError::InvalidKey { .. })
        ));
    }
}
