//! Canonical-JSON signing of metadata payloads
//!
//! Signatures cover the RFC 8785 canonical serialization of the `signed`
//! portion, so the pretty-printed files on disk verify regardless of
//! whitespace or key ordering in transit.

use crate::keys::{PrivateKey, PublicKey};
use crate::metadata::schema::{Signature, Signed};
use serde::Serialize;

/// Sign a metadata payload with each of the given role keys
pub fn sign_metadata<T: Serialize>(
    payload: T,
    keys: &[&PrivateKey],
) -> Result<Signed<T>, serde_json::Error> {
    let canonical = serde_jcs::to_vec(&payload)?;
    let signatures = keys
        .iter()
        .map(|key| Signature {
            keyid: key.key_id().to_string(),
            sig: key.sign(&canonical),
        })
        .collect();
    Ok(Signed {
        signatures,
        signed: payload,
    })
}

/// Check whether a signed payload carries a valid signature from `key`
pub fn verify_metadata<T: Serialize>(
    signed: &Signed<T>,
    key: &PublicKey,
) -> Result<bool, serde_json::Error> {
    let canonical = serde_jcs::to_vec(&signed.signed)?;
    Ok(signed
        .signatures
        .iter()
        .any(|s| s.keyid == key.key_id() && key.verify(&canonical, &s.sig)))
}
