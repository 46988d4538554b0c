//! Password-based key derivation (§4.10): PBKDF2-HMAC-SHA-256 with a
//! caller-supplied iteration count (≥ 1000) and a random 32-byte salt,
//! prepended to the derived key material on output so the salt travels with
//! the derived key rather than needing separate storage.

use super::aead::KEY_LEN;
use crate::error::{Result, StoreError};
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;

pub const SALT_LEN: usize = 32;
pub const MIN_ITERATIONS: u32 = 1000;

/// Derive a key from `password`, generating a fresh random salt.
/// Returns `salt || derived_key`.
pub fn derive_with_random_salt(password: &[u8], iterations: u32) -> Result<Vec<u8>> {
    use aes_gcm::aead::{rand_core::RngCore, OsRng};
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    derive(password, &salt, iterations)
}

/// Derive a key from `password` and an explicit `salt`.
/// Returns `salt || derived_key`.
pub fn derive(password: &[u8], salt: &[u8; SALT_LEN], iterations: u32) -> Result<Vec<u8>> {
    if iterations < MIN_ITERATIONS {
        return Err(StoreError::EncryptionError(format!(
            "pbkdf2 iterations must be >= {MIN_ITERATIONS}"
        )));
    }
    let mut derived = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha256>(password, salt, iterations, &mut derived);
    let mut out = Vec::with_capacity(SALT_LEN + KEY_LEN);
    out.extend_from_slice(salt);
    out.extend_from_slice(&derived);
    Ok(out)
}

/// Split a `salt || derived_key` blob as produced by `derive`/`derive_with_random_salt`.
pub fn split(material: &[u8]) -> Result<(&[u8], &[u8])> {
    if material.len() != SALT_LEN + KEY_LEN {
        return Err(StoreError::EncryptionError(
            "malformed derived key material".into(),
        ));
    }
    Ok(material.split_at(SALT_LEN))
}
