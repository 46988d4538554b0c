//! AES-256-GCM encryption at rest (§4.10).
//!
//! Ciphertext layout on disk: `nonce(12) || tag(16) || ciphertext`. The
//! donor has no encryption layer; `aes-gcm` and its nonce handling are
//! grounded on the `harborgrid-justin-caddy` manifest, the closest example
//! in the pack that pulls in an AEAD + PBKDF2 stack for data protection.

use crate::error::{Result, StoreError};
use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Key, Nonce};

pub const KEY_LEN: usize = 32;
pub const NONCE_LEN: usize = 12;
pub const TAG_LEN: usize = 16;

#[derive(Clone)]
pub struct EncryptionKey {
    pub key_id: String,
    bytes: [u8; KEY_LEN],
}

impl EncryptionKey {
    pub fn new(key_id: impl Into<String>, bytes: [u8; KEY_LEN]) -> Self {
        EncryptionKey {
            key_id: key_id.into(),
            bytes,
        }
    }

    pub fn generate(key_id: impl Into<String>) -> Self {
        use aes_gcm::aead::rand_core::RngCore;
        let mut bytes = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut bytes);
        EncryptionKey::new(key_id, bytes)
    }

    fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.bytes))
    }
}

/// Encrypt `plaintext`, returning `nonce || tag || ciphertext`.
pub fn encrypt(key: &EncryptionKey, plaintext: &[u8]) -> Result<Vec<u8>> {
    let cipher = key.cipher();
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let mut sealed = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|e| StoreError::EncryptionError(e.to_string()))?;
    // `aes-gcm` appends the tag to the ciphertext; split it out so the
    // on-disk layout keeps the tag directly after the nonce.
    if sealed.len() < TAG_LEN {
        return Err(StoreError::EncryptionError("ciphertext shorter than tag".into()));
    }
    let tag = sealed.split_off(sealed.len() - TAG_LEN);
    let mut out = Vec::with_capacity(NONCE_LEN + TAG_LEN + sealed.len());
    out.extend_from_slice(nonce.as_slice());
    out.extend_from_slice(&tag);
    out.extend_from_slice(&sealed);
    Ok(out)
}

/// Decrypt a `nonce || tag || ciphertext` blob. Fails on tampering
/// (authentication-tag mismatch) or a blob shorter than `nonce + tag`.
pub fn decrypt(key: &EncryptionKey, sealed: &[u8]) -> Result<Vec<u8>> {
    if sealed.len() < NONCE_LEN + TAG_LEN {
        return Err(StoreError::EncryptionError(
            "ciphertext shorter than nonce + tag".into(),
        ));
    }
    let nonce = Nonce::from_slice(&sealed[..NONCE_LEN]);
    let tag = &sealed[NONCE_LEN..NONCE_LEN + TAG_LEN];
    let ciphertext = &sealed[NONCE_LEN + TAG_LEN..];

    // `aes-gcm` expects `ciphertext || tag`, so reassemble before decrypting.
    let mut combined = Vec::with_capacity(ciphertext.len() + TAG_LEN);
    combined.extend_from_slice(ciphertext);
    combined.extend_from_slice(tag);

    key.cipher()
        .decrypt(nonce, combined.as_slice())
        .map_err(|_| StoreError::EncryptionError("authentication failed".into()))
}
