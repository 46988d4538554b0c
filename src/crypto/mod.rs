//! Encryption service (§4.10): AES-256-GCM at rest, PBKDF2-HMAC-SHA-256 for
//! password-derived keys, and a small key registry to support rotation.

pub mod aead;
pub mod kdf;

pub use aead::{decrypt, encrypt, EncryptionKey, KEY_LEN, NONCE_LEN, TAG_LEN};
pub use kdf::{derive, derive_with_random_salt, split, MIN_ITERATIONS, SALT_LEN};

use crate::error::{Result, StoreError};
use std::collections::HashMap;

/// Tracks the currently active key plus any retired keys still needed to
/// decrypt records written before a rotation.
pub struct KeyRegistry {
    active: String,
    keys: HashMap<String, EncryptionKey>,
}

impl KeyRegistry {
    pub fn new(initial: EncryptionKey) -> Self {
        let mut keys = HashMap::new();
        let active = initial.key_id.clone();
        keys.insert(active.clone(), initial);
        KeyRegistry { active, keys }
    }

    pub fn active_key(&self) -> &EncryptionKey {
        self.keys.get(&self.active).expect("active key always present")
    }

    pub fn get(&self, key_id: &str) -> Option<&EncryptionKey> {
        self.keys.get(key_id)
    }

    /// Register a new key and make it active for future encryptions.
    /// Older keys remain available so records encrypted under them still
    /// decrypt.
    pub fn rotate(&mut self, new_key: EncryptionKey) {
        self.active = new_key.key_id.clone();
        self.keys.insert(self.active.clone(), new_key);
    }

    pub fn encrypt(&self, plaintext: &[u8]) -> Result<(String, Vec<u8>)> {
        let key = self.active_key();
        Ok((key.key_id.clone(), encrypt(key, plaintext)?))
    }

    pub fn decrypt(&self, key_id: &str, sealed: &[u8]) -> Result<Vec<u8>> {
        let key = self
            .keys
            .get(key_id)
            .ok_or_else(|| StoreError::EncryptionError(format!("unknown key id: {key_id}")))?;
        decrypt(key, sealed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotation_keeps_old_key_decryptable() {
        let mut registry = KeyRegistry::new(EncryptionKey::generate("v1"));
        let (key_id, sealed) = registry.encrypt(b"secret").unwrap();
        assert_eq!(key_id, "v1");

        registry.rotate(EncryptionKey::generate("v2"));
        let (new_key_id, _) = registry.encrypt(b"secret2").unwrap();
        assert_eq!(new_key_id, "v2");

        // Old ciphertext still decrypts against its original key id.
        assert_eq!(registry.decrypt(&key_id, &sealed).unwrap(), b"secret");
    }

    #[test]
    fn unknown_key_id_errors() {
        let registry = KeyRegistry::new(EncryptionKey::generate("v1"));
        assert!(registry.decrypt("missing", &[0u8; 40]).is_err());
    }
}
