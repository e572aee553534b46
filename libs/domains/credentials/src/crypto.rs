//! AES-256-GCM encryption for credential secret payloads.
//!
//! The cipher key is derived from an operator-chosen secret string with
//! SHA-256, so the environment only ever carries the passphrase. The
//! random nonce is prepended to each ciphertext.

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use sha2::{Digest, Sha256};

use crate::error::{CredentialError, CredentialResult};

const NONCE_LEN: usize = 12;

/// Process-level cipher for credential secrets
#[derive(Clone)]
pub struct SecretCipher {
    cipher: Aes256Gcm,
}

impl SecretCipher {
    /// Derive the AES-256 key from operator key material
    pub fn from_key_material(key_material: &str) -> Self {
        let digest = Sha256::digest(key_material.as_bytes());
        let key = Key::<Aes256Gcm>::from_slice(&digest);
        Self {
            cipher: Aes256Gcm::new(key),
        }
    }

    /// Encrypt a plaintext payload; returns nonce || ciphertext
    pub fn encrypt(&self, plaintext: &[u8]) -> CredentialResult<Vec<u8>> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext)
            .map_err(|_| CredentialError::Crypto("encryption failed".to_string()))?;

        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(nonce.as_slice());
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    /// Decrypt a nonce || ciphertext blob
    pub fn decrypt(&self, blob: &[u8]) -> CredentialResult<Vec<u8>> {
        if blob.len() <= NONCE_LEN {
            return Err(CredentialError::Crypto(
                "ciphertext too short".to_string(),
            ));
        }

        let (nonce_bytes, ciphertext) = blob.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce_bytes);

        self.cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| CredentialError::Crypto("decryption failed, wrong key?".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let cipher = SecretCipher::from_key_material("test-key-material");
        let plaintext = br#"{"api_key":"rp-12345"}"#;

        let blob = cipher.encrypt(plaintext).unwrap();
        assert_ne!(&blob[NONCE_LEN..], plaintext.as_slice());

        let decrypted = cipher.decrypt(&blob).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_decrypt_with_wrong_key_fails() {
        let cipher = SecretCipher::from_key_material("key-a");
        let other = SecretCipher::from_key_material("key-b");

        let blob = cipher.encrypt(b"secret").unwrap();
        assert!(other.decrypt(&blob).is_err());
    }

    #[test]
    fn test_decrypt_truncated_blob_fails() {
        let cipher = SecretCipher::from_key_material("key");
        assert!(cipher.decrypt(&[0u8; 4]).is_err());
    }

    #[test]
    fn test_nonce_uniqueness() {
        let cipher = SecretCipher::from_key_material("key");
        let a = cipher.encrypt(b"same plaintext").unwrap();
        let b = cipher.encrypt(b"same plaintext").unwrap();
        assert_ne!(a, b);
    }
}
