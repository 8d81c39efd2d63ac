//! Whole-file encryption for transfers
//!
//! Uses ChaCha20-Poly1305 with a fresh random 256-bit key per transfer.
//! Blobs are laid out as `[nonce (12 bytes)][ciphertext][tag (16 bytes)]`.
//!
//! The key never touches the relay: it travels only inside the share link.

use std::fmt;

use chacha20poly1305::{
    ChaCha20Poly1305, KeyInit, Nonce,
    aead::{Aead, OsRng, rand_core::RngCore},
};
use thiserror::Error;

pub use dropwire_common::link::KEY_SIZE;

/// Nonce size for ChaCha20-Poly1305 (96 bits / 12 bytes)
pub const NONCE_SIZE: usize = 12;

/// Authentication tag size (128 bits / 16 bytes)
pub const TAG_SIZE: usize = 16;

/// Errors that can occur during cryptographic operations
///
/// Every decryption failure (short blob, wrong key, tampering) is the same
/// variant so callers cannot tell them apart.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    #[error("encryption failed")]
    EncryptionFailed,
    #[error("decryption failed")]
    DecryptionFailed,
}

/// A per-transfer symmetric key
#[derive(Clone, PartialEq, Eq)]
pub struct SessionKey([u8; KEY_SIZE]);

impl SessionKey {
    /// Generate a fresh random key
    pub fn generate() -> Self {
        let mut key = [0u8; KEY_SIZE];
        OsRng.fill_bytes(&mut key);
        Self(key)
    }

    /// Wrap raw key bytes (e.g. from a share link)
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Raw key bytes
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }

    fn cipher(&self) -> ChaCha20Poly1305 {
        ChaCha20Poly1305::new(&self.0.into())
    }
}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionKey([REDACTED])")
    }
}

/// Size of the blob produced by encrypting `plaintext_len` bytes
pub fn encrypted_len(plaintext_len: usize) -> usize {
    NONCE_SIZE + plaintext_len + TAG_SIZE
}

/// Encrypt plaintext data
///
/// Returns the nonce prepended to the ciphertext: `[nonce (12 bytes)][ciphertext]`
pub fn encrypt(plaintext: &[u8], key: &SessionKey) -> Result<Vec<u8>, CryptoError> {
    let mut nonce_bytes = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = key
        .cipher()
        .encrypt(nonce, plaintext)
        .map_err(|_| CryptoError::EncryptionFailed)?;

    let mut result = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    result.extend_from_slice(&nonce_bytes);
    result.extend_from_slice(&ciphertext);

    Ok(result)
}

/// Decrypt data that was encrypted with [`encrypt`]
pub fn decrypt(blob: &[u8], key: &SessionKey) -> Result<Vec<u8>, CryptoError> {
    if blob.len() < NONCE_SIZE + TAG_SIZE {
        return Err(CryptoError::DecryptionFailed);
    }

    let (nonce_bytes, ciphertext) = blob.split_at(NONCE_SIZE);
    let nonce = Nonce::from_slice(nonce_bytes);

    key.cipher()
        .decrypt(nonce, ciphertext)
        .map_err(|_| CryptoError::DecryptionFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let key = SessionKey::generate();
        let plaintext = b"Hello, World! This is a test file.";

        let encrypted = encrypt(plaintext, &key).unwrap();
        let decrypted = decrypt(&encrypted, &key).unwrap();

        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_blob_layout() {
        let key = SessionKey::generate();
        let encrypted = encrypt(&[7u8; 100], &key).unwrap();
        assert_eq!(encrypted.len(), encrypted_len(100));
    }

    #[test]
    fn test_encrypt_produces_different_ciphertexts() {
        let key = SessionKey::generate();
        let plaintext = b"Same file";

        let encrypted1 = encrypt(plaintext, &key).unwrap();
        let encrypted2 = encrypt(plaintext, &key).unwrap();

        assert_ne!(encrypted1, encrypted2);
        assert_eq!(decrypt(&encrypted1, &key).unwrap(), plaintext);
        assert_eq!(decrypt(&encrypted2, &key).unwrap(), plaintext);
    }

    #[test]
    fn test_generated_keys_differ() {
        assert_ne!(SessionKey::generate(), SessionKey::generate());
    }

    #[test]
    fn test_wrong_key_fails_decryption() {
        let key1 = SessionKey::generate();
        let key2 = SessionKey::generate();

        let encrypted = encrypt(b"Secret", &key1).unwrap();

        assert_eq!(decrypt(&encrypted, &key2), Err(CryptoError::DecryptionFailed));
    }

    #[test]
    fn test_tampered_data_fails_decryption() {
        let key = SessionKey::generate();
        let mut encrypted = encrypt(b"Original", &key).unwrap();

        encrypted[NONCE_SIZE] ^= 0xFF;

        assert_eq!(decrypt(&encrypted, &key), Err(CryptoError::DecryptionFailed));
    }

    #[test]
    fn test_truncated_blob_fails() {
        let key = SessionKey::generate();
        let encrypted = encrypt(b"Original", &key).unwrap();

        assert_eq!(
            decrypt(&encrypted[..encrypted.len() - 1], &key),
            Err(CryptoError::DecryptionFailed)
        );
        assert_eq!(
            decrypt(&[0u8; NONCE_SIZE - 1], &key),
            Err(CryptoError::DecryptionFailed)
        );
    }

    #[test]
    fn test_empty_plaintext() {
        let key = SessionKey::generate();

        let encrypted = encrypt(b"", &key).unwrap();

        assert_eq!(encrypted.len(), NONCE_SIZE + TAG_SIZE);
        assert!(decrypt(&encrypted, &key).unwrap().is_empty());
    }

    #[test]
    fn test_large_file() {
        let key = SessionKey::generate();
        let plaintext: Vec<u8> = (0..1024 * 1024).map(|i| (i % 251) as u8).collect();

        let encrypted = encrypt(&plaintext, &key).unwrap();

        assert_eq!(decrypt(&encrypted, &key).unwrap(), plaintext);
    }

    #[test]
    fn test_debug_redacts_key() {
        let key = SessionKey::from_bytes([0xab; KEY_SIZE]);
        assert!(!format!("{:?}", key).contains("ab"));
    }
}
