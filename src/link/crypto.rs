// Link Cipher
// AEAD envelope for tracker link payloads

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Length of the nonce prepended to every sealed payload
pub const NONCE_LENGTH: usize = 12;

// ============================================================================
// CRYPTO ERRORS
// ============================================================================

/// Errors that can occur while sealing or opening link payloads
#[derive(Debug, Clone, Error)]
pub enum CryptoError {
    #[error("Invalid key material: {0}")]
    InvalidKey(String),

    #[error("Encryption failed")]
    EncryptionFailed,

    #[error("Payload authentication failed")]
    AuthenticationFailed,

    #[error("Sealed payload too short")]
    PayloadTooShort,
}

// ============================================================================
// LINK CIPHER
// ============================================================================

/// AES-256-GCM envelope keyed from a pre-shared key string.
///
/// Sealed format: 12-byte nonce followed by ciphertext and tag. The tag
/// doubles as the integrity check for received frames.
pub struct LinkCipher {
    cipher: Aes256Gcm,
}

impl LinkCipher {
    /// Derive the AES key from the pre-shared key and build the cipher
    pub fn new(pre_shared_key: &str) -> Result<Self, CryptoError> {
        if pre_shared_key.is_empty() {
            return Err(CryptoError::InvalidKey(
                "pre-shared key must not be empty".to_string(),
            ));
        }

        let key = Sha256::digest(pre_shared_key.as_bytes());
        let cipher = Aes256Gcm::new_from_slice(&key)
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;

        Ok(Self { cipher })
    }

    /// Seal a payload under a fresh random nonce
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let mut nonce_bytes = [0u8; NONCE_LENGTH];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext)
            .map_err(|_| CryptoError::EncryptionFailed)?;

        let mut sealed = Vec::with_capacity(NONCE_LENGTH + ciphertext.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&ciphertext);
        Ok(sealed)
    }

    /// Open a sealed payload, verifying the authentication tag
    pub fn decrypt(&self, sealed: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if sealed.len() < NONCE_LENGTH {
            return Err(CryptoError::PayloadTooShort);
        }

        let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LENGTH);
        let nonce = Nonce::from_slice(nonce_bytes);

        self.cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| CryptoError::AuthenticationFailed)
    }
}
