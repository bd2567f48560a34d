// ## 📂 File: `src/crypto/aead.rs`

//! src/crypto/aead.rs
//! AEAD interface for AES-256-GCM, the fixed cipher of this design.
//!
//! Design notes:
//! - 32-byte keys and 12-byte nonces.
//! - Tag verification is constant-time and fails closed (no partial plaintext).
//! - Caller provides nonce and AAD per chunk; the nonce schedule lives in `nonce.rs`.
//! - Empty plaintext is allowed: the SEIPD final tag is a seal over nothing.

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};

use crate::constants::{KEY_LEN_32, NONCE_LEN_12, TAG_LEN};
use crate::crypto::types::CryptoError;

/// AES-256-GCM instance bound to one message or key-wrap key.
#[derive(Clone)]
pub struct ChunkCipher {
    cipher: Aes256Gcm,
}

impl ChunkCipher {
    pub fn new(key: &[u8]) -> Result<Self, CryptoError> {
        if key.len() != KEY_LEN_32 {
            return Err(CryptoError::InvalidKeyLen {
                expected: KEY_LEN_32,
                actual: key.len(),
            });
        }
        let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| CryptoError::InvalidKeyLen {
            expected: KEY_LEN_32,
            actual: key.len(),
        })?;
        Ok(Self { cipher })
    }

    /// AEAD seal (encrypt) plaintext with nonce and AAD. Output is ciphertext || tag.
    pub fn seal(&self, nonce_12: &[u8], aad: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        check_nonce(nonce_12)?;
        self.cipher
            .encrypt(Nonce::from_slice(nonce_12), Payload { msg: plaintext, aad })
            .map_err(|_| CryptoError::Failure("AES-GCM seal failed".into()))
    }

    /// AEAD open (decrypt) ciphertext || tag with nonce and AAD.
    pub fn open(&self, nonce_12: &[u8], aad: &[u8], ciphertext_and_tag: &[u8]) -> Result<Vec<u8>, CryptoError> {
        check_nonce(nonce_12)?;
        if ciphertext_and_tag.len() < TAG_LEN {
            return Err(CryptoError::Failure("ciphertext too short".into()));
        }
        self.cipher
            .decrypt(Nonce::from_slice(nonce_12), Payload { msg: ciphertext_and_tag, aad })
            .map_err(|_| CryptoError::TagMismatch)
    }
}

#[inline]
fn check_nonce(nonce_12: &[u8]) -> Result<(), CryptoError> {
    if nonce_12.len() != NONCE_LEN_12 {
        return Err(CryptoError::InvalidNonceLen {
            expected: NONCE_LEN_12,
            actual: nonce_12.len(),
        });
    }
    Ok(())
}
