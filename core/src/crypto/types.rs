// ## 📂 File: `src/crypto/types.rs`

use thiserror::Error;

use crate::constants::KEY_ID_LEN;

/// Errors from the symmetric/asymmetric primitives.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// Invalid key length provided to cipher.
    #[error("invalid key length: expected={expected}, actual={actual}")]
    InvalidKeyLen { expected: usize, actual: usize },

    /// Nonce length mismatch (must be 12 bytes for AES-GCM).
    #[error("invalid nonce length: expected={expected}, actual={actual}")]
    InvalidNonceLen { expected: usize, actual: usize },

    /// AEAD tag mismatch (authentication failure).
    #[error("AEAD tag mismatch")]
    TagMismatch,

    /// Diffie-Hellman produced an all-zero shared secret (low-order point).
    #[error("non-contributory key agreement")]
    NonContributory,

    /// General derivation or runtime error with context.
    #[error("crypto failure: {0}")]
    Failure(String),
}

/// Errors from key ring handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    /// Passphrase did not open a locked secret key.
    #[error("incorrect passphrase")]
    BadPassphrase,

    /// Ring has no entity usable for the requested operation.
    #[error("no usable key: {0}")]
    NoUsableKey(String),

    /// Key material failed validation.
    #[error("invalid key material: {0}")]
    InvalidKey(String),

    /// Passphrase KDF could not run with the stored parameters.
    #[error("passphrase KDF failed: {0}")]
    Kdf(String),
}

/// 8-byte key identifier carried in PKESK packets.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct KeyId(pub [u8; KEY_ID_LEN]);

impl KeyId {
    /// Wildcard id: recipient is anonymous, every secret key is tried.
    pub const WILDCARD: KeyId = KeyId([0u8; KEY_ID_LEN]);

    pub fn is_wildcard(&self) -> bool {
        *self == Self::WILDCARD
    }

    pub fn as_bytes(&self) -> &[u8; KEY_ID_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for KeyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "KeyId({})", hex::encode_upper(self.0))
    }
}

impl std::fmt::Display for KeyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&hex::encode_upper(self.0))
    }
}
