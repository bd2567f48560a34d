// ## 📂 File: `src/crypto/kdf.rs`

//! Key derivation.
//!
//! - HKDF-SHA256 for the per-message key/IV of the data packet and for the
//!   X25519 key-encryption key of the key packet.
//! - Argon2id for passphrase-locked secret keys.
//!
//! Design:
//! - HKDF-Extract(ikm, salt) -> PRK, HKDF-Expand(PRK, info) -> output.
//! - Info always binds the packet identity so keys never cross contexts.

use argon2::{Algorithm, Argon2, Params, Version};
use hkdf::Hkdf;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::constants::{KDF_SALT_LEN, KEY_LEN_32, X25519_KEK_INFO};
use crate::crypto::nonce::GCM_IV_LEN;
use crate::crypto::types::{CryptoError, KeyError};

/// Message key and IV for one data packet.
pub struct MessageKeys {
    pub key: Zeroizing<[u8; KEY_LEN_32]>,
    pub iv: [u8; GCM_IV_LEN],
}

/// Derive the data-packet key and IV from the session key.
///
/// `info` is the packet tag octet followed by the first four body octets
/// (version, cipher, aead mode, chunk octet).
pub fn derive_message_keys(session_key: &[u8], salt: &[u8], info: &[u8]) -> Result<MessageKeys, CryptoError> {
    let hk = Hkdf::<Sha256>::new(Some(salt), session_key);
    let mut okm = Zeroizing::new([0u8; KEY_LEN_32 + GCM_IV_LEN]);
    hk.expand(info, &mut okm[..])
        .map_err(|_| CryptoError::Failure("HKDF expand failed (message keys)".into()))?;

    let mut key = Zeroizing::new([0u8; KEY_LEN_32]);
    key.copy_from_slice(&okm[..KEY_LEN_32]);
    let mut iv = [0u8; GCM_IV_LEN];
    iv.copy_from_slice(&okm[KEY_LEN_32..]);
    Ok(MessageKeys { key, iv })
}

/// Derive the key-encryption key for an X25519 recipient.
///
/// IKM = ephemeral public || recipient public || shared secret.
pub fn derive_x25519_kek(
    ephemeral_public: &[u8; 32],
    recipient_public: &[u8; 32],
    shared_secret: &[u8; 32],
) -> Result<Zeroizing<[u8; KEY_LEN_32]>, CryptoError> {
    let mut ikm = Zeroizing::new([0u8; 96]);
    ikm[..32].copy_from_slice(ephemeral_public);
    ikm[32..64].copy_from_slice(recipient_public);
    ikm[64..].copy_from_slice(shared_secret);

    let hk = Hkdf::<Sha256>::new(None, &ikm[..]);
    let mut kek = Zeroizing::new([0u8; KEY_LEN_32]);
    hk.expand(X25519_KEK_INFO, &mut kek[..])
        .map_err(|_| CryptoError::Failure("HKDF expand failed (X25519 KEK)".into()))?;
    Ok(kek)
}

/// Argon2id parameters stored next to a locked secret key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    /// Memory cost in KiB (default: 65536 = 64 MiB)
    pub mem_cost_kib: u32,
    /// Time cost / iterations (default: 3)
    pub time_cost: u32,
    /// Parallelism (default: 4)
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            mem_cost_kib: 65536,
            time_cost: 3,
            parallelism: 4,
        }
    }
}

impl KdfParams {
    /// Cheap parameters for tests and benches. Never use for real keys.
    pub fn insecure_fast() -> Self {
        Self {
            mem_cost_kib: 1024,
            time_cost: 1,
            parallelism: 1,
        }
    }
}

/// Derive a 256-bit lock key from a passphrase and salt using Argon2id.
pub fn derive_passphrase_key(
    passphrase: &[u8],
    salt: &[u8; KDF_SALT_LEN],
    params: &KdfParams,
) -> Result<Zeroizing<[u8; KEY_LEN_32]>, KeyError> {
    let argon2_params = Params::new(
        params.mem_cost_kib,
        params.time_cost,
        params.parallelism,
        Some(KEY_LEN_32),
    )
    .map_err(|e| KeyError::Kdf(format!("invalid Argon2id params: {e}")))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params);

    let mut key = Zeroizing::new([0u8; KEY_LEN_32]);
    argon2
        .hash_password_into(passphrase, salt, &mut key[..])
        .map_err(|e| KeyError::Kdf(format!("Argon2id failed: {e}")))?;
    Ok(key)
}
