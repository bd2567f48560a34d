// ## 📂 File: `src/crypto/session.rs`

//! Session key generation and X25519 wrapping.
//!
//! Each message gets a fresh random 256-bit session key. For every recipient
//! the key is wrapped under a KEK derived from an ephemeral X25519 exchange;
//! the ephemeral public key travels in the key packet.
//!
//! Security notes:
//! - The KEK is single-use (fresh ephemeral per wrap), so a fixed zero nonce is safe.
//! - Non-contributory exchanges (low-order recipient points) are rejected.

use rand::rngs::OsRng;
use rand::RngCore;
use x25519_dalek::{EphemeralSecret, PublicKey, StaticSecret};
use zeroize::Zeroizing;

use crate::constants::{cipher_ids, pk_ids, KEY_LEN_32, NONCE_LEN_12, PKESK_VERSION};
use crate::crypto::aead::ChunkCipher;
use crate::crypto::kdf::derive_x25519_kek;
use crate::crypto::types::CryptoError;

const WRAP_NONCE: [u8; NONCE_LEN_12] = [0u8; NONCE_LEN_12];
const WRAP_AAD: [u8; 3] = [PKESK_VERSION, pk_ids::X25519, cipher_ids::AES256];

/// 256-bit content-encryption key. Zeroized on drop.
pub struct SessionKey(Zeroizing<[u8; KEY_LEN_32]>);

impl SessionKey {
    pub fn generate() -> Self {
        let mut key = Zeroizing::new([0u8; KEY_LEN_32]);
        OsRng.fill_bytes(&mut key[..]);
        Self(key)
    }

    pub fn from_bytes(bytes: [u8; KEY_LEN_32]) -> Self {
        Self(Zeroizing::new(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN_32] {
        &self.0
    }
}

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionKey").field("bytes", &"[REDACTED]").finish()
    }
}

/// Output of wrapping a session key for one recipient.
pub struct WrappedKey {
    pub ephemeral_public: [u8; 32],
    pub wrapped: Vec<u8>,
}

/// Wrap `session` for `recipient` using a fresh ephemeral key.
pub fn wrap_session_key(session: &SessionKey, recipient: &PublicKey) -> Result<WrappedKey, CryptoError> {
    let ephemeral = EphemeralSecret::random_from_rng(OsRng);
    let ephemeral_public = PublicKey::from(&ephemeral);
    let shared = ephemeral.diffie_hellman(recipient);
    if !shared.was_contributory() {
        return Err(CryptoError::NonContributory);
    }

    let kek = derive_x25519_kek(ephemeral_public.as_bytes(), recipient.as_bytes(), shared.as_bytes())?;
    let wrapped = ChunkCipher::new(&kek[..])?.seal(&WRAP_NONCE, &WRAP_AAD, session.as_bytes())?;

    Ok(WrappedKey {
        ephemeral_public: ephemeral_public.to_bytes(),
        wrapped,
    })
}

/// Recover a session key with the recipient's secret.
pub fn unwrap_session_key(
    secret: &StaticSecret,
    ephemeral_public: &[u8; 32],
    wrapped: &[u8],
) -> Result<SessionKey, CryptoError> {
    let ephemeral = PublicKey::from(*ephemeral_public);
    let shared = secret.diffie_hellman(&ephemeral);
    if !shared.was_contributory() {
        return Err(CryptoError::NonContributory);
    }
    let recipient = PublicKey::from(secret);

    let kek = derive_x25519_kek(ephemeral_public, recipient.as_bytes(), shared.as_bytes())?;
    let plain = Zeroizing::new(ChunkCipher::new(&kek[..])?.open(&WRAP_NONCE, &WRAP_AAD, wrapped)?);
    if plain.len() != KEY_LEN_32 {
        return Err(CryptoError::InvalidKeyLen {
            expected: KEY_LEN_32,
            actual: plain.len(),
        });
    }

    let mut key = [0u8; KEY_LEN_32];
    key.copy_from_slice(&plain);
    Ok(SessionKey::from_bytes(key))
}
