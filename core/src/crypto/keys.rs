// ## 📂 File: `src/crypto/keys.rs`

//! Key entities and key rings.
//!
//! A `KeyEntity` is an X25519 encryption key with a creation time and an
//! optional secret half. The secret may be passphrase-locked (Argon2id +
//! AES-256-GCM); a ring holding any locked secret reports `is_locked()`.
//!
//! Design notes:
//! - Key ids are derived from (created, public key) so the same material
//!   imported twice gets the same id.
//! - `unlock` opens every entity that accepts the passphrase. It fails only
//!   when the ring is left without any unlocked secret.
//! - Keys created after "now" (per the owning time policy) are not usable yet.

use chrono::{DateTime, TimeZone, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use tracing::debug;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroizing;

use crate::constants::{pk_ids, KDF_SALT_LEN, KEY_ID_LEN, KEY_LEN_32, NONCE_LEN_12};
use crate::crypto::aead::ChunkCipher;
use crate::crypto::kdf::{derive_passphrase_key, KdfParams};
use crate::crypto::types::{KeyError, KeyId};

#[derive(Clone)]
struct LockedSecret {
    params: KdfParams,
    salt: [u8; KDF_SALT_LEN],
    nonce: [u8; NONCE_LEN_12],
    ciphertext: Vec<u8>,
}

#[derive(Clone)]
enum SecretKeyMaterial {
    Unlocked(StaticSecret),
    Locked(LockedSecret),
}

/// One X25519 encryption key, public half always present.
#[derive(Clone)]
pub struct KeyEntity {
    key_id: KeyId,
    created: DateTime<Utc>,
    public: PublicKey,
    secret: Option<SecretKeyMaterial>,
}

impl std::fmt::Debug for KeyEntity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let secret = match &self.secret {
            None => "none",
            Some(SecretKeyMaterial::Unlocked(_)) => "unlocked",
            Some(SecretKeyMaterial::Locked(_)) => "locked",
        };
        f.debug_struct("KeyEntity")
            .field("key_id", &self.key_id)
            .field("created", &self.created)
            .field("secret", &secret)
            .finish()
    }
}

impl KeyEntity {
    /// Import a public key (encryption only).
    pub fn from_public(public: [u8; KEY_LEN_32], created: DateTime<Utc>) -> Self {
        let created = truncate_to_secs(created);
        let public = PublicKey::from(public);
        Self {
            key_id: compute_key_id(&public, &created),
            created,
            public,
            secret: None,
        }
    }

    /// Import an unlocked secret key; the public half is derived.
    pub fn from_secret(secret: [u8; KEY_LEN_32], created: DateTime<Utc>) -> Self {
        let created = truncate_to_secs(created);
        let secret = StaticSecret::from(secret);
        let public = PublicKey::from(&secret);
        Self {
            key_id: compute_key_id(&public, &created),
            created,
            public,
            secret: Some(SecretKeyMaterial::Unlocked(secret)),
        }
    }

    pub fn key_id(&self) -> KeyId {
        self.key_id
    }

    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    pub fn has_secret(&self) -> bool {
        self.secret.is_some()
    }

    pub fn is_locked(&self) -> bool {
        matches!(self.secret, Some(SecretKeyMaterial::Locked(_)))
    }

    /// A key is usable once its creation time has been reached.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.created <= now
    }

    /// Public-only copy, suitable for handing to an encrypting party.
    pub fn to_public(&self) -> KeyEntity {
        Self {
            key_id: self.key_id,
            created: self.created,
            public: self.public,
            secret: None,
        }
    }

    /// Unlocked secret half, if any.
    pub fn secret(&self) -> Option<&StaticSecret> {
        match &self.secret {
            Some(SecretKeyMaterial::Unlocked(s)) => Some(s),
            _ => None,
        }
    }

    /// Encrypt the secret half under `passphrase`. No-op for public-only or already locked keys.
    pub fn lock(&mut self, passphrase: &[u8], params: KdfParams) -> Result<(), KeyError> {
        let secret = match &self.secret {
            Some(SecretKeyMaterial::Unlocked(s)) => s,
            _ => return Ok(()),
        };

        let mut salt = [0u8; KDF_SALT_LEN];
        let mut nonce = [0u8; NONCE_LEN_12];
        OsRng.fill_bytes(&mut salt);
        OsRng.fill_bytes(&mut nonce);

        let lock_key = derive_passphrase_key(passphrase, &salt, &params)?;
        let plain = Zeroizing::new(secret.to_bytes());
        let ciphertext = ChunkCipher::new(&lock_key[..])
            .and_then(|c| c.seal(&nonce, self.key_id.as_bytes(), &plain[..]))
            .map_err(|e| KeyError::InvalidKey(e.to_string()))?;

        self.secret = Some(SecretKeyMaterial::Locked(LockedSecret {
            params,
            salt,
            nonce,
            ciphertext,
        }));
        Ok(())
    }

    /// Decrypt a locked secret without mutating the entity.
    fn open_locked(&self, passphrase: &[u8]) -> Result<Option<StaticSecret>, KeyError> {
        let locked = match &self.secret {
            Some(SecretKeyMaterial::Locked(l)) => l,
            _ => return Ok(None),
        };

        let lock_key = derive_passphrase_key(passphrase, &locked.salt, &locked.params)?;
        let plain = ChunkCipher::new(&lock_key[..])
            .map_err(|e| KeyError::InvalidKey(e.to_string()))?
            .open(&locked.nonce, self.key_id.as_bytes(), &locked.ciphertext)
            .map(Zeroizing::new)
            .map_err(|_| KeyError::BadPassphrase)?;

        if plain.len() != KEY_LEN_32 {
            return Err(KeyError::InvalidKey(format!("secret key has {} bytes", plain.len())));
        }
        let mut bytes = Zeroizing::new([0u8; KEY_LEN_32]);
        bytes.copy_from_slice(&plain);
        let secret = StaticSecret::from(*bytes);

        if PublicKey::from(&secret) != self.public {
            return Err(KeyError::InvalidKey("secret does not match public key".into()));
        }
        Ok(Some(secret))
    }
}

/// Collection of key entities used for encryption and decryption.
#[derive(Clone, Debug, Default)]
pub struct KeyRing {
    entities: Vec<KeyEntity>,
}

impl KeyRing {
    pub fn new(entities: Vec<KeyEntity>) -> Self {
        Self { entities }
    }

    pub fn from_entity(entity: KeyEntity) -> Self {
        Self { entities: vec![entity] }
    }

    pub fn push(&mut self, entity: KeyEntity) {
        self.entities.push(entity);
    }

    pub fn entities(&self) -> &[KeyEntity] {
        &self.entities
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// True when at least one secret key still needs a passphrase.
    pub fn is_locked(&self) -> bool {
        self.entities.iter().any(KeyEntity::is_locked)
    }

    /// True when at least one secret key is ready for decryption.
    pub fn has_unlocked_secret(&self) -> bool {
        self.entities.iter().any(|e| e.secret().is_some())
    }

    /// Unlock every locked secret that accepts `passphrase`.
    ///
    /// Entities locked under another passphrase stay locked. The first error
    /// is returned only if the ring ends up with no unlocked secret at all.
    pub fn unlock(&mut self, passphrase: &[u8]) -> Result<(), KeyError> {
        let mut first_error = None;
        for entity in self.entities.iter_mut().filter(|e| e.is_locked()) {
            match entity.open_locked(passphrase) {
                Ok(Some(secret)) => {
                    debug!(key_id = %entity.key_id, "secret key unlocked");
                    entity.secret = Some(SecretKeyMaterial::Unlocked(secret));
                }
                Ok(None) => {}
                Err(e) => {
                    debug!(key_id = %entity.key_id, error = %e, "secret key stays locked");
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) if !self.has_unlocked_secret() => Err(e),
            _ => Ok(()),
        }
    }

    /// Lock every unlocked secret under `passphrase`.
    pub fn lock(&mut self, passphrase: &[u8], params: KdfParams) -> Result<(), KeyError> {
        for entity in &mut self.entities {
            entity.lock(passphrase, params)?;
        }
        Ok(())
    }

    /// Public-only copy of the ring.
    pub fn to_public(&self) -> KeyRing {
        Self {
            entities: self.entities.iter().map(KeyEntity::to_public).collect(),
        }
    }

    /// Unlocked secrets that may open a key packet addressed to `key_id`.
    pub fn decryption_keys(&self, key_id: KeyId, now: DateTime<Utc>) -> Vec<&KeyEntity> {
        self.entities
            .iter()
            .filter(|e| e.secret().is_some() && e.is_valid_at(now))
            .filter(|e| key_id.is_wildcard() || e.key_id == key_id)
            .collect()
    }
}

fn truncate_to_secs(t: DateTime<Utc>) -> DateTime<Utc> {
    let secs = t.timestamp().clamp(0, u32::MAX as i64);
    Utc.timestamp_opt(secs, 0).single().unwrap_or_default()
}

fn compute_key_id(public: &PublicKey, created: &DateTime<Utc>) -> KeyId {
    let mut hasher = Sha256::new();
    hasher.update([pk_ids::X25519]);
    hasher.update((created.timestamp() as u32).to_be_bytes());
    hasher.update(public.as_bytes());
    let digest = hasher.finalize();

    let mut id = [0u8; KEY_ID_LEN];
    id.copy_from_slice(&digest[..KEY_ID_LEN]);
    KeyId(id)
}
