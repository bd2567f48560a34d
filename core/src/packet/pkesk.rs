// ## 📂 File: `src/packet/pkesk.rs`

//! Public-key encrypted session key packet (version 3, X25519).
//!
//! ```text
//! version(3) | key id(8) | algorithm(25) | ephemeral public(32) | len | cipher | wrapped key
//! ```
//! `len` counts the cipher octet plus the wrapped key (AES-256-GCM output,
//! 32 key octets + 16 tag octets).

use std::io::Write;

use x25519_dalek::StaticSecret;

use crate::constants::{pk_ids, KEY_ID_LEN, KEY_LEN_32, PKESK_VERSION, TAG_LEN};
use crate::crypto::{unwrap_session_key, wrap_session_key, KeyEntity, KeyId, SessionKey};
use crate::packet::header::write_packet;
use crate::packet::seipd::parse_cipher;
use crate::packet::types::{PacketError, SymmetricAlgorithm, Tag};

const FIXED_PREFIX: usize = 1 + KEY_ID_LEN + 1 + 32 + 1;
const WRAPPED_LEN: usize = KEY_LEN_32 + TAG_LEN;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pkesk {
    pub key_id: KeyId,
    pub ephemeral_public: [u8; 32],
    pub cipher: SymmetricAlgorithm,
    pub wrapped: Vec<u8>,
}

impl Pkesk {
    /// Wrap `session` for one recipient.
    pub fn for_recipient(session: &SessionKey, recipient: &KeyEntity) -> Result<Self, PacketError> {
        let wrapped = wrap_session_key(session, recipient.public_key())?;
        Ok(Self {
            key_id: recipient.key_id(),
            ephemeral_public: wrapped.ephemeral_public,
            cipher: SymmetricAlgorithm::Aes256,
            wrapped: wrapped.wrapped,
        })
    }

    pub fn to_body(&self) -> Vec<u8> {
        let mut body = Vec::with_capacity(FIXED_PREFIX + 1 + self.wrapped.len());
        body.push(PKESK_VERSION);
        body.extend_from_slice(self.key_id.as_bytes());
        body.push(pk_ids::X25519);
        body.extend_from_slice(&self.ephemeral_public);
        body.push((1 + self.wrapped.len()) as u8);
        body.push(self.cipher as u8);
        body.extend_from_slice(&self.wrapped);
        body
    }

    pub fn write<W: Write>(&self, w: &mut W) -> Result<(), PacketError> {
        write_packet(w, Tag::PublicKeyEncryptedSessionKey, &self.to_body())
    }

    pub fn parse(body: &[u8]) -> Result<Self, PacketError> {
        if body.len() < FIXED_PREFIX {
            return Err(PacketError::Malformed(format!("PKESK body of {} octets", body.len())));
        }
        if body[0] != PKESK_VERSION {
            return Err(PacketError::UnsupportedVersion {
                packet: "PKESK",
                version: body[0],
            });
        }

        let mut key_id = [0u8; KEY_ID_LEN];
        key_id.copy_from_slice(&body[1..1 + KEY_ID_LEN]);
        let algo = body[1 + KEY_ID_LEN];
        if algo != pk_ids::X25519 {
            return Err(PacketError::UnsupportedPublicKeyAlgorithm(algo));
        }

        let mut ephemeral_public = [0u8; 32];
        ephemeral_public.copy_from_slice(&body[2 + KEY_ID_LEN..2 + KEY_ID_LEN + 32]);

        let declared = body[FIXED_PREFIX - 1] as usize;
        let rest = &body[FIXED_PREFIX..];
        if declared != rest.len() || declared != 1 + WRAPPED_LEN {
            return Err(PacketError::Malformed(format!(
                "PKESK wrapped key length {declared}, {} octets present",
                rest.len()
            )));
        }
        let cipher = parse_cipher(rest[0])?;
        if cipher != SymmetricAlgorithm::Aes256 {
            return Err(PacketError::UnsupportedCipher(rest[0]));
        }

        Ok(Self {
            key_id: KeyId(key_id),
            ephemeral_public,
            cipher,
            wrapped: rest[1..].to_vec(),
        })
    }

    pub fn decrypt(&self, secret: &StaticSecret) -> Result<SessionKey, PacketError> {
        Ok(unwrap_session_key(secret, &self.ephemeral_public, &self.wrapped)?)
    }
}
