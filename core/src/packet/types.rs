// ## 📂 File: `src/packet/types.rs`

//! packet/types.rs
//! Packet registries, body lengths and the packet-layer error.
//!
//! Industry notes:
//! - Tags and algorithm ids follow the OpenPGP registries (RFC 9580).
//! - Unknown ids are reported by number (`enum_name_or_hex`) so malformed
//!   streams give actionable errors.

use std::io;
use std::sync::Arc;

use num_enum::TryFromPrimitive;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{aead_ids, cipher_ids, tag_ids};
use crate::crypto::{CryptoError, KeyError};
use crate::utils::enum_name_or_hex;

/// Packet tags understood by the separator and the message reader.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, TryFromPrimitive)]
pub enum Tag {
    PublicKeyEncryptedSessionKey = tag_ids::PKESK,
    SymmetricKeyEncryptedSessionKey = tag_ids::SKESK,
    Marker = tag_ids::MARKER,
    LiteralData = tag_ids::LITERAL,
    SymEncryptedIntegrityProtectedData = tag_ids::SEIPD,
    Padding = tag_ids::PADDING,
}

impl Tag {
    /// Only data-bearing packets may use partial body lengths.
    pub fn allows_partial(self) -> bool {
        matches!(self, Tag::LiteralData | Tag::SymEncryptedIntegrityProtectedData)
    }

    /// Session-key packets belong to the key half of a split.
    pub fn is_session_key(self) -> bool {
        matches!(
            self,
            Tag::PublicKeyEncryptedSessionKey | Tag::SymmetricKeyEncryptedSessionKey
        )
    }

    /// New-format tag octet (`0xC0 | tag`).
    pub fn new_format_octet(self) -> u8 {
        0xC0 | self as u8
    }
}

/// Symmetric ciphers recognised in packet headers. Only AES-256 is produced.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, TryFromPrimitive, Serialize, Deserialize)]
pub enum SymmetricAlgorithm {
    Aes128 = cipher_ids::AES128,
    Aes192 = cipher_ids::AES192,
    Aes256 = cipher_ids::AES256,
}

impl SymmetricAlgorithm {
    pub fn name(self) -> &'static str {
        match self {
            SymmetricAlgorithm::Aes128 => "aes128",
            SymmetricAlgorithm::Aes192 => "aes192",
            SymmetricAlgorithm::Aes256 => "aes256",
        }
    }
}

impl std::fmt::Display for SymmetricAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// AEAD modes recognised in SEIPD v2 headers.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, TryFromPrimitive)]
pub enum AeadMode {
    Gcm = aead_ids::GCM,
}

/// Body length as encoded in a packet header.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BodyLength {
    /// Definite length: the whole (remaining) body.
    Fixed(u32),
    /// Partial length: this many octets follow, then another length header.
    Partial(u32),
    /// Old-format indeterminate length: body runs to end of stream.
    Indeterminate,
}

#[derive(Debug, Clone, Error)]
pub enum PacketError {
    #[error("I/O error: {0}")]
    Io(Arc<io::Error>),

    #[error("stream truncated inside a packet")]
    Truncated,

    #[error("unknown packet tag: {}", registry_name::<Tag>(.0))]
    UnknownTag(u8),

    #[error("unexpected {found:?} packet: {context}")]
    UnexpectedPacket { found: Tag, context: &'static str },

    #[error("malformed packet: {0}")]
    Malformed(String),

    #[error("invalid length encoding: {0}")]
    InvalidLength(String),

    #[error("message has no session key packet")]
    MissingKeyPacket,

    #[error("message ended before a data packet was found")]
    MissingDataPacket,

    #[error("unsupported {packet} packet version {version}")]
    UnsupportedVersion { packet: &'static str, version: u8 },

    #[error("unsupported symmetric cipher: {}", registry_name::<SymmetricAlgorithm>(.0))]
    UnsupportedCipher(u8),

    #[error("unsupported AEAD mode: {}", registry_name::<AeadMode>(.0))]
    UnsupportedAead(u8),

    #[error("unsupported public-key algorithm: {0}")]
    UnsupportedPublicKeyAlgorithm(u8),

    #[error("no private key in the key ring matches the message")]
    NoMatchingKey,

    #[error("recipient key error: {0}")]
    Key(#[from] KeyError),

    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),
}

fn registry_name<T>(raw: &u8) -> String
where
    T: TryFromPrimitive<Primitive = u8> + std::fmt::Debug,
{
    enum_name_or_hex::<T>(*raw)
}

impl From<io::Error> for PacketError {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            return PacketError::Truncated;
        }
        // Errors raised inside our own Read/Write adapters travel as io::Error
        // and are unwrapped back here.
        if e.get_ref().map_or(false, |inner| inner.is::<PacketError>()) {
            if let Some(inner) = e.into_inner() {
                if let Ok(packet) = inner.downcast::<PacketError>() {
                    return *packet;
                }
            }
            return PacketError::Malformed("unreadable wrapped packet error".into());
        }
        PacketError::Io(Arc::new(e))
    }
}

impl From<PacketError> for io::Error {
    fn from(e: PacketError) -> Self {
        match e {
            PacketError::Truncated => io::Error::new(io::ErrorKind::UnexpectedEof, e),
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}
