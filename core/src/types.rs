// ## 📂 File: `src/types.rs`

//! Top-level result and error types.

use thiserror::Error;

use crate::armor::{armor_message, ArmorError};
use crate::crypto::KeyError;
use crate::packet::{PacketError, SymmetricAlgorithm};

/// Unified attachment error.
/// - `Clone`, so a session can hand the same recorded error to every later call.
/// - I/O failures arrive as `PacketError::Io` (shared behind `Arc`).
#[derive(Debug, Clone, Error)]
pub enum AttachmentError {
    /// Encryption front-end could not be built (no usable key, bad settings).
    #[error("cannot start attachment encryption: {0}")]
    Construction(PacketError),

    /// Plaintext could not be pushed through the encryption front-end.
    #[error("attachment write failed: {0}")]
    Write(PacketError),

    #[error(transparent)]
    Packet(#[from] PacketError),

    #[error(transparent)]
    Armor(#[from] ArmorError),

    /// Key ring could not be unlocked with the given passphrase.
    #[error("cannot decrypt attachment: {0}")]
    Unlock(KeyError),

    #[error("key error: {0}")]
    Key(#[from] KeyError),

    #[error("invalid config: {0}")]
    Config(String),

    /// Split worker panicked or vanished.
    #[error("split worker failed: {0}")]
    Worker(String),

    #[error("attachment processor already finished")]
    Finished,
}

/// Result of splitting an encrypted message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedSplit {
    /// Session-key packet(s), headers included.
    pub key_packet: Vec<u8>,
    /// The encrypted data packet exactly as produced, partial lengths included.
    pub data_packet: Vec<u8>,
    pub algorithm: SymmetricAlgorithm,
}

impl EncryptedSplit {
    /// `key_packet || data_packet`, a complete binary message.
    pub fn concatenated(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.key_packet.len() + self.data_packet.len());
        out.extend_from_slice(&self.key_packet);
        out.extend_from_slice(&self.data_packet);
        out
    }

    /// Armored form of the complete message.
    pub fn armored(&self) -> String {
        armor_message(&self.concatenated())
    }

    /// Release spare capacity of both buffers.
    pub fn shrink_to_fit(&mut self) {
        self.key_packet.shrink_to_fit();
        self.data_packet.shrink_to_fit();
    }

    pub fn len(&self) -> usize {
        self.key_packet.len() + self.data_packet.len()
    }

    pub fn is_empty(&self) -> bool {
        self.key_packet.is_empty() && self.data_packet.is_empty()
    }
}
