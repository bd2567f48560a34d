// ## 📂 File: `src/crypto/nonce.rs`

//! Deterministic chunk nonce derivation for the SEIPD v2 AEAD stream.
//!
//! Design:
//! - The message IV (4 bytes for GCM) is the static prefix.
//! - The chunk index is appended as a big-endian u64, giving 2^64 unique nonces
//!   per message key.
//! - The final authentication tag uses index = number of chunks, so it never
//!   collides with a data chunk nonce.

use crate::constants::NONCE_LEN_12;

/// IV length for AES-GCM under the SEIPD v2 schedule.
pub const GCM_IV_LEN: usize = NONCE_LEN_12 - 8;

/// Build the 12-byte nonce for `chunk_index`.
#[inline]
pub fn derive_chunk_nonce(iv: &[u8; GCM_IV_LEN], chunk_index: u64) -> [u8; NONCE_LEN_12] {
    let mut nonce = [0u8; NONCE_LEN_12];
    nonce[..GCM_IV_LEN].copy_from_slice(iv);
    nonce[GCM_IV_LEN..].copy_from_slice(&chunk_index.to_be_bytes());
    nonce
}
