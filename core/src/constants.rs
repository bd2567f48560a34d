// ## 📂 File: `src/constants.rs`

//! Protocol constants shared by the packet layer, the attachment pipeline and config.
//!
//! Registry ids follow the OpenPGP numbering (RFC 9580) so the packet stream
//! reads naturally to anyone familiar with that format.

/// Defaults when a config field is left out.
pub const DEFAULT_PARTIAL_CHUNK_SIZE: usize = 64 * 1024; // 64 KiB partial body length
/// AEAD chunk size octet `c`: chunk = 1 << (c + 6). 10 → 64 KiB.
pub const DEFAULT_AEAD_CHUNK_OCTET: u8 = 10;
/// Conduit capacity in chunks. 0 = rendezvous (writer blocks until read).
pub const DEFAULT_CONDUIT_CAPACITY: usize = 0;
/// Low-memory mode reclaims slack every megabyte.
pub const LOW_MEMORY_RECLAIM_THRESHOLD: usize = 1 << 20;

/// Partial body lengths must be powers of two in this range.
/// The first partial length must be at least 512 octets.
pub const MIN_PARTIAL_CHUNK_SIZE: usize = 512;
pub const MAX_PARTIAL_CHUNK_SIZE: usize = 1 << 30;

/// Largest AEAD chunk octet accepted (RFC 9580 caps it at 16 → 4 MiB).
pub const MAX_AEAD_CHUNK_OCTET: u8 = 16;

/// Scratch buffer used when copying packet bodies.
pub const SCRATCH_BUF_LEN: usize = 64 * 1024;

/// Upper bound on how much of the size hint is allocated up front.
/// Larger messages grow the data buffer on demand.
pub const MAX_DATA_PREALLOC: usize = 16 << 20;

/// Key packet scratch estimate: one PKESK for one X25519 recipient is ~96 bytes.
pub const KEY_PACKET_ESTIMATE: usize = 128;

/// Fixed sizes.
pub const KEY_LEN_32: usize = 32;
pub const TAG_LEN: usize = 16;
pub const NONCE_LEN_12: usize = 12;
pub const SEIPD_SALT_LEN: usize = 32;
pub const KEY_ID_LEN: usize = 8;
pub const KDF_SALT_LEN: usize = 16;

/// Packet tags (RFC 9580 §5).
pub mod tag_ids {
    pub const PKESK: u8 = 1;
    pub const SKESK: u8 = 3;
    pub const MARKER: u8 = 10;
    pub const LITERAL: u8 = 11;
    pub const SEIPD: u8 = 18;
    pub const PADDING: u8 = 21;
}

/// Symmetric cipher ids.
pub mod cipher_ids {
    pub const AES128: u8 = 7;
    pub const AES192: u8 = 8;
    pub const AES256: u8 = 9;
}

/// AEAD mode ids.
pub mod aead_ids {
    pub const GCM: u8 = 3;
}

/// Public-key algorithm ids.
pub mod pk_ids {
    pub const X25519: u8 = 25;
}

/// Packet versions produced and accepted.
pub const PKESK_VERSION: u8 = 3;
pub const SEIPD_VERSION: u8 = 2;

/// Literal data format octet for binary payloads.
pub const LITERAL_FORMAT_BINARY: u8 = b'b';

/// HKDF info for the X25519 key-encryption key.
pub const X25519_KEK_INFO: &[u8] = b"attachment-core X25519 kek";

/// Armor framing.
pub const ARMOR_BEGIN: &str = "-----BEGIN PGP MESSAGE-----";
pub const ARMOR_END: &str = "-----END PGP MESSAGE-----";
pub const ARMOR_LINE_LEN: usize = 64;
