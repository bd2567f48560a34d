//! attachment-core
//!
//! Streaming public-key encryption of file attachments, split into a small
//! key packet and a large data packet.
//! Pure Rust. No FFI.

#![forbid(unsafe_code)]

// Shared and top level
pub mod constants;
pub mod types;
pub mod utils;
pub mod config;
pub mod time;

// Building blocks
pub mod crypto;
pub mod packet;
pub mod armor;
pub mod telemetry;

// Attachment pipeline
pub mod attachment;

pub use armor::{armor_message, unarmor, ArmorError};
pub use attachment::{
    separate_key_and_data, split_armor, AttachmentCrypto, AttachmentProcessor, DecryptedAttachment,
};
pub use config::AttachmentConfig;
pub use crypto::{KdfParams, KeyEntity, KeyError, KeyId, KeyRing};
pub use packet::{PacketError, SymmetricAlgorithm};
pub use types::{AttachmentError, EncryptedSplit};

// -----------------------------------------------------------------------------
// Prelude (Rust users)
// -----------------------------------------------------------------------------
pub mod prelude {
    pub use crate::attachment::{split_armor, AttachmentCrypto, AttachmentProcessor};
    pub use crate::config::AttachmentConfig;
    pub use crate::crypto::{KeyEntity, KeyRing};
    pub use crate::telemetry::{Stage, TelemetrySnapshot};
    pub use crate::types::{AttachmentError, EncryptedSplit};
}
