//! attachment/mod.rs
//! Streaming attachment encryption: conduit, split worker, session, decryption.

pub mod pipe;
pub mod separator;
pub mod processor;
pub mod decrypt;
pub mod api;

pub use pipe::{pipe, PipeReader, PipeWriter};
pub use separator::{separate_key_and_data, separate_with_counters, split_armor, SplitReport};
pub use processor::{AttachmentProcessor, SessionParams};
pub use decrypt::{decrypt_split, DecryptedAttachment};
pub use api::AttachmentCrypto;
