// ## 📂 File: `src/attachment/api.rs`

//! Public entry points: one-shot and incremental attachment encryption,
//! attachment decryption.
//!
//! `AttachmentCrypto` owns the configuration and the time policy; every
//! message it produces or reads takes "now" from its clock.

use chrono::{DateTime, Utc};

use crate::attachment::decrypt::{decrypt_split, DecryptedAttachment};
use crate::attachment::processor::{AttachmentProcessor, SessionParams};
use crate::config::AttachmentConfig;
use crate::crypto::{KeyEntity, KeyRing};
use crate::packet::FileHints;
use crate::time::Clock;
use crate::types::{AttachmentError, EncryptedSplit};

#[derive(Debug, Clone, Default)]
pub struct AttachmentCrypto {
    config: AttachmentConfig,
    clock: Clock,
}

impl AttachmentCrypto {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: AttachmentConfig) -> Result<Self, AttachmentError> {
        config.validate()?;
        Ok(Self {
            config,
            clock: Clock::system(),
        })
    }

    /// Replace the time policy with `generator`.
    pub fn with_time_generator<F>(mut self, generator: F) -> Self
    where
        F: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        self.clock = Clock::with_generator(generator);
        self
    }

    /// Anchor "now" to a trusted server time (unix seconds).
    pub fn update_time(&mut self, unix_secs: i64) {
        self.clock.update_time(unix_secs);
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn config(&self) -> &AttachmentConfig {
        &self.config
    }

    /// Encrypt a whole attachment in one call.
    pub fn encrypt_attachment(
        &self,
        plaintext: &[u8],
        file_name: &str,
        key_ring: &KeyRing,
    ) -> Result<EncryptedSplit, AttachmentError> {
        let mut processor = self.start(plaintext.len(), file_name, key_ring, 0)?;
        processor.process(plaintext)?;
        processor.finish()
    }

    /// Start an incremental session that periodically releases spare buffer capacity.
    pub fn encrypt_attachment_low_memory(
        &self,
        estimated_size: usize,
        file_name: &str,
        key_ring: &KeyRing,
    ) -> Result<AttachmentProcessor, AttachmentError> {
        self.start(estimated_size, file_name, key_ring, self.config.low_memory_reclaim_threshold)
    }

    /// Decrypt a split attachment. Locked keys are unlocked with `passphrase` first.
    pub fn decrypt_attachment(
        &self,
        key_packet: &[u8],
        data_packet: &[u8],
        key_ring: &mut KeyRing,
        passphrase: &str,
    ) -> Result<Vec<u8>, AttachmentError> {
        self.decrypt_attachment_details(key_packet, data_packet, key_ring, passphrase)
            .map(|attachment| attachment.data)
    }

    /// Like [`decrypt_attachment`](Self::decrypt_attachment), also returning the stored file name and date.
    pub fn decrypt_attachment_details(
        &self,
        key_packet: &[u8],
        data_packet: &[u8],
        key_ring: &mut KeyRing,
        passphrase: &str,
    ) -> Result<DecryptedAttachment, AttachmentError> {
        let config = self.config.packet_config(self.clock.now());
        decrypt_split(key_packet, data_packet, key_ring, passphrase, &config).map(|(attachment, _)| attachment)
    }

    fn start(
        &self,
        estimated_size: usize,
        file_name: &str,
        key_ring: &KeyRing,
        reclaim_threshold: usize,
    ) -> Result<AttachmentProcessor, AttachmentError> {
        let recipients: Vec<&KeyEntity> = key_ring.entities().iter().collect();
        let params = SessionParams {
            estimated_size,
            hints: FileHints::named(file_name),
            packet: self.config.packet_config(self.clock.now()),
            conduit_capacity: self.config.conduit_capacity,
            reclaim_threshold,
        };
        AttachmentProcessor::start(&recipients, params)
    }
}
