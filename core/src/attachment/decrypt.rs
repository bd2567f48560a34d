// ## 📂 File: `src/attachment/decrypt.rs`

//! Reassemble a split message and decrypt it.
//!
//! The key packet and data packet are read back-to-back as one stream, which
//! is exactly the message the separator split. Nothing is returned unless the
//! whole body, final tag included, authenticates.

use std::io::Read;
use std::time::Instant;

use tracing::{debug, info};

use crate::crypto::KeyRing;
use crate::packet::{read_message, PacketConfig, PacketError};
use crate::telemetry::{Stage, TelemetryCounters, TelemetrySnapshot, TelemetryTimer};
use crate::types::AttachmentError;

/// Plaintext plus the metadata stored alongside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptedAttachment {
    pub data: Vec<u8>,
    pub file_name: String,
    pub modified: chrono::DateTime<chrono::Utc>,
}

/// Unlock `key_ring` if needed, then decrypt `key_packet || data_packet`.
pub fn decrypt_split(
    key_packet: &[u8],
    data_packet: &[u8],
    key_ring: &mut KeyRing,
    passphrase: &str,
    config: &PacketConfig,
) -> Result<(DecryptedAttachment, TelemetrySnapshot), AttachmentError> {
    let mut timer = TelemetryTimer::new();
    let mut counters = TelemetryCounters::default();

    if key_ring.is_locked() {
        timer
            .time(Stage::Unlock, || key_ring.unlock(passphrase.as_bytes()))
            .map_err(AttachmentError::Unlock)?;
        debug!(entities = key_ring.len(), "key ring unlocked for decryption");
    }

    let t = Instant::now();
    let message = read_message(key_packet.chain(data_packet), key_ring, config)?;
    let mut body = message.unverified_body;
    let mut data = Vec::with_capacity(data_packet.len());
    body.read_to_end(&mut data).map_err(PacketError::from)?;
    timer.add_stage_time(Stage::Decrypt, t.elapsed());
    timer.finish();

    counters.bytes_key_packet = key_packet.len() as u64;
    counters.bytes_data_packet = data_packet.len() as u64;
    counters.bytes_plaintext = data.len() as u64;
    info!(
        plaintext = data.len(),
        file_name = %message.file_name,
        "attachment decrypted"
    );

    Ok((
        DecryptedAttachment {
            data,
            file_name: message.file_name,
            modified: message.modified,
        },
        TelemetrySnapshot::from(&counters, &timer),
    ))
}
