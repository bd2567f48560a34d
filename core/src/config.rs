// ## 📂 File: `src/config.rs`

//! Attachment engine configuration.
//!
//! Every field has a default, so `{}` is a valid JSON config. `validate()`
//! runs before any session starts; invalid values never reach the packet layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_AEAD_CHUNK_OCTET, DEFAULT_CONDUIT_CAPACITY, DEFAULT_PARTIAL_CHUNK_SIZE,
    LOW_MEMORY_RECLAIM_THRESHOLD, MAX_AEAD_CHUNK_OCTET, MAX_PARTIAL_CHUNK_SIZE, MIN_PARTIAL_CHUNK_SIZE,
};
use crate::packet::PacketConfig;
use crate::types::AttachmentError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttachmentConfig {
    /// Partial body length used for the literal and data packets (power of two).
    pub partial_chunk_size: usize,
    /// AEAD chunk octet `c`; chunks hold `1 << (c + 6)` plaintext octets.
    pub aead_chunk_octet: u8,
    /// Chunks buffered between caller and split worker. 0 = rendezvous.
    pub conduit_capacity: usize,
    /// Reclaim threshold for the low-memory entry point, in bytes.
    pub low_memory_reclaim_threshold: usize,
}

impl Default for AttachmentConfig {
    fn default() -> Self {
        Self {
            partial_chunk_size: DEFAULT_PARTIAL_CHUNK_SIZE,
            aead_chunk_octet: DEFAULT_AEAD_CHUNK_OCTET,
            conduit_capacity: DEFAULT_CONDUIT_CAPACITY,
            low_memory_reclaim_threshold: LOW_MEMORY_RECLAIM_THRESHOLD,
        }
    }
}

impl AttachmentConfig {
    pub fn from_json_str(json: &str) -> Result<Self, AttachmentError> {
        let config: Self = serde_json::from_str(json).map_err(|e| AttachmentError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String, AttachmentError> {
        serde_json::to_string_pretty(self).map_err(|e| AttachmentError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), AttachmentError> {
        let size = self.partial_chunk_size;
        if !size.is_power_of_two() || !(MIN_PARTIAL_CHUNK_SIZE..=MAX_PARTIAL_CHUNK_SIZE).contains(&size) {
            return Err(AttachmentError::Config(format!(
                "partial_chunk_size {size} must be a power of two in {MIN_PARTIAL_CHUNK_SIZE}..={MAX_PARTIAL_CHUNK_SIZE}"
            )));
        }
        if self.aead_chunk_octet > MAX_AEAD_CHUNK_OCTET {
            return Err(AttachmentError::Config(format!(
                "aead_chunk_octet {} exceeds {MAX_AEAD_CHUNK_OCTET}",
                self.aead_chunk_octet
            )));
        }
        if self.low_memory_reclaim_threshold == 0 {
            return Err(AttachmentError::Config(
                "low_memory_reclaim_threshold must be non-zero".into(),
            ));
        }
        Ok(())
    }

    /// Packet settings for one message stamped at `time`.
    pub fn packet_config(&self, time: DateTime<Utc>) -> PacketConfig {
        PacketConfig {
            time,
            partial_chunk_size: self.partial_chunk_size,
            aead_chunk_octet: self.aead_chunk_octet,
        }
    }
}
