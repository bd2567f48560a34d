// ### `src/telemetry/counters.rs`

//! telemetry/counters.rs
//! Mutable counters used during an attachment session.
//!
//! Summary: The caller side counts writes and plaintext; the split worker
//! counts packets, packet bytes and reclaim passes. The two sets are merged
//! after the worker is joined and turned into an immutable TelemetrySnapshot.
use std::ops::AddAssign;

use serde::{Deserialize, Serialize};

/// Deterministic counters collected during one attachment session
#[derive(Default, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryCounters {
    pub writes: u64,
    pub bytes_plaintext: u64,
    pub packets_key: u64,
    pub packets_skipped: u64,
    pub bytes_key_packet: u64,
    pub bytes_data_packet: u64,
    pub bytes_trailing: u64,
    pub reclaim_passes: u64,
}

impl TelemetryCounters {
    /// Record one `process` call.
    pub fn add_write(&mut self, pt_len: usize) {
        self.writes += 1;
        self.bytes_plaintext += pt_len as u64;
    }

    /// Record one session-key packet (header included).
    pub fn add_key_packet(&mut self, packet_len: usize) {
        self.packets_key += 1;
        self.bytes_key_packet += packet_len as u64;
    }

    /// Record data packet octets copied (headers and partial lengths included).
    pub fn add_data_bytes(&mut self, len: usize) {
        self.bytes_data_packet += len as u64;
    }

    /// Marker or padding packet dropped by the separator.
    pub fn add_skipped(&mut self) {
        self.packets_skipped += 1;
    }

    pub fn add_trailing(&mut self, len: u64) {
        self.bytes_trailing += len;
    }

    pub fn add_reclaim_pass(&mut self) {
        self.reclaim_passes += 1;
    }

    /// Ciphertext octets produced for the split.
    pub fn output_bytes(&self) -> u64 {
        self.bytes_key_packet + self.bytes_data_packet
    }

    // Worker and caller count disjoint fields, so a plain sum is exact.
    pub fn merge(&mut self, other: &TelemetryCounters) {
        self.writes += other.writes;
        self.bytes_plaintext += other.bytes_plaintext;
        self.packets_key += other.packets_key;
        self.packets_skipped += other.packets_skipped;
        self.bytes_key_packet += other.bytes_key_packet;
        self.bytes_data_packet += other.bytes_data_packet;
        self.bytes_trailing += other.bytes_trailing;
        self.reclaim_passes += other.reclaim_passes;
    }
}

impl AddAssign for TelemetryCounters {
    fn add_assign(&mut self, rhs: Self) {
        self.merge(&rhs);
    }
}
