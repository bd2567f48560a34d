// ## src/telemetry/snapshot.rs

//! src/telemetry/snapshot.rs
//!
//! Immutable view of one attachment session: counters, derived ratios,
//! stage timings and elapsed time.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::telemetry::counters::TelemetryCounters;
use crate::telemetry::timers::{Stage, StageTimes, TelemetryTimer};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    pub writes: u64,
    pub bytes_plaintext: u64,
    pub packets_key: u64,
    pub packets_skipped: u64,
    pub bytes_key_packet: u64,
    pub bytes_data_packet: u64,
    pub bytes_trailing: u64,
    pub reclaim_passes: u64,
    /// Output octets per plaintext octet (0 when nothing was written).
    pub expansion_ratio: f64,
    pub throughput_plaintext_bytes_per_sec: f64,
    pub elapsed: Duration,
    pub stage_times: StageTimes,
}

impl TelemetrySnapshot {
    pub fn from(counters: &TelemetryCounters, timer: &TelemetryTimer) -> Self {
        let elapsed = timer.elapsed();

        let expansion_ratio = if counters.bytes_plaintext > 0 {
            counters.output_bytes() as f64 / counters.bytes_plaintext as f64
        } else {
            0.0
        };

        let throughput = if elapsed.as_secs_f64() > 0.0 {
            counters.bytes_plaintext as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };

        Self {
            writes: counters.writes,
            bytes_plaintext: counters.bytes_plaintext,
            packets_key: counters.packets_key,
            packets_skipped: counters.packets_skipped,
            bytes_key_packet: counters.bytes_key_packet,
            bytes_data_packet: counters.bytes_data_packet,
            bytes_trailing: counters.bytes_trailing,
            reclaim_passes: counters.reclaim_passes,
            expansion_ratio,
            throughput_plaintext_bytes_per_sec: throughput,
            elapsed,
            stage_times: timer.stage_times.clone(),
        }
    }

    pub fn total_stage_time(&self) -> Duration {
        self.stage_times.total()
    }

    pub fn has_all_stages(&self, expected: &[Stage]) -> bool {
        self.stage_times.has_all(expected)
    }

    /// Invariants every finished encryption session satisfies:
    /// - output is never smaller than the plaintext (AEAD adds tags and headers);
    /// - caller-side stage time cannot exceed wall time.
    ///
    /// `Split` runs on the worker thread concurrently with `Write`, so it is
    /// left out of the wall-time bound.
    pub fn sanity_check(&self) -> bool {
        let caller_time = self.stage_times.get(Stage::Write) + self.stage_times.get(Stage::Finish);
        self.bytes_key_packet + self.bytes_data_packet >= self.bytes_plaintext && caller_time <= self.elapsed
    }

    pub fn output_bytes(&self) -> u64 {
        self.bytes_key_packet + self.bytes_data_packet
    }
}
