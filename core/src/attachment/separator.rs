// ## 📂 File: `src/attachment/separator.rs`

//! src/attachment/separator.rs
//!
//! Splits a binary message into its key half and its data half.
//!
//! Design notes:
//! - Packets are copied byte-for-byte: headers, bodies and every partial
//!   length octet land in the output unchanged, so `key || data` is the
//!   original message.
//! - Session-key packets go to `key_packet`; the first encrypted data packet
//!   goes to `data_packet` and ends the scan.
//! - Marker and padding packets before the data packet carry nothing and are
//!   dropped.
//! - The input is always read to the end, so a producer writing into a pipe
//!   never blocks on a consumer that has stopped reading.
//!
//! Memory:
//! - `reclaim_threshold == 0`: the data buffer is pre-sized from the size
//!   hint plus expected AEAD overhead, capped at `MAX_DATA_PREALLOC`. Any hint
//!   is accepted; the buffer grows past the cap as data arrives.
//! - `reclaim_threshold > 0`: the buffer grows in threshold-sized steps, and
//!   after every threshold-sized segment any spare capacity above one
//!   threshold is released (one reclaim pass).

use std::io::{self, Read};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::armor::unarmor;
use crate::constants::{KEY_PACKET_ESTIMATE, MAX_DATA_PREALLOC, SCRATCH_BUF_LEN, SEIPD_VERSION};
use crate::packet::{
    parse_cipher, read_body_length, read_packet_header, BodyLength, PacketError, SymmetricAlgorithm, Tag,
};
use crate::telemetry::TelemetryCounters;
use crate::types::{AttachmentError, EncryptedSplit};

/// Header, salt and final tag of the data packet, plus literal packet framing.
const DATA_PACKET_FIXED_OVERHEAD: usize = 256;

/// Everything the split worker hands back when it is joined.
#[derive(Debug)]
pub struct SplitReport {
    pub split: EncryptedSplit,
    pub counters: TelemetryCounters,
    pub elapsed: Duration,
}

/// Unarmor a complete message and split it.
pub fn split_armor(armored: &str) -> Result<EncryptedSplit, AttachmentError> {
    let raw = unarmor(armored)?;
    separate_key_and_data(raw.as_slice(), armored.len(), 0)
}

/// Separate `reader` into key and data packets.
pub fn separate_key_and_data<R: Read>(
    reader: R,
    estimated_size: usize,
    reclaim_threshold: usize,
) -> Result<EncryptedSplit, AttachmentError> {
    separate_with_counters(reader, estimated_size, reclaim_threshold).map(|report| report.split)
}

/// Same as [`separate_key_and_data`], also returning split telemetry.
pub fn separate_with_counters<R: Read>(
    mut reader: R,
    estimated_size: usize,
    reclaim_threshold: usize,
) -> Result<SplitReport, AttachmentError> {
    let started = Instant::now();
    let mut counters = TelemetryCounters::default();
    let mut key_packet = Vec::with_capacity(KEY_PACKET_ESTIMATE);
    let mut data = DataBuffer::new(estimated_size, reclaim_threshold);
    let mut scratch = vec![0u8; SCRATCH_BUF_LEN];

    let algorithm = loop {
        let header = read_packet_header(&mut reader)?.ok_or(PacketError::MissingDataPacket)?;
        match header.tag {
            tag if tag.is_session_key() => {
                let start = key_packet.len();
                key_packet.extend_from_slice(&header.raw);
                copy_body(&mut reader, header.length, &mut scratch, |chunk| {
                    key_packet.extend_from_slice(chunk)
                })?;
                counters.add_key_packet(key_packet.len() - start);
                debug!(?tag, len = key_packet.len() - start, "key packet separated");
            }
            Tag::Marker | Tag::Padding => {
                copy_body(&mut reader, header.length, &mut scratch, |_| {})?;
                counters.add_skipped();
                debug!(tag = ?header.tag, "packet dropped");
            }
            Tag::SymEncryptedIntegrityProtectedData => {
                data.extend(&header.raw, &mut counters);
                let prefix = copy_body(&mut reader, header.length, &mut scratch, |chunk| {
                    data.extend(chunk, &mut counters)
                })?;
                break data_packet_algorithm(&prefix)?;
            }
            found => {
                return Err(PacketError::UnexpectedPacket {
                    found,
                    context: "before the encrypted data packet",
                }
                .into())
            }
        }
    };

    let trailing = io::copy(&mut reader, &mut io::sink()).map_err(PacketError::from)?;
    if trailing > 0 {
        warn!(trailing, "ignoring bytes after the data packet");
        counters.add_trailing(trailing);
    }

    if key_packet.is_empty() {
        return Err(PacketError::MissingKeyPacket.into());
    }

    let data_packet = data.into_inner();
    counters.add_data_bytes(data_packet.len());
    info!(
        key_packet = key_packet.len(),
        data_packet = data_packet.len(),
        %algorithm,
        reclaim_passes = counters.reclaim_passes,
        "message split"
    );

    Ok(SplitReport {
        split: EncryptedSplit {
            key_packet,
            data_packet,
            algorithm,
        },
        counters,
        elapsed: started.elapsed(),
    })
}

fn data_packet_algorithm(prefix: &[u8]) -> Result<SymmetricAlgorithm, PacketError> {
    if prefix.len() < 2 {
        return Err(PacketError::Malformed("data packet body too short".into()));
    }
    if prefix[0] != SEIPD_VERSION {
        return Err(PacketError::UnsupportedVersion {
            packet: "SEIPD",
            version: prefix[0],
        });
    }
    parse_cipher(prefix[1])
}

/// Copy one packet body, partial length octets included, into `sink`.
///
/// Returns the first two body octets (fewer if the body is shorter).
fn copy_body<R: Read>(
    reader: &mut R,
    length: BodyLength,
    scratch: &mut [u8],
    mut sink: impl FnMut(&[u8]),
) -> Result<Vec<u8>, PacketError> {
    let mut prefix = Vec::with_capacity(2);
    let mut capture = |chunk: &[u8], sink: &mut dyn FnMut(&[u8])| {
        if prefix.len() < 2 {
            let take = (2 - prefix.len()).min(chunk.len());
            prefix.extend_from_slice(&chunk[..take]);
        }
        sink(chunk);
    };

    let mut length = length;
    loop {
        match length {
            BodyLength::Fixed(n) => {
                copy_exact(reader, n as u64, scratch, |c| capture(c, &mut sink))?;
                break;
            }
            BodyLength::Partial(n) => {
                copy_exact(reader, n as u64, scratch, |c| capture(c, &mut sink))?;
                let mut raw = Vec::with_capacity(5);
                length = read_body_length(reader, &mut raw)?;
                sink(&raw);
            }
            BodyLength::Indeterminate => {
                loop {
                    let n = reader.read(scratch)?;
                    if n == 0 {
                        break;
                    }
                    capture(&scratch[..n], &mut sink);
                }
                break;
            }
        }
    }
    Ok(prefix)
}

fn copy_exact<R: Read>(
    reader: &mut R,
    mut remaining: u64,
    scratch: &mut [u8],
    mut sink: impl FnMut(&[u8]),
) -> Result<(), PacketError> {
    while remaining > 0 {
        let want = (scratch.len() as u64).min(remaining) as usize;
        let n = match reader.read(&mut scratch[..want]) {
            Ok(0) => return Err(PacketError::Truncated),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        sink(&scratch[..n]);
        remaining -= n as u64;
    }
    Ok(())
}

struct DataBuffer {
    buf: Vec<u8>,
    threshold: usize,
    since_reclaim: usize,
}

impl DataBuffer {
    fn new(estimated_size: usize, threshold: usize) -> Self {
        let buf = if threshold == 0 {
            Vec::with_capacity(estimated_data_len(estimated_size))
        } else {
            Vec::new()
        };
        Self {
            buf,
            threshold,
            since_reclaim: 0,
        }
    }

    fn extend(&mut self, chunk: &[u8], counters: &mut TelemetryCounters) {
        if self.threshold == 0 {
            self.buf.extend_from_slice(chunk);
            return;
        }

        if self.buf.capacity() - self.buf.len() < chunk.len() {
            self.buf.reserve_exact(chunk.len().max(self.threshold));
        }
        self.buf.extend_from_slice(chunk);

        self.since_reclaim += chunk.len();
        if self.since_reclaim >= self.threshold {
            self.since_reclaim = 0;
            let keep = self.buf.len() + self.threshold;
            if self.buf.capacity() > keep {
                self.buf.shrink_to(keep);
            }
            counters.add_reclaim_pass();
        }
    }

    fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

/// Plaintext size plus one tag and two length octets per 64 KiB, rounded up,
/// never more than `MAX_DATA_PREALLOC`.
fn estimated_data_len(plaintext: usize) -> usize {
    plaintext
        .saturating_add(plaintext / 512)
        .saturating_add(DATA_PACKET_FIXED_OVERHEAD)
        .min(MAX_DATA_PREALLOC)
}
