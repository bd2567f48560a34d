// ## 📂 File: `src/packet/header.rs`
//! src/packet/header.rs
//!
//! Packet header encoding and decoding.
//!
//! Design notes:
//! - New-format headers (`0xC0 | tag`) are the only ones written.
//! - Old-format headers are accepted on read, including indeterminate length.
//! - Decoders keep the exact header octets (`raw`) so the separator can copy
//!   packets byte-for-byte without re-encoding.
//! - Multi-byte integers are big-endian, as everywhere in OpenPGP.

use std::io::{self, Read, Write};

use byteorder::{BigEndian, ReadBytesExt};

use crate::constants::{MAX_PARTIAL_CHUNK_SIZE, MIN_PARTIAL_CHUNK_SIZE};
use crate::packet::types::{BodyLength, PacketError, Tag};

/// Parsed packet header plus the octets it was decoded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketHeader {
    pub tag: Tag,
    pub length: BodyLength,
    pub raw: Vec<u8>,
}

/// Read the next packet header.
///
/// # Returns
/// - `Ok(None)` on a clean end of stream at a packet boundary.
/// - `Ok(Some(header))` otherwise.
/// - `Err(PacketError)` for a bad tag octet, unknown tag, or truncated length.
pub fn read_packet_header<R: Read>(r: &mut R) -> Result<Option<PacketHeader>, PacketError> {
    let first = match r.read_u8() {
        Ok(b) => b,
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    if first & 0x80 == 0 {
        return Err(PacketError::Malformed(format!("invalid packet tag octet 0x{first:02x}")));
    }

    let mut raw = vec![first];
    let (tag_raw, length) = if first & 0x40 != 0 {
        let tag_raw = first & 0x3F;
        (tag_raw, read_body_length(r, &mut raw)?)
    } else {
        let tag_raw = (first >> 2) & 0x0F;
        (tag_raw, read_old_length(r, first & 0x03, &mut raw)?)
    };

    let tag = Tag::try_from(tag_raw).map_err(|_| PacketError::UnknownTag(tag_raw))?;
    if matches!(length, BodyLength::Partial(_)) && !tag.allows_partial() {
        return Err(PacketError::InvalidLength(format!(
            "partial body length on {tag:?} packet"
        )));
    }

    Ok(Some(PacketHeader { tag, length, raw }))
}

/// Read a new-format body length, appending the consumed octets to `raw`.
///
/// Also used for the length headers that follow each partial body chunk.
pub fn read_body_length<R: Read>(r: &mut R, raw: &mut Vec<u8>) -> Result<BodyLength, PacketError> {
    let o1 = r.read_u8()?;
    raw.push(o1);
    let length = match o1 {
        0..=191 => BodyLength::Fixed(o1 as u32),
        192..=223 => {
            let o2 = r.read_u8()?;
            raw.push(o2);
            BodyLength::Fixed((((o1 as u32) - 192) << 8) + o2 as u32 + 192)
        }
        224..=254 => BodyLength::Partial(1u32 << (o1 & 0x1F)),
        255 => {
            let len = r.read_u32::<BigEndian>()?;
            raw.extend_from_slice(&len.to_be_bytes());
            BodyLength::Fixed(len)
        }
    };
    Ok(length)
}

fn read_old_length<R: Read>(r: &mut R, length_type: u8, raw: &mut Vec<u8>) -> Result<BodyLength, PacketError> {
    let length = match length_type {
        0 => {
            let len = r.read_u8()?;
            raw.push(len);
            BodyLength::Fixed(len as u32)
        }
        1 => {
            let len = r.read_u16::<BigEndian>()?;
            raw.extend_from_slice(&len.to_be_bytes());
            BodyLength::Fixed(len as u32)
        }
        2 => {
            let len = r.read_u32::<BigEndian>()?;
            raw.extend_from_slice(&len.to_be_bytes());
            BodyLength::Fixed(len)
        }
        _ => BodyLength::Indeterminate,
    };
    Ok(length)
}

/// Encode a new-format body length.
pub fn encode_body_length(length: BodyLength, out: &mut Vec<u8>) -> Result<(), PacketError> {
    match length {
        BodyLength::Fixed(len) if len < 192 => out.push(len as u8),
        BodyLength::Fixed(len) if len < 8384 => {
            let v = len - 192;
            out.push(((v >> 8) as u8) + 192);
            out.push((v & 0xFF) as u8);
        }
        BodyLength::Fixed(len) => {
            out.push(255);
            out.extend_from_slice(&len.to_be_bytes());
        }
        BodyLength::Partial(len) => {
            let len = len as usize;
            if !len.is_power_of_two() || len > MAX_PARTIAL_CHUNK_SIZE {
                return Err(PacketError::InvalidLength(format!(
                    "partial length {len} is not a power of two <= 2^30"
                )));
            }
            out.push(224 + len.trailing_zeros() as u8);
        }
        BodyLength::Indeterminate => {
            return Err(PacketError::InvalidLength(
                "indeterminate length cannot be written in new format".into(),
            ))
        }
    }
    Ok(())
}

/// Write a complete new-format packet header.
pub fn write_packet_header<W: Write>(w: &mut W, tag: Tag, length: BodyLength) -> Result<(), PacketError> {
    if let BodyLength::Partial(len) = length {
        if !tag.allows_partial() {
            return Err(PacketError::InvalidLength(format!("partial body length on {tag:?} packet")));
        }
        if (len as usize) < MIN_PARTIAL_CHUNK_SIZE {
            return Err(PacketError::InvalidLength(format!(
                "first partial length {len} is below {MIN_PARTIAL_CHUNK_SIZE}"
            )));
        }
    }
    let mut buf = Vec::with_capacity(6);
    buf.push(tag.new_format_octet());
    encode_body_length(length, &mut buf)?;
    w.write_all(&buf)?;
    Ok(())
}

/// Write a complete packet with a definite length.
pub fn write_packet<W: Write>(w: &mut W, tag: Tag, body: &[u8]) -> Result<(), PacketError> {
    let len = u32::try_from(body.len())
        .map_err(|_| PacketError::InvalidLength(format!("packet body of {} bytes", body.len())))?;
    write_packet_header(w, tag, BodyLength::Fixed(len))?;
    w.write_all(body)?;
    Ok(())
}
