// ## 📂 File: `src/armor.rs`

//! src/armor.rs
//!
//! ASCII armor for messages.
//!
//! ```text
//! -----BEGIN PGP MESSAGE-----
//! [Key: Value header lines]
//!
//! base64, 64 columns per line
//! =CRC24 (base64 of three octets)
//! -----END PGP MESSAGE-----
//! ```
//!
//! Design notes:
//! - Encoding never writes armor headers.
//! - Decoding skips armor headers, tolerates surrounding text and CRLF line
//!   endings, and checks the CRC-24 line when present.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use thiserror::Error;

use crate::constants::{ARMOR_BEGIN, ARMOR_END, ARMOR_LINE_LEN};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArmorError {
    #[error("armor begin line not found")]
    MissingBegin,

    #[error("armor end line not found")]
    MissingEnd,

    #[error("invalid base64 in armor body: {0}")]
    Base64(String),

    #[error("armor checksum mismatch: expected {expected:06x}, computed {actual:06x}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    #[error("malformed armor checksum line")]
    BadChecksumLine,
}

const CRC24_INIT: u32 = 0x00B7_04CE;
const CRC24_POLY: u32 = 0x0186_4CFB;

/// CRC-24 as used by OpenPGP armor.
pub fn crc24(data: &[u8]) -> u32 {
    let mut crc = CRC24_INIT;
    for &byte in data {
        crc ^= (byte as u32) << 16;
        for _ in 0..8 {
            crc <<= 1;
            if crc & 0x0100_0000 != 0 {
                crc ^= CRC24_POLY;
            }
        }
    }
    crc & 0x00FF_FFFF
}

/// Armor a binary message.
pub fn armor_message(data: &[u8]) -> String {
    let body = STANDARD.encode(data);
    let crc = crc24(data).to_be_bytes();

    let mut out = String::with_capacity(body.len() + body.len() / ARMOR_LINE_LEN + 96);
    out.push_str(ARMOR_BEGIN);
    out.push_str("\n\n");
    let mut rest = body.as_str();
    while !rest.is_empty() {
        let (line, tail) = rest.split_at(rest.len().min(ARMOR_LINE_LEN));
        out.push_str(line);
        out.push('\n');
        rest = tail;
    }
    out.push('=');
    out.push_str(&STANDARD.encode(&crc[1..]));
    out.push('\n');
    out.push_str(ARMOR_END);
    out.push('\n');
    out
}

/// Strip armor and return the binary message.
pub fn unarmor(text: &str) -> Result<Vec<u8>, ArmorError> {
    let mut lines = text.lines().map(str::trim);

    lines.by_ref().find(|l| *l == ARMOR_BEGIN).ok_or(ArmorError::MissingBegin)?;

    let mut body = String::new();
    let mut checksum: Option<&str> = None;
    let mut in_headers = true;
    let mut ended = false;

    for line in lines {
        if line == ARMOR_END {
            ended = true;
            break;
        }
        if in_headers {
            if line.is_empty() {
                in_headers = false;
                continue;
            }
            if line.contains(": ") {
                continue;
            }
            in_headers = false;
        }
        if line.is_empty() {
            continue;
        }
        if let Some(crc) = line.strip_prefix('=') {
            checksum = Some(crc);
            continue;
        }
        body.push_str(line);
    }
    if !ended {
        return Err(ArmorError::MissingEnd);
    }

    let data = STANDARD
        .decode(body.as_bytes())
        .map_err(|e| ArmorError::Base64(e.to_string()))?;

    if let Some(crc) = checksum {
        let raw = STANDARD.decode(crc).map_err(|_| ArmorError::BadChecksumLine)?;
        if raw.len() != 3 {
            return Err(ArmorError::BadChecksumLine);
        }
        let expected = u32::from_be_bytes([0, raw[0], raw[1], raw[2]]);
        let actual = crc24(&data);
        if expected != actual {
            return Err(ArmorError::ChecksumMismatch { expected, actual });
        }
    }
    Ok(data)
}
