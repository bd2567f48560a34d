// ## 📂 File: `src/packet/literal.rs`

//! Literal data packet prefix: `format | name len | name | date(u32 BE)`.
//! The payload follows directly and is streamed by the caller.

use std::io::Read;

use byteorder::{BigEndian, ReadBytesExt};
use chrono::{DateTime, TimeZone, Utc};

use crate::constants::LITERAL_FORMAT_BINARY;
use crate::packet::types::PacketError;

const MAX_NAME_LEN: usize = 255;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralHeader {
    pub format: u8,
    pub file_name: String,
    pub modified: DateTime<Utc>,
}

impl LiteralHeader {
    pub fn binary(file_name: &str, modified: DateTime<Utc>) -> Self {
        Self {
            format: LITERAL_FORMAT_BINARY,
            file_name: truncate_name(file_name).to_owned(),
            modified,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let name = truncate_name(&self.file_name).as_bytes();
        let secs = self.modified.timestamp().clamp(0, u32::MAX as i64) as u32;

        let mut out = Vec::with_capacity(2 + name.len() + 4);
        out.push(self.format);
        out.push(name.len() as u8);
        out.extend_from_slice(name);
        out.extend_from_slice(&secs.to_be_bytes());
        out
    }

    pub fn read<R: Read>(r: &mut R) -> Result<Self, PacketError> {
        let format = r.read_u8()?;
        if !matches!(format, b'b' | b't' | b'u') {
            return Err(PacketError::Malformed(format!("literal data format 0x{format:02x}")));
        }
        let name_len = r.read_u8()? as usize;
        let mut name = vec![0u8; name_len];
        r.read_exact(&mut name)?;
        let secs = r.read_u32::<BigEndian>()?;

        Ok(Self {
            format,
            file_name: String::from_utf8_lossy(&name).into_owned(),
            modified: Utc.timestamp_opt(secs as i64, 0).single().unwrap_or_default(),
        })
    }
}

/// Cut a name to at most 255 bytes without splitting a character.
fn truncate_name(name: &str) -> &str {
    if name.len() <= MAX_NAME_LEN {
        return name;
    }
    let mut end = MAX_NAME_LEN;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    &name[..end]
}
